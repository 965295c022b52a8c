//! getUpdates 长轮询循环
//!
//! 按到达顺序逐条处理更新；offset 在处理前推进，出错重启后不会重复处理同一条更新。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use application::{ApplicationError, SessionController};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::telegram::{
    client::{TelegramClient, TelegramError},
    inbound::{callback_id, parse_update},
    types::Update,
};

#[derive(Error, Debug)]
pub enum PollerError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),
    #[error("处理更新 {update_id} 失败: {source}")]
    Handle {
        update_id: i64,
        #[source]
        source: ApplicationError,
    },
}

pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    controller: Arc<SessionController>,
    poll_timeout_secs: u64,
    /// 0 表示尚未确认过任何更新
    offset: AtomicI64,
}

impl UpdatePoller {
    pub fn new(
        client: Arc<TelegramClient>,
        controller: Arc<SessionController>,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            client,
            controller,
            poll_timeout_secs,
            offset: AtomicI64::new(0),
        }
    }

    /// 下一次请求使用的 offset
    pub fn offset(&self) -> Option<i64> {
        match self.offset.load(Ordering::SeqCst) {
            0 => None,
            offset => Some(offset),
        }
    }

    /// 只在出错时返回
    pub async fn run(&self) -> Result<(), PollerError> {
        loop {
            self.poll_once().await?;
        }
    }

    /// 拉取并处理一批更新，返回本批数量
    pub async fn poll_once(&self) -> Result<usize, PollerError> {
        let updates = self
            .client
            .get_updates(self.offset(), self.poll_timeout_secs)
            .await?;
        for update in &updates {
            self.offset.store(update.update_id + 1, Ordering::SeqCst);
            self.dispatch(update).await?;
        }
        Ok(updates.len())
    }

    async fn dispatch(&self, update: &Update) -> Result<(), PollerError> {
        if let Some(id) = callback_id(update) {
            if let Err(e) = self.client.answer_callback_query(id).await {
                warn!(update_id = update.update_id, error = %e, "应答回调查询失败");
            }
        }

        let Some(parsed) = parse_update(update) else {
            debug!(update_id = update.update_id, "忽略不支持的更新");
            return Ok(());
        };

        self.controller
            .handle(parsed.profile, parsed.inbound)
            .await
            .map_err(|source| {
                error!(update_id = update.update_id, error = %source, "处理更新失败");
                PollerError::Handle {
                    update_id: update.update_id,
                    source,
                }
            })
    }
}
