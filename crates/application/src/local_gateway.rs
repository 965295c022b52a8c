// 简单的内存网关实现，记录所有投递，可模拟用户不可达
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use domain::{Payload, UserId};

use crate::gateway::{DeliveryError, MessageGateway, Outbound};
use crate::notification::Notification;

#[derive(Debug, Default)]
pub struct RecordingGateway {
    delivered: Mutex<Vec<(UserId, Outbound)>>,
    unreachable: Mutex<HashSet<UserId>>,
    attempts: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后发给该用户的消息全部失败
    pub fn mark_unreachable(&self, user: UserId) {
        if let Ok(mut unreachable) = self.unreachable.lock() {
            unreachable.insert(user);
        }
    }

    pub fn mark_reachable(&self, user: UserId) {
        if let Ok(mut unreachable) = self.unreachable.lock() {
            unreachable.remove(&user);
        }
    }

    /// 投递尝试次数（含失败）
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<(UserId, Outbound)> {
        self.delivered
            .lock()
            .map(|delivered| delivered.clone())
            .unwrap_or_default()
    }

    pub fn notices_to(&self, user: UserId) -> Vec<Notification> {
        self.delivered()
            .into_iter()
            .filter_map(|(recipient, message)| match message {
                Outbound::Notice(notification) if recipient == user => Some(notification),
                _ => None,
            })
            .collect()
    }

    pub fn relayed_to(&self, user: UserId) -> Vec<Payload> {
        self.delivered()
            .into_iter()
            .filter_map(|(recipient, message)| match message {
                Outbound::Relay(payload) if recipient == user => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.clear();
        }
        self.attempts.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn deliver(&self, recipient: UserId, message: Outbound) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let unreachable = self
            .unreachable
            .lock()
            .map(|unreachable| unreachable.contains(&recipient))
            .unwrap_or(false);
        if unreachable {
            return Err(DeliveryError::failed(recipient, "recipient unreachable"));
        }

        self.delivered
            .lock()
            .map_err(|err| DeliveryError::failed(recipient, err.to_string()))?
            .push((recipient, message));
        Ok(())
    }
}
