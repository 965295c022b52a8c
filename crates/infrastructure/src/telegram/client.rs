//! Telegram Bot API HTTP 客户端

use std::time::Duration;

use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};
use thiserror::Error;
use tracing::debug;

use super::types::{
    AnswerCallbackQuery, ApiResponse, GetUpdates, MediaField, ReplyMarkup, SendMedia, SendMessage,
    Update, User,
};

/// 长轮询之外额外留给 HTTP 请求的余量
const REQUEST_GRACE: Duration = Duration::from_secs(10);

const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Telegram 调用错误
#[derive(Error, Debug)]
pub enum TelegramError {
    /// 网络或 HTTP 层错误
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// API 返回 ok=false
    #[error("Telegram API 错误 {method} ({code:?}): {description}")]
    Api {
        method: &'static str,
        code: Option<i64>,
        description: String,
    },

    /// ok=true 但缺少 result
    #[error("Telegram API 响应缺少结果: {method}")]
    EmptyResult { method: &'static str },
}

pub type TelegramResult<T> = Result<T, TelegramError>;

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    /// 创建客户端。`poll_timeout` 决定 HTTP 超时的下限，
    /// 保证长轮询不会被客户端提前打断。
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> TelegramResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + REQUEST_GRACE)
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<P, R>(&self, method: &'static str, params: &P) -> TelegramResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response: ApiResponse<R> = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TelegramError::Api {
                method,
                code: response.error_code,
                description: response.description.unwrap_or_default(),
            });
        }
        response
            .result
            .ok_or(TelegramError::EmptyResult { method })
    }

    pub async fn get_me(&self) -> TelegramResult<User> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// 长轮询获取更新。`offset` 为上一批最大 update_id + 1。
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> TelegramResult<Vec<Update>> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &GetUpdates {
                    offset,
                    timeout,
                    allowed_updates: ALLOWED_UPDATES,
                },
            )
            .await?;
        debug!(count = updates.len(), ?offset, "收到更新");
        Ok(updates)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> TelegramResult<()> {
        let _: IgnoredAny = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text,
                    reply_markup,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: Option<&str>,
    ) -> TelegramResult<()> {
        self.send_media("sendPhoto", chat_id, MediaField::Photo(file_id), caption)
            .await
    }

    pub async fn send_voice(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: Option<&str>,
    ) -> TelegramResult<()> {
        self.send_media("sendVoice", chat_id, MediaField::Voice(file_id), caption)
            .await
    }

    /// 视频消息（圆形视频）不支持 caption
    pub async fn send_video_note(&self, chat_id: i64, file_id: &str) -> TelegramResult<()> {
        self.send_media("sendVideoNote", chat_id, MediaField::VideoNote(file_id), None)
            .await
    }

    async fn send_media(
        &self,
        method: &'static str,
        chat_id: i64,
        file: MediaField<'_>,
        caption: Option<&str>,
    ) -> TelegramResult<()> {
        let _: IgnoredAny = self
            .call(
                method,
                &SendMedia {
                    chat_id,
                    file,
                    caption,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> TelegramResult<()> {
        let _: IgnoredAny = self
            .call("answerCallbackQuery", &AnswerCallbackQuery { callback_query_id })
            .await?;
        Ok(())
    }
}
