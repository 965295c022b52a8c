use async_trait::async_trait;
use domain::{Payload, UserId};
use thiserror::Error;

use crate::notification::Notification;

/// 经网关发给某个用户的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// 转发来自会话伙伴的内容
    Relay(Payload),
    /// 系统通知
    Notice(Notification),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery to {recipient} failed: {reason}")]
    Failed { recipient: UserId, reason: String },
}

impl DeliveryError {
    pub fn failed(recipient: UserId, reason: impl Into<String>) -> Self {
        Self::Failed {
            recipient,
            reason: reason.into(),
        }
    }
}

/// 消息网关：核心与传输层之间唯一的出站接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn deliver(&self, recipient: UserId, message: Outbound) -> Result<(), DeliveryError>;
}

/// 发送系统通知。通知失败只记录日志，不影响会话状态。
pub async fn notify(gateway: &dyn MessageGateway, recipient: UserId, notification: Notification) {
    if let Err(err) = gateway
        .deliver(recipient, Outbound::Notice(notification))
        .await
    {
        tracing::warn!(
            user_id = %recipient,
            notification = ?notification,
            error = %err,
            "通知发送失败"
        );
    }
}
