//! 基础设施层实现。
//!
//! 提供 Telegram 客户端、消息网关、更新轮询和服务装配，实现应用层定义的接口。

pub mod builder;
pub mod poller;
pub mod retry;
pub mod telegram;

pub use builder::{Infrastructure, InfrastructureError};
pub use poller::{PollerError, UpdatePoller};
pub use retry::{run_with_restart, Backoff};
pub use telegram::{TelegramClient, TelegramError, TelegramGateway};
