//! Telegram Bot API 适配器

pub mod client;
pub mod gateway;
pub mod inbound;
pub mod render;
pub mod types;

pub use client::{TelegramClient, TelegramError, TelegramResult};
pub use gateway::TelegramGateway;
pub use inbound::{callback_id, parse_update, ParsedUpdate};
