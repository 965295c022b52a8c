use std::sync::Arc;

use application::{DeliveryError, MessageGateway, Outbound};
use async_trait::async_trait;
use domain::{MediaKind, Payload, UserId};

use super::client::{TelegramClient, TelegramResult};
use super::render::{self, PHOTO_CAPTION, SPEAKER_PREFIX, VOICE_CAPTION};

/// 基于 Bot API 的消息网关。私聊中 chat_id 与用户 id 相同。
#[derive(Debug, Clone)]
pub struct TelegramGateway {
    client: Arc<TelegramClient>,
}

impl TelegramGateway {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }

    async fn relay(&self, chat_id: i64, payload: &Payload) -> TelegramResult<()> {
        match payload {
            Payload::Text { text } => {
                let text = format!("{SPEAKER_PREFIX}{text}");
                self.client.send_message(chat_id, &text, None).await
            }
            Payload::Media { reference, kind } => match kind {
                MediaKind::Photo => {
                    self.client
                        .send_photo(chat_id, reference.as_str(), Some(PHOTO_CAPTION))
                        .await
                }
                MediaKind::Voice => {
                    self.client
                        .send_voice(chat_id, reference.as_str(), Some(VOICE_CAPTION))
                        .await
                }
                MediaKind::VideoNote => {
                    self.client
                        .send_video_note(chat_id, reference.as_str())
                        .await
                }
            },
        }
    }
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn deliver(&self, recipient: UserId, message: Outbound) -> Result<(), DeliveryError> {
        let chat_id = recipient.0;
        let result = match &message {
            Outbound::Relay(payload) => self.relay(chat_id, payload).await,
            Outbound::Notice(notification) => {
                let rendered = render::render(*notification);
                self.client
                    .send_message(chat_id, &rendered.text, rendered.markup.as_ref())
                    .await
            }
        };
        result.map_err(|err| DeliveryError::failed(recipient, err.to_string()))
    }
}
