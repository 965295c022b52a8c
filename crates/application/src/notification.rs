use domain::{MediaKind, PendingAction, SessionEvent};
use serde::{Deserialize, Serialize};

/// 发给用户的系统通知。具体文案和键盘由网关负责渲染。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Welcome,
    Health,
    PartnerFound,
    Searching,
    /// 发起 stop 的一方
    SessionEnded,
    /// 被动结束的一方
    PartnerLeft,
    AlreadyInSession,
    NotInSession,
    ConfirmRequest { action: PendingAction },
    ConfirmationCancelled,
    ConfirmationExpired,
    NothingToConfirm,
    VipInfo { active: bool },
    VipRequired { kind: MediaKind },
    MediaPrompt { kind: MediaKind },
}

impl From<&SessionEvent> for Notification {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::PartnerFound { .. } => Notification::PartnerFound,
            SessionEvent::Searching { .. } => Notification::Searching,
            SessionEvent::SessionEnded { .. } => Notification::SessionEnded,
            SessionEvent::PartnerLeft { .. } => Notification::PartnerLeft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variants_with_kind_field_serialize_under_type_tag() {
        let notification = Notification::VipRequired {
            kind: MediaKind::VideoNote,
        };
        let value = serde_json::to_value(notification).unwrap();
        assert_eq!(value, json!({"type": "vip_required", "kind": "video_note"}));

        let parsed: Notification =
            serde_json::from_value(json!({"type": "media_prompt", "kind": "photo"})).unwrap();
        assert_eq!(
            parsed,
            Notification::MediaPrompt {
                kind: MediaKind::Photo
            }
        );
    }

    #[test]
    fn unit_and_struct_variants_share_the_tag() {
        assert_eq!(
            serde_json::to_value(Notification::PartnerLeft).unwrap(),
            json!({"type": "partner_left"})
        );
        assert_eq!(
            serde_json::to_value(Notification::ConfirmRequest {
                action: PendingAction::Next
            })
            .unwrap(),
            json!({"type": "confirm_request", "action": "next"})
        );
    }
}
