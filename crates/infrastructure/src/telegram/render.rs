//! 通知文案与键盘
//!
//! 面向用户的文案保持俄语，按钮文字同时被入站解析使用，两边必须一致。

use application::Notification;
use domain::{MediaKind, PendingAction};

use super::types::{InlineKeyboardButton, KeyboardButton, ReplyMarkup};

pub const VOICE_BUTTON: &str = "🎤 Голосовое";
pub const PHOTO_BUTTON: &str = "📷 Фото";
pub const VIDEO_NOTE_BUTTON: &str = "🎥 Видео (VIP)";

pub const CONFIRM_YES: &str = "confirm:yes";
pub const CONFIRM_NO: &str = "confirm:no";

/// 转发文本时加在前面的说话人标记
pub const SPEAKER_PREFIX: &str = "👤: ";
pub const PHOTO_CAPTION: &str = "📷 Фото от собеседника";
pub const VOICE_CAPTION: &str = "🎤 Голосовое от собеседника";

/// 一条待发送的系统消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl Rendered {
    fn new(text: impl Into<String>, markup: Option<ReplyMarkup>) -> Self {
        Self {
            text: text.into(),
            markup,
        }
    }
}

/// 常驻命令键盘
pub fn command_keyboard() -> ReplyMarkup {
    let row = |labels: &[&str]| {
        labels
            .iter()
            .map(|label| KeyboardButton {
                text: (*label).to_string(),
            })
            .collect::<Vec<_>>()
    };
    ReplyMarkup::Keyboard {
        keyboard: vec![
            row(&["/find", "/stop", "/next"]),
            row(&[VOICE_BUTTON, PHOTO_BUTTON]),
            row(&[VIDEO_NOTE_BUTTON, "/vip"]),
        ],
        resize_keyboard: true,
    }
}

fn confirm_keyboard() -> ReplyMarkup {
    ReplyMarkup::Inline {
        inline_keyboard: vec![vec![
            InlineKeyboardButton {
                text: "✅ Да".into(),
                callback_data: CONFIRM_YES.into(),
            },
            InlineKeyboardButton {
                text: "↩️ Нет".into(),
                callback_data: CONFIRM_NO.into(),
            },
        ]],
    }
}

fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::Remove {
        remove_keyboard: true,
    }
}

pub fn render(notification: Notification) -> Rendered {
    let keyboard = Some(command_keyboard());
    match notification {
        Notification::Welcome => Rendered::new(
            "👋 Привет! Это анонимный чат-бот.\n\
             Доступные команды:\n\
             /find - найти собеседника\n\
             /stop - выйти из чата\n\
             /next - сменить собеседника\n\
             /vip - информация о VIP-статусе\n\
             /health - проверка работы бота",
            keyboard,
        ),
        Notification::Health => Rendered::new("✅ Бот активен и работает", None),
        Notification::PartnerFound => Rendered::new(
            "✅ Собеседник найден! Общайтесь анонимно.",
            Some(remove_keyboard()),
        ),
        Notification::Searching => Rendered::new("🔍 Ищем собеседника... Ожидайте.", None),
        Notification::SessionEnded => Rendered::new(
            "🗑️ Чат завершён. Для нового общения используйте /find",
            keyboard,
        ),
        Notification::PartnerLeft => Rendered::new(
            "❌ Собеседник покинул чат. Используйте /find для нового поиска.",
            keyboard,
        ),
        Notification::AlreadyInSession => Rendered::new(
            "⚠️ Вы уже в чате! Используйте /stop чтобы выйти.",
            None,
        ),
        Notification::NotInSession => Rendered::new(
            "❌ Вы не в чате. Используйте /find для поиска собеседника.",
            keyboard,
        ),
        Notification::ConfirmRequest { action } => {
            let question = match action {
                PendingAction::Stop => "Завершить текущий чат?",
                PendingAction::Next => "Завершить чат и искать нового собеседника?",
            };
            Rendered::new(format!("❓ {question}"), Some(confirm_keyboard()))
        }
        Notification::ConfirmationCancelled => {
            Rendered::new("↩️ Отменено. Чат продолжается.", None)
        }
        Notification::ConfirmationExpired => Rendered::new(
            "⌛ Запрос устарел. Повторите команду, если нужно.",
            None,
        ),
        Notification::NothingToConfirm => Rendered::new("ℹ️ Нечего подтверждать.", None),
        Notification::VipInfo { active: true } => Rendered::new(
            "🎉 У вас уже есть VIP-статус!\n\nВы можете отправлять видеосообщения (кружки).",
            None,
        ),
        Notification::VipInfo { active: false } => Rendered::new(
            "🔒 VIP-статус открывает дополнительные возможности:\n\
             • Отправка видеосообщений (кружков)\n\n\
             Для покупки напишите @admin",
            keyboard,
        ),
        Notification::VipRequired { kind } => Rendered::new(
            format!(
                "🔒 {} доступна только для VIP-пользователей\n\
                 Используйте команду /vip для получения информации",
                media_title(kind)
            ),
            keyboard,
        ),
        Notification::MediaPrompt { kind } => {
            let prompt = match kind {
                MediaKind::Voice => "🎤 Запишите и отправьте голосовое сообщение",
                MediaKind::Photo => "📷 Отправьте фото",
                MediaKind::VideoNote => "🎥 Запишите и отправьте видеосообщение (кружок)",
            };
            Rendered::new(prompt, None)
        }
    }
}

fn media_title(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "Отправка фото",
        MediaKind::Voice => "Отправка голосовых",
        MediaKind::VideoNote => "Отправка видеосообщений",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_request_has_inline_buttons() {
        let rendered = render(Notification::ConfirmRequest {
            action: PendingAction::Next,
        });
        match rendered.markup {
            Some(ReplyMarkup::Inline { inline_keyboard }) => {
                let data: Vec<_> = inline_keyboard[0]
                    .iter()
                    .map(|button| button.callback_data.as_str())
                    .collect();
                assert_eq!(data, vec![CONFIRM_YES, CONFIRM_NO]);
            }
            other => panic!("unexpected markup: {other:?}"),
        }
    }

    #[test]
    fn test_partner_found_hides_keyboard() {
        assert_eq!(
            render(Notification::PartnerFound).markup,
            Some(ReplyMarkup::Remove {
                remove_keyboard: true
            })
        );
    }

    #[test]
    fn test_command_keyboard_contains_media_buttons() {
        let ReplyMarkup::Keyboard { keyboard, .. } = command_keyboard() else {
            panic!("expected reply keyboard");
        };
        let labels: Vec<_> = keyboard.iter().flatten().map(|b| b.text.as_str()).collect();
        for label in [VOICE_BUTTON, PHOTO_BUTTON, VIDEO_NOTE_BUTTON, "/find", "/vip"] {
            assert!(labels.contains(&label), "missing {label}");
        }
    }
}
