//! 把 Telegram 更新解析成核心能理解的入站事件

use application::{Command, Inbound};
use domain::{MediaKind, Payload, UserId, UserProfile};

use super::render::{CONFIRM_NO, CONFIRM_YES, PHOTO_BUTTON, VIDEO_NOTE_BUTTON, VOICE_BUTTON};
use super::types::{largest_photo, Message, Update, User};

/// 解析后的更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUpdate {
    pub profile: UserProfile,
    pub inbound: Inbound,
}

pub fn profile_of(user: &User) -> UserProfile {
    let mut profile = UserProfile::new(UserId::new(user.id))
        .with_name(user.first_name.clone(), user.last_name.clone());
    if let Some(username) = &user.username {
        profile = profile.with_username(username.clone());
    }
    profile
}

/// 回调查询的 id。无论按钮数据能否识别都要应答，否则客户端会一直转圈。
pub fn callback_id(update: &Update) -> Option<&str> {
    update.callback_query.as_ref().map(|query| query.id.as_str())
}

/// 不支持的更新（贴纸、文件、机器人发送者、未知按钮等）返回 None
pub fn parse_update(update: &Update) -> Option<ParsedUpdate> {
    if let Some(query) = &update.callback_query {
        let accept = match query.data.as_deref()? {
            CONFIRM_YES => true,
            CONFIRM_NO => false,
            _ => return None,
        };
        return Some(ParsedUpdate {
            profile: profile_of(&query.from),
            inbound: Inbound::Command(Command::Confirm { accept }),
        });
    }

    let message = update.message.as_ref()?;
    let user = message.from.as_ref().filter(|user| !user.is_bot)?;
    Some(ParsedUpdate {
        profile: profile_of(user),
        inbound: parse_message(message)?,
    })
}

fn parse_message(message: &Message) -> Option<Inbound> {
    if let Some(text) = &message.text {
        return Some(parse_text(text));
    }
    if let Some(photo) = message.photo.as_deref().and_then(largest_photo) {
        return Some(Inbound::Content(Payload::media(
            photo.file_id.clone(),
            MediaKind::Photo,
        )));
    }
    if let Some(voice) = &message.voice {
        return Some(Inbound::Content(Payload::media(
            voice.file_id.clone(),
            MediaKind::Voice,
        )));
    }
    if let Some(note) = &message.video_note {
        return Some(Inbound::Content(Payload::media(
            note.file_id.clone(),
            MediaKind::VideoNote,
        )));
    }
    None
}

fn parse_text(text: &str) -> Inbound {
    let command = match text.trim() {
        VOICE_BUTTON => Some(Command::MediaPrompt(MediaKind::Voice)),
        PHOTO_BUTTON => Some(Command::MediaPrompt(MediaKind::Photo)),
        VIDEO_NOTE_BUTTON => Some(Command::MediaPrompt(MediaKind::VideoNote)),
        trimmed => parse_command(trimmed),
    };
    match command {
        Some(command) => Inbound::Command(command),
        None => Inbound::Content(Payload::text(text)),
    }
}

/// 支持 `/find@botname` 形式，未知命令按普通文本转发
fn parse_command(text: &str) -> Option<Command> {
    let word = text.strip_prefix('/')?.split_whitespace().next()?;
    let name = word.split('@').next().unwrap_or(word);
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "find" => Some(Command::Find),
        "stop" => Some(Command::Stop),
        "next" => Some(Command::Next),
        "vip" => Some(Command::Vip),
        "health" => Some(Command::Health),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: serde_json::Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    fn message(extra: serde_json::Value) -> Update {
        let mut body = json!({
            "message_id": 1,
            "from": {"id": 42, "is_bot": false, "first_name": "Ivan", "username": "ivan"},
            "chat": {"id": 42}
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        update(json!({"update_id": 10, "message": body}))
    }

    #[test]
    fn test_commands() {
        let parsed = parse_update(&message(json!({"text": "/find"}))).unwrap();
        assert_eq!(parsed.inbound, Inbound::Command(Command::Find));
        assert_eq!(parsed.profile.log_label(), "42 (Ivan @ivan)");

        let parsed = parse_update(&message(json!({"text": "/next@AnonBot"}))).unwrap();
        assert_eq!(parsed.inbound, Inbound::Command(Command::Next));

        let parsed = parse_update(&message(json!({"text": "/unknown"}))).unwrap();
        assert_eq!(parsed.inbound, Inbound::Content(Payload::text("/unknown")));
    }

    #[test]
    fn test_keyboard_buttons() {
        let parsed = parse_update(&message(json!({"text": VIDEO_NOTE_BUTTON}))).unwrap();
        assert_eq!(
            parsed.inbound,
            Inbound::Command(Command::MediaPrompt(MediaKind::VideoNote))
        );
    }

    #[test]
    fn test_text_and_media() {
        let parsed = parse_update(&message(json!({"text": "hi there"}))).unwrap();
        assert_eq!(parsed.inbound, Inbound::Content(Payload::text("hi there")));

        let parsed = parse_update(&message(json!({"photo": [
            {"file_id": "s", "width": 90, "height": 90},
            {"file_id": "l", "width": 800, "height": 600}
        ]})))
        .unwrap();
        assert_eq!(
            parsed.inbound,
            Inbound::Content(Payload::media("l", MediaKind::Photo))
        );

        let parsed = parse_update(&message(json!({"voice": {"file_id": "v"}}))).unwrap();
        assert_eq!(
            parsed.inbound,
            Inbound::Content(Payload::media("v", MediaKind::Voice))
        );

        let parsed = parse_update(&message(json!({"video_note": {"file_id": "c"}}))).unwrap();
        assert_eq!(
            parsed.inbound,
            Inbound::Content(Payload::media("c", MediaKind::VideoNote))
        );
    }

    #[test]
    fn test_unsupported_updates_are_skipped() {
        assert!(parse_update(&message(json!({}))).is_none());
        assert!(parse_update(&update(json!({"update_id": 1}))).is_none());

        let from_bot = update(json!({"update_id": 2, "message": {
            "message_id": 1,
            "from": {"id": 7, "is_bot": true, "first_name": "Bot"},
            "chat": {"id": 7},
            "text": "/find"
        }}));
        assert!(parse_update(&from_bot).is_none());
    }

    #[test]
    fn test_confirmation_callback() {
        let parsed = parse_update(&update(json!({"update_id": 3, "callback_query": {
            "id": "cb-1",
            "from": {"id": 42, "first_name": "Ivan"},
            "data": CONFIRM_NO
        }})))
        .unwrap();
        assert_eq!(
            parsed.inbound,
            Inbound::Command(Command::Confirm { accept: false })
        );
        assert_eq!(parsed.profile.id, UserId::new(42));
    }

    #[test]
    fn test_unknown_callback_is_skipped_but_still_answerable() {
        let stale = update(json!({"update_id": 4, "callback_query": {
            "id": "cb-2",
            "from": {"id": 42, "first_name": "Ivan"},
            "data": "stale:button"
        }}));
        assert!(parse_update(&stale).is_none());
        assert_eq!(callback_id(&stale), Some("cb-2"));

        let no_data = update(json!({"update_id": 5, "callback_query": {
            "id": "cb-3",
            "from": {"id": 42, "first_name": "Ivan"}
        }}));
        assert!(parse_update(&no_data).is_none());
        assert_eq!(callback_id(&no_data), Some("cb-3"));

        assert_eq!(callback_id(&message(json!({"text": "/find"}))), None);
    }
}
