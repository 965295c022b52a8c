use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 统一的时间戳类型。
pub type Timestamp = DateTime<Utc>;

/// 用户唯一标识，由传输层提供，仅在进程生命周期内有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// 媒体类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Voice,
    VideoNote,
}

impl MediaKind {
    /// 该媒体类型是否仅对 VIP 用户开放
    pub fn requires_vip(self) -> bool {
        matches!(self, MediaKind::VideoNote)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Voice => "voice",
            MediaKind::VideoNote => "video_note",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 传输层的媒体引用（例如 Telegram 的 file_id），对核心不透明。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次转发的内容单元。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text { text: String },
    Media { reference: MediaRef, kind: MediaKind },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }

    pub fn media(reference: impl Into<String>, kind: MediaKind) -> Self {
        Payload::Media {
            reference: MediaRef::new(reference),
            kind,
        }
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            Payload::Text { .. } => None,
            Payload::Media { kind, .. } => Some(*kind),
        }
    }

    /// 日志摘要：文本超过 50 个字符时截断
    pub fn summary(&self) -> String {
        match self {
            Payload::Text { text } => {
                if text.chars().count() <= 50 {
                    text.clone()
                } else {
                    let head: String = text.chars().take(50).collect();
                    format!("{head}...")
                }
            }
            Payload::Media { kind, .. } => format!("<{kind}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_video_note_requires_vip() {
        assert!(MediaKind::VideoNote.requires_vip());
        assert!(!MediaKind::Photo.requires_vip());
        assert!(!MediaKind::Voice.requires_vip());
    }

    #[test]
    fn summary_truncates_long_text() {
        let long = "я".repeat(60);
        let summary = Payload::text(long).summary();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 53);

        assert_eq!(Payload::text("hi").summary(), "hi");
        assert_eq!(
            Payload::media("file-1", MediaKind::Voice).summary(),
            "<voice>"
        );
    }
}
