use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 传输层提供的用户展示信息，仅用于日志和通知文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: Option<String>) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = last_name;
        self
    }

    /// 日志标签，形如 `42 (Ivan Petrov @ivan)`
    pub fn log_label(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("未知");
        let last = self
            .last_name
            .as_deref()
            .map(|name| format!(" {name}"))
            .unwrap_or_default();
        let handle = self
            .username
            .as_deref()
            .map(|name| format!("@{name}"))
            .unwrap_or_else(|| "无用户名".to_string());
        format!("{} ({first}{last} {handle})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_label_includes_available_parts() {
        let profile = UserProfile::new(UserId::new(42))
            .with_name("Ivan", Some("Petrov".into()))
            .with_username("ivan");
        assert_eq!(profile.log_label(), "42 (Ivan Petrov @ivan)");

        let bare = UserProfile::new(UserId::new(7));
        assert_eq!(bare.log_label(), "7 (未知 无用户名)");
    }
}
