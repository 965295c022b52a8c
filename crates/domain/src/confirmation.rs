use std::collections::HashMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId};

/// 需要二次确认的破坏性操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Stop,
    Next,
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingAction::Stop => f.write_str("stop"),
            PendingAction::Next => f.write_str("next"),
        }
    }
}

/// 等待用户答复的确认请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub action: PendingAction,
    /// 发起请求时的会话伙伴，答复时据此判断请求是否已过时
    pub partner: UserId,
    pub requested_at: Timestamp,
}

/// 答复确认时的判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationCheck {
    Valid(PendingConfirmation),
    Expired(PendingConfirmation),
    /// 会话已变化（伙伴不同或已不在会话中）
    Stale(PendingConfirmation),
    Missing,
}

/// 按用户保存的待确认操作，每个用户最多一条
#[derive(Debug, Default, Clone)]
pub struct ConfirmationBook {
    pending: HashMap<UserId, PendingConfirmation>,
}

impl ConfirmationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记确认请求，覆盖该用户之前的请求
    pub fn stage(
        &mut self,
        user: UserId,
        action: PendingAction,
        partner: UserId,
        now: Timestamp,
    ) -> Option<PendingConfirmation> {
        self.pending.insert(
            user,
            PendingConfirmation {
                action,
                partner,
                requested_at: now,
            },
        )
    }

    pub fn get(&self, user: UserId) -> Option<&PendingConfirmation> {
        self.pending.get(&user)
    }

    pub fn clear(&mut self, user: UserId) -> Option<PendingConfirmation> {
        self.pending.remove(&user)
    }

    /// 取出并校验确认请求。无论结果如何，该用户的请求都会被清除。
    pub fn take(
        &mut self,
        user: UserId,
        current_partner: Option<UserId>,
        now: Timestamp,
        ttl: Duration,
    ) -> ConfirmationCheck {
        let Some(pending) = self.pending.remove(&user) else {
            return ConfirmationCheck::Missing;
        };
        if now - pending.requested_at > ttl {
            ConfirmationCheck::Expired(pending)
        } else if current_partner != Some(pending.partner) {
            ConfirmationCheck::Stale(pending)
        } else {
            ConfirmationCheck::Valid(pending)
        }
    }

    /// 丢弃超过 TTL 的请求，返回丢弃的条数
    pub fn prune_expired(&mut self, now: Timestamp, ttl: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| now - pending.requested_at <= ttl);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn uid(id: i64) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn newer_request_supersedes_older() {
        let mut book = ConfirmationBook::new();
        let now = Utc::now();
        book.stage(uid(1), PendingAction::Stop, uid(2), now);
        let previous = book.stage(uid(1), PendingAction::Next, uid(2), now);

        assert_eq!(previous.map(|p| p.action), Some(PendingAction::Stop));
        assert_eq!(book.get(uid(1)).map(|p| p.action), Some(PendingAction::Next));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn take_validates_partner_and_ttl() {
        let ttl = Duration::seconds(60);
        let now = Utc::now();
        let mut book = ConfirmationBook::new();

        book.stage(uid(1), PendingAction::Stop, uid(2), now);
        assert!(matches!(
            book.take(uid(1), Some(uid(2)), now, ttl),
            ConfirmationCheck::Valid(_)
        ));
        assert_eq!(
            book.take(uid(1), Some(uid(2)), now, ttl),
            ConfirmationCheck::Missing
        );

        book.stage(uid(1), PendingAction::Stop, uid(2), now);
        assert!(matches!(
            book.take(uid(1), Some(uid(3)), now, ttl),
            ConfirmationCheck::Stale(_)
        ));

        book.stage(uid(1), PendingAction::Next, uid(2), now);
        assert!(matches!(
            book.take(uid(1), None, now, ttl),
            ConfirmationCheck::Stale(_)
        ));

        book.stage(uid(1), PendingAction::Next, uid(2), now);
        assert!(matches!(
            book.take(uid(1), Some(uid(2)), now + Duration::seconds(61), ttl),
            ConfirmationCheck::Expired(_)
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn prune_drops_only_expired_requests() {
        let ttl = Duration::seconds(60);
        let now = Utc::now();
        let mut book = ConfirmationBook::new();
        book.stage(uid(1), PendingAction::Stop, uid(2), now - Duration::seconds(120));
        book.stage(uid(3), PendingAction::Next, uid(4), now - Duration::seconds(60));
        book.stage(uid(5), PendingAction::Stop, uid(6), now);

        assert_eq!(book.prune_expired(now, ttl), 1);
        assert!(book.get(uid(1)).is_none());
        assert!(book.get(uid(3)).is_some());
        assert_eq!(book.len(), 2);
        assert_eq!(book.prune_expired(now, ttl), 0);
    }
}
