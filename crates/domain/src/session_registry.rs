use std::collections::HashMap;

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::UserId;

/// 活跃会话注册表
///
/// 每个会话以两条互指的记录保存：`a -> b` 与 `b -> a`，二者同时写入、同时删除。
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    partners: HashMap<UserId, UserId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立会话。任一方已有记录时失败，且不写入任何一侧。
    pub fn pair(&mut self, a: UserId, b: UserId) -> DomainResult<()> {
        if a == b || self.partners.contains_key(&a) {
            return Err(DomainError::already_paired(a));
        }
        if self.partners.contains_key(&b) {
            return Err(DomainError::already_paired(b));
        }
        self.partners.insert(a, b);
        self.partners.insert(b, a);
        Ok(())
    }

    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.partners.get(&user).copied()
    }

    pub fn is_paired(&self, user: UserId) -> bool {
        self.partners.contains_key(&user)
    }

    /// 拆除用户所在会话的两条记录，返回原伙伴。重复调用是无操作。
    pub fn unpair(&mut self, user: UserId) -> Option<UserId> {
        let partner = self.partners.remove(&user)?;
        if self.partners.get(&partner) == Some(&user) {
            self.partners.remove(&partner);
        }
        Some(partner)
    }

    /// 当前会话数量
    pub fn session_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// 以 (较小 id, 较大 id) 的形式列出所有会话
    #[cfg(test)]
    pub(crate) fn sessions(&self) -> Vec<(UserId, UserId)> {
        let mut pairs: Vec<_> = self
            .partners
            .iter()
            .filter(|(a, b)| a < b)
            .map(|(&a, &b)| (a, b))
            .collect();
        pairs.sort();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(id: i64) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn pair_installs_both_directions() {
        let mut registry = SessionRegistry::new();
        registry.pair(uid(1), uid(2)).unwrap();

        assert_eq!(registry.partner_of(uid(1)), Some(uid(2)));
        assert_eq!(registry.partner_of(uid(2)), Some(uid(1)));
        assert_eq!(registry.session_count(), 1);
        assert_eq!(registry.sessions(), vec![(uid(1), uid(2))]);
    }

    #[test]
    fn pair_rejects_registered_users_without_partial_writes() {
        let mut registry = SessionRegistry::new();
        registry.pair(uid(1), uid(2)).unwrap();

        assert_eq!(
            registry.pair(uid(3), uid(2)),
            Err(DomainError::already_paired(uid(2)))
        );
        assert!(!registry.is_paired(uid(3)));
        assert_eq!(
            registry.pair(uid(1), uid(4)),
            Err(DomainError::already_paired(uid(1)))
        );
        assert!(!registry.is_paired(uid(4)));
    }

    #[test]
    fn pair_rejects_self() {
        let mut registry = SessionRegistry::new();
        assert!(registry.pair(uid(1), uid(1)).is_err());
        assert!(!registry.is_paired(uid(1)));
    }

    #[test]
    fn unpair_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.pair(uid(1), uid(2)).unwrap();

        assert_eq!(registry.unpair(uid(2)), Some(uid(1)));
        assert_eq!(registry.partner_of(uid(1)), None);
        assert_eq!(registry.unpair(uid(2)), None);
        assert_eq!(registry.unpair(uid(1)), None);
        assert_eq!(registry.session_count(), 0);
    }
}
