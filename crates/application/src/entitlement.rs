use domain::{MediaKind, UserId};

/// VIP 权益查询接口
///
/// 权益存储属于外部协作方，核心只关心“某用户能否发送某类媒体”。
#[async_trait::async_trait]
pub trait EntitlementPolicy: Send + Sync {
    /// 用户是否拥有 VIP 身份
    async fn is_vip(&self, user: UserId) -> bool;

    /// 用户是否可以发送该类媒体
    async fn may_send(&self, user: UserId, kind: MediaKind) -> bool {
        !kind.requires_vip() || self.is_vip(user).await
    }
}

/// 内存实现的 VIP 名单（启动时从配置加载）
pub mod memory {
    use super::*;
    use std::collections::HashSet;

    /// 启动后不再变化
    #[derive(Debug, Default)]
    pub struct VipRoster {
        users: HashSet<UserId>,
    }

    impl VipRoster {
        pub fn from_users(users: impl IntoIterator<Item = UserId>) -> Self {
            Self {
                users: users.into_iter().collect(),
            }
        }

        pub fn len(&self) -> usize {
            self.users.len()
        }

        pub fn is_empty(&self) -> bool {
            self.users.is_empty()
        }
    }

    #[async_trait::async_trait]
    impl EntitlementPolicy for VipRoster {
        async fn is_vip(&self, user: UserId) -> bool {
            self.users.contains(&user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::VipRoster;
    use super::*;

    #[tokio::test]
    async fn video_notes_are_gated_by_vip() {
        let roster = VipRoster::from_users([UserId::new(1)]);
        let regular = UserId::new(2);

        assert!(roster.may_send(UserId::new(1), MediaKind::VideoNote).await);
        assert!(!roster.may_send(regular, MediaKind::VideoNote).await);
        assert!(roster.may_send(regular, MediaKind::Photo).await);
        assert!(roster.may_send(regular, MediaKind::Voice).await);
        assert!(!roster.is_vip(regular).await);
        assert_eq!(roster.len(), 1);
    }
}
