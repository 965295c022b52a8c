use std::collections::{HashMap, VecDeque};

use domain::{UserId, UserProfile};
use tokio::sync::RwLock;

/// 默认最多缓存的用户数
pub const DEFAULT_IDENTITY_CAPACITY: usize = 10_000;

/// 用户展示信息缓存
///
/// 只服务于日志和通知文本，不参与任何匹配决策。容量有上限，
/// 满了之后按首次记录的顺序淘汰最早的用户。
#[derive(Debug)]
pub struct IdentityCache {
    capacity: usize,
    profiles: RwLock<Profiles>,
}

#[derive(Debug, Default)]
struct Profiles {
    by_user: HashMap<UserId, UserProfile>,
    /// 首次记录顺序，队首最先淘汰
    order: VecDeque<UserId>,
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_IDENTITY_CAPACITY)
    }
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            profiles: RwLock::new(Profiles::default()),
        }
    }

    /// 记录最新的用户信息（每个入站事件都会调用）
    pub async fn remember(&self, profile: UserProfile) {
        let mut profiles = self.profiles.write().await;
        let user = profile.id;
        if profiles.by_user.insert(user, profile).is_some() {
            return;
        }
        profiles.order.push_back(user);
        while profiles.order.len() > self.capacity {
            if let Some(evicted) = profiles.order.pop_front() {
                profiles.by_user.remove(&evicted);
            }
        }
    }

    pub async fn get(&self, user: UserId) -> Option<UserProfile> {
        let profiles = self.profiles.read().await;
        profiles.by_user.get(&user).cloned()
    }

    /// 日志标签，未知用户仅显示 id
    pub async fn label(&self, user: UserId) -> String {
        let profiles = self.profiles.read().await;
        match profiles.by_user.get(&user) {
            Some(profile) => profile.log_label(),
            None => UserProfile::new(user).log_label(),
        }
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.by_user.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.by_user.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remember_overwrites_previous_profile() {
        let cache = IdentityCache::new();
        let user = UserId::new(5);

        cache
            .remember(UserProfile::new(user).with_username("old"))
            .await;
        cache
            .remember(UserProfile::new(user).with_username("new"))
            .await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(
            cache.get(user).await.and_then(|p| p.username),
            Some("new".to_string())
        );
        assert!(cache.label(user).await.contains("@new"));
    }

    #[tokio::test]
    async fn label_falls_back_to_bare_id() {
        let cache = IdentityCache::new();
        assert!(cache.is_empty().await);
        assert!(cache.label(UserId::new(9)).await.starts_with("9 "));
    }

    #[tokio::test]
    async fn oldest_profiles_are_evicted_at_capacity() {
        let cache = IdentityCache::with_capacity(2);
        for id in 1..=3 {
            cache.remember(UserProfile::new(UserId::new(id))).await;
        }
        // 更新已有用户不会改变淘汰顺序，也不会挤掉别人
        cache
            .remember(UserProfile::new(UserId::new(2)).with_username("two"))
            .await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(UserId::new(1)).await.is_none());
        assert!(cache.label(UserId::new(2)).await.contains("@two"));
        assert!(cache.get(UserId::new(3)).await.is_some());

        for id in 4..=100 {
            cache.remember(UserProfile::new(UserId::new(id))).await;
        }
        assert_eq!(cache.len().await, 2);
    }
}
