use std::sync::Arc;

use domain::{DomainError, Payload, UserId};
use tracing::{error, info};

use crate::{
    entitlement::EntitlementPolicy,
    error::ApplicationError,
    gateway::{MessageGateway, Outbound},
    identity::IdentityCache,
    matchmaker::Matchmaker,
};

/// 转发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered { partner: UserId },
}

pub struct RelayDependencies {
    pub matchmaker: Arc<Matchmaker>,
    pub gateway: Arc<dyn MessageGateway>,
    pub entitlements: Arc<dyn EntitlementPolicy>,
    pub identity: Arc<IdentityCache>,
}

/// 把一条内容从会话一方转发给另一方
pub struct Relay {
    deps: RelayDependencies,
}

impl Relay {
    pub fn new(deps: RelayDependencies) -> Self {
        Self { deps }
    }

    /// 只尝试一次投递。投递失败视为会话不可继续：立即拆除会话并通知留下的一方，
    /// 发送方不会从这条路径收到额外通知。
    pub async fn relay(
        &self,
        sender: UserId,
        payload: Payload,
    ) -> Result<RelayOutcome, ApplicationError> {
        if let Some(kind) = payload.media_kind() {
            if !self.deps.entitlements.may_send(sender, kind).await {
                return Err(ApplicationError::VipRequired { kind });
            }
        }

        let partner = self
            .deps
            .matchmaker
            .partner_of(sender)
            .await
            .ok_or_else(|| DomainError::not_in_session(sender))?;

        let summary = payload.summary();
        match self
            .deps
            .gateway
            .deliver(partner, Outbound::Relay(payload))
            .await
        {
            Ok(()) => {
                let sender_label = self.deps.identity.label(sender).await;
                let partner_label = self.deps.identity.label(partner).await;
                info!(
                    sender = %sender_label,
                    partner = %partner_label,
                    content = %summary,
                    "消息已转发"
                );
                Ok(RelayOutcome::Delivered { partner })
            }
            Err(err) => {
                error!(
                    sender = %sender,
                    partner = %partner,
                    error = %err,
                    "转发失败，结束会话"
                );
                self.deps
                    .matchmaker
                    .teardown_after_failure(sender, partner)
                    .await;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::memory::VipRoster;
    use crate::gateway::{DeliveryError, MockMessageGateway};
    use crate::local_gateway::RecordingGateway;
    use crate::matchmaker::MatchmakerDependencies;
    use crate::notification::Notification;
    use domain::{MediaKind, UserStatus};
    use mockall::predicate::eq;

    fn uid(id: i64) -> UserId {
        UserId::new(id)
    }

    async fn paired(gateway: Arc<dyn MessageGateway>) -> (Relay, Arc<Matchmaker>) {
        let identity = Arc::new(IdentityCache::new());
        let matchmaker = Arc::new(Matchmaker::new(MatchmakerDependencies {
            gateway: gateway.clone(),
            identity: identity.clone(),
        }));
        matchmaker.find(uid(1)).await.unwrap();
        matchmaker.find(uid(2)).await.unwrap();
        let relay = Relay::new(RelayDependencies {
            matchmaker: matchmaker.clone(),
            gateway,
            entitlements: Arc::new(VipRoster::from_users([uid(1)])),
            identity,
        });
        (relay, matchmaker)
    }

    #[tokio::test]
    async fn delivers_to_partner() {
        let gateway = Arc::new(RecordingGateway::new());
        let (relay, _) = paired(gateway.clone()).await;

        let outcome = relay.relay(uid(2), Payload::text("hello")).await.unwrap();
        assert_eq!(outcome, RelayOutcome::Delivered { partner: uid(1) });
        assert_eq!(gateway.relayed_to(uid(1)), vec![Payload::text("hello")]);
    }

    #[tokio::test]
    async fn failed_delivery_is_attempted_once_and_tears_down() {
        let mut gateway = MockMessageGateway::new();
        // 配对时的两条通知
        gateway
            .expect_deliver()
            .withf(|_, message| matches!(message, Outbound::Notice(Notification::Searching)))
            .times(1)
            .returning(|_, _| Ok(()));
        gateway
            .expect_deliver()
            .withf(|_, message| matches!(message, Outbound::Notice(Notification::PartnerFound)))
            .times(2)
            .returning(|_, _| Ok(()));
        // 唯一一次转发尝试
        gateway
            .expect_deliver()
            .with(eq(uid(2)), eq(Outbound::Relay(Payload::text("hello"))))
            .times(1)
            .returning(|recipient, _| Err(DeliveryError::failed(recipient, "blocked")));
        // 只有留下的一方收到“对方已离开”
        gateway
            .expect_deliver()
            .with(eq(uid(2)), eq(Outbound::Notice(Notification::PartnerLeft)))
            .times(1)
            .returning(|_, _| Ok(()));

        let (relay, matchmaker) = paired(Arc::new(gateway)).await;
        let err = relay
            .relay(uid(1), Payload::text("hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Delivery(_)));
        assert_eq!(matchmaker.status(uid(1)).await, UserStatus::Idle);
        assert_eq!(matchmaker.status(uid(2)).await, UserStatus::Idle);
    }

    #[tokio::test]
    async fn vip_media_is_checked_before_delivery() {
        let gateway = Arc::new(RecordingGateway::new());
        let (relay, _) = paired(gateway.clone()).await;
        gateway.clear();

        let err = relay
            .relay(uid(2), Payload::media("circle", MediaKind::VideoNote))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::VipRequired {
                kind: MediaKind::VideoNote
            }
        ));
        assert_eq!(gateway.attempts(), 0);

        relay
            .relay(uid(1), Payload::media("circle", MediaKind::VideoNote))
            .await
            .unwrap();
        assert_eq!(gateway.relayed_to(uid(2)).len(), 1);
    }

    #[tokio::test]
    async fn relay_requires_session() {
        let gateway = Arc::new(RecordingGateway::new());
        let (relay, matchmaker) = paired(gateway.clone()).await;
        matchmaker.stop(uid(1)).await.unwrap();

        let err = relay.relay(uid(1), Payload::text("hi")).await.unwrap_err();
        assert!(err.is_not_in_session());
    }
}
