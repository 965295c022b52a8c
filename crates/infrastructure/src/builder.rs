use std::sync::Arc;

use application::{
    IdentityCache, Matchmaker, MatchmakerDependencies, MessageGateway, Relay, RelayDependencies,
    SessionController, SessionControllerDependencies, SessionSettings, SystemClock, VipRoster,
};
use config::AppConfig;
use domain::UserId;
use thiserror::Error;
use tracing::info;

use crate::{
    poller::UpdatePoller,
    retry::Backoff,
    telegram::{TelegramClient, TelegramError, TelegramGateway},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("telegram client error: {0}")]
    Telegram(#[from] TelegramError),
    #[error("confirmation ttl out of range: {0}s")]
    ConfirmationTtl(u64),
}

/// 装配好的服务集合
#[derive(Clone)]
pub struct Infrastructure {
    pub client: Arc<TelegramClient>,
    pub identity: Arc<IdentityCache>,
    pub matchmaker: Arc<Matchmaker>,
    pub controller: Arc<SessionController>,
    poll_timeout_secs: u64,
    backoff: Backoff,
}

impl Infrastructure {
    pub fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let client = Arc::new(TelegramClient::new(
            &config.telegram.api_url,
            &config.telegram.bot_token,
            config.telegram.poll_timeout(),
        )?);
        let gateway = Arc::new(TelegramGateway::new(client.clone()));
        Self::assemble(config, client, gateway)
    }

    /// 使用指定网关装配，便于替换出站通道
    pub fn assemble(
        config: &AppConfig,
        client: Arc<TelegramClient>,
        gateway: Arc<dyn MessageGateway>,
    ) -> Result<Self, InfrastructureError> {
        let settings = session_settings(config)?;
        let identity = Arc::new(IdentityCache::new());
        let entitlements = Arc::new(VipRoster::from_users(
            config.vip.users.iter().copied().map(UserId::new),
        ));
        info!(vip_users = entitlements.len(), "VIP 名单已加载");

        let matchmaker = Arc::new(Matchmaker::new(MatchmakerDependencies {
            gateway: gateway.clone(),
            identity: identity.clone(),
        }));
        let relay = Arc::new(Relay::new(RelayDependencies {
            matchmaker: matchmaker.clone(),
            gateway: gateway.clone(),
            entitlements: entitlements.clone(),
            identity: identity.clone(),
        }));
        let controller = Arc::new(SessionController::new(SessionControllerDependencies {
            matchmaker: matchmaker.clone(),
            relay,
            gateway,
            identity: identity.clone(),
            entitlements,
            clock: Arc::new(SystemClock),
            settings,
        }));

        Ok(Self {
            client,
            identity,
            matchmaker,
            controller,
            poll_timeout_secs: config.telegram.poll_timeout_secs,
            backoff: Backoff::exponential(
                config.restart.initial_delay(),
                config.restart.max_delay(),
            ),
        })
    }

    pub fn poller(&self) -> UpdatePoller {
        UpdatePoller::new(
            self.client.clone(),
            self.controller.clone(),
            self.poll_timeout_secs,
        )
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff.clone()
    }
}

fn session_settings(config: &AppConfig) -> Result<SessionSettings, InfrastructureError> {
    let secs = config.session.confirmation_ttl_secs;
    let confirmation_ttl = chrono::Duration::from_std(config.session.confirmation_ttl())
        .map_err(|_| InfrastructureError::ConfirmationTtl(secs))?;
    Ok(SessionSettings {
        confirm_destructive: config.session.confirm_destructive,
        confirmation_ttl,
    })
}
