//! 会话生命周期控制器
//!
//! 把网关解析出的入站事件转成匹配/转发操作，并把类型化的结果翻译成通知。

use std::sync::Arc;

use chrono::Duration;
use domain::{DomainError, MediaKind, Payload, PendingAction, UserId, UserProfile};
use tracing::info;

use crate::{
    clock::Clock,
    entitlement::EntitlementPolicy,
    error::ApplicationError,
    gateway::{self, MessageGateway},
    identity::IdentityCache,
    matchmaker::{ConfirmationResolution, Matchmaker},
    notification::Notification,
    relay::Relay,
};

/// 用户命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Find,
    Stop,
    Next,
    Vip,
    Health,
    Confirm { accept: bool },
    MediaPrompt(MediaKind),
}

/// 网关交给核心的一个入站事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Content(Payload),
}

/// 会话相关的可配置行为
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// stop/next 是否需要二次确认
    pub confirm_destructive: bool,
    pub confirmation_ttl: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            confirm_destructive: false,
            confirmation_ttl: Duration::seconds(60),
        }
    }
}

pub struct SessionControllerDependencies {
    pub matchmaker: Arc<Matchmaker>,
    pub relay: Arc<Relay>,
    pub gateway: Arc<dyn MessageGateway>,
    pub identity: Arc<IdentityCache>,
    pub entitlements: Arc<dyn EntitlementPolicy>,
    pub clock: Arc<dyn Clock>,
    pub settings: SessionSettings,
}

pub struct SessionController {
    deps: SessionControllerDependencies,
}

impl SessionController {
    pub fn new(deps: SessionControllerDependencies) -> Self {
        Self { deps }
    }

    /// 处理一个入站事件。面向用户的错误都会转成通知，
    /// 只有不变量破坏会作为错误返回。
    pub async fn handle(
        &self,
        profile: UserProfile,
        inbound: Inbound,
    ) -> Result<(), ApplicationError> {
        let user = profile.id;
        self.deps.identity.remember(profile).await;

        // 任何新请求都会取代尚未答复的确认
        if !matches!(inbound, Inbound::Command(Command::Confirm { .. })) {
            self.deps.matchmaker.clear_confirmation(user).await;
        }

        let result = match inbound {
            Inbound::Command(command) => self.handle_command(user, command).await,
            Inbound::Content(payload) => self
                .deps
                .relay
                .relay(user, payload)
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) => self.translate(user, err).await,
        }
    }

    async fn handle_command(&self, user: UserId, command: Command) -> Result<(), ApplicationError> {
        match command {
            Command::Start => {
                let label = self.deps.identity.label(user).await;
                info!(user = %label, "用户启动了机器人");
                self.notify(user, Notification::Welcome).await;
            }
            Command::Health => {
                let label = self.deps.identity.label(user).await;
                info!(user = %label, "健康检查");
                self.notify(user, Notification::Health).await;
            }
            Command::Vip => {
                let active = self.deps.entitlements.is_vip(user).await;
                self.notify(user, Notification::VipInfo { active }).await;
            }
            Command::MediaPrompt(kind) => {
                let notification = if self.deps.entitlements.may_send(user, kind).await {
                    Notification::MediaPrompt { kind }
                } else {
                    Notification::VipRequired { kind }
                };
                self.notify(user, notification).await;
            }
            Command::Find => {
                self.deps.matchmaker.find(user).await?;
            }
            Command::Stop => self.request(user, PendingAction::Stop).await?,
            Command::Next => self.request(user, PendingAction::Next).await?,
            Command::Confirm { accept } => self.confirm(user, accept).await?,
        }
        Ok(())
    }

    async fn request(&self, user: UserId, action: PendingAction) -> Result<(), ApplicationError> {
        if !self.deps.settings.confirm_destructive {
            return self.execute(user, action).await;
        }
        self.deps
            .matchmaker
            .request_confirmation(
                user,
                action,
                self.deps.clock.now(),
                self.deps.settings.confirmation_ttl,
            )
            .await?;
        self.notify(user, Notification::ConfirmRequest { action }).await;
        Ok(())
    }

    async fn execute(&self, user: UserId, action: PendingAction) -> Result<(), ApplicationError> {
        match action {
            PendingAction::Stop => {
                self.deps.matchmaker.stop(user).await?;
            }
            PendingAction::Next => {
                self.deps.matchmaker.next(user).await?;
            }
        }
        Ok(())
    }

    async fn confirm(&self, user: UserId, accept: bool) -> Result<(), ApplicationError> {
        let resolution = self
            .deps
            .matchmaker
            .resolve_confirmation(
                user,
                accept,
                self.deps.clock.now(),
                self.deps.settings.confirmation_ttl,
            )
            .await?;
        match resolution {
            ConfirmationResolution::Missing => {
                self.notify(user, Notification::NothingToConfirm).await
            }
            ConfirmationResolution::Expired => {
                self.notify(user, Notification::ConfirmationExpired).await
            }
            ConfirmationResolution::Declined => {
                self.notify(user, Notification::ConfirmationCancelled)
                    .await
            }
            ConfirmationResolution::Stopped(_) | ConfirmationResolution::Advanced(_) => {}
        }
        Ok(())
    }

    async fn translate(&self, user: UserId, err: ApplicationError) -> Result<(), ApplicationError> {
        match err {
            ApplicationError::Domain(DomainError::AlreadyInSession { .. }) => {
                self.notify(user, Notification::AlreadyInSession).await;
                Ok(())
            }
            ApplicationError::Domain(DomainError::NotInSession { .. }) => {
                self.notify(user, Notification::NotInSession).await;
                Ok(())
            }
            ApplicationError::VipRequired { kind } => {
                self.notify(user, Notification::VipRequired { kind }).await;
                Ok(())
            }
            // 会话已由转发路径拆除，留下的一方已收到通知
            ApplicationError::Delivery(_) => Ok(()),
            err @ ApplicationError::Domain(DomainError::AlreadyPaired { .. }) => Err(err),
        }
    }

    async fn notify(&self, user: UserId, notification: Notification) {
        gateway::notify(self.deps.gateway.as_ref(), user, notification).await;
    }
}
