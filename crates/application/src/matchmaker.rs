//! 匹配服务
//!
//! 所有对等待队列、会话注册表和确认请求的修改都在同一把互斥锁内完成，
//! 网关调用一律在释放锁之后进行。

use std::sync::Arc;

use chrono::Duration;
use domain::{
    ConfirmationCheck, DomainError, FindOutcome, MatchState, PendingAction, SessionEvent,
    StopOutcome, Timestamp, Transition, UserId, UserStatus,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    error::ApplicationError,
    gateway::{self, MessageGateway},
    identity::IdentityCache,
    notification::Notification,
};

/// 答复确认请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResolution {
    Missing,
    Expired,
    Declined,
    Stopped(StopOutcome),
    Advanced(FindOutcome),
}

/// 匹配核心的运行时统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchStats {
    pub waiting: usize,
    pub sessions: usize,
    pub pending_confirmations: usize,
}

pub struct MatchmakerDependencies {
    pub gateway: Arc<dyn MessageGateway>,
    pub identity: Arc<IdentityCache>,
}

pub struct Matchmaker {
    state: Mutex<MatchState>,
    deps: MatchmakerDependencies,
}

impl Matchmaker {
    pub fn new(deps: MatchmakerDependencies) -> Self {
        Self {
            state: Mutex::new(MatchState::new()),
            deps,
        }
    }

    pub async fn find(&self, user: UserId) -> Result<FindOutcome, ApplicationError> {
        let label = self.deps.identity.label(user).await;
        info!(user = %label, "用户请求匹配");
        let transition = {
            let mut state = self.state.lock().await;
            state.find(user).map_err(surface)?
        };
        self.log_find(user, transition.outcome, &transition.events)
            .await;
        self.dispatch(&transition.events).await;
        Ok(transition.outcome)
    }

    /// 结束会话。排队中的用户会退出队列，但仍按“不在会话中”返回错误。
    pub async fn stop(&self, user: UserId) -> Result<StopOutcome, ApplicationError> {
        let transition = {
            let mut state = self.state.lock().await;
            stop_locked(&mut state, user)
        };
        let transition = match transition {
            Ok(transition) => transition,
            Err(StopFailure { was_waiting, err }) => {
                if was_waiting {
                    self.log_left_queue(user).await;
                }
                return Err(err);
            }
        };
        self.log_stop(user, transition.outcome).await;
        self.dispatch(&transition.events).await;
        Ok(transition.outcome)
    }

    pub async fn next(&self, user: UserId) -> Result<FindOutcome, ApplicationError> {
        let transition = {
            let mut state = self.state.lock().await;
            state.next(user).map_err(surface)?
        };
        let label = self.deps.identity.label(user).await;
        info!(user = %label, "用户请求更换聊天对象");
        self.log_find(user, transition.outcome, &transition.events)
            .await;
        self.dispatch(&transition.events).await;
        Ok(transition.outcome)
    }

    pub async fn status(&self, user: UserId) -> UserStatus {
        self.state.lock().await.status(user)
    }

    pub async fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.state.lock().await.partner_of(user)
    }

    pub async fn stats(&self) -> MatchStats {
        let state = self.state.lock().await;
        MatchStats {
            waiting: state.queue().len(),
            sessions: state.registry().session_count(),
            pending_confirmations: state.confirmations().len(),
        }
    }

    /// 投递失败后拆除会话，只通知留下的一方。返回是否真的拆除了。
    pub async fn teardown_after_failure(&self, sender: UserId, partner: UserId) -> bool {
        let transition = {
            let mut state = self.state.lock().await;
            state.teardown_after_failure(sender, partner)
        };
        match transition {
            Some(transition) => {
                let sender_label = self.deps.identity.label(sender).await;
                let partner_label = self.deps.identity.label(partner).await;
                info!(
                    sender = %sender_label,
                    partner = %partner_label,
                    "投递失败，会话已拆除"
                );
                self.dispatch(&transition.events).await;
                true
            }
            None => false,
        }
    }

    /// 登记 stop/next 的确认请求，返回请求所针对的会话伙伴。
    /// 不在会话中时不登记；排队中的用户执行 stop 仍会退出队列。
    pub async fn request_confirmation(
        &self,
        user: UserId,
        action: PendingAction,
        now: Timestamp,
        ttl: Duration,
    ) -> Result<UserId, ApplicationError> {
        let staged = {
            let mut state = self.state.lock().await;
            let pruned = state.confirmations_mut().prune_expired(now, ttl);
            if pruned > 0 {
                debug!(pruned, "清理过期的确认请求");
            }
            match state.partner_of(user) {
                Some(partner) => {
                    state
                        .confirmations_mut()
                        .stage(user, action, partner, now);
                    Ok(partner)
                }
                None if action == PendingAction::Stop => {
                    // 没有伙伴时 stop 只会让排队的用户出队，不会成功
                    let failure = stop_locked(&mut state, user)
                        .err()
                        .unwrap_or_else(|| StopFailure::not_in_session(user));
                    Err(failure)
                }
                None => Err(StopFailure::not_in_session(user)),
            }
        };
        match staged {
            Ok(partner) => Ok(partner),
            Err(StopFailure { was_waiting, err }) => {
                if was_waiting {
                    self.log_left_queue(user).await;
                }
                Err(err)
            }
        }
    }

    /// 答复确认请求。校验与执行在同一次加锁内完成，过时的请求不会生效。
    pub async fn resolve_confirmation(
        &self,
        user: UserId,
        accept: bool,
        now: Timestamp,
        ttl: Duration,
    ) -> Result<ConfirmationResolution, ApplicationError> {
        let (resolution, events) = {
            let mut state = self.state.lock().await;
            let partner = state.partner_of(user);
            let check = state.confirmations_mut().take(user, partner, now, ttl);
            match check {
                ConfirmationCheck::Missing => (ConfirmationResolution::Missing, Vec::new()),
                ConfirmationCheck::Expired(_) | ConfirmationCheck::Stale(_) => {
                    (ConfirmationResolution::Expired, Vec::new())
                }
                ConfirmationCheck::Valid(_) if !accept => {
                    (ConfirmationResolution::Declined, Vec::new())
                }
                ConfirmationCheck::Valid(pending) => match pending.action {
                    PendingAction::Stop => {
                        let transition = state.stop(user).map_err(surface)?;
                        (
                            ConfirmationResolution::Stopped(transition.outcome),
                            transition.events,
                        )
                    }
                    PendingAction::Next => {
                        let transition = state.next(user).map_err(surface)?;
                        (
                            ConfirmationResolution::Advanced(transition.outcome),
                            transition.events,
                        )
                    }
                },
            }
        };
        match resolution {
            ConfirmationResolution::Stopped(outcome) => self.log_stop(user, outcome).await,
            ConfirmationResolution::Advanced(outcome) => {
                self.log_find(user, outcome, &events).await
            }
            _ => {}
        }
        self.dispatch(&events).await;
        Ok(resolution)
    }

    /// 撤销用户的待确认请求（被任何新的入站事件取代）
    pub async fn clear_confirmation(&self, user: UserId) -> bool {
        let mut state = self.state.lock().await;
        state.confirmations_mut().clear(user).is_some()
    }

    async fn dispatch(&self, events: &[SessionEvent]) {
        for event in events {
            gateway::notify(
                self.deps.gateway.as_ref(),
                event.recipient(),
                Notification::from(event),
            )
            .await;
        }
    }

    async fn log_find(&self, user: UserId, outcome: FindOutcome, events: &[SessionEvent]) {
        let identity = &self.deps.identity;
        let label = identity.label(user).await;
        match outcome {
            FindOutcome::Matched { partner } => {
                let partner_label = identity.label(partner).await;
                info!(user = %label, partner = %partner_label, "创建会话");
            }
            FindOutcome::Searching => {
                let queue_len = events.iter().find_map(|event| match event {
                    SessionEvent::Searching { queue_len, .. } => Some(*queue_len),
                    _ => None,
                });
                if let Some(queue_len) = queue_len {
                    info!(user = %label, queue_len, "用户加入等待队列");
                }
            }
        }
    }

    async fn log_stop(&self, user: UserId, outcome: StopOutcome) {
        let identity = &self.deps.identity;
        let label = identity.label(user).await;
        match outcome {
            StopOutcome::Ended { partner } => {
                let partner_label = identity.label(partner).await;
                info!(user = %label, partner = %partner_label, "会话结束");
            }
        }
    }

    async fn log_left_queue(&self, user: UserId) {
        let label = self.deps.identity.label(user).await;
        info!(user = %label, "用户退出等待队列");
    }
}

struct StopFailure {
    /// 失败前用户在排队，stop 已把他移出队列
    was_waiting: bool,
    err: ApplicationError,
}

impl StopFailure {
    fn not_in_session(user: UserId) -> Self {
        Self {
            was_waiting: false,
            err: DomainError::not_in_session(user).into(),
        }
    }
}

fn stop_locked(
    state: &mut MatchState,
    user: UserId,
) -> Result<Transition<StopOutcome>, StopFailure> {
    let was_waiting = state.status(user) == UserStatus::Waiting;
    state.stop(user).map_err(|err| StopFailure {
        was_waiting,
        err: surface(err),
    })
}

/// 不变量破坏必须高调记录，其余错误原样交给调用方
fn surface(err: DomainError) -> ApplicationError {
    if err.is_invariant_violation() {
        error!(error = %err, "会话注册表不变量被破坏");
    }
    ApplicationError::Domain(err)
}
