//! 匹配状态机
//!
//! 每个用户的状态：`Idle -> Waiting -> Paired -> Idle`。等待队列、会话注册表和
//! 待确认请求作为一个整体保存在 [`MatchState`] 中，每个操作都是一次完整的同步
//! 变更，由调用方保证串行执行。操作产生的事件按顺序返回，由上层在释放锁之后派发。

use serde::{Deserialize, Serialize};

use crate::confirmation::ConfirmationBook;
use crate::errors::{DomainError, DomainResult};
use crate::session_registry::SessionRegistry;
use crate::value_objects::UserId;
use crate::waiting_queue::WaitingQueue;

/// 对外可见的用户状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UserStatus {
    Idle,
    Waiting,
    Paired { partner: UserId },
}

/// find / next 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindOutcome {
    Matched { partner: UserId },
    Searching,
}

/// stop 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Ended { partner: UserId },
}

/// 状态变更产生的通知事件，`user` 始终是接收方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PartnerFound { user: UserId, partner: UserId },
    Searching { user: UserId, queue_len: usize },
    SessionEnded { user: UserId, partner: UserId },
    PartnerLeft { user: UserId, partner: UserId },
}

impl SessionEvent {
    pub fn recipient(&self) -> UserId {
        match *self {
            SessionEvent::PartnerFound { user, .. }
            | SessionEvent::Searching { user, .. }
            | SessionEvent::SessionEnded { user, .. }
            | SessionEvent::PartnerLeft { user, .. } => user,
        }
    }
}

/// 一次状态变更的结果及其事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub outcome: T,
    pub events: Vec<SessionEvent>,
}

impl<T> Transition<T> {
    fn new(outcome: T, events: Vec<SessionEvent>) -> Self {
        Self { outcome, events }
    }
}

/// 匹配核心的全部内存状态
#[derive(Debug, Default)]
pub struct MatchState {
    queue: WaitingQueue,
    registry: SessionRegistry,
    confirmations: ConfirmationBook,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, user: UserId) -> UserStatus {
        if let Some(partner) = self.registry.partner_of(user) {
            UserStatus::Paired { partner }
        } else if self.queue.contains(user) {
            UserStatus::Waiting
        } else {
            UserStatus::Idle
        }
    }

    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.registry.partner_of(user)
    }

    pub fn queue(&self) -> &WaitingQueue {
        &self.queue
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn confirmations(&self) -> &ConfirmationBook {
        &self.confirmations
    }

    pub fn confirmations_mut(&mut self) -> &mut ConfirmationBook {
        &mut self.confirmations
    }

    /// 请求匹配。已在等待中时为无操作，仍返回 `Searching`。
    pub fn find(&mut self, user: UserId) -> DomainResult<Transition<FindOutcome>> {
        if self.registry.is_paired(user) {
            return Err(DomainError::already_in_session(user));
        }
        if self.queue.contains(user) {
            return Ok(Transition::new(FindOutcome::Searching, Vec::new()));
        }
        let mut events = Vec::new();
        let outcome = self.match_or_enqueue(user, &mut events)?;
        Ok(Transition::new(outcome, events))
    }

    /// 结束会话：发起方收到“会话结束”，对方收到“对方已离开”。
    ///
    /// 不在会话中一律返回 `NotInSession`；仍在排队的用户同时退出队列。
    pub fn stop(&mut self, user: UserId) -> DomainResult<Transition<StopOutcome>> {
        if let Some(partner) = self.teardown(user) {
            let events = vec![
                SessionEvent::SessionEnded { user, partner },
                SessionEvent::PartnerLeft {
                    user: partner,
                    partner: user,
                },
            ];
            return Ok(Transition::new(StopOutcome::Ended { partner }, events));
        }
        if self.queue.remove(user) {
            self.confirmations.clear(user);
        }
        Err(DomainError::not_in_session(user))
    }

    /// 换人：拆除当前会话后立即进入匹配步骤，中间不存在可观察的 `Idle`。
    pub fn next(&mut self, user: UserId) -> DomainResult<Transition<FindOutcome>> {
        let partner = self
            .teardown(user)
            .ok_or_else(|| DomainError::not_in_session(user))?;
        let mut events = vec![SessionEvent::PartnerLeft {
            user: partner,
            partner: user,
        }];
        let outcome = self.match_or_enqueue(user, &mut events)?;
        Ok(Transition::new(outcome, events))
    }

    /// 投递失败后的会话拆除。
    ///
    /// 仅当 `sender` 仍与 `partner` 配对时才拆除，只通知留下的一方。
    pub fn teardown_after_failure(
        &mut self,
        sender: UserId,
        partner: UserId,
    ) -> Option<Transition<()>> {
        if self.registry.partner_of(sender) != Some(partner) {
            return None;
        }
        self.teardown(sender)?;
        Some(Transition::new(
            (),
            vec![SessionEvent::PartnerLeft {
                user: partner,
                partner: sender,
            }],
        ))
    }

    fn teardown(&mut self, user: UserId) -> Option<UserId> {
        let partner = self.registry.unpair(user)?;
        self.confirmations.clear(user);
        self.confirmations.clear(partner);
        Some(partner)
    }

    fn match_or_enqueue(
        &mut self,
        user: UserId,
        events: &mut Vec<SessionEvent>,
    ) -> DomainResult<FindOutcome> {
        match self.queue.dequeue_match(user) {
            Some(partner) => {
                if let Err(err) = self.registry.pair(user, partner) {
                    // 放回队首，保持对方的等待顺序
                    self.queue.requeue_front(partner);
                    return Err(err);
                }
                events.push(SessionEvent::PartnerFound { user, partner });
                events.push(SessionEvent::PartnerFound {
                    user: partner,
                    partner: user,
                });
                Ok(FindOutcome::Matched { partner })
            }
            None => {
                self.queue.enqueue(user);
                events.push(SessionEvent::Searching {
                    user,
                    queue_len: self.queue.len(),
                });
                Ok(FindOutcome::Searching)
            }
        }
    }
}
