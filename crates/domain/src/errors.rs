//! 领域模型错误定义
//!
//! 会话状态机的所有失败情况，调用方必须逐一处理。

use thiserror::Error;

use crate::value_objects::UserId;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 已在会话中时再次请求匹配
    #[error("用户 {user} 已在会话中")]
    AlreadyInSession { user: UserId },

    /// 不在会话中时请求结束、换人或转发
    #[error("用户 {user} 不在会话中")]
    NotInSession { user: UserId },

    /// 注册表不变量被破坏，属于程序缺陷
    #[error("用户 {user} 已存在配对记录")]
    AlreadyPaired { user: UserId },
}

impl DomainError {
    pub fn already_in_session(user: UserId) -> Self {
        Self::AlreadyInSession { user }
    }

    pub fn not_in_session(user: UserId) -> Self {
        Self::NotInSession { user }
    }

    pub fn already_paired(user: UserId) -> Self {
        Self::AlreadyPaired { user }
    }

    /// 是否为不变量破坏（需要高优先级记录）
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::AlreadyPaired { .. })
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
