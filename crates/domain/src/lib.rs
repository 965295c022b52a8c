//! 匿名聊天匹配系统核心领域模型
//!
//! 包含等待队列、会话注册表、确认请求以及把它们组合在一起的匹配状态机。
//! 本 crate 不做任何 I/O，所有操作都是同步的。

pub mod confirmation;
pub mod errors;
pub mod matchmaking;
pub mod session_registry;
pub mod user;
pub mod value_objects;
pub mod waiting_queue;

// 重新导出常用类型
pub use confirmation::{ConfirmationBook, ConfirmationCheck, PendingAction, PendingConfirmation};
pub use errors::{DomainError, DomainResult};
pub use matchmaking::{FindOutcome, MatchState, SessionEvent, StopOutcome, Transition, UserStatus};
pub use session_registry::SessionRegistry;
pub use user::UserProfile;
pub use value_objects::{MediaKind, MediaRef, Payload, Timestamp, UserId};
pub use waiting_queue::WaitingQueue;
