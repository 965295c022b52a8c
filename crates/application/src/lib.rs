//! 应用层实现。
//!
//! 围绕匹配状态机提供异步用例服务：匹配、转发、生命周期控制，
//! 以及对外部协作方（消息网关、VIP 权益、时钟）的抽象。

pub mod clock;
pub mod entitlement;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod lifecycle;
pub mod local_gateway;
pub mod matchmaker;
pub mod notification;
pub mod relay;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entitlement::{memory::VipRoster, EntitlementPolicy};
pub use error::ApplicationError;
pub use gateway::{DeliveryError, MessageGateway, Outbound};
pub use identity::IdentityCache;
pub use lifecycle::{
    Command, Inbound, SessionController, SessionControllerDependencies, SessionSettings,
};
pub use local_gateway::RecordingGateway;
pub use matchmaker::{ConfirmationResolution, MatchStats, Matchmaker, MatchmakerDependencies};
pub use notification::Notification;
pub use relay::{Relay, RelayDependencies, RelayOutcome};
