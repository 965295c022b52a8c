use domain::{DomainError, MediaKind};
use thiserror::Error;

use crate::gateway::DeliveryError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("media kind {kind} requires VIP")]
    VipRequired { kind: MediaKind },
}

impl ApplicationError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_in_session(&self) -> bool {
        matches!(self.domain(), Some(DomainError::NotInSession { .. }))
    }
}
