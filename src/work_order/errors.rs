use thiserror::Error;

use super::types::{Role, WorkOrderId, WorkOrderStatus};

/// Malformed input. Always recoverable by the caller; never touches store state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Description must not be empty")]
    EmptyDescription,

    #[error("Latitude {value} is outside -90..90")]
    LatitudeOutOfRange { value: f64 },

    #[error("Longitude {value} is outside -180..180")]
    LongitudeOutOfRange { value: f64 },

    #[error("Radius must be a positive number of meters, got {value}")]
    NonPositiveRadius { value: f64 },

    #[error("Conflict reason is required when status is CONFLICT_DETECTED")]
    MissingConflictReason,

    #[error("Conflict reason is only allowed with CONFLICT_DETECTED, not {status}")]
    UnexpectedConflictReason { status: WorkOrderStatus },

    #[error("{status} can not be assigned at creation")]
    NotAnInitialStatus { status: WorkOrderStatus },

    #[error("Unknown {field}: {value:?}")]
    UnknownValue { field: &'static str, value: String },

    #[error("Work order ids are exhausted")]
    IdSpaceExhausted,

    #[error("Snapshot is inconsistent: {reason}")]
    InconsistentSnapshot { reason: String },
}

/// Every failure an engine operation can report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkOrderError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Work order #{id} not found")]
    NotFound { id: WorkOrderId },

    #[error("Illegal transition from {current} to {requested} for role {role}")]
    IllegalTransition {
        current: WorkOrderStatus,
        requested: WorkOrderStatus,
        role: Role,
    },

    #[error("Work order #{id} is {actual}, expected {expected}; re-read before retrying")]
    StaleStatus {
        id: WorkOrderId,
        expected: WorkOrderStatus,
        actual: WorkOrderStatus,
    },

    #[error("Role {role} may not {action}")]
    RoleNotPermitted { role: Role, action: &'static str },
}

impl WorkOrderError {
    /// Failures caused by a concurrent writer rather than by the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkOrderError::StaleStatus { .. })
    }
}

pub type WorkOrderResult<T> = Result<T, WorkOrderError>;
