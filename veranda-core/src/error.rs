/// Workflow-level error for every operation exposed to the API layer.
///
/// Each variant maps to one stable machine-readable code so clients can
/// branch on `code()` without parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Dates not available: {0}")]
    DatesUnavailable(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Availability lock failed: {0}")]
    AvailabilityLockFailed(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Modification not allowed: {0}")]
    ModificationNotAllowed(String),

    #[error("Cancellation not allowed: {0}")]
    CancellationNotAllowed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External collaborator failed: {0}")]
    External(String),
}

impl WorkflowError {
    /// Stable code for API consumers. These strings are a contract.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatesUnavailable(_) => "dates_unavailable",
            Self::ValidationFailed(_) => "validation_failed",
            Self::AvailabilityLockFailed(_) => "availability_lock_failed",
            Self::InvalidStatusTransition { .. } => "invalid_status_transition",
            Self::ModificationNotAllowed(_) => "modification_not_allowed",
            Self::CancellationNotAllowed(_) => "cancellation_not_allowed",
            Self::NotFound(_) => "not_found",
            Self::External(_) => "external_error",
        }
    }

    /// Conflict and external failures may succeed on retry after
    /// backoff; validation and state errors will not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatesUnavailable(_) | Self::AvailabilityLockFailed(_) | Self::External(_)
        )
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for WorkflowError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::External(err.to_string())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(WorkflowError::DatesUnavailable("x".into()).code(), "dates_unavailable");
        assert_eq!(WorkflowError::ValidationFailed("x".into()).code(), "validation_failed");
        assert_eq!(
            WorkflowError::AvailabilityLockFailed("x".into()).code(),
            "availability_lock_failed"
        );
        assert_eq!(
            WorkflowError::InvalidStatusTransition { from: "A".into(), to: "B".into() }.code(),
            "invalid_status_transition"
        );
        assert_eq!(
            WorkflowError::ModificationNotAllowed("x".into()).code(),
            "modification_not_allowed"
        );
        assert_eq!(
            WorkflowError::CancellationNotAllowed("x".into()).code(),
            "cancellation_not_allowed"
        );
    }

    #[test]
    fn test_retryability_split() {
        assert!(WorkflowError::AvailabilityLockFailed("held".into()).is_retryable());
        assert!(WorkflowError::External("timeout".into()).is_retryable());
        assert!(!WorkflowError::ValidationFailed("bad".into()).is_retryable());
        assert!(
            !WorkflowError::InvalidStatusTransition { from: "COMPLETED".into(), to: "PENDING".into() }
                .is_retryable()
        );
    }
}
