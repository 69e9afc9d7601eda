//! Breakout-specific error types.

use thiserror::Error;

use super::PartitionError;
use crate::domain::foundation::{AuthError, DomainError, ErrorCode, EventId, RoomId, UserId};

/// Errors surfaced by room lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakoutError {
    /// Requested room count is incompatible with the live connection count.
    #[error("Invalid room count {requested} for {live} live connections (max {max})")]
    InvalidRoomCount {
        requested: usize,
        live: usize,
        max: usize,
    },

    /// No active room assignment matched the request.
    #[error("User {user_id} has no active room assignment in event {event_id}")]
    NoActiveAssignment { event_id: EventId, user_id: UserId },

    /// Reading or writing room or identity documents failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// The connection could not be bound to an identity.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(AuthError),

    /// A breakout is already running for the event.
    #[error("Breakout already active for event {0}")]
    BreakoutAlreadyActive(EventId),

    /// The room does not exist, is inactive, or belongs to another event.
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl BreakoutError {
    pub fn persistence(message: impl Into<String>) -> Self {
        BreakoutError::PersistenceFailure(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BreakoutError::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            BreakoutError::InvalidRoomCount { .. } => ErrorCode::InvalidRoomCount,
            BreakoutError::NoActiveAssignment { .. } => ErrorCode::NoActiveAssignment,
            BreakoutError::PersistenceFailure(_) => ErrorCode::DatabaseError,
            BreakoutError::AuthenticationFailed(_) => ErrorCode::Unauthorized,
            BreakoutError::BreakoutAlreadyActive(_) => ErrorCode::BreakoutAlreadyActive,
            BreakoutError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            BreakoutError::Forbidden(_) => ErrorCode::Forbidden,
            BreakoutError::Validation(_) => ErrorCode::ValidationFailed,
        }
    }

    /// True for outcomes the caller should report rather than escalate.
    pub fn is_expected_outcome(&self) -> bool {
        matches!(self, BreakoutError::NoActiveAssignment { .. })
    }
}

impl From<DomainError> for BreakoutError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Forbidden => BreakoutError::Forbidden(err.message),
            ErrorCode::ValidationFailed => BreakoutError::Validation(err.message),
            _ => BreakoutError::PersistenceFailure(err.to_string()),
        }
    }
}

impl From<PartitionError> for BreakoutError {
    fn from(err: PartitionError) -> Self {
        match err {
            PartitionError::InvalidRoomCount {
                requested,
                live,
                max,
            } => BreakoutError::InvalidRoomCount {
                requested,
                live,
                max,
            },
        }
    }
}

impl From<AuthError> for BreakoutError {
    fn from(err: AuthError) -> Self {
        BreakoutError::AuthenticationFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_domain_error_stays_forbidden() {
        let err: BreakoutError = DomainError::new(ErrorCode::Forbidden, "nope").into();
        assert_eq!(err, BreakoutError::Forbidden("nope".to_string()));
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn database_error_becomes_persistence_failure() {
        let err: BreakoutError = DomainError::database("insert failed").into();
        assert!(matches!(err, BreakoutError::PersistenceFailure(_)));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn partition_error_keeps_counts() {
        let err: BreakoutError = PartitionError::InvalidRoomCount {
            requested: 5,
            live: 4,
            max: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Invalid room count 5 for 4 live connections (max 2)"
        );
    }

    #[test]
    fn only_missing_assignment_is_an_expected_outcome() {
        let missing = BreakoutError::NoActiveAssignment {
            event_id: EventId::new("e").unwrap(),
            user_id: UserId::new("u").unwrap(),
        };
        assert!(missing.is_expected_outcome());
        assert!(!BreakoutError::persistence("x").is_expected_outcome());
    }
}
