//! Error types for the occasion domain logic

use crate::types::{MessageLogId, UserId};
use thiserror::Error;

/// Core occasion-domain errors
#[derive(Error, Debug)]
pub enum OccasionError {
    #[error("Message log not found: {0}")]
    MessageLogNotFound(MessageLogId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),

    #[error("Invalid occasion date: {0}")]
    InvalidOccasionDate(String),
}

/// Result type alias for occasion-domain operations
pub type OccasionResult<T> = Result<T, OccasionError>;
