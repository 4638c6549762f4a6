//! occasio-core - Domain logic and models
//!
//! This crate contains pure domain logic with no I/O operations. All
//! database models, business logic, and error types for the occasion
//! dispatch pipeline are defined here. The store, directory, queue,
//! vendor, scheduler and worker crates depend on this one; it depends on
//! none of them.

pub mod error;
pub mod models;
pub mod occasion;
pub mod timezone;
pub mod types;

pub use error::{OccasionError, OccasionResult};
pub use models::{
    idempotency_key, render_message_content, MessageLog, MessageStatus, MessageType, User,
};
pub use occasion::{occasion_date_in_year, scheduled_send_time, send_time_local};
pub use timezone::{parse_timezone, to_timezone, to_utc, validate_timezone};
pub use types::{MessageLogId, UserId};
