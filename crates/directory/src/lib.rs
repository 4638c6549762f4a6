//! User Directory (component B): a read-only, consumed interface.
//!
//! The core never writes users; it only reads them. This crate defines
//! the trait the scheduler and worker crates depend on, a `sqlx`-backed
//! Postgres implementation, and an in-memory fake for tests that don't
//! need a database.

mod fake;
mod postgres;

use async_trait::async_trait;
use occasio_core::{MessageType, User, UserId};
use thiserror::Error;

pub use fake::InMemoryUserDirectory;
pub use postgres::PgUserDirectory;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("directory storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Read-only lookup over users, keyed by id or by occasion date (§4.B).
///
/// The directory is eventually consistent with respect to edits: a user
/// changed after a precalculation run keeps whatever was already
/// scheduled (§4.B note). Soft-deleted users never appear in either
/// method.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn by_id(&self, id: UserId) -> DirectoryResult<Option<User>>;

    /// Users whose `message_type` occasion falls on `(month, day)` in the
    /// calendar sense (year-agnostic recurrence), excluding soft-deleted
    /// rows. Used by the Daily Precalculation Scheduler (§4.E), which
    /// evaluates this per UTC calendar date candidate while iterating the
    /// horizon window.
    async fn with_occasion_on(
        &self,
        month: u32,
        day: u32,
        message_type: MessageType,
    ) -> DirectoryResult<Vec<User>>;
}
