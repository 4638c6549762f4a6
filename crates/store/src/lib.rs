//! Message Log Store (component A): the durable state machine behind
//! every occasion dispatch. Rows are keyed by `idempotency_key`; every
//! transition is a single-row compare-and-set on the expected prior
//! status (I5).
//!
//! No ORM: queries are handwritten `sqlx` against Postgres, following the
//! same per-crate `XxxDb { pool: PgPool }` handle convention used
//! throughout this workspace.

mod error;
mod repository;

pub use error::{StoreError, StoreResult};
pub use repository::{CasOutcome, InsertOutcome, MessageLogStore, NewScheduledMessage};
