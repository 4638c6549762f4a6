//! Error type for the Message Log Store
//!
//! Every failure the store surfaces is storage-fatal (§4.A "Errors" column);
//! the functional signals ("duplicate", "stale CAS") are not errors at all
//! — they are ordinary `Ok` variants (I1, "Stale-state" in §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
