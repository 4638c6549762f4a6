//! occasio-shared - Process bootstrap plumbing shared by every binary.
//!
//! Tracing initialization, database pool construction, env loading and
//! the boolean-env parsing helper live here so `occasio-server` builds
//! them once rather than each binary rolling its own.

pub mod bootstrap;
pub mod config;
pub mod shutdown;

pub use bootstrap::{init_db, init_env, init_tracing};
pub use config::{parse_bool_env, CoreConfig};
pub use shutdown::wait_for_signal;
