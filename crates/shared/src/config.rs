//! Core process configuration: the handful of env keys every binary in
//! this workspace needs regardless of which components it runs
//! (database, queue broker, vendor endpoint).
//!
//! Per the REDESIGN FLAGS, booleans are parsed explicitly rather than by
//! reflection-style coercion: the literal string `"false"` must parse to
//! `false`, not `true`.

use anyhow::{bail, Context, Result};
use std::env;

/// Common configuration shared by every service binary.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Postgres connection string backing the store and directory.
    pub database_url: String,
    /// Bounded connection pool size (§5: "saturation is a backpressure
    /// signal, not an error").
    pub db_max_connections: u32,
    /// Base URL of the external email vendor (§6).
    pub vendor_url: String,
    /// AMQP broker URL backing the queue transport (§4.C).
    pub amqp_url: String,
    /// Whether to additionally write structured JSON logs to disk.
    pub enable_file_logging: bool,
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid integer")?,
            vendor_url: env::var("VENDOR_URL").context("VENDOR_URL must be set")?,
            amqp_url: env::var("AMQP_URL").context("AMQP_URL must be set")?,
            enable_file_logging: parse_bool_env("ENABLE_FILE_LOGGING", true)?,
        })
    }
}

/// Read an environment variable as a boolean, explicitly — never by
/// truthy-string coercion.
///
/// `"false"`, `"0"`, and the empty string parse to `false`; `"true"` and
/// `"1"` parse to `true` (case-insensitively); anything else is a
/// startup-fatal error. An unset variable falls back to `default`. This
/// exists specifically to avoid the source's boolean-string bug, where
/// the string `"false"` coerced to `true` under reflection-based
/// schema validation (§9 REDESIGN FLAGS).
pub fn parse_bool_env(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => parse_bool(&raw).with_context(|| format!("{key} is not a valid boolean")),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "false" | "0" | "" => Ok(false),
        "true" | "1" => Ok(true),
        other => bail!("expected \"true\"/\"false\"/\"1\"/\"0\", got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_false_string_is_false() {
        // The exact bug the source had: "false" must not coerce to true.
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(!parse_bool("").unwrap());
    }

    #[test]
    fn test_parse_bool_true_variants() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(parse_bool("TRUE").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("maybe").is_err());
    }
}
