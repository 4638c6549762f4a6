use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CoreConfig;

/// Load `.env` if present. A no-op in production where real env vars are
/// already set.
pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Initialize tracing: stdout for humans, optional rolling JSON file for
/// machines. Returns the file-appender guard, which must be held for the
/// lifetime of the process so buffered lines are flushed on drop.
pub fn init_tracing(
    service_name: &str,
    enable_file_logging: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!("info,{service_name}=debug,sqlx=warn");
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if !enable_file_logging {
        registry.init();
        return None;
    }

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let now = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let filename = format!("occasio-{service_name}.{now}.jsonl");

    let file_appender = tracing_appender::rolling::daily(&log_dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    Some(guard)
}

/// Build the process-wide database pool (§5: "explicit process-wide
/// handles created at startup, passed to components by reference").
pub async fn init_db(config: &CoreConfig) -> Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "database pool established"
    );

    Ok(pool)
}
