use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::AppConfig;

pub async fn init(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    connect(&config.database_url, config.max_connections).await
}

/// Opens a pool with foreign keys enforced.
///
/// An in-memory database lives only as long as its connection, so those pools
/// are pinned to one connection that never idles out.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid database url {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let mut pool_options = SqlitePoolOptions::new()
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10));

    pool_options = if in_memory {
        pool_options
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        pool_options.max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .context("failed to connect to database")?;

    tracing::debug!(url = database_url, in_memory, "database pool ready");
    Ok(pool)
}

pub mod params;
pub mod provision;
pub mod row_parsers;
pub mod uuid_sql;
