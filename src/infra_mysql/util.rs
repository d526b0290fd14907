use crate::domain_port::StoreError;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tracing::error;

pub async fn connect_pool(
    dsn: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(dsn)
        .await
}

pub(super) fn fault(what: &str, e: sqlx::Error) -> StoreError {
    error!("{}: {}", what, e);
    StoreError::Fault(format!("{what}: {e}"))
}
