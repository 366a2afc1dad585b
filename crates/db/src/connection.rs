use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use fleetops_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Build the pool from the validated `[database]` config section.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // ticket_approval rows reference service_ticket and vendor;
                // without this pragma sqlite accepts dangling approvals.
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                // Decision transactions write ticket_approval and
                // service_ticket together while the queue lister reads; WAL
                // keeps those readers off the writer's lock.
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA synchronous = NORMAL").execute(&mut *conn).await?;
                // Concurrent approvers contend on the same ticket row; wait
                // out the lock instead of surfacing SQLITE_BUSY immediately.
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
