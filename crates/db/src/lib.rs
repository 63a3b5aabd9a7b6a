//! SQLite connection pool, migrations, and the `db` core module.
//!
//! The pool is created once at startup by [`Database::connect`], handed to
//! every module that needs it, and drained by [`DatabaseModule`] when the
//! registry shuts down.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use bookshelf_kernel::settings::DatabaseSettings;
use bookshelf_kernel::{InitCtx, Module};

pub mod migrate;

/// Shared handle to the connection pool. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool described by `settings`.
    ///
    /// In-memory URLs get a single connection that never idles out, since
    /// every SQLite connection to `:memory:` is its own database.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(settings.busy_timeout_ms));

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));

        if is_in_memory(&settings.url) {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(settings.max_connections.max(1));
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{}'", settings.url))?;

        tracing::info!(
            target: "bookshelf-db",
            url = %settings.url,
            max_connections = pool.options().get_max_connections(),
            "database pool ready"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query to prove the pool can serve requests.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Drain and close every pooled connection. Later queries fail with
    /// `sqlx::Error::PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Core module owning the pool lifecycle.
pub struct DatabaseModule {
    db: Database,
}

impl DatabaseModule {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.db
            .ping()
            .await
            .context("database did not answer the startup ping")?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.db.close().await;
        tracing::info!(target: "bookshelf-db", "database pool closed");
        Ok(())
    }
}

/// Create the `db` core module for a connected pool
pub fn create_module(db: Database) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(DatabaseModule::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::Settings;

    #[tokio::test]
    async fn in_memory_pool_keeps_state_between_queries() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();

        sqlx::query("CREATE TABLE t (v INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (v) VALUES (?)")
            .bind(7_i64)
            .execute(db.pool())
            .await
            .unwrap();

        let v: i64 = sqlx::query_scalar("SELECT v FROM t")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn module_stop_closes_pool() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        let module = DatabaseModule::new(db.clone());
        let settings = Settings::default();

        module.init(&InitCtx { settings: &settings }).await.unwrap();
        module.stop().await.unwrap();

        assert!(db.is_closed());
        assert!(matches!(db.ping().await, Err(sqlx::Error::PoolClosed)));
    }

    #[tokio::test]
    async fn invalid_url_is_reported() {
        let settings = DatabaseSettings {
            url: "postgres://nope".to_string(),
            ..DatabaseSettings::default()
        };
        let err = Database::connect(&settings).await.unwrap_err();
        assert!(err.to_string().contains("postgres://nope"));
    }
}
