use std::fs;
use std::str::FromStr;
use std::time::Duration;

use dwlog_core::config::Config;
use dwlog_core::error::{DwLogError, Result};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyPool};

use crate::dialect::Dialect;
use crate::schema::TABLE_NAME;
use crate::write::LogWriter;

/// Handle on the log table: a borrowed connection pool plus the dialect
/// every statement is rendered for.
#[derive(Clone)]
pub struct Store {
    pool: AnyPool,
    dialect: Dialect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub dialect: Dialect,
    pub table: String,
    pub table_exists: bool,
    pub logs_count: Option<u64>,
}

impl Store {
    pub async fn open(cfg: &Config) -> Result<Self> {
        if let Some(path) = cfg.sqlite_path()
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| DwLogError::Io(format!("failed to create db dir: {e}")))?;
        }

        let dialect = match &cfg.dialect {
            Some(name) => Dialect::from_str(name)?,
            None => Dialect::from_url(&cfg.database_url),
        };

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect(&cfg.database_url)
            .await
            .map_err(|e| DwLogError::Store(format!("failed to connect to database: {e}")))?;

        tracing::debug!(%dialect, "log store connected");
        Ok(Self { pool, dialect })
    }

    /// Private SQLite database that lives as long as the store's single connection.
    pub async fn open_in_memory() -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(5))
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DwLogError::Store(format!("failed to open in-memory db: {e}")))?;
        Ok(Self {
            pool,
            dialect: Dialect::Sqlite,
        })
    }

    /// Wraps a pool owned by the host application.
    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn writer(&self) -> LogWriter {
        LogWriter::new(self.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn count_logs(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {TABLE_NAME}");
        let count = sqlx::query_scalar::<Any, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DwLogError::Store(format!("count logs failed: {e}")))?;
        Ok(count.max(0) as u64)
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        let table_exists = self.table_exists().await;
        let logs_count = if table_exists {
            Some(self.count_logs().await?)
        } else {
            None
        };

        Ok(StatusResponse {
            dialect: self.dialect,
            table: TABLE_NAME.to_string(),
            table_exists,
            logs_count,
        })
    }
}
