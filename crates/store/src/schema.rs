use dwlog_core::error::{DwLogError, Result};
use serde::{Deserialize, Serialize};
use sqlx::Any;
use tracing::{debug, info, warn};

use crate::Store;
use crate::dialect::{Dialect, Params};

pub const TABLE_NAME: &str = "dw_log";
pub const TABLE_COMMENT: &str = "Application logs stored via dwlog";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Identity,
    ShortString,
    SmallInt,
    Text,
    Json,
    TimestampTz,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub comment: &'static str,
}

pub const COLUMNS: [ColumnDef; 8] = [
    ColumnDef {
        name: "id",
        kind: ColumnKind::Identity,
        comment: "Auto-incrementing big integer ID",
    },
    ColumnDef {
        name: "channel",
        kind: ColumnKind::ShortString,
        comment: "Logger channel name",
    },
    ColumnDef {
        name: "level",
        kind: ColumnKind::SmallInt,
        comment: "Numeric log level",
    },
    ColumnDef {
        name: "level_name",
        kind: ColumnKind::ShortString,
        comment: "Human-readable log level",
    },
    ColumnDef {
        name: "message",
        kind: ColumnKind::Text,
        comment: "Log message",
    },
    ColumnDef {
        name: "context",
        kind: ColumnKind::Json,
        comment: "Additional context data as JSON",
    },
    ColumnDef {
        name: "extra",
        kind: ColumnKind::Json,
        comment: "Extra data added by processors as JSON",
    },
    ColumnDef {
        name: "created_at",
        kind: ColumnKind::TimestampTz,
        comment: "When the log entry was created",
    },
];

/// `(index name, column)` pairs; no other column is indexed.
pub const INDEXES: [(&str, &str); 4] = [
    ("idx_log_level", "level"),
    ("idx_log_level_name", "level_name"),
    ("idx_log_channel", "channel"),
    ("idx_log_created_at", "created_at"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    Dropped,
    Absent,
    /// The table exists but the caller did not confirm the drop.
    NotConfirmed,
}

fn column_sql(dialect: Dialect, column: &ColumnDef) -> String {
    let ty = match (dialect, column.kind) {
        (Dialect::Postgres | Dialect::Generic, ColumnKind::Identity) => {
            "BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL"
        }
        (Dialect::MySql, ColumnKind::Identity) => "BIGINT AUTO_INCREMENT NOT NULL",
        (Dialect::Sqlite, ColumnKind::Identity) => "INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
        (_, ColumnKind::ShortString) => "VARCHAR(50) NOT NULL",
        (_, ColumnKind::SmallInt) => "SMALLINT NOT NULL",
        (Dialect::MySql, ColumnKind::Text) => "LONGTEXT NOT NULL",
        (_, ColumnKind::Text) => "TEXT NOT NULL",
        (Dialect::Postgres, ColumnKind::Json) => "JSONB DEFAULT '{}' NOT NULL",
        (Dialect::MySql, ColumnKind::Json) => "JSON DEFAULT (JSON_OBJECT()) NOT NULL",
        (Dialect::Sqlite | Dialect::Generic, ColumnKind::Json) => "TEXT DEFAULT '{}' NOT NULL",
        (Dialect::Postgres | Dialect::Generic, ColumnKind::TimestampTz) => {
            "TIMESTAMP(3) WITH TIME ZONE NOT NULL"
        }
        (Dialect::MySql, ColumnKind::TimestampTz) => "DATETIME(3) NOT NULL",
        (Dialect::Sqlite, ColumnKind::TimestampTz) => "TEXT NOT NULL",
    };

    match dialect {
        Dialect::MySql => format!(
            "{} {ty} COMMENT '{}'",
            column.name,
            sql_literal(column.comment)
        ),
        _ => format!("{} {ty}", column.name),
    }
}

/// DDL for the log table, in execution order.
pub fn create_table_statements(dialect: Dialect) -> Vec<String> {
    let mut parts = COLUMNS
        .iter()
        .map(|c| column_sql(dialect, c))
        .collect::<Vec<_>>();

    match dialect {
        Dialect::Sqlite => {}
        Dialect::MySql => {
            for (name, column) in INDEXES {
                parts.push(format!("INDEX {name} ({column})"));
            }
            parts.push("PRIMARY KEY (id)".to_string());
        }
        Dialect::Postgres | Dialect::Generic => parts.push("PRIMARY KEY (id)".to_string()),
    }

    let mut create = format!("CREATE TABLE {TABLE_NAME} ({})", parts.join(", "));
    if dialect == Dialect::MySql {
        create.push_str(&format!(
            " DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci ENGINE = InnoDB COMMENT = '{}'",
            sql_literal(TABLE_COMMENT)
        ));
    }

    let mut statements = vec![create];
    if dialect != Dialect::MySql {
        for (name, column) in INDEXES {
            statements.push(format!("CREATE INDEX {name} ON {TABLE_NAME} ({column})"));
        }
    }

    if dialect == Dialect::Postgres {
        statements.push(format!(
            "COMMENT ON TABLE {TABLE_NAME} IS '{}'",
            sql_literal(TABLE_COMMENT)
        ));
        for column in &COLUMNS {
            statements.push(format!(
                "COMMENT ON COLUMN {TABLE_NAME}.{} IS '{}'",
                column.name,
                sql_literal(column.comment)
            ));
        }
    }

    statements
}

pub fn drop_table_statement() -> String {
    format!("DROP TABLE {TABLE_NAME}")
}

fn sql_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

impl Store {
    /// Whether the log table exists. Any catalog query failure reads as "absent".
    pub async fn table_exists(&self) -> bool {
        let mut params = Params::new(self.dialect());
        params.push_text(TABLE_NAME);
        let sql = self.dialect().table_exists_sql();

        let args = match params.to_arguments() {
            Ok(args) => args,
            Err(_) => return false,
        };
        match sqlx::query_scalar_with::<Any, i64, _>(&sql, args)
            .fetch_one(self.pool())
            .await
        {
            Ok(count) => count > 0,
            Err(err) => {
                debug!(error = %err, dialect = %self.dialect(), "table existence check failed");
                false
            }
        }
    }

    /// Creates the log table unless it already exists.
    pub async fn create_table(&self) -> Result<CreateOutcome> {
        if self.table_exists().await {
            return Ok(CreateOutcome::AlreadyExists);
        }

        info!(table = TABLE_NAME, dialect = %self.dialect(), "creating log table");
        for sql in create_table_statements(self.dialect()) {
            sqlx::query(&sql)
                .execute(self.pool())
                .await
                .map_err(|e| DwLogError::Store(format!("create table failed: {e}")))?;
        }
        Ok(CreateOutcome::Created)
    }

    /// Drops the log table. Irreversible; only happens when `force` is set.
    pub async fn drop_table(&self, force: bool) -> Result<DropOutcome> {
        if !self.table_exists().await {
            return Ok(DropOutcome::Absent);
        }
        if !force {
            return Ok(DropOutcome::NotConfirmed);
        }

        warn!(table = TABLE_NAME, dialect = %self.dialect(), "dropping log table");
        sqlx::query(&drop_table_statement())
            .execute(self.pool())
            .await
            .map_err(|e| DwLogError::Store(format!("drop table failed: {e}")))?;
        Ok(DropOutcome::Dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_ddl_shape() {
        let stmts = create_table_statements(Dialect::Postgres);
        assert!(stmts[0].starts_with("CREATE TABLE dw_log ("));
        assert!(stmts[0].contains("id BIGINT GENERATED BY DEFAULT AS IDENTITY NOT NULL"));
        assert!(stmts[0].contains("context JSONB DEFAULT '{}' NOT NULL"));
        assert!(stmts[0].contains("created_at TIMESTAMP(3) WITH TIME ZONE NOT NULL"));
        assert!(stmts[0].ends_with("PRIMARY KEY (id))"));
        assert!(stmts.contains(&"CREATE INDEX idx_log_created_at ON dw_log (created_at)".to_string()));
        assert!(stmts.iter().any(|s| s.starts_with("COMMENT ON TABLE dw_log")));
        assert!(!stmts.iter().any(|s| s.contains("IF NOT EXISTS")));
    }

    #[test]
    fn mysql_ddl_inlines_indexes_and_comments() {
        let stmts = create_table_statements(Dialect::MySql);
        assert_eq!(stmts.len(), 1);
        let ddl = &stmts[0];
        assert!(ddl.contains("id BIGINT AUTO_INCREMENT NOT NULL COMMENT"));
        assert!(ddl.contains("message LONGTEXT NOT NULL"));
        assert!(ddl.contains("extra JSON DEFAULT (JSON_OBJECT()) NOT NULL"));
        assert!(ddl.contains("created_at DATETIME(3) NOT NULL"));
        for (name, column) in INDEXES {
            assert!(ddl.contains(&format!("INDEX {name} ({column})")));
        }
        assert!(ddl.contains("ENGINE = InnoDB"));
    }

    #[test]
    fn sqlite_ddl_uses_rowid_primary_key() {
        let stmts = create_table_statements(Dialect::Sqlite);
        assert!(stmts[0].contains("id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"));
        assert!(!stmts[0].contains("PRIMARY KEY (id)"));
        assert_eq!(stmts.len(), 1 + INDEXES.len());
    }

    #[test]
    fn generic_ddl_is_portable() {
        let stmts = create_table_statements(Dialect::Generic);
        assert!(stmts[0].contains("context TEXT DEFAULT '{}' NOT NULL"));
        assert!(!stmts[0].contains("JSONB"));
        assert!(!stmts[0].contains("COMMENT"));
        assert_eq!(stmts.len(), 1 + INDEXES.len());
    }

    #[test]
    fn only_the_four_query_columns_are_indexed() {
        let indexed = INDEXES.iter().map(|(_, c)| *c).collect::<Vec<_>>();
        assert_eq!(indexed, ["level", "level_name", "channel", "created_at"]);
    }

    #[tokio::test]
    async fn create_table_is_idempotent() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(!store.table_exists().await);

        assert_eq!(store.create_table().await.unwrap(), CreateOutcome::Created);
        assert!(store.table_exists().await);
        assert_eq!(
            store.create_table().await.unwrap(),
            CreateOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn drop_table_needs_force() {
        let store = Store::open_in_memory().await.unwrap();
        assert_eq!(store.drop_table(true).await.unwrap(), DropOutcome::Absent);

        store.create_table().await.unwrap();
        assert_eq!(
            store.drop_table(false).await.unwrap(),
            DropOutcome::NotConfirmed
        );
        assert!(store.table_exists().await);

        assert_eq!(store.drop_table(true).await.unwrap(), DropOutcome::Dropped);
        assert!(!store.table_exists().await);
    }

    #[tokio::test]
    async fn failed_existence_check_reads_as_absent() {
        // SQLite has no information_schema, so the generic catalog query errors.
        let store = Store::open_in_memory()
            .await
            .unwrap()
            .with_dialect(Dialect::Generic);
        assert!(!store.table_exists().await);
    }
}
