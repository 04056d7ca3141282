use std::fmt;
use std::str::FromStr;

use dwlog_core::error::{DwLogError, Result};
use serde::{Deserialize, Serialize};
use sqlx::Arguments;
use sqlx::any::AnyArguments;

/// SQL dialect of the connected backend, resolved once when the store opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    /// Anything else that exposes an SQL-92 `information_schema`.
    Generic,
}

impl Dialect {
    /// Picks the dialect from the scheme of a connection URL.
    pub fn from_url(url: &str) -> Self {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            "mysql" | "mariadb" => Self::MySql,
            "sqlite" => Self::Sqlite,
            _ => Self::Generic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Generic => "generic",
        }
    }

    /// Bind marker for the `n`-th (1-based) parameter.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            _ => "?".to_string(),
        }
    }

    /// Catalog query returning the number of tables named by parameter 1.
    pub fn table_exists_sql(self) -> String {
        let p = self.placeholder(1);
        match self {
            Self::Postgres => format!(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = {p}"
            ),
            Self::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = {p}"
            ),
            Self::Sqlite => {
                format!("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = {p}")
            }
            Self::Generic => {
                format!("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = {p}")
            }
        }
    }

    /// Expression that turns a bound ISO-8601 string into a `created_at` value.
    pub fn timestamp_param(self, placeholder: &str) -> String {
        match self {
            Self::Postgres => format!("CAST({placeholder} AS TIMESTAMPTZ)"),
            Self::MySql => format!("STR_TO_DATE({placeholder}, '%Y-%m-%dT%H:%i:%s.%fZ')"),
            Self::Sqlite => placeholder.to_string(),
            Self::Generic => format!("CAST({placeholder} AS TIMESTAMP WITH TIME ZONE)"),
        }
    }

    /// Expression that turns a bound JSON string into a document column value.
    pub fn json_param(self, placeholder: &str) -> String {
        match self {
            Self::Postgres => format!("CAST({placeholder} AS JSONB)"),
            _ => placeholder.to_string(),
        }
    }

    /// Select expression reading `created_at` back as ISO-8601 text.
    pub fn timestamp_column(self, column: &str) -> String {
        match self {
            Self::Postgres => format!(
                "to_char({column} AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.MS\"Z\"')"
            ),
            Self::MySql => format!("DATE_FORMAT({column}, '%Y-%m-%dT%H:%i:%s.%fZ')"),
            Self::Sqlite => column.to_string(),
            Self::Generic => format!("CAST({column} AS VARCHAR(64))"),
        }
    }

    /// Select expression reading a document column back as JSON text.
    pub fn json_column(self, column: &str) -> String {
        match self {
            Self::Postgres => format!("CAST({column} AS TEXT)"),
            Self::MySql => format!("CAST({column} AS CHAR)"),
            Self::Sqlite | Self::Generic => column.to_string(),
        }
    }

    /// Case-insensitive `LIKE` predicate; the pattern uses `!` as escape.
    ///
    /// SQLite's `LOWER` folds ASCII only, so there `ÄNDERUNG` does not match
    /// `änderung`. Postgres `ILIKE` and MySQL's `utf8mb4_unicode_ci` fold
    /// non-ASCII letters too.
    pub fn contains_predicate(self, column: &str, placeholder: &str) -> String {
        match self {
            Self::Postgres => format!("{column} ILIKE {placeholder} ESCAPE '!'"),
            _ => format!("LOWER({column}) LIKE LOWER({placeholder}) ESCAPE '!'"),
        }
    }

    /// Appends the pagination clause, binding limit and offset in the order
    /// the clause expects.
    pub fn paginate(self, params: &mut Params, limit: i64, offset: i64) -> String {
        match self {
            Self::Generic => {
                let offset = params.push_int(offset);
                let limit = params.push_int(limit);
                format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
            }
            _ => {
                let limit = params.push_int(limit);
                let offset = params.push_int(offset);
                format!("LIMIT {limit} OFFSET {offset}")
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = DwLogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "generic" | "sql92" => Ok(Self::Generic),
            _ => Err(DwLogError::Parse(format!("unknown dialect: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
}

/// Positional bind values collected while a statement is assembled.
#[derive(Debug, Clone)]
pub struct Params {
    dialect: Dialect,
    values: Vec<SqlValue>,
}

impl Params {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Records a value and returns the marker to splice into the SQL text.
    pub fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    pub fn push_text(&mut self, value: impl Into<String>) -> String {
        self.push(SqlValue::Text(value.into()))
    }

    pub fn push_int(&mut self, value: i64) -> String {
        self.push(SqlValue::Int(value))
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn to_arguments<'q>(&self) -> Result<AnyArguments<'q>> {
        let mut args = AnyArguments::default();
        for value in &self.values {
            let added = match value {
                SqlValue::Text(v) => args.add(v.clone()),
                SqlValue::Int(v) => args.add(*v),
            };
            added.map_err(|e| DwLogError::Store(format!("bind parameter failed: {e}")))?;
        }
        Ok(args)
    }
}

/// Escapes `LIKE` wildcards so `needle` matches literally inside `%…%`.
pub fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '!' | '%' | '_') {
            out.push('!');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_from_url_scheme() {
        assert_eq!(
            Dialect::from_url("postgres://app@localhost/app"),
            Dialect::Postgres
        );
        assert_eq!(Dialect::from_url("postgresql://x/y"), Dialect::Postgres);
        assert_eq!(Dialect::from_url("mysql://root@db/app"), Dialect::MySql);
        assert_eq!(Dialect::from_url("mariadb://root@db/app"), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:"), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("SQLITE://dw.db"), Dialect::Sqlite);
        assert_eq!(Dialect::from_url("mssql://sa@db/app"), Dialect::Generic);
        assert_eq!(Dialect::from_url("no-scheme"), Dialect::Generic);
    }

    #[test]
    fn dialect_from_name() {
        assert_eq!(Dialect::from_str("MariaDB").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_str("generic").unwrap(), Dialect::Generic);
        assert!(Dialect::from_str("oracle").is_err());
    }

    #[test]
    fn placeholders_follow_dialect() {
        let mut pg = Params::new(Dialect::Postgres);
        assert_eq!(pg.push_text("a"), "$1");
        assert_eq!(pg.push_int(2), "$2");

        let mut my = Params::new(Dialect::MySql);
        assert_eq!(my.push_text("a"), "?");
        assert_eq!(my.push_int(2), "?");
        assert_eq!(my.values().len(), 2);
    }

    #[test]
    fn existence_queries_use_each_catalog() {
        assert!(
            Dialect::Postgres
                .table_exists_sql()
                .contains("current_schema() AND table_name = $1")
        );
        assert!(Dialect::MySql.table_exists_sql().contains("DATABASE()"));
        assert!(Dialect::Sqlite.table_exists_sql().contains("sqlite_master"));
        let generic = Dialect::Generic.table_exists_sql();
        assert!(generic.contains("information_schema.tables"));
        assert!(!generic.contains("table_schema"));
    }

    #[test]
    fn paginate_binds_in_clause_order() {
        let mut params = Params::new(Dialect::Postgres);
        params.push_text("x");
        let clause = Dialect::Postgres.paginate(&mut params, 50, 100);
        assert_eq!(clause, "LIMIT $2 OFFSET $3");
        assert_eq!(
            params.values()[1..],
            [SqlValue::Int(50), SqlValue::Int(100)]
        );

        let mut params = Params::new(Dialect::Generic);
        let clause = Dialect::Generic.paginate(&mut params, 50, 100);
        assert_eq!(clause, "OFFSET ? ROWS FETCH NEXT ? ROWS ONLY");
        assert_eq!(params.values(), [SqlValue::Int(100), SqlValue::Int(50)]);
    }

    #[test]
    fn search_predicate_is_case_insensitive() {
        assert_eq!(
            Dialect::Postgres.contains_predicate("message", "$1"),
            "message ILIKE $1 ESCAPE '!'"
        );
        assert_eq!(
            Dialect::Sqlite.contains_predicate("message", "?"),
            "LOWER(message) LIKE LOWER(?) ESCAPE '!'"
        );
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("foo"), "%foo%");
        assert_eq!(contains_pattern("100%_done!"), "%100!%!_done!!%");
    }
}
