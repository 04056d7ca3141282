use chrono::Utc;
use dwlog_core::error::{DwLogError, Result};
use dwlog_core::model::log::{Document, LogEntry, encode_document};
use dwlog_core::time::format_created_at;
use sqlx::Any;

use crate::Store;
use crate::dialect::Params;
use crate::schema::TABLE_NAME;

/// Best-effort sink for the log table.
///
/// **Writes never fail.** Every storage error (no table, no connection,
/// closed pool, rejected value) is swallowed: the call returns normally and
/// zero rows are inserted. Nothing is retried and nothing is reported, so a
/// broken log database can never take the caller down with it. Use
/// [`Store::insert_log`] when the outcome matters.
#[derive(Clone)]
pub struct LogWriter {
    store: Store,
}

impl LogWriter {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn write(
        &self,
        channel: &str,
        level: i16,
        level_name: &str,
        message: &str,
        context: &Document,
        extra: &Document,
    ) {
        let _ = self
            .store
            .insert_log(channel, level, level_name, message, context, extra)
            .await;
    }

    pub async fn write_entry(&self, entry: &LogEntry) {
        self.write(
            &entry.channel,
            entry.level,
            &entry.level_name,
            &entry.message,
            &entry.context,
            &entry.extra,
        )
        .await;
    }
}

impl Store {
    /// Inserts one record stamped with the current UTC time.
    pub async fn insert_log(
        &self,
        channel: &str,
        level: i16,
        level_name: &str,
        message: &str,
        context: &Document,
        extra: &Document,
    ) -> Result<()> {
        let dialect = self.dialect();
        let mut params = Params::new(dialect);
        let channel = params.push_text(channel);
        let level = params.push_int(i64::from(level));
        let level_name = params.push_text(level_name);
        let message = params.push_text(message);
        let context = params.push_text(encode_document(context));
        let extra = params.push_text(encode_document(extra));
        let created_at = params.push_text(format_created_at(Utc::now()));

        let sql = format!(
            "INSERT INTO {TABLE_NAME} (channel, level, level_name, message, context, extra, created_at)
             VALUES ({channel}, {level}, {level_name}, {message}, {}, {}, {})",
            dialect.json_param(&context),
            dialect.json_param(&extra),
            dialect.timestamp_param(&created_at),
        );

        sqlx::query_with::<Any, _>(&sql, params.to_arguments()?)
            .execute(self.pool())
            .await
            .map_err(|e| DwLogError::Store(format!("insert log failed: {e}")))?;
        Ok(())
    }
}
