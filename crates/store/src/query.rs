use dwlog_core::error::{DwLogError, Result};
use dwlog_core::model::log::{LogRecord, Payload};
use dwlog_core::query::{DocumentMode, LevelItem, LogIndexView, Page, PageRequest, total_pages};
use dwlog_core::time::parse_created_at;
use sqlx::any::AnyRow;
use sqlx::{Any, Row};

use crate::Store;
use crate::dialect::{Params, contains_pattern};
use crate::schema::TABLE_NAME;

impl Store {
    /// One page of records, newest first, plus the number of rows matching
    /// the same filters.
    pub async fn find_page(&self, req: &PageRequest) -> Result<Page> {
        req.validate()?;
        let dialect = self.dialect();

        let mut params = Params::new(dialect);
        let where_sql = build_where(req, &mut params);

        let count_sql = format!("SELECT COUNT(*) FROM {TABLE_NAME}{where_sql}");
        let total = sqlx::query_scalar_with::<Any, i64, _>(&count_sql, params.to_arguments()?)
            .fetch_one(self.pool())
            .await
            .map_err(|e| DwLogError::Store(format!("count logs failed: {e}")))?;

        let offset = i64::try_from(req.offset()).map_err(|_| {
            DwLogError::InvalidArgument(format!("page {} is out of range", req.page))
        })?;
        let paginate = dialect.paginate(&mut params, i64::from(req.limit), offset);
        let page_sql = format!(
            "SELECT id, channel, level, level_name, message, {} AS context, {} AS extra, {} AS created_at
             FROM {TABLE_NAME}{where_sql}
             ORDER BY {TABLE_NAME}.created_at DESC, {TABLE_NAME}.id DESC
             {paginate}",
            dialect.json_column("context"),
            dialect.json_column("extra"),
            dialect.timestamp_column("created_at"),
        );

        let rows = sqlx::query_with::<Any, _>(&page_sql, params.to_arguments()?)
            .fetch_all(self.pool())
            .await
            .map_err(|e| DwLogError::Store(format!("query logs failed: {e}")))?;

        let records = rows
            .iter()
            .map(|row| record_from_row(row, req.documents))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            records,
            total: total.max(0) as u64,
        })
    }

    /// Unique `(level_name, level)` pairs, by level ascending then name descending.
    pub async fn distinct_levels(&self) -> Result<Vec<LevelItem>> {
        let sql = format!(
            "SELECT DISTINCT level_name, level FROM {TABLE_NAME} ORDER BY level ASC, level_name DESC"
        );
        let rows = sqlx::query::<Any>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| DwLogError::Store(format!("query levels failed: {e}")))?;

        rows.iter()
            .map(|row| {
                Ok(LevelItem {
                    level_name: get(row, "level_name")?,
                    level: get_level(row)?,
                })
            })
            .collect()
    }

    pub async fn distinct_channels(&self) -> Result<Vec<String>> {
        let sql = format!("SELECT DISTINCT channel FROM {TABLE_NAME} ORDER BY channel ASC");
        let rows = sqlx::query::<Any>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| DwLogError::Store(format!("query channels failed: {e}")))?;

        rows.iter().map(|row| get(row, "channel")).collect()
    }

    /// Everything the browsing surfaces render for one request.
    pub async fn index_view(&self, req: &PageRequest) -> Result<LogIndexView> {
        let page = self.find_page(req).await?;
        let levels = self.distinct_levels().await?;
        let channels = self.distinct_channels().await?;

        Ok(LogIndexView {
            total_pages: total_pages(page.total, req.limit),
            total_items: page.total,
            logs: page.records,
            current_page: req.page,
            search: req.search_filter().unwrap_or_default().to_string(),
            level: req.level_filter().unwrap_or_default().to_string(),
            channel: req.channel_filter().unwrap_or_default().to_string(),
            levels,
            channels,
        })
    }
}

fn build_where(req: &PageRequest, params: &mut Params) -> String {
    let dialect = params.dialect();
    let mut clauses = Vec::new();

    if let Some(search) = req.search_filter() {
        let p = params.push_text(contains_pattern(search));
        clauses.push(dialect.contains_predicate("message", &p));
    }
    if let Some(level) = req.level_filter() {
        let p = params.push_text(level);
        clauses.push(format!("level_name = {p}"));
    }
    if let Some(channel) = req.channel_filter() {
        let p = params.push_text(channel);
        clauses.push(format!("channel = {p}"));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn record_from_row(row: &AnyRow, mode: DocumentMode) -> Result<LogRecord> {
    let context: String = get(row, "context")?;
    let extra: String = get(row, "extra")?;
    let created_at: String = get(row, "created_at")?;

    let (context, extra) = match mode {
        DocumentMode::Raw => (Payload::Raw(context), Payload::Raw(extra)),
        DocumentMode::Decoded => (
            Payload::Decoded(Payload::decode(&context)),
            Payload::Decoded(Payload::decode(&extra)),
        ),
    };

    Ok(LogRecord {
        id: get(row, "id")?,
        channel: get(row, "channel")?,
        level: get_level(row)?,
        level_name: get(row, "level_name")?,
        message: get(row, "message")?,
        context,
        extra,
        created_at: parse_created_at(&created_at)?,
    })
}

fn get<T>(row: &AnyRow, column: &str) -> Result<T>
where
    T: for<'r> sqlx::Decode<'r, Any> + sqlx::Type<Any>,
{
    row.try_get(column)
        .map_err(|e| DwLogError::Store(format!("decode column {column} failed: {e}")))
}

fn get_level(row: &AnyRow) -> Result<i16> {
    let level: i64 = get(row, "level")?;
    i16::try_from(level)
        .map_err(|_| DwLogError::Store(format!("level {level} does not fit a small integer")))
}
