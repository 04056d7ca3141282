use dwlog_core::model::log::{Document, LogEntry};
use dwlog_core::severity::Severity;
use serde_json::json;

/// A small mixed workload across three channels and four severities.
pub fn sample_entries() -> Vec<LogEntry> {
    let mut request_ctx = Document::new();
    request_ctx.insert("method".into(), json!("GET"));
    request_ctx.insert("path".into(), json!("/v1/orders"));

    let mut db_ctx = Document::new();
    db_ctx.insert("elapsed_ms".into(), json!(1800));
    db_ctx.insert("query".into(), json!("SELECT * FROM orders"));

    let mut extra = Document::new();
    extra.insert("host".into(), json!("web-1"));

    vec![
        LogEntry::new("app", Severity::Info, "Request started")
            .with_context(request_ctx.clone())
            .with_extra(extra.clone()),
        LogEntry::new("db", Severity::Warning, "slow query detected").with_context(db_ctx),
        LogEntry::new("app", Severity::Warning, "request retried attempt=2")
            .with_context(request_ctx.clone()),
        LogEntry::new("cache", Severity::Error, "connection refused redis:6379"),
        LogEntry::new("app", Severity::Debug, "route matched orders.index"),
        LogEntry::new("app", Severity::Info, "Request finished status=200")
            .with_context(request_ctx)
            .with_extra(extra),
    ]
}

/// `n` info records on channel `app`, messages `entry 000`, `entry 001`, ...
pub fn numbered_entries(n: usize) -> Vec<LogEntry> {
    (0..n)
        .map(|i| LogEntry::new("app", Severity::Info, format!("entry {i:03}")))
        .collect()
}
