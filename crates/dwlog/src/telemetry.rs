use std::io::IsTerminal;

use dwlog_core::model::log::{Document, LogEntry};
use dwlog_core::severity::Severity;
use dwlog_store::LogWriter;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const CHANNEL_MAX_CHARS: usize = 50;

/// Targets the sink never records; writing them back would feed on itself.
const SKIPPED_TARGETS: [&str; 3] = ["sqlx", "dwlog_store", "dwlog::telemetry"];

#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    pub min_level: Severity,
    pub bubble: bool,
}

impl SinkConfig {
    fn handles(&self, meta: &Metadata<'_>) -> bool {
        meta.is_event()
            && severity_for(meta.level()) >= self.min_level
            && !is_skipped_target(meta.target())
    }
}

pub fn init_cli_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .try_init();
}

/// Console logging plus, when a writer is given, the database sink.
pub fn init_run_tracing(sink: SinkConfig, writer: Option<LogWriter>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let sink_active = writer.is_some();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .with_filter(filter_fn(move |meta| console_sees(sink, sink_active, meta)));

    let db_layer = writer.map(|writer| DbLogLayer::new(writer, sink.min_level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(db_layer)
        .try_init();
}

/// Without bubbling, events the sink records stay off the console.
fn console_sees(sink: SinkConfig, sink_active: bool, meta: &Metadata<'_>) -> bool {
    sink.bubble || !sink_active || !sink.handles(meta)
}

pub fn severity_for(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        Level::INFO => Severity::Info,
        Level::DEBUG | Level::TRACE => Severity::Debug,
    }
}

fn is_skipped_target(target: &str) -> bool {
    SKIPPED_TARGETS.iter().any(|t| target.starts_with(t))
}

fn channel_for(target: &str) -> String {
    target.chars().take(CHANNEL_MAX_CHARS).collect()
}

/// Tracing layer that turns events into `dw_log` rows.
///
/// Events travel over an unbounded channel to a background task that owns
/// the writer, so `on_event` never waits on the database.
pub struct DbLogLayer {
    tx: mpsc::UnboundedSender<LogEntry>,
    min_level: Severity,
}

impl DbLogLayer {
    pub fn new(writer: LogWriter, min_level: Severity) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogEntry>();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                writer.write_entry(&entry).await;
            }
        });

        Self { tx, min_level }
    }
}

impl<S> Layer<S> for DbLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_skipped_target(meta.target()) {
            return;
        }
        let severity = severity_for(meta.level());
        if severity < self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut extra = Document::new();
        if let Some(module_path) = meta.module_path() {
            extra.insert("module_path".into(), Value::from(module_path));
        }
        if let Some(file) = meta.file() {
            extra.insert("file".into(), Value::from(file));
        }
        if let Some(line) = meta.line() {
            extra.insert("line".into(), Value::from(line));
        }

        let message = visitor.message.unwrap_or_else(|| meta.name().to_string());
        let entry = LogEntry::new(channel_for(meta.target()), severity, message)
            .with_context(visitor.fields)
            .with_extra(extra);

        let _ = self.tx.send(entry);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Document,
}

impl FieldVisitor {
    fn insert(&mut self, field: &tracing::field::Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
            return;
        }
        self.insert(field, Value::from(rendered));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
            return;
        }
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, Value::from(value));
    }
}
