use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::severity::Severity;

/// Structured auxiliary data attached to a record. Always a JSON object.
pub type Document = Map<String, Value>;

/// One row of `dw_log` as read back by the query service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub id: i64,
    pub channel: String,
    pub level: i16,
    pub level_name: String,
    pub message: String,
    pub context: Payload,
    pub extra: Payload,
    pub created_at: DateTime<Utc>,
}

/// A record on its way into the table; `id` and `created_at` are assigned
/// by the write itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub channel: String,
    pub level: i16,
    pub level_name: String,
    pub message: String,
    #[serde(default)]
    pub context: Document,
    #[serde(default)]
    pub extra: Document,
}

impl LogEntry {
    pub fn new(channel: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            level: severity.value(),
            level_name: severity.name().to_string(),
            message: message.into(),
            context: Document::new(),
            extra: Document::new(),
        }
    }

    pub fn with_context(mut self, context: Document) -> Self {
        self.context = context;
        self
    }

    pub fn with_extra(mut self, extra: Document) -> Self {
        self.extra = extra;
        self
    }
}

/// `context` / `extra` either as stored (JSON text) or decoded into an object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Payload {
    Decoded(Document),
    Raw(String),
}

impl Payload {
    /// Decodes stored JSON text; anything that is not a JSON object becomes `{}`.
    pub fn decode(raw: &str) -> Document {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            Self::Decoded(doc) => doc.clone(),
            Self::Raw(raw) => Self::decode(raw),
        }
    }

    pub fn to_json_string(&self) -> String {
        match self {
            Self::Decoded(doc) => Value::Object(doc.clone()).to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::Raw("{}".to_string())
    }
}

/// Serializes a document for storage; empty maps become `{}`.
pub fn encode_document(doc: &Document) -> String {
    Value::Object(doc.clone()).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_document_encodes_as_object() {
        assert_eq!(encode_document(&Document::new()), "{}");
    }

    #[test]
    fn decode_falls_back_to_empty_object() {
        assert!(Payload::decode("null").is_empty());
        assert!(Payload::decode("[1,2]").is_empty());
        assert!(Payload::decode("{broken").is_empty());
        assert_eq!(Payload::decode(r#"{"a":1}"#)["a"], json!(1));
    }

    #[test]
    fn entry_takes_level_from_severity() {
        let entry = LogEntry::new("app", Severity::Warning, "disk almost full");
        assert_eq!(entry.level, 300);
        assert_eq!(entry.level_name, "warning");
        assert!(entry.context.is_empty());
        assert!(entry.extra.is_empty());
    }

    #[test]
    fn payload_serializes_untagged() {
        let raw = Payload::Raw(r#"{"a":1}"#.to_string());
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!(r#"{"a":1}"#));

        let decoded = Payload::Decoded(raw.to_document());
        assert_eq!(serde_json::to_value(&decoded).unwrap(), json!({"a": 1}));
    }
}
