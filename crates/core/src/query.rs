use serde::{Deserialize, Serialize};

use crate::error::{DwLogError, Result};
use crate::model::log::LogRecord;

/// Page size used by the browsing surfaces.
pub const PAGE_SIZE: u32 = 50;

/// How `context` / `extra` come back from a page query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMode {
    #[default]
    Raw,
    Decoded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    /// Case-insensitive substring match on `message`.
    pub search: Option<String>,
    /// Exact match on `level_name`, not on the numeric level.
    pub level: Option<String>,
    /// Exact match on `channel`.
    pub channel: Option<String>,
    pub documents: DocumentMode,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_SIZE,
            search: None,
            level: None,
            channel: None,
            documents: DocumentMode::Raw,
        }
    }
}

impl PageRequest {
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(DwLogError::InvalidArgument(format!(
                "page must be >= 1, got {}",
                self.page
            )));
        }
        if self.limit < 1 {
            return Err(DwLogError::InvalidArgument(format!(
                "limit must be > 0, got {}",
                self.limit
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn search_filter(&self) -> Option<&str> {
        non_empty(&self.search)
    }

    pub fn level_filter(&self) -> Option<&str> {
        non_empty(&self.level)
    }

    pub fn channel_filter(&self) -> Option<&str> {
        non_empty(&self.channel)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub records: Vec<LogRecord>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelItem {
    pub level_name: String,
    pub level: i16,
}

/// Everything a log browsing view needs for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogIndexView {
    pub logs: Vec<LogRecord>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub search: String,
    pub level: String,
    pub channel: String,
    pub levels: Vec<LevelItem>,
    pub channels: Vec<String>,
}

pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_from_page() {
        let req = PageRequest {
            page: 3,
            limit: 50,
            ..PageRequest::default()
        };
        assert_eq!(req.offset(), 100);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn empty_filters_are_inactive() {
        let req = PageRequest {
            search: Some(String::new()),
            level: Some("warning".into()),
            channel: None,
            ..PageRequest::default()
        };
        assert_eq!(req.search_filter(), None);
        assert_eq!(req.level_filter(), Some("warning"));
        assert_eq!(req.channel_filter(), None);
    }

    #[test]
    fn validate_rejects_zero() {
        assert!(
            PageRequest {
                page: 0,
                ..PageRequest::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            PageRequest {
                limit: 0,
                ..PageRequest::default()
            }
            .validate()
            .is_err()
        );
        assert!(PageRequest::default().validate().is_ok());
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(120, 50), 3);
    }
}
