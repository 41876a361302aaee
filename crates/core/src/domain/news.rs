use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// `YYYY-MM-DD HH:MM:SS -03`, or the feed's own text when it could not be parsed.
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSnapshot {
    pub items: Vec<NewsItem>,
    pub source: String,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NewsSnapshot {
    pub fn new(items: Vec<NewsItem>, source: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            count: items.len(),
            items,
            source: source.to_string(),
            timestamp,
            error: None,
        }
    }

    pub fn failed(source: &str, timestamp: DateTime<Utc>, error: String) -> Self {
        Self {
            items: Vec::new(),
            source: source.to_string(),
            count: 0,
            timestamp,
            error: Some(error),
        }
    }
}
