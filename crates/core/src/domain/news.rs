use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article collected for one ETF. Unique per ETF by url and by title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: i64,
    pub etf_id: i64,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    /// Feed-local (KST) wall clock time.
    pub published_at: NaiveDateTime,
    pub collected_at: DateTime<Utc>,
    pub analyzed: bool,
    pub alert_triggered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNewsItem {
    pub etf_id: i64,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub published_at: NaiveDateTime,
}

/// One entry from the external news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// `YYYYMMDD`
    pub date: String,
    /// Feed-assigned news code.
    pub code: String,
    /// `HHMMSS`
    pub time: String,
    pub title: String,
    /// `1` news, `2` disclosure.
    pub category: String,
    pub importance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub should_alert: bool,
    pub reason: String,
    pub summary: String,
    pub full_analysis: String,
}
