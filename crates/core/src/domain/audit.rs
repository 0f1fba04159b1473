use serde_json::Value;

pub const CHANNEL_EMAIL: &str = "EMAIL";
pub const ALERT_TYPE_NEWS: &str = "NEWS";

/// One ETF alert dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub etf_id: i64,
    pub etf_name: String,
    pub member_id: i64,
    pub alert_type: &'static str,
    pub channel: &'static str,
    pub recipient: String,
    pub content: String,
    pub sent: bool,
    /// Present only when `sent` is false.
    pub failure_reason: Option<String>,
}

/// One rebalancing report dispatch attempt, with the evidence it was based on.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancingRecord {
    pub portfolio_id: i64,
    pub portfolio_name: String,
    pub member_id: i64,
    pub period_months: i32,
    pub channel: &'static str,
    pub recipient: String,
    pub reason: String,
    pub news_evidence: Value,
    pub before_allocation: Value,
    pub after_allocation: Value,
    pub sent: bool,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TutorRecord {
    pub member_id: Option<i64>,
    pub question: String,
    pub answer: String,
    pub model: String,
}
