use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    /// Reads the first word of a `RISK_LEVEL:` field; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        let word = s
            .split(|c: char| c.is_whitespace() || c == ',' || c == '.' || c == '(')
            .find(|w| !w.is_empty())
            .unwrap_or("");
        match word.to_ascii_uppercase().as_str() {
            "LOW" => Self::Low,
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// What the judge recommended for the portfolio as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancingRecommendation {
    pub rebalancing_required: bool,
    pub reason: String,
    pub risk_level: RiskLevel,
    /// etf id -> recommended percent. Empty when the judge could not be consulted.
    pub recommended_weights: BTreeMap<i64, f64>,
    pub advice: String,
    pub full_analysis: String,
}

impl RebalancingRecommendation {
    pub fn unavailable() -> Self {
        Self {
            rebalancing_required: false,
            reason: "Rebalancing analysis failed; keeping the current allocation.".to_string(),
            risk_level: RiskLevel::Unknown,
            recommended_weights: BTreeMap::new(),
            advice: String::new(),
            full_analysis: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Maintain,
    Increase,
    Decrease,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    pub etf_id: i64,
    pub etf_name: String,
    pub category: String,
    pub current_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationChange {
    pub etf_id: i64,
    pub etf_name: String,
    pub category: String,
    pub current_weight: f64,
    pub recommended_weight: f64,
    pub change_amount: f64,
    pub direction: ChangeDirection,
    pub change_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsEvidence {
    pub etf_id: i64,
    pub etf_name: String,
    pub news_title: String,
    pub news_url: String,
    pub published_at: NaiveDateTime,
    pub impact: Impact,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancingReport {
    pub portfolio_id: i64,
    pub portfolio_name: String,
    pub rebalancing_required: bool,
    pub rebalancing_reason: String,
    pub current_portfolio: Vec<AllocationView>,
    pub recommended_portfolio: Vec<AllocationChange>,
    pub news_evidence: Vec<NewsEvidence>,
    pub risk_assessment: RiskLevel,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_parses_first_word() {
        assert_eq!(RiskLevel::parse("HIGH"), RiskLevel::High);
        assert_eq!(RiskLevel::parse(" medium (sector concentration)"), RiskLevel::Medium);
        assert_eq!(RiskLevel::parse("Low."), RiskLevel::Low);
        assert_eq!(RiskLevel::parse(""), RiskLevel::Unknown);
        assert_eq!(RiskLevel::parse("moderate"), RiskLevel::Unknown);
    }

    #[test]
    fn unavailable_is_not_actionable() {
        let r = RebalancingRecommendation::unavailable();
        assert!(!r.rebalancing_required);
        assert!(r.recommended_weights.is_empty());
        assert_eq!(r.risk_level.as_str(), "UNKNOWN");
    }
}
