use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: i64,
    pub member_id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A portfolio's target weight for one ETF. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub portfolio_id: i64,
    pub etf_id: i64,
    pub target_weight_percent: f64,
}
