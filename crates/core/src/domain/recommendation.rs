use crate::domain::etf::Etf;
use serde::Serialize;

pub const PORTFOLIO_SIZE: usize = 5;
pub const REASON_LINES: usize = 3;

/// A validated five-ETF portfolio recommendation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub investment_profile: String,
    /// 0 ..= 100
    pub risk_score: i32,
    /// 0 ..= 100
    pub dividend_score: i32,
    pub expected_return: i32,
    /// Sums to 100.
    pub weights: [i32; PORTFOLIO_SIZE],
    /// Catalog entries, in the same order as `weights`.
    pub etfs: Vec<Etf>,
    pub reason_summary: [String; REASON_LINES],
}
