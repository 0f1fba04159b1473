use serde::{Deserialize, Serialize};

/// A catalog entry. Field names on the wire match the catalog's JSON shape, which is also what the
/// recommendation judge is shown and asked to echo back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Etf {
    pub id: i64,
    pub name: String,
    /// Month-over-month change rate in whole percent.
    #[serde(rename = "fltRt")]
    pub change_rate: i32,
    /// 0 (most stable) ..= 9 (leveraged / speculative).
    pub risk_level: i32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "stockList")]
    pub constituents: Vec<Constituent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constituent {
    pub code: String,
    pub name: String,
    pub weight_percent: f64,
}

impl Etf {
    /// Up to `n` constituents, heaviest first. Ties keep catalog order.
    pub fn top_constituents(&self, n: usize) -> Vec<&Constituent> {
        let mut sorted: Vec<&Constituent> = self.constituents.iter().collect();
        sorted.sort_by(|a, b| {
            b.weight_percent
                .partial_cmp(&a.weight_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(n);
        sorted
    }

    pub fn category_or_default(&self) -> &str {
        non_blank(&self.category).unwrap_or("unclassified")
    }

    pub fn description_or_default(&self) -> &str {
        non_blank(&self.description).unwrap_or("no description")
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

/// A catalog entry to be created. Constituents are attached afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEtf {
    pub name: String,
    #[serde(rename = "fltRt")]
    pub change_rate: i32,
    pub risk_level: i32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Per-ETF constituent count for the catalog overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituentSummary {
    pub etf_id: i64,
    pub etf_name: String,
    pub category: String,
    pub constituent_count: usize,
}

/// One ETF's constituents, heaviest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstituentListing {
    pub etf_id: i64,
    pub etf_name: String,
    pub total_constituents: usize,
    pub constituents: Vec<Constituent>,
}

/// Inclusive score window used to pick recommendation candidates. An ETF qualifies when it falls
/// inside either range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateWindow {
    pub change_rate_min: i32,
    pub change_rate_max: i32,
    pub risk_level_min: i32,
    pub risk_level_max: i32,
}

impl CandidateWindow {
    pub fn matches(&self, etf: &Etf) -> bool {
        (self.change_rate_min..=self.change_rate_max).contains(&etf.change_rate)
            || (self.risk_level_min..=self.risk_level_max).contains(&etf.risk_level)
    }
}

/// One survey question and the member's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePair {
    /// -10000 ..= 10000; negative means volatility-averse.
    pub volatility_score: i32,
    /// 0 ..= 9, same scale as [`Etf::risk_level`].
    pub risk_score: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn top_constituents_orders_by_weight() {
        let etf: Etf = serde_json::from_value(json!({
            "id": 1,
            "name": "KODEX 200",
            "fltRt": 3,
            "riskLevel": 5,
            "stockList": [
                {"code": "000660", "name": "SK하이닉스", "weightPercent": 12.5},
                {"code": "005930", "name": "삼성전자", "weightPercent": 31.0},
                {"code": "373220", "name": "LG에너지솔루션", "weightPercent": 4.2},
            ]
        }))
        .unwrap();

        let top: Vec<_> = etf.top_constituents(2).iter().map(|c| c.code.as_str()).collect();
        assert_eq!(top, vec!["005930", "000660"]);
        assert_eq!(etf.top_constituents(5).len(), 3);
        assert_eq!(etf.category_or_default(), "unclassified");
    }
}
