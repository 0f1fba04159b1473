use crate::domain::etf::Etf;
use crate::domain::recommendation::{RecommendationResult, PORTFOLIO_SIZE, REASON_LINES};
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The JSON object the recommendation judge is asked to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRecommendation {
    pub investment_profile: String,
    pub etf_risk_score: i32,
    pub dividend_score: i32,
    pub expected_total_return: i32,
    pub portfolio_weights: Vec<i32>,
    pub etfs: Vec<LlmEtfRef>,
    pub reason_summary: String,
}

/// The judge echoes whole candidate objects; only the id is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmEtfRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl LlmRecommendation {
    pub fn validate_and_into_result(self, candidates: &[Etf]) -> anyhow::Result<RecommendationResult> {
        let investment_profile = self.investment_profile.trim().to_string();
        ensure!(
            !investment_profile.is_empty(),
            "investmentProfile must be non-empty"
        );

        ensure!(
            (0..=100).contains(&self.etf_risk_score),
            "etfRiskScore must be 0..=100 (got {})",
            self.etf_risk_score
        );
        ensure!(
            (0..=100).contains(&self.dividend_score),
            "dividendScore must be 0..=100 (got {})",
            self.dividend_score
        );

        let weights = validate_weights(&self.portfolio_weights)?;
        let etfs = resolve_etfs(&self.etfs, candidates)?;
        let reason_summary = split_reason_lines(&self.reason_summary)?;

        Ok(RecommendationResult {
            investment_profile,
            risk_score: self.etf_risk_score,
            dividend_score: self.dividend_score,
            expected_return: self.expected_total_return,
            weights,
            etfs,
            reason_summary,
        })
    }
}

fn validate_weights(raw: &[i32]) -> anyhow::Result<[i32; PORTFOLIO_SIZE]> {
    let weights: [i32; PORTFOLIO_SIZE] = match raw.try_into() {
        Ok(w) => w,
        Err(_) => bail!(
            "portfolioWeights must have exactly {PORTFOLIO_SIZE} entries (got {})",
            raw.len()
        ),
    };

    for w in weights {
        ensure!((0..=100).contains(&w), "weight out of range: {w}");
    }

    let sum: i32 = weights.iter().sum();
    ensure!(sum == 100, "portfolioWeights must sum to 100 (got {sum})");
    Ok(weights)
}

fn resolve_etfs(refs: &[LlmEtfRef], candidates: &[Etf]) -> anyhow::Result<Vec<Etf>> {
    ensure!(
        refs.len() == PORTFOLIO_SIZE,
        "etfs must have exactly {PORTFOLIO_SIZE} entries (got {})",
        refs.len()
    );

    let mut seen = BTreeSet::<i64>::new();
    let mut out = Vec::with_capacity(PORTFOLIO_SIZE);
    for r in refs {
        ensure!(seen.insert(r.id), "duplicate etf id: {}", r.id);
        let Some(etf) = candidates.iter().find(|c| c.id == r.id) else {
            bail!("etf id {} ({}) is not in the candidate set", r.id, r.name);
        };
        out.push(etf.clone());
    }
    Ok(out)
}

fn split_reason_lines(raw: &str) -> anyhow::Result<[String; REASON_LINES]> {
    // Some models double-escape the newlines inside the JSON string.
    let normalized = raw.replace("\\n", "\n");
    let lines: Vec<String> = normalized
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    match <[String; REASON_LINES]>::try_from(lines) {
        Ok(lines) => Ok(lines),
        Err(lines) => bail!(
            "reasonSummary must have exactly {REASON_LINES} lines (got {})",
            lines.len()
        ),
    }
}
