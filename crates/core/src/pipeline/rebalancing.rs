use crate::domain::etf::Etf;
use crate::domain::news::{AnalysisResult, NewsItem};
use crate::domain::portfolio::{Allocation, Portfolio};
use crate::domain::rebalancing::{
    AllocationChange, AllocationView, ChangeDirection, Impact, NewsEvidence,
    RebalancingRecommendation, RebalancingReport, RiskLevel,
};
use crate::extract::{has_marker, labeled_field_or_empty, recommended_weight};
use crate::llm::TextJudge;
use crate::pipeline::analyzer::NewsAnalyzer;
use crate::pipeline::collector::NewsCollector;
use crate::storage::{EtfCatalog, PortfolioStore};
use crate::CoreError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

pub const REBALANCING_MARKER: &str = "REBALANCING: YES";
pub const MAINTAIN_THRESHOLD: f64 = 1.0;
pub const HEADLINES_PER_ETF: usize = 3;
pub const EVIDENCE_PER_ETF: usize = 3;

const INCREASE_POSITIVE: &[&str] = &["상승", "호재", "긍정", "성장", "rise", "rally", "positive", "growth"];
const INCREASE_STABLE: &[&str] = &["안정", "유지", "stable", "steady"];
const DECREASE_NEGATIVE: &[&str] = &["하락", "악재", "부정", "위험", "decline", "fall", "negative", "risk"];
const DECREASE_OVERHEATED: &[&str] = &["과열", "급등", "변동성", "overheat", "surge", "volatil"];
const DECREASE_CORRECTION: &[&str] = &["조정", "correction"];

/// One allocation with the news collected for it and, when there was news, its analysis.
#[derive(Debug, Clone)]
pub struct EtfBundle {
    pub etf: Etf,
    pub allocation: Allocation,
    pub news: Vec<NewsItem>,
    pub analysis: Option<AnalysisResult>,
}

#[derive(Debug, Clone)]
pub struct RebalancingOutcome {
    pub portfolio: Portfolio,
    pub recommendation: RebalancingRecommendation,
    pub report: RebalancingReport,
}

pub fn rebalancing_prompt(bundles: &[EtfBundle]) -> String {
    let mut p = String::from(
        "You are a professional portfolio manager. Analyse the latest news for the portfolio below, \
decide whether it needs rebalancing and, if so, recommend concrete target weights.\n\n\
=== Current allocation ===\n",
    );
    for b in bundles {
        let _ = writeln!(
            p,
            "- {}: {:.0}% (risk level: {}, category: {})",
            b.etf.name,
            b.allocation.target_weight_percent,
            b.etf.risk_level,
            b.etf.category_or_default()
        );
    }

    p.push_str("\n=== Latest news and analysis per ETF ===\n");
    for b in bundles.iter().filter(|b| !b.news.is_empty()) {
        let _ = write!(
            p,
            "\n[{}]\nCurrent weight: {:.0}%\n",
            b.etf.name, b.allocation.target_weight_percent
        );
        if let Some(analysis) = &b.analysis {
            if !analysis.reason.is_empty() {
                let _ = writeln!(p, "Analysis: {}", analysis.reason);
            }
        }
        p.push_str("Key news:\n");
        for item in b.news.iter().take(HEADLINES_PER_ETF) {
            let _ = writeln!(
                p,
                "  - {} ({})",
                item.title,
                item.published_at.format("%m-%d %H:%M")
            );
        }
    }

    p.push_str(
        "\n=== Requests ===\n\
1. Considering the news above, decide whether the portfolio needs rebalancing.\n\
2. If it does, give a recommended weight (%) for each ETF.\n\
3. Explain the basis for rebalancing clearly.\n\
4. Point out the risks the investor should know about.\n\n\
=== Response format (follow exactly) ===\n\
REBALANCING: YES or NO\n\
REASON: the basis for the decision in 2-3 sentences\n\
RISK_LEVEL: one of LOW, MEDIUM, HIGH\n\
RECOMMENDATIONS:\n",
    );
    for b in bundles {
        let _ = writeln!(
            p,
            "- {}: {:.0} -> [recommended weight]% (reason)",
            b.etf.name, b.allocation.target_weight_percent
        );
    }
    p.push_str("\nADVICE: advice for the investor (2-3 sentences)\n");
    p
}

/// Reads the labeled response. An ETF without a `name ... -> N%` line keeps its current weight.
pub fn parse_rebalancing(text: &str, bundles: &[EtfBundle]) -> RebalancingRecommendation {
    let recommended_weights: BTreeMap<i64, f64> = bundles
        .iter()
        .map(|b| {
            let weight = recommended_weight(text, &b.etf.name)
                .map(f64::from)
                .unwrap_or(b.allocation.target_weight_percent);
            (b.etf.id, weight)
        })
        .collect();

    RebalancingRecommendation {
        rebalancing_required: has_marker(text, REBALANCING_MARKER),
        reason: labeled_field_or_empty(text, "REASON:"),
        risk_level: RiskLevel::parse(&labeled_field_or_empty(text, "RISK_LEVEL:")),
        recommended_weights,
        advice: labeled_field_or_empty(text, "ADVICE:"),
        full_analysis: text.to_string(),
    }
}

pub fn classify(change_amount: f64) -> ChangeDirection {
    if change_amount.abs() < MAINTAIN_THRESHOLD {
        ChangeDirection::Maintain
    } else if change_amount > 0.0 {
        ChangeDirection::Increase
    } else {
        ChangeDirection::Decrease
    }
}

fn mentions_any(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

/// Human-readable narrative for one allocation change.
pub fn change_reason(etf: &Etf, direction: ChangeDirection, analysis: Option<&AnalysisResult>) -> String {
    let motive = match (direction, analysis) {
        (ChangeDirection::Maintain, _) => {
            return format!(
                "{} is at an appropriate weight for current market conditions; no adjustment needed",
                etf.name
            );
        }
        (ChangeDirection::Increase, Some(a)) => {
            if a.reason.trim().is_empty() {
                "risk diversification and portfolio stabilisation"
            } else if mentions_any(&a.reason, INCREASE_POSITIVE) {
                "positive market momentum and growth potential"
            } else if mentions_any(&a.reason, INCREASE_STABLE) {
                "a stable market environment"
            } else {
                "stronger portfolio diversification"
            }
        }
        (ChangeDirection::Decrease, Some(a)) => {
            if a.reason.trim().is_empty() {
                "the need to rebalance the portfolio"
            } else if mentions_any(&a.reason, DECREASE_NEGATIVE) {
                "market uncertainty and downside risk"
            } else if mentions_any(&a.reason, DECREASE_OVERHEATED) {
                "an overheated market and high volatility"
            } else if mentions_any(&a.reason, DECREASE_CORRECTION) {
                "managing correction risk"
            } else {
                "the risk of an excessive weight"
            }
        }
        (ChangeDirection::Increase, None) => {
            let category = etf.category.to_lowercase();
            if category.contains("해외") || category.contains("overseas") || category.contains("global") {
                "diversification into overseas assets"
            } else if category.contains("채권") || category.contains("bond") {
                "a larger share of more stable assets"
            } else {
                "portfolio balance adjustment"
            }
        }
        (ChangeDirection::Decrease, None) => {
            let category = etf.category.to_lowercase();
            if category.contains("국내") || category.contains("domestic") {
                "easing concentration in domestic assets"
            } else {
                "portfolio risk management"
            }
        }
    };

    let verb = if direction == ChangeDirection::Increase {
        "increased"
    } else {
        "reduced"
    };
    format!("{} weight {verb} in view of {motive}", etf.name)
}

pub fn compute_changes(
    bundles: &[EtfBundle],
    recommendation: &RebalancingRecommendation,
) -> Vec<AllocationChange> {
    bundles
        .iter()
        .map(|b| {
            let current = b.allocation.target_weight_percent;
            let recommended = recommendation
                .recommended_weights
                .get(&b.etf.id)
                .copied()
                .unwrap_or(current);
            let change_amount = recommended - current;
            let direction = classify(change_amount);
            AllocationChange {
                etf_id: b.etf.id,
                etf_name: b.etf.name.clone(),
                category: b.etf.category_or_default().to_string(),
                current_weight: current,
                recommended_weight: recommended,
                change_amount,
                direction,
                change_reason: change_reason(&b.etf, direction, b.analysis.as_ref()),
            }
        })
        .collect()
}

pub fn collect_evidence(bundles: &[EtfBundle]) -> Vec<NewsEvidence> {
    let mut out = Vec::new();
    for b in bundles {
        let impact = match &b.analysis {
            Some(a) if a.should_alert => Impact::Negative,
            _ => Impact::Neutral,
        };
        for item in b.news.iter().take(EVIDENCE_PER_ETF) {
            let summary = match &b.analysis {
                Some(a) if !a.reason.trim().is_empty() => a.reason.clone(),
                _ => item.content.clone(),
            };
            out.push(NewsEvidence {
                etf_id: b.etf.id,
                etf_name: b.etf.name.clone(),
                news_title: item.title.clone(),
                news_url: item.url.clone(),
                published_at: item.published_at,
                impact,
                summary,
            });
        }
    }
    out
}

/// Splits advice into sentences on `". "`, dropping trailing periods and blanks.
pub fn split_advice(advice: &str) -> Vec<String> {
    advice
        .split(". ")
        .map(|s| s.trim().trim_end_matches('.').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn build_report(
    portfolio: &Portfolio,
    bundles: &[EtfBundle],
    recommendation: &RebalancingRecommendation,
    analyzed_at: DateTime<Utc>,
) -> RebalancingReport {
    let current_portfolio = bundles
        .iter()
        .map(|b| AllocationView {
            etf_id: b.etf.id,
            etf_name: b.etf.name.clone(),
            category: b.etf.category_or_default().to_string(),
            current_weight: b.allocation.target_weight_percent,
        })
        .collect();

    RebalancingReport {
        portfolio_id: portfolio.id,
        portfolio_name: portfolio.name.clone(),
        rebalancing_required: recommendation.rebalancing_required,
        rebalancing_reason: recommendation.reason.clone(),
        current_portfolio,
        recommended_portfolio: compute_changes(bundles, recommendation),
        news_evidence: collect_evidence(bundles),
        risk_assessment: recommendation.risk_level,
        recommendations: split_advice(&recommendation.advice),
        analyzed_at,
    }
}

/// Runs collection and analysis for every allocation of a portfolio, then asks the judge for a
/// portfolio-wide rebalancing decision.
pub struct RebalancingOrchestrator {
    judge: Arc<dyn TextJudge>,
    catalog: Arc<dyn EtfCatalog>,
    portfolios: Arc<dyn PortfolioStore>,
    collector: Arc<NewsCollector>,
    analyzer: Arc<NewsAnalyzer>,
}

impl RebalancingOrchestrator {
    pub fn new(
        judge: Arc<dyn TextJudge>,
        catalog: Arc<dyn EtfCatalog>,
        portfolios: Arc<dyn PortfolioStore>,
        collector: Arc<NewsCollector>,
        analyzer: Arc<NewsAnalyzer>,
    ) -> Self {
        Self {
            judge,
            catalog,
            portfolios,
            collector,
            analyzer,
        }
    }

    pub async fn analyze(
        &self,
        portfolio_id: i64,
        member_id: i64,
    ) -> Result<RebalancingOutcome, CoreError> {
        let portfolio = self
            .portfolios
            .find_portfolio(portfolio_id)
            .await?
            .filter(|p| p.member_id == member_id)
            .ok_or_else(|| CoreError::not_found("portfolio", portfolio_id))?;

        let allocations = self.portfolios.allocations(portfolio_id).await?;
        if allocations.is_empty() {
            return Err(CoreError::EmptyPortfolio { portfolio_id });
        }

        tracing::info!(portfolio_id, allocations = allocations.len(), "rebalancing analysis started");

        let mut bundles = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let etf = self
                .catalog
                .find_etf(allocation.etf_id)
                .await?
                .ok_or_else(|| CoreError::not_found("etf", allocation.etf_id))?;

            let news = self.collector.collect_now(&etf).await?;
            let analysis = if news.is_empty() {
                None
            } else {
                Some(self.analyzer.analyze(&etf, &news).await)
            };
            bundles.push(EtfBundle {
                etf,
                allocation,
                news,
                analysis,
            });
        }

        let recommendation = match self.judge.submit(&rebalancing_prompt(&bundles)).await {
            Ok(raw) => parse_rebalancing(&raw, &bundles),
            Err(err) => {
                tracing::error!(portfolio_id, error = %err, "rebalancing judge failed; keeping current allocation");
                RebalancingRecommendation::unavailable()
            }
        };

        let report = build_report(&portfolio, &bundles, &recommendation, Utc::now());
        tracing::info!(
            portfolio_id,
            rebalancing_required = recommendation.rebalancing_required,
            risk = recommendation.risk_level.as_str(),
            evidence = report.news_evidence.len(),
            "rebalancing analysis finished"
        );

        Ok(RebalancingOutcome {
            portfolio,
            recommendation,
            report,
        })
    }
}
