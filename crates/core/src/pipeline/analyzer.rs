use crate::domain::etf::Etf;
use crate::domain::news::{AnalysisResult, NewsItem};
use crate::extract::{has_marker, labeled_field_or_empty};
use crate::llm::TextJudge;
use crate::storage::NewsStore;
use std::fmt::Write;
use std::sync::Arc;

pub const ALERT_MARKER: &str = "ALERT: YES";

pub fn analysis_prompt(etf: &Etf, news: &[NewsItem]) -> String {
    let mut listing = String::new();
    for (i, item) in news.iter().enumerate() {
        let _ = write!(
            listing,
            "{}. [{}] {}\n   {}\n   source: {} ({})\n\n",
            i + 1,
            item.published_at.format("%Y-%m-%d %H:%M"),
            item.title,
            item.content,
            item.source,
            item.url
        );
    }

    format!(
        "You are a financial analyst. Review the latest news about the ETF below and decide whether \
an investor must be alerted immediately about a material development.\n\n\
=== ETF ===\n\
Name: {}\n\
Category: {}\n\
Risk level: {} (0-9, 0 is most stable)\n\
Description: {}\n\
Change vs. last month: {}%\n\n\
=== Latest news ===\n{}\
=== Criteria ===\n\
1. Could the news materially affect the ETF's underlying assets or sector?\n\
2. Is it likely to move the price in the short term?\n\
3. Is it urgent information the investor needs to know now?\n\
4. Does it matter given the ETF's risk level and category?\n\n\
=== Response format (follow exactly) ===\n\
ALERT: YES or NO\n\
REASON: the basis for the decision in one sentence\n\
SUMMARY: the key points in 2-3 sentences (only when alerting)\n",
        etf.name,
        etf.category_or_default(),
        etf.risk_level,
        etf.description_or_default(),
        etf.change_rate,
        listing
    )
}

pub fn parse_analysis(text: &str) -> AnalysisResult {
    AnalysisResult {
        should_alert: has_marker(text, ALERT_MARKER),
        reason: labeled_field_or_empty(text, "REASON:"),
        summary: labeled_field_or_empty(text, "SUMMARY:"),
        full_analysis: text.to_string(),
    }
}

/// Decides whether freshly collected news warrants an alert. Never fails: judge errors become a
/// no-alert result carrying the error message.
pub struct NewsAnalyzer {
    judge: Arc<dyn TextJudge>,
    news: Arc<dyn NewsStore>,
}

impl NewsAnalyzer {
    pub fn new(judge: Arc<dyn TextJudge>, news: Arc<dyn NewsStore>) -> Self {
        Self { judge, news }
    }

    pub async fn analyze(&self, etf: &Etf, news: &[NewsItem]) -> AnalysisResult {
        if news.is_empty() {
            return AnalysisResult {
                should_alert: false,
                reason: "No news to analyze.".to_string(),
                ..AnalysisResult::default()
            };
        }

        let raw = match self.judge.submit(&analysis_prompt(etf, news)).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(etf_id = etf.id, error = %err, "news analysis failed");
                return AnalysisResult {
                    should_alert: false,
                    reason: format!("News analysis failed: {err}"),
                    ..AnalysisResult::default()
                };
            }
        };

        let result = parse_analysis(&raw);
        for item in news {
            if let Err(err) = self.news.mark_analyzed(item.id, result.should_alert).await {
                tracing::warn!(news_id = item.id, error = %err, "failed to mark news analyzed");
            }
        }

        tracing::info!(
            etf_id = etf.id,
            news = news.len(),
            should_alert = result.should_alert,
            "news analyzed"
        );
        result
    }
}
