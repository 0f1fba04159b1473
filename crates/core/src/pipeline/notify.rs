use crate::domain::audit::{AlertRecord, RebalancingRecord, ALERT_TYPE_NEWS, CHANNEL_EMAIL};
use crate::domain::etf::Etf;
use crate::domain::news::{AnalysisResult, NewsItem};
use crate::domain::rebalancing::RebalancingReport;
use crate::mail::render::{etf_alert_html, etf_alert_subject, rebalancing_html, rebalancing_subject};
use crate::mail::Mailer;
use crate::storage::AuditLog;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Sends notifications and writes exactly one audit record per attempt, whatever the outcome.
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    audit: Arc<dyn AuditLog>,
}

/// The text stored as an alert's content: the analysis summary, or its reason when no summary
/// was given.
pub fn alert_content(analysis: &AnalysisResult) -> &str {
    if analysis.summary.trim().is_empty() {
        &analysis.reason
    } else {
        &analysis.summary
    }
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, audit: Arc<dyn AuditLog>) -> Self {
        Self { mailer, audit }
    }

    pub async fn send_etf_alert(
        &self,
        etf: &Etf,
        analysis: &AnalysisResult,
        news: &[NewsItem],
        member_id: i64,
        recipient: &str,
    ) -> bool {
        let content = alert_content(analysis);
        let html = etf_alert_html(etf, content, news, Utc::now());
        let outcome = self.mailer.send(recipient, &etf_alert_subject(etf), &html).await;

        let record = AlertRecord {
            etf_id: etf.id,
            etf_name: etf.name.clone(),
            member_id,
            alert_type: ALERT_TYPE_NEWS,
            channel: CHANNEL_EMAIL,
            recipient: recipient.to_string(),
            content: content.to_string(),
            sent: outcome.is_ok(),
            failure_reason: outcome.as_ref().err().map(|e| format!("{e:#}")),
        };

        match &outcome {
            Ok(()) => tracing::info!(etf_id = etf.id, recipient, "ETF alert sent"),
            Err(err) => tracing::warn!(etf_id = etf.id, recipient, error = %format!("{err:#}"), "ETF alert mail failed"),
        }
        if let Err(err) = self.audit.record_alert(&record).await {
            tracing::warn!(etf_id = etf.id, error = %format!("{err:#}"), "failed to record alert history");
        }
        record.sent
    }

    pub async fn send_rebalancing(
        &self,
        report: &RebalancingReport,
        member_id: i64,
        recipient: &str,
        period_months: i32,
    ) -> bool {
        let outcome = self
            .mailer
            .send(recipient, &rebalancing_subject(report), &rebalancing_html(report))
            .await;

        let before = to_json(&report.current_portfolio);
        let after = if report.rebalancing_required {
            to_json(&report.recommended_portfolio)
        } else {
            before.clone()
        };
        let record = RebalancingRecord {
            portfolio_id: report.portfolio_id,
            portfolio_name: report.portfolio_name.clone(),
            member_id,
            period_months,
            channel: CHANNEL_EMAIL,
            recipient: recipient.to_string(),
            reason: report.rebalancing_reason.clone(),
            news_evidence: to_json(&report.news_evidence),
            before_allocation: before,
            after_allocation: after,
            sent: outcome.is_ok(),
            failure_reason: outcome.as_ref().err().map(|e| format!("{e:#}")),
        };

        match &outcome {
            Ok(()) => tracing::info!(portfolio_id = report.portfolio_id, recipient, "rebalancing report sent"),
            Err(err) => tracing::warn!(
                portfolio_id = report.portfolio_id,
                recipient,
                error = %format!("{err:#}"),
                "rebalancing report mail failed"
            ),
        }
        if let Err(err) = self.audit.record_rebalancing(&record).await {
            tracing::warn!(
                portfolio_id = report.portfolio_id,
                error = %format!("{err:#}"),
                "failed to record rebalancing history"
            );
        }
        record.sent
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to serialise audit snapshot");
        Value::Null
    })
}
