use crate::domain::news::NewsItem;
use crate::pipeline::analyzer::NewsAnalyzer;
use crate::pipeline::collector::NewsCollector;
use crate::pipeline::notify::NotificationDispatcher;
use crate::storage::EtfCatalog;
use crate::CoreError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    NoNews,
    Success,
    Failed,
    NotRequired,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOutcome {
    pub etf_id: i64,
    pub etf_name: String,
    pub category: String,
    pub risk_level: i32,
    pub change_rate: i32,
    pub news: Vec<NewsItem>,
    pub should_alert: bool,
    pub reason: String,
    pub summary: String,
    pub full_analysis: String,
    pub notification_status: NotificationStatus,
}

/// Collect, analyze and, when the news is material, mail the subscriber.
pub struct AlertService {
    catalog: Arc<dyn EtfCatalog>,
    collector: Arc<NewsCollector>,
    analyzer: Arc<NewsAnalyzer>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl AlertService {
    pub fn new(
        catalog: Arc<dyn EtfCatalog>,
        collector: Arc<NewsCollector>,
        analyzer: Arc<NewsAnalyzer>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            catalog,
            collector,
            analyzer,
            dispatcher,
        }
    }

    pub async fn analyze_and_notify(
        &self,
        etf_name: &str,
        email: &str,
        member_id: i64,
    ) -> Result<AlertOutcome, CoreError> {
        let etf = self
            .catalog
            .find_etf_by_name(etf_name)
            .await?
            .ok_or_else(|| CoreError::not_found("etf", etf_name))?;

        let news = self.collector.collect_now(&etf).await?;
        let mut outcome = AlertOutcome {
            etf_id: etf.id,
            etf_name: etf.name.clone(),
            category: etf.category_or_default().to_string(),
            risk_level: etf.risk_level,
            change_rate: etf.change_rate,
            news: Vec::new(),
            should_alert: false,
            reason: String::new(),
            summary: String::new(),
            full_analysis: String::new(),
            notification_status: NotificationStatus::NoNews,
        };

        if news.is_empty() {
            tracing::info!(etf_id = etf.id, "no new news collected; nothing to analyze");
            outcome.reason = "No news was collected.".to_string();
            return Ok(outcome);
        }

        let analysis = self.analyzer.analyze(&etf, &news).await;
        outcome.notification_status = if analysis.should_alert {
            if self
                .dispatcher
                .send_etf_alert(&etf, &analysis, &news, member_id, email)
                .await
            {
                NotificationStatus::Success
            } else {
                NotificationStatus::Failed
            }
        } else {
            NotificationStatus::NotRequired
        };

        tracing::info!(
            etf_id = etf.id,
            news = news.len(),
            should_alert = analysis.should_alert,
            status = ?outcome.notification_status,
            "ETF alert flow finished"
        );

        outcome.should_alert = analysis.should_alert;
        outcome.reason = analysis.reason;
        outcome.summary = analysis.summary;
        outcome.full_analysis = analysis.full_analysis;
        outcome.news = news;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog, feed_item, CannedFeed, FakeMailer, InMemoryStore, ScriptedJudge};

    struct Harness {
        service: AlertService,
        judge: Arc<ScriptedJudge>,
        mailer: Arc<FakeMailer>,
        store: Arc<InMemoryStore>,
    }

    fn harness(judge: ScriptedJudge, feed: CannedFeed, mailer: FakeMailer) -> Harness {
        let judge = Arc::new(judge);
        let mailer = Arc::new(mailer);
        let store = Arc::new(InMemoryStore::with_etfs(catalog()));
        let service = AlertService::new(
            store.clone(),
            Arc::new(NewsCollector::new(Arc::new(feed), store.clone())),
            Arc::new(NewsAnalyzer::new(judge.clone(), store.clone())),
            Arc::new(NotificationDispatcher::new(mailer.clone(), store.clone())),
        );
        Harness {
            service,
            judge,
            mailer,
            store,
        }
    }

    fn samsung_feed() -> CannedFeed {
        CannedFeed::default().with("005930", vec![feed_item("N1", "수출 규제 발표")])
    }

    #[tokio::test]
    async fn material_news_is_mailed() {
        let h = harness(
            ScriptedJudge::always("ALERT: YES\nREASON: spike\nSUMMARY: details"),
            samsung_feed(),
            FakeMailer::default(),
        );

        let out = h.service.analyze_and_notify("KODEX 200", "a@b.c", 7).await.unwrap();

        assert_eq!(out.notification_status, NotificationStatus::Success);
        assert!(out.should_alert);
        assert_eq!(out.summary, "details");
        assert_eq!(out.news.len(), 1);
        assert_eq!(h.mailer.sent().len(), 1);
        assert_eq!(h.store.alerts().len(), 1);
        assert!(h.store.news()[0].alert_triggered);
    }

    #[tokio::test]
    async fn immaterial_news_is_not_mailed() {
        let h = harness(
            ScriptedJudge::always("ALERT: NO\nREASON: routine"),
            samsung_feed(),
            FakeMailer::default(),
        );

        let out = h.service.analyze_and_notify("KODEX 200", "a@b.c", 7).await.unwrap();

        assert_eq!(out.notification_status, NotificationStatus::NotRequired);
        assert_eq!(out.reason, "routine");
        assert!(h.mailer.sent().is_empty());
        assert!(h.store.alerts().is_empty());
    }

    #[tokio::test]
    async fn mail_failure_is_reported() {
        let h = harness(
            ScriptedJudge::always("ALERT: YES\nREASON: spike"),
            samsung_feed(),
            FakeMailer::failing(),
        );

        let out = h.service.analyze_and_notify("KODEX 200", "a@b.c", 7).await.unwrap();

        assert_eq!(out.notification_status, NotificationStatus::Failed);
        assert!(!h.store.alerts()[0].sent);
    }

    #[tokio::test]
    async fn no_news_skips_the_judge() {
        let h = harness(ScriptedJudge::failing(), CannedFeed::default(), FakeMailer::default());

        let out = h.service.analyze_and_notify("KODEX 200", "a@b.c", 7).await.unwrap();

        assert_eq!(out.notification_status, NotificationStatus::NoNews);
        assert_eq!(h.judge.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_etf_is_not_found() {
        let h = harness(ScriptedJudge::failing(), CannedFeed::default(), FakeMailer::default());

        let err = h.service.analyze_and_notify("없는 ETF", "a@b.c", 7).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "etf", .. }));
    }
}
