//! Wires the concrete adapters into the pipeline components the binaries serve.
//!
//! Each adapter is built independently. A component is available only when every adapter it
//! needs is; the rest keep working.

use crate::config::Settings;
use crate::ingest::{KoscomNewsFeed, NewsFeed};
use crate::llm::{judge_from_settings, TextJudge};
use crate::mail::{HttpMailRelay, Mailer};
use crate::pipeline::{
    AlertService, CatalogManager, NewsAnalyzer, NewsCollector, NotificationDispatcher, RebalancingOrchestrator,
    RecommendationPipeline, Tutor, TutorTemplate,
};
use crate::storage::{
    AuditLog, EtfCatalog, EtfCatalogAdmin, NewsStore, PortfolioStore, TutorHistoryStore,
};
use anyhow::Context;
use std::sync::Arc;

/// The outcome of constructing each external adapter.
pub struct Adapters {
    pub recommendation_judge: anyhow::Result<Arc<dyn TextJudge>>,
    pub analysis_judge: anyhow::Result<Arc<dyn TextJudge>>,
    pub feed: anyhow::Result<Arc<dyn NewsFeed>>,
    pub mailer: anyhow::Result<Arc<dyn Mailer>>,
    pub tutor_template: anyhow::Result<TutorTemplate>,
}

impl Adapters {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            recommendation_judge: judge_from_settings(settings, settings.recommendation_provider())
                .context("recommendation judge"),
            analysis_judge: judge_from_settings(settings, settings.analysis_provider())
                .context("analysis judge"),
            feed: KoscomNewsFeed::from_settings(settings)
                .map(|f| Arc::new(f) as Arc<dyn NewsFeed>)
                .context("news feed"),
            mailer: HttpMailRelay::from_settings(settings)
                .map(|m| Arc::new(m) as Arc<dyn Mailer>)
                .context("mail relay"),
            tutor_template: TutorTemplate::from_settings(settings).context("tutor template"),
        }
    }
}

fn available<T>(adapter: anyhow::Result<T>) -> Option<T> {
    match adapter {
        Ok(adapter) => Some(adapter),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "adapter unavailable; dependent features disabled");
            None
        }
    }
}

pub struct Services {
    catalog: CatalogManager,
    collector: Option<Arc<NewsCollector>>,
    recommendation: Option<RecommendationPipeline>,
    alerts: Option<AlertService>,
    rebalancing: Option<RebalancingOrchestrator>,
    dispatcher: Option<Arc<NotificationDispatcher>>,
    tutor: Option<Tutor>,
}

impl Services {
    pub fn from_settings<S>(settings: &Settings, store: Arc<S>) -> Self
    where
        S: EtfCatalog + EtfCatalogAdmin + NewsStore + PortfolioStore + AuditLog + TutorHistoryStore + 'static,
    {
        Self::assemble(Adapters::from_settings(settings), store)
    }

    pub fn assemble<S>(adapters: Adapters, store: Arc<S>) -> Self
    where
        S: EtfCatalog + EtfCatalogAdmin + NewsStore + PortfolioStore + AuditLog + TutorHistoryStore + 'static,
    {
        let recommendation_judge = available(adapters.recommendation_judge);
        let analysis_judge = available(adapters.analysis_judge);
        let feed = available(adapters.feed);
        let mailer = available(adapters.mailer);
        let template = available(adapters.tutor_template);

        let collector = feed.map(|feed| Arc::new(NewsCollector::new(feed, store.clone())));
        let analyzer = analysis_judge
            .clone()
            .map(|judge| Arc::new(NewsAnalyzer::new(judge, store.clone())));
        let dispatcher =
            mailer.map(|mailer| Arc::new(NotificationDispatcher::new(mailer, store.clone())));

        let recommendation = recommendation_judge
            .map(|judge| RecommendationPipeline::new(judge, store.clone()));

        let alerts = match (&collector, &analyzer, &dispatcher) {
            (Some(collector), Some(analyzer), Some(dispatcher)) => Some(AlertService::new(
                store.clone(),
                collector.clone(),
                analyzer.clone(),
                dispatcher.clone(),
            )),
            _ => None,
        };

        let rebalancing = match (&analysis_judge, &collector, &analyzer) {
            (Some(judge), Some(collector), Some(analyzer)) => Some(RebalancingOrchestrator::new(
                judge.clone(),
                store.clone(),
                store.clone(),
                collector.clone(),
                analyzer.clone(),
            )),
            _ => None,
        };

        let tutor = match (analysis_judge, template) {
            (Some(judge), Some(template)) => Some(Tutor::new(judge, store.clone(), template)),
            _ => None,
        };

        let services = Self {
            catalog: CatalogManager::new(store.clone(), store.clone()),
            collector,
            recommendation,
            alerts,
            rebalancing,
            dispatcher,
            tutor,
        };
        tracing::info!(
            recommendation = services.recommendation.is_some(),
            news_collection = services.collector.is_some(),
            alerts = services.alerts.is_some(),
            rebalancing = services.rebalancing.is_some(),
            notifications = services.dispatcher.is_some(),
            tutor = services.tutor.is_some(),
            "services ready"
        );
        services
    }

    /// Needs only the store, so it is always available.
    pub fn catalog(&self) -> &CatalogManager {
        &self.catalog
    }

    pub fn collector(&self) -> Option<&NewsCollector> {
        self.collector.as_deref()
    }

    pub fn recommendation(&self) -> Option<&RecommendationPipeline> {
        self.recommendation.as_ref()
    }

    pub fn alerts(&self) -> Option<&AlertService> {
        self.alerts.as_ref()
    }

    pub fn rebalancing(&self) -> Option<&RebalancingOrchestrator> {
        self.rebalancing.as_ref()
    }

    pub fn dispatcher(&self) -> Option<&NotificationDispatcher> {
        self.dispatcher.as_deref()
    }

    pub fn tutor(&self) -> Option<&Tutor> {
        self.tutor.as_ref()
    }
}
