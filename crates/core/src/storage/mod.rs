use crate::domain::audit::{AlertRecord, RebalancingRecord, TutorRecord};
use crate::domain::etf::{CandidateWindow, Constituent, Etf, NewEtf};
use crate::domain::news::{NewNewsItem, NewsItem};
use crate::domain::portfolio::{Allocation, Portfolio};
use anyhow::Context;

pub mod audit;
pub mod catalog;
pub mod lock;
pub mod news;
pub mod portfolio;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

#[async_trait::async_trait]
pub trait EtfCatalog: Send + Sync {
    async fn list_etfs(&self) -> anyhow::Result<Vec<Etf>>;

    async fn find_etf(&self, id: i64) -> anyhow::Result<Option<Etf>>;

    async fn find_etf_by_name(&self, name: &str) -> anyhow::Result<Option<Etf>>;

    /// Up to `limit` entries matching `window`, in catalog order.
    async fn find_in_window(
        &self,
        window: &CandidateWindow,
        limit: usize,
    ) -> anyhow::Result<Vec<Etf>>;
}

/// Result of removing a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// News or portfolio allocations still point at the entry.
    Referenced,
}

#[async_trait::async_trait]
pub trait EtfCatalogAdmin: Send + Sync {
    async fn create_etf(&self, etf: &NewEtf) -> anyhow::Result<Etf>;

    /// Replaces the whole constituent list. `None` when the ETF does not exist.
    async fn replace_constituents(
        &self,
        etf_id: i64,
        constituents: &[Constituent],
    ) -> anyhow::Result<Option<Etf>>;

    async fn delete_etf(&self, etf_id: i64) -> anyhow::Result<DeleteOutcome>;
}

#[async_trait::async_trait]
pub trait NewsStore: Send + Sync {
    async fn news_url_exists(&self, etf_id: i64, url: &str) -> anyhow::Result<bool>;

    async fn news_title_exists(&self, etf_id: i64, title: &str) -> anyhow::Result<bool>;

    async fn insert_news(&self, item: &NewNewsItem) -> anyhow::Result<NewsItem>;

    async fn mark_analyzed(&self, news_id: i64, alert_triggered: bool) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn find_portfolio(&self, id: i64) -> anyhow::Result<Option<Portfolio>>;

    async fn allocations(&self, portfolio_id: i64) -> anyhow::Result<Vec<Allocation>>;
}

#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_alert(&self, record: &AlertRecord) -> anyhow::Result<()>;

    async fn record_rebalancing(&self, record: &RebalancingRecord) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait TutorHistoryStore: Send + Sync {
    async fn record_tutor(&self, record: &TutorRecord) -> anyhow::Result<()>;
}

/// Postgres-backed implementation of every storage trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl EtfCatalog for PgStore {
    async fn list_etfs(&self) -> anyhow::Result<Vec<Etf>> {
        catalog::list_etfs(&self.pool).await
    }

    async fn find_etf(&self, id: i64) -> anyhow::Result<Option<Etf>> {
        catalog::find_etf(&self.pool, id).await
    }

    async fn find_etf_by_name(&self, name: &str) -> anyhow::Result<Option<Etf>> {
        catalog::find_etf_by_name(&self.pool, name).await
    }

    async fn find_in_window(
        &self,
        window: &CandidateWindow,
        limit: usize,
    ) -> anyhow::Result<Vec<Etf>> {
        catalog::find_in_window(&self.pool, window, limit).await
    }
}

#[async_trait::async_trait]
impl EtfCatalogAdmin for PgStore {
    async fn create_etf(&self, etf: &NewEtf) -> anyhow::Result<Etf> {
        catalog::create_etf(&self.pool, etf).await
    }

    async fn replace_constituents(
        &self,
        etf_id: i64,
        constituents: &[Constituent],
    ) -> anyhow::Result<Option<Etf>> {
        catalog::replace_constituents(&self.pool, etf_id, constituents).await
    }

    async fn delete_etf(&self, etf_id: i64) -> anyhow::Result<DeleteOutcome> {
        catalog::delete_etf(&self.pool, etf_id).await
    }
}

#[async_trait::async_trait]
impl NewsStore for PgStore {
    async fn news_url_exists(&self, etf_id: i64, url: &str) -> anyhow::Result<bool> {
        news::url_exists(&self.pool, etf_id, url).await
    }

    async fn news_title_exists(&self, etf_id: i64, title: &str) -> anyhow::Result<bool> {
        news::title_exists(&self.pool, etf_id, title).await
    }

    async fn insert_news(&self, item: &NewNewsItem) -> anyhow::Result<NewsItem> {
        news::insert(&self.pool, item).await
    }

    async fn mark_analyzed(&self, news_id: i64, alert_triggered: bool) -> anyhow::Result<()> {
        news::mark_analyzed(&self.pool, news_id, alert_triggered).await
    }
}

#[async_trait::async_trait]
impl PortfolioStore for PgStore {
    async fn find_portfolio(&self, id: i64) -> anyhow::Result<Option<Portfolio>> {
        portfolio::find_portfolio(&self.pool, id).await
    }

    async fn allocations(&self, portfolio_id: i64) -> anyhow::Result<Vec<Allocation>> {
        portfolio::allocations(&self.pool, portfolio_id).await
    }
}

#[async_trait::async_trait]
impl AuditLog for PgStore {
    async fn record_alert(&self, record: &AlertRecord) -> anyhow::Result<()> {
        audit::record_alert(&self.pool, record).await.map(|_| ())
    }

    async fn record_rebalancing(&self, record: &RebalancingRecord) -> anyhow::Result<()> {
        audit::record_rebalancing(&self.pool, record).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl TutorHistoryStore for PgStore {
    async fn record_tutor(&self, record: &TutorRecord) -> anyhow::Result<()> {
        audit::record_tutor(&self.pool, record).await.map(|_| ())
    }
}
