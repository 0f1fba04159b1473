//! Fakes and fixtures shared by unit tests.

use crate::domain::audit::{AlertRecord, RebalancingRecord, TutorRecord};
use crate::domain::etf::{CandidateWindow, Constituent, Etf, NewEtf};
use crate::domain::news::{FeedItem, NewNewsItem, NewsItem};
use crate::domain::portfolio::{Allocation, Portfolio};
use crate::ingest::NewsFeed;
use crate::llm::error::JudgeError;
use crate::llm::{Provider, TextJudge};
use crate::mail::Mailer;
use crate::storage::{
    AuditLog, DeleteOutcome, EtfCatalog, EtfCatalogAdmin, NewsStore, PortfolioStore,
    TutorHistoryStore,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub fn etf(id: i64, name: &str, change_rate: i32, risk_level: i32) -> Etf {
    Etf {
        id,
        name: name.to_string(),
        change_rate,
        risk_level,
        category: String::new(),
        description: String::new(),
        constituents: Vec::new(),
    }
}

pub fn constituent(code: &str, name: &str, weight_percent: f64) -> Constituent {
    Constituent {
        code: code.to_string(),
        name: name.to_string(),
        weight_percent,
    }
}

/// Six ETFs with ids 1..=6.
pub fn catalog() -> Vec<Etf> {
    vec![
        Etf {
            category: "국내주식".to_string(),
            constituents: vec![
                constituent("005930", "삼성전자", 31.0),
                constituent("000660", "SK하이닉스", 12.0),
            ],
            ..etf(1, "KODEX 200", 3, 5)
        },
        Etf {
            category: "해외주식".to_string(),
            ..etf(2, "TIGER 미국S&P500", 8, 4)
        },
        Etf {
            category: "채권".to_string(),
            ..etf(3, "ACE 국고채10년", -1, 1)
        },
        etf(4, "KODEX 배당성장", 2, 3),
        etf(5, "TIGER 2차전지테마", 45, 8),
        etf(6, "KODEX 레버리지", 60, 9),
    ]
}

pub fn recommendation_json(ids: &[i64]) -> String {
    let etfs: Vec<_> = ids.iter().map(|id| json!({"id": id, "name": format!("ETF {id}")})).collect();
    json!({
        "investmentProfile": "안정 추구형",
        "etfRiskScore": 40,
        "dividendScore": 35,
        "expectedTotalReturn": 6,
        "portfolioWeights": [30, 25, 20, 15, 10],
        "etfs": etfs,
        "reasonSummary": "분산 투자\n배당 안정성\n낮은 변동성",
    })
    .to_string()
}

pub fn published() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 14)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap()
}

pub fn news_item(id: i64, etf_id: i64, title: &str, url: &str) -> NewsItem {
    NewsItem {
        id,
        etf_id,
        title: title.to_string(),
        content: format!("[{title}] related news"),
        url: url.to_string(),
        source: "KOSCOM".to_string(),
        published_at: published(),
        collected_at: Utc::now(),
        analyzed: false,
        alert_triggered: false,
    }
}

pub fn feed_item(code: &str, title: &str) -> FeedItem {
    FeedItem {
        date: "20261014".to_string(),
        code: code.to_string(),
        time: "093000".to_string(),
        title: title.to_string(),
        category: "1".to_string(),
        importance: String::new(),
    }
}

/// Replays canned responses in order and records every prompt it was given.
pub struct ScriptedJudge {
    script: Mutex<VecDeque<Result<String, JudgeError>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    pub fn new(script: Vec<Result<String, JudgeError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Answers every prompt with `reply`.
    pub fn always(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl TextJudge for ScriptedJudge {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, prompt: &str) -> Result<String, JudgeError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(reply) => Ok(reply.clone()),
            None => Err(JudgeError::transport(Provider::Anthropic, "script exhausted")),
        }
    }
}

#[derive(Default)]
struct StoreState {
    etfs: Vec<Etf>,
    news: Vec<NewsItem>,
    portfolios: Vec<Portfolio>,
    allocations: Vec<Allocation>,
    alerts: Vec<AlertRecord>,
    rebalancings: Vec<RebalancingRecord>,
    tutor: Vec<TutorRecord>,
}

/// Implements every storage trait over plain vectors.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    fail_audit: AtomicBool,
}

impl InMemoryStore {
    pub fn with_etfs(etfs: Vec<Etf>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().etfs = etfs;
        store
    }

    pub fn add_portfolio(&self, portfolio: Portfolio, allocations: Vec<Allocation>) {
        let mut state = self.state.lock().unwrap();
        state.portfolios.push(portfolio);
        state.allocations.extend(allocations);
    }

    pub fn fail_audit_writes(&self) {
        self.fail_audit.store(true, Ordering::SeqCst);
    }

    pub fn news(&self) -> Vec<NewsItem> {
        self.state.lock().unwrap().news.clone()
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.state.lock().unwrap().alerts.clone()
    }

    pub fn rebalancings(&self) -> Vec<RebalancingRecord> {
        self.state.lock().unwrap().rebalancings.clone()
    }

    pub fn tutor_records(&self) -> Vec<TutorRecord> {
        self.state.lock().unwrap().tutor.clone()
    }

    fn check_audit(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_audit.load(Ordering::SeqCst), "audit store unavailable");
        Ok(())
    }
}

#[async_trait::async_trait]
impl EtfCatalog for InMemoryStore {
    async fn list_etfs(&self) -> anyhow::Result<Vec<Etf>> {
        Ok(self.state.lock().unwrap().etfs.clone())
    }

    async fn find_etf(&self, id: i64) -> anyhow::Result<Option<Etf>> {
        Ok(self.state.lock().unwrap().etfs.iter().find(|e| e.id == id).cloned())
    }

    async fn find_etf_by_name(&self, name: &str) -> anyhow::Result<Option<Etf>> {
        Ok(self.state.lock().unwrap().etfs.iter().find(|e| e.name == name).cloned())
    }

    async fn find_in_window(
        &self,
        window: &CandidateWindow,
        limit: usize,
    ) -> anyhow::Result<Vec<Etf>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .etfs
            .iter()
            .filter(|e| window.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl EtfCatalogAdmin for InMemoryStore {
    async fn create_etf(&self, etf: &NewEtf) -> anyhow::Result<Etf> {
        let mut state = self.state.lock().unwrap();
        anyhow::ensure!(
            state.etfs.iter().all(|e| e.name != etf.name),
            "duplicate etf name {}",
            etf.name
        );
        let created = Etf {
            id: state.etfs.iter().map(|e| e.id).max().unwrap_or(0) + 1,
            name: etf.name.clone(),
            change_rate: etf.change_rate,
            risk_level: etf.risk_level,
            category: etf.category.clone(),
            description: etf.description.clone(),
            constituents: Vec::new(),
        };
        state.etfs.push(created.clone());
        Ok(created)
    }

    async fn replace_constituents(
        &self,
        etf_id: i64,
        constituents: &[Constituent],
    ) -> anyhow::Result<Option<Etf>> {
        let mut state = self.state.lock().unwrap();
        Ok(state.etfs.iter_mut().find(|e| e.id == etf_id).map(|etf| {
            etf.constituents = constituents.to_vec();
            etf.clone()
        }))
    }

    async fn delete_etf(&self, etf_id: i64) -> anyhow::Result<DeleteOutcome> {
        let mut state = self.state.lock().unwrap();
        if !state.etfs.iter().any(|e| e.id == etf_id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let referenced = state.news.iter().any(|n| n.etf_id == etf_id)
            || state.allocations.iter().any(|a| a.etf_id == etf_id);
        if referenced {
            return Ok(DeleteOutcome::Referenced);
        }
        state.etfs.retain(|e| e.id != etf_id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait::async_trait]
impl NewsStore for InMemoryStore {
    async fn news_url_exists(&self, etf_id: i64, url: &str) -> anyhow::Result<bool> {
        Ok(self.state.lock().unwrap().news.iter().any(|n| n.etf_id == etf_id && n.url == url))
    }

    async fn news_title_exists(&self, etf_id: i64, title: &str) -> anyhow::Result<bool> {
        Ok(self.state.lock().unwrap().news.iter().any(|n| n.etf_id == etf_id && n.title == title))
    }

    async fn insert_news(&self, item: &NewNewsItem) -> anyhow::Result<NewsItem> {
        let mut state = self.state.lock().unwrap();
        let stored = NewsItem {
            id: state.news.len() as i64 + 1,
            etf_id: item.etf_id,
            title: item.title.clone(),
            content: item.content.clone(),
            url: item.url.clone(),
            source: item.source.clone(),
            published_at: item.published_at,
            collected_at: Utc::now(),
            analyzed: false,
            alert_triggered: false,
        };
        state.news.push(stored.clone());
        Ok(stored)
    }

    async fn mark_analyzed(&self, news_id: i64, alert_triggered: bool) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        let item = state
            .news
            .iter_mut()
            .find(|n| n.id == news_id)
            .ok_or_else(|| anyhow::anyhow!("news {news_id} not found"))?;
        item.analyzed = true;
        item.alert_triggered = alert_triggered;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PortfolioStore for InMemoryStore {
    async fn find_portfolio(&self, id: i64) -> anyhow::Result<Option<Portfolio>> {
        Ok(self.state.lock().unwrap().portfolios.iter().find(|p| p.id == id).cloned())
    }

    async fn allocations(&self, portfolio_id: i64) -> anyhow::Result<Vec<Allocation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .allocations
            .iter()
            .filter(|a| a.portfolio_id == portfolio_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl AuditLog for InMemoryStore {
    async fn record_alert(&self, record: &AlertRecord) -> anyhow::Result<()> {
        self.check_audit()?;
        self.state.lock().unwrap().alerts.push(record.clone());
        Ok(())
    }

    async fn record_rebalancing(&self, record: &RebalancingRecord) -> anyhow::Result<()> {
        self.check_audit()?;
        self.state.lock().unwrap().rebalancings.push(record.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl TutorHistoryStore for InMemoryStore {
    async fn record_tutor(&self, record: &TutorRecord) -> anyhow::Result<()> {
        self.check_audit()?;
        self.state.lock().unwrap().tutor.push(record.clone());
        Ok(())
    }
}

/// Serves fixed results per stock code; unknown codes return no items.
#[derive(Default)]
pub struct CannedFeed {
    responses: HashMap<String, Result<Vec<FeedItem>, String>>,
    queries: Mutex<Vec<(String, NaiveDate, NaiveDate, u32)>>,
}

impl CannedFeed {
    pub fn with(mut self, code: &str, items: Vec<FeedItem>) -> Self {
        self.responses.insert(code.to_string(), Ok(items));
        self
    }

    pub fn failing_for(mut self, code: &str) -> Self {
        self.responses
            .insert(code.to_string(), Err(format!("feed unavailable for {code}")));
        self
    }

    pub fn queries(&self) -> Vec<(String, NaiveDate, NaiveDate, u32)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NewsFeed for CannedFeed {
    fn feed_name(&self) -> &'static str {
        "KOSCOM"
    }

    async fn search(
        &self,
        stock_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        max_count: u32,
    ) -> anyhow::Result<Vec<FeedItem>> {
        self.queries
            .lock()
            .unwrap()
            .push((stock_code.to_string(), start, end, max_count));
        match self.responses.get(stock_code) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg.clone())),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct FakeMailer {
    fail: bool,
    sent: Mutex<Vec<SentMail>>,
}

impl FakeMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail, "smtp relay refused connection");
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}
