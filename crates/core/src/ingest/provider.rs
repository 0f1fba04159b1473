use crate::config::Settings;
use crate::domain::news::FeedItem;
use crate::ingest::types::KoscomEnvelope;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://checkapi.koscom.co.kr";
const NEWS_PATH: &str = "/news/news/news_jong";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 2;
const MAX_RETRIES: u32 = 6;
const MAX_BACKOFF_SECS: u64 = 30;
const DEFAULT_REQUEST_DELAY_MS: u64 = 100;

/// Per-stock news search over an inclusive date window.
#[async_trait::async_trait]
pub trait NewsFeed: Send + Sync {
    fn feed_name(&self) -> &'static str;

    /// Pause to insert between consecutive searches in one collection run.
    fn request_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn search(
        &self,
        stock_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        max_count: u32,
    ) -> Result<Vec<FeedItem>>;
}

#[derive(Debug, Clone)]
pub struct KoscomNewsFeed {
    http: reqwest::Client,
    base_url: String,
    cust_id: String,
    auth_key: String,
    retries: u32,
    request_delay: Duration,
}

impl KoscomNewsFeed {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let (cust_id, auth_key) = settings.require_koscom_credentials()?;
        let base_url =
            std::env::var("KOSCOM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("KOSCOM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("KOSCOM_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .clamp(1, MAX_RETRIES);

        let delay_ms = std::env::var("KOSCOM_REQUEST_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_DELAY_MS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build news feed http client")?;

        Ok(Self {
            http,
            base_url,
            cust_id: cust_id.to_string(),
            auth_key: auth_key.to_string(),
            retries,
            request_delay: Duration::from_millis(delay_ms),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), NEWS_PATH)
    }

    async fn fetch_once(
        &self,
        stock_code: &str,
        sdate: &str,
        edate: &str,
        max_count: u32,
    ) -> Result<KoscomEnvelope> {
        let dcnt = max_count.to_string();
        let form = [
            ("cust_id", self.cust_id.as_str()),
            ("auth_key", self.auth_key.as_str()),
            ("jcode", stock_code),
            ("sdate", sdate),
            ("edate", edate),
            ("dcnt", dcnt.as_str()),
        ];

        let res = self
            .http
            .post(self.url())
            .form(&form)
            .send()
            .await
            .context("KOSCOM news request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read KOSCOM response")?;
        if !status.is_success() {
            anyhow::bail!("KOSCOM HTTP {status}: {text}");
        }

        serde_json::from_str::<KoscomEnvelope>(&text)
            .with_context(|| format!("KOSCOM response is not a valid envelope: {text}"))
    }
}

#[async_trait::async_trait]
impl NewsFeed for KoscomNewsFeed {
    fn feed_name(&self) -> &'static str {
        "KOSCOM"
    }

    fn request_delay(&self) -> Duration {
        self.request_delay
    }

    async fn search(
        &self,
        stock_code: &str,
        start: NaiveDate,
        end: NaiveDate,
        max_count: u32,
    ) -> Result<Vec<FeedItem>> {
        let sdate = start.format("%Y%m%d").to_string();
        let edate = end.format("%Y%m%d").to_string();
        tracing::debug!(stock_code, %sdate, %edate, max_count, "querying KOSCOM news");

        let mut attempt: u32 = 0;
        let envelope = loop {
            attempt += 1;
            match self.fetch_once(stock_code, &sdate, &edate, max_count).await {
                Ok(envelope) => break envelope,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = retry_backoff(attempt);
                    tracing::warn!(attempt, ?backoff, stock_code, error = %err, "news feed fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        };

        if envelope.success != Some(true) {
            anyhow::bail!("KOSCOM error for {stock_code}: {}", envelope.error_description());
        }

        Ok(envelope.into_feed_items())
    }
}

/// 1s, 2s, 4s, ... capped at `MAX_BACKOFF_SECS`.
fn retry_backoff(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    Duration::from_secs((1u64 << exp).min(MAX_BACKOFF_SECS))
}
