use crate::domain::etf::{Constituent, Etf};
use crate::domain::news::{NewNewsItem, NewsItem};
use crate::ingest::NewsFeed;
use crate::storage::NewsStore;
use crate::time::kr_market::{news_window, now_kst, parse_feed_timestamp, today_kst};
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;

pub const TOP_CONSTITUENTS: usize = 5;
pub const FEED_PAGE_SIZE: u32 = 20;
pub const NEWS_URL_BASE: &str = "https://news.koscom.co.kr/news/";

/// Gathers news for an ETF's heaviest holdings and persists what has not been seen before.
pub struct NewsCollector {
    feed: Arc<dyn NewsFeed>,
    news: Arc<dyn NewsStore>,
}

impl NewsCollector {
    pub fn new(feed: Arc<dyn NewsFeed>, news: Arc<dyn NewsStore>) -> Self {
        Self { feed, news }
    }

    pub async fn collect_now(&self, etf: &Etf) -> anyhow::Result<Vec<NewsItem>> {
        let today = today_kst(Utc::now())?;
        Ok(self.collect(etf, today).await)
    }

    /// Returns only the items persisted by this call. Per-constituent failures are logged and
    /// skipped; items stored before a failure are still returned.
    pub async fn collect(&self, etf: &Etf, today: NaiveDate) -> Vec<NewsItem> {
        let constituents = etf.top_constituents(TOP_CONSTITUENTS);
        if constituents.is_empty() {
            tracing::warn!(etf_id = etf.id, etf = %etf.name, "ETF has no constituents; skipping news collection");
            return Vec::new();
        }

        let (start, end) = news_window(today);
        let delay = self.feed.request_delay();
        let mut seen_titles = HashSet::<String>::new();
        let mut stored = Vec::new();

        for (i, constituent) in constituents.into_iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let before = stored.len();
            if let Err(err) = self
                .collect_constituent(etf, constituent, start, end, &mut seen_titles, &mut stored)
                .await
            {
                tracing::warn!(
                    etf_id = etf.id,
                    stock_code = %constituent.code,
                    stock = %constituent.name,
                    error = %err,
                    "constituent news collection failed"
                );
            }
            tracing::debug!(
                etf_id = etf.id,
                stock_code = %constituent.code,
                new_items = stored.len() - before,
                "constituent news collected"
            );
        }

        tracing::info!(etf_id = etf.id, etf = %etf.name, new_items = stored.len(), "news collection finished");
        stored
    }

    async fn collect_constituent(
        &self,
        etf: &Etf,
        constituent: &Constituent,
        start: NaiveDate,
        end: NaiveDate,
        seen_titles: &mut HashSet<String>,
        stored: &mut Vec<NewsItem>,
    ) -> anyhow::Result<()> {
        let items = self
            .feed
            .search(&constituent.code, start, end, FEED_PAGE_SIZE)
            .await?;

        for item in items {
            if seen_titles.contains(&item.title) {
                continue;
            }

            let url = format!("{NEWS_URL_BASE}{}", item.code);
            if self.news.news_url_exists(etf.id, &url).await? {
                continue;
            }
            if self.news.news_title_exists(etf.id, &item.title).await? {
                continue;
            }

            let published_at = match parse_feed_timestamp(&item.date, &item.time) {
                Some(ts) => ts,
                None => {
                    tracing::warn!(date = %item.date, time = %item.time, "unparsable feed timestamp; using collection time");
                    now_kst(Utc::now())?
                }
            };

            let saved = self
                .news
                .insert_news(&NewNewsItem {
                    etf_id: etf.id,
                    title: item.title.clone(),
                    content: format!("[{}] related news", constituent.name),
                    url,
                    source: self.feed.feed_name().to_string(),
                    published_at,
                })
                .await?;

            seen_titles.insert(item.title);
            stored.push(saved);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::news::FeedItem;
    use crate::testing::{catalog, constituent, feed_item, CannedFeed, InMemoryStore};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn kodex() -> Etf {
        catalog().remove(0)
    }

    fn build(feed: CannedFeed, store: &Arc<InMemoryStore>) -> (NewsCollector, Arc<CannedFeed>) {
        let feed = Arc::new(feed);
        (NewsCollector::new(feed.clone(), store.clone()), feed)
    }

    #[tokio::test]
    async fn second_run_with_same_feed_stores_nothing() {
        let store = Arc::new(InMemoryStore::default());
        let feed = CannedFeed::default().with(
            "005930",
            vec![feed_item("N1", "삼성전자 3분기 실적"), feed_item("N2", "반도체 업황 개선")],
        );
        let (collector, _) = build(feed, &store);

        let first = collector.collect(&kodex(), today()).await;
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|n| !n.analyzed && !n.alert_triggered));

        let second = collector.collect(&kodex(), today()).await;
        assert!(second.is_empty());
        assert_eq!(store.news().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_titles_in_one_response_are_stored_once() {
        let store = Arc::new(InMemoryStore::default());
        let feed = CannedFeed::default().with(
            "005930",
            vec![feed_item("N1", "같은 제목"), feed_item("N2", "같은 제목")],
        );
        let (collector, _) = build(feed, &store);

        let stored = collector.collect(&kodex(), today()).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].url, "https://news.koscom.co.kr/news/N1");
    }

    #[tokio::test]
    async fn title_seen_under_another_constituent_is_skipped() {
        let store = Arc::new(InMemoryStore::default());
        let feed = CannedFeed::default()
            .with("005930", vec![feed_item("N1", "반도체 수출 급증")])
            .with("000660", vec![feed_item("N9", "반도체 수출 급증")]);
        let (collector, _) = build(feed, &store);

        assert_eq!(collector.collect(&kodex(), today()).await.len(), 1);
    }

    #[tokio::test]
    async fn failing_constituent_does_not_abort_others() {
        let store = Arc::new(InMemoryStore::default());
        let feed = CannedFeed::default()
            .failing_for("005930")
            .with("000660", vec![feed_item("N5", "SK하이닉스 HBM 공급")]);
        let (collector, _) = build(feed, &store);

        let stored = collector.collect(&kodex(), today()).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "[SK하이닉스] related news");
        assert_eq!(stored[0].source, "KOSCOM");
    }

    #[tokio::test]
    async fn queries_top_five_holdings_over_seven_days() {
        let store = Arc::new(InMemoryStore::default());
        let mut etf = kodex();
        etf.constituents = (1..=7)
            .map(|i| constituent(&format!("{i:06}"), &format!("종목{i}"), i as f64))
            .collect();
        let (collector, feed) = build(CannedFeed::default(), &store);

        collector.collect(&etf, today()).await;

        let queries = feed.queries();
        let codes: Vec<&str> = queries.iter().map(|q| q.0.as_str()).collect();
        assert_eq!(codes, vec!["000007", "000006", "000005", "000004", "000003"]);
        let (_, start, end, count) = &queries[0];
        assert_eq!(*start, NaiveDate::from_ymd_opt(2026, 10, 10).unwrap());
        assert_eq!(*end, today());
        assert_eq!(*count, FEED_PAGE_SIZE);
    }

    #[tokio::test]
    async fn bad_timestamp_falls_back_to_collection_time() {
        let store = Arc::new(InMemoryStore::default());
        let item = FeedItem {
            time: "9999".to_string(),
            ..feed_item("N1", "시간 형식 오류")
        };
        let feed = CannedFeed::default().with("005930", vec![item]);
        let (collector, _) = build(feed, &store);

        assert_eq!(collector.collect(&kodex(), today()).await.len(), 1);
    }

    #[tokio::test]
    async fn etf_without_constituents_collects_nothing() {
        let store = Arc::new(InMemoryStore::default());
        let (collector, feed) = build(CannedFeed::default(), &store);
        let etf = catalog().remove(3);

        assert!(collector.collect(&etf, today()).await.is_empty());
        assert!(feed.queries().is_empty());
    }
}
