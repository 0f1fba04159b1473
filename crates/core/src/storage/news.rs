use crate::domain::news::{NewNewsItem, NewsItem};
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};

#[derive(Debug, sqlx::FromRow)]
struct NewsRow {
    id: i64,
    etf_id: i64,
    title: String,
    content: String,
    url: String,
    source: String,
    published_at: NaiveDateTime,
    collected_at: DateTime<Utc>,
    analyzed: bool,
    alert_triggered: bool,
}

impl From<NewsRow> for NewsItem {
    fn from(row: NewsRow) -> Self {
        NewsItem {
            id: row.id,
            etf_id: row.etf_id,
            title: row.title,
            content: row.content,
            url: row.url,
            source: row.source,
            published_at: row.published_at,
            collected_at: row.collected_at,
            analyzed: row.analyzed,
            alert_triggered: row.alert_triggered,
        }
    }
}

pub async fn url_exists(pool: &sqlx::PgPool, etf_id: i64, url: &str) -> anyhow::Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM etf_news WHERE etf_id = $1 AND url = $2)")
            .persistent(false)
            .bind(etf_id)
            .bind(url)
            .fetch_one(pool)
            .await
            .context("select etf_news by url failed")?;
    Ok(exists)
}

pub async fn title_exists(pool: &sqlx::PgPool, etf_id: i64, title: &str) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM etf_news WHERE etf_id = $1 AND title = $2)",
    )
    .persistent(false)
    .bind(etf_id)
    .bind(title)
    .fetch_one(pool)
    .await
    .context("select etf_news by title failed")?;
    Ok(exists)
}

pub async fn insert(pool: &sqlx::PgPool, item: &NewNewsItem) -> anyhow::Result<NewsItem> {
    let row: NewsRow = sqlx::query_as(
        "INSERT INTO etf_news (etf_id, title, content, url, source, published_at, collected_at, analyzed, alert_triggered) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, FALSE) \
         RETURNING id, etf_id, title, content, url, source, published_at, collected_at, analyzed, alert_triggered",
    )
    .persistent(false)
    .bind(item.etf_id)
    .bind(&item.title)
    .bind(&item.content)
    .bind(&item.url)
    .bind(&item.source)
    .bind(item.published_at)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("insert etf_news failed")?;
    Ok(row.into())
}

pub async fn mark_analyzed(
    pool: &sqlx::PgPool,
    news_id: i64,
    alert_triggered: bool,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE etf_news SET analyzed = TRUE, alert_triggered = $2 WHERE id = $1")
        .persistent(false)
        .bind(news_id)
        .bind(alert_triggered)
        .execute(pool)
        .await
        .with_context(|| format!("update etf_news id={news_id} failed"))?;
    Ok(())
}
