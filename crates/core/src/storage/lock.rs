use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

// Advisory locks are scoped to the Postgres session, so the guard pins one pooled connection.
const LOCK_NAMESPACE: i64 = 0x4554_464E_4557; // "ETFNEW"

fn lock_key_for_date(date: NaiveDate) -> i64 {
    LOCK_NAMESPACE ^ (date.num_days_from_ce() as i64)
}

/// Held while a batch news collection for one date runs.
pub struct CollectionLock {
    conn: PoolConnection<Postgres>,
    key: i64,
}

/// `None` when another session already holds the lock for `date`.
pub async fn try_acquire_collection_lock(
    pool: &sqlx::PgPool,
    date: NaiveDate,
) -> anyhow::Result<Option<CollectionLock>> {
    let key = lock_key_for_date(date);
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection for advisory lock")?;
    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;

    Ok(acquired.then_some(CollectionLock { conn, key }))
}

impl CollectionLock {
    pub async fn release(mut self) -> anyhow::Result<()> {
        let key = self.key;
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .persistent(false)
            .bind(key)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("failed to release advisory lock (key={key})"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_differ_per_date() {
        let a = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_ne!(lock_key_for_date(a), lock_key_for_date(b));
        assert_eq!(lock_key_for_date(a), lock_key_for_date(a));
    }
}
