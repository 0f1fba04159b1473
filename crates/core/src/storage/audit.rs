use crate::domain::audit::{AlertRecord, RebalancingRecord, TutorRecord};
use anyhow::Context;
use uuid::Uuid;

pub async fn record_alert(pool: &sqlx::PgPool, record: &AlertRecord) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO alert_history (id, etf_id, etf_name, member_id, alert_type, channel, recipient, content, sent, failure_reason) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .persistent(false)
    .bind(id)
    .bind(record.etf_id)
    .bind(&record.etf_name)
    .bind(record.member_id)
    .bind(record.alert_type)
    .bind(record.channel)
    .bind(&record.recipient)
    .bind(&record.content)
    .bind(record.sent)
    .bind(&record.failure_reason)
    .execute(pool)
    .await
    .context("insert alert_history failed")?;
    Ok(id)
}

pub async fn record_rebalancing(
    pool: &sqlx::PgPool,
    record: &RebalancingRecord,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO rebalancing_history (id, portfolio_id, portfolio_name, member_id, period_months, channel, recipient, reason, \
         news_evidence, before_allocation, after_allocation, sent, failure_reason) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .persistent(false)
    .bind(id)
    .bind(record.portfolio_id)
    .bind(&record.portfolio_name)
    .bind(record.member_id)
    .bind(record.period_months)
    .bind(record.channel)
    .bind(&record.recipient)
    .bind(&record.reason)
    .bind(&record.news_evidence)
    .bind(&record.before_allocation)
    .bind(&record.after_allocation)
    .bind(record.sent)
    .bind(&record.failure_reason)
    .execute(pool)
    .await
    .context("insert rebalancing_history failed")?;
    Ok(id)
}

pub async fn record_tutor(pool: &sqlx::PgPool, record: &TutorRecord) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO tutor_history (id, member_id, question, answer, model) VALUES ($1, $2, $3, $4, $5)",
    )
    .persistent(false)
    .bind(id)
    .bind(record.member_id)
    .bind(&record.question)
    .bind(&record.answer)
    .bind(&record.model)
    .execute(pool)
    .await
    .context("insert tutor_history failed")?;
    Ok(id)
}
