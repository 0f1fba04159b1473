use crate::domain::portfolio::{Allocation, Portfolio};
use anyhow::Context;

pub async fn find_portfolio(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<Option<Portfolio>> {
    let row: Option<(i64, i64, String, Option<String>)> =
        sqlx::query_as("SELECT id, member_id, name, description FROM portfolio WHERE id = $1")
            .persistent(false)
            .bind(id)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("select portfolio id={id} failed"))?;

    Ok(row.map(|(id, member_id, name, description)| Portfolio {
        id,
        member_id,
        name,
        description,
    }))
}

pub async fn allocations(pool: &sqlx::PgPool, portfolio_id: i64) -> anyhow::Result<Vec<Allocation>> {
    let rows: Vec<(i64, i64, f64)> = sqlx::query_as(
        "SELECT portfolio_id, etf_id, target_weight FROM portfolio_allocation \
         WHERE portfolio_id = $1 ORDER BY etf_id",
    )
    .persistent(false)
    .bind(portfolio_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("select portfolio_allocation portfolio_id={portfolio_id} failed"))?;

    Ok(rows
        .into_iter()
        .map(|(portfolio_id, etf_id, target_weight_percent)| Allocation {
            portfolio_id,
            etf_id,
            target_weight_percent,
        })
        .collect())
}
