use crate::domain::etf::{CandidateWindow, Constituent, Etf, NewEtf};
use crate::storage::DeleteOutcome;
use anyhow::Context;
use serde_json::Value;

const FOREIGN_KEY_VIOLATION: &str = "23503";

const ETF_COLUMNS: &str = "id, name, flt_rt, risk_level, category, description, stock_list";

#[derive(Debug, sqlx::FromRow)]
struct EtfRow {
    id: i64,
    name: String,
    flt_rt: i32,
    risk_level: i32,
    category: String,
    description: String,
    stock_list: Value,
}

impl From<EtfRow> for Etf {
    fn from(row: EtfRow) -> Self {
        let constituents = match serde_json::from_value::<Vec<Constituent>>(row.stock_list) {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(etf_id = row.id, error = %err, "unparsable stock_list; treating as empty");
                Vec::new()
            }
        };

        Etf {
            id: row.id,
            name: row.name,
            change_rate: row.flt_rt,
            risk_level: row.risk_level,
            category: row.category,
            description: row.description,
            constituents,
        }
    }
}

pub async fn list_etfs(pool: &sqlx::PgPool) -> anyhow::Result<Vec<Etf>> {
    let rows: Vec<EtfRow> = sqlx::query_as(&format!("SELECT {ETF_COLUMNS} FROM etf ORDER BY id"))
        .persistent(false)
        .fetch_all(pool)
        .await
        .context("select etf failed")?;
    Ok(rows.into_iter().map(Etf::from).collect())
}

pub async fn find_etf(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<Option<Etf>> {
    let row: Option<EtfRow> = sqlx::query_as(&format!("SELECT {ETF_COLUMNS} FROM etf WHERE id = $1"))
        .persistent(false)
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("select etf id={id} failed"))?;
    Ok(row.map(Etf::from))
}

pub async fn find_etf_by_name(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<Option<Etf>> {
    let row: Option<EtfRow> =
        sqlx::query_as(&format!("SELECT {ETF_COLUMNS} FROM etf WHERE name = $1"))
            .persistent(false)
            .bind(name)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("select etf name={name} failed"))?;
    Ok(row.map(Etf::from))
}

pub async fn find_in_window(
    pool: &sqlx::PgPool,
    window: &CandidateWindow,
    limit: usize,
) -> anyhow::Result<Vec<Etf>> {
    let limit = i64::try_from(limit).context("candidate limit out of range")?;
    let rows: Vec<EtfRow> = sqlx::query_as(&format!(
        "SELECT {ETF_COLUMNS} FROM etf \
         WHERE (flt_rt BETWEEN $1 AND $2) OR (risk_level BETWEEN $3 AND $4) \
         ORDER BY id \
         LIMIT $5"
    ))
    .persistent(false)
    .bind(window.change_rate_min)
    .bind(window.change_rate_max)
    .bind(window.risk_level_min)
    .bind(window.risk_level_max)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select etf candidates failed")?;
    Ok(rows.into_iter().map(Etf::from).collect())
}

pub async fn create_etf(pool: &sqlx::PgPool, etf: &NewEtf) -> anyhow::Result<Etf> {
    let row: EtfRow = sqlx::query_as(&format!(
        "INSERT INTO etf (name, flt_rt, risk_level, category, description) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {ETF_COLUMNS}"
    ))
    .persistent(false)
    .bind(&etf.name)
    .bind(etf.change_rate)
    .bind(etf.risk_level)
    .bind(&etf.category)
    .bind(&etf.description)
    .fetch_one(pool)
    .await
    .with_context(|| format!("insert etf name={} failed", etf.name))?;
    Ok(row.into())
}

pub async fn replace_constituents(
    pool: &sqlx::PgPool,
    etf_id: i64,
    constituents: &[Constituent],
) -> anyhow::Result<Option<Etf>> {
    let stock_list = serde_json::to_value(constituents).context("encode stock_list failed")?;
    let row: Option<EtfRow> = sqlx::query_as(&format!(
        "UPDATE etf SET stock_list = $2 WHERE id = $1 RETURNING {ETF_COLUMNS}"
    ))
    .persistent(false)
    .bind(etf_id)
    .bind(stock_list)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update etf stock_list id={etf_id} failed"))?;
    Ok(row.map(Etf::from))
}

pub async fn delete_etf(pool: &sqlx::PgPool, etf_id: i64) -> anyhow::Result<DeleteOutcome> {
    let result = sqlx::query("DELETE FROM etf WHERE id = $1")
        .persistent(false)
        .bind(etf_id)
        .execute(pool)
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Ok(DeleteOutcome::NotFound),
        Ok(_) => Ok(DeleteOutcome::Deleted),
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            Ok(DeleteOutcome::Referenced)
        }
        Err(err) => Err(err).with_context(|| format!("delete etf id={etf_id} failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(stock_list: Value) -> EtfRow {
        EtfRow {
            id: 7,
            name: "TIGER 미국S&P500".to_string(),
            flt_rt: 4,
            risk_level: 4,
            category: "해외주식".to_string(),
            description: String::new(),
            stock_list,
        }
    }

    #[test]
    fn row_decodes_stock_list() {
        let etf = Etf::from(row(json!([
            {"code": "AAPL", "name": "Apple", "weightPercent": 7.1}
        ])));
        assert_eq!(etf.change_rate, 4);
        assert_eq!(etf.constituents.len(), 1);
        assert_eq!(etf.constituents[0].code, "AAPL");
    }

    #[test]
    fn bad_stock_list_becomes_empty() {
        let etf = Etf::from(row(json!({"not": "a list"})));
        assert!(etf.constituents.is_empty());
    }
}
