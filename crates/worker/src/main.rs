use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etfpilot_core::config::Settings;
use etfpilot_core::domain::etf::QaItem;
use etfpilot_core::pipeline::NewsCollector;
use etfpilot_core::services::Services;
use etfpilot_core::storage::{lock, EtfCatalog, PgStore};
use etfpilot_core::time::kr_market::resolve_collection_date;

#[derive(Debug, Parser)]
#[command(name = "etfpilot_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect news for every catalog ETF.
    CollectNews {
        /// Collection date (YYYY-MM-DD). Defaults to today's KST date.
        #[arg(long)]
        date: Option<String>,

        /// List the ETFs that would be collected without calling the feed.
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze one portfolio and optionally mail the report.
    Rebalance {
        #[arg(long)]
        portfolio_id: i64,

        #[arg(long)]
        member_id: i64,

        #[arg(long)]
        email: Option<String>,

        /// Rebalancing period in months recorded with the notification.
        #[arg(long, default_value_t = 3)]
        period: i32,
    },
    /// Recommend a portfolio from a survey file (JSON list of {question, answer}; may be empty).
    Recommend {
        #[arg(long)]
        survey: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&settings, args.command).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "worker run failed");
    }
    result
}

async fn run(settings: &Settings, command: Command) -> anyhow::Result<()> {
    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    etfpilot_core::storage::migrate(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    match command {
        Command::CollectNews { date, dry_run } => {
            let date = resolve_collection_date(date.as_deref(), chrono::Utc::now())?;
            if dry_run {
                let etfs = store.list_etfs().await?;
                for etf in &etfs {
                    tracing::info!(
                        %date,
                        etf_id = etf.id,
                        etf = %etf.name,
                        constituents = etf.constituents.len(),
                        "would collect news"
                    );
                }
                tracing::info!(%date, dry_run = true, etfs = etfs.len(), "news collection (dry-run)");
                return Ok(());
            }
            let services = Services::from_settings(settings, store.clone());
            let collector = services
                .collector()
                .context("news feed is not configured")?;
            collect_news(&store, collector, date).await
        }
        Command::Rebalance {
            portfolio_id,
            member_id,
            email,
            period,
        } => {
            let services = Services::from_settings(settings, store);
            let outcome = services
                .rebalancing()
                .context("rebalancing is not configured")?
                .analyze(portfolio_id, member_id)
                .await?;
            if let Some(email) = email.as_deref() {
                let sent = services
                    .dispatcher()
                    .context("mail relay is not configured")?
                    .send_rebalancing(&outcome.report, member_id, email, period)
                    .await;
                tracing::info!(portfolio_id, sent, "rebalancing notification dispatched");
            }
            println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            Ok(())
        }
        Command::Recommend { survey } => {
            let text = std::fs::read_to_string(&survey)
                .with_context(|| format!("read survey file {}", survey.display()))?;
            let qa: Vec<QaItem> = serde_json::from_str(&text)
                .with_context(|| format!("parse survey file {}", survey.display()))?;

            let services = Services::from_settings(settings, store);
            let result = services
                .recommendation()
                .context("recommendation judge is not configured")?
                .run(&qa)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn collect_news(
    store: &PgStore,
    collector: &NewsCollector,
    date: chrono::NaiveDate,
) -> anyhow::Result<()> {
    let Some(guard) = lock::try_acquire_collection_lock(store.pool(), date).await? else {
        tracing::warn!(%date, "collection lock not acquired; another run in progress");
        return Ok(());
    };

    let etfs = store.list_etfs().await?;
    let mut total = 0usize;
    for etf in &etfs {
        let stored = collector.collect(etf, date).await;
        total += stored.len();
    }
    tracing::info!(%date, etfs = etfs.len(), new_items = total, "news collection run finished");

    if let Err(err) = guard.release().await {
        tracing::warn!(%date, error = %format!("{err:#}"), "failed to release collection lock");
    }
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
