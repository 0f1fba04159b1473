use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etfpilot_core::domain::etf::{
    Constituent, ConstituentListing, ConstituentSummary, Etf, NewEtf, QaItem,
};
use etfpilot_core::domain::rebalancing::RebalancingReport;
use etfpilot_core::domain::recommendation::RecommendationResult;
use etfpilot_core::pipeline::{AlertOutcome, TutorAnswer};
use etfpilot_core::services::Services;
use etfpilot_core::storage::{EtfCatalog, PgStore};
use etfpilot_core::CoreError;

const DEFAULT_PERIOD_MONTHS: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = etfpilot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = match connect(&settings).await {
        Ok(store) => Some(store),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %format!("{e:#}"), "database unavailable; starting API in degraded mode");
            None
        }
    };

    let services = store
        .as_ref()
        .map(|store| Arc::new(Services::from_settings(&settings, store.clone())));

    let state = AppState { store, services };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/etfs", get(list_etfs).post(create_etf))
        .route("/api/etfs/recommend", post(recommend))
        .route("/api/etfs/constituents/summary", get(constituent_summary))
        .route("/api/etfs/:id", get(get_etf).delete(delete_etf))
        .route(
            "/api/etfs/:id/constituents",
            get(list_constituents)
                .put(replace_constituents)
                .delete(clear_constituents),
        )
        .route("/api/etf-alert/analyze", post(analyze_alert))
        .route("/api/portfolio/rebalancing/analyze", post(analyze_rebalancing))
        .route("/api/tutor/ask", post(ask_tutor))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect(settings: &etfpilot_core::config::Settings) -> anyhow::Result<Arc<PgStore>> {
    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;
    etfpilot_core::storage::migrate(&pool).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

#[derive(Clone)]
struct AppState {
    store: Option<Arc<PgStore>>,
    services: Option<Arc<Services>>,
}

impl AppState {
    fn store(&self) -> Result<&PgStore, ApiError> {
        self.store.as_deref().ok_or(ApiError::Unavailable("database"))
    }

    fn services(&self) -> Result<&Services, ApiError> {
        self.services.as_deref().ok_or(ApiError::Unavailable("database"))
    }
}

enum ApiError {
    /// A dependency of the requested feature is not configured.
    Unavailable(&'static str),
    BadRequest(String),
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Core(CoreError::Storage(err))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unavailable(feature) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{feature} is unavailable; the service is running in degraded mode"),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Core(err) => {
                let status = match &err {
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
                    CoreError::Conflict(_) => StatusCode::CONFLICT,
                    CoreError::EmptyPortfolio { .. } | CoreError::InsufficientCandidates { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    CoreError::Judge(_)
                    | CoreError::Extract(_)
                    | CoreError::RecommendationFailed { .. } => StatusCode::BAD_GATEWAY,
                    CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    let report = anyhow::Error::new(err);
                    sentry_anyhow::capture_anyhow(&report);
                    tracing::error!(error = %format!("{report:#}"), %status, "request failed");
                    (status, report.to_string())
                } else {
                    (status, err.to_string())
                }
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_etfs(State(state): State<AppState>) -> Result<Json<Vec<Etf>>, ApiError> {
    Ok(Json(state.store()?.list_etfs().await?))
}

async fn get_etf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Etf>, ApiError> {
    let etf = state
        .store()?
        .find_etf(id)
        .await?
        .ok_or_else(|| CoreError::not_found("etf", id))?;
    Ok(Json(etf))
}

async fn create_etf(
    State(state): State<AppState>,
    Json(req): Json<NewEtf>,
) -> Result<(StatusCode, Json<Etf>), ApiError> {
    let etf = state.services()?.catalog().create(req).await?;
    Ok((StatusCode::CREATED, Json(etf)))
}

async fn delete_etf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.services()?.catalog().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConstituentsRequest {
    stock_list: Vec<Constituent>,
}

async fn replace_constituents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ConstituentsRequest>,
) -> Result<Json<Etf>, ApiError> {
    let etf = state
        .services()?
        .catalog()
        .replace_constituents(id, req.stock_list)
        .await?;
    Ok(Json(etf))
}

async fn clear_constituents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Etf>, ApiError> {
    Ok(Json(state.services()?.catalog().clear_constituents(id).await?))
}

async fn list_constituents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ConstituentListing>, ApiError> {
    Ok(Json(state.services()?.catalog().constituents(id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    total_etfs: usize,
    etfs: Vec<ConstituentSummary>,
}

async fn constituent_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiError> {
    let etfs = state.services()?.catalog().summary().await?;
    Ok(Json(SummaryResponse {
        total_etfs: etfs.len(),
        etfs,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest {
    #[serde(default)]
    qa_list: Vec<QaItem>,
}

async fn recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendationResult>, ApiError> {
    let pipeline = state
        .services()?
        .recommendation()
        .ok_or(ApiError::Unavailable("recommendation"))?;
    let result = pipeline.run(&req.qa_list).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertRequest {
    etf_name: String,
    user_email: String,
    user_id: i64,
}

async fn analyze_alert(
    State(state): State<AppState>,
    Json(req): Json<AlertRequest>,
) -> Result<Json<AlertOutcome>, ApiError> {
    let outcome = state
        .services()?
        .alerts()
        .ok_or(ApiError::Unavailable("ETF alerts"))?
        .analyze_and_notify(&req.etf_name, &req.user_email, req.user_id)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RebalancingRequest {
    portfolio_id: i64,
    member_id: i64,
    user_email: Option<String>,
    period: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RebalancingResponse {
    report: RebalancingReport,
    /// Absent when no email was given.
    notification_sent: Option<bool>,
}

async fn analyze_rebalancing(
    State(state): State<AppState>,
    Json(req): Json<RebalancingRequest>,
) -> Result<Json<RebalancingResponse>, ApiError> {
    let services = state.services()?;
    let outcome = services
        .rebalancing()
        .ok_or(ApiError::Unavailable("rebalancing"))?
        .analyze(req.portfolio_id, req.member_id)
        .await?;

    let email = req.user_email.as_deref().filter(|e| !e.trim().is_empty());
    let notification_sent = match (email, services.dispatcher()) {
        (Some(email), Some(dispatcher)) => Some(
            dispatcher
                .send_rebalancing(
                    &outcome.report,
                    req.member_id,
                    email,
                    req.period.unwrap_or(DEFAULT_PERIOD_MONTHS),
                )
                .await,
        ),
        (Some(_), None) => {
            tracing::warn!(
                portfolio_id = req.portfolio_id,
                "mail relay not configured; rebalancing report not sent"
            );
            Some(false)
        }
        (None, _) => None,
    };

    Ok(Json(RebalancingResponse {
        report: outcome.report,
        notification_sent,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TutorRequest {
    question: String,
    member_id: Option<i64>,
}

async fn ask_tutor(
    State(state): State<AppState>,
    Json(req): Json<TutorRequest>,
) -> Result<Json<TutorAnswer>, ApiError> {
    if req.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }
    let tutor = state
        .services()?
        .tutor()
        .ok_or(ApiError::Unavailable("tutor"))?;
    Ok(Json(tutor.ask(&req.question, req.member_id).await))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &etfpilot_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
