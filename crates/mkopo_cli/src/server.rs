use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use mkopo_common::time;
use mkopo_runtime::charts::ChartEngine;
use mkopo_runtime::datastore::LoanStore;
use mkopo_runtime::fallback::{Fetched, is_store_available};
use mkopo_runtime::report::{ReportEngine, ReportFormat, ReportKind};
use mkopo_runtime::stats::StatsEngine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LoanStore>,
    pub stats: Arc<StatsEngine>,
    pub charts: Arc<ChartEngine>,
    pub reports: Arc<ReportEngine>,
}

impl AppState {
    pub fn new(store: Arc<dyn LoanStore>) -> Self {
        Self {
            stats: Arc::new(StatsEngine::new(store.clone())),
            charts: Arc::new(ChartEngine::new(store.clone())),
            reports: Arc::new(ReportEngine::new(store.clone())),
            store,
        }
    }

    /// Same wiring with a custom fallback timeout (tests use short ones).
    pub fn with_timeout(store: Arc<dyn LoanStore>, timeout: Duration) -> Self {
        Self {
            stats: Arc::new(StatsEngine::with_timeout(store.clone(), timeout)),
            charts: Arc::new(ChartEngine::with_timeout(store.clone(), timeout)),
            reports: Arc::new(ReportEngine::with_timeout(store.clone(), timeout)),
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/dashboard/charts", get(dashboard_charts))
        .route("/reports/export", get(export_report))
        .route("/search", get(search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<(), std::io::Error> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    println!("🚀 Server running on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await
}

/// Always 200; the `x-data-source` header tells live data from the
/// substitute dataset without breaking the availability contract.
fn data_response<T: Serialize>(fetched: Fetched<T>) -> Response {
    let source = if fetched.is_live() { "live" } else { "substitute" };
    ([("x-data-source", source)], Json(fetched.value)).into_response()
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = is_store_available(state.store.as_ref(), Duration::from_millis(1500)).await;
    Json(json!({ "status": "ok", "database": database }))
}

async fn dashboard_stats(State(state): State<AppState>) -> Response {
    data_response(state.stats.dashboard_stats(time::today()).await)
}

#[derive(Deserialize)]
struct ChartParams {
    seed: Option<u64>,
}

async fn dashboard_charts(
    State(state): State<AppState>,
    Query(params): Query<ChartParams>,
) -> Response {
    data_response(state.charts.dashboard_charts(time::today(), params.seed).await)
}

#[derive(Deserialize)]
struct ExportParams {
    #[serde(rename = "type")]
    kind: Option<String>,
    format: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

/// `from` defaults to the first of the current month, `to` to today; both
/// bounds are inclusive (the `to` date covers its whole day). Unknown type
/// or format fall back to loans/csv rather than rejecting.
async fn export_report(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Response {
    let today = time::today();
    let from = params
        .from
        .as_deref()
        .and_then(time::parse_ymd)
        .unwrap_or_else(|| time::first_of_month(today));
    let to = params.to.as_deref().and_then(time::parse_ymd).unwrap_or(today);
    let kind = ReportKind::parse(params.kind.as_deref().unwrap_or(""));
    let format = ReportFormat::parse(params.format.as_deref().unwrap_or(""));

    match state.reports.generate(kind, format, from, to).await {
        Ok(report) => (
            [
                (header::CONTENT_TYPE, report.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", report.filename),
                ),
            ],
            report.bytes,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(rename = "idNumber")]
    id_number: Option<String>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let Some(id_number) = params.id_number.filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "ID Number is required for search" })),
        )
            .into_response();
    };

    match state.store.find_client_by_id_number(&id_number).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No client found with the provided ID number" })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
