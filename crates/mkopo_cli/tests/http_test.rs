use axum::body::Body;
use axum::http::{Request, StatusCode};
use async_trait::async_trait;
use chrono::NaiveDate;
use mkopo_cli::server::{AppState, build_router};
use mkopo_runtime::datastore::{LoanFilter, LoanStore, MemoryLoanStore};
use mkopo_runtime::errors::StoreError;
use mkopo_runtime::model::{
    Client, ClientProfile, ClientWithLoans, Guarantor, LoanRecord, LoanWithClient, MediaFile,
    Reference,
};
use mkopo_runtime::substitute;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

struct FailingStore;

#[async_trait]
impl LoanStore for FailingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert_client(&self, _: Client) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert_loan(&self, _: LoanRecord) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert_guarantor(&self, _: Guarantor) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert_reference(&self, _: Reference) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert_media_file(&self, _: MediaFile) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn list_loans(&self, _: &LoanFilter) -> Result<Vec<LoanRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn count_loans(&self, _: &LoanFilter) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn list_loans_with_clients(
        &self,
        _: &LoanFilter,
    ) -> Result<Vec<LoanWithClient>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn list_clients_with_loans(
        &self,
        _: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ClientWithLoans>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn find_client_by_id_number(
        &self,
        _: &str,
    ) -> Result<Option<ClientProfile>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

async fn seeded_router() -> axum::Router {
    let store = MemoryLoanStore::new();
    substitute::seed(&store).await.unwrap();
    build_router(AppState::new(Arc::new(store)))
}

fn failing_router() -> axum::Router {
    build_router(AppState::with_timeout(
        Arc::new(FailingStore),
        Duration::from_millis(50),
    ))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_database_state() {
    let app = seeded_router().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], true);

    let response = failing_router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["database"], false);
}

#[tokio::test]
async fn stats_endpoint_marks_live_data() {
    let app = seeded_router().await;
    let response = app
        .oneshot(Request::builder().uri("/dashboard/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-data-source"], "live");

    let json = body_json(response).await;
    assert_eq!(json["totalLoans"], 3);
    assert_eq!(json["activeLoans"], 1);
    assert_eq!(json["totalDisbursed"], 15000.0);
    assert_eq!(json["loanStatusDistribution"]["ACTIVE"], 1);
    assert_eq!(json["loanStatusDistribution"]["REJECTED"], 0);
}

#[tokio::test]
async fn stats_endpoint_degrades_to_substitute_data() {
    let response = failing_router()
        .oneshot(Request::builder().uri("/dashboard/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    // Still 200; the header is the only tell.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-data-source"], "substitute");

    let json = body_json(response).await;
    assert_eq!(json["totalLoans"], 3);
    assert_eq!(json["totalExpectedReturn"], 16700.0);
}

#[tokio::test]
async fn charts_endpoint_accepts_a_seed() {
    let app = seeded_router().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard/charts?seed=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-data-source"], "live");

    let json = body_json(response).await;
    assert_eq!(json["monthlyLoans"].as_array().unwrap().len(), 12);
    assert_eq!(json["loanDurations"].as_array().unwrap().len(), 3);
    assert_eq!(json["repaymentTrends"]["estimated"], true);

    // Same seed, same trend series.
    let again = seeded_router()
        .await
        .oneshot(
            Request::builder()
                .uri("/dashboard/charts?seed=42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json_again = body_json(again).await;
    assert_eq!(json["repaymentTrends"], json_again["repaymentTrends"]);
}

#[tokio::test]
async fn export_sets_download_headers() {
    let app = seeded_router().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/reports/export?type=loans&format=csv&from=2025-01-01&to=2025-12-31")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"loans_report_2025-01-01_to_2025-12-31.csv\""
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.starts_with("ID,ClientName,"));
}

#[tokio::test]
async fn export_always_answers_even_when_the_store_is_down() {
    let response = failing_router()
        .oneshot(
            Request::builder()
                .uri("/reports/export?type=summary&format=pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn search_covers_the_three_outcomes() {
    let app = seeded_router().await;

    let missing_param = app
        .clone()
        .oneshot(Request::builder().uri("/search").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing_param.status(), StatusCode::BAD_REQUEST);

    let not_found = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/search?idNumber=NOPE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

    let found = app
        .oneshot(
            Request::builder()
                .uri("/search?idNumber=ID123456")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    let json = body_json(found).await;
    assert_eq!(json["name"], "John Doe");
    assert_eq!(json["loanRecords"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_errors_when_the_store_is_down() {
    let response = failing_router()
        .oneshot(
            Request::builder()
                .uri("/search?idNumber=ID123456")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
