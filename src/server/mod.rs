//! HTTP surface of the proxy, with read routes for each table and the loan
//! creation route, served with axum.

use crate::airtable::{ExternalRecord, RemoteFetchError};
use crate::enrich::EnrichedResponse;
use crate::proxy::AirtableProxy;
use crate::write::{NewLoan, CREATE_FAILED_MESSAGE};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Route paths, shared with `ProxyClient`.
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const LOANS: &str = "/api/airtable/Loan_Pipeline";
    pub const TEST_LOANS: &str = "/api/airtable/Loan_Pipeline_Test";
    pub const CONDITIONS: &str = "/api/airtable/Deal_Conditions";
    pub const RESPONSES: &str = "/api/airtable/Response_Submissions";
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type SharedProxy = Arc<AirtableProxy>;

pub fn router(proxy: SharedProxy) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::LOANS, get(list_loans))
        .route(
            routes::TEST_LOANS,
            get(list_test_loans).post(create_test_loan),
        )
        .route(routes::CONDITIONS, get(list_conditions))
        .route(routes::RESPONSES, get(list_responses))
        .with_state(proxy)
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, proxy: SharedProxy) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "proxy listening");
    axum::serve(listener, router(proxy)).await
}

fn fetch_failed(route: &'static str, err: RemoteFetchError) -> ApiError {
    error!(route, error = %err, "read failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

async fn health() -> &'static str {
    "ok"
}

async fn list_loans(State(proxy): State<SharedProxy>) -> Result<Json<Vec<ExternalRecord>>, ApiError> {
    proxy
        .loans()
        .await
        .map(Json)
        .map_err(|e| fetch_failed(routes::LOANS, e))
}

async fn list_test_loans(
    State(proxy): State<SharedProxy>,
) -> Result<Json<Vec<ExternalRecord>>, ApiError> {
    proxy
        .test_loans()
        .await
        .map(Json)
        .map_err(|e| fetch_failed(routes::TEST_LOANS, e))
}

async fn list_conditions(
    State(proxy): State<SharedProxy>,
) -> Result<Json<Vec<ExternalRecord>>, ApiError> {
    proxy
        .conditions()
        .await
        .map(Json)
        .map_err(|e| fetch_failed(routes::CONDITIONS, e))
}

async fn list_responses(
    State(proxy): State<SharedProxy>,
) -> Result<Json<Vec<EnrichedResponse>>, ApiError> {
    proxy
        .responses()
        .await
        .map(Json)
        .map_err(|e| fetch_failed(routes::RESPONSES, e))
}

fn create_failed() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: CREATE_FAILED_MESSAGE.to_string(),
        }),
    )
}

/// The underlying cause is logged; the caller only sees a fixed message,
/// whether the body was unreadable or the insert failed.
async fn create_test_loan(
    State(proxy): State<SharedProxy>,
    input: Result<Json<NewLoan>, JsonRejection>,
) -> Result<Json<ExternalRecord>, ApiError> {
    let Json(input) = input.map_err(|rejection| {
        error!(error = %rejection.body_text(), "unreadable loan body");
        create_failed()
    })?;

    proxy.create_test_loan(&input).await.map(Json).map_err(|err| {
        error!(error = %err, "creating record failed");
        create_failed()
    })
}
