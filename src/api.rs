//! REST API for tronwatch
//!
//! Two endpoints do the work: `POST /wallet-info` proxies an account lookup to
//! TronGrid and records it, `GET /query-history` pages through the recorded
//! lookups.

use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::WatchError;
use crate::persistence::{QueryHistory, WalletQuery};
use crate::tron::{AccountSnapshot, TronClient};

pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Dependencies shared by every request. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn QueryHistory>,
    pub tron: Arc<TronClient>,
}

impl AppState {
    pub fn new(history: Arc<dyn QueryHistory>, tron: TronClient) -> Self {
        Self {
            history,
            tron: Arc::new(tron),
        }
    }

    /// Look up `address` upstream and record the lookup.
    ///
    /// Nothing is written when the upstream fails, and a failed write fails the
    /// lookup.
    pub async fn wallet_info(&self, address: Option<String>) -> Result<AccountSnapshot, ApiError> {
        let address = match address {
            Some(a) if !a.is_empty() => a,
            _ => {
                return Err(
                    WatchError::Validation("address must be a non-empty string".to_string()).into(),
                )
            }
        };

        let snapshot = self.tron.fetch(&address).await.map_err(|e| {
            tracing::warn!(address = %address, error = %e, "wallet_info.upstream_failed");
            e
        })?;

        let now = chrono::Utc::now();
        let history = Arc::clone(&self.history);
        let recorded = address.clone();
        let id = tokio::task::spawn_blocking(move || history.record(Some(&recorded), now))
            .await
            .map_err(|e| ApiError::InternalError(format!("History write task failed: {}", e)))?
            .map_err(|e| {
                tracing::error!(address = %address, error = %e, "wallet_info.record_failed");
                e
            })?;

        tracing::info!(id, address = %address, "wallet_info.recorded");
        Ok(snapshot)
    }

    /// One page of history after range checks.
    pub async fn query_history(&self, skip: i64, limit: i64) -> Result<Vec<WalletQuery>, ApiError> {
        if skip < 0 {
            return Err(WatchError::Validation(
                "skip must be greater than or equal to 0".to_string(),
            )
            .into());
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(WatchError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            ))
            .into());
        }

        let history = Arc::clone(&self.history);
        let rows = tokio::task::spawn_blocking(move || history.list(skip as u64, limit as u64))
            .await
            .map_err(|e| ApiError::InternalError(format!("History read task failed: {}", e)))??;

        Ok(rows)
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Service(WatchError),
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(WatchError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Service(WatchError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Service(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Service(e) => e.to_string(),
            ApiError::InternalError(msg) => msg,
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<WatchError> for ApiError {
    fn from(err: WatchError) -> Self {
        ApiError::Service(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Service(WatchError::Validation(rejection.body_text()))
    }
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct WalletInfoQuery {
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_skip")]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_skip() -> i64 {
    DEFAULT_SKIP
}
fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/wallet-info", post(wallet_info))
        .route("/query-history", get(query_history))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .with_state(state)
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn run_api_server(state: AppState, port: u16) -> Result<(), WatchError> {
    let app = build_api_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "api.listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn wallet_info(
    State(state): State<AppState>,
    params: Result<Query<WalletInfoQuery>, QueryRejection>,
) -> Result<Json<AccountSnapshot>, ApiError> {
    let Query(params) = params?;
    state.wallet_info(params.address).await.map(Json)
}

async fn query_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<WalletQuery>>, ApiError> {
    let Query(params) = params?;
    state
        .query_history(params.skip, params.limit)
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryHistory;

    fn state_with_unreachable_upstream() -> (Arc<InMemoryHistory>, AppState) {
        let history = Arc::new(InMemoryHistory::new());
        // Grab a free port and release it so nothing is listening there.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let tron = TronClient::new(&format!("http://{}", addr), "test-key").unwrap();
        (history.clone(), AppState::new(history, tron))
    }

    #[tokio::test]
    async fn test_empty_address_rejected_without_side_effects() {
        let (history, state) = state_with_unreachable_upstream();

        for address in [None, Some(String::new())] {
            let err = state.wallet_info(address).await.unwrap_err();
            assert!(matches!(err, ApiError::Service(WatchError::Validation(_))));
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert_eq!(history.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_address_passes_validation() {
        let (history, state) = state_with_unreachable_upstream();

        // Non-empty, so it reaches the upstream, which is down here.
        let err = state.wallet_info(Some("   ".to_string())).await.unwrap_err();
        assert!(matches!(err, ApiError::Service(WatchError::Upstream(_))));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(history.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_writes_nothing() {
        let (history, state) = state_with_unreachable_upstream();

        let err = state
            .wallet_info(Some("TLw6HAySiPaJqQnTavhGg3T9C4d5dFVf5z".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(history.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pagination_bounds() {
        let (_history, state) = state_with_unreachable_upstream();

        for (skip, limit) in [(-1, 10), (0, 0), (0, 101), (-1, 0)] {
            let err = state.query_history(skip, limit).await.unwrap_err();
            assert!(matches!(err, ApiError::Service(WatchError::Validation(_))));
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert!(state.query_history(0, 1).await.unwrap().is_empty());
        assert!(state.query_history(5, MAX_LIMIT).await.unwrap().is_empty());
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (WatchError::Validation("v".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (WatchError::Upstream("u".into()), StatusCode::BAD_GATEWAY),
            (WatchError::Constraint("c".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (WatchError::Database("d".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
