use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use tower::ServiceBuilder;

use super::admin::admin_router;
use super::response::ApiError;
use super::workspace::workspace_router;
use crate::error::Error;
use crate::identity::IdentityLookup;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Display identities for enriched reads.
    pub identity: Arc<dyn IdentityLookup>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Time allowed for identity lookups during an enriched read.
    pub fn identity_budget(&self) -> Duration {
        self.request_timeout / 2
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

/// Answers 503 when a handler runs past the configured deadline.
async fn enforce_deadline(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match tokio::time::timeout(state.request_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                "Request to {path} exceeded {}ms",
                state.request_timeout.as_millis()
            );
            ApiError::from(Error::Timeout).into_response()
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", workspace_router())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    enforce_deadline,
                )),
        )
        .with_state(state)
}
