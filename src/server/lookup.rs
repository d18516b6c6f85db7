use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use crate::errors::BatchError;
use crate::fetch::orchestrator::FetchOrchestrator;
use crate::server::server::AppState;

pub static LOOKUP_PATH: &str = "/orders/lookup";
pub static PROGRESS_PATH: &str = "/progress";
pub static TOKEN_PATH: &str = "/token";

#[derive(Clone)]
pub struct LookupState {
    pub orchestrator: FetchOrchestrator,
}

impl LookupState {
    pub fn new(orchestrator: FetchOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn router(&self) -> Router<AppState> {
        info!("served paths: {}, {}, {}", LOOKUP_PATH, PROGRESS_PATH, TOKEN_PATH);
        Router::new()
            .route(LOOKUP_PATH, post(lookup))
            .route(PROGRESS_PATH, get(progress))
            .route(TOKEN_PATH, delete(clear_token))
    }
}

/// Body is the raw identifier text, the same free-form input the CLI takes.
async fn lookup(State(state): State<AppState>, body: String) -> Response {
    match state.lookup_state.orchestrator.fetch_many(&body).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            let status = match e {
                BatchError::Validation => StatusCode::BAD_REQUEST,
                BatchError::Auth(_) => StatusCode::BAD_GATEWAY,
            };
            (status, Json(json!({ "error": e.reason(), "message": e.to_string() }))).into_response()
        }
    }
}

async fn progress(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.lookup_state.orchestrator.progress().snapshot())
}

async fn clear_token(State(state): State<AppState>) -> StatusCode {
    state.lookup_state.orchestrator.tokens().clear().await;
    StatusCode::NO_CONTENT
}
