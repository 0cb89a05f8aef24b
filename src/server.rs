//! HTTP surface: `POST /detect-intent` plus CORS preflight.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::credentials::Credential;
use crate::dialogflow::{new_session_id, DialogflowClient};
use crate::error::ProxyError;
use crate::token::TokenProvider;

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub credential: Credential,
    pub tokens: Arc<dyn TokenProvider>,
    pub dialogflow: DialogflowClient,
}

impl AppState {
    pub fn new(
        credential: Credential,
        tokens: Arc<dyn TokenProvider>,
        dialogflow: DialogflowClient,
    ) -> Self {
        Self {
            credential,
            tokens,
            dialogflow,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/detect-intent", post(detect_intent))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn detect_intent(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match proxy_detect_intent(&state, &body).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            if e.status_code().is_server_error() {
                error!("Error in /detect-intent: {}", e);
            } else {
                warn!("Rejected /detect-intent request: {}", e);
            }
            e.into_response()
        }
    }
}

/// Pull a non-empty `text` string out of the request body.
fn extract_text(body: &[u8]) -> Result<String, ProxyError> {
    let request: Value = serde_json::from_slice(body).map_err(ProxyError::InvalidBody)?;
    match request.get("text") {
        Some(Value::String(text)) if !text.is_empty() => Ok(text.clone()),
        _ => Err(ProxyError::MissingText),
    }
}

async fn proxy_detect_intent(state: &AppState, body: &[u8]) -> Result<Value, ProxyError> {
    let text = extract_text(body)?;
    let session_id = new_session_id();
    info!(session_id = %session_id, chars = text.chars().count(), "Detecting intent");

    let token = state.tokens.access_token(&state.credential).await?;

    state
        .dialogflow
        .detect_intent(&token, &state.credential.project_id, &session_id, &text)
        .await
}
