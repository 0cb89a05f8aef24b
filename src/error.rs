use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Startup failures. Any of these stops the process before it binds a port.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no service account configured: set DIALOGFLOW_KEY_BASE64, or all of \
         DIALOGFLOW_PROJECT_ID, DIALOGFLOW_CLIENT_EMAIL and DIALOGFLOW_PRIVATE_KEY"
    )]
    MissingCredentials,
    #[error("environment variable '{name}' invalid value: {message}")]
    InvalidEnvValue { name: &'static str, message: String },
    #[error("service account key is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("service account key is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("failed to parse service account JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service account field '{0}' is missing or empty")]
    EmptyField(&'static str),
    #[error("service account private key is not a usable RSA PEM key: {0}")]
    InvalidPrivateKey(#[source] jsonwebtoken::errors::Error),
}

impl ConfigError {
    pub fn invalid_env_value(name: &'static str, message: String) -> Self {
        Self::InvalidEnvValue { name, message }
    }
}

/// Token exchange failures. Recoverable per request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("system clock is before the unix epoch")]
    Clock(#[from] std::time::SystemTimeError),
    #[error("failed to sign JWT assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token exchange rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Everything that can go wrong while serving one `/detect-intent` call.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing text input")]
    MissingText,
    #[error("invalid JSON body: {0}")]
    InvalidBody(#[source] serde_json::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Dialogflow call failed: {0}")]
    Downstream(String),
    #[error("Dialogflow returned {status}")]
    DownstreamStatus { status: u16, payload: Value },
    #[error("Dialogflow response has no queryResult")]
    MissingQueryResult(Value),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingText | ProxyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ProxyError::MissingText => json!({ "error": "Missing text input" }),
            ProxyError::InvalidBody(e) => json!({
                "error": "Invalid JSON body",
                "details": e.to_string(),
            }),
            ProxyError::Auth(e) => json!({
                "error": "Failed to obtain access token",
                "details": e.to_string(),
            }),
            ProxyError::Downstream(message) => json!({
                "error": "Dialogflow proxy failed",
                "details": message,
            }),
            ProxyError::DownstreamStatus { status, payload } => json!({
                "error": "Dialogflow request failed",
                "status": status,
                "details": payload,
            }),
            ProxyError::MissingQueryResult(payload) => json!({
                "error": "Dialogflow response missing queryResult",
                "details": payload,
            }),
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Downstream(e.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ProxyError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn missing_text_is_a_fixed_400() {
        let (status, body) = render(ProxyError::MissingText).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing text input" }));
    }

    #[tokio::test]
    async fn auth_failure_is_500_with_details() {
        let err = ProxyError::from(AuthError::Rejected {
            status: 401,
            body: "invalid_grant".to_string(),
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to obtain access token");
        assert!(body["details"].as_str().unwrap().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn downstream_status_carries_payload() {
        let payload = json!({ "error": { "code": 403, "status": "PERMISSION_DENIED" } });
        let (status, body) = render(ProxyError::DownstreamStatus {
            status: 403,
            payload: payload.clone(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 403);
        assert_eq!(body["details"], payload);
    }
}
