//! The downstream Dialogflow v2 `detectIntent` call.

use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProxyError;
use crate::token::AccessToken;

const SESSION_ID_LEN: usize = 10;

/// Random lowercase alphanumeric id scoping one conversational turn.
/// Collisions are tolerated.
pub fn new_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentRequest<'a> {
    pub query_input: QueryInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct QueryInput<'a> {
    pub text: TextInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInput<'a> {
    pub text: &'a str,
    pub language_code: &'a str,
}

impl<'a> DetectIntentRequest<'a> {
    pub fn new(text: &'a str, language_code: &'a str) -> Self {
        Self {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code,
                },
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogflowClient {
    client: reqwest::Client,
    endpoint: String,
    language_code: String,
}

impl DialogflowClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            language_code: language_code.into(),
        }
    }

    pub fn session_url(&self, project_id: &str, session_id: &str) -> String {
        format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.endpoint, project_id, session_id
        )
    }

    /// Send `text` to Dialogflow and return the `queryResult` value untouched.
    pub async fn detect_intent(
        &self,
        token: &AccessToken,
        project_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<Value, ProxyError> {
        let url = self.session_url(project_id, session_id);
        debug!(%url, "Calling Dialogflow");

        let response = self
            .client
            .post(&url)
            .header("Authorization", token.bearer())
            .json(&DetectIntentRequest::new(text, &self.language_code))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let mut payload: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) if status.is_success() => {
                return Err(ProxyError::Downstream(format!(
                    "Failed to parse response: {}",
                    e
                )));
            }
            // Keep error pages around for diagnostics even if they are not JSON
            Err(_) => Value::String(body),
        };

        if !status.is_success() {
            warn!(status = status.as_u16(), "Dialogflow rejected detectIntent");
            return Err(ProxyError::DownstreamStatus {
                status: status.as_u16(),
                payload,
            });
        }

        // A null queryResult carries no result either
        if payload.get("queryResult").map_or(true, Value::is_null) {
            return Err(ProxyError::MissingQueryResult(payload));
        }
        Ok(payload["queryResult"].take())
    }
}
