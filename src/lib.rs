//! Dialogflow detect-intent proxy.
//!
//! Accepts `{"text": ...}` on `POST /detect-intent`, trades a service account
//! key for an OAuth token, forwards the text to Dialogflow v2 and relays the
//! `queryResult` back.

pub mod config;
pub mod credentials;
pub mod dialogflow;
pub mod error;
pub mod server;
pub mod token;

pub use config::ProxyConfig;
pub use credentials::{Credential, CredentialSource};
pub use dialogflow::DialogflowClient;
pub use error::{AuthError, ConfigError, ProxyError};
pub use server::{router, AppState};
pub use token::{AccessToken, ServiceAccountTokenProvider, TokenProvider};

use std::sync::Arc;

/// Wire the production components together for `credential`.
pub fn build_state(config: &ProxyConfig, credential: Credential) -> reqwest::Result<AppState> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let tokens = Arc::new(ServiceAccountTokenProvider::new(
        client.clone(),
        config.token_url.clone(),
    ));
    let dialogflow = DialogflowClient::new(
        client,
        config.dialogflow_endpoint.clone(),
        config.language_code.clone(),
    );

    Ok(AppState::new(credential, tokens, dialogflow))
}
