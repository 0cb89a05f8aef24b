//! OAuth access tokens for the service account.
//!
//! Server-to-server flow: sign a JWT assertion with the service account key,
//! post it to the token endpoint, read `access_token` back. Tokens are not
//! cached, every call does a fresh exchange.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use jsonwebtoken::{encode, Algorithm, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::Credential;
use crate::error::AuthError;

/// Scope requested for every token.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion. Google caps this at one hour.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// An opaque bearer token. Expiry is not tracked.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Anything that can turn a credential into a bearer token.
pub trait TokenProvider: Send + Sync {
    fn access_token<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<AccessToken, AuthError>>;
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub exp: u64,
    pub iat: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges a signed JWT at the OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct ServiceAccountTokenProvider {
    client: reqwest::Client,
    token_url: String,
    scope: String,
}

impl ServiceAccountTokenProvider {
    pub fn new(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Build and sign the RS256 assertion for `credential`.
    pub fn sign_assertion(&self, credential: &Credential) -> Result<String, AuthError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = Claims {
            iss: credential.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_url.clone(),
            exp: now + ASSERTION_LIFETIME_SECS,
            iat: now,
        };

        let key = credential.encoding_key()?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    async fn exchange(&self, credential: &Credential) -> Result<AccessToken, AuthError> {
        let assertion = self.sign_assertion(credential)?;

        debug!(token_url = %self.token_url, client_email = %credential.client_email, "Exchanging JWT assertion");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(AccessToken::new(token.access_token))
    }
}

impl TokenProvider for ServiceAccountTokenProvider {
    fn access_token<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, Result<AccessToken, AuthError>> {
        Box::pin(self.exchange(credential))
    }
}
