use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::credentials::CredentialSource;
use crate::error::ConfigError;

const ENV_KEY_BASE64: &str = "DIALOGFLOW_KEY_BASE64";
const ENV_KEY_BASE64_ALIAS: &str = "DIALOGFLOW_SERVICE_ACCOUNT_BASE64";
const ENV_PROJECT_ID: &str = "DIALOGFLOW_PROJECT_ID";
const ENV_CLIENT_EMAIL: &str = "DIALOGFLOW_CLIENT_EMAIL";
const ENV_PRIVATE_KEY: &str = "DIALOGFLOW_PRIVATE_KEY";
const ENV_PORT: &str = "PORT";
const ENV_HOST: &str = "HOST";
const ENV_ENDPOINT: &str = "DIALOGFLOW_ENDPOINT";
const ENV_TOKEN_URL: &str = "DIALOGFLOW_TOKEN_URL";
const ENV_LANGUAGE_CODE: &str = "DIALOGFLOW_LANGUAGE_CODE";
const ENV_TIMEOUT_SECS: &str = "DIALOGFLOW_TIMEOUT_SECS";

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ENDPOINT: &str = "https://dialogflow.googleapis.com";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_LANGUAGE_CODE: &str = "en";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything the proxy reads from its environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub credential_source: CredentialSource,
    pub host: IpAddr,
    pub port: u16,
    pub dialogflow_endpoint: String,
    pub token_url: String,
    pub language_code: String,
    pub request_timeout: Duration,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credential_source = credential_source(&optional)?;

        let port = match optional(ENV_PORT) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| {
                ConfigError::invalid_env_value(ENV_PORT, format!("expected port number, got '{value}'"))
            })?,
            None => DEFAULT_PORT,
        };

        let host = match optional(ENV_HOST) {
            Some(value) => value.trim().parse::<IpAddr>().map_err(|_| {
                ConfigError::invalid_env_value(ENV_HOST, format!("expected IP address, got '{value}'"))
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let timeout_secs = match optional(ENV_TIMEOUT_SECS) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                ConfigError::invalid_env_value(
                    ENV_TIMEOUT_SECS,
                    format!("expected integer seconds, got '{value}'"),
                )
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            credential_source,
            host,
            port,
            dialogflow_endpoint: optional(ENV_ENDPOINT)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token_url: optional(ENV_TOKEN_URL)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            language_code: optional(ENV_LANGUAGE_CODE)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn credential_source<F>(optional: &F) -> Result<CredentialSource, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(blob) = optional(ENV_KEY_BASE64).or_else(|| optional(ENV_KEY_BASE64_ALIAS)) {
        return Ok(CredentialSource::Base64Blob(blob));
    }

    match (
        optional(ENV_PROJECT_ID),
        optional(ENV_CLIENT_EMAIL),
        optional(ENV_PRIVATE_KEY),
    ) {
        (Some(project_id), Some(client_email), Some(private_key)) => {
            Ok(CredentialSource::SplitFields {
                project_id,
                client_email,
                private_key,
            })
        }
        _ => Err(ConfigError::MissingCredentials),
    }
}
