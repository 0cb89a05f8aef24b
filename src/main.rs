//! Dialogflow Proxy Server
//!
//! Decodes the service account key at startup, then serves
//! `POST /detect-intent` and forwards each query to Dialogflow.
//!
//! Usage:
//!   dialogflow-proxy [--port 5000]

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use dialogflow_proxy::{build_state, router, Credential, ProxyConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dialogflow_proxy=info".parse()?),
        )
        .init();

    let mut config = ProxyConfig::from_env().context("Invalid configuration")?;

    // --port wins over PORT
    if let Some(port) = std::env::args()
        .skip_while(|a| a != "--port")
        .nth(1)
        .and_then(|p| p.parse().ok())
    {
        config = config.with_port(port);
    }

    let credential = Credential::load(&config.credential_source)
        .with_context(|| format!("Failed to load service account ({})", config.credential_source.kind()))?;

    info!(
        project_id = %credential.project_id,
        client_email = %credential.client_email,
        private_key_len = credential.private_key.len(),
        "Loaded service account"
    );

    let state = Arc::new(build_state(&config, credential).context("Failed to build HTTP client")?);
    let app = router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Proxy running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
