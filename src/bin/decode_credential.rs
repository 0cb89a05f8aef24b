//! Decode the configured service account and print who it is.
//!
//! Reads the same environment (and `.env`) as the proxy. The private key is
//! never printed, only its length and PEM header.

use anyhow::{Context, Result};

use dialogflow_proxy::{Credential, ProxyConfig};

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = ProxyConfig::from_env().context("Invalid configuration")?;
    let credential = Credential::load(&config.credential_source).with_context(|| {
        format!(
            "Failed to decode service account ({})",
            config.credential_source.kind()
        )
    })?;

    println!("source:       {}", config.credential_source.kind());
    println!("project_id:   {}", credential.project_id);
    println!("client_email: {}", credential.client_email);
    println!(
        "private_key:  {} ({} bytes)",
        credential.private_key_header(),
        credential.private_key.len()
    );

    Ok(())
}
