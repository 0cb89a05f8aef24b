//! Startup behaviour of the built binaries.

use std::fs;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

const TEST_KEY: &str = include_str!("fixtures/service_account_key.pem");

const CREDENTIAL_VARS: &[&str] = &[
    "DIALOGFLOW_KEY_BASE64",
    "DIALOGFLOW_SERVICE_ACCOUNT_BASE64",
    "DIALOGFLOW_PROJECT_ID",
    "DIALOGFLOW_CLIENT_EMAIL",
    "DIALOGFLOW_PRIVATE_KEY",
];

/// Run `binary` from a fresh empty directory with the credential variables
/// blanked, plus `extra`. Blank values count as unset and are never
/// overwritten by a `.env` file found further up the tree.
fn run(binary: &str, extra: &[(&str, &str)]) -> Output {
    static RUNS: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "dialogflow-proxy-startup-{}-{}",
        std::process::id(),
        RUNS.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");

    let mut cmd = Command::new(binary);
    cmd.current_dir(&dir);
    for var in CREDENTIAL_VARS {
        cmd.env(var, "");
    }
    cmd.env("PORT", "0");
    for (name, value) in extra {
        cmd.env(name, value);
    }
    let output = cmd.output().expect("failed to spawn binary");
    let _ = fs::remove_dir_all(&dir);
    output
}

#[test]
fn proxy_exits_1_without_credentials() {
    let output = run(env!("CARGO_BIN_EXE_dialogflow-proxy"), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DIALOGFLOW_KEY_BASE64"), "stderr: {stderr}");
    assert!(!stderr.contains("Proxy running"));
}

#[test]
fn proxy_exits_1_on_undecodable_key() {
    let output = run(
        env!("CARGO_BIN_EXE_dialogflow-proxy"),
        &[("DIALOGFLOW_KEY_BASE64", "%%% definitely not base64 %%%")],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load service account"), "stderr: {stderr}");
}

#[test]
fn decode_credential_prints_identity_without_the_key() {
    let blob = STANDARD.encode(
        json!({
            "project_id": "demo-agent",
            "client_email": "proxy@demo-agent.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
        })
        .to_string(),
    );
    let output = run(
        env!("CARGO_BIN_EXE_decode-credential"),
        &[("DIALOGFLOW_KEY_BASE64", blob.as_str())],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("demo-agent"));
    assert!(stdout.contains("proxy@demo-agent.iam.gserviceaccount.com"));
    let key_body = TEST_KEY.lines().nth(1).unwrap();
    assert!(!stdout.contains(key_body));
}

#[test]
fn decode_credential_exits_1_without_credentials() {
    let output = run(env!("CARGO_BIN_EXE_decode-credential"), &[]);
    assert_eq!(output.status.code(), Some(1));
}
