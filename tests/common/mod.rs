use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use persona_chat::config::{EndpointConfig, StreamConfig};
use persona_chat::transport::HttpTransport;
use persona_chat::{ChatSession, Persona};
use std::sync::Arc;

#[allow(dead_code)]
pub const PERSONAS_YAML: &str = r#"personas:
  - name: Nova
    handle: nova
    bio: Astrophysicist
    badge: verified
  - name: Rex
    handle: rex
"#;

/// One `data:` record carrying `text` as the delta content
#[allow(dead_code)]
pub fn record(text: &str) -> String {
    let payload = serde_json::json!({ "choices": [{ "delta": { "content": text } }] });
    format!("data: {}\n", payload)
}

/// A complete streamed body: one record per delta, then the done sentinel
#[allow(dead_code)]
pub fn sse_body(deltas: &[&str]) -> String {
    let mut body: String = deltas.iter().map(|d| record(d)).collect();
    body.push_str("data: [DONE]\n");
    body
}

#[allow(dead_code)]
pub fn endpoint(url: &str) -> EndpointConfig {
    EndpointConfig {
        url: url.to_string(),
        api_key: Some("test-key".to_string()),
        timeout_seconds: 5,
    }
}

#[allow(dead_code)]
pub fn http_session(url: &str) -> ChatSession {
    let transport = HttpTransport::new(&endpoint(url)).expect("valid endpoint");
    ChatSession::new(
        Arc::new(transport),
        Persona::new("Nova", "nova"),
        &StreamConfig::default(),
    )
}

/// Writes a config file and persona catalog into a fresh directory
///
/// Returns the directory guard and the config path.
#[allow(dead_code)]
pub fn temp_config(endpoint_url: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let catalog_path = temp_dir.path().join("personas.yaml");
    fs::write(&catalog_path, PERSONAS_YAML).expect("failed to write catalog");

    let config = format!(
        "endpoint:\n  url: {}\n  timeout_seconds: 5\npersonas:\n  catalog: {}\n",
        endpoint_url,
        catalog_path.display()
    );
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, config).expect("failed to write config file");
    (temp_dir, config_path)
}
