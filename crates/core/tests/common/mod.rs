#![allow(dead_code)]

use std::path::Path;

use kinoscope_core::{ApiClient, CandidateFile, ClientConfig};
use serde_json::{Value, json};
use wiremock::MockServer;

pub fn client_for(server: &MockServer) -> ApiClient {
    client_at(&server.uri())
}

pub fn client_at(base_url: &str) -> ApiClient {
    let config = ClientConfig::new(base_url).expect("valid base url");
    ApiClient::new(&config).expect("http client")
}

/// Base URL of a port nobody listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub async fn video(dir: &Path, name: &str) -> CandidateFile {
    let path = dir.join(name);
    std::fs::write(&path, b"fake video payload").expect("write video");
    CandidateFile::from_path(&path).await.expect("candidate")
}

pub fn upload_body(filename: &str, transcript: Option<&str>) -> Value {
    json!({
        "summary": {
            "filename": filename,
            "duration": 61.2,
            "fps": 30,
            "resolution": [1920, 1080],
            "transcript": transcript,
            "transcript_file": format!("{}_transcript.txt", filename),
            "analysis_file": format!("{}_analysis.txt", filename),
            "highlight_file": null,
            "summaries": {
                "paragraph_summary": format!("Summary of {}", filename),
                "bullet_points": ["one"],
                "key_points": ["kp"],
                "decisions": ["ship it"],
                "action_items": ["follow up"]
            },
            "timestamps": [
                {"timestamp": "00:00:00", "text": "intro"},
                {"timestamp": "00:00:30", "text": "outro"}
            ]
        }
    })
}
