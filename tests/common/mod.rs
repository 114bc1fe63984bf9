use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use medrax::backend::Sleeper;
use medrax::config::{AnalysisConfig, BackendConfig, FollowUpConfig};

/// PNG signature followed by an IHDR chunk header; enough for format sniffing
#[allow(dead_code)]
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

#[allow(dead_code)]
pub fn temp_png(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let image_path = temp_dir.path().join(name);
    fs::write(&image_path, PNG_BYTES).expect("failed to write image file");
    (temp_dir, image_path)
}

#[allow(dead_code)]
pub fn temp_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let path = temp_dir.path().join(name);
    fs::write(&path, contents).expect("failed to write file");
    (temp_dir, path)
}

/// Backend config pointing both endpoints at a mock server
#[allow(dead_code)]
pub fn backend_for(server_uri: &str) -> BackendConfig {
    BackendConfig {
        base_url: server_uri.to_string(),
        legacy_ask_url: format!("{}/ask/", server_uri),
        timeout_seconds: 5,
    }
}

#[allow(dead_code)]
pub fn default_analysis() -> AnalysisConfig {
    AnalysisConfig::default()
}

#[allow(dead_code)]
pub fn default_followup() -> FollowUpConfig {
    FollowUpConfig::default()
}

/// Base URL of a local port with nothing listening on it
#[allow(dead_code)]
pub fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind port");
    let port = listener.local_addr().expect("no local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Sleeper that records requested delays instead of waiting
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

#[allow(dead_code)]
impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("sleeper lock poisoned").clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .expect("sleeper lock poisoned")
            .push(duration);
    }
}
