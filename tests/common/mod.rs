#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};

use authenticated_api::{Api, MemoryCredentialStore, OAuthStrategy, ReqwestTransport, Tokens};
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt};
use wiremock::MockServer;

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}

/// Writes a per-test config file so tests do not race on shared env vars.
pub fn write_config(server: &MockServer, cfg: serde_json::Value) -> PathBuf {
    let mut cfg_path = PathBuf::from("target");
    cfg_path.push(format!("test-config-{}.json", server.address().port()));
    fs::create_dir_all("target").ok();
    fs::write(&cfg_path, serde_json::to_string(&cfg).unwrap()).unwrap();
    cfg_path
}

pub fn oauth_api(server: &MockServer, tokens: Option<Tokens>) -> (Api, Arc<MemoryCredentialStore>) {
    let store = Arc::new(
        tokens
            .map(MemoryCredentialStore::with_tokens)
            .unwrap_or_default(),
    );
    let transport = ReqwestTransport::new(server.uri()).expect("transport");
    let api = Api::builder(
        Arc::new(transport),
        store.clone(),
        OAuthStrategy::new(CLIENT_ID, CLIENT_SECRET),
    )
    .build();
    (api, store)
}
