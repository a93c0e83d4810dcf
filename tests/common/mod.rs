//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use form_relay::config::{ServerEndpoint, Settings, TransportKind};
use form_relay::http::FrontDoorHandle;
use form_relay::ingest::ListenerHandle;
use form_relay::lifecycle::{assemble, Assembly, Role};
use tempfile::TempDir;

/// A running front door and listener sharing one temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub http: SocketAddr,
    pub front: FrontDoorHandle,
    pub listener: ListenerHandle,
}

impl Harness {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http, path)
    }

    pub fn storage(&self) -> PathBuf {
        self.dir.path().join("storage").join("data.json")
    }
}

/// Settings bound to loopback with ephemeral ports, rooted in `dir`.
pub fn local_settings(dir: &Path, transport: TransportKind) -> Settings {
    let mut settings = Settings::default();
    settings.http_server = Some(ServerEndpoint::new("127.0.0.1", 0));
    settings.socket_server = Some(ServerEndpoint::new("127.0.0.1", 0));
    settings.transport = transport;
    settings.paths.web_root = dir.join("front");
    settings.paths.storage = dir.join("storage").join("data.json");
    settings
}

/// Write a minimal web root with recognizable pages.
pub fn write_web_root(dir: &Path) {
    let root = dir.join("front");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("index.html"), "<h1>index</h1>").unwrap();
    std::fs::write(root.join("message.html"), "<form>message</form>").unwrap();
    std::fs::write(root.join("error.html"), "<h1>not here</h1>").unwrap();
    std::fs::write(root.join("style.css"), "body { margin: 0; }").unwrap();
    std::fs::write(root.join("blob.notarealext"), b"\x01\x02raw").unwrap();
}

/// Start both components over `transport`.
pub fn start(transport: TransportKind) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    write_web_root(dir.path());
    let settings = local_settings(dir.path(), transport);

    let Assembly {
        front_door,
        listener,
        ..
    } = assemble(&settings, Role::All).unwrap();
    let front_door = front_door.unwrap();
    let http = front_door.local_addr();

    let listener = listener.unwrap().spawn().unwrap();
    let front = front_door.spawn().unwrap();

    Harness {
        dir,
        http,
        front,
        listener,
    }
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Read the storage document, or an empty object if nothing was written.
pub fn read_storage(path: &Path) -> serde_json::Map<String, serde_json::Value> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap(),
        Err(_) => serde_json::Map::new(),
    }
}
