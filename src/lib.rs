//! Form relay
//!
//! Accepts web form submissions over HTTP and relays them to an ingestion
//! listener that stores each one as a timestamped record in a JSON file.
//!
//! ```text
//!   Browser ──HTTP──▶ http (front door) ──frame──▶ ingest (listener) ──▶ storage (JSON)
//!                          │    ▲                        ▲
//!                          │    └── GET /shutdown ◀── lifecycle (Ctrl+C)
//!                          └──────── stop frame ─────────┘
//! ```

pub mod config;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod storage;

pub use config::Settings;
pub use http::FrontDoorServer;
pub use ingest::IngestionListener;
pub use lifecycle::{run, Role};
pub use storage::JsonStore;
