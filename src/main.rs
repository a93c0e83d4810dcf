//! form-relay
//!
//! Serves a web form, relays each submission to the ingestion listener and
//! stores it as a timestamped record in a JSON file.
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  form-relay                  │
//!     Browser ───────▶│  front door ──frame──▶ ingestion listener    │
//!     GET / POST      │  (http)                (ingest + storage)    │
//!                     │      ▲                         │             │
//!     Ctrl+C ─────────┼──────┘ GET /shutdown           ▼             │
//!                     │                        storage/data.json     │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use form_relay::config::{SettingsSource, TransportKind, DEFAULT_SETTINGS_PATH};
use form_relay::lifecycle::{self, Role};
use form_relay::observability::logging;

#[derive(Parser)]
#[command(name = "form-relay")]
#[command(about = "Web form front door with a JSON ingestion listener", long_about = None)]
struct Args {
    /// Settings file with the server endpoints.
    #[arg(short, long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Override the directory pages and static files are served from.
    #[arg(long)]
    web_root: Option<PathBuf>,

    /// Override the JSON storage file.
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Override the relay transport.
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Components to run in this process.
    #[arg(long, value_enum, default_value_t = Role::All)]
    role: Role,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = match SettingsSource::new(&args.settings).load() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            tracing::error!(path = %args.settings.display(), error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };

    if let Some(web_root) = args.web_root {
        settings.paths.web_root = web_root;
    }
    if let Some(storage) = args.storage {
        settings.paths.storage = storage;
    }
    if let Some(transport) = args.transport {
        settings.transport = transport;
    }
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }

    logging::init(&settings.logging.level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings = %args.settings.display(),
        storage = %settings.paths.storage.display(),
        "form-relay starting"
    );

    match lifecycle::run(settings, args.role).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}
