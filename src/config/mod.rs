//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings/connection.json
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → passed by value into each component's constructor
//!
//! On reload:
//!     SettingsSource::load re-reads the file; running components keep
//!     the settings they were built with
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded
//! - Only the two server sections are required by the components that use them
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError, SettingsSource, DEFAULT_SETTINGS_PATH};
pub use schema::{
    DeliveryConfig, LoggingConfig, PathsConfig, ServerEndpoint, Settings, TransportKind,
    HTTP_SERVER, SOCKET_SERVER,
};
