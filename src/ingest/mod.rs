//! Ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! relay frame
//!     → listener.rs (receive loop; empty frame stops it)
//!     → form.rs (key=value&key=value → FormRecord)
//!     → storage (timestamped append)
//! ```
//!
//! # Design Decisions
//! - One frame is fully decoded and persisted before the next is received
//! - Bad frames are logged and skipped, never fatal

pub mod form;
pub mod listener;

pub use form::{decode_form, IngestFormatError};
pub use listener::{
    IngestStats, IngestionListener, ListenerHandle, ListenerSetupError, ListenerState,
};
