//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All components produce:
//!     → tracing events with structured fields (peer, request_id, key)
//!     → spans per component thread and per connection
//!
//! Consumers:
//!     → logging.rs (fmt subscriber on stdout, filtered by level)
//! ```

pub mod logging;
