//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (supervisor.rs, startup.rs):
//!     Load settings → bind sockets → listener thread → front door thread
//!
//! Shutdown (shutdown.rs):
//!     /shutdown route or Ctrl+C → stop frame → listener exits
//!                               → running flag cleared → front door exits
//!
//! Signals (signals.rs):
//!     SIGINT → GET /shutdown against the configured front door
//!     second SIGINT → exit without waiting
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Both shutdown triggers go through the same route
//! - Remote shutdown is best-effort and idempotent

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::{request_remote_shutdown, shutdown_url, RunningFlag};
pub use startup::{spawn_component, ComponentHandle, RuntimeError};
pub use supervisor::{assemble, run, Assembly, Role, SupervisorError};
