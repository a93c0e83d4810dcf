//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Browser
//!     → listener.rs (TCP accept, one connection at a time)
//!     → [http layer handles the request]
//!     → datagram.rs (relay frame to the ingestion listener)
//! ```
//!
//! # Design Decisions
//! - Sockets bind at construction so startup fails fast
//! - Runtime registration happens on the component's own thread
//! - The relay transport is chosen by settings: in-process channel or UDP

pub mod datagram;
pub mod listener;

pub use datagram::{channel, Datagram, DeliveryError, RelayReceiver, RelaySender};
pub use listener::{Listener, ListenerError};
