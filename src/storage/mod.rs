//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! decoded FormRecord
//!     → clock.rs (strictly increasing timestamp key)
//!     → json_store.rs (read document → insert → rewrite via temp file)
//! ```

pub mod clock;
pub mod json_store;

pub use clock::{following_key, Clock, SystemClock, Timestamper, TIMESTAMP_FORMAT};
pub use json_store::{FormRecord, JsonStore, PersistenceError, StorageDocument};
