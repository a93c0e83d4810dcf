//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper http1, one request per connection)
//!     → request.rs (request ID)
//!     → dispatch by method and path
//!     → response.rs (pages, static files, redirect)
//!     → [POST bodies relayed to the ingestion listener]
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{guess_mime, Pages};
pub use server::{AppState, FrontDoorError, FrontDoorHandle, FrontDoorServer};
