pub mod backoff;
pub mod retries;

pub use backoff::ErrorBackoff;
pub use retries::{is_refused, RetryPolicy};
