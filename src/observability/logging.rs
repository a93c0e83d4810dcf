//! Structured logging.
//!
//! Library code only emits `tracing` events; installing the subscriber is
//! left to the binaries so embedding applications keep control of output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("form_relay={level},relay_ctl={level},tower_http={level}")
}

/// Install the global subscriber. `RUST_LOG` overrides `level`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_covers_crate_and_http_layer() {
        let filter = default_filter("debug");
        assert!(filter.contains("form_relay=debug"));
        assert!(filter.contains("relay_ctl=debug"));
        assert!(filter.contains("tower_http=debug"));
        assert!(EnvFilter::try_new(filter).is_ok());
    }

    #[test]
    fn init_twice_is_harmless() {
        init("info");
        init("debug");
    }
}
