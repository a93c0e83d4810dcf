//! Settings validation.
//!
//! Serde handles the syntax; this pass checks values serde cannot express.
//! All problems are collected rather than stopping at the first.

use crate::config::schema::{ServerEndpoint, Settings, HTTP_SERVER, SOCKET_SERVER};

/// Largest UDP payload over IPv4.
const MAX_UDP_PAYLOAD: usize = 65_507;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate settings, returning every problem found.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, endpoint) in [
        (HTTP_SERVER, settings.http_server.as_ref()),
        (SOCKET_SERVER, settings.socket_server.as_ref()),
    ] {
        if let Some(ep) = endpoint {
            check_endpoint(name, ep, &mut errors);
        }
    }

    let delivery = &settings.delivery;
    if delivery.max_datagram_bytes == 0 || delivery.max_datagram_bytes > MAX_UDP_PAYLOAD {
        errors.push(ValidationError::new(
            "delivery.max_datagram_bytes",
            format!("must be between 1 and {}", MAX_UDP_PAYLOAD),
        ));
    }
    if delivery.retry_refused && delivery.max_attempts == 0 {
        errors.push(ValidationError::new(
            "delivery.max_attempts",
            "must be at least 1 when retry_refused is set",
        ));
    }

    if settings.paths.storage.as_os_str().is_empty() {
        errors.push(ValidationError::new("paths.storage", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(name: &str, ep: &ServerEndpoint, errors: &mut Vec<ValidationError>) {
    if ep.address.trim().is_empty() {
        errors.push(ValidationError::new(
            format!("{}.address", name),
            "must not be empty",
        ));
    }
    if let Some(alias) = &ep.alias {
        if alias.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{}.alias", name),
                "must not be empty when present",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut settings = Settings::default();
        settings.http_server = Some(ServerEndpoint {
            address: " ".into(),
            port: 3000,
            alias: Some(String::new()),
        });
        settings.delivery.max_datagram_bytes = 0;

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "http_server.address",
                "http_server.alias",
                "delivery.max_datagram_bytes"
            ]
        );
    }

    #[test]
    fn retry_requires_attempts() {
        let mut settings = Settings::default();
        settings.delivery.retry_refused = true;
        settings.delivery.max_attempts = 0;
        assert!(validate_settings(&settings).is_err());
    }
}
