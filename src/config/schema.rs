//! Configuration schema definitions.
//!
//! Mirrors the on-disk settings file. The two server sections are the
//! connection settings shared by both components; everything else is optional
//! and falls back to defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;

/// Name of the HTTP front door section.
pub const HTTP_SERVER: &str = "http_server";

/// Name of the ingestion listener section.
pub const SOCKET_SERVER: &str = "socket_server";

/// Root settings for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// HTTP front door endpoint.
    pub http_server: Option<ServerEndpoint>,

    /// Ingestion listener endpoint.
    pub socket_server: Option<ServerEndpoint>,

    /// How the front door reaches the listener.
    pub transport: TransportKind,

    /// Delivery behaviour for relayed submissions.
    pub delivery: DeliveryConfig,

    /// Filesystem locations.
    pub paths: PathsConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Settings {
    /// Look up a server section by its settings name.
    pub fn endpoint(&self, server: &str) -> Result<&ServerEndpoint, ConfigError> {
        let found = match server {
            HTTP_SERVER => self.http_server.as_ref(),
            SOCKET_SERVER => self.socket_server.as_ref(),
            _ => None,
        };
        found.ok_or_else(|| ConfigError::MissingServer(server.to_string()))
    }

    pub fn http_endpoint(&self) -> Result<&ServerEndpoint, ConfigError> {
        self.endpoint(HTTP_SERVER)
    }

    pub fn socket_endpoint(&self) -> Result<&ServerEndpoint, ConfigError> {
        self.endpoint(SOCKET_SERVER)
    }
}

/// Network endpoint of one server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerEndpoint {
    /// Bind address (e.g., "0.0.0.0" or "localhost").
    pub address: String,

    /// Port number.
    pub port: u16,

    /// Public name clients use to reach the server, if different from the
    /// bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ServerEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            alias: None,
        }
    }

    /// Host clients should connect to: the alias when set, else the address.
    pub fn public_host(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.address)
    }

    /// Resolve the bind address to a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ConfigError::Resolve(format!("{}:{}", self.address, self.port), e))?
            .next()
            .ok_or_else(|| {
                ConfigError::Resolve(
                    format!("{}:{}", self.address, self.port),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
                )
            })
    }
}

/// Relay transport between the front door and the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-process queue; both components must live in the same process.
    #[default]
    Channel,
    /// Loopback or remote UDP datagrams to `socket_server`.
    Udp,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" => Ok(Self::Channel),
            "udp" => Ok(Self::Udp),
            other => Err(format!("unknown transport: {}", other)),
        }
    }
}

/// Delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Largest datagram the listener accepts, in bytes.
    pub max_datagram_bytes: usize,

    /// Retry sends that fail with connection-refused.
    pub retry_refused: bool,

    /// Maximum send attempts when retrying.
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_datagram_bytes: 1024,
            retry_refused: false,
            max_attempts: 10,
            retry_delay_ms: 500,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the pages and static assets.
    pub web_root: PathBuf,

    /// JSON document storing submissions.
    pub storage: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("front"),
            storage: PathBuf::from("storage/data.json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
