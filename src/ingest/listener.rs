//! Ingestion listener: receive loop, decoding and persistence.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::config::{ConfigError, Settings};
use crate::ingest::form::{decode_form, IngestFormatError};
use crate::lifecycle::startup::{spawn_component, ComponentHandle, RuntimeError};
use crate::net::datagram::RelayReceiver;
use crate::resilience::ErrorBackoff;
use crate::storage::{JsonStore, PersistenceError, Timestamper};

/// Listener lifecycle.
///
/// `Idle → Listening → Persisting → Listening → … → Stopped`; `Stopped` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
    Persisting,
    Stopped,
}

/// Per-run message counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records written to the store.
    pub stored: u64,
    /// Payloads that were not valid form encoding or exceeded the size limit.
    pub rejected: u64,
    /// Records that could not be persisted.
    pub failed: u64,
}

#[derive(Error, Debug)]
pub enum ListenerSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

const RECEIVE_BACKOFF_BASE: Duration = Duration::from_millis(50);
const RECEIVE_BACKOFF_MAX: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
enum IngestError {
    #[error(transparent)]
    Format(#[from] IngestFormatError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Receives relayed submissions and writes them to the store.
pub struct IngestionListener {
    receiver: RelayReceiver,
    store: JsonStore,
    timestamper: Timestamper,
    max_datagram_bytes: usize,
    state: watch::Sender<ListenerState>,
}

pub type ListenerHandle = ComponentHandle<std::io::Result<IngestStats>>;

impl IngestionListener {
    pub fn new(
        receiver: RelayReceiver,
        store: JsonStore,
        timestamper: Timestamper,
        max_datagram_bytes: usize,
    ) -> Self {
        let (state, _) = watch::channel(ListenerState::Idle);
        Self {
            receiver,
            store,
            timestamper,
            max_datagram_bytes,
            state,
        }
    }

    /// Listener bound to the `socket_server` UDP endpoint.
    pub fn bind_udp(settings: &Settings) -> Result<Self, ListenerSetupError> {
        let addr = settings.socket_endpoint()?.socket_addr()?;
        let receiver = RelayReceiver::bind_udp(addr)
            .map_err(|source| ListenerSetupError::Bind { addr, source })?;
        Ok(Self::with_receiver(settings, receiver))
    }

    /// Listener fed by an existing receiver, with store and limits from settings.
    pub fn with_receiver(settings: &Settings, receiver: RelayReceiver) -> Self {
        Self::new(
            receiver,
            JsonStore::new(&settings.paths.storage),
            Timestamper::default(),
            settings.delivery.max_datagram_bytes,
        )
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Bound UDP address, if the listener uses UDP.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.local_addr()
    }

    /// Start the receive loop on a dedicated thread.
    pub fn spawn(self) -> Result<ListenerHandle, RuntimeError> {
        spawn_component("ingestion-listener", move || self.run())
    }

    /// Receive until the stop signal arrives.
    ///
    /// Malformed payloads and store failures are logged and skipped; only a
    /// transport setup failure ends the loop early.
    pub async fn run(self) -> std::io::Result<IngestStats> {
        let Self {
            receiver,
            store,
            mut timestamper,
            max_datagram_bytes,
            state,
        } = self;

        let label = receiver
            .local_addr()
            .map_or_else(|| "in-process".to_string(), |a| a.to_string());
        let mut source = receiver.activate()?;
        // One spare byte so an oversized datagram is detected instead of truncated.
        let mut buf = vec![0u8; max_datagram_bytes + 1];
        let mut stats = IngestStats::default();
        let mut backoff = ErrorBackoff::new(RECEIVE_BACKOFF_BASE, RECEIVE_BACKOFF_MAX);

        state.send_replace(ListenerState::Listening);
        tracing::info!(address = %label, store = %store.path().display(), "Ingestion listener started");

        loop {
            let datagram = match source.recv(&mut buf).await {
                Ok(Some(datagram)) => datagram,
                Ok(None) => {
                    tracing::info!(address = %label, "Relay closed, stopping listener");
                    break;
                }
                Err(e) => {
                    let pause = backoff.on_failure();
                    tracing::warn!(
                        address = %label,
                        error = %e,
                        failures = backoff.failures(),
                        pause = ?pause,
                        "Receive failed"
                    );
                    tokio::time::sleep(pause).await;
                    continue;
                }
            };
            backoff.reset();
            let peer = datagram
                .source
                .map_or_else(|| "in-process".to_string(), |a| a.to_string());

            if datagram.is_stop() {
                tracing::info!(address = %label, peer = %peer, "Socket server stopped by stop signal");
                break;
            }

            if datagram.payload.len() > max_datagram_bytes {
                stats.rejected += 1;
                tracing::warn!(
                    peer = %peer,
                    bytes = datagram.payload.len(),
                    limit = max_datagram_bytes,
                    "Rejected oversized submission"
                );
                continue;
            }

            tracing::debug!(
                peer = %peer,
                bytes = datagram.payload.len(),
                data = %String::from_utf8_lossy(&datagram.payload),
                "Received data"
            );

            state.send_replace(ListenerState::Persisting);
            match ingest(&store, &mut timestamper, &datagram.payload).await {
                Ok(key) => {
                    stats.stored += 1;
                    tracing::info!(peer = %peer, key = %key, store = %store.path().display(), "Wrote data to file");
                }
                Err(IngestError::Format(e)) => {
                    stats.rejected += 1;
                    tracing::warn!(peer = %peer, error = %e, "Rejected malformed submission");
                }
                Err(IngestError::Persistence(e)) => {
                    stats.failed += 1;
                    tracing::error!(peer = %peer, error = %e, "Failed to persist submission");
                }
            }
            state.send_replace(ListenerState::Listening);
        }

        state.send_replace(ListenerState::Stopped);
        tracing::info!(
            stored = stats.stored,
            rejected = stats.rejected,
            failed = stats.failed,
            "Ingestion listener stopped"
        );
        Ok(stats)
    }
}

async fn ingest(
    store: &JsonStore,
    timestamper: &mut Timestamper,
    payload: &[u8],
) -> Result<String, IngestError> {
    let record = decode_form(payload)?;
    let key = store.append(&timestamper.next_key(), &record).await?;
    timestamper.advance_past(&key);
    Ok(key)
}
