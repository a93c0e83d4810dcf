//! Relay transport between the front door and the ingestion listener.
//!
//! Frames are opaque byte payloads; a zero-length frame is the stop signal.
//! Two transports carry them:
//! - `channel`: an in-process unbounded queue
//! - `udp`: one datagram per frame to the listener's socket address

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::resilience::{is_refused, RetryPolicy};

/// How long a retrying sender waits for an ICMP refusal after a send.
const REFUSAL_PROBE: Duration = Duration::from_millis(50);

/// Error type for relay delivery.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("listener channel is closed")]
    Closed,
    #[error("datagram to {target} failed: {source}")]
    Io {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("listener at {target} refused {attempts} attempts")]
    Refused { target: SocketAddr, attempts: u32 },
}

#[derive(Debug, Clone)]
enum SenderKind {
    Channel(mpsc::UnboundedSender<Vec<u8>>),
    Udp(SocketAddr),
}

/// Sending half of the relay, held by the front door and the supervisor.
#[derive(Debug, Clone)]
pub struct RelaySender {
    kind: SenderKind,
    retry: Option<RetryPolicy>,
}

/// A frame as received by the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    /// Sender address; `None` for in-process frames.
    pub source: Option<SocketAddr>,
}

impl Datagram {
    pub fn is_stop(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Create a connected in-process relay.
pub fn channel() -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RelaySender {
            kind: SenderKind::Channel(tx),
            retry: None,
        },
        RelayReceiver {
            kind: ReceiverKind::Channel(rx),
        },
    )
}

impl RelaySender {
    /// Sender delivering UDP datagrams to `target`.
    pub fn udp(target: SocketAddr) -> Self {
        Self {
            kind: SenderKind::Udp(target),
            retry: None,
        }
    }

    /// Retry refused UDP sends according to `policy`.
    pub fn with_retry(mut self, policy: Option<RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    /// Human-readable destination for logs.
    pub fn target(&self) -> String {
        match &self.kind {
            SenderKind::Channel(_) => "in-process".to_string(),
            SenderKind::Udp(addr) => addr.to_string(),
        }
    }

    /// Deliver one frame.
    pub async fn send(&self, payload: &[u8]) -> Result<(), DeliveryError> {
        match &self.kind {
            SenderKind::Channel(tx) => tx.send(payload.to_vec()).map_err(|_| DeliveryError::Closed),
            SenderKind::Udp(target) => match self.retry {
                None => send_once(*target, payload).await,
                Some(policy) => send_with_retry(*target, payload, policy).await,
            },
        }
    }

    /// Deliver the zero-length stop frame.
    pub async fn send_stop(&self) -> Result<(), DeliveryError> {
        self.send(&[]).await
    }
}

async fn bind_for(target: SocketAddr) -> std::io::Result<UdpSocket> {
    let local: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    UdpSocket::bind(local).await
}

async fn send_once(target: SocketAddr, payload: &[u8]) -> Result<(), DeliveryError> {
    let io = |source| DeliveryError::Io { target, source };
    let socket = bind_for(target).await.map_err(io)?;
    socket.send_to(payload, target).await.map_err(io)?;
    Ok(())
}

/// Send on a connected socket and watch briefly for a refusal; a quiet probe
/// window counts as delivered.
async fn send_with_retry(
    target: SocketAddr,
    payload: &[u8],
    policy: RetryPolicy,
) -> Result<(), DeliveryError> {
    let io = |source| DeliveryError::Io { target, source };
    let mut attempt = 0;

    loop {
        attempt += 1;
        let socket = bind_for(target).await.map_err(io)?;
        socket.connect(target).await.map_err(io)?;

        let outcome = match socket.send(payload).await {
            Ok(_) => {
                let mut probe = [0u8; 1];
                match tokio::time::timeout(REFUSAL_PROBE, socket.recv(&mut probe)).await {
                    Ok(Err(e)) => Err(e),
                    _ => Ok(()),
                }
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => return Ok(()),
            Err(e) if is_refused(&e) => {
                if !policy.should_retry(attempt) {
                    return Err(DeliveryError::Refused {
                        target,
                        attempts: attempt,
                    });
                }
                let delay = policy.backoff();
                tracing::debug!(%target, attempt, delay = ?delay, "Listener refused datagram, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(io(e)),
        }
    }
}

#[derive(Debug)]
enum ReceiverKind {
    Channel(mpsc::UnboundedReceiver<Vec<u8>>),
    Udp(std::net::UdpSocket),
}

/// Receiving half of the relay, owned by the ingestion listener.
///
/// UDP sockets are bound eagerly so bind errors surface at construction, and
/// registered with a runtime only once the listener starts running.
#[derive(Debug)]
pub struct RelayReceiver {
    kind: ReceiverKind,
}

impl RelayReceiver {
    /// Bind a UDP receiver at `addr`.
    pub fn bind_udp(addr: SocketAddr) -> std::io::Result<Self> {
        let socket = std::net::UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            kind: ReceiverKind::Udp(socket),
        })
    }

    /// Bound address of a UDP receiver.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.kind {
            ReceiverKind::Channel(_) => None,
            ReceiverKind::Udp(socket) => socket.local_addr().ok(),
        }
    }

    /// Register with the current runtime. Must be called inside one.
    pub(crate) fn activate(self) -> std::io::Result<ActiveReceiver> {
        Ok(match self.kind {
            ReceiverKind::Channel(rx) => ActiveReceiver::Channel(rx),
            ReceiverKind::Udp(socket) => ActiveReceiver::Udp(UdpSocket::from_std(socket)?),
        })
    }
}

pub(crate) enum ActiveReceiver {
    Channel(mpsc::UnboundedReceiver<Vec<u8>>),
    Udp(UdpSocket),
}

impl ActiveReceiver {
    /// Wait for the next frame. `None` means every in-process sender is gone.
    pub(crate) async fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<Option<Datagram>> {
        match self {
            ActiveReceiver::Channel(rx) => Ok(rx.recv().await.map(|payload| Datagram {
                payload,
                source: None,
            })),
            ActiveReceiver::Udp(socket) => {
                let (len, from) = socket.recv_from(buf).await?;
                Ok(Some(Datagram {
                    payload: buf[..len].to_vec(),
                    source: Some(from),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_delivers_in_order() {
        let (tx, rx) = channel();
        let mut rx = rx.activate().unwrap();

        tx.send(b"a=1").await.unwrap();
        tx.send_stop().await.unwrap();

        let mut buf = [0u8; 16];
        let first = rx.recv(&mut buf).await.unwrap().unwrap();
        assert_eq!(first.payload, b"a=1");
        assert!(!first.is_stop());
        assert!(rx.recv(&mut buf).await.unwrap().unwrap().is_stop());
    }

    #[tokio::test]
    async fn channel_closed_when_senders_dropped() {
        let (tx, rx) = channel();
        let mut rx = rx.activate().unwrap();
        drop(tx);

        let mut buf = [0u8; 16];
        assert!(rx.recv(&mut buf).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn send_on_closed_channel_fails() {
        let (tx, rx) = channel();
        drop(rx);
        assert!(matches!(tx.send(b"x").await, Err(DeliveryError::Closed)));
    }

    #[tokio::test]
    async fn udp_round_trip_including_stop() {
        let rx = RelayReceiver::bind_udp("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = rx.local_addr().unwrap();
        let mut rx = rx.activate().unwrap();
        let tx = RelaySender::udp(addr);

        tx.send(b"name=Alice").await.unwrap();
        let mut buf = [0u8; 1024];
        let frame = rx.recv(&mut buf).await.unwrap().unwrap();
        assert_eq!(frame.payload, b"name=Alice");
        assert!(frame.source.is_some());

        tx.send_stop().await.unwrap();
        assert!(rx.recv(&mut buf).await.unwrap().unwrap().is_stop());
    }

    #[tokio::test]
    async fn retrying_sender_delivers_to_live_listener() {
        let rx = RelayReceiver::bind_udp("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = rx.local_addr().unwrap();
        let mut rx = rx.activate().unwrap();
        let tx = RelaySender::udp(addr)
            .with_retry(Some(RetryPolicy::new(2, Duration::from_millis(10))));

        tx.send(b"a=1").await.unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(rx.recv(&mut buf).await.unwrap().unwrap().payload, b"a=1");
    }
}
