//! Process supervisor.
//!
//! Starts the components, waits, and shuts them down in order:
//!
//! ```text
//! Ctrl+C ──▶ GET /shutdown ──▶ front door: stop frame + clear running flag
//!                                   │
//!                                   ▼
//!                       ingestion listener exits
//! ```
//!
//! If the front door ends without having relayed the stop frame, the
//! supervisor sends it itself so the listener is never left running.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;

use crate::config::{ConfigError, ServerEndpoint, Settings, TransportKind};
use crate::http::server::{FrontDoorError, FrontDoorHandle, FrontDoorServer};
use crate::ingest::listener::{IngestionListener, ListenerHandle, ListenerSetupError};
use crate::lifecycle::shutdown::request_remote_shutdown;
use crate::lifecycle::signals;
use crate::lifecycle::startup::{ComponentHandle, RuntimeError};
use crate::net::datagram::{self, RelaySender};
use crate::resilience::RetryPolicy;

/// Which components this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Role {
    /// Front door and ingestion listener together.
    #[default]
    All,
    /// Only the HTTP front door; the listener runs elsewhere.
    FrontDoor,
    /// Only the ingestion listener.
    Listener,
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    FrontDoor(#[from] FrontDoorError),
    #[error(transparent)]
    Listener(#[from] ListenerSetupError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("role {0:?} needs the udp transport")]
    RoleNeedsUdp(Role),
}

/// Components built from settings but not yet started.
pub struct Assembly {
    pub relay: RelaySender,
    pub front_door: Option<FrontDoorServer>,
    pub listener: Option<IngestionListener>,
}

/// Build the relay and the components `role` asks for.
pub fn assemble(settings: &Settings, role: Role) -> Result<Assembly, SupervisorError> {
    let (relay, listener) = match settings.transport {
        TransportKind::Channel => {
            if role != Role::All {
                return Err(SupervisorError::RoleNeedsUdp(role));
            }
            let (tx, rx) = datagram::channel();
            (tx, Some(IngestionListener::with_receiver(settings, rx)))
        }
        TransportKind::Udp => {
            let listener = match role {
                Role::FrontDoor => None,
                Role::All | Role::Listener => Some(IngestionListener::bind_udp(settings)?),
            };
            let target = match listener.as_ref().and_then(IngestionListener::local_addr) {
                Some(bound) => reachable(bound),
                None => settings.socket_endpoint()?.socket_addr()?,
            };
            let relay = RelaySender::udp(target)
                .with_retry(RetryPolicy::from_config(&settings.delivery));
            (relay, listener)
        }
    };

    let front_door = match role {
        Role::Listener => None,
        Role::All | Role::FrontDoor => Some(FrontDoorServer::bind(settings, relay.clone())?),
    };

    Ok(Assembly {
        relay,
        front_door,
        listener,
    })
}

/// Loopback in place of a wildcard bind address.
fn reachable(mut addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        let loopback: IpAddr = match addr {
            SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
            SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
        };
        addr.set_ip(loopback);
    }
    addr
}

async fn stopped<T: Send + 'static>(handle: &mut Option<ComponentHandle<T>>) {
    match handle {
        Some(h) => h.stopped().await,
        None => std::future::pending().await,
    }
}

/// What started the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Interrupt,
    Stopped,
}

/// Wait for `interrupt` or for the primary component (the front door when
/// present, else the listener) to stop.
///
/// An interrupt is forwarded as `GET /shutdown` to `http` when one is
/// configured.
async fn until_triggered<F, L>(
    front: &mut Option<ComponentHandle<F>>,
    listener: &mut Option<ComponentHandle<L>>,
    http: Option<&ServerEndpoint>,
    interrupt: impl Future<Output = ()>,
) -> Trigger
where
    F: Send + 'static,
    L: Send + 'static,
{
    let has_front = front.is_some();
    tokio::select! {
        _ = interrupt => {
            tracing::info!("Program finished by user");
            if let Some(http) = http {
                if !request_remote_shutdown(http).await {
                    tracing::warn!("Front door did not acknowledge shutdown");
                }
            }
            Trigger::Interrupt
        }
        _ = stopped(front), if has_front => Trigger::Stopped,
        _ = stopped(listener), if !has_front => Trigger::Stopped,
    }
}

/// Wait for the front door, then make sure the listener stops too.
///
/// If the listener is still running once the front door is gone, the stop
/// frame is sent from here.
async fn drain<F, L>(
    front: &mut Option<ComponentHandle<F>>,
    listener: &mut Option<ComponentHandle<L>>,
    relay: &RelaySender,
) where
    F: Send + 'static,
    L: Send + 'static,
{
    if let Some(handle) = front.as_mut() {
        handle.stopped().await;
    }
    if let Some(handle) = listener.as_mut() {
        if !handle.is_finished() {
            if let Err(e) = relay.send_stop().await {
                tracing::debug!(error = %e, "Fallback stop signal not delivered");
            }
        }
        handle.stopped().await;
    }
}

/// Run the configured components until they shut down.
///
/// `http_server` is required whenever this process runs the front door. A
/// listener-only process without it still stops on Ctrl+C, sending the stop
/// frame to its own socket.
pub async fn run(settings: Settings, role: Role) -> Result<(), SupervisorError> {
    let http = settings.http_server.clone();
    let Assembly {
        relay,
        front_door,
        listener,
    } = assemble(&settings, role)?;

    // Listener first so nothing the front door relays is dropped at startup.
    let mut listener: Option<ListenerHandle> = listener.map(IngestionListener::spawn).transpose()?;
    let mut front: Option<FrontDoorHandle> = front_door.map(FrontDoorServer::spawn).transpose()?;
    tracing::info!(role = ?role, transport = ?settings.transport, "Components started");

    let trigger = until_triggered(&mut front, &mut listener, http.as_ref(), signals::interrupt()).await;
    tracing::debug!(trigger = ?trigger, "Shutting down components");

    tokio::select! {
        _ = drain(&mut front, &mut listener, &relay) => {}
        _ = signals::interrupt() => {
            tracing::warn!("Second interrupt, exiting without waiting for components");
            return Ok(());
        }
    }

    if let Some(handle) = front {
        match handle.join().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Front door failed"),
            Err(e) => tracing::error!(error = %e, "Front door thread failed"),
        }
    }
    if let Some(handle) = listener {
        match handle.join().await {
            Ok(Ok(stats)) => tracing::info!(
                stored = stats.stored,
                rejected = stats.rejected,
                failed = stats.failed,
                "Ingestion summary"
            ),
            Ok(Err(e)) => tracing::error!(error = %e, "Ingestion listener failed"),
            Err(e) => tracing::error!(error = %e, "Ingestion listener thread failed"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
