//! HTTP front door.
//!
//! # Responsibilities
//! - Create the Axum Router and wire up middleware (request ID, tracing, body limit)
//! - Serve the fixed pages and static files
//! - Relay POST bodies to the ingestion listener
//! - Stop on `/shutdown`, relaying the stop frame first
//!
//! Connections are served strictly one after another with keep-alive off, so
//! each accept handles exactly one request and the running flag is checked
//! between requests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper::server::conn::http1;
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use thiserror::Error;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::{ConfigError, Settings};
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::{redirect_home, serve_static, Pages};
use crate::lifecycle::shutdown::{RunningFlag, SHUTDOWN_PATH};
use crate::lifecycle::startup::{spawn_component, ComponentHandle, RuntimeError};
use crate::net::datagram::RelaySender;
use crate::net::listener::{Listener, ListenerError};

#[derive(Error, Debug)]
pub enum FrontDoorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<Pages>,
    pub web_root: Arc<PathBuf>,
    pub relay: RelaySender,
    pub running: RunningFlag,
    pub max_body_bytes: usize,
}

/// The HTTP front door.
pub struct FrontDoorServer {
    listener: Listener,
    router: Router,
    running: RunningFlag,
    local_addr: SocketAddr,
}

pub type FrontDoorHandle = ComponentHandle<Result<(), FrontDoorError>>;

impl FrontDoorServer {
    /// Bind the `http_server` endpoint and build the router.
    ///
    /// Pages are read from the configured web root now; static files are
    /// looked up per request.
    pub fn bind(settings: &Settings, relay: RelaySender) -> Result<Self, FrontDoorError> {
        let addr = settings.http_endpoint()?.socket_addr()?;
        let listener = Listener::bind(addr)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        let web_root = settings.paths.web_root.clone();
        let running = RunningFlag::new();
        let state = AppState {
            pages: Arc::new(Pages::load(&web_root)),
            web_root: Arc::new(web_root),
            relay,
            running: running.clone(),
            max_body_bytes: settings.delivery.max_datagram_bytes,
        };

        Ok(Self {
            listener,
            router: Self::build_router(state),
            running,
            local_addr,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let max_body = state.max_body_bytes;
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(max_body))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag cleared by the shutdown route.
    pub fn running(&self) -> RunningFlag {
        self.running.clone()
    }

    /// Start the request loop on a dedicated thread.
    pub fn spawn(self) -> Result<FrontDoorHandle, RuntimeError> {
        spawn_component("front-door", move || self.run())
    }

    /// Serve requests until the running flag is cleared.
    pub async fn run(self) -> Result<(), FrontDoorError> {
        let listener = self.listener.activate()?;
        tracing::info!(address = %self.local_addr, "HTTP server starting");

        while self.running.is_running() {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
            };

            let service = TowerToHyperService::new(self.router.clone());
            let connection = http1::Builder::new()
                .keep_alive(false)
                .serve_connection(TokioIo::new(stream), service);

            if let Err(e) = connection
                .instrument(tracing::debug_span!("connection", peer = %peer))
                .await
            {
                tracing::debug!(peer = %peer, error = %e, "Connection ended with error");
            }
        }

        tracing::info!(address = %self.local_addr, "HTTP server stopped by handler");
        Ok(())
    }
}

/// Route a request by method and path.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Handling request");

    match (&method, path.as_str()) {
        (&Method::GET, "/") => state.pages.index(),
        (&Method::GET, "/message") => state.pages.message(),
        (&Method::GET, SHUTDOWN_PATH) => shutdown(&state, &request_id).await,
        (&Method::GET, _) => match serve_static(&state.web_root, &path).await {
            Some(response) => response,
            None => {
                tracing::debug!(request_id = %request_id, path = %path, "Not found");
                state.pages.not_found()
            }
        },
        (&Method::POST, _) => relay_submission(&state, &request_id, request).await,
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, POST")],
        )
            .into_response(),
    }
}

/// Forward the body verbatim as one frame and redirect home.
///
/// Delivery failures are logged; the browser still gets its redirect.
async fn relay_submission(state: &AppState, request_id: &str, request: Request<Body>) -> Response {
    let body = match axum::body::to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, limit = state.max_body_bytes, "Submission body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Submission too large\n").into_response();
        }
    };

    if body.is_empty() {
        // An empty frame is the stop signal; never relay one from a form.
        tracing::warn!(request_id = %request_id, "Empty submission not relayed");
        return redirect_home();
    }

    match state.relay.send(&body).await {
        Ok(()) => tracing::info!(
            request_id = %request_id,
            target = %state.relay.target(),
            bytes = body.len(),
            "Sent data"
        ),
        Err(e) => tracing::warn!(
            request_id = %request_id,
            target = %state.relay.target(),
            error = %e,
            "Failed to relay submission"
        ),
    }
    redirect_home()
}

async fn shutdown(state: &AppState, request_id: &str) -> Response {
    if let Err(e) = state.relay.send_stop().await {
        tracing::warn!(request_id = %request_id, error = %e, "Stop signal not delivered");
    }
    if state.running.stop() {
        tracing::info!(request_id = %request_id, "Shutdown requested");
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "Shutting down\n",
    )
        .into_response()
}
