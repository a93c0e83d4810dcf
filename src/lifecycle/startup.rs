//! Component threads.
//!
//! Each long-running component owns one OS thread driving a current-thread
//! runtime, so its loop is sequential and shares no executor with the other.

use std::future::Future;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::Instrument;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build runtime for {name}: {source}")]
    Runtime {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

type Outcome<T> = Result<T, RuntimeError>;

/// Handle to a component running on its own thread.
pub struct ComponentHandle<T> {
    name: &'static str,
    done: Option<oneshot::Receiver<Outcome<T>>>,
    outcome: Option<Outcome<T>>,
    thread: Option<JoinHandle<()>>,
}

/// Run the future built by `make` on a new named thread with its own runtime.
///
/// The future itself need not be `Send`; only the factory crosses threads.
pub fn spawn_component<F, Fut, T>(
    name: &'static str,
    make: F,
) -> Result<ComponentHandle<T>, RuntimeError>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    let thread = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(source) => {
                    let _ = tx.send(Err(RuntimeError::Runtime { name, source }));
                    return;
                }
            };

            let span = tracing::info_span!("component", name);
            let value = runtime.block_on(make().instrument(span));
            let _ = tx.send(Ok(value));
        })
        .map_err(|source| RuntimeError::Spawn { name, source })?;

    tracing::debug!(component = name, "Component thread started");

    Ok(ComponentHandle {
        name,
        done: Some(rx),
        outcome: None,
        thread: Some(thread),
    })
}

impl<T: Send + 'static> ComponentHandle<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the component's thread has exited.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some() || self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the component to stop. Safe to cancel and call again.
    pub async fn stopped(&mut self) {
        if let Some(rx) = self.done.as_mut() {
            let outcome = rx.await.unwrap_or(Err(RuntimeError::Panicked(self.name)));
            self.outcome = Some(outcome);
            self.done = None;
        }
    }

    /// Wait for the component to stop and collect its result.
    pub async fn join(mut self) -> Result<T, RuntimeError> {
        self.stopped().await;

        if let Some(thread) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                return Err(RuntimeError::Panicked(self.name));
            }
        }

        self.outcome
            .take()
            .unwrap_or(Err(RuntimeError::Panicked(self.name)))
    }
}
