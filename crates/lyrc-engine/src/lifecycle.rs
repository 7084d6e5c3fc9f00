//! Engine lifecycle and request correlation
//!
//! [`EngineLifecycle`] counts connected clients. The first client starts
//! the engine task and the last one to leave shuts it down again, so the
//! transmitter is only held while someone may use it.
//!
//! [`EngineHandle`] is what a connection uses to talk to the engine: each
//! request is turned into a [`Command`], queued, and its result slot awaited
//! under a timeout.

use std::sync::Arc;
use std::time::Duration;

use lyrc_catalog::Catalog;
use lyrc_protocol::{Request, Response};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandSender, EngineMessage};
use crate::engine::{run_engine, EngineConfig};
use crate::hardware::Connector;

/// Reply when the engine cannot take or answer a request
pub const TRANSMITTER_UNAVAILABLE: &str = "transmitter unavailable";
/// Reply when the engine did not answer in time
pub const REQUEST_TIMED_OUT: &str = "timed out waiting for transmitter";

/// Produces the catalog for a new engine
///
/// Called on a blocking thread each time an engine starts.
pub type CatalogSource = Arc<dyn Fn() -> Arc<Catalog> + Send + Sync>;

/// Queue handle given to each client
#[derive(Debug, Clone)]
pub struct EngineHandle {
    queue: CommandSender,
    timeout: Duration,
}

impl EngineHandle {
    /// Wrap an engine queue
    pub fn new(queue: CommandSender, timeout: Duration) -> Self {
        Self { queue, timeout }
    }

    /// Queue a request and wait for its response
    ///
    /// Always returns a response: a closed queue, a dropped result slot and
    /// an expired timeout all become error responses. A timeout never
    /// cancels the command; it may still be executed later.
    pub async fn submit(&self, request: &Request) -> Response {
        let (command, slot) = Command::from_request(request);

        if self.queue.send(EngineMessage::Command(command)).is_err() {
            warn!("Engine queue closed, rejecting '{}'", request.raw());
            return Response::error(request.raw(), TRANSMITTER_UNAVAILABLE);
        }

        match tokio::time::timeout(self.timeout, slot).await {
            Ok(Ok(reply)) => reply.into_response(request.raw()),
            Ok(Err(_)) => {
                debug!("Result slot for '{}' dropped", request.raw());
                Response::error(request.raw(), TRANSMITTER_UNAVAILABLE)
            }
            Err(_) => {
                warn!("Timed out waiting for '{}'", request.raw());
                Response::error(request.raw(), REQUEST_TIMED_OUT)
            }
        }
    }
}

#[derive(Default)]
struct LifecycleInner {
    clients: usize,
    queue: Option<CommandSender>,
    task: Option<JoinHandle<()>>,
}

impl LifecycleInner {
    fn engine_alive(&self) -> bool {
        self.queue.is_some() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn signal_shutdown(&mut self) {
        if let Some(queue) = self.queue.take() {
            // The engine may already be gone
            let _ = queue.send(EngineMessage::Shutdown);
        }
    }
}

/// Reference-counted owner of the engine task
pub struct EngineLifecycle {
    connector: Arc<dyn Connector>,
    config: EngineConfig,
    catalog: CatalogSource,
    inner: Mutex<LifecycleInner>,
}

impl EngineLifecycle {
    /// Create a lifecycle; no engine runs until the first [`acquire`](Self::acquire)
    pub fn new(connector: Arc<dyn Connector>, config: EngineConfig, catalog: CatalogSource) -> Self {
        Self {
            connector,
            config,
            catalog,
            inner: Mutex::new(LifecycleInner::default()),
        }
    }

    /// Register a client, starting the engine if needed
    pub async fn acquire(&self) -> EngineHandle {
        let mut inner = self.inner.lock().await;
        inner.clients += 1;

        let queue = match inner.queue.clone() {
            Some(queue) if inner.engine_alive() => queue,
            _ => {
                // Let the previous engine finish its teardown before a new
                // one touches the hardware
                inner.signal_shutdown();
                if let Some(task) = inner.task.take() {
                    if let Err(e) = task.await {
                        warn!("Previous engine task failed: {}", e);
                    }
                }
                let queue = self.spawn_engine(&mut inner);
                inner.queue = Some(queue.clone());
                queue
            }
        };

        debug!("Client acquired engine ({} client(s))", inner.clients);
        EngineHandle::new(queue, self.config.request_timeout())
    }

    /// Unregister a client, stopping the engine after the last one
    pub async fn release(&self) {
        let mut inner = self.inner.lock().await;
        inner.clients = inner.clients.saturating_sub(1);
        debug!("Client released engine ({} client(s))", inner.clients);

        if inner.clients == 0 {
            info!("Last client gone, stopping transmission engine");
            inner.signal_shutdown();
        }
    }

    /// Number of registered clients
    pub async fn client_count(&self) -> usize {
        self.inner.lock().await.clients
    }

    /// Returns whether an engine task is currently running
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.engine_alive()
    }

    /// Stop the engine regardless of clients and wait for its teardown
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.clients = 0;
        inner.signal_shutdown();
        if let Some(task) = inner.task.take() {
            if let Err(e) = task.await {
                warn!("Engine task failed during shutdown: {}", e);
            }
        }
    }

    fn spawn_engine(&self, inner: &mut LifecycleInner) -> CommandSender {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = self.catalog.clone();
        let connector = self.connector.clone();
        let config = self.config.clone();

        info!("Spawning transmission engine");
        inner.task = Some(tokio::spawn(async move {
            // Catalog sources may read the filesystem
            let catalog = match tokio::task::spawn_blocking(move || source()).await {
                Ok(catalog) => catalog,
                Err(e) => {
                    warn!("Loading the remote catalog failed: {}", e);
                    Arc::new(Catalog::new())
                }
            };
            // Failures are logged by the engine itself
            let _ = run_engine(catalog, connector, config, rx).await;
        }));
        tx
    }
}
