// ── Controller abstraction ──
//
// Async facade over the session engine. One background task pumps channel
// events into the engine; callers invoke operations from anywhere. A mutex
// serializes the two so every event handler and every operation runs to
// completion on its own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use kilnlink_api::{ChannelEvent, Connector, WsConnector};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{Configuration, Program, Reply, Status};
use crate::session::Session;
use crate::store::{ConnectionState, DataStore};
use crate::stream::SnapshotStream;

/// The main entry point for front ends.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Must be created inside a
/// Tokio runtime. Operations return immediately; watch the store for
/// their effects.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: SessionConfig,
    session: Arc<Mutex<Session>>,
    store: Arc<DataStore>,
    cancel: CancellationToken,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller that talks WebSocket. Does NOT connect; call
    /// [`connect()`](Self::connect).
    pub fn new(config: SessionConfig) -> Self {
        let connector = WsConnector::new(config.redial_delay);
        Self::with_connector(config, connector)
    }

    /// Create a controller on top of any channel implementation.
    pub fn with_connector(config: SessionConfig, connector: impl Connector + 'static) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Session::new(Box::new(connector), events, config.dialect);
        let store = Arc::clone(session.store());
        let session = Arc::new(Mutex::new(session));
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(event_pump(Arc::clone(&session), rx, cancel.clone()));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                session,
                store,
                cancel,
                pump: Mutex::new(Some(pump)),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.inner.session)
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the configured host.
    pub fn connect(&self) {
        self.session().connect(&self.inner.config.host);
    }

    pub fn connect_to(&self, host: &str) {
        self.session().connect(host);
    }

    pub fn disconnect(&self) {
        self.session().disconnect();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.store.connection_state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.store.is_connected()
    }

    /// Disconnect and stop the event pump.
    pub async fn shutdown(&self) {
        self.disconnect();
        self.inner.cancel.cancel();

        let handle = lock(&self.inner.pump).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        debug!("controller shut down");
    }

    // ── Session operations ───────────────────────────────────────────

    pub fn configuration(&self) -> Arc<Configuration> {
        self.inner.store.configuration()
    }

    pub fn set_configuration(&self, configuration: Configuration) {
        self.session().set_configuration(configuration);
    }

    pub fn programs(&self) -> Arc<Vec<Program>> {
        self.inner.store.programs()
    }

    pub fn set_programs(&self, programs: Vec<Program>) {
        self.session().set_programs(programs);
    }

    pub fn status(&self) -> Arc<Status> {
        self.inner.store.status()
    }

    pub fn select_active_program(&self, name: &str) {
        self.session().select_active_program(name);
    }

    /// Select by position in the local program list.
    pub fn select_program_by_index(&self, index: usize) -> Result<(), CoreError> {
        let programs = self.programs();
        let program = programs.get(index).ok_or_else(|| CoreError::ProgramNotFound {
            name: format!("#{index}"),
        })?;
        self.select_active_program(program.name());
        Ok(())
    }

    pub fn save_configuration(&self) {
        self.session().save_configuration();
    }

    pub fn save_programs(&self) {
        self.session().save_programs();
    }

    pub fn start_stop(&self) {
        self.session().start_stop();
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn configuration_stream(&self) -> SnapshotStream<Configuration> {
        self.inner.store.subscribe_configuration()
    }

    pub fn status_stream(&self) -> SnapshotStream<Status> {
        self.inner.store.subscribe_status()
    }

    pub fn programs_stream(&self) -> SnapshotStream<Vec<Program>> {
        self.inner.store.subscribe_programs()
    }

    pub fn reply_stream(&self) -> SnapshotStream<Reply> {
        self.inner.store.subscribe_replies()
    }

    // ── Waiting helpers ──────────────────────────────────────────────

    /// Wait until the channel reports open.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut rx = self.inner.store.subscribe_connection();
        let reached = tokio::time::timeout(timeout, async {
            rx.wait_for(|state| *state == ConnectionState::Connected)
                .await
                .map(|_| ())
        })
        .await;

        match reached {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(CoreError::ControllerDisconnected),
            Err(_) => Err(CoreError::timeout(timeout)),
        }
    }

    /// The device's Configuration, waiting for the bootstrap read if the
    /// device has not answered it yet. An empty Configuration is a valid
    /// answer.
    pub async fn wait_for_configuration(
        &self,
        timeout: Duration,
    ) -> Result<Arc<Configuration>, CoreError> {
        let mut rx = self.inner.store.subscribe_configuration_received();
        let received = tokio::time::timeout(timeout, async {
            rx.wait_for(|received| *received).await.map(|_| ())
        })
        .await;

        match received {
            Ok(Ok(())) => Ok(self.configuration()),
            Ok(Err(_)) => Err(CoreError::ControllerDisconnected),
            Err(_) => Err(CoreError::timeout(timeout)),
        }
    }

    /// Run `op`, then wait for the device's next OK or ERR reply. Status
    /// pushes in between are not replies and are skipped. Subscribing
    /// first means a fast reply is not missed.
    pub async fn call_and_wait_reply<F>(
        &self,
        timeout: Duration,
        op: F,
    ) -> Result<Arc<Reply>, CoreError>
    where
        F: FnOnce(&Self),
    {
        let mut replies = self.reply_stream();
        op(self);
        replies.changed_within(timeout).await
    }

    /// Run `op`, then wait for a Status push that satisfies `accept`.
    /// For commands the device answers with telemetry rather than a reply.
    pub async fn call_and_wait_status<F, P>(
        &self,
        timeout: Duration,
        op: F,
        accept: P,
    ) -> Result<Arc<Status>, CoreError>
    where
        F: FnOnce(&Self),
        P: Fn(&Status) -> bool,
    {
        let mut stream = self.status_stream();
        op(self);
        let wait = async {
            loop {
                match stream.changed().await {
                    Some(status) if accept(&status) => return Ok(status),
                    Some(_) => {}
                    None => return Err(CoreError::ControllerDisconnected),
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| Err(CoreError::timeout(timeout)))
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Background tasks ─────────────────────────────────────────────────

/// Feed channel events into the session in delivery order.
async fn event_pump(
    session: Arc<Mutex<Session>>,
    mut rx: mpsc::UnboundedReceiver<ChannelEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                lock(&session).handle_event(event);
            }
        }
    }
    debug!("event pump stopped");
}
