// ── Central reactive data store ──
//
// One `watch` channel per value. Every write replaces the whole snapshot,
// so subscribers always see a consistent Configuration or Status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{Configuration, Program, Reply, Status};
use crate::stream::SnapshotStream;

/// Channel lifecycle as seen by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Live device state shared between the session and its observers.
///
/// Readers get cheap `Arc` snapshots. Mutation is crate-private: the only
/// writer is the session engine.
pub struct DataStore {
    configuration: watch::Sender<Arc<Configuration>>,
    status: watch::Sender<Arc<Status>>,
    programs: watch::Sender<Arc<Vec<Program>>>,
    connection: watch::Sender<ConnectionState>,
    last_update: watch::Sender<Option<DateTime<Utc>>>,
    /// Most recent OK/ERR. Every reply notifies, even a repeated one.
    reply: watch::Sender<Arc<Reply>>,
    /// Set once the device has answered `read-config`, empty or not.
    configuration_received: watch::Sender<bool>,
}

impl DataStore {
    pub fn new() -> Self {
        let (configuration, _) = watch::channel(Arc::new(Configuration::default()));
        let (status, _) = watch::channel(Arc::new(Status::default()));
        let (programs, _) = watch::channel(Arc::new(Vec::new()));
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        let (last_update, _) = watch::channel(None);
        let (reply, _) = watch::channel(Arc::new(Reply::default()));
        let (configuration_received, _) = watch::channel(false);

        Self {
            configuration,
            status,
            programs,
            connection,
            last_update,
            reply,
            configuration_received,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn configuration(&self) -> Arc<Configuration> {
        self.configuration.borrow().clone()
    }

    pub fn status(&self) -> Arc<Status> {
        self.status.borrow().clone()
    }

    pub fn programs(&self) -> Arc<Vec<Program>> {
        self.programs.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// When the device last pushed a Configuration, Status or program list.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.borrow()
    }

    /// The device's last OK/ERR reply.
    pub fn last_reply(&self) -> Arc<Reply> {
        self.reply.borrow().clone()
    }

    pub fn configuration_received(&self) -> bool {
        *self.configuration_received.borrow()
    }

    pub fn program_by_name(&self, name: &str) -> Option<Program> {
        self.programs().iter().find(|p| p.name() == name).cloned()
    }

    // ── Drafts ───────────────────────────────────────────────────────
    //
    // Owned deep copies for editing. Nothing in them is shared with the
    // live snapshot; commit through the session's `set_*` operations.

    pub fn draft_configuration(&self) -> Configuration {
        Configuration::clone(&self.configuration())
    }

    pub fn draft_programs(&self) -> Vec<Program> {
        self.programs().to_vec()
    }

    pub fn draft_status(&self) -> Status {
        Status::clone(&self.status())
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_configuration(&self) -> SnapshotStream<Configuration> {
        SnapshotStream::new(self.configuration.subscribe())
    }

    pub fn subscribe_status(&self) -> SnapshotStream<Status> {
        SnapshotStream::new(self.status.subscribe())
    }

    pub fn subscribe_programs(&self) -> SnapshotStream<Vec<Program>> {
        SnapshotStream::new(self.programs.subscribe())
    }

    pub fn subscribe_replies(&self) -> SnapshotStream<Reply> {
        SnapshotStream::new(self.reply.subscribe())
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn subscribe_configuration_received(&self) -> watch::Receiver<bool> {
        self.configuration_received.subscribe()
    }

    // ── Mutation (session only) ──────────────────────────────────────

    pub(crate) fn replace_configuration(&self, configuration: Configuration) {
        self.configuration.send_replace(Arc::new(configuration));
    }

    pub(crate) fn replace_status(&self, status: Status) {
        self.status.send_replace(Arc::new(status));
    }

    pub(crate) fn replace_programs(&self, programs: Vec<Program>) {
        self.programs.send_replace(Arc::new(programs));
    }

    /// Overwrite only the status line, keeping the device's telemetry.
    pub(crate) fn set_status_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.status.send_modify(|status| {
            Arc::make_mut(status).status_text = text;
        });
    }

    pub(crate) fn set_connection(&self, state: ConnectionState) {
        self.connection.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    pub(crate) fn record_reply(&self, reply: Reply) {
        self.reply.send_replace(Arc::new(reply));
    }

    pub(crate) fn mark_configuration_received(&self) {
        self.configuration_received
            .send_if_modified(|received| !std::mem::replace(received, true));
    }

    pub(crate) fn mark_device_update(&self) {
        self.last_update.send_replace(Some(Utc::now()));
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::{PidSettings, Step};

    #[test]
    fn starts_empty_and_disconnected() {
        let store = DataStore::new();
        assert!(store.configuration().is_empty());
        assert_eq!(*store.status(), Status::default());
        assert!(store.programs().is_empty());
        assert_eq!(store.connection_state(), ConnectionState::Disconnected);
        assert!(!store.is_connected());
        assert!(store.last_update().is_none());
    }

    #[test]
    fn status_text_keeps_telemetry() {
        let store = DataStore::new();
        store.replace_status(Status {
            probe_temp: 250.0,
            is_running: true,
            ..Status::default()
        });
        store.set_status_text("Connection closed");

        let status = store.status();
        assert_eq!(status.probe_temp, 250.0);
        assert!(status.is_running);
        assert_eq!(status.status_text, "Connection closed");
    }

    #[test]
    fn held_snapshot_is_not_changed_by_later_writes() {
        let store = DataStore::new();
        let before = store.status();
        store.set_status_text("new");
        assert!(before.status_text.is_empty());
        assert_eq!(store.status().status_text, "new");
    }

    #[test]
    fn drafts_do_not_alias_the_live_value() {
        let store = DataStore::new();
        store.replace_programs(vec![Program::with_step("A", Step::new(0.0, 100.0, 60.0))]);

        let mut draft = store.draft_programs();
        draft[0].set_name("B");
        draft[0].push_step(Step::default());

        assert_eq!(store.programs()[0].name(), "A");
        assert_eq!(store.programs()[0].steps().len(), 1);
        assert_eq!(store.program_by_name("A").unwrap().steps().len(), 1);
        assert!(store.program_by_name("B").is_none());
    }

    #[test]
    fn configuration_and_status_drafts_are_owned_copies() {
        let store = DataStore::new();
        store.replace_configuration(Configuration {
            pid: Some(PidSettings {
                poll: 1000.0,
                kp: 1.5,
                ..PidSettings::default()
            }),
            ..Configuration::default()
        });
        store.replace_status(Status {
            probe_temp: 300.0,
            active_program: Some(Program::named("A")),
            ..Status::default()
        });

        let mut config = store.draft_configuration();
        config.pid.as_mut().unwrap().kp = 9.0;
        config.wifi = Some(crate::model::WifiSettings::default());

        let mut status = store.draft_status();
        status.probe_temp = 0.0;
        status.active_program.as_mut().unwrap().set_name("B");

        let live = store.configuration();
        assert_eq!(live.pid.as_ref().unwrap().kp, 1.5);
        assert!(live.wifi.is_none());

        let live = store.status();
        assert_eq!(live.probe_temp, 300.0);
        assert_eq!(live.active_program.as_ref().unwrap().name(), "A");
    }

    #[tokio::test]
    async fn every_reply_notifies_even_when_repeated() {
        let store = DataStore::new();
        let mut replies = store.subscribe_replies();

        store.record_reply(Reply::ok("stored"));
        assert_eq!(*replies.changed().await.unwrap(), Reply::ok("stored"));

        store.record_reply(Reply::ok("stored"));
        assert_eq!(*replies.changed().await.unwrap(), Reply::ok("stored"));
        assert_eq!(*store.last_reply(), Reply::ok("stored"));
    }

    #[test]
    fn configuration_received_is_set_once() {
        let store = DataStore::new();
        let mut rx = store.subscribe_configuration_received();
        assert!(!store.configuration_received());

        store.mark_configuration_received();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        store.mark_configuration_received();
        assert!(!rx.has_changed().unwrap());
        assert!(store.configuration_received());
    }

    #[tokio::test]
    async fn subscribers_see_wholesale_replacements() {
        let store = DataStore::new();
        let mut configs = store.subscribe_configuration();
        assert!(configs.current().is_empty());

        store.replace_configuration(Configuration {
            programs: Some(vec![Program::named("A")]),
            ..Configuration::default()
        });

        let next = configs.changed().await.unwrap();
        assert_eq!(next.programs.as_ref().unwrap().len(), 1);
        assert_eq!(configs.latest(), next);
    }

    #[test]
    fn repeated_connection_state_does_not_notify() {
        let store = DataStore::new();
        let mut rx = store.subscribe_connection();
        store.set_connection(ConnectionState::Disconnected);
        assert!(!rx.has_changed().unwrap());

        store.set_connection(ConnectionState::Connecting);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connecting);
    }
}
