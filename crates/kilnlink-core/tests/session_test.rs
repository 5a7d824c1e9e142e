#![allow(clippy::unwrap_used, clippy::float_cmp)]
// State machine tests for `Session`, driven by a scripted connector.
//
// The mock never talks to a network: tests decide when a channel opens,
// what it receives and when it closes, then inspect what was sent.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use url::Url;

use kilnlink_api::protocol::{WireConfiguration, WirePid, WireProgram, WireStatus, WireStep};
use kilnlink_api::{
    Channel, ChannelEvent, ChannelEventKind, ChannelId, CloseInfo, CommandId, Connector, Dialect,
    OpenRequest, Request, Response,
};
use kilnlink_core::session::{
    DEFAULT_ERR_DETAILS, DEFAULT_OK_DETAILS, MALFORMED_STATUS, NO_PROGRAM_SELECTED,
};
use kilnlink_core::{Configuration, ConnectionState, PidSettings, Program, Reply, Session, Step};

// ── Scripted connector ──────────────────────────────────────────────

#[derive(Debug, Clone)]
struct OpenRecord {
    url: Url,
    channel: ChannelId,
    reconnect: bool,
}

#[derive(Default)]
struct Wire {
    opens: Vec<OpenRecord>,
    open_channels: Vec<ChannelId>,
    closed: Vec<ChannelId>,
    sent: Vec<String>,
}

#[derive(Clone, Default)]
struct MockConnector {
    wire: Arc<Mutex<Wire>>,
}

impl Connector for MockConnector {
    fn open(&mut self, request: OpenRequest) -> Box<dyn Channel> {
        self.wire.lock().unwrap().opens.push(OpenRecord {
            url: request.url,
            channel: request.channel,
            reconnect: request.reconnect,
        });
        Box::new(MockChannel {
            id: request.channel,
            wire: Arc::clone(&self.wire),
        })
    }
}

struct MockChannel {
    id: ChannelId,
    wire: Arc<Mutex<Wire>>,
}

impl Channel for MockChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.wire.lock().unwrap().open_channels.contains(&self.id)
    }

    fn send(&mut self, text: String) -> bool {
        if !self.is_open() {
            return false;
        }
        self.wire.lock().unwrap().sent.push(text);
        true
    }

    fn close(&mut self) {
        let mut wire = self.wire.lock().unwrap();
        wire.open_channels.retain(|id| *id != self.id);
        wire.closed.push(self.id);
    }
}

// ── Harness ─────────────────────────────────────────────────────────

const HOST: &str = "kiln.local";

struct Harness {
    session: Session,
    wire: Arc<Mutex<Wire>>,
    _events: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_dialect(Dialect::Canonical)
    }

    fn with_dialect(dialect: Dialect) -> Self {
        let connector = MockConnector::default();
        let wire = Arc::clone(&connector.wire);
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(Box::new(connector), tx, dialect),
            wire,
            _events: rx,
        }
    }

    /// Id of the most recently opened channel.
    fn current(&self) -> ChannelId {
        self.wire.lock().unwrap().opens.last().unwrap().channel
    }

    fn open_count(&self) -> usize {
        self.wire.lock().unwrap().opens.len()
    }

    /// Connect and complete the handshake, then forget the bootstrap request.
    fn connected() -> Self {
        let mut h = Self::new();
        h.session.connect(HOST);
        h.complete_handshake();
        h.take_sent();
        h
    }

    fn complete_handshake(&mut self) {
        let id = self.current();
        self.wire.lock().unwrap().open_channels.push(id);
        self.deliver(ChannelEventKind::Opened);
    }

    fn deliver(&mut self, kind: ChannelEventKind) {
        let event = ChannelEvent::new(self.current(), kind);
        self.session.handle_event(event);
    }

    fn receive(&mut self, response: &Response) {
        let text = response.encode(Dialect::Canonical).unwrap();
        self.deliver(ChannelEventKind::Message(text));
    }

    fn receive_text(&mut self, text: &str) {
        self.deliver(ChannelEventKind::Message(text.to_owned()));
    }

    /// Drop the transport underneath the session, as the device would.
    fn drop_transport(&mut self, close: CloseInfo) {
        let id = self.current();
        self.wire.lock().unwrap().open_channels.retain(|c| *c != id);
        self.deliver(ChannelEventKind::Closed(close));
    }

    fn take_sent(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.wire.lock().unwrap().sent)
            .iter()
            .map(|text| Request::decode(text).unwrap())
            .collect()
    }

    fn take_sent_raw(&mut self) -> Vec<String> {
        std::mem::take(&mut self.wire.lock().unwrap().sent)
    }

    fn status_text(&self) -> String {
        self.session.store().status().status_text.clone()
    }

    fn state(&self) -> ConnectionState {
        self.session.store().connection_state()
    }
}

fn ids(requests: &[Request]) -> Vec<CommandId> {
    requests.iter().map(Request::id).collect()
}

fn wire_config() -> WireConfiguration {
    WireConfiguration {
        pid: Some(WirePid {
            poll: 1000.0,
            kp: 2.5,
            ki: 0.1,
            kd: 4.0,
            tolerance: Some(0.5),
        }),
        ..WireConfiguration::default()
    }
}

fn wire_programs() -> Vec<WireProgram> {
    vec![
        WireProgram {
            name: Some("Bisque".into()),
            steps: Some(vec![WireStep {
                t_start: 20.0,
                t_end: 950.0,
                duration: 28_800.0,
            }]),
        },
        WireProgram {
            name: Some("Glaze".into()),
            steps: None,
        },
    ]
}

fn status_push(active: Option<&str>, running: bool) -> Response {
    Response::status(WireStatus {
        probe_temp: 400.0,
        is_running: running,
        status_text: if running { "Running" } else { "Idle" }.into(),
        active_program: active.map(|name| WireProgram {
            name: Some(name.into()),
            steps: None,
        }),
        ..WireStatus::default()
    })
}

// ── Connection lifecycle ────────────────────────────────────────────

#[test]
fn connect_opens_one_channel_and_is_idempotent() {
    let mut h = Harness::new();
    assert_eq!(h.state(), ConnectionState::Disconnected);

    h.session.connect(HOST);
    assert_eq!(h.state(), ConnectionState::Connecting);
    assert_eq!(h.session.address(), Some(HOST));

    h.session.connect(HOST);
    h.session.connect("other.local");

    let opens = h.wire.lock().unwrap().opens.clone();
    assert_eq!(opens.len(), 1);
    assert_eq!(opens[0].url.as_str(), "ws://kiln.local/ws");
    assert!(!opens[0].reconnect);
}

#[test]
fn open_event_connects_and_requests_configuration() {
    let mut h = Harness::new();
    h.session.connect(HOST);
    h.complete_handshake();

    assert_eq!(h.state(), ConnectionState::Connected);
    assert!(h.session.is_connected());
    assert_eq!(ids(&h.take_sent()), vec![CommandId::ReadConfig]);
}

#[test]
fn invalid_address_stays_disconnected() {
    let mut h = Harness::new();
    h.session.connect("");

    assert_eq!(h.open_count(), 0);
    assert_eq!(h.state(), ConnectionState::Disconnected);
    assert!(h.status_text().starts_with("Invalid device address"));
    assert!(h.session.address().is_none());
}

#[test]
fn unsolicited_close_reconnects_exactly_once_to_the_same_address() {
    let mut h = Harness::connected();
    let first = h.current();

    h.drop_transport(CloseInfo::abnormal());

    let opens = h.wire.lock().unwrap().opens.clone();
    assert_eq!(opens.len(), 2);
    assert_eq!(opens[1].url, opens[0].url);
    assert!(opens[1].reconnect);
    assert_ne!(opens[1].channel, first);

    assert_eq!(h.state(), ConnectionState::Connecting);
    assert_eq!(
        h.status_text(),
        "Connection closed: clean=false, code=1006, reason: "
    );
}

#[test]
fn reconnected_channel_bootstraps_again() {
    let mut h = Harness::connected();
    h.drop_transport(CloseInfo::normal("rebooting"));
    assert!(h.status_text().contains("reason: rebooting"));

    h.complete_handshake();
    assert_eq!(h.state(), ConnectionState::Connected);
    assert_eq!(ids(&h.take_sent()), vec![CommandId::ReadConfig]);
}

#[test]
fn close_during_handshake_also_reconnects() {
    let mut h = Harness::new();
    h.session.connect(HOST);
    h.deliver(ChannelEventKind::Error("connection refused".into()));
    h.deliver(ChannelEventKind::Closed(CloseInfo::abnormal()));

    assert_eq!(h.open_count(), 2);
    assert_eq!(h.state(), ConnectionState::Connecting);
}

#[test]
fn disconnect_suppresses_reconnect() {
    let mut h = Harness::connected();
    let old = h.current();

    h.session.disconnect();
    assert_eq!(h.state(), ConnectionState::Disconnected);
    assert_eq!(h.wire.lock().unwrap().closed, vec![old]);

    // The transport still reports the close it was asked for.
    h.session
        .handle_event(ChannelEvent::new(old, ChannelEventKind::Closed(CloseInfo::normal("bye"))));

    assert_eq!(h.open_count(), 1);
    assert_eq!(h.state(), ConnectionState::Disconnected);
    assert!(!h.status_text().contains("Connection closed"));
}

#[test]
fn connect_after_disconnect_opens_a_fresh_channel() {
    let mut h = Harness::connected();
    h.session.disconnect();
    h.session.connect(HOST);

    assert_eq!(h.open_count(), 2);
    assert!(!h.wire.lock().unwrap().opens[1].reconnect);
}

#[test]
fn channel_error_records_text_without_state_change() {
    let mut h = Harness::connected();
    h.deliver(ChannelEventKind::Error("broken pipe".into()));

    assert_eq!(h.status_text(), "Channel error: broken pipe");
    assert_eq!(h.state(), ConnectionState::Connected);
    assert_eq!(h.open_count(), 1);
}

#[test]
fn events_from_a_replaced_channel_are_ignored() {
    let mut h = Harness::connected();
    let old = h.current();
    h.drop_transport(CloseInfo::abnormal());

    let stale = Response::err("late reply")
        .encode(Dialect::Canonical)
        .unwrap();
    h.session
        .handle_event(ChannelEvent::new(old, ChannelEventKind::Message(stale)));
    h.session
        .handle_event(ChannelEvent::new(old, ChannelEventKind::Closed(CloseInfo::abnormal())));

    assert_eq!(h.open_count(), 2);
    assert!(h.status_text().starts_with("Connection closed"));
}

// ── Reconciliation ──────────────────────────────────────────────────

#[test]
fn bootstrap_reads_programs_exactly_once_after_configuration() {
    let mut h = Harness::connected();

    h.receive(&Response::ok("configuration").with_config(wire_config()));
    assert_eq!(ids(&h.take_sent()), vec![CommandId::ReadPrograms]);

    h.receive(&Response::ok("programs").with_programs(wire_programs()));
    assert!(h.take_sent().is_empty());

    let store = h.session.store();
    assert_eq!(*store.configuration(), Configuration::from(wire_config()));
    let programs = store.programs();
    assert_eq!(programs.len(), 2);
    assert_eq!(programs[0].name(), "Bisque");
    assert_eq!(programs[1].steps(), &[Step::default()]);
    assert_eq!(store.status().status_text, "programs");
    assert!(store.last_update().is_some());
}

#[test]
fn configuration_is_replaced_not_merged() {
    let mut h = Harness::connected();
    h.receive(&Response::ok("first").with_config(wire_config()));
    h.receive(&Response::ok("second").with_config(WireConfiguration::default()));

    assert!(h.session.configuration().is_empty());
}

#[test]
fn status_push_replaces_status_wholesale() {
    let mut h = Harness::connected();
    h.receive(&status_push(Some("Bisque"), true));

    let status = h.session.store().status();
    assert_eq!(status.probe_temp, 400.0);
    assert!(status.is_running);
    assert_eq!(status.status_text, "Running");
    assert_eq!(status.active_program.as_ref().unwrap().name(), "Bisque");

    h.receive(&status_push(None, false));
    let status = h.session.store().status();
    assert!(status.active_program.is_none());
    assert!(!status.is_running);
}

#[test]
fn status_push_without_payload_only_sets_the_marker() {
    let mut h = Harness::connected();
    h.receive(&status_push(Some("Bisque"), true));
    h.receive_text(r#"{"id":"STATUS"}"#);

    let status = h.session.store().status();
    assert_eq!(status.status_text, MALFORMED_STATUS);
    assert!(status.is_running);
    assert_eq!(status.probe_temp, 400.0);
}

#[test]
fn err_and_ok_copy_details_or_defaults() {
    let mut h = Harness::connected();

    h.receive(&Response::err("overtemperature"));
    assert_eq!(h.status_text(), "overtemperature");

    h.receive_text(r#"{"id":"ERR"}"#);
    assert_eq!(h.status_text(), DEFAULT_ERR_DETAILS);

    h.receive_text(r#"{"id":"OK"}"#);
    assert_eq!(h.status_text(), DEFAULT_OK_DETAILS);
    assert!(h.take_sent().is_empty());
}

#[test]
fn ok_and_err_are_published_as_replies_but_status_pushes_are_not() {
    let mut h = Harness::connected();
    let store = Arc::clone(h.session.store());
    let mut replies = store.subscribe_replies();

    h.receive(&status_push(Some("Bisque"), true));
    assert!(!replies.has_changed());

    h.receive(&Response::ok("configuration saved"));
    assert!(replies.has_changed());
    assert_eq!(*store.last_reply(), Reply::ok("configuration saved"));

    h.receive_text(r#"{"id":"ERR"}"#);
    assert_eq!(*store.last_reply(), Reply::err(DEFAULT_ERR_DETAILS));
}

#[test]
fn empty_configuration_still_counts_as_received() {
    let mut h = Harness::connected();
    assert!(!h.session.store().configuration_received());

    h.receive(&Response::ok("configuration").with_config(WireConfiguration::default()));
    assert!(h.session.store().configuration_received());
    assert!(h.session.configuration().is_empty());
    assert_eq!(ids(&h.take_sent()), vec![CommandId::ReadPrograms]);
}

#[test]
fn fractional_numbers_in_device_messages_are_applied() {
    let mut h = Harness::connected();

    h.receive_text(
        r#"{"id":"STATUS","status":{"probeTemp":400.0,"elapsedTime":3600.5,"activeStep":1,
            "isRunning":true,"statusText":"Ramping"}}"#,
    );
    let status = h.session.store().status();
    assert_eq!(status.elapsed_time, 3600.5);
    assert_eq!(status.active_step, 1.0);
    assert_eq!(status.status_text, "Ramping");

    h.receive_text(
        r#"{"id":"OK","details":"configuration","config":{"tft":{"poll":300,"calibration":[1.5,2,3]}}}"#,
    );
    assert_eq!(h.status_text(), "configuration");
    let config = h.session.configuration();
    assert_eq!(config.tft.as_ref().unwrap().calibration, vec![1.5, 2.0, 3.0]);
    assert_eq!(ids(&h.take_sent()), vec![CommandId::ReadPrograms]);

    h.receive_text(
        r#"{"id":"OK","details":"programs","programs":[{"name":"Slow","steps":[{"tStart":20,"tEnd":600,"duration":90.5}]}]}"#,
    );
    let programs = h.session.programs();
    assert_eq!(programs[0].steps()[0].duration, 90.5);
    assert_eq!(programs[0].total_duration(), 90.5);
}

#[test]
fn malformed_messages_change_nothing() {
    let mut h = Harness::connected();
    h.receive(&Response::ok("configuration").with_config(wire_config()));
    h.receive(&Response::ok("programs").with_programs(wire_programs()));
    h.receive(&status_push(Some("Bisque"), false));
    h.take_sent();

    let store = Arc::clone(h.session.store());
    let before = (store.configuration(), store.status(), store.programs());

    for text in [
        "",
        "not json",
        "[1,2,3]",
        r#"{"details":"no id"}"#,
        r#"{"id":"OK","config":{"pid":"wrong"}}"#,
        r#"{"id":"STATUS","status":{"isRunning":"yes"}}"#,
    ] {
        h.receive_text(text);
    }

    assert_eq!(*store.configuration(), *before.0);
    assert_eq!(*store.status(), *before.1);
    assert_eq!(*store.programs(), *before.2);
    assert!(h.take_sent().is_empty());
    assert_eq!(h.state(), ConnectionState::Connected);
}

#[test]
fn unknown_response_id_is_a_no_op() {
    let mut h = Harness::connected();
    h.receive(&Response::ok("ready"));
    h.receive_text(r#"{"id":"PING","details":"hello"}"#);

    assert_eq!(h.status_text(), "ready");
}

#[test]
fn compact_status_push_is_understood_by_a_canonical_session() {
    let mut h = Harness::connected();
    h.receive_text(r#"{"id":"STS","status":{"tPB":123.5,"stsText":"Heating","isRunning":true}}"#);

    let status = h.session.store().status();
    assert_eq!(status.probe_temp, 123.5);
    assert_eq!(status.status_text, "Heating");
}

// ── Operations ──────────────────────────────────────────────────────

#[test]
fn set_configuration_is_optimistic_and_sends_write_config() {
    let mut h = Harness::connected();
    let config = Configuration {
        pid: Some(PidSettings {
            poll: 500.0,
            kp: 1.0,
            ki: 2.0,
            kd: 3.0,
            tolerance: None,
        }),
        ..Configuration::default()
    };

    h.session.set_configuration(config.clone());
    assert_eq!(*h.session.configuration(), config);

    let sent = h.take_sent();
    assert_eq!(sent.len(), 1);
    let Request::WriteConfig(wire) = &sent[0] else {
        panic!("expected write-config, got {sent:?}");
    };
    assert_eq!(Configuration::from(wire.clone()), config);
}

#[test]
fn set_programs_is_optimistic_and_sends_write_programs() {
    let mut h = Harness::connected();
    let programs = vec![
        Program::new("Bisque", vec![Step::new(20.0, 950.0, 3600.0)]),
        Program::named("Empty"),
    ];

    h.session.set_programs(programs.clone());
    assert_eq!(*h.session.programs(), programs);

    let sent = h.take_sent();
    let Request::WritePrograms(wire) = &sent[0] else {
        panic!("expected write-programs, got {sent:?}");
    };
    assert_eq!(wire.len(), 2);
    assert_eq!(wire[1].steps.as_ref().unwrap().len(), 1);
}

#[test]
fn select_active_program_waits_for_the_device() {
    let mut h = Harness::connected();
    h.session.select_active_program("Glaze");

    assert_eq!(
        h.take_sent(),
        vec![Request::SelectProgram("Glaze".into())]
    );
    assert!(h.session.store().status().active_program.is_none());

    h.receive(&status_push(Some("Glaze"), false));
    assert_eq!(
        h.session.store().status().active_program.as_ref().unwrap().name(),
        "Glaze"
    );
}

#[test]
fn save_operations_carry_no_payload() {
    let mut h = Harness::connected();
    h.session.save_configuration();
    h.session.save_programs();

    assert_eq!(h.take_sent_raw(), vec![
        r#"{"id":"save-config"}"#.to_owned(),
        r#"{"id":"save-programs"}"#.to_owned(),
    ]);
}

#[test]
fn start_stop_without_program_sends_nothing() {
    let mut h = Harness::connected();
    h.session.start_stop();

    assert!(h.take_sent().is_empty());
    assert_eq!(h.status_text(), NO_PROGRAM_SELECTED);
}

#[test]
fn start_stop_follows_last_reported_running_flag() {
    let mut h = Harness::connected();

    h.receive(&status_push(Some("Bisque"), false));
    h.session.start_stop();
    assert_eq!(ids(&h.take_sent()), vec![CommandId::Start]);

    h.receive(&status_push(Some("Bisque"), true));
    h.session.start_stop();
    assert_eq!(ids(&h.take_sent()), vec![CommandId::Stop]);

    h.receive(&status_push(Some("Bisque"), false));
    h.session.start_stop();
    assert_eq!(ids(&h.take_sent()), vec![CommandId::Start]);
}

#[test]
fn requests_while_not_open_are_dropped() {
    let mut h = Harness::new();
    h.session.save_programs();
    h.session.set_programs(vec![Program::named("Offline")]);
    assert_eq!(h.session.programs()[0].name(), "Offline");

    h.session.connect(HOST);
    h.session.save_configuration();
    assert!(h.take_sent().is_empty());

    // Nothing queued: the handshake only sends the bootstrap read.
    h.complete_handshake();
    assert_eq!(ids(&h.take_sent()), vec![CommandId::ReadConfig]);
}

#[test]
fn compact_session_writes_compact_wire_text() {
    let mut h = Harness::with_dialect(Dialect::Compact);
    h.session.connect(HOST);
    h.complete_handshake();
    h.session.select_active_program("Bisque");

    assert_eq!(h.take_sent_raw(), vec![
        r#"{"id":"cfgRD"}"#.to_owned(),
        r#"{"id":"setPG","msg":"Bisque"}"#.to_owned(),
    ]);
}
