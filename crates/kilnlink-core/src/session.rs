// ── Session engine ──
//
// Owns the one channel to the device, drives the connection state machine
// and reconciles every decoded response into the DataStore. All methods are
// synchronous and never block: requests are fire-and-forget, and results
// show up later as store changes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use kilnlink_api::protocol::{WireConfiguration, WireProgram};
use kilnlink_api::{
    Channel, ChannelEvent, ChannelEventKind, ChannelId, Connector, Dialect, EventSender,
    OpenRequest, Request, Response, ResponseId, device_url,
};

use crate::convert::{programs_from_wire, programs_to_wire};
use crate::model::{Configuration, Program, Reply, Status};
use crate::store::{ConnectionState, DataStore};

// ── Status line messages ─────────────────────────────────────────────

pub const NO_PROGRAM_SELECTED: &str = "no program selected";
pub const MALFORMED_STATUS: &str = "Message from controller with errors";
pub const DEFAULT_ERR_DETAILS: &str = "ERROR: no details provided";
pub const DEFAULT_OK_DETAILS: &str = "OK: no details provided";

/// The client side of one device conversation.
///
/// Channel events arrive through the [`EventSender`] handed to the
/// connector and must be fed back in with [`handle_event`](Self::handle_event),
/// one at a time, in delivery order. Events from any channel other than
/// the current one are ignored, which is what keeps a deliberately closed
/// channel from triggering a reconnect.
pub struct Session {
    connector: Box<dyn Connector>,
    events: EventSender,
    store: Arc<DataStore>,
    dialect: Dialect,
    address: Option<String>,
    channel: Option<Box<dyn Channel>>,
    last_channel: ChannelId,
}

impl Session {
    pub fn new(connector: Box<dyn Connector>, events: EventSender, dialect: Dialect) -> Self {
        Self {
            connector,
            events,
            store: Arc::new(DataStore::new()),
            dialect,
            address: None,
            channel: None,
            last_channel: ChannelId::new(0),
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Address used for the current channel and for automatic reconnects.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open a channel to `address` unless one already exists.
    pub fn connect(&mut self, address: &str) {
        if let Some(channel) = &self.channel {
            debug!(channel = %channel.id(), "connect ignored, channel already present");
            return;
        }
        self.open(address, false);
    }

    /// Close the channel without triggering a reconnect.
    pub fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            info!(channel = %channel.id(), "closing connection to controller");
            channel.close();
        }
        self.store.set_connection(ConnectionState::Disconnected);
    }

    fn open(&mut self, address: &str, reconnect: bool) {
        let url = match device_url(address) {
            Ok(url) => url,
            Err(e) => {
                warn!(address, error = %e, "cannot open channel");
                self.store
                    .set_status_text(format!("Invalid device address '{address}': {e}"));
                self.store.set_connection(ConnectionState::Disconnected);
                return;
            }
        };

        self.address = Some(address.to_owned());
        self.last_channel = self.last_channel.next();
        let id = self.last_channel;

        info!(channel = %id, %url, reconnect, "opening channel");
        self.store.set_connection(ConnectionState::Connecting);
        let channel = self.connector.open(OpenRequest {
            url,
            channel: id,
            reconnect,
            events: self.events.clone(),
        });
        self.channel = Some(channel);
    }

    // ── Channel events ───────────────────────────────────────────────

    /// Run one channel event to completion.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        let current = self.channel.as_ref().map(|c| c.id());
        if current != Some(event.channel) {
            debug!(channel = %event.channel, "ignoring event from a detached channel");
            return;
        }

        match event.kind {
            ChannelEventKind::Opened => {
                info!(channel = %event.channel, "connected to controller");
                self.store.set_connection(ConnectionState::Connected);
                self.send(Request::ReadConfig);
            }
            ChannelEventKind::Error(text) => {
                warn!(channel = %event.channel, error = %text, "channel error");
                self.store.set_status_text(format!("Channel error: {text}"));
            }
            ChannelEventKind::Message(text) => self.handle_message(&text),
            ChannelEventKind::Closed(close) => {
                warn!(channel = %event.channel, %close, "connection closed");
                self.store.set_status_text(format!("Connection closed: {close}"));
                self.channel = None;
                match self.address.clone() {
                    Some(address) => self.open(&address, true),
                    None => self.store.set_connection(ConnectionState::Disconnected),
                }
            }
        }
    }

    fn handle_message(&mut self, text: &str) {
        match Response::decode(text) {
            Ok(response) => self.reconcile(response),
            Err(e) => warn!(error = %e, "dropping undecodable message"),
        }
    }

    fn reconcile(&mut self, response: Response) {
        match response.id {
            ResponseId::Status => match response.status {
                Some(status) => {
                    self.store.replace_status(Status::from(status));
                    self.store.mark_device_update();
                }
                None => {
                    warn!("status push without a status payload");
                    self.store.set_status_text(MALFORMED_STATUS);
                }
            },
            ResponseId::Err => {
                let details = response.details.unwrap_or_else(|| DEFAULT_ERR_DETAILS.into());
                debug!(%details, "controller reported an error");
                self.store.set_status_text(details.clone());
                self.store.record_reply(Reply::err(details));
            }
            ResponseId::Ok => {
                let details = response.details.unwrap_or_else(|| DEFAULT_OK_DETAILS.into());
                self.store.set_status_text(details.clone());
                // Recorded before the payloads, so anyone who has seen a
                // payload land also sees the reply that carried it.
                self.store.record_reply(Reply::ok(details));

                if let Some(config) = response.config {
                    self.store.replace_configuration(Configuration::from(config));
                    self.store.mark_configuration_received();
                    self.store.mark_device_update();
                    // Programs travel separately; ask for them now.
                    self.send(Request::ReadPrograms);
                }
                if let Some(programs) = response.programs {
                    self.store.replace_programs(programs_from_wire(programs));
                    self.store.mark_device_update();
                }
            }
            ResponseId::Unknown(id) => debug!(%id, "ignoring unrecognized response"),
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    pub fn configuration(&self) -> Arc<Configuration> {
        self.store.configuration()
    }

    /// Replace the local Configuration and send it to the device.
    pub fn set_configuration(&mut self, configuration: Configuration) {
        let wire = WireConfiguration::from(&configuration);
        self.store.replace_configuration(configuration);
        self.send(Request::WriteConfig(wire));
    }

    pub fn programs(&self) -> Arc<Vec<Program>> {
        self.store.programs()
    }

    /// Replace the local program list and send it to the device.
    pub fn set_programs(&mut self, programs: Vec<Program>) {
        let wire: Vec<WireProgram> = programs_to_wire(&programs);
        self.store.replace_programs(programs);
        self.send(Request::WritePrograms(wire));
    }

    /// Ask the device to make `name` the active program. The local Status
    /// changes only once the device pushes it.
    pub fn select_active_program(&mut self, name: &str) {
        self.send(Request::SelectProgram(name.to_owned()));
    }

    pub fn save_configuration(&mut self) {
        self.send(Request::SaveConfig);
    }

    pub fn save_programs(&mut self) {
        self.send(Request::SavePrograms);
    }

    /// Send `start` or `stop` depending on the last reported `is_running`.
    /// Without an active program nothing is sent.
    pub fn start_stop(&mut self) {
        let status = self.store.status();
        if status.active_program.is_none() {
            self.store.set_status_text(NO_PROGRAM_SELECTED);
            return;
        }
        let request = if status.is_running {
            Request::Stop
        } else {
            Request::Start
        };
        self.send(request);
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// Encode and send, or drop the request when the channel is not open.
    fn send(&mut self, request: Request) {
        let command = request.id();
        let Some(channel) = self.channel.as_mut().filter(|c| c.is_open()) else {
            debug!(%command, "channel not open, dropping request");
            return;
        };

        match request.encode(self.dialect) {
            Ok(text) => {
                debug!(%command, channel = %channel.id(), "sending request");
                if !channel.send(text) {
                    debug!(%command, "channel refused request");
                }
            }
            Err(e) => warn!(%command, error = %e, "failed to encode request"),
        }
    }
}
