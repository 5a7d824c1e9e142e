// kilnlink-api: wire codec and channel transport for kiln controller devices

pub mod channel;
pub mod error;
pub mod protocol;
pub mod websocket;

pub use channel::{
    Channel, ChannelEvent, ChannelEventKind, ChannelId, CloseInfo, Connector, EventSender,
    OpenRequest,
};
pub use error::Error;
pub use protocol::{CommandId, Dialect, Request, Response, ResponseId};
pub use websocket::{WsConnector, device_url};
