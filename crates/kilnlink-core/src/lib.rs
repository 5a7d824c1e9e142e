// kilnlink-core: Session engine and reactive state between kilnlink-api and front ends.

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use controller::Controller;
pub use error::CoreError;
pub use session::Session;
pub use store::{ConnectionState, DataStore, detach};
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use kilnlink_api::Dialect;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Configuration, DEFAULT_PROGRAM_NAME, PidSettings, Program, Reply, Status, Step,
    TftSettings, WifiSettings,
};
