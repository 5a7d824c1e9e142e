// ── Observable store ──
//
// Holds the live Configuration, Status and program list, plus the
// connection state. Only the session writes; everyone else reads or
// subscribes.

mod data_store;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CoreError;

pub use data_store::{ConnectionState, DataStore};

/// Structurally equal copy of `value` that shares nothing with it.
///
/// Goes through JSON, so anything that serializes (Configuration, Program,
/// Status and lists of them) comes back normalized the same way a value
/// read from the device would be.
pub fn detach<T: Serialize + DeserializeOwned>(value: &T) -> Result<T, CoreError> {
    let json = serde_json::to_value(value)?;
    Ok(serde_json::from_value(json)?)
}
