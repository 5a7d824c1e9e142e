//! Shared helpers for device-bound commands.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use kilnlink_core::{Controller, CoreError, Status};

use crate::error::CliError;

/// Connect and wait for the bootstrap reads (configuration, then programs).
pub async fn bootstrap(controller: &Controller) -> Result<(), CliError> {
    let timeout = controller.config().timeout;
    let mut programs = controller.programs_stream();

    controller.connect();
    if let Err(err) = controller.wait_connected(timeout).await {
        return Err(connection_error(controller, err));
    }
    programs.changed_within(timeout).await?;
    tracing::debug!(programs = programs.current().len(), "bootstrap complete");
    Ok(())
}

/// Wait for the next Status snapshot the device pushes.
pub async fn next_status(controller: &Controller) -> Result<Arc<Status>, CliError> {
    let mut status = controller.status_stream();
    Ok(status.changed_within(controller.config().timeout).await?)
}

/// Run a device operation and return the details of the OK that answers it.
/// An ERR reply becomes [`CliError::Rejected`].
pub async fn acknowledge(
    controller: &Controller,
    op: impl FnOnce(&Controller),
) -> Result<String, CliError> {
    let reply = controller
        .call_and_wait_reply(controller.config().timeout, op)
        .await?;
    if reply.ok {
        Ok(reply.details.clone())
    } else {
        Err(CliError::Rejected {
            details: reply.details.clone(),
        })
    }
}

/// Read and parse a JSON payload file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// A failed wait for the channel, explained with whatever the session
/// recorded in the status line.
fn connection_error(controller: &Controller, err: CoreError) -> CliError {
    let url = controller
        .config()
        .ws_url()
        .map_or_else(|_| controller.config().host.clone(), |u| u.to_string());
    let reason = controller.status().status_text.clone();
    let reason = if reason.is_empty() { err.to_string() } else { reason };
    CliError::ConnectionFailed {
        url,
        source: reason.into(),
    }
}
