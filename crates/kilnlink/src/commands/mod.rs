//! Command dispatch: bridges CLI args -> controller operations -> output.

pub mod config_cmd;
pub mod control;
pub mod profile;
pub mod programs;
pub mod status;
pub mod util;

use kilnlink_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(controller, args, global).await,
        Command::Config(args) => config_cmd::handle(controller, args, global).await,
        Command::Programs(args) => programs::handle(controller, args, global).await,
        Command::StartStop => control::handle(controller, global).await,
        // Profile and Completions never reach a device
        Command::Profile(_) | Command::Completions(_) => Err(CliError::Internal(
            "local command routed to the device dispatcher".into(),
        )),
    }
}
