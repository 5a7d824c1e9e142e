//! Start/stop command handler.

use kilnlink_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    util::bootstrap(controller).await?;
    // The running flag and active program come from the device's pushes.
    let status = util::next_status(controller).await?;
    if status.active_program.is_none() {
        return Err(CliError::NoProgramSelected);
    }

    let expected = !status.is_running;
    let status = controller
        .call_and_wait_status(
            controller.config().timeout,
            Controller::start_stop,
            move |s| s.is_running == expected,
        )
        .await?;
    let state = if status.is_running { "Running" } else { "Stopped" };
    output::print_output(state, global.quiet);
    Ok(())
}
