//! Status command handler.

use chrono::{DateTime, Local, Utc};
use tokio_stream::StreamExt;

use kilnlink_core::{Controller, Status};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(s: &Status, updated: Option<DateTime<Utc>>, color: bool) -> String {
    let state = if s.is_running { "RUNNING" } else { "IDLE" };
    let relay = if s.is_relay_on { "on" } else { "off" };
    let program = s.active_program.as_ref().map_or_else(
        || "-".to_owned(),
        |p| {
            format!(
                "{} (step {}/{})",
                p.name(),
                s.step_index().map_or_else(|| "-".to_owned(), |i| (i + 1).to_string()),
                p.steps().len()
            )
        },
    );

    let mut lines = vec![
        format!(
            "Status:    {}",
            if s.status_text.is_empty() { "-" } else { s.status_text.as_str() }
        ),
        format!(
            "State:     {} (relay {})",
            output::flag(state, s.is_running, color),
            output::flag(relay, s.is_relay_on, color)
        ),
        format!("Program:   {program}"),
        format!("Probe:     {:.1}", s.probe_temp),
        format!("Setpoint:  {:.1}", s.setpoint_temp),
        format!("Ambient:   {:.1}", s.ambient_temp),
        format!("Supply:    {:.1} V", s.supply_voltage),
        format!("Elapsed:   {}", output::hms(s.elapsed_time)),
        format!(
            "Updated:   {}",
            updated.map_or_else(
                || "-".to_owned(),
                |t| t.with_timezone(&Local).format("%H:%M:%S").to_string()
            )
        ),
    ];
    if let Some(step) = s.current_step() {
        lines.push(format!(
            "Step:      {:.1} -> {:.1} over {}",
            step.t_start,
            step.t_end,
            output::hms(step.duration)
        ));
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    util::bootstrap(controller).await?;

    let status = util::next_status(controller).await?;
    let updated = controller.store().last_update();
    let out = output::render_single(global.output, &*status, |s| detail(s, updated, color))?;
    output::print_output(&out, global.quiet);

    if !args.watch {
        return Ok(());
    }

    // Skip the snapshot printed above.
    let mut stream = controller.status_stream().into_stream().skip(1);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = stream.next() => {
                let Some(status) = next else { break };
                let updated = controller.store().last_update();
                let out =
                    output::render_single(global.output, &*status, |s| detail(s, updated, color))?;
                output::print_output(&out, global.quiet);
            }
        }
    }
    Ok(())
}
