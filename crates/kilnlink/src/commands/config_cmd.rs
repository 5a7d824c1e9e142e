//! Device configuration command handlers.

use kilnlink_core::{Configuration, Controller};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(c: &Configuration) -> String {
    let mut lines = Vec::new();
    if let Some(tft) = &c.tft {
        lines.push(format!("TFT poll:     {} ms", tft.poll));
        let cal: Vec<String> = tft.calibration.iter().map(ToString::to_string).collect();
        lines.push(format!("Calibration:  [{}]", cal.join(", ")));
    }
    if let Some(wifi) = &c.wifi {
        lines.push(format!("WiFi SSID:    {}", wifi.ssid));
        lines.push(format!("WiFi IP:      {}", wifi.ip.as_deref().unwrap_or("-")));
    }
    if let Some(pid) = &c.pid {
        lines.push(format!("PID poll:     {} ms", pid.poll));
        lines.push(format!("PID gains:    kp={} ki={} kd={}", pid.kp, pid.ki, pid.kd));
        lines.push(format!(
            "Tolerance:    {}",
            pid.tolerance.map_or_else(|| "-".into(), |t| t.to_string())
        ));
    }
    if let Some(programs) = &c.programs {
        lines.push(format!("Programs:     {}", programs.len()));
    }
    if lines.is_empty() {
        lines.push("(controller reported no settings)".into());
    }
    lines.join("\n")
}

pub async fn handle(
    controller: &Controller,
    args: ConfigArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            util::bootstrap(controller).await?;
            let config = controller.configuration();
            let out = output::render_single(global.output, &*config, detail)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Write { file } => {
            let config: Configuration = util::read_json(&file)?;
            util::bootstrap(controller).await?;
            let reply = util::acknowledge(controller, |c| c.set_configuration(config)).await?;
            output::print_output(&reply, global.quiet);
            Ok(())
        }

        ConfigCommand::Save => {
            util::bootstrap(controller).await?;
            let reply = util::acknowledge(controller, Controller::save_configuration).await?;
            output::print_output(&reply, global.quiet);
            Ok(())
        }
    }
}
