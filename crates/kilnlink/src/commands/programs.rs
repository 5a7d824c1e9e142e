//! Firing program command handlers.

use tabled::Tabled;

use kilnlink_core::{Controller, Program, Step};

use crate::cli::{GlobalOpts, ProgramsArgs, ProgramsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProgramRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Steps")]
    steps: usize,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Peak")]
    peak: String,
}

impl From<&Program> for ProgramRow {
    fn from(p: &Program) -> Self {
        let peak = p
            .steps()
            .iter()
            .map(|s| s.t_start.max(s.t_end))
            .fold(f64::NEG_INFINITY, f64::max);
        Self {
            name: p.name().to_owned(),
            steps: p.steps().len(),
            duration: output::hms(p.total_duration()),
            peak: format!("{peak:.1}"),
        }
    }
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Rate/h")]
    rate: String,
}

fn step_rows(program: &Program) -> Vec<StepRow> {
    program
        .steps()
        .iter()
        .enumerate()
        .map(|(i, s): (usize, &Step)| StepRow {
            index: i + 1,
            from: format!("{:.1}", s.t_start),
            to: format!("{:.1}", s.t_end),
            duration: output::hms(s.duration),
            rate: s
                .rate_per_hour()
                .map_or_else(|| "-".into(), |r| format!("{r:.0}")),
        })
        .collect()
}

fn find(controller: &Controller, name: &str) -> Result<Program, CliError> {
    controller
        .store()
        .program_by_name(name)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "program".into(),
            identifier: name.into(),
            list_command: "programs list".into(),
        })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: ProgramsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ProgramsCommand::List => {
            util::bootstrap(controller).await?;
            let programs = controller.programs();
            let out = output::render_list(global.output, &programs, |p| ProgramRow::from(p))?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProgramsCommand::Show { name } => {
            util::bootstrap(controller).await?;
            let program = find(controller, &name)?;
            let out = output::render_single(global.output, &program, |p| {
                let steps = tabled::Table::new(step_rows(p))
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                format!(
                    "Name:      {}\nDuration:  {}\n{steps}",
                    p.name(),
                    output::hms(p.total_duration())
                )
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProgramsCommand::Write { file } => {
            // Programs without steps come back with one default step.
            let programs: Vec<Program> = util::read_json(&file)?;
            if programs.is_empty() {
                return Err(CliError::Validation {
                    field: "file".into(),
                    reason: "program list is empty".into(),
                });
            }
            util::bootstrap(controller).await?;
            let reply = util::acknowledge(controller, |c| c.set_programs(programs)).await?;
            output::print_output(&reply, global.quiet);
            Ok(())
        }

        ProgramsCommand::Save => {
            util::bootstrap(controller).await?;
            let reply = util::acknowledge(controller, Controller::save_programs).await?;
            output::print_output(&reply, global.quiet);
            Ok(())
        }

        ProgramsCommand::Select { name } => {
            util::bootstrap(controller).await?;
            let program = find(controller, &name)?;
            let status = controller
                .call_and_wait_status(
                    controller.config().timeout,
                    |c| c.select_active_program(program.name()),
                    |s| {
                        s.active_program
                            .as_ref()
                            .is_some_and(|p| p.name() == program.name())
                    },
                )
                .await?;
            output::print_output(&format!("Selected {}", program.name()), global.quiet);
            tracing::debug!(status = %status.status_text, "selection confirmed");
            Ok(())
        }
    }
}
