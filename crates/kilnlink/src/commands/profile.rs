//! Profile subcommand handlers. These only touch the local config file.

use tabled::Tabled;

use kilnlink_config::{Config, Profile, config_path, load_config, save_config};

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    default: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Dialect")]
    dialect: String,
    #[tabled(rename = "Redial")]
    redial: String,
    #[tabled(rename = "Timeout")]
    timeout: String,
}

#[derive(serde::Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    default: bool,
    #[serde(flatten)]
    profile: &'a Profile,
}

fn entries(cfg: &Config) -> Vec<ProfileEntry<'_>> {
    let mut entries: Vec<ProfileEntry<'_>> = cfg
        .profiles
        .iter()
        .map(|(name, profile)| ProfileEntry {
            name,
            default: cfg.default_profile.as_deref() == Some(name.as_str()),
            profile,
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(b.name));
    entries
}

pub fn handle(args: ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ProfileCommand::Show => {
            let cfg = load_config()?;
            if !global.quiet {
                eprintln!("Config file: {}", config_path().display());
            }
            let default_timeout = cfg.defaults.timeout;
            let out = output::render_list(global.output, &entries(&cfg), |e| ProfileRow {
                default: if e.default { "*" } else { "" },
                name: e.name.to_owned(),
                host: e.profile.host.clone(),
                dialect: e.profile.dialect.to_string(),
                redial: format!("{} ms", e.profile.redial_delay_ms),
                timeout: format!("{}s", e.profile.timeout.unwrap_or(default_timeout)),
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProfileCommand::Init {
            name,
            device,
            wire,
            redial_delay_ms,
            set_default,
        } => {
            let mut cfg = load_config()?;
            let profile = Profile {
                redial_delay_ms,
                dialect: wire.into(),
                ..Profile::new(device)
            };
            kilnlink_config::profile_to_session_config(&profile, &cfg.defaults)?;

            if set_default || cfg.profiles.is_empty() {
                cfg.default_profile = Some(name.clone());
            }
            cfg.profiles.insert(name.clone(), profile);
            let path = save_config(&cfg)?;

            if !global.quiet {
                eprintln!("Profile '{name}' written to {}", path.display());
            }
            Ok(())
        }
    }
}
