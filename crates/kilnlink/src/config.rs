//! Resolve the session to open from the config file, the selected profile
//! and command-line overrides.

use clap::ValueEnum;

use kilnlink_config::{
    Config, ConfigError, Profile, config_path, load_config, profile_to_session_config,
};
use kilnlink_core::SessionConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Profile names, sorted, for help text.
pub fn profile_names(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// `--output` (or `KILNLINK_OUTPUT`) wins, then `defaults.output` from the
/// config file, then table. An unreadable file or unknown name falls back
/// to table; the commands that need the file report its errors themselves.
pub fn resolve_output(global: &GlobalOpts) -> OutputFormat {
    if let Some(format) = global.output_arg {
        return format;
    }
    let Ok(cfg) = load_config() else {
        return OutputFormat::default();
    };
    <OutputFormat as ValueEnum>::from_str(&cfg.defaults.output, true).unwrap_or_else(|reason| {
        tracing::warn!(value = %cfg.defaults.output, %reason, "ignoring defaults.output");
        OutputFormat::default()
    })
}

/// Build a `SessionConfig` from the config file, profile, and CLI overrides.
///
/// `--host` alone is enough when no profile exists. An explicitly named
/// profile must exist.
pub fn resolve_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = load_config()?;

    let profile = match cfg.profile(global.profile.as_deref()) {
        Ok((_, profile)) => Some(profile.clone()),
        Err(ConfigError::ProfileNotFound { .. }) if global.profile.is_none() => None,
        Err(ConfigError::ProfileNotFound { name }) => {
            return Err(CliError::ProfileNotFound {
                name,
                available: profile_names(&cfg),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut profile = match (profile, &global.host) {
        (Some(mut profile), Some(host)) => {
            profile.host.clone_from(host);
            profile
        }
        (Some(profile), None) => profile,
        (None, Some(host)) => Profile::new(host.clone()),
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(dialect) = global.dialect {
        profile.dialect = dialect.into();
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    tracing::debug!(host = %profile.host, dialect = %profile.dialect, "resolved device profile");
    Ok(profile_to_session_config(&profile, &cfg.defaults)?)
}
