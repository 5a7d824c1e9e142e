//! Clap derive structures for the `kilnlink` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use kilnlink_core::Dialect;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kilnlink -- talk to a kiln controller over its WebSocket
#[derive(Debug, Parser)]
#[command(
    name = "kilnlink",
    version,
    about = "Monitor and drive a kiln controller from the command line",
    long_about = "Connects to a kiln or oven controller at ws://<host>/ws, reads its\n\
        configuration, firing programs and live status, and sends commands.\n\n\
        Every command opens one session, waits for the device to answer,\n\
        prints the result and disconnects.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "KILNLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device address, host or host:port (overrides profile)
    #[arg(long, short = 'H', env = "KILNLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Wire dialect spoken by the firmware (overrides profile)
    #[arg(long, env = "KILNLINK_DIALECT", global = true)]
    pub dialect: Option<DialectArg>,

    /// Output format [default: `defaults.output` from the config file, else table]
    #[arg(long = "output", short = 'o', env = "KILNLINK_OUTPUT", global = true)]
    pub output_arg: Option<OutputFormat>,

    /// Format the commands render with, resolved once at startup.
    #[arg(skip)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Seconds to wait for the device (overrides profile)
    #[arg(long, env = "KILNLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DialectArg {
    /// read-config, STATUS, descriptive field names
    Canonical,
    /// cfgRD, STS, abbreviated field names (older firmware)
    Compact,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Canonical => Dialect::Canonical,
            DialectArg::Compact => Dialect::Compact,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show live controller status
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Read, write and persist the device configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Manage firing programs
    #[command(alias = "pgm")]
    Programs(ProgramsArgs),

    /// Start the selected program, or stop it if running
    StartStop,

    /// Manage connection profiles in the local config file
    Profile(ProfileArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Keep printing status updates until interrupted
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the device configuration
    Show,

    /// Replace the running configuration with a JSON file
    Write {
        /// JSON file holding a Configuration object
        #[arg(long, short = 'f')]
        file: PathBuf,
    },

    /// Persist the running configuration on the device
    Save,
}

// ── Programs ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProgramsArgs {
    #[command(subcommand)]
    pub command: ProgramsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProgramsCommand {
    /// List programs stored on the device
    #[command(alias = "ls")]
    List,

    /// Show the steps of one program
    Show {
        /// Program name
        name: String,
    },

    /// Replace the device's program list with a JSON file
    Write {
        /// JSON file holding an array of programs
        #[arg(long, short = 'f')]
        file: PathBuf,
    },

    /// Persist the program list on the device
    Save,

    /// Make a program the active one
    Select {
        /// Program name
        name: String,
    },
}

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show configured profiles and the config file location
    Show,

    /// Add or replace a profile
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Device address, host or host:port
        #[arg(long = "device")]
        device: String,

        /// Wire dialect spoken by the firmware
        #[arg(long = "wire", default_value = "canonical")]
        wire: DialectArg,

        /// Pause before redialing a dropped connection, in milliseconds
        #[arg(long, default_value = "1000")]
        redial_delay_ms: u64,

        /// Make this the default profile
        #[arg(long)]
        set_default: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
