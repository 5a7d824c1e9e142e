// ── Domain model ──
//
// Plain value types for everything the device reports or accepts.
// Configuration and Status are always replaced as whole snapshots; nothing
// here merges individual fields.

pub mod configuration;
pub mod program;
pub mod reply;
pub mod status;

// ── Re-exports ──────────────────────────────────────────────────────

pub use configuration::{Configuration, PidSettings, TftSettings, WifiSettings};
pub use program::{DEFAULT_PROGRAM_NAME, Program, Step};
pub use reply::Reply;
pub use status::Status;
