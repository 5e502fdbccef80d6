//! # iso-cli — Command-Line Access to Isolated Stores
//!
//! Provides the `isostore` binary. Every subcommand opens one store,
//! selected by `--scope` and the identity flags, and runs a single
//! operation against it.
//!
//! ```bash
//! isostore --base-dir /tmp/iso mkdir settings
//! isostore --base-dir /tmp/iso write settings/app.yaml "theme: dark"
//! isostore --base-dir /tmp/iso --scope machine-store-for-domain ls '*.yaml'
//! isostore --base-dir /tmp/iso info --json
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: success, or `exists` found the entry
//! - `1`: `exists` found nothing
//! - `2`: the operation failed

pub mod commands;
pub mod options;

/// Exit code for a failed operation.
pub const EXIT_FAILURE: u8 = 2;
