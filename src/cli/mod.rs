//! Command-line interface for runtime-forge.
//!
//! Provides commands for Dockerfile generation, catalog listing and refresh,
//! build matrix output and template export.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
