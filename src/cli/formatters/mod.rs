//! Output formatters for CLI commands.

pub mod results;
