//! Process-level plumbing shared by every binary in the workspace:
//! layered configuration, home directory resolution and logging setup.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{AppConfig, AppSection, CliArgs, LoggingConfig, Section};
