//! Runtime settings

use crate::config::cli::{CliArgs, Command};

/// Runtime configuration settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub json: bool,
    pub command: Command,
}

impl From<CliArgs> for Settings {
    fn from(args: CliArgs) -> Self {
        Settings {
            json: args.json,
            command: args.command,
        }
    }
}
