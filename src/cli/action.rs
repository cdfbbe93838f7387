#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::config::Settings;
use crate::error::Result;
use crate::runtime::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    ShowHelp,
    ShowVersion,
    Run { mode: Mode, options: GlobalOptions },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Script { file: PathBuf },
    Exec { line: String },
}

/// Flags accepted by every mode. Each overrides the matching setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub server: Option<String>,
    pub output: Option<OutputFormat>,
    pub stop_on_error: bool,
    pub connect_timeout_ms: Option<u64>,
    pub retry_interval_ms: Option<u64>,
    pub max_retries: Option<String>,
}

impl GlobalOptions {
    /// # Errors
    /// Returns `DeskError::Config` for a malformed server address or retry count.
    pub fn apply_to(&self, settings: &mut Settings) -> Result<()> {
        if let Some(server) = &self.server {
            settings.apply("server_addr", server)?;
        }
        if let Some(max_retries) = &self.max_retries {
            settings.apply("max_retries", max_retries)?;
        }
        if let Some(output) = self.output {
            settings.output = output;
        }
        if let Some(ms) = self.connect_timeout_ms {
            settings.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_interval_ms {
            settings.retry_interval = Duration::from_millis(ms);
        }
        if self.stop_on_error {
            settings.stop_on_error = true;
        }
        Ok(())
    }
}
