#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::command::Registry;

mod action;
mod args;
mod parser;

pub use action::{CliAction, GlobalOptions, Mode};
pub use args::{ensure_no_unknown_flags, suggest_modes, GLOBAL_FLAGS};
pub use parser::{parse_cli_args, CliError};

#[must_use]
pub fn usage() -> String {
    format!(
        "desk {version}
Command client for the ticket server.

Usage:
  desk [options]                       interactive session on stdin
  desk script --file <path> [options]  run a script file
  desk exec --line <command> [options] run one command line

Options:
  --config <path>              settings file (default {config})
  --server <addr>              host:port or tcp://host:port
  --output <text|json>         how responses are printed
  --stop-on-error              end an interactive session at the first failure
  --connect-timeout-ms <ms>    per-attempt connect timeout
  --retry-interval-ms <ms>     pause between reconnect attempts
  --max-retries <n|forever>    reconnect attempts before giving up
  -h, --help                   show this help
  -v, --version                show the version

Commands:
  {commands}",
        version = env!("CARGO_PKG_VERSION"),
        config = crate::config::DEFAULT_CONFIG_PATH,
        commands = Registry::standard().describe().join("\n  "),
    )
}

#[cfg(test)]
mod tests;
