#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::action::{CliAction, GlobalOptions, Mode};
use super::args::{ensure_no_unknown_flags, suggest_modes};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    #[error("Missing required argument: {}", arg)]
    MissingRequiredArg { arg: String },
    #[error("Unknown mode: {}{}", mode, hint(suggestions))]
    UnknownMode {
        mode: String,
        suggestions: Vec<String>,
    },
    #[error("Unknown flag: {}", flag)]
    UnknownFlag { flag: String },
    #[error("Invalid argument value for {}: {}", arg, error)]
    InvalidArgValue { arg: String, error: String },
}

fn hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

/// Parses the arguments after the program name.
///
/// # Errors
/// Returns `CliError` for unknown modes or flags and missing or malformed values.
pub fn parse_cli_args(args: &[String]) -> Result<CliAction, CliError> {
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        return Ok(CliAction::ShowHelp);
    }

    let mode = match args.first().map(String::as_str) {
        Some("-v" | "--version") => return Ok(CliAction::ShowVersion),
        None => Mode::Interactive,
        Some(flag) if flag.starts_with("--") => Mode::Interactive,
        Some("script") => {
            ensure_no_unknown_flags(&args[1..], &["--file"])?;
            Mode::Script {
                file: parse_required_arg::<PathBuf>(args, "file")?,
            }
        }
        Some("exec") => {
            ensure_no_unknown_flags(&args[1..], &["--line"])?;
            Mode::Exec {
                line: parse_required_arg(args, "line")?,
            }
        }
        Some(other) => {
            return Err(CliError::UnknownMode {
                mode: other.to_string(),
                suggestions: suggest_modes(other),
            })
        }
    };
    if mode == Mode::Interactive {
        ensure_no_unknown_flags(args, &[])?;
    }

    let options = GlobalOptions {
        config: parse_optional_arg(args, "config")?,
        server: parse_optional_arg(args, "server")?,
        output: parse_optional_arg(args, "output")?,
        stop_on_error: parse_optional_arg(args, "stop_on_error")?.unwrap_or(false),
        connect_timeout_ms: parse_optional_arg(args, "connect_timeout_ms")?,
        retry_interval_ms: parse_optional_arg(args, "retry_interval_ms")?,
        max_retries: parse_optional_arg(args, "max_retries")?,
    };

    Ok(CliAction::Run { mode, options })
}

fn parse_required_arg<T>(args: &[String], name: &str) -> Result<T, CliError>
where
    T: std::str::FromStr + 'static,
    T::Err: std::fmt::Display,
{
    parse_optional_arg(args, name)?.ok_or_else(|| CliError::MissingRequiredArg {
        arg: name.to_string(),
    })
}

fn parse_optional_arg<T>(args: &[String], name: &str) -> Result<Option<T>, CliError>
where
    T: std::str::FromStr + 'static,
    T::Err: std::fmt::Display,
{
    let flag = format!("--{}", name.replace('_', "-"));
    let position = args.iter().position(|a| a.as_str() == flag);

    match position {
        None => Ok(None),
        Some(i) => {
            let maybe_value = args.get(i + 1);
            let treat_as_boolean_flag = std::any::TypeId::of::<T>()
                == std::any::TypeId::of::<bool>()
                && maybe_value.is_none_or(|v| v.starts_with("--"));

            if treat_as_boolean_flag {
                return "true"
                    .parse::<T>()
                    .map(Some)
                    .map_err(|e| CliError::InvalidArgValue {
                        arg: name.to_string(),
                        error: format!("{e}"),
                    });
            }

            match maybe_value {
                None => Err(CliError::MissingRequiredArg {
                    arg: name.to_string(),
                }),
                Some(v) if v.starts_with("--") => Err(CliError::MissingRequiredArg {
                    arg: name.to_string(),
                }),
                Some(v) => v.parse::<T>().map(Some).map_err(|e| CliError::InvalidArgValue {
                    arg: name.to_string(),
                    error: format!("{e}"),
                }),
            }
        }
    }
}
