#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::time::Duration;
use thiserror::Error;

/// Error code constants for type-safe error handling
pub mod code {
    pub const CLI_ERROR: &str = "CLI_ERROR";
    pub const ARITY: &str = "ARITY";
    pub const INVALID: &str = "INVALID";
    pub const NOTFOUND: &str = "NOTFOUND";
    pub const TRANSPORT: &str = "TRANSPORT";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const RECURSION: &str = "RECURSION";
    pub const INPUT: &str = "INPUT";
    pub const BUSY: &str = "BUSY";
    pub const CONFIG: &str = "CONFIG";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Local failures raised before anything reaches the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{command}: expected {expected} argument(s), got {got}")]
    Arity {
        command: String,
        expected: String,
        got: usize,
    },

    #[error("{command}: invalid argument {arg}: {reason}")]
    Validation {
        command: String,
        arg: String,
        reason: String,
    },

    #[error("Unknown command: {name}")]
    Unknown {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Command already registered: {0}")]
    Duplicate(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Not connected to server")]
    Disconnected,

    #[error("Timed out after {}ms waiting for {what}", .after.as_millis())]
    Timeout { what: String, after: Duration },

    #[error("Connection I/O failed: {0}")]
    Io(String),

    #[error("Malformed frame: {0}")]
    Codec(String),

    #[error("Connection closed by server")]
    Closed,

    #[error("Gave up reconnecting after {0} attempt(s)")]
    RepairExhausted(u32),
}

impl TransportError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Script recursion detected: {0} is already running")]
    Recursion(String),

    #[error("Script not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Input exhausted: {0}")]
    Exhausted(String),

    #[error("Input unusable: {0}")]
    Unusable(String),
}

#[derive(Error, Debug)]
pub enum DeskError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Server rejected {cmd}: {msg}")]
    Rejected { cmd: String, code: String, msg: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Returns the protocol error code for this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Command(CommandError::Arity { .. }) => code::ARITY,
            Self::Command(CommandError::Unknown { .. }) => code::NOTFOUND,
            Self::Command(_) | Self::Serialization(_) => code::INVALID,
            Self::Transport(TransportError::Timeout { .. }) => code::TIMEOUT,
            Self::Transport(_) | Self::Io(_) => code::TRANSPORT,
            Self::Script(ScriptError::Recursion(_)) => code::RECURSION,
            Self::Script(ScriptError::NotFound(_)) => code::NOTFOUND,
            Self::Input(_) => code::INPUT,
            Self::Config(_) => code::CONFIG,
            Self::Busy(_) => code::BUSY,
            Self::Rejected { .. } | Self::Internal(_) => code::INTERNAL,
        }
    }

    /// Returns the exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Command(_) => 3,
            Self::Transport(_) => 4,
            Self::Script(_) => 5,
            Self::Input(_) => 6,
            Self::Io(_) => 7,
            Self::Serialization(_) => 8,
            Self::Busy(_) => 10,
            Self::Rejected { .. } => 11,
            Self::Internal(_) => 9,
        }
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Protocol error codes as documented in the CLI
pub const ERROR_CODES: &[(&str, &str, &str)] = &[
    (
        code::CLI_ERROR,
        "Invalid CLI usage",
        "Run 'desk --help' for valid options",
    ),
    (
        code::ARITY,
        "Wrong number of arguments",
        "Run 'help' to see each command's arguments",
    ),
    (
        code::INVALID,
        "Invalid argument or payload",
        "Check numbers are positive integers and payloads are valid JSON",
    ),
    (
        code::NOTFOUND,
        "Command or script was not found",
        "Check the command name or the script path",
    ),
    (
        code::TRANSPORT,
        "Connection to the server failed",
        "Check the server is running; the client reconnects on the next command",
    ),
    (
        code::TIMEOUT,
        "Server did not answer in time",
        "Increase response_timeout_ms and retry",
    ),
    (
        code::RECURSION,
        "Script includes itself directly or indirectly",
        "Remove the execute_script cycle",
    ),
    (
        code::INPUT,
        "Input stream ended or became unreadable",
        "Make sure scripts supply every line their commands read",
    ),
    (
        code::BUSY,
        "A script is already running",
        "Interrupt the running script before starting another",
    ),
    (
        code::CONFIG,
        "Invalid configuration",
        "Inspect .desk/config.toml and DESK_* environment variables",
    ),
    (
        code::INTERNAL,
        "Unexpected internal failure",
        "Inspect logs and retry command",
    ),
];

/// Get error code details (description and fix) for a given error code
#[must_use]
pub fn get_error_info(error_code: &str) -> Option<(&'static str, &'static str)> {
    ERROR_CODES
        .iter()
        .find(|(code, _, _)| *code == error_code)
        .map(|(_, desc, fix)| (*desc, *fix))
}

pub type Result<T> = std::result::Result<T, DeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_code_has_documentation() {
        for variant in [
            DeskError::Config("x".to_string()),
            DeskError::Command(CommandError::Duplicate("x".to_string())),
            DeskError::Transport(TransportError::Disconnected),
            DeskError::Script(ScriptError::Recursion("a".to_string())),
            DeskError::Input(InputError::Exhausted("stdin".to_string())),
            DeskError::Busy("x".to_string()),
            DeskError::Internal("x".to_string()),
        ] {
            assert!(
                get_error_info(variant.code()).is_some(),
                "{} has no ERROR_CODES entry",
                variant.code()
            );
        }
    }

    #[test]
    fn timeouts_are_distinguished_from_other_transport_failures() {
        let timeout = DeskError::Transport(TransportError::Timeout {
            what: "response".to_string(),
            after: Duration::from_millis(250),
        });
        assert_eq!(timeout.code(), code::TIMEOUT);
        assert_eq!(timeout.to_string(), "Timed out after 250ms waiting for response");
        assert_eq!(
            DeskError::Transport(TransportError::Closed).code(),
            code::TRANSPORT
        );
    }

    #[test]
    fn exit_codes_are_non_zero() {
        let errors = [
            DeskError::Config("x".to_string()),
            DeskError::Script(ScriptError::NotFound("a.txt".to_string())),
            DeskError::Rejected {
                cmd: "add".to_string(),
                code: "INVALID".to_string(),
                msg: "bad".to_string(),
            },
        ];
        assert!(errors.iter().all(|e| e.exit_code() != 0));
    }
}
