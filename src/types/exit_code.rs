use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of executing one line, one command or one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExitCode {
    #[default]
    Ok,
    Error,
    Exit,
}

impl ExitCode {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// `Error` and `Exit` both end the current run; only `Ok` continues.
    #[must_use]
    pub const fn stops_run(self) -> bool {
        !self.is_ok()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Exit => "exit",
        }
    }

    /// Process exit status for a run that ended with this code.
    #[must_use]
    pub const fn process_status(self) -> u8 {
        match self {
            Self::Ok | Self::Exit => 0,
            Self::Error => 1,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ExitCode;

    #[test]
    fn only_ok_continues_a_run() {
        assert!(!ExitCode::Ok.stops_run());
        assert!(ExitCode::Error.stops_run());
        assert!(ExitCode::Exit.stops_run());
    }

    #[test]
    fn operator_exit_is_a_successful_process_status() {
        assert_eq!(ExitCode::Exit.process_status(), 0);
        assert_eq!(ExitCode::Error.process_status(), 1);
    }
}
