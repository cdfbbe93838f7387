#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Named operations: argument validation and request construction.
//!
//! A [`Command`] never performs I/O. Commands that need a record payload and
//! were not given one inline declare it through [`Command::reads_input`]; the
//! runner then reads exactly one line from whatever input source is active and
//! hands it to [`Command::validate_and_build`].

mod builtin;
mod registry;

pub use builtin::{standard_commands, Account, ExecuteScript, Plain, RecordCommand, RemoveById, Update};
pub use registry::Registry;

use crate::error::CommandError;
use crate::types::Request;
use serde_json::Value;
use std::fmt;

/// One parsed line: command name plus the raw remainder as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    name: String,
    raw: String,
}

impl Invocation {
    /// Splits on the first space; both halves are trimmed.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (name, raw) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        Self {
            name: name.to_string(),
            raw: raw.trim().to_string(),
        }
    }

    #[must_use]
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into().trim().to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
    }

    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        self.raw.split_whitespace().collect()
    }

    /// Text left after skipping `count` leading tokens.
    #[must_use]
    pub fn remainder_after(&self, count: usize) -> &str {
        let mut rest = self.raw.as_str();
        for _ in 0..count {
            rest = rest.trim_start();
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            rest = &rest[end..];
        }
        rest.trim()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} {}", self.name, self.raw)
        }
    }
}

/// Accepted token count for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    min: usize,
    max: Option<usize>,
}

impl Arity {
    #[must_use]
    pub const fn exact(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Leading tokens followed by free-form text such as a JSON payload.
    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    #[must_use]
    pub const fn accepts(&self, got: usize) -> bool {
        got >= self.min
            && match self.max {
                Some(max) => got <= max,
                None => true,
            }
    }

    /// # Errors
    /// Returns `CommandError::Arity` when `got` is outside the accepted range.
    pub fn check(&self, command: &str, got: usize) -> Result<(), CommandError> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(CommandError::Arity {
                command: command.to_string(),
                expected: self.to_string(),
                got,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..={max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn summary(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Whether building this invocation needs one more line from the active input source.
    fn reads_input(&self, _invocation: &Invocation) -> bool {
        false
    }

    /// Builds the request once arity has been checked. `supplied` is the extra
    /// input line when [`Command::reads_input`] asked for one.
    ///
    /// # Errors
    /// Returns `CommandError::Validation` for semantically invalid arguments.
    fn build(&self, invocation: &Invocation, supplied: Option<&str>) -> Result<Request, CommandError>;

    /// # Errors
    /// Returns `CommandError::Arity` or `CommandError::Validation`.
    fn validate_and_build(
        &self,
        invocation: &Invocation,
        supplied: Option<&str>,
    ) -> Result<Request, CommandError> {
        self.arity()
            .check(self.name(), invocation.tokens().len())?;
        self.build(invocation, supplied)
    }
}

/// # Errors
/// Returns `CommandError::Validation` unless `raw` is a strictly positive integer.
pub fn parse_id(command: &str, raw: &str) -> Result<i64, CommandError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CommandError::Validation {
            command: command.to_string(),
            arg: "id".to_string(),
            reason: format!("'{raw}' is not a positive integer"),
        })
}

/// # Errors
/// Returns `CommandError::Validation` unless `raw` is a JSON object.
pub fn parse_payload(command: &str, raw: &str) -> Result<Value, CommandError> {
    let invalid = |reason: String| CommandError::Validation {
        command: command.to_string(),
        arg: "payload".to_string(),
        reason,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(invalid(format!("expected a JSON object, got {other}"))),
        Err(err) => Err(invalid(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_id, parse_payload, Arity, Invocation};
    use crate::error::CommandError;

    #[test]
    fn invocation_splits_name_from_remainder() {
        let inv = Invocation::parse("  update 4 {\"price\": 10}  ");
        assert_eq!(inv.name(), "update");
        assert_eq!(inv.raw(), "4 {\"price\": 10}");
        assert_eq!(inv.tokens().len(), 3);
        assert_eq!(inv.remainder_after(1), "{\"price\": 10}");
    }

    #[test]
    fn blank_line_has_blank_name() {
        assert!(Invocation::parse("   ").is_blank());
        assert!(!Invocation::parse("show").is_blank());
    }

    #[test]
    fn arity_rejects_too_few_and_too_many() {
        let arity = Arity::exact(1);
        assert!(matches!(
            arity.check("remove_by_id", 0),
            Err(CommandError::Arity { got: 0, .. })
        ));
        assert!(arity.check("remove_by_id", 1).is_ok());
        assert!(matches!(
            arity.check("remove_by_id", 2),
            Err(CommandError::Arity { got: 2, .. })
        ));
    }

    #[test]
    fn arity_renders_expected_range() {
        assert_eq!(Arity::exact(2).to_string(), "2");
        assert_eq!(Arity::between(0, 1).to_string(), "0..=1");
        assert_eq!(Arity::at_least(1).to_string(), "at least 1");
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("update", "12"), Ok(12));
        assert!(parse_id("update", "0").is_err());
        assert!(parse_id("update", "-3").is_err());
        assert!(parse_id("update", "x1").is_err());
    }

    #[test]
    fn payload_must_be_an_object() {
        assert!(parse_payload("add", "{\"name\":\"a\"}").is_ok());
        assert!(parse_payload("add", "[1,2]").is_err());
        assert!(parse_payload("add", "{broken").is_err());
    }
}
