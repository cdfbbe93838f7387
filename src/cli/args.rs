#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::parser::CliError;

pub const GLOBAL_FLAGS: &[&str] = &[
    "--config",
    "--server",
    "--output",
    "--stop-on-error",
    "--connect-timeout-ms",
    "--retry-interval-ms",
    "--max-retries",
];

const MODES: &[&str] = &["script", "exec"];

/// # Errors
/// Returns `CliError::UnknownFlag` for the first flag outside `allowed_flags`
/// and [`GLOBAL_FLAGS`].
pub fn ensure_no_unknown_flags(args: &[String], allowed_flags: &[&str]) -> Result<(), CliError> {
    let mut expecting_value = false;
    for arg in args {
        if std::mem::take(&mut expecting_value) {
            continue;
        }
        if !arg.starts_with("--") {
            continue;
        }
        let known = allowed_flags
            .iter()
            .chain(GLOBAL_FLAGS)
            .any(|allowed| allowed == &arg.as_str());
        if !known {
            return Err(CliError::UnknownFlag { flag: arg.clone() });
        }
        expecting_value = arg != "--stop-on-error";
    }
    Ok(())
}

#[must_use]
pub fn suggest_modes(typo: &str) -> Vec<String> {
    MODES
        .iter()
        .map(|mode| (mode, strsim::levenshtein(typo, mode)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(mode, _)| vec![(*mode).to_string()])
        .unwrap_or_default()
}
