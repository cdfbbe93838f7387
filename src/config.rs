#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::error::{DeskError, Result};
use crate::runtime::{ControlNames, ErrorPolicy, OutputFormat};
use crate::session::{RetryPolicy, SessionOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = ".desk/config.toml";

/// Environment variable for each settings key.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("DESK_SERVER", "server_addr"),
    ("DESK_CONNECT_TIMEOUT_MS", "connect_timeout_ms"),
    ("DESK_RESPONSE_TIMEOUT_MS", "response_timeout_ms"),
    ("DESK_RETRY_INTERVAL_MS", "retry_interval_ms"),
    ("DESK_MAX_RETRIES", "max_retries"),
    ("DESK_SAVE_CMD", "save_cmd"),
    ("DESK_EXIT_CMD", "exit_cmd"),
    ("DESK_SCRIPT_CMD", "script_cmd"),
    ("DESK_POLL_INTERVAL_MS", "poll_interval_ms"),
    ("DESK_OUTPUT", "output"),
    ("DESK_STOP_ON_ERROR", "stop_on_error"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Always `host:port`.
    pub server_addr: String,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub retry_interval: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    pub save_cmd: Option<String>,
    pub exit_cmd: String,
    pub script_cmd: String,
    pub poll_interval: Duration,
    pub output: OutputFormat,
    pub stop_on_error: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:4093".to_string(),
            connect_timeout: Duration::from_millis(3000),
            response_timeout: Duration::from_millis(10_000),
            retry_interval: Duration::from_millis(5000),
            max_retries: None,
            save_cmd: Some("save".to_string()),
            exit_cmd: "exit".to_string(),
            script_cmd: "execute_script".to_string(),
            poll_interval: Duration::from_millis(10_000),
            output: OutputFormat::Text,
            stop_on_error: false,
        }
    }
}

/// Defaults, then the config file, then `DESK_*` variables.
///
/// # Errors
/// Returns `DeskError::Config` if an explicitly named file cannot be read or
/// any value is malformed.
pub async fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut settings = Settings::default();

    if config_path.exists() {
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| DeskError::Config(format!("Failed to read config: {e}")))?;
        settings.apply_content(&content)?;
        debug!(path = %config_path.display(), "config file applied");
    } else if explicit {
        return Err(missing(&config_path));
    }

    settings.apply_env(non_empty_env_var)?;
    Ok(settings)
}

fn missing(path: &Path) -> DeskError {
    DeskError::Config(format!("Config file not found: {}", path.display()))
}

impl Settings {
    /// # Errors
    /// Returns `DeskError::Config` naming the first malformed line.
    pub fn apply_content(&mut self, content: &str) -> Result<()> {
        for line in content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
        {
            let Some((key, _)) = line.split_once('=') else {
                warn!(line, "ignoring config line without '='");
                continue;
            };
            let key = key.trim();
            if let Some(value) = parse_key_value(line, key) {
                self.apply(key, &expand_env_vars(value))?;
            }
        }
        Ok(())
    }

    /// Applies every `DESK_*` variable `lookup` returns a value for.
    ///
    /// # Errors
    /// Returns `DeskError::Config` for a malformed value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_KEYS {
            if let Some(value) = lookup(var) {
                self.apply(key, &value)
                    .map_err(|e| DeskError::Config(format!("{var}: {e}")))?;
            }
        }
        Ok(())
    }

    /// # Errors
    /// Returns `DeskError::Config` for a malformed value.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server_addr" => self.server_addr = normalize_addr(value)?,
            "connect_timeout_ms" => self.connect_timeout = parse_millis(key, value)?,
            "response_timeout_ms" => self.response_timeout = parse_millis(key, value)?,
            "retry_interval_ms" => self.retry_interval = parse_millis(key, value)?,
            "poll_interval_ms" => self.poll_interval = parse_millis(key, value)?,
            "max_retries" => self.max_retries = parse_max_retries(value)?,
            "save_cmd" => {
                self.save_cmd = match value.trim() {
                    "" | "none" => None,
                    name => Some(name.to_string()),
                };
            }
            "exit_cmd" => self.exit_cmd = parse_name(key, value)?,
            "script_cmd" => self.script_cmd = parse_name(key, value)?,
            "output" => self.output = value.parse().map_err(DeskError::Config)?,
            "stop_on_error" => self.stop_on_error = parse_bool(key, value)?,
            other => warn!(key = other, "ignoring unknown config key"),
        }
        Ok(())
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        match self.max_retries {
            Some(max) => RetryPolicy::bounded(self.retry_interval, max),
            None => RetryPolicy::forever(self.retry_interval),
        }
    }

    #[must_use]
    pub const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            connect_timeout: self.connect_timeout,
            response_timeout: self.response_timeout,
            retry: self.retry_policy(),
        }
    }

    #[must_use]
    pub fn control_names(&self) -> ControlNames {
        ControlNames {
            exit: self.exit_cmd.clone(),
            include: self.script_cmd.clone(),
            save: self.save_cmd.clone(),
        }
    }

    #[must_use]
    pub const fn error_policy(&self) -> ErrorPolicy {
        if self.stop_on_error {
            ErrorPolicy::Abort
        } else {
            ErrorPolicy::Continue
        }
    }
}

/// Accepts `host:port` or `tcp://host:port`; returns `host:port`.
///
/// # Errors
/// Returns `DeskError::Config` for other schemes or a missing host or port.
pub fn normalize_addr(value: &str) -> Result<String> {
    let value = value.trim();
    let with_scheme = if value.contains("://") {
        value.to_string()
    } else {
        format!("tcp://{value}")
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| DeskError::Config(format!("Invalid server address '{value}': {e}")))?;
    if url.scheme() != "tcp" {
        return Err(DeskError::Config(format!(
            "Unsupported scheme '{}' in server address (use tcp)",
            url.scheme()
        )));
    }
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) if !host.is_empty() => Ok(format!("{host}:{port}")),
        _ => Err(DeskError::Config(format!(
            "Server address '{value}' needs a host and a port"
        ))),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| DeskError::Config(format!("{key} must be a number of milliseconds, got '{value}'")))
}

fn parse_max_retries(value: &str) -> Result<Option<u32>> {
    match value.trim() {
        "forever" | "none" => Ok(None),
        count => match count.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(DeskError::Config(format!(
                "max_retries must be a positive number or 'forever', got '{value}'"
            ))),
        },
    }
}

fn parse_name(key: &str, value: &str) -> Result<String> {
    let name = value.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(DeskError::Config(format!("{key} must be a single word")));
    }
    Ok(name.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(DeskError::Config(format!("{key} must be true or false, got '{other}'"))),
    }
}

fn expand_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_part = &result[start + 2..start + end];
            let (var_name, default) = var_part.split_once(":-").unwrap_or((var_part, ""));
            let value = std::env::var(var_name).unwrap_or_else(|_| default.to_string());
            result.replace_range(start..=(start + end), &value);
        } else {
            break;
        }
    }
    result
}

#[must_use]
pub fn parse_key_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split_once('=')
        .and_then(|(lhs, rhs)| (lhs.trim() == key).then_some(rhs.trim().trim_matches('"')))
}

fn non_empty_env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
