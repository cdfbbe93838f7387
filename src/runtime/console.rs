use crate::types::Response;
use serde_json::json;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (use text or json)")),
        }
    }
}

/// Operator-visible output. Logs go through `tracing`, not here.
pub trait Console: Send + Sync {
    fn println(&self, line: &str);

    fn print_error(&self, line: &str);

    /// Shown before reading from an interactive source.
    fn print_prompt(&self, _prompt: &str) {}

    fn report(&self, command: &str, response: &Response) {
        let _ = command;
        if response.is_success() {
            self.println(&response.to_string());
        } else {
            self.print_error(&response.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole {
    format: OutputFormat,
}

impl StdConsole {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Console for StdConsole {
    fn println(&self, line: &str) {
        println!("{line}");
    }

    fn print_error(&self, line: &str) {
        eprintln!("{line}");
    }

    fn print_prompt(&self, prompt: &str) {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{prompt}");
        let _ = stdout.flush();
    }

    fn report(&self, command: &str, response: &Response) {
        match self.format {
            OutputFormat::Text if response.is_success() => self.println(&response.to_string()),
            OutputFormat::Text => self.print_error(&response.to_string()),
            OutputFormat::Json => self.println(
                &json!({
                    "command": command,
                    "status": if response.is_success() { "ok" } else { "error" },
                    "response": response,
                })
                .to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Out(String),
    Err(String),
}

impl ConsoleLine {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Out(text) | Self::Err(text) => text,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Err(_))
    }
}

/// Captures output in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl MemoryConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(ConsoleLine::is_error)
            .map(|line| line.text().to_string())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.text().contains(needle))
    }

    fn push(&self, line: ConsoleLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl Console for MemoryConsole {
    fn println(&self, line: &str) {
        self.push(ConsoleLine::Out(line.to_string()));
    }

    fn print_error(&self, line: &str) {
        self.push(ConsoleLine::Err(line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::{Console, MemoryConsole, OutputFormat};
    use crate::types::Response;

    #[test]
    fn output_format_parses_known_names() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn failed_responses_are_reported_as_errors() {
        let console = MemoryConsole::new();
        console.report("show", &Response::success(None, "empty"));
        console.report("clear", &Response::error(None, "UNAUTHORIZED", "login first"));

        assert_eq!(console.lines().len(), 2);
        assert_eq!(console.errors(), vec!["[UNAUTHORIZED] login first".to_string()]);
    }
}
