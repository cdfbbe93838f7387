use super::{parse_id, parse_payload, Arity, Command, Invocation};
use crate::error::CommandError;
use crate::types::Request;
use serde_json::json;
use std::sync::Arc;

/// A command with no arguments whose request is just its name.
#[derive(Debug, Clone, Copy)]
pub struct Plain {
    name: &'static str,
    summary: &'static str,
}

impl Plain {
    #[must_use]
    pub const fn new(name: &'static str, summary: &'static str) -> Self {
        Self { name, summary }
    }
}

impl Command for Plain {
    fn name(&self) -> &'static str {
        self.name
    }

    fn summary(&self) -> &'static str {
        self.summary
    }

    fn arity(&self) -> Arity {
        Arity::exact(0)
    }

    fn build(&self, _invocation: &Invocation, _supplied: Option<&str>) -> Result<Request, CommandError> {
        Ok(Request::new(self.name))
    }
}

/// `add` / `add_if_min`: record payload inline, or read as the next input line.
#[derive(Debug, Clone, Copy)]
pub struct RecordCommand {
    name: &'static str,
    summary: &'static str,
}

impl RecordCommand {
    #[must_use]
    pub const fn new(name: &'static str, summary: &'static str) -> Self {
        Self { name, summary }
    }
}

impl Command for RecordCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn summary(&self) -> &'static str {
        self.summary
    }

    fn arity(&self) -> Arity {
        Arity::at_least(0)
    }

    fn reads_input(&self, invocation: &Invocation) -> bool {
        invocation.raw().is_empty()
    }

    fn build(&self, invocation: &Invocation, supplied: Option<&str>) -> Result<Request, CommandError> {
        let raw = supplied.unwrap_or_else(|| invocation.raw());
        let payload = parse_payload(self.name, raw.trim())?;
        Ok(Request::new(self.name).with_payload(payload))
    }
}

/// `update <id> [payload]`
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

impl Command for Update {
    fn name(&self) -> &'static str {
        "update"
    }

    fn summary(&self) -> &'static str {
        "update <id> [json]: replace the record with the given id"
    }

    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }

    fn reads_input(&self, invocation: &Invocation) -> bool {
        invocation.remainder_after(1).is_empty()
    }

    fn build(&self, invocation: &Invocation, supplied: Option<&str>) -> Result<Request, CommandError> {
        let id_token = invocation.tokens().first().copied().unwrap_or_default();
        let id = parse_id(self.name(), id_token)?;
        let raw = supplied.unwrap_or_else(|| invocation.remainder_after(1));
        let payload = parse_payload(self.name(), raw.trim())?;
        Ok(Request::new(self.name())
            .with_args([id.to_string()])
            .with_payload(payload))
    }
}

/// `remove_by_id <id>`
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveById;

impl Command for RemoveById {
    fn name(&self) -> &'static str {
        "remove_by_id"
    }

    fn summary(&self) -> &'static str {
        "remove_by_id <id>: delete one of your records"
    }

    fn arity(&self) -> Arity {
        Arity::exact(1)
    }

    fn build(&self, invocation: &Invocation, _supplied: Option<&str>) -> Result<Request, CommandError> {
        let id = parse_id(self.name(), invocation.raw())?;
        Ok(Request::new(self.name()).with_args([id.to_string()]))
    }
}

/// `login` / `register <username> <password>`
#[derive(Debug, Clone, Copy)]
pub struct Account {
    name: &'static str,
    summary: &'static str,
}

impl Account {
    #[must_use]
    pub const fn new(name: &'static str, summary: &'static str) -> Self {
        Self { name, summary }
    }
}

impl Command for Account {
    fn name(&self) -> &'static str {
        self.name
    }

    fn summary(&self) -> &'static str {
        self.summary
    }

    fn arity(&self) -> Arity {
        Arity::exact(2)
    }

    fn build(&self, invocation: &Invocation, _supplied: Option<&str>) -> Result<Request, CommandError> {
        let tokens = invocation.tokens();
        let (username, password) = match tokens.as_slice() {
            [username, password] => (*username, *password),
            _ => {
                return Err(CommandError::Arity {
                    command: self.name.to_string(),
                    expected: self.arity().to_string(),
                    got: tokens.len(),
                })
            }
        };
        if password.len() < 4 {
            return Err(CommandError::Validation {
                command: self.name.to_string(),
                arg: "password".to_string(),
                reason: "must be at least 4 characters".to_string(),
            });
        }
        Ok(Request::new(self.name).with_payload(json!({
            "username": username,
            "password": password,
        })))
    }
}

/// `execute_script <file>`
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteScript;

impl Command for ExecuteScript {
    fn name(&self) -> &'static str {
        "execute_script"
    }

    fn summary(&self) -> &'static str {
        "execute_script <file>: run commands from a file"
    }

    /// The whole remainder is the path, spaces included.
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }

    fn build(&self, invocation: &Invocation, _supplied: Option<&str>) -> Result<Request, CommandError> {
        if invocation.raw().is_empty() {
            return Err(CommandError::Validation {
                command: self.name().to_string(),
                arg: "file".to_string(),
                reason: "script path is empty".to_string(),
            });
        }
        Ok(Request::new(self.name()).with_args([invocation.raw()]))
    }
}

/// The command set of the ticket client.
#[must_use]
pub fn standard_commands() -> Vec<Arc<dyn Command>> {
    vec![
        Arc::new(Plain::new("help", "help: list server commands")),
        Arc::new(Plain::new("info", "info: collection type, size and init date")),
        Arc::new(Plain::new("show", "show: list every record")),
        Arc::new(RecordCommand::new("add", "add [json]: add a record")),
        Arc::new(RecordCommand::new(
            "add_if_min",
            "add_if_min [json]: add a record if it is smaller than every existing one",
        )),
        Arc::new(Update),
        Arc::new(RemoveById),
        Arc::new(Plain::new("clear", "clear: delete all of your records")),
        Arc::new(Plain::new("sum_of_price", "sum_of_price: total price of all records")),
        Arc::new(Plain::new("save", "save: flush the collection to storage")),
        Arc::new(Account::new("login", "login <username> <password>: sign in")),
        Arc::new(Account::new("register", "register <username> <password>: create an account")),
        Arc::new(ExecuteScript),
        Arc::new(Plain::new("exit", "exit: end the session")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Registry;

    fn build(line: &str, supplied: Option<&str>) -> Result<Request, CommandError> {
        let registry = Registry::standard();
        let invocation = Invocation::parse(line);
        let command = registry.resolve(invocation.name())?;
        command.validate_and_build(&invocation, supplied)
    }

    #[test]
    fn when_plain_command_gets_arguments_then_arity_error() {
        let result = build("show everything", None);
        assert!(matches!(result, Err(CommandError::Arity { got: 1, .. })));
    }

    #[test]
    fn when_add_has_inline_payload_then_no_input_is_read() {
        let invocation = Invocation::parse("add {\"name\": \"gig\"}");
        let command = RecordCommand::new("add", "");
        assert!(!command.reads_input(&invocation));

        let request = build("add {\"name\": \"gig\"}", None).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.payload, Some(json!({"name": "gig"})));
    }

    #[test]
    fn when_add_is_bare_then_supplied_line_becomes_payload() {
        assert!(RecordCommand::new("add", "").reads_input(&Invocation::parse("add")));
        let request = build("add", Some("{\"price\": 3}")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.payload, Some(json!({"price": 3})));
    }

    #[test]
    fn when_update_id_is_malformed_then_validation_error() {
        let result = build("update abc {}", None);
        assert!(matches!(result, Err(CommandError::Validation { ref arg, .. }) if arg == "id"));
    }

    #[test]
    fn when_update_is_valid_then_id_is_first_arg() {
        let request = build("update 9 {\"price\": 1}", None).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.args, vec!["9".to_string()]);
        assert!(Update.reads_input(&Invocation::parse("update 9")));
    }

    #[test]
    fn when_login_has_one_token_then_arity_error() {
        assert!(matches!(
            build("login alice", None),
            Err(CommandError::Arity { got: 1, .. })
        ));
    }

    #[test]
    fn when_login_is_valid_then_password_travels_in_payload_only() {
        let request = build("login alice secret", None).unwrap_or_else(|e| panic!("{e}"));
        assert!(request.args.is_empty());
        assert_eq!(
            request.payload,
            Some(json!({"username": "alice", "password": "secret"}))
        );
    }

    #[test]
    fn when_execute_script_has_path_then_path_is_the_arg() {
        let request = build("execute_script run.txt", None).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.args, vec!["run.txt".to_string()]);
    }

    #[test]
    fn when_script_path_contains_spaces_then_whole_remainder_is_the_path() {
        let request =
            build("execute_script my dir/run 2.txt", None).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(request.args, vec!["my dir/run 2.txt".to_string()]);
    }

    #[test]
    fn when_execute_script_has_no_path_then_arity_error() {
        assert!(matches!(
            build("execute_script", None),
            Err(CommandError::Arity { got: 0, .. })
        ));
    }
}
