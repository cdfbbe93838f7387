use super::{CallStack, Dispatcher, ErrorPolicy, InputStack, PROMPT};
use crate::command::Invocation;
use crate::types::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct InteractiveRunner {
    dispatcher: Arc<Dispatcher>,
}

impl InteractiveRunner {
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Reads and executes lines until the terminate command or end of input.
    pub async fn run(&self, input: &mut InputStack) -> ExitCode {
        drive(&self.dispatcher, input, &CallStack::new()).await
    }

    /// Executes a single line, as `desk exec` does.
    pub async fn run_line(&self, line: &str, input: &mut InputStack) -> ExitCode {
        let invocation = Invocation::parse(line);
        match self
            .dispatcher
            .execute(&invocation, input, &CallStack::new())
            .await
        {
            Ok(code) => code,
            Err(err) => {
                self.dispatcher.console().print_error(&err.to_string());
                ExitCode::Error
            }
        }
    }
}

pub(super) async fn drive(
    dispatcher: &Dispatcher,
    input: &mut InputStack,
    calls: &CallStack,
) -> ExitCode {
    loop {
        if input.is_interactive() {
            dispatcher.console().print_prompt(PROMPT);
        }
        let line = match input.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(source = ?input.current_name(), "end of input");
                return ExitCode::Ok;
            }
            Err(err) => {
                dispatcher.console().print_error(&err.to_string());
                return ExitCode::Error;
            }
        };

        let invocation = Invocation::parse(&line);
        match dispatcher.execute(&invocation, input, calls).await {
            Ok(_) if dispatcher.is_shut_down() => {
                warn!(command = %invocation.name(), "emergency shutdown ran; leaving the loop");
                return ExitCode::Error;
            }
            Ok(ExitCode::Exit) => return ExitCode::Exit,
            Ok(ExitCode::Error) if dispatcher.error_policy() == ErrorPolicy::Abort => {
                warn!(command = %invocation.name(), "stopping after failed command");
                return ExitCode::Error;
            }
            Ok(_) => {}
            Err(err) => {
                dispatcher.console().print_error(&err.to_string());
                return ExitCode::Error;
            }
        }
    }
}
