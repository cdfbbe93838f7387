#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Line execution shared by the interactive and script runners.
//!
//! Every line goes resolve -> validate/build -> repair-if-needed -> send ->
//! report. The terminate and include commands take the same path up to the
//! send; what happens after the send is what makes them special.

mod console;
mod input;
mod interactive;
mod script;

pub use console::{Console, ConsoleLine, MemoryConsole, OutputFormat, StdConsole};
pub use input::{InputFrame, InputFuture, InputStack, LineSource, ReaderSource};
pub use interactive::InteractiveRunner;
pub use script::{CallStack, RunFuture, ScriptRunner};

use crate::command::{Command, Invocation, Registry};
use crate::error::{CommandError, DeskError, InputError, ScriptError, TransportError};
use crate::session::Session;
use crate::types::{Credentials, ExitCode, Identity, Request, Response, ScriptId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub const PROMPT: &str = "$ ";
const PAYLOAD_PROMPT: &str = "json> ";

/// Command names with control-flow meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNames {
    pub exit: String,
    pub include: String,
    /// Flushed before an emergency shutdown; `None` skips the flush.
    pub save: Option<String>,
}

impl Default for ControlNames {
    fn default() -> Self {
        Self {
            exit: "exit".to_string(),
            include: "execute_script".to_string(),
            save: Some("save".to_string()),
        }
    }
}

/// What the interactive loop does after a line ends in `ExitCode::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Announce {
    Console,
    Quiet,
}

#[derive(Debug, Clone)]
struct Principal {
    identity: Identity,
    credentials: Credentials,
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    session: Arc<Session>,
    console: Arc<dyn Console>,
    controls: ControlNames,
    error_policy: ErrorPolicy,
    principal: watch::Sender<Option<Principal>>,
    shut_down: AtomicBool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<Registry>, session: Arc<Session>, console: Arc<dyn Console>) -> Self {
        let (principal, _) = watch::channel(None);
        Self {
            registry,
            session,
            console,
            controls: ControlNames::default(),
            error_policy: ErrorPolicy::default(),
            principal,
            shut_down: AtomicBool::new(false),
        }
    }

    /// # Errors
    /// Returns `DeskError::Config` when a control name is not a registered
    /// command, or when exit and include share a name.
    pub fn with_controls(mut self, controls: ControlNames) -> crate::Result<Self> {
        let roles = [
            ("exit_cmd", Some(&controls.exit)),
            ("script_cmd", Some(&controls.include)),
            ("save_cmd", controls.save.as_ref()),
        ];
        for (key, name) in roles {
            let Some(name) = name else { continue };
            if self.registry.resolve(name).is_err() {
                return Err(DeskError::Config(format!(
                    "{key} names '{name}', which is not a registered command"
                )));
            }
        }
        if controls.exit == controls.include {
            return Err(DeskError::Config(format!(
                "exit_cmd and script_cmd both name '{}'",
                controls.exit
            )));
        }
        self.controls = controls;
        Ok(self)
    }

    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[must_use]
    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    #[must_use]
    pub const fn controls(&self) -> &ControlNames {
        &self.controls
    }

    #[must_use]
    pub const fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// The principal recorded by the last successful login or register.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.principal
            .borrow()
            .as_ref()
            .map(|principal| principal.identity.clone())
    }

    pub fn logout(&self) {
        self.principal.send_replace(None);
    }

    /// Set once an emergency shutdown has run. Interactive loops stop on it.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn mark_shut_down(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    fn credentials(&self) -> Option<Credentials> {
        self.principal
            .borrow()
            .as_ref()
            .map(|principal| principal.credentials.clone())
    }

    /// One command for callers without an input source or console, such as a GUI.
    ///
    /// # Errors
    /// Returns the local validation failure, or the transport failure after repair.
    pub async fn call(&self, invocation: &Invocation) -> crate::Result<Response> {
        let command = self.registry.resolve(invocation.name())?;
        command
            .arity()
            .check(command.name(), invocation.tokens().len())?;
        if command.reads_input(invocation) {
            return Err(CommandError::Validation {
                command: command.name().to_string(),
                arg: "payload".to_string(),
                reason: "payload must be given inline".to_string(),
            }
            .into());
        }
        let request = command.validate_and_build(invocation, None)?;
        self.transmit(request, Announce::Quiet).await
    }

    /// Executes one line against `input`, the runner's current input stack.
    ///
    /// Local and transport failures are reported and folded into
    /// `ExitCode::Error`.
    ///
    /// # Errors
    /// Only when the input source itself fails while a command reads from it.
    pub async fn execute(
        &self,
        invocation: &Invocation,
        input: &mut InputStack,
        calls: &CallStack,
    ) -> Result<ExitCode, InputError> {
        if invocation.is_blank() {
            return Ok(ExitCode::Ok);
        }

        let command = match self.registry.resolve(invocation.name()) {
            Ok(command) => command,
            Err(err) => return Ok(self.fail(err.into())),
        };

        if invocation.name() == self.controls.include {
            return Ok(self.include(command.as_ref(), invocation, input, calls).await);
        }
        if invocation.name() == self.controls.exit {
            return Ok(self.terminate(command.as_ref(), invocation).await);
        }

        if let Err(err) = command
            .arity()
            .check(command.name(), invocation.tokens().len())
        {
            return Ok(self.fail(err.into()));
        }

        let supplied = if command.reads_input(invocation) {
            if input.is_interactive() {
                self.console.print_prompt(PAYLOAD_PROMPT);
            }
            match input.read_line().await? {
                Some(line) => Some(line),
                None => {
                    return Err(InputError::Exhausted(format!(
                        "{} expected a record line from {}",
                        command.name(),
                        input.current_name().unwrap_or("input")
                    )))
                }
            }
        } else {
            None
        };

        let request = match command.validate_and_build(invocation, supplied.as_deref()) {
            Ok(request) => request,
            Err(err) => return Ok(self.fail(err.into())),
        };

        match self.transmit(request, Announce::Console).await {
            Ok(response) => {
                self.console.report(command.name(), &response);
                Ok(ExitCode::Ok)
            }
            Err(err) => Ok(self.fail(err)),
        }
    }

    async fn include(
        &self,
        command: &dyn Command,
        invocation: &Invocation,
        input: &mut InputStack,
        calls: &CallStack,
    ) -> ExitCode {
        let request = match command.validate_and_build(invocation, None) {
            Ok(request) => request,
            Err(err) => return self.fail(err.into()),
        };
        let target = ScriptId::new(invocation.raw());
        if calls.contains(&target) {
            return self.fail(ScriptError::Recursion(target.to_string()).into());
        }
        self.bookkeeping(request).await;
        script::run_script(self, target, input, calls).await
    }

    async fn terminate(&self, command: &dyn Command, invocation: &Invocation) -> ExitCode {
        match command.validate_and_build(invocation, None) {
            Ok(request) => {
                self.bookkeeping(request).await;
                ExitCode::Exit
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Sends a control command's request. A down link gets one connect
    /// attempt, bounded by the connect timeout, and never the repair loop.
    async fn bookkeeping(&self, request: Request) {
        if let Err(err) = self.session.connect().await {
            debug!(cmd = %request.cmd, error = %err, "not connected; control request not transmitted");
            return;
        }
        let cmd = request.cmd.clone();
        match self.session.send(&request.with_auth(self.credentials())).await {
            Ok(response) => self.console.report(&cmd, &response),
            Err(err) => self.console.print_error(&err.to_string()),
        }
    }

    async fn transmit(&self, request: Request, announce: Announce) -> crate::Result<Response> {
        self.ensure_connected(announce).await?;
        let request = request.with_auth(self.credentials());
        let response = self.session.send(&request).await?;
        self.remember_principal(&request, &response);
        Ok(response)
    }

    async fn ensure_connected(&self, announce: Announce) -> Result<(), TransportError> {
        if self.session.is_connected() {
            return Ok(());
        }
        if announce == Announce::Quiet {
            return self.session.repair_connection().await;
        }
        self.console
            .print_error("No connection to server. Trying to reconnect...");
        let console = Arc::clone(&self.console);
        self.session
            .repair_connection_with(move |attempt, err| {
                console.print_error(&format!("Reconnect attempt {attempt} failed: {err}"));
            })
            .await?;
        self.console.println("Connection to server restored.");
        Ok(())
    }

    fn remember_principal(&self, request: &Request, response: &Response) {
        if !response.is_success() || !matches!(request.cmd.as_str(), "login" | "register") {
            return;
        }
        let field = |name: &str| {
            request
                .payload
                .as_ref()
                .and_then(|payload| payload.get(name))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        let (Some(username), Some(password)) = (field("username"), field("password")) else {
            return;
        };
        let user_id = response
            .data()
            .and_then(|data| data.get("user_id"))
            .and_then(serde_json::Value::as_i64);
        info!(%username, ?user_id, "signed in");
        self.principal.send_replace(Some(Principal {
            identity: Identity::new(username.clone(), user_id),
            credentials: Credentials::new(username, password),
        }));
    }

    fn fail(&self, err: DeskError) -> ExitCode {
        self.console.print_error(&err.to_string());
        if let DeskError::Command(CommandError::Unknown { suggestions, .. }) = &err {
            if !suggestions.is_empty() {
                self.console
                    .print_error(&format!("Did you mean: {}?", suggestions.join(", ")));
            }
        }
        ExitCode::Error
    }
}
