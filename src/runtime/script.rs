use super::{interactive, Dispatcher, InputStack, PROMPT};
use crate::command::Invocation;
use crate::error::{InputError, ScriptError};
use crate::runtime::input::{LineSource, ReaderSource};
use crate::types::{ExitCode, ScriptId};
use rpds::HashTrieSetSync;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Boxed so that include -> run -> include can recurse.
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = ExitCode> + Send + 'a>>;

/// Scripts running on the current call path.
///
/// Each frame gets its own copy via [`CallStack::enter`], so the caller's set
/// is untouched however the frame ends, including cancellation.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    active: HashTrieSetSync<ScriptId>,
}

impl CallStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `ScriptError::Recursion` when `id` is already running.
    pub fn enter(&self, id: &ScriptId) -> Result<Self, ScriptError> {
        if self.contains(id) {
            return Err(ScriptError::Recursion(id.to_string()));
        }
        Ok(Self {
            active: self.active.insert(id.clone()),
        })
    }

    #[must_use]
    pub fn contains(&self, id: &ScriptId) -> bool {
        self.active.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

pub struct ScriptRunner {
    dispatcher: Arc<Dispatcher>,
}

impl ScriptRunner {
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Runs `path` as a top-level script. `input` is what it falls back to
    /// if its own source breaks.
    pub async fn run(&self, path: &str, input: &mut InputStack) -> ExitCode {
        self.run_with(path, input, &CallStack::new()).await
    }

    pub async fn run_with(&self, path: &str, input: &mut InputStack, calls: &CallStack) -> ExitCode {
        run_script(&self.dispatcher, ScriptId::new(path), input, calls).await
    }
}

pub(super) fn run_script<'a>(
    dispatcher: &'a Dispatcher,
    id: ScriptId,
    input: &'a mut InputStack,
    calls: &'a CallStack,
) -> RunFuture<'a> {
    Box::pin(async move {
        let frame_calls = match calls.enter(&id) {
            Ok(frame_calls) => frame_calls,
            Err(err) => return dispatcher.fail(err.into()),
        };
        let source = match open(&id).await {
            Ok(source) => source,
            Err(err) => return dispatcher.fail(err.into()),
        };
        info!(script = %id, depth = frame_calls.len(), "script started");

        let outcome = {
            let mut frame = input.push(source);
            replay(dispatcher, &mut frame, &frame_calls).await
        };

        let code = match outcome {
            Ok(code) => code,
            Err(err) => recover(dispatcher, err, input, calls).await,
        };
        info!(script = %id, exit = %code, "script finished");
        code
    })
}

async fn open(id: &ScriptId) -> Result<Box<dyn LineSource>, ScriptError> {
    for candidate in id.candidate_paths() {
        match ReaderSource::open(&candidate).await {
            Ok(source) => return Ok(Box::new(source)),
            Err(err) => warn!(path = %candidate.display(), error = %err, "script not readable"),
        }
    }
    Err(ScriptError::NotFound(id.to_string()))
}

/// Echoes and executes each line of the active source until it ends or a
/// line yields a non-OK code.
async fn replay(
    dispatcher: &Dispatcher,
    input: &mut InputStack,
    calls: &CallStack,
) -> Result<ExitCode, InputError> {
    let mut read_any = false;
    loop {
        let Some(line) = input.read_line().await? else {
            if read_any {
                return Ok(ExitCode::Ok);
            }
            return Err(InputError::Exhausted(format!(
                "{} is empty",
                input.current_name().unwrap_or("script")
            )));
        };
        read_any = true;

        let invocation = Invocation::parse(&line);
        if invocation.is_blank() {
            continue;
        }
        dispatcher
            .console()
            .println(&format!("{PROMPT}{invocation}"));

        let code = dispatcher.execute(&invocation, input, calls).await?;
        if code.stops_run() {
            return Ok(code);
        }
    }
}

/// Continues on whatever drove input before the failed script. A previous
/// source that has simply ended fails the run; one that cannot be read at
/// all (or is missing) shuts down.
fn recover<'a>(
    dispatcher: &'a Dispatcher,
    err: InputError,
    input: &'a mut InputStack,
    calls: &'a CallStack,
) -> RunFuture<'a> {
    Box::pin(async move {
        dispatcher.console().print_error(&err.to_string());
        match input.probe().await {
            Ok(true) => {}
            Ok(false) => {
                warn!(error = %err, source = ?input.current_name(), "previous input source has ended");
                return ExitCode::Error;
            }
            Err(unusable) => {
                warn!(error = %unusable, "previous input source is unusable");
                return emergency_shutdown(dispatcher, input, calls).await;
            }
        }
        warn!(error = %err, source = ?input.current_name(), "resuming from previous input source");
        if input.is_interactive() {
            return interactive::drive(dispatcher, input, calls).await;
        }
        match replay(dispatcher, input, calls).await {
            Ok(code) => code,
            Err(err) => recover(dispatcher, err, input, calls).await,
        }
    })
}

/// Flushes server state and terminates the session. Always `ExitCode::Error`;
/// the dispatcher stays shut down so no loop above this frame reads on.
async fn emergency_shutdown(
    dispatcher: &Dispatcher,
    input: &mut InputStack,
    calls: &CallStack,
) -> ExitCode {
    error!("no usable input source left; emergency shutdown");
    dispatcher.mark_shut_down();
    dispatcher
        .console()
        .print_error("No usable input left. Saving and shutting down.");

    let controls = dispatcher.controls().clone();
    let mut shutdown = Vec::with_capacity(2);
    if let Some(save) = controls.save {
        shutdown.push(save);
    }
    shutdown.push(controls.exit);

    for name in shutdown {
        if let Err(err) = dispatcher
            .execute(&Invocation::new(name.as_str(), ""), input, calls)
            .await
        {
            warn!(command = %name, error = %err, "shutdown command failed");
        }
    }
    ExitCode::Error
}
