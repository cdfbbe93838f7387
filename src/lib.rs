pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod runtime;
pub mod session;
pub mod types;

pub use client::{DeskClient, Poller, Replace, ScriptSlot};
pub use command::{Command, Invocation, Registry};
pub use config::{load_settings, Settings};
pub use error::{DeskError, Result};
pub use runtime::{
    CallStack, Console, ControlNames, Dispatcher, ErrorPolicy, InputStack, InteractiveRunner,
    ScriptRunner, StdConsole,
};
pub use session::{RetryPolicy, Session, SessionOptions, SessionState};
pub use types::*;
