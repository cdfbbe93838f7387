#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use desk::cli::{parse_cli_args, usage, CliAction, CliError, GlobalOptions, Mode};
use desk::error::{code, get_error_info};
use desk::runtime::ReaderSource;
use desk::{
    load_settings, DeskError, Dispatcher, ExitCode, InputStack, InteractiveRunner, Registry,
    ScriptRunner, Session, StdConsole,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = match parse_cli_args(&args) {
        Ok(action) => action,
        Err(err) => return cli_failure(&err),
    };

    match action {
        CliAction::ShowHelp => {
            println!("{}", usage());
            std::process::ExitCode::SUCCESS
        }
        CliAction::ShowVersion => {
            println!("desk {}", env!("CARGO_PKG_VERSION"));
            std::process::ExitCode::SUCCESS
        }
        CliAction::Run { mode, options } => match run(mode, options).await {
            Ok(code) => std::process::ExitCode::from(code.process_status()),
            Err(err) => failure(&err),
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mode: Mode, options: GlobalOptions) -> desk::Result<ExitCode> {
    let mut settings = load_settings(options.config.clone()).await?;
    options.apply_to(&mut settings)?;

    let session = Arc::new(Session::tcp(
        settings.server_addr.clone(),
        settings.session_options(),
    ));
    let dispatcher = Arc::new(
        Dispatcher::new(
            Arc::new(Registry::standard()),
            Arc::clone(&session),
            Arc::new(StdConsole::new(settings.output)),
        )
        .with_controls(settings.control_names())?
        .with_error_policy(settings.error_policy()),
    );
    match session.connect().await {
        Ok(()) => info!(server = %session.endpoint(), "connected"),
        Err(err) => warn!(
            server = %session.endpoint(),
            error = %err,
            "server unreachable; will reconnect on first command"
        ),
    }

    let mut input = InputStack::new(Box::new(ReaderSource::stdin()));

    let code = match mode {
        Mode::Interactive => InteractiveRunner::new(dispatcher).run(&mut input).await,
        Mode::Script { file } => {
            ScriptRunner::new(dispatcher)
                .run(&file.to_string_lossy(), &mut input)
                .await
        }
        Mode::Exec { line } => InteractiveRunner::new(dispatcher).run_line(&line, &mut input).await,
    };

    session.disconnect().await;
    info!(exit = %code, "session ended");
    Ok(code)
}

fn cli_failure(err: &CliError) -> std::process::ExitCode {
    eprintln!("{err}");
    if let Some((_, fix)) = get_error_info(code::CLI_ERROR) {
        eprintln!("{fix}");
    }
    std::process::ExitCode::from(2)
}

fn failure(err: &DeskError) -> std::process::ExitCode {
    eprintln!("[{}] {err}", err.code());
    if let Some((_, fix)) = get_error_info(err.code()) {
        eprintln!("{fix}");
    }
    std::process::ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
}
