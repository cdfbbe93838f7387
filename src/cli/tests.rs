#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

#[cfg(test)]
mod bdd_tests {
    #![allow(clippy::expect_used)]

    use crate::cli::{parse_cli_args, CliAction, CliError, GlobalOptions, Mode};
    use crate::config::Settings;
    use crate::runtime::OutputFormat;
    use std::path::PathBuf;
    use std::time::Duration;

    fn given_cli_args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn run_parts(action: CliAction) -> (Mode, GlobalOptions) {
        match action {
            CliAction::Run { mode, options } => (mode, options),
            other => (Mode::Exec { line: format!("{other:?}") }, GlobalOptions::default()),
        }
    }

    #[test]
    fn when_no_args_then_interactive_with_defaults() {
        let args = given_cli_args(&[]);
        let action = parse_cli_args(&args).expect("parse");

        assert_eq!(
            action,
            CliAction::Run {
                mode: Mode::Interactive,
                options: GlobalOptions::default()
            }
        );
    }

    #[test]
    fn when_help_flag_anywhere_then_show_help() {
        let args = given_cli_args(&["script", "--file", "a.txt", "-h"]);
        let action = parse_cli_args(&args).expect("parse");

        assert_eq!(action, CliAction::ShowHelp);
    }

    #[test]
    fn when_version_flag_then_show_version() {
        let args = given_cli_args(&["-v"]);
        let action = parse_cli_args(&args).expect("parse");

        assert_eq!(action, CliAction::ShowVersion);
    }

    #[test]
    fn when_script_mode_then_file_is_required() {
        let args = given_cli_args(&["script"]);
        let result = parse_cli_args(&args);

        assert_eq!(
            result,
            Err(CliError::MissingRequiredArg {
                arg: "file".to_string()
            })
        );
    }

    #[test]
    fn when_script_mode_with_file_then_script_action() {
        let args = given_cli_args(&["script", "--file", "jobs/nightly.txt"]);
        let (mode, _) = run_parts(parse_cli_args(&args).expect("parse"));

        assert_eq!(
            mode,
            Mode::Script {
                file: PathBuf::from("jobs/nightly.txt")
            }
        );
    }

    #[test]
    fn when_exec_mode_then_line_is_kept_whole() {
        let args = given_cli_args(&["exec", "--line", "update 3 {\"price\": 4}"]);
        let (mode, _) = run_parts(parse_cli_args(&args).expect("parse"));

        assert_eq!(
            mode,
            Mode::Exec {
                line: "update 3 {\"price\": 4}".to_string()
            }
        );
    }

    #[test]
    fn when_global_flags_given_then_they_override_settings() {
        let args = given_cli_args(&[
            "--server",
            "tcp://10.1.1.1:9000",
            "--output",
            "json",
            "--stop-on-error",
            "--connect-timeout-ms",
            "150",
            "--max-retries",
            "3",
        ]);
        let (mode, options) = run_parts(parse_cli_args(&args).expect("parse"));
        let mut settings = Settings::default();
        options.apply_to(&mut settings).expect("apply");

        assert_eq!(mode, Mode::Interactive);
        assert_eq!(options.output, Some(OutputFormat::Json));
        assert_eq!(settings.server_addr, "10.1.1.1:9000");
        assert_eq!(settings.connect_timeout, Duration::from_millis(150));
        assert_eq!(settings.max_retries, Some(3));
        assert!(settings.stop_on_error);
    }

    #[test]
    fn when_mode_is_misspelled_then_suggest_the_closest() {
        let args = given_cli_args(&["scirpt", "--file", "a.txt"]);
        let result = parse_cli_args(&args);

        assert_eq!(
            result,
            Err(CliError::UnknownMode {
                mode: "scirpt".to_string(),
                suggestions: vec!["script".to_string()]
            })
        );
    }

    #[test]
    fn when_flag_is_unknown_then_error() {
        let args = given_cli_args(&["exec", "--line", "show", "--dry"]);
        let result = parse_cli_args(&args);

        assert_eq!(
            result,
            Err(CliError::UnknownFlag {
                flag: "--dry".to_string()
            })
        );
    }

    #[test]
    fn when_flag_value_is_malformed_then_invalid_value() {
        let args = given_cli_args(&["--retry-interval-ms", "soon"]);
        let result = parse_cli_args(&args);

        assert!(matches!(
            result,
            Err(CliError::InvalidArgValue { ref arg, .. }) if arg == "retry_interval_ms"
        ));
    }

    #[test]
    fn when_file_flag_is_used_outside_script_mode_then_error() {
        let args = given_cli_args(&["--file", "a.txt"]);
        let result = parse_cli_args(&args);

        assert!(matches!(result, Err(CliError::UnknownFlag { .. })));
    }
}
