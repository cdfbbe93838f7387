#![allow(clippy::unwrap_used)]

//! Every failure the binary can end with maps to a non-zero status, and each
//! code has an operator-facing explanation.

use desk::error::{get_error_info, CommandError, InputError, ScriptError, TransportError};
use desk::{DeskError, ExitCode};

#[test]
fn test_all_error_variants_have_nonzero_exit_codes() {
    let test_cases = vec![
        (DeskError::Config("test".to_string()), 2, "Config"),
        (
            DeskError::Command(CommandError::Duplicate("show".to_string())),
            3,
            "Command",
        ),
        (DeskError::Transport(TransportError::Closed), 4, "Transport"),
        (
            DeskError::Script(ScriptError::NotFound("a.txt".to_string())),
            5,
            "Script",
        ),
        (
            DeskError::Input(InputError::Unusable("stdin".to_string())),
            6,
            "Input",
        ),
        (DeskError::Internal("test".to_string()), 9, "Internal"),
        (DeskError::Busy("test".to_string()), 10, "Busy"),
    ];

    for (error, expected_code, name) in test_cases {
        let actual_code = error.exit_code();
        assert_eq!(
            actual_code, expected_code,
            "{name} should have exit code {expected_code}, got {actual_code}"
        );
        assert!(
            get_error_info(error.code()).is_some(),
            "{name} has no documented code"
        );
    }
}

#[test]
fn test_json_parse_error_has_nonzero_exit_code() {
    // Given: A JSON serialization error
    let parse_result: Result<serde_json::Value, _> = serde_json::from_str("{not valid json}");

    // When: It is converted
    let error = DeskError::from(parse_result.unwrap_err());

    // Then
    assert_eq!(error.exit_code(), 8);
    assert_eq!(error.code(), "INVALID");
}

#[test]
fn test_run_outcomes_map_to_process_status() {
    assert_eq!(ExitCode::Ok.process_status(), 0);
    assert_eq!(ExitCode::Exit.process_status(), 0);
    assert_eq!(ExitCode::Error.process_status(), 1);
}
