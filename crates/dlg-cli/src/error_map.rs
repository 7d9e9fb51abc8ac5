use std::fmt::Display;

use dlg_core::DlgError;

fn map_error(code: &'static str, error: impl Display) -> DlgError {
    DlgError::new(code, error.to_string())
}

pub(crate) fn json_line(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

pub(crate) fn emit_error(error: DlgError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_line(&error.message));
    if let Some(span) = error.span {
        println!("ERROR_LINE:{}", span.start_line);
    }
    1
}

pub(crate) fn map_play_io(error: std::io::Error) -> DlgError {
    map_error("CLI_PLAY_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> DlgError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> DlgError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> DlgError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> DlgError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> DlgError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> DlgError {
    map_error("CLI_STATE_INVALID", error)
}

pub(crate) fn map_cli_output_write(error: std::io::Error) -> DlgError {
    map_error("CLI_OUTPUT_WRITE", error)
}

pub(crate) fn map_cli_output_encode(error: serde_json::Error) -> DlgError {
    map_error("CLI_OUTPUT_ENCODE", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        assert_eq!(emit_error(DlgError::new("ERR", "failed")), 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_play_io(std::io::Error::other("io")).code, "CLI_PLAY_IO");
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );

        let strip_error = std::path::Path::new("/a")
            .strip_prefix("/b")
            .expect_err("strip prefix should fail");
        assert_eq!(map_cli_source_scan(strip_error).code, "CLI_SOURCE_SCAN");
        assert_eq!(
            map_cli_source_read(std::io::Error::other("read")).code,
            "CLI_SOURCE_READ"
        );
        assert_eq!(
            map_cli_state_write(std::io::Error::other("write")).code,
            "CLI_STATE_WRITE"
        );
        assert_eq!(
            map_cli_state_read(std::io::Error::other("read")).code,
            "CLI_STATE_READ"
        );
        assert_eq!(
            map_cli_output_write(std::io::Error::other("out")).code,
            "CLI_OUTPUT_WRITE"
        );

        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_state_invalid(invalid).code, "CLI_STATE_INVALID");
        let invalid = serde_json::from_str::<serde_json::Value>("[").expect_err("invalid json");
        assert_eq!(map_cli_output_encode(invalid).code, "CLI_OUTPUT_ENCODE");
    }

    #[test]
    fn json_line_quotes_strings() {
        assert_eq!(json_line(&"a \"b\""), r#""a \"b\"""#);
    }
}
