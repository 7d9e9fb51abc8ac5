use crate::types::SourceSpan;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct DlgError {
    pub code: String,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl DlgError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(
        code: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: Some(span),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_joins_code_and_message() {
        let error = DlgError::new("ENGINE_X", "broken");
        assert_eq!(error.to_string(), "ENGINE_X: broken");
        assert!(error.span.is_none());
    }

    #[test]
    fn with_span_keeps_location() {
        let error = DlgError::with_span("COMPILE_X", "bad line", SourceSpan::line(4));
        assert_eq!(error.span, Some(SourceSpan::line(4)));
    }
}
