use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A stored script variable.
///
/// Expressions always carry values as text; a `DlgValue` is what an
/// assignment writes back once the storage type has been inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DlgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl DlgValue {
    /// Infers the storage type of an evaluated expression.
    /// bool, then int, then float; anything else stays a string.
    pub fn infer_from_text(text: &str) -> Self {
        let trimmed = strip_quotes(text);
        if let Some(value) = parse_bool(trimmed) {
            return Self::Bool(value);
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Int(value);
        }
        if let Some(value) = parse_number(trimmed) {
            return Self::Float(value);
        }
        Self::String(trimmed.to_string())
    }

    /// Text form used inside expressions. Strings are quoted so operators
    /// inside them are not tokenized; embedded `"` and `\` are escaped.
    pub fn to_operand(&self) -> String {
        match self {
            Self::String(value) => {
                format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
            }
            other => other.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for DlgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::String(value) => f.write_str(value),
        }
    }
}

pub fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses a finite decimal number. Words such as `inf` or `NaN` are not numbers
/// in scripts.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed
            .chars()
            .any(|ch| ch.is_alphabetic() && ch != 'e' && ch != 'E')
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Removes one pair of surrounding double quotes.
pub fn strip_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Removes one pair of surrounding double quotes and undoes the escaping
/// applied by [`DlgValue::to_operand`].
pub fn unquote(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    let inner = strip_quotes(trimmed);
    if inner.len() == trimmed.len() || !inner.contains('\\') {
        return Cow::Borrowed(inner);
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('\\', Some(&next)) if next == '"' || next == '\\' => {
                out.push(next);
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn infer_prefers_bool_then_int_then_float() {
        assert_eq!(DlgValue::infer_from_text("TRUE"), DlgValue::Bool(true));
        assert_eq!(DlgValue::infer_from_text("5"), DlgValue::Int(5));
        assert_eq!(DlgValue::infer_from_text("\"5\""), DlgValue::Int(5));
        assert_eq!(DlgValue::infer_from_text("-12"), DlgValue::Int(-12));
        assert_eq!(DlgValue::infer_from_text("2.5"), DlgValue::Float(2.5));
        assert_eq!(
            DlgValue::infer_from_text("\"hello\""),
            DlgValue::String("hello".to_string())
        );
        assert_eq!(
            DlgValue::infer_from_text("NaN"),
            DlgValue::String("NaN".to_string())
        );
    }

    #[test]
    fn operand_text_quotes_strings_only() {
        assert_eq!(DlgValue::String("a b".to_string()).to_operand(), "\"a b\"");
        assert_eq!(DlgValue::Int(3).to_operand(), "3");
        assert_eq!(DlgValue::Float(3.0).to_string(), "3");
        assert_eq!(DlgValue::Bool(false).to_operand(), "false");
    }

    #[test]
    fn embedded_quotes_are_escaped_and_restored() {
        let value = DlgValue::String(r#"He said "hi" - ok \o/"#.to_string());
        let operand = value.to_operand();
        assert_eq!(operand, r#""He said \"hi\" - ok \\o/""#);
        assert_eq!(unquote(&operand), r#"He said "hi" - ok \o/"#);
        assert_eq!(unquote("\"plain\""), "plain");
        assert_eq!(unquote(r#"not\"quoted"#), r#"not\"quoted"#);
    }

    #[test]
    fn number_parsing_rejects_words() {
        assert_eq!(parse_number(" 1e2 "), Some(100.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn strip_quotes_removes_one_pair() {
        assert_eq!(strip_quotes("\"x\""), "x");
        assert_eq!(strip_quotes("\"\"x\"\""), "\"x\"");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("plain"), "plain");
    }

    #[test]
    fn untagged_serde_keeps_storage_type() {
        let values: Vec<DlgValue> =
            serde_json::from_str(r#"[true, 7, 1.5, "s"]"#).expect("values should deserialize");
        assert_eq!(
            values,
            vec![
                DlgValue::Bool(true),
                DlgValue::Int(7),
                DlgValue::Float(1.5),
                DlgValue::String("s".to_string()),
            ]
        );
    }
}
