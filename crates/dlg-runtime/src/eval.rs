use std::sync::OnceLock;

use dlg_core::{parse_bool, parse_number, unquote, DlgValue};
use regex::{Captures, Regex};

use crate::store::VariableStore;

/// Operators folded together, highest precedence first. Each group is folded
/// left to right before the next group is considered.
pub const PRECEDENCE_GROUPS: [&[&str]; 6] = [
    &["*", "/", "%"],
    &["+", "-"],
    &["<", "<=", ">=", ">"],
    &["==", "!="],
    &["&&"],
    &["||"],
];

fn variable_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("variable regex must compile")
    })
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"<([A-Za-z_][A-Za-z0-9_.]*)>").expect("tag regex must compile")
    })
}

/// Quoted strings, escaped quotes included, are matched as a whole so
/// operators inside them are skipped.
fn operator_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|<=|>=|==|!=|&&|\|\||<|>|\+|-|\*|/|%"#)
            .expect("operator regex must compile")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Substitution {
    /// Values as expression operands; strings are quoted.
    Operand,
    /// Values as they read on screen.
    Display,
}

fn substitute(text: &str, store: &dyn VariableStore, mode: Substitution) -> String {
    let with_variables = variable_regex().replace_all(text, |captures: &Captures| {
        match store.get(&captures[1]) {
            Some(value) if mode == Substitution::Operand => value.to_operand(),
            Some(value) => value.to_string(),
            None => captures[0].to_string(),
        }
    });
    tag_regex()
        .replace_all(&with_variables, |captures: &Captures| {
            match store.tag(&captures[1]) {
                Some(tag) if mode == Substitution::Operand => {
                    DlgValue::infer_from_text(&tag).to_operand()
                }
                Some(tag) => tag,
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

/// Replaces `$variable` and `<tag>` references for display. Unknown names
/// are left as written.
pub fn render_text(text: &str, store: &dyn VariableStore) -> String {
    substitute(text, store, Substitution::Display)
}

/// Evaluates an expression to its text result.
///
/// There is no grouping syntax: operators are folded strictly by
/// [`PRECEDENCE_GROUPS`].
pub fn evaluate(expr: &str, store: &dyn VariableStore) -> String {
    let substituted = substitute(expr, store, Substitution::Operand);
    let (operands, mut operators) = split_expression(&substituted);
    let mut operands = operands
        .iter()
        .map(|operand| apply_negation(operand))
        .collect::<Vec<_>>();

    for group in PRECEDENCE_GROUPS {
        let mut index = 0;
        while index < operators.len() {
            if group.contains(&operators[index].as_str()) {
                let folded = calculate(&operands[index], &operators[index], &operands[index + 1]);
                operands[index] = folded;
                operands.remove(index + 1);
                operators.remove(index);
            } else {
                index += 1;
            }
        }
    }

    let result = operands
        .first()
        .map(|operand| unquote(operand).into_owned())
        .unwrap_or_default();
    log::trace!("evaluate {:?} -> {:?}", expr, result);
    result
}

/// Splits at operator matches. A `+` or `-` with nothing before it is a sign
/// and stays with the following operand.
fn split_expression(text: &str) -> (Vec<String>, Vec<String>) {
    let mut operands = Vec::new();
    let mut operators = Vec::new();
    let mut start = 0;

    for found in operator_regex().find_iter(text) {
        let token = found.as_str();
        if token.starts_with('"') {
            continue;
        }
        let pending = &text[start..found.start()];
        if pending.trim().is_empty() && matches!(token, "+" | "-") {
            continue;
        }
        operands.push(pending.trim().to_string());
        operators.push(token.to_string());
        start = found.end();
    }
    operands.push(text[start..].trim().to_string());

    (operands, operators)
}

/// `!x` negates, `!!x` cancels out. Either way the result is a boolean.
fn apply_negation(operand: &str) -> String {
    let bangs = operand.chars().take_while(|ch| *ch == '!').count();
    if bangs == 0 {
        return operand.to_string();
    }
    let value = is_truthy(&operand[bangs..]);
    let value = if bangs % 2 == 1 { !value } else { value };
    value.to_string()
}

/// Applies one binary operator to two text operands.
///
/// Numbers win over booleans, booleans over strings. Strings only support
/// `+`, `==` and `!=`; every other unsupported pairing yields `""`.
pub fn calculate(left: &str, op: &str, right: &str) -> String {
    let left = unquote(left);
    let right = unquote(right);

    if let (Some(a), Some(b)) = (parse_number(&left), parse_number(&right)) {
        return calculate_numbers(a, op, b);
    }

    if let (Some(a), Some(b)) = (parse_bool(&left), parse_bool(&right)) {
        return match op {
            "&&" => (a && b).to_string(),
            "||" => (a || b).to_string(),
            "==" => (a == b).to_string(),
            "!=" => (a != b).to_string(),
            _ => String::new(),
        };
    }

    match op {
        "+" => format!("{}{}", left, right),
        "==" => (left == right).to_string(),
        "!=" => (left != right).to_string(),
        _ => String::new(),
    }
}

fn calculate_numbers(a: f64, op: &str, b: f64) -> String {
    match op {
        "+" => format_number(a + b),
        "-" => format_number(a - b),
        "*" => format_number(a * b),
        "/" | "%" if b == 0.0 => {
            log::warn!("division by zero in \"{} {} {}\"; using 0", a, op, b);
            "0".to_string()
        }
        "/" => format_number(a / b),
        "%" => format_number(a % b),
        "<" => (a < b).to_string(),
        "<=" => (a <= b).to_string(),
        ">=" => (a >= b).to_string(),
        ">" => (a > b).to_string(),
        "==" => (a == b).to_string(),
        "!=" => (a != b).to_string(),
        "&&" => (a != 0.0 && b != 0.0).to_string(),
        "||" => (a != 0.0 || b != 0.0).to_string(),
        _ => String::new(),
    }
}

fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// `true`, or any number other than zero.
pub fn is_truthy(text: &str) -> bool {
    let text = unquote(text);
    if let Some(value) = parse_bool(&text) {
        return value;
    }
    parse_number(&text).is_some_and(|value| value != 0.0)
}

/// Computes the value an assignment writes. Compound operators apply their
/// base operator to the current value; the result's storage type is
/// inferred from its text.
pub fn evaluate_assignment(
    store: &dyn VariableStore,
    variable: &str,
    operator: &str,
    expr: &str,
) -> DlgValue {
    let rhs = evaluate(expr, store);
    let result = match operator.strip_suffix('=').filter(|base| !base.is_empty()) {
        Some(base) => {
            let current = store
                .get(variable)
                .map(|value| value.to_operand())
                .unwrap_or_default();
            calculate(&current, base, &rhs)
        }
        None => rhs,
    };
    DlgValue::infer_from_text(&result)
}

#[cfg(test)]
mod eval_tests {
    use super::*;
    use crate::store::MemoryVariableStore;

    fn store() -> MemoryVariableStore {
        let mut store = MemoryVariableStore::new();
        store.set("gold", DlgValue::Int(10));
        store.set("name", DlgValue::String("Ann Lee".to_string()));
        store.set("brave", DlgValue::Bool(true));
        store.set("ratio", DlgValue::Float(0.5));
        store.set_tag("player", "Sam");
        store
    }

    fn eval(expr: &str) -> String {
        evaluate(expr, &store())
    }

    #[test]
    fn precedence_groups_fold_in_fixed_order() {
        assert_eq!(eval("2 + 3 * 4"), "14");
        assert_eq!(eval("true && false || true"), "true");
        assert_eq!(eval("10 - 4 - 3"), "3");
        assert_eq!(eval("7 % 4 * 2"), "6");
        assert_eq!(eval("1 + 1 == 2 && 3 > 2"), "true");
    }

    #[test]
    fn signs_and_negation() {
        assert_eq!(eval("-5"), "-5");
        assert_eq!(eval("3 * -2"), "-6");
        assert_eq!(eval("!true"), "false");
        assert_eq!(eval("!!true"), "true");
        assert_eq!(eval("!$brave || false"), "false");
        assert_eq!(eval("!0"), "true");
    }

    #[test]
    fn variables_and_tags_are_substituted() {
        assert_eq!(eval("$gold * 2"), "20");
        assert_eq!(eval("$gold >= 10 && $brave"), "true");
        assert_eq!(eval("$ratio + 1"), "1.5");
        assert_eq!(eval("$name == \"Ann Lee\""), "true");
        assert_eq!(eval("<player> + \"!\""), "Sam!");
        assert_eq!(eval("$missing"), "$missing");
    }

    #[test]
    fn quoted_operators_are_not_split() {
        assert_eq!(eval("\"a+b\" + \"-c\""), "a+b-c");
        assert_eq!(eval("\"x < y\""), "x < y");
    }

    #[test]
    fn stored_strings_with_quotes_stay_one_operand() {
        let mut store = store();
        store.set("line", DlgValue::String(r#"He said "hi" - ok"#.to_string()));
        assert_eq!(evaluate("$line", &store), r#"He said "hi" - ok"#);
        assert_eq!(evaluate("$line + \"!\"", &store), r#"He said "hi" - ok!"#);
        assert_eq!(evaluate("$line == \"ok\"", &store), "false");
        assert_eq!(
            evaluate_assignment(&store, "copy", "=", "$line"),
            DlgValue::String(r#"He said "hi" - ok"#.to_string())
        );
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(calculate("\"2\"", "+", "3"), "5");
        assert_eq!(calculate("1.5", "*", "2"), "3");
        assert_eq!(calculate("true", "==", "TRUE"), "true");
        assert_eq!(calculate("true", "+", "false"), "");
        assert_eq!(calculate("abc", "+", "def"), "abcdef");
        assert_eq!(calculate("abc", "!=", "abd"), "true");
        assert_eq!(calculate("abc", "*", "2"), "");
        assert_eq!(calculate("1", "<=", "1"), "true");
    }

    #[test]
    fn division_by_zero_yields_zero() {
        assert_eq!(eval("5 / 0"), "0");
        assert_eq!(eval("5 % 0 + 1"), "1");
        assert_eq!(eval("7 / 2"), "3.5");
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy("true"));
        assert!(is_truthy("2"));
        assert!(is_truthy("\"1\""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("yes"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn assignment_infers_storage_type() {
        let mut store = store();
        let value = evaluate_assignment(&store, "x", "=", "\"5\"");
        assert_eq!(value, DlgValue::Int(5));
        store.set("x", value);
        assert_eq!(evaluate_assignment(&store, "x", "+=", "\"2\""), DlgValue::Int(7));
        assert_eq!(evaluate_assignment(&store, "x", "/=", "2"), DlgValue::Float(2.5));
        assert_eq!(
            evaluate_assignment(&store, "name", "+=", "\"!\""),
            DlgValue::String("Ann Lee!".to_string())
        );
        assert_eq!(evaluate_assignment(&store, "flag", "=", "$gold > 3"), DlgValue::Bool(true));
    }

    #[test]
    fn display_rendering_uses_raw_values() {
        let store = store();
        assert_eq!(
            render_text("$name has $gold gold, <player>. $unknown <nope>", &store),
            "Ann Lee has 10 gold, Sam. $unknown <nope>"
        );
    }
}
