//! Message templating: the small embedded expression language used to
//! render human-readable rule messages.
//!
//! Tokens of the form `{column}` substitute the row's value directly.
//! Tokens of the form `{A op B}` or `{A op B:precision}` evaluate simple
//! arithmetic over column values and numeric literals. Any malformed or
//! unresolvable token replaces the whole message with an explicit
//! `Unable to evaluate {...}` marker and stops further processing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::cast::{as_number, cast_str, cast_value, is_integer};
use crate::sources::Row;

/// Matches every `{...}` token in a message, non-greedily.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{.*?\}").expect("valid token pattern"));

/// Splits a token body into `operand1 op operand2 rest`, where `rest`
/// optionally carries a `:precision` suffix.
static EXPRESSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s*([+\-*/])\s*([^:\s]+)(\S*)\s*$").expect("valid pattern"));

/// Renders a cell value the way messages display it: strings as-is,
/// integers plainly, floats with a trailing `.0` when integral, null empty.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            } else {
                n.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// The outcome of evaluating one arithmetic token.
enum TokenOutcome {
    /// Replace the token with this text.
    Replace(String),
    /// Leave the token as-is and continue (operands resolved but were not
    /// numeric).
    Skip,
    /// Replace the whole message with `Unable to evaluate {token}`.
    Fail,
}

/// Renders a message template against a row.
///
/// Processing walks the tokens found in the original template in order.
/// The first token that fails to resolve wins: the entire output becomes
/// `Unable to evaluate {<token>}` and remaining tokens are not processed.
pub fn render(template: &str, row: &Row) -> String {
    let mut message = template.to_string();
    for token in TOKEN_PATTERN.find_iter(template) {
        let token = token.as_str();
        let key = token[1..token.len() - 1].trim();

        if let Some(value) = row.get(key) {
            message = message.replace(token, &display_value(value));
            continue;
        }

        match evaluate_expression(key, row) {
            TokenOutcome::Replace(text) => {
                message = message.replace(token, &text);
            }
            TokenOutcome::Skip => {}
            TokenOutcome::Fail => {
                return format!("Unable to evaluate {token}");
            }
        }
    }
    message
}

/// Resolves an operand: numeric literals directly, otherwise a column
/// lookup casted through the shared numeric rule. `None` means the operand
/// cannot be resolved at all (missing column).
fn resolve_operand(operand: &str, row: &Row) -> Option<Value> {
    let literal = cast_str(operand);
    if as_number(&literal).is_some() {
        return Some(literal);
    }
    row.get(operand).map(cast_value)
}

fn evaluate_expression(key: &str, row: &Row) -> TokenOutcome {
    let captures = match EXPRESSION_PATTERN.captures(key) {
        Some(c) => c,
        None => return TokenOutcome::Fail,
    };
    let (operand1, operator, operand2, rest) = (
        captures.get(1).map(|m| m.as_str()).unwrap_or_default(),
        captures.get(2).map(|m| m.as_str()).unwrap_or_default(),
        captures.get(3).map(|m| m.as_str()).unwrap_or_default(),
        captures.get(4).map(|m| m.as_str()).unwrap_or_default(),
    );

    let value1 = match resolve_operand(operand1, row) {
        Some(v) => v,
        None => return TokenOutcome::Fail,
    };
    let value2 = match resolve_operand(operand2, row) {
        Some(v) => v,
        None => return TokenOutcome::Fail,
    };

    // Operands that resolved to non-numeric column values leave the token
    // untouched; this is not an evaluation failure.
    let (left, right) = match (as_number(&value1), as_number(&value2)) {
        (Some(l), Some(r)) => (l, r),
        _ => return TokenOutcome::Skip,
    };

    if operator == "/" && right == 0.0 {
        return TokenOutcome::Fail;
    }

    let integral = is_integer(&value1) && is_integer(&value2) && operator != "/";
    let result = match operator {
        "+" => left + right,
        "-" => left - right,
        "*" => left * right,
        "/" => left / right,
        _ => return TokenOutcome::Fail,
    };

    if rest.is_empty() {
        let text = if integral && result.fract() == 0.0 {
            format!("{}", result as i64)
        } else if result.fract() == 0.0 {
            format!("{result:.1}")
        } else {
            result.to_string()
        };
        return TokenOutcome::Replace(text);
    }

    // A trailing `:N` formats with N digits after the decimal point;
    // anything else trailing the expression is malformed.
    match rest.strip_prefix(':') {
        Some(digits) if !digits.is_empty() => match digits.parse::<usize>() {
            Ok(precision) => TokenOutcome::Replace(format!("{result:.precision$}")),
            Err(_) => TokenOutcome::Fail,
        },
        _ => TokenOutcome::Fail,
    }
}
