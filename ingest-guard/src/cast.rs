//! The shared numeric casting rule for cell values.
//!
//! Row-predicate evaluation and message templating both see cell values
//! through this lens: numeric-looking strings become numbers, everything
//! else passes through unchanged. Casting never fails.

use serde_json::{Number, Value};

/// Casts a raw string to a number when it looks like one.
///
/// The rule, in order: trim whitespace; strip `,` thousands separators;
/// parse as a decimal number. A value with no fractional part collapses to
/// an integer (`"-12.0"` becomes `-12`); anything unparseable (including
/// `NaN`/`inf` spellings) stays the trimmed original text.
pub fn cast_str(value: &str) -> Value {
    let trimmed = value.trim();
    let cleaned = trimmed.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => {
            if parsed.fract() == 0.0 && parsed.abs() <= i64::MAX as f64 {
                Value::Number(Number::from(parsed as i64))
            } else {
                match Number::from_f64(parsed) {
                    Some(n) => Value::Number(n),
                    None => Value::String(trimmed.to_string()),
                }
            }
        }
        _ => Value::String(trimmed.to_string()),
    }
}

/// Casts a cell value: strings go through [`cast_str`], everything else is
/// already typed and returned as-is.
pub fn cast_value(value: &Value) -> Value {
    match value {
        Value::String(s) => cast_str(s),
        other => other.clone(),
    }
}

/// Returns the value as an `f64` if it is numeric after casting.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// True when the casted value is an integer (as opposed to a float).
pub fn is_integer(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_i64() || n.is_u64())
}
