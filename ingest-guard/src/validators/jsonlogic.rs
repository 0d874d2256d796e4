//! A bounded JSON-logic interpreter for row predicates.
//!
//! Rules are JSON documents: an object whose single key names an operation,
//! applied to evaluated arguments. The supported operation set is closed;
//! unknown operations are evaluation errors.

use async_trait::async_trait;
use serde_json::{Number, Value};

use crate::error::{IngestError, Result};
use crate::sources::Row;
use crate::validators::RuleEvaluator;

/// Evaluates JSON-logic rule documents against a row projected as a JSON
/// object.
#[derive(Debug)]
pub struct JsonLogicEvaluator;

#[async_trait]
impl RuleEvaluator for JsonLogicEvaluator {
    async fn evaluate(&self, code: &Value, row: &Row) -> Result<bool> {
        let data = row.to_json();
        Ok(truthy(&apply(code, &data)?))
    }
}

/// JSON-logic truthiness: `false`, `0`, `""`, `[]`, and `null` are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn error(message: impl Into<String>) -> IngestError {
    IngestError::rule_evaluation(message.into())
}

/// Coerces a scalar to a number the way JSON-logic comparisons do.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Loose equality (`==`): numeric coercion across types where possible,
/// string comparison otherwise, strict equality for composites.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_), _) | (_, Value::Array(_)) | (Value::Object(_), _) | (_, Value::Object(_)) => {
            left == right
        }
        (Value::String(l), Value::String(r)) => l == r,
        _ => match (coerce_number(left), coerce_number(right)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

fn string_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Looks up a dot path in the data, JSON-logic `var` style.
fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }
    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Evaluates a rule document against the data.
pub fn apply(rule: &Value, data: &Value) -> Result<Value> {
    let (operation, args) = match rule {
        Value::Array(items) => {
            let evaluated: Result<Vec<Value>> = items.iter().map(|v| apply(v, data)).collect();
            return Ok(Value::Array(evaluated?));
        }
        Value::Object(map) if map.len() == 1 => {
            let (op, raw_args) = map.iter().next().expect("len checked");
            (op.as_str(), raw_args)
        }
        other => return Ok(other.clone()),
    };

    // Arguments are a list; a lone scalar argument stands for a one-element
    // list.
    let raw_args: Vec<&Value> = match args {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    match operation {
        "var" => {
            let path_value = raw_args
                .first()
                .map(|v| apply(v, data))
                .transpose()?
                .unwrap_or(Value::Null);
            let path = match &path_value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                other => string_of(other),
            };
            match lookup(data, &path) {
                Some(found) => Ok(found.clone()),
                None => raw_args
                    .get(1)
                    .map(|v| apply(v, data))
                    .transpose()
                    .map(|v| v.unwrap_or(Value::Null)),
            }
        }
        "missing" => {
            let keys = evaluate_key_list(&raw_args, data)?;
            let missing: Vec<Value> = keys
                .into_iter()
                .filter(|k| lookup(data, k).map(|v| v.is_null()).unwrap_or(true))
                .map(Value::String)
                .collect();
            Ok(Value::Array(missing))
        }
        "missing_some" => {
            let minimum = coerce_number(&apply(
                raw_args.first().copied().unwrap_or(&Value::Null),
                data,
            )?)
            .ok_or_else(|| error("missing_some expects a numeric minimum"))? as usize;
            let keys = match raw_args.get(1) {
                Some(arg) => match apply(arg, data)? {
                    Value::Array(items) => items
                        .into_iter()
                        .map(|v| match v {
                            Value::String(s) => Ok(s),
                            other => Err(error(format!(
                                "missing_some expects string keys, got {other}"
                            ))),
                        })
                        .collect::<Result<Vec<String>>>()?,
                    other => return Err(error(format!("missing_some expects a key list, got {other}"))),
                },
                None => Vec::new(),
            };
            let missing: Vec<Value> = keys
                .iter()
                .filter(|k| lookup(data, k).map(|v| v.is_null()).unwrap_or(true))
                .map(|k| Value::String(k.clone()))
                .collect();
            if keys.len() - missing.len() >= minimum {
                Ok(Value::Array(Vec::new()))
            } else {
                Ok(Value::Array(missing))
            }
        }
        "if" | "?:" => {
            // [cond, then, elif-cond, elif-then, ..., else]
            let mut index = 0;
            while index + 1 < raw_args.len() {
                if truthy(&apply(raw_args[index], data)?) {
                    return apply(raw_args[index + 1], data);
                }
                index += 2;
            }
            match raw_args.get(index) {
                Some(fallback) => apply(fallback, data),
                None => Ok(Value::Null),
            }
        }
        "and" => {
            let mut last = Value::Bool(true);
            for arg in &raw_args {
                last = apply(arg, data)?;
                if !truthy(&last) {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        "or" => {
            let mut last = Value::Bool(false);
            for arg in &raw_args {
                last = apply(arg, data)?;
                if truthy(&last) {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        "!" => Ok(Value::Bool(!truthy(&apply(
            raw_args.first().copied().unwrap_or(&Value::Null),
            data,
        )?))),
        "!!" => Ok(Value::Bool(truthy(&apply(
            raw_args.first().copied().unwrap_or(&Value::Null),
            data,
        )?))),
        "==" | "!=" | "===" | "!==" => {
            let left = apply(raw_args.first().copied().unwrap_or(&Value::Null), data)?;
            let right = apply(raw_args.get(1).copied().unwrap_or(&Value::Null), data)?;
            let equal = match operation {
                "==" | "!=" => loose_eq(&left, &right),
                _ => left == right,
            };
            Ok(Value::Bool(if operation.starts_with('!') {
                !equal
            } else {
                equal
            }))
        }
        "<" | "<=" | ">" | ">=" => {
            let values: Result<Vec<Value>> =
                raw_args.iter().map(|v| apply(v, data)).collect();
            let numbers: Vec<f64> = values?
                .iter()
                .map(|v| {
                    coerce_number(v)
                        .ok_or_else(|| error(format!("cannot compare non-numeric value {v}")))
                })
                .collect::<Result<Vec<f64>>>()?;
            if numbers.len() < 2 {
                return Err(error(format!("{operation} expects at least two operands")));
            }
            let holds = numbers.windows(2).all(|pair| match operation {
                "<" => pair[0] < pair[1],
                "<=" => pair[0] <= pair[1],
                ">" => pair[0] > pair[1],
                _ => pair[0] >= pair[1],
            });
            Ok(Value::Bool(holds))
        }
        "+" | "*" => {
            let mut accumulator = if operation == "+" { 0.0 } else { 1.0 };
            for arg in &raw_args {
                let value = apply(arg, data)?;
                let operand = coerce_number(&value)
                    .ok_or_else(|| error(format!("cannot use non-numeric value {value} in {operation}")))?;
                if operation == "+" {
                    accumulator += operand;
                } else {
                    accumulator *= operand;
                }
            }
            Ok(number(accumulator))
        }
        "-" => {
            let first = coerce_numeric_arg(&raw_args, 0, data, operation)?;
            match raw_args.len() {
                1 => Ok(number(-first)),
                _ => {
                    let second = coerce_numeric_arg(&raw_args, 1, data, operation)?;
                    Ok(number(first - second))
                }
            }
        }
        "/" => {
            let numerator = coerce_numeric_arg(&raw_args, 0, data, operation)?;
            let denominator = coerce_numeric_arg(&raw_args, 1, data, operation)?;
            if denominator == 0.0 {
                return Err(error("division by zero"));
            }
            Ok(number(numerator / denominator))
        }
        "%" => {
            let numerator = coerce_numeric_arg(&raw_args, 0, data, operation)?;
            let denominator = coerce_numeric_arg(&raw_args, 1, data, operation)?;
            if denominator == 0.0 {
                return Err(error("modulo by zero"));
            }
            Ok(number(numerator % denominator))
        }
        "min" | "max" => {
            let mut best: Option<f64> = None;
            for arg in &raw_args {
                let value = apply(arg, data)?;
                let operand = coerce_number(&value)
                    .ok_or_else(|| error(format!("cannot use non-numeric value {value} in {operation}")))?;
                best = Some(match best {
                    None => operand,
                    Some(current) if operation == "min" => current.min(operand),
                    Some(current) => current.max(operand),
                });
            }
            Ok(best.map(number).unwrap_or(Value::Null))
        }
        "in" => {
            let needle = apply(raw_args.first().copied().unwrap_or(&Value::Null), data)?;
            let haystack = apply(raw_args.get(1).copied().unwrap_or(&Value::Null), data)?;
            let found = match &haystack {
                Value::Array(items) => items.iter().any(|item| loose_eq(item, &needle)),
                Value::String(text) => text.contains(&string_of(&needle)),
                _ => false,
            };
            Ok(Value::Bool(found))
        }
        "cat" => {
            let mut text = String::new();
            for arg in &raw_args {
                text.push_str(&string_of(&apply(arg, data)?));
            }
            Ok(Value::String(text))
        }
        other => Err(error(format!("Unrecognized operation {other}"))),
    }
}

fn coerce_numeric_arg(args: &[&Value], index: usize, data: &Value, operation: &str) -> Result<f64> {
    let value = apply(args.get(index).copied().unwrap_or(&Value::Null), data)?;
    coerce_number(&value)
        .ok_or_else(|| error(format!("cannot use non-numeric value {value} in {operation}")))
}

fn evaluate_key_list(args: &[&Value], data: &Value) -> Result<Vec<String>> {
    // `missing` accepts either a list of keys or a single evaluated list.
    let mut keys = Vec::new();
    for arg in args {
        match apply(arg, data)? {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => keys.push(s),
                        other => {
                            return Err(error(format!("expected a string key, got {other}")))
                        }
                    }
                }
            }
            Value::String(s) => keys.push(s),
            other => return Err(error(format!("expected a string key, got {other}"))),
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(rule: Value, data: Value) -> Value {
        apply(&rule, &data).unwrap()
    }

    #[test]
    fn literals_evaluate_to_themselves() {
        assert_eq!(run(json!(true), json!({})), json!(true));
        assert_eq!(run(json!(17), json!({})), json!(17));
        assert_eq!(run(json!("x"), json!({})), json!("x"));
        assert_eq!(run(json!(null), json!({})), json!(null));
    }

    #[test]
    fn var_resolves_paths_and_defaults() {
        let data = json!({"a": 1, "b": {"c": 2}, "list": [10, 20]});
        assert_eq!(run(json!({"var": "a"}), data.clone()), json!(1));
        assert_eq!(run(json!({"var": "b.c"}), data.clone()), json!(2));
        assert_eq!(run(json!({"var": "list.1"}), data.clone()), json!(20));
        assert_eq!(run(json!({"var": ["nope", 26]}), data.clone()), json!(26));
        assert_eq!(run(json!({"var": "nope"}), data.clone()), json!(null));
        assert_eq!(run(json!({"var": ""}), data.clone()), data);
    }

    #[test]
    fn comparisons_coerce_numeric_strings() {
        let data = json!({"spent": "300", "budget": "200"});
        assert_eq!(
            run(json!({">": [{"var": "spent"}, {"var": "budget"}]}), data),
            json!(true)
        );
        assert_eq!(run(json!({"<": [1, 2, 3]}), json!({})), json!(true));
        assert_eq!(run(json!({"<": [1, 5, 3]}), json!({})), json!(false));
        assert_eq!(run(json!({"<=": [2, 2, 3]}), json!({})), json!(true));
    }

    #[test]
    fn equality_is_loose_and_strict() {
        assert_eq!(run(json!({"==": [1, "1"]}), json!({})), json!(true));
        assert_eq!(run(json!({"===": [1, "1"]}), json!({})), json!(false));
        assert_eq!(run(json!({"!=": [1, 2]}), json!({})), json!(true));
        assert_eq!(run(json!({"!==": [1, 1]}), json!({})), json!(false));
        assert_eq!(run(json!({"==": [null, null]}), json!({})), json!(true));
    }

    #[test]
    fn boolean_operations_return_the_deciding_value() {
        assert_eq!(run(json!({"and": [true, "yes"]}), json!({})), json!("yes"));
        assert_eq!(run(json!({"and": [0, "yes"]}), json!({})), json!(0));
        assert_eq!(run(json!({"or": [0, "", "x"]}), json!({})), json!("x"));
        assert_eq!(run(json!({"!": [true]}), json!({})), json!(false));
        assert_eq!(run(json!({"!!": [[]]}), json!({})), json!(false));
    }

    #[test]
    fn if_selects_the_first_truthy_branch() {
        let rule = json!({"if": [{"<": [{"var": "n"}, 0]}, "neg", {"==": [{"var": "n"}, 0]}, "zero", "pos"]});
        assert_eq!(run(rule.clone(), json!({"n": -1})), json!("neg"));
        assert_eq!(run(rule.clone(), json!({"n": 0})), json!("zero"));
        assert_eq!(run(rule, json!({"n": 3})), json!("pos"));
    }

    #[test]
    fn arithmetic_and_aggregates() {
        assert_eq!(run(json!({"+": [1, 2, 3]}), json!({})), json!(6));
        assert_eq!(run(json!({"*": [2, "3"]}), json!({})), json!(6));
        assert_eq!(run(json!({"-": [5]}), json!({})), json!(-5));
        assert_eq!(run(json!({"-": [5, 2]}), json!({})), json!(3));
        assert_eq!(run(json!({"/": [7, 2]}), json!({})), json!(3.5));
        assert_eq!(run(json!({"%": [7, 2]}), json!({})), json!(1));
        assert_eq!(run(json!({"min": [3, 1, 2]}), json!({})), json!(1));
        assert_eq!(run(json!({"max": [3, 1, 2]}), json!({})), json!(3));
    }

    #[test]
    fn membership_and_concatenation() {
        assert_eq!(
            run(json!({"in": ["b", ["a", "b"]]}), json!({})),
            json!(true)
        );
        assert_eq!(run(json!({"in": ["ell", "hello"]}), json!({})), json!(true));
        assert_eq!(run(json!({"in": ["x", ["a"]]}), json!({})), json!(false));
        assert_eq!(
            run(json!({"cat": ["a=", {"var": "a"}]}), json!({"a": 5})),
            json!("a=5")
        );
    }

    #[test]
    fn missing_reports_absent_or_null_keys() {
        let data = json!({"a": 1, "b": null});
        assert_eq!(
            run(json!({"missing": ["a", "b", "c"]}), data.clone()),
            json!(["b", "c"])
        );
        assert_eq!(
            run(json!({"missing_some": [1, ["a", "b", "c"]]}), data.clone()),
            json!([])
        );
        assert_eq!(
            run(json!({"missing_some": [3, ["a", "b", "c"]]}), data),
            json!(["b", "c"])
        );
    }

    #[test]
    fn unknown_operations_and_division_by_zero_are_errors() {
        assert!(apply(&json!({"frobnicate": [1]}), &json!({})).is_err());
        assert!(apply(&json!({"/": [1, 0]}), &json!({})).is_err());
    }

    #[tokio::test]
    async fn evaluator_applies_rules_to_casted_rows() {
        let mut row = Row::new();
        row.push("spent", json!("2,300"));
        row.push("budget", json!("2000"));
        let casted = row.casted();
        let rule = json!({"<=": [{"var": "spent"}, {"var": "budget"}]});
        let result = JsonLogicEvaluator.evaluate(&rule, &casted).await.unwrap();
        assert!(!result);
    }
}
