//! # Visibility Expressions
//!
//! Evaluates `visibleIf` conditions such as
//! `exists(customer.vat) && len(items) > 0 || !paid`.
//!
//! Splitting on `||` and `&&` is textual, so `||` binds loosest and there is
//! no grouping of boolean subexpressions. Parentheses are only meaningful in
//! `exists(...)` / `len(...)` calls and around a whole operand.
//!
//! Evaluation never fails: a malformed expression is treated as visible.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::binding::path::{is_empty_value, resolve};

/// Whether conditions are evaluated or ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    /// Layout editing: every element is shown regardless of its condition.
    Design,
    /// Preview and final render: conditions are evaluated against data.
    #[default]
    Evaluate,
}

/// Reason an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("empty operand")]
    EmptyOperand,
    #[error("malformed operand: {0}")]
    Malformed(String),
}

/// Element visibility for a condition under `mode`.
pub fn is_visible(condition: Option<&str>, data: &Value, mode: EvalMode) -> bool {
    match (mode, condition) {
        (EvalMode::Design, _) | (_, None) => true,
        (EvalMode::Evaluate, Some(expr)) => evaluate(expr, data),
    }
}

/// Evaluate a condition, treating malformed input as `true`.
pub fn evaluate(expr: &str, data: &Value) -> bool {
    match try_evaluate(expr, data) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(expr, error = %e, "visibility expression failed open");
            true
        }
    }
}

/// Evaluate a condition, surfacing syntax problems.
pub fn try_evaluate(expr: &str, data: &Value) -> Result<bool, ExprError> {
    eval_or(expr, data)
}

/// Syntax check without data, for template validation.
pub fn check(expr: &str) -> Result<(), ExprError> {
    try_evaluate(expr, &Value::Null).map(|_| ())
}

fn split_parts<'a>(expr: &'a str, op: &str) -> Vec<&'a str> {
    expr.split(op)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn eval_or(expr: &str, data: &Value) -> Result<bool, ExprError> {
    let parts = split_parts(expr, "||");
    if parts.len() <= 1 {
        return eval_and(expr, data);
    }
    for part in parts {
        if eval_and(part, data)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn eval_and(expr: &str, data: &Value) -> Result<bool, ExprError> {
    let parts = split_parts(expr, "&&");
    if parts.len() <= 1 {
        return eval_not(expr, data);
    }
    for part in parts {
        if !eval_not(part, data)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eval_not(expr: &str, data: &Value) -> Result<bool, ExprError> {
    let t = expr.trim();
    match t.strip_prefix('!') {
        Some(rest) => eval_not(rest, data).map(|v| !v),
        None => eval_atom(t, data),
    }
}

fn eval_atom(expr: &str, data: &Value) -> Result<bool, ExprError> {
    let t = expr.trim();
    if let Some(inner) = strip_wrapping_parens(t) {
        return eval_or(inner, data);
    }
    match t {
        "" => Err(ExprError::EmptyOperand),
        "true" => Ok(true),
        "false" => Ok(false),
        _ => match split_comparison(t) {
            Some((left, op, right)) => {
                let lhs = eval_value(left, data)?;
                Ok(compare(lhs.as_ref(), op, &parse_literal(right)))
            }
            None => Ok(truthy(eval_value(t, data)?.as_ref())),
        },
    }
}

/// Inner text of `( ... )` when the outer pair encloses the whole operand.
fn strip_wrapping_parens(t: &str) -> Option<&str> {
    let inner = t.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

const OPERATORS: [(&str, CmpOp); 6] = [
    ("==", CmpOp::Eq),
    ("!=", CmpOp::Ne),
    (">=", CmpOp::Ge),
    ("<=", CmpOp::Le),
    (">", CmpOp::Gt),
    ("<", CmpOp::Lt),
];

/// Split at the leftmost operator with a non-empty left side and a
/// non-blank right side.
fn split_comparison(t: &str) -> Option<(&str, CmpOp, &str)> {
    for (i, _) in t.char_indices().skip(1) {
        let rest = &t[i..];
        for (symbol, op) in OPERATORS {
            if let Some(right) = rest.strip_prefix(symbol) {
                let left = t[..i].trim();
                let right = right.trim();
                if !left.is_empty() && !right.is_empty() {
                    return Some((left, op, right));
                }
            }
        }
    }
    None
}

fn call_argument<'a>(t: &'a str, name: &str) -> Option<&'a str> {
    let arg = t.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')?.trim();
    (!arg.is_empty() && !arg.contains(['(', ')'])).then_some(arg)
}

/// Resolve an operand. `None` means undefined.
fn eval_value(expr: &str, data: &Value) -> Result<Option<Value>, ExprError> {
    let t = expr.trim();
    if t.is_empty() {
        return Err(ExprError::EmptyOperand);
    }
    if let Some(path) = call_argument(t, "exists") {
        return Ok(Some(Value::Bool(!is_empty_value(resolve(data, path)))));
    }
    if let Some(path) = call_argument(t, "len") {
        let len = match resolve(data, path) {
            Some(Value::Array(items)) => items.len(),
            Some(Value::String(s)) => s.encode_utf16().count(),
            _ => 0,
        };
        return Ok(Some(Value::from(len)));
    }
    if t.contains(['(', ')']) {
        return Err(ExprError::Malformed(t.to_string()));
    }
    Ok(resolve(data, t).cloned())
}

/// Quoted string, `true`/`false`, number, else the raw text.
fn parse_literal(raw: &str) -> Value {
    let t = raw.trim();
    for quote in ['"', '\''] {
        if t.len() >= 2 && t.starts_with(quote) && t.ends_with(quote) {
            return Value::String(t[1..t.len() - 1].to_string());
        }
    }
    match t {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    match t.parse::<f64>() {
        Ok(n) if n.is_finite() => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(t.to_string())),
        _ => Value::String(t.to_string()),
    }
}

fn strict_equals(left: Option<&Value>, right: &Value) -> bool {
    match (left, right) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(Value::String(a)), Value::String(b)) => a == b,
        (Some(Value::Bool(a)), Value::Bool(b)) => a == b,
        (Some(Value::Null), Value::Null) => true,
        _ => false,
    }
}

/// Numeric coercion for ordering comparisons; `NaN` when not numeric.
fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => f64::NAN,
    }
}

fn compare(left: Option<&Value>, op: CmpOp, right: &Value) -> bool {
    match op {
        CmpOp::Eq => strict_equals(left, right),
        CmpOp::Ne => !strict_equals(left, right),
        _ => {
            if let (Some(Value::String(a)), Value::String(b)) = (left, right) {
                return match op {
                    CmpOp::Gt => a > b,
                    CmpOp::Lt => a < b,
                    CmpOp::Ge => a >= b,
                    _ => a <= b,
                };
            }
            let (a, b) = (to_number(left), to_number(Some(right)));
            match op {
                CmpOp::Gt => a > b,
                CmpOp::Lt => a < b,
                CmpOp::Ge => a >= b,
                _ => a <= b,
            }
        }
    }
}

/// Truthiness: null, false, 0, NaN and "" are false; containers are true.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Value {
        json!({
            "customer": {"name": "Ada", "vat": "", "tier": "gold"},
            "items": [1, 2, 3],
            "total": 120.5,
            "count": 0,
            "paid": false,
            "note": null
        })
    }

    #[test]
    fn test_literals_and_paths() {
        let d = data();
        assert!(evaluate("true", &d));
        assert!(!evaluate("false", &d));
        assert!(evaluate("customer.name", &d));
        assert!(!evaluate("customer.vat", &d));
        assert!(!evaluate("count", &d));
        assert!(!evaluate("note", &d));
        assert!(!evaluate("missing.path", &d));
        assert!(evaluate("items", &d));
    }

    #[test]
    fn test_exists_and_len() {
        let d = data();
        assert!(evaluate("exists(customer.name)", &d));
        assert!(!evaluate("exists(customer.vat)", &d));
        assert!(!evaluate("exists(note)", &d));
        assert!(evaluate("exists(count)", &d));
        assert!(evaluate("len(items) == 3", &d));
        assert!(evaluate("len(items) > 0", &d));
        assert!(evaluate("len(customer.name) >= 3", &d));
        assert!(evaluate("len(total) == 0", &d));
    }

    #[test]
    fn test_comparisons() {
        let d = data();
        assert!(evaluate("total > 100", &d));
        assert!(evaluate("total <= 120.5", &d));
        assert!(evaluate("customer.tier == 'gold'", &d));
        assert!(evaluate("customer.tier == \"gold\"", &d));
        assert!(evaluate("customer.tier == gold", &d));
        assert!(evaluate("customer.tier != silver", &d));
        assert!(evaluate("paid == false", &d));
        assert!(!evaluate("missing == 1", &d));
        assert!(evaluate("missing != 1", &d));
        assert!(!evaluate("missing > 1", &d));
    }

    #[test]
    fn test_equality_is_strict() {
        let d = json!({"n": "5", "m": 5});
        assert!(!evaluate("n == 5", &d));
        assert!(evaluate("n == '5'", &d));
        assert!(evaluate("m == 5", &d));
        assert!(evaluate("m == 5.0", &d));
        // ordering coerces numeric strings
        assert!(evaluate("n > 4", &d));
    }

    #[test]
    fn test_boolean_operators() {
        let d = data();
        assert!(evaluate("exists(customer.name) && len(items) > 0", &d));
        assert!(!evaluate("exists(customer.vat) && len(items) > 0", &d));
        assert!(evaluate("exists(customer.vat) || total > 100", &d));
        assert!(evaluate("!paid", &d));
        assert!(evaluate("!!customer.name", &d));
        assert!(evaluate("!exists(customer.vat)", &d));
        // || binds loosest
        assert!(evaluate("false && false || true", &d));
        assert!(!evaluate("true && false || false", &d));
    }

    #[test]
    fn test_wrapped_operands() {
        let d = data();
        assert!(evaluate("(exists(customer.name)) && (total > 100)", &d));
        assert!(!evaluate("(paid) && (customer.name)", &d));
        assert!(evaluate("(!paid)", &d));
    }

    #[test]
    fn test_malformed_fails_open() {
        let d = data();
        assert!(evaluate("exists(", &d));
        assert!(evaluate("exists(customer.vat", &d));
        assert!(evaluate("len(items)) > 2", &d));
        assert!(evaluate("!", &d));
        assert!(evaluate("(c) && (a || b)", &d));
        assert!(try_evaluate("exists(", &d).is_err());
        assert!(check("exists(a.b) && len(c) > 1").is_ok());
        assert!(check("(a").is_err());
    }

    #[test]
    fn test_expr_error_messages() {
        let err = try_evaluate("exists(customer.vat", &data()).unwrap_err();
        assert_eq!(err, ExprError::Malformed("exists(customer.vat".into()));
        assert_eq!(err.to_string(), "malformed operand: exists(customer.vat");
        assert_eq!(ExprError::EmptyOperand.to_string(), "empty operand");
    }

    #[test]
    fn test_design_mode_ignores_condition() {
        let d = data();
        assert!(is_visible(Some("false"), &d, EvalMode::Design));
        assert!(!is_visible(Some("false"), &d, EvalMode::Evaluate));
        assert!(is_visible(None, &d, EvalMode::Evaluate));
    }
}
