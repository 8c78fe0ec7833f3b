//! Value transforms applied to resolved contract fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

use super::locale::Locale;
use crate::binding::path::value_to_string;
use crate::template::{DataContractField, Transform};

/// Non-fatal transform failure, reported against the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("Cannot convert to number: {0}")]
    Number(String),
    #[error("Cannot parse date: {0}")]
    Date(String),
    #[error("Cannot parse currency number: {0}")]
    Currency(String),
}

/// Apply the field's transform to a non-empty value.
///
/// `default_currency` is the template-level fallback used by `currency`
/// when the field names none.
pub fn apply(
    value: &Value,
    field: &DataContractField,
    default_currency: Option<&str>,
) -> Result<Value, TransformError> {
    match field.transform {
        Transform::None | Transform::Unknown => Ok(value.clone()),
        Transform::Trim => Ok(match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        }),
        Transform::Uppercase => Ok(Value::String(value_to_string(value).to_uppercase())),
        Transform::Lowercase => Ok(Value::String(value_to_string(value).to_lowercase())),
        Transform::Titlecase => Ok(Value::String(title_case(&value_to_string(value)))),
        Transform::Number => to_number(value)
            .map(number_value)
            .ok_or_else(|| TransformError::Number(value_to_string(value))),
        Transform::Boolean => Ok(Value::Bool(to_boolean(value))),
        Transform::Date => {
            let date = parse_date(value).ok_or_else(|| TransformError::Date(value_to_string(value)))?;
            let locale = Locale::parse(field.transform_locale.as_deref().unwrap_or("en-US"));
            let style = field.transform_date_style.unwrap_or_default();
            Ok(Value::String(locale.format_date(date, style)))
        }
        Transform::Currency => {
            let amount =
                to_number(value).ok_or_else(|| TransformError::Currency(value_to_string(value)))?;
            let locale = Locale::parse(field.transform_locale.as_deref().unwrap_or("en-US"));
            let code = field
                .transform_currency
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .or(default_currency)
                .unwrap_or("USD");
            Ok(Value::String(locale.format_currency(amount, code)))
        }
    }
}

/// Lowercase, then capitalize the first letter of every word.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_word = false;
    for c in text.to_lowercase().chars() {
        if !prev_is_word && c.is_lowercase() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = c.is_alphanumeric() || c == '_';
    }
    out
}

/// Numeric coercion: trimmed strings (blank is 0), booleans as 0/1.
pub fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// JSON number, integral when the value has no fractional part.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn to_boolean(value: &Value) -> bool {
    if let Value::Bool(b) = value {
        return *b;
    }
    let text = value_to_string(value).trim().to_lowercase();
    match text.as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        _ => crate::visibility::truthy(Some(value)),
    }
}

/// Calendar date from a timestamp string, a plain date, or epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            let millis = n.as_f64()?;
            DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.date_naive())
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.date_naive());
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(dt.date());
                }
            }
            ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}
