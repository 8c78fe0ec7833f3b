//! Dotted/bracketed path access into JSON data records.
//!
//! `a[b]` and `a.b` address the same node. Numeric segments index arrays,
//! so `items[0].name` and `items.0.name` are equivalent.

use serde_json::{Map, Value};

/// Split a path into segments, normalizing `[seg]` to `.seg`.
///
/// Only word-character brackets are rewritten; anything else stays part of
/// the segment text. Empty segments are dropped.
pub fn segments(path: &str) -> Vec<String> {
    let mut normalized = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(open) = rest.find('[') {
        normalized.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close)
                if close > 0
                    && after[..close]
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_') =>
            {
                normalized.push('.');
                normalized.push_str(&after[..close]);
                rest = &after[close + 1..];
            }
            _ => {
                normalized.push('[');
                rest = after;
            }
        }
    }
    normalized.push_str(rest);

    normalized
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the value at `path`. Missing intermediate nodes yield `None`.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let segs = segments(path);
    if segs.is_empty() {
        return None;
    }
    let mut current = record;
    for seg in &segs {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Non-container intermediates are overwritten with empty objects. Arrays are
/// kept and indexed when the segment is numeric; an index may address an
/// existing item or append one, and anything further out leaves the record
/// unchanged.
pub fn assign(record: &mut Value, path: &str, value: Value) {
    let segs = segments(path);
    if segs.is_empty() {
        return;
    }
    assign_segments(record, &segs, value);
}

fn assign_segments(current: &mut Value, segs: &[String], value: Value) {
    match segs {
        [] => {}
        [last] => {
            if let Some(slot) = child_slot(current, last) {
                *slot = value;
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = child_slot(current, head) {
                if !is_container(child) {
                    *child = Value::Object(Map::new());
                }
                assign_segments(child, rest, value);
            }
        }
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Existing item at `key`, or a new one when `key` is the next index.
fn array_slot<'a>(items: &'a mut Vec<Value>, key: &str) -> Option<&'a mut Value> {
    let idx = key.parse::<usize>().ok()?;
    if idx == items.len() {
        items.push(Value::Null);
    }
    items.get_mut(idx)
}

/// Slot for `key` under `current`, turning `current` into an object when it
/// cannot hold the key.
fn child_slot<'a>(current: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    let fits = current.is_object() || (current.is_array() && is_index(key));
    if !fits {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Array(items) => array_slot(items, key),
        Value::Object(map) => Some(map.entry(key.to_string()).or_insert(Value::Null)),
        _ => None,
    }
}

/// Whether a resolved value counts as absent: missing, `null`, or `""`.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Format a float the way data records print: integral values without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// String form of a value as it appears in substituted text.
///
/// Strings are raw, `null` is empty, arrays join their items with commas,
/// objects print as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}
