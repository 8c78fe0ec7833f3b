//! `{{ path }}` placeholder expansion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::{resolve, value_to_string};

/// Page position handed to the substitutor for `page.number` / `page.count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    /// 1-based page number.
    pub page_number: usize,
    pub page_count: usize,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_count: 1,
        }
    }
}

impl RenderContext {
    pub fn new(page_number: usize, page_count: usize) -> Self {
        Self {
            page_number,
            page_count,
        }
    }
}

/// A piece of template text: literal run or placeholder expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// Trimmed placeholder body.
    Binding(&'a str),
}

/// Split text into literal runs and `{{ ... }}` placeholders.
///
/// An unterminated `{{`, or one whose body is blank or contains `}`, stays
/// literal.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    let mut literal_start = 0usize;
    let mut offset = 0usize;

    while let Some(open) = rest.find("{{") {
        let body_start = open + 2;
        let tail = &rest[body_start..];
        let Some(close) = tail.find("}}") else {
            break;
        };
        let body = &tail[..close];
        let expr = body.trim();
        if expr.is_empty() || body.contains('}') {
            // Not a placeholder; step past this brace pair and keep scanning.
            offset += open + 1;
            rest = &rest[open + 1..];
            continue;
        }
        let abs_open = offset + open;
        if abs_open > literal_start {
            out.push(Segment::Literal(&text[literal_start..abs_open]));
        }
        out.push(Segment::Binding(expr));
        let consumed = body_start + close + 2;
        offset += consumed;
        literal_start = offset;
        rest = &rest[consumed..];
    }

    if literal_start < text.len() {
        out.push(Segment::Literal(&text[literal_start..]));
    }
    out
}

/// Expand every placeholder against `data`, then decode escape sequences.
///
/// `page.number` and `page.count` come from `ctx`; missing or null values
/// become empty strings.
pub fn substitute(text: &str, data: &Value, ctx: &RenderContext) -> String {
    let mut out = String::with_capacity(text.len());
    for seg in segments(text) {
        match seg {
            Segment::Literal(s) => out.push_str(s),
            Segment::Binding("page.number") => out.push_str(&ctx.page_number.to_string()),
            Segment::Binding("page.count") => out.push_str(&ctx.page_count.to_string()),
            Segment::Binding(expr) => {
                if let Some(value) = resolve(data, expr) {
                    out.push_str(&value_to_string(value));
                }
            }
        }
    }
    decode_escapes(&out)
}

/// Substitute an optional field; absent text yields an empty string.
pub fn substitute_opt(text: Option<&str>, data: &Value, ctx: &RenderContext) -> String {
    text.map(|t| substitute(t, data, ctx)).unwrap_or_default()
}

/// Turn literal `\n`, `\r\n`, `\t` sequences (single or double escaped) into
/// real line breaks and tabs.
pub fn decode_escapes(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    text.replace("\\\\r\\\\n", "\n")
        .replace("\\\\n", "\n")
        .replace("\\\\t", "\t")
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

/// Placeholder expressions in order of appearance, duplicates included.
pub fn extract_bindings(text: &str) -> Vec<&str> {
    segments(text)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Binding(expr) => Some(expr),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Strip a single wrapping `{{ }}` from a binding reference like a table's
/// `rows` field. Plain paths pass through trimmed.
pub fn normalize_binding(reference: &str) -> &str {
    let trimmed = reference.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
