//! Binding discovery and contract synchronization.
//!
//! Discovery walks top-level elements and, through includes, the partials
//! they reference. The walk is guarded per include chain so a partial that
//! includes itself is visited once.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::binding::path::resolve;
use crate::binding::substitute::extract_bindings;
use crate::template::{DataContractField, Element, Template};

const RESERVED: [&str; 6] = ["true", "false", "exists", "len", "page.number", "page.count"];

fn is_page_token(path: &str) -> bool {
    path == "page.number" || path == "page.count"
}

/// Identifier-like tokens in a condition that look like data paths.
fn condition_paths(expr: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            let token = &expr[start..i];
            if token.contains('.') && !RESERVED.contains(&token) {
                out.push(token);
            }
        } else {
            i += 1;
        }
    }
    out
}

/// Elements with includes replaced by their partials' elements, unmodified.
fn flatten<'a>(
    elements: &'a [Element],
    template: &'a Template,
    active: &mut HashSet<&'a str>,
    out: &mut Vec<&'a Element>,
) {
    for element in elements {
        match element {
            Element::Include(inc) => {
                let name = inc.reference.as_str();
                if let Some(partial) = template.partials.get(name) {
                    if active.insert(name) {
                        flatten(&partial.elements, template, active, out);
                        active.remove(name);
                    }
                }
            }
            other => out.push(other),
        }
    }
}

fn flattened(template: &Template) -> Vec<&Element> {
    let mut out = Vec::new();
    flatten(&template.elements, template, &mut HashSet::new(), &mut out);
    out
}

/// Every data path the template references, sorted and de-duplicated.
pub fn collect_bindings(template: &Template) -> Vec<String> {
    let mut keys = BTreeSet::new();
    for element in flattened(template) {
        for text in element.binding_fields() {
            for binding in extract_bindings(text) {
                if !is_page_token(binding) {
                    keys.insert(binding.to_string());
                }
            }
        }
        if let Some(expr) = element.base().condition() {
            keys.extend(condition_paths(expr).into_iter().map(str::to_string));
        }
    }
    keys.into_iter().collect()
}

/// Changes made by [`sync_contract`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Align the contract with the bindings the template actually uses.
///
/// New paths get an optional external string field, unreferenced fields are
/// dropped, and the result is sorted by path.
pub fn sync_contract(template: &mut Template) -> SyncReport {
    let discovered = collect_bindings(template);
    let wanted: HashSet<&str> = discovered.iter().map(String::as_str).collect();
    let fields = &mut template.data_contract.fields;
    let mut report = SyncReport::default();

    let existing: HashSet<String> = fields.iter().map(|f| f.path.clone()).collect();
    for path in &discovered {
        if !existing.contains(path) {
            fields.push(DataContractField::discovered(path.clone()));
            report.added.push(path.clone());
        }
    }

    fields.retain(|f| {
        let keep = wanted.contains(f.path.as_str());
        if !keep {
            report.removed.push(f.path.clone());
        }
        keep
    });
    fields.sort_by(|a, b| a.path.cmp(&b.path));

    if !report.is_empty() {
        tracing::info!(
            added = report.added.len(),
            removed = report.removed.len(),
            "contract synced"
        );
    }
    report
}

/// Text bindings that resolve to nothing in `data`, for preview warnings.
pub fn missing_bindings(template: &Template, data: &Value) -> Vec<String> {
    let mut missing = BTreeSet::new();
    for element in flattened(template) {
        for text in element.binding_fields() {
            for binding in extract_bindings(text) {
                if is_page_token(binding) {
                    continue;
                }
                if matches!(resolve(data, binding), None | Some(Value::Null)) {
                    missing.insert(binding.to_string());
                }
            }
        }
    }
    missing.into_iter().collect()
}
