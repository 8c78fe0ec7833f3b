//! # Template Validation
//!
//! Structural and semantic checks over a template document. Parsing
//! problems, geometry that leaves no body area, duplicate ids, dangling or
//! cyclic includes and malformed `visibleIf` expressions are reported as a
//! list of issues, each addressed by a JSON-pointer-like path.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::error::FolioError;
use crate::expand::expand_includes;
use crate::template::{Element, Template};
use crate::visibility;

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Location in the document, `"(root)"` for the whole template.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a raw template document.
pub fn validate_value(value: &Value) -> Vec<ValidationIssue> {
    if !value.is_object() {
        return vec![ValidationIssue::new("(root)", "must be an object")];
    }
    match Template::from_value(value.clone()) {
        Ok(template) => validate(&template),
        Err(e) => vec![ValidationIssue::new("(root)", e.to_string())],
    }
}

/// Validate a parsed template.
pub fn validate(template: &Template) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    check_page(template, &mut issues);
    if let Some(unit) = template.unit.as_deref() {
        if unit != "pt" {
            issues.push(ValidationIssue::new("/unit", format!("unsupported unit \"{}\"", unit)));
        }
    }

    check_elements(template, &template.elements, "/elements", &mut issues);
    for (name, partial) in &template.partials {
        let scope = format!("/partials/{}/elements", name);
        check_elements(template, &partial.elements, &scope, &mut issues);
    }

    let mut paths = HashSet::new();
    for (i, field) in template.data_contract.fields.iter().enumerate() {
        let at = format!("/dataContract/fields/{}/path", i);
        if field.path.trim().is_empty() {
            issues.push(ValidationIssue::new(at, "must not be empty"));
        } else if !paths.insert(field.path.as_str()) {
            issues.push(ValidationIssue::new(at, format!("duplicate path \"{}\"", field.path)));
        }
    }

    if let Err(FolioError::CyclicPartial(name)) = expand_includes(template) {
        issues.push(ValidationIssue::new(
            format!("/partials/{}", name),
            "partial includes itself",
        ));
    }

    tracing::debug!(template = %template.id, issues = issues.len(), "template validated");
    issues
}

fn check_page(template: &Template, issues: &mut Vec<ValidationIssue>) {
    let page = &template.page;
    if !(page.width > 0.0) {
        issues.push(ValidationIssue::new("/page/width", "must be greater than 0"));
    }
    if !(page.height > 0.0) {
        issues.push(ValidationIssue::new("/page/height", "must be greater than 0"));
    }
    if page.header_height < 0.0 {
        issues.push(ValidationIssue::new("/page/headerHeight", "must not be negative"));
    }
    if page.footer_height < 0.0 {
        issues.push(ValidationIssue::new("/page/footerHeight", "must not be negative"));
    }
    if page.width > 0.0 && page.body_width() <= 0.0 {
        issues.push(ValidationIssue::new("/page/margin", "margins leave no body width"));
    }
    if page.height > 0.0 && page.body_height() <= 0.0 {
        issues.push(ValidationIssue::new(
            "/page",
            "margins, header and footer leave no body height",
        ));
    }
}

fn check_elements(
    template: &Template,
    elements: &[Element],
    scope: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    for (i, el) in elements.iter().enumerate() {
        let at = format!("{}/{}", scope, i);
        let base = el.base();

        if base.id.trim().is_empty() {
            issues.push(ValidationIssue::new(format!("{}/id", at), "must not be empty"));
        } else if !seen.insert(base.id.as_str()) {
            issues.push(ValidationIssue::new(
                format!("{}/id", at),
                format!("duplicate id \"{}\"", base.id),
            ));
        }

        if base.w < 0.0 || base.h < 0.0 {
            issues.push(ValidationIssue::new(at.clone(), "size must not be negative"));
        }

        if let Some(expr) = base.condition() {
            if let Err(e) = visibility::check(expr) {
                issues.push(ValidationIssue::new(format!("{}/visibleIf", at), e.to_string()));
            }
        }

        match el {
            Element::Include(inc) => {
                if inc.reference.trim().is_empty() {
                    issues.push(ValidationIssue::new(format!("{}/ref", at), "must not be empty"));
                } else if !template.partials.contains_key(&inc.reference) {
                    issues.push(ValidationIssue::new(
                        format!("{}/ref", at),
                        format!("unknown partial \"{}\"", inc.reference),
                    ));
                }
            }
            Element::Table(table) => {
                if table.rows.trim().is_empty() {
                    issues.push(ValidationIssue::new(format!("{}/rows", at), "must not be empty"));
                }
                if table.columns.is_empty() {
                    issues.push(ValidationIssue::new(
                        format!("{}/columns", at),
                        "must have at least one column",
                    ));
                }
                let row_height = table.pagination.as_ref().and_then(|p| p.row_height);
                if row_height.is_some_and(|h| !(h > 0.0)) {
                    issues.push(ValidationIssue::new(
                        format!("{}/pagination/rowHeight", at),
                        "must be greater than 0",
                    ));
                }
            }
            Element::FlowText(flow) => {
                if flow.columns == Some(0) {
                    issues.push(ValidationIssue::new(
                        format!("{}/columns", at),
                        "must be at least 1",
                    ));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn issues(doc: Value) -> Vec<String> {
        validate_value(&doc).iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_valid_template() {
        let doc = json!({
            "page": {"width": 595, "height": 842, "margin": {"top": 36, "right": 36, "bottom": 36, "left": 36}},
            "elements": [
                {"type": "text", "id": "a", "text": "{{x}}", "visibleIf": "exists(x) && len(items) > 0"},
                {"type": "include", "id": "f", "ref": "footer"}
            ],
            "partials": {"footer": {"elements": [{"type": "text", "id": "a", "text": "Thanks"}]}}
        });
        assert_eq!(issues(doc), Vec::<String>::new());
    }

    #[test]
    fn test_parse_failure() {
        assert_eq!(issues(json!([])), vec!["(root): must be an object"]);
        let found = issues(json!({"page": {"width": "wide", "height": 1}}));
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("(root): Parse error"));
    }

    #[test]
    fn test_page_geometry() {
        let found = issues(json!({
            "page": {"width": 0, "height": 100, "headerHeight": 60, "footerHeight": 60}
        }));
        assert_eq!(
            found,
            vec![
                "/page/width: must be greater than 0",
                "/page: margins, header and footer leave no body height",
            ]
        );
    }

    #[test]
    fn test_element_issues() {
        let found = issues(json!({
            "page": {"width": 595, "height": 842},
            "elements": [
                {"type": "text", "id": "a"},
                {"type": "text", "id": "a", "visibleIf": "exists(x"},
                {"type": "include", "id": "i", "ref": "nope"},
                {"type": "table", "id": "t", "rows": "", "columns": [], "pagination": {"mode": "auto", "rowHeight": 0}}
            ]
        }));
        assert_eq!(
            found,
            vec![
                "/elements/1/id: duplicate id \"a\"",
                "/elements/1/visibleIf: malformed operand: exists(x",
                "/elements/2/ref: unknown partial \"nope\"",
                "/elements/3/rows: must not be empty",
                "/elements/3/columns: must have at least one column",
                "/elements/3/pagination/rowHeight: must be greater than 0",
            ]
        );
    }

    #[test]
    fn test_cyclic_partials() {
        let found = issues(json!({
            "page": {"width": 595, "height": 842},
            "elements": [{"type": "include", "id": "i", "ref": "a"}],
            "partials": {
                "a": {"elements": [{"type": "include", "id": "j", "ref": "b"}]},
                "b": {"elements": [{"type": "include", "id": "k", "ref": "a"}]}
            }
        }));
        assert_eq!(found, vec!["/partials/a: partial includes itself"]);
    }

    #[test]
    fn test_contract_paths() {
        let found = issues(json!({
            "page": {"width": 595, "height": 842},
            "dataContract": {"fields": [{"path": "a"}, {"path": "a"}, {"path": " "}]}
        }));
        assert_eq!(
            found,
            vec![
                "/dataContract/fields/1/path: duplicate path \"a\"",
                "/dataContract/fields/2/path: must not be empty",
            ]
        );
    }
}
