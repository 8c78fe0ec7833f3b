//! # Data Contract
//!
//! Maps an external payload onto the shape a template expects.
//!
//! Fields are processed as an ordered fold over a working copy of the input:
//! a field may read a value that an earlier field wrote at its own `path`.
//! Problems with individual fields are reported as diagnostics, never as
//! errors.
//!
//! ```
//! use folio::contract::evaluate_contract;
//! use folio::template::Template;
//! use serde_json::json;
//!
//! let template = Template::from_value(json!({
//!     "page": {"width": 595, "height": 842},
//!     "dataContract": {"fields": [{"path": "total", "required": true}]}
//! })).unwrap();
//! let eval = evaluate_contract(&template, &json!({}));
//! assert_eq!(eval.missing_required, vec!["total"]);
//! ```

pub mod discover;
pub mod locale;
pub mod transform;

pub use discover::{collect_bindings, missing_bindings, sync_contract, SyncReport};
pub use locale::Locale;
pub use transform::TransformError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::path::{assign, is_empty_value, resolve};
use crate::template::{DataContractField, FieldSource, Template};

/// Outcome for one contract field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiagnostic {
    pub path: String,
    pub required: bool,
    pub source: FieldSource,
    pub external_path: String,
    pub transform: String,
    pub used_default: bool,
    pub missing: bool,
    /// Transform failure message; empty when the transform succeeded.
    #[serde(default)]
    pub error: String,
    /// Value written to the mapped data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Mapped data plus per-field diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEvaluation {
    pub data: Value,
    pub fields: Vec<FieldDiagnostic>,
    pub missing_required: Vec<String>,
}

impl ContractEvaluation {
    /// Whether a final render may proceed.
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Fields whose transform failed.
    pub fn errors(&self) -> impl Iterator<Item = &FieldDiagnostic> {
        self.fields.iter().filter(|f| !f.error.is_empty())
    }
}

/// Evaluate the template's contract against `input`.
///
/// The input is never modified; mapping happens on a clone.
pub fn evaluate_contract(template: &Template, input: &Value) -> ContractEvaluation {
    let fields = &template.data_contract.fields;
    let source = if input.is_null() {
        Value::Object(Default::default())
    } else {
        input.clone()
    };
    if fields.is_empty() {
        return ContractEvaluation {
            data: source,
            fields: Vec::new(),
            missing_required: Vec::new(),
        };
    }

    let default_currency = template.default_currency();
    let mut working = source.clone();
    let mut diagnostics = Vec::with_capacity(fields.len());
    let mut missing_required = Vec::new();

    for field in fields.iter().filter(|f| !f.path.is_empty()) {
        let diag = evaluate_field(field, &source, &mut working, default_currency);
        if diag.missing && diag.required {
            missing_required.push(field.path.clone());
        }
        diagnostics.push(diag);
    }

    tracing::debug!(
        fields = diagnostics.len(),
        missing_required = missing_required.len(),
        "contract evaluated"
    );

    ContractEvaluation {
        data: working,
        fields: diagnostics,
        missing_required,
    }
}

/// One step of the fold: resolve, default, transform, write back.
fn evaluate_field(
    field: &DataContractField,
    source: &Value,
    working: &mut Value,
    default_currency: Option<&str>,
) -> FieldDiagnostic {
    let mut diag = FieldDiagnostic {
        path: field.path.clone(),
        required: field.required,
        source: field.source,
        external_path: field.external_path().to_string(),
        transform: field.transform.as_str().to_string(),
        used_default: false,
        missing: false,
        error: String::new(),
        value: None,
    };

    let mut value = match field.source {
        FieldSource::External => {
            let external = resolve(source, field.external_path());
            if is_empty_value(external) {
                resolve(working, &field.path).cloned()
            } else {
                external.cloned()
            }
        }
        FieldSource::Template | FieldSource::Computed => resolve(working, &field.path).cloned(),
    };

    if is_empty_value(value.as_ref()) {
        if let Some(default) = &field.default_value {
            value = Some(default.clone());
            diag.used_default = true;
        }
    }

    let value = match value {
        Some(v) if !is_empty_value(Some(&v)) => v,
        _ => {
            diag.missing = true;
            return diag;
        }
    };

    let value = match transform::apply(&value, field, default_currency) {
        Ok(v) => v,
        Err(e) => {
            diag.error = e.to_string();
            value
        }
    };

    if !is_empty_value(Some(&value)) {
        assign(working, &field.path, value.clone());
        diag.value = Some(value);
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Transform;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn template_with(fields: Vec<DataContractField>) -> Template {
        let mut t = Template::blank("contract");
        t.data_contract.fields = fields;
        t
    }

    fn field(path: &str) -> DataContractField {
        DataContractField {
            path: path.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_contract_passes_data_through() {
        let t = template_with(Vec::new());
        let input = json!({"a": 1});
        let eval = evaluate_contract(&t, &input);
        assert_eq!(eval.data, input);
        assert!(eval.fields.is_empty());
        assert!(eval.is_complete());
    }

    #[test]
    fn test_missing_required_field() {
        let t = template_with(vec![DataContractField {
            required: true,
            ..field("total")
        }]);
        let eval = evaluate_contract(&t, &json!({"other": 1}));
        assert_eq!(eval.missing_required, vec!["total".to_string()]);
        assert!(eval.fields[0].missing);
        assert!(!eval.is_complete());
    }

    #[test]
    fn test_far_array_index_leaves_data_alone() {
        let t = template_with(vec![DataContractField {
            default_value: Some(json!("x")),
            ..field("items.4000000000000.name")
        }]);
        let input = json!({"items": []});
        let eval = evaluate_contract(&t, &input);
        assert_eq!(eval.data, input);
        assert!(eval.fields[0].used_default);
    }

    #[test]
    fn test_currency_uses_template_variable() {
        let mut t = template_with(vec![DataContractField {
            transform: Transform::Currency,
            ..field("price")
        }]);
        t.variables.insert("currency".into(), json!("EUR"));
        let eval = evaluate_contract(&t, &json!({"price": "19.99"}));
        assert_eq!(eval.data["price"], json!("€19.99"));
        assert_eq!(eval.fields[0].error, "");
        assert_eq!(eval.errors().count(), 0);
    }

    #[test]
    fn test_external_path_mapping() {
        let t = template_with(vec![DataContractField {
            external_path: Some("payload.client.fullName".into()),
            transform: Transform::Uppercase,
            ..field("customer.name")
        }]);
        let input = json!({"payload": {"client": {"fullName": "ada lovelace"}}});
        let eval = evaluate_contract(&t, &input);
        assert_eq!(eval.data["customer"]["name"], json!("ADA LOVELACE"));
        assert_eq!(eval.fields[0].external_path, "payload.client.fullName");
        // raw input untouched
        assert!(input.get("customer").is_none());
    }

    #[test]
    fn test_external_falls_back_to_mapped_path_then_default() {
        let t = template_with(vec![
            DataContractField {
                external_path: Some("nowhere".into()),
                ..field("already")
            },
            DataContractField {
                default_value: Some(json!("n/a")),
                ..field("vat")
            },
        ]);
        let eval = evaluate_contract(&t, &json!({"already": "here"}));
        assert_eq!(eval.data["already"], json!("here"));
        assert!(!eval.fields[0].used_default);
        assert_eq!(eval.data["vat"], json!("n/a"));
        assert!(eval.fields[1].used_default);
        assert!(!eval.fields[1].missing);
    }

    #[test]
    fn test_empty_default_is_still_missing() {
        let t = template_with(vec![DataContractField {
            required: true,
            default_value: Some(json!("")),
            ..field("name")
        }]);
        let eval = evaluate_contract(&t, &json!({}));
        assert!(eval.fields[0].used_default);
        assert!(eval.fields[0].missing);
        assert_eq!(eval.missing_required, vec!["name".to_string()]);
    }

    #[test]
    fn test_computed_field_sees_earlier_writes() {
        let t = template_with(vec![
            DataContractField {
                external_path: Some("raw.amount".into()),
                transform: Transform::Number,
                ..field("amount")
            },
            DataContractField {
                source: FieldSource::Computed,
                transform: Transform::Currency,
                ..field("amount")
            },
        ]);
        let eval = evaluate_contract(&t, &json!({"raw": {"amount": "7"}}));
        assert_eq!(eval.fields[0].value, Some(json!(7)));
        assert_eq!(eval.data["amount"], json!("$7.00"));
    }

    #[test]
    fn test_transform_error_keeps_value() {
        let t = template_with(vec![DataContractField {
            transform: Transform::Number,
            ..field("qty")
        }]);
        let eval = evaluate_contract(&t, &json!({"qty": "three"}));
        assert_eq!(eval.data["qty"], json!("three"));
        assert_eq!(eval.fields[0].error, "Cannot convert to number: three");
        assert_eq!(eval.errors().count(), 1);
    }

    #[test]
    fn test_blank_paths_skipped() {
        let t = template_with(vec![field(""), field("a")]);
        let eval = evaluate_contract(&t, &json!({"a": 1}));
        assert_eq!(eval.fields.len(), 1);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let mut t = template_with(vec![
            DataContractField {
                transform: Transform::Titlecase,
                ..field("name")
            },
            DataContractField {
                transform: Transform::Date,
                ..field("issued")
            },
            DataContractField {
                required: true,
                ..field("total")
            },
        ]);
        t.variables.insert("currency".into(), json!("EUR"));
        let input = json!({"name": "ada", "issued": "2024-03-01"});
        let first = evaluate_contract(&t, &input);
        let second = evaluate_contract(&t, &input);
        assert_eq!(first, second);
    }
}
