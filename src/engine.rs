//! # Engine
//!
//! The one entry point shared by interactive preview and final rendering.
//! Both paths run the same pipeline:
//!
//! 1. data contract evaluation (mapping, defaults, transforms)
//! 2. partial expansion
//! 3. pagination of the body table and flow text
//! 4. per-page layout with visibility and binding substitution
//!
//! They differ only in policy: [`Engine::render`] refuses when required
//! contract fields are missing, [`Engine::preview`] reports them and lays out
//! the document anyway.
//!
//! ```
//! use folio::{Engine, Template};
//! use serde_json::json;
//!
//! let template = Template::from_value(json!({
//!     "page": {"width": 595, "height": 842},
//!     "elements": [{"type": "text", "id": "hi", "text": "Hello {{name}}"}]
//! })).unwrap();
//! let doc = Engine::new(template).render(&json!({"name": "Ada"})).unwrap();
//! assert_eq!(doc.page_count, 1);
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::contract::{evaluate_contract, missing_bindings, ContractEvaluation};
use crate::error::FolioError;
use crate::expand::expand_includes;
use crate::layout::{assemble, PageLayout};
use crate::paginate::plan_pages;
use crate::template::{Font, PageSpec, Template};
use crate::visibility::EvalMode;

/// How a layout pass runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub mode: EvalMode,
    /// Single 0-based page to lay out; all pages when `None`.
    pub page: Option<usize>,
}

/// Recoverable problems found while producing a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub missing_required: Vec<String>,
    /// `"{path}: {message}"` for every failed transform.
    pub transform_errors: Vec<String>,
    /// Text bindings with no value in the mapped data.
    pub missing_bindings: Vec<String>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.missing_required.is_empty()
            && self.transform_errors.is_empty()
            && self.missing_bindings.is_empty()
    }
}

/// Laid-out document ready for a rasterizer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub name: String,
    pub page: PageSpec,
    pub fonts: Vec<Font>,
    pub page_count: usize,
    pub pages: Vec<PageLayout>,
    pub diagnostics: Diagnostics,
}

/// Template evaluation and layout engine.
#[derive(Debug, Clone)]
pub struct Engine {
    template: Template,
}

impl Engine {
    pub fn new(template: Template) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Map `data` through the template's contract.
    pub fn evaluate(&self, data: &Value) -> ContractEvaluation {
        evaluate_contract(&self.template, data)
    }

    /// Lay out the document for display, flagging missing required fields
    /// instead of refusing.
    pub fn preview(&self, data: &Value, options: RenderOptions) -> Result<RenderedDocument, FolioError> {
        let evaluation = self.evaluate(data);
        self.layout(evaluation, options)
    }

    /// Lay out every page for final output.
    ///
    /// Fails with [`FolioError::MissingRequired`] before any layout work when
    /// required contract fields are empty.
    pub fn render(&self, data: &Value) -> Result<RenderedDocument, FolioError> {
        let evaluation = self.evaluate(data);
        if !evaluation.is_complete() {
            tracing::warn!(
                template = %self.template.id,
                missing = ?evaluation.missing_required,
                "render refused"
            );
            return Err(FolioError::MissingRequired(evaluation.missing_required));
        }
        self.layout(evaluation, RenderOptions::default())
    }

    fn layout(
        &self,
        evaluation: ContractEvaluation,
        options: RenderOptions,
    ) -> Result<RenderedDocument, FolioError> {
        let elements = expand_includes(&self.template)?;
        let data = &evaluation.data;
        let plan = plan_pages(&self.template, &elements, data);
        let range = match options.page {
            Some(p) => p.min(plan.page_count - 1)..p.min(plan.page_count - 1) + 1,
            None => 0..plan.page_count,
        };
        let pages = assemble(&self.template, &elements, data, &plan, options.mode, range);

        let diagnostics = Diagnostics {
            transform_errors: evaluation
                .errors()
                .map(|f| format!("{}: {}", f.path, f.error))
                .collect(),
            missing_bindings: missing_bindings(&self.template, data),
            missing_required: evaluation.missing_required,
        };

        tracing::debug!(
            template = %self.template.id,
            page_count = plan.page_count,
            laid_out = pages.len(),
            "document laid out"
        );

        Ok(RenderedDocument {
            name: self.template.name.clone(),
            page: self.template.page.clone(),
            fonts: self.template.fonts.clone(),
            page_count: plan.page_count,
            pages,
            diagnostics,
        })
    }
}
