//! # Editor State
//!
//! Application state of an interactive template editor, held in one struct
//! and passed by reference to whatever UI drives it. Covers the edit scope
//! (the template or one of its partials), the selection, design/preview
//! mode, the previewed page and unsaved-change tracking. Every preview goes
//! through the same [`Engine`] as final rendering.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::contract::{sync_contract, SyncReport};
use crate::engine::{Engine, RenderOptions, RenderedDocument};
use crate::error::FolioError;
use crate::template::{
    default_element, Element, ElementBase, IncludeElement, Partial, Region, Style, Template,
};
use crate::visibility::EvalMode;

/// Which element list edits apply to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditScope {
    #[default]
    Template,
    Partial(String),
}

/// Interactive editing session over one template.
#[derive(Debug, Clone)]
pub struct EditorState {
    template: Template,
    scope: EditScope,
    selected: Option<String>,
    mode: EvalMode,
    preview_page: usize,
    preview_page_count: usize,
    saved: Option<Value>,
    next_id: u64,
}

impl EditorState {
    /// Open a template. Its contract is synced with the bindings it uses and
    /// the result counts as saved.
    pub fn open(mut template: Template) -> Self {
        sync_contract(&mut template);
        let mut state = Self {
            template,
            scope: EditScope::Template,
            selected: None,
            mode: EvalMode::Evaluate,
            preview_page: 0,
            preview_page_count: 1,
            saved: None,
            next_id: 1,
        };
        state.mark_saved();
        state
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn into_template(self) -> Template {
        self.template
    }

    pub fn scope(&self) -> &EditScope {
        &self.scope
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// 0-based page shown by [`EditorState::preview`].
    pub fn preview_page(&self) -> usize {
        self.preview_page
    }

    pub fn preview_page_count(&self) -> usize {
        self.preview_page_count
    }

    // ------------------------------------------------------------------
    // Scope & selection
    // ------------------------------------------------------------------

    /// Elements of the current scope.
    pub fn elements(&self) -> &[Element] {
        match &self.scope {
            EditScope::Template => &self.template.elements,
            EditScope::Partial(name) => self
                .template
                .partials
                .get(name)
                .map(|p| p.elements.as_slice())
                .unwrap_or_default(),
        }
    }

    fn elements_mut(&mut self) -> Result<&mut Vec<Element>, FolioError> {
        match &self.scope {
            EditScope::Template => Ok(&mut self.template.elements),
            EditScope::Partial(name) => self
                .template
                .partials
                .get_mut(name)
                .map(|p| &mut p.elements)
                .ok_or_else(|| FolioError::NotFound(format!("partial {}", name))),
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements().iter().find(|e| e.id() == id)
    }

    /// Select an element of the current scope, or clear the selection.
    /// Returns false when `id` is not in scope.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        match id {
            None => {
                self.selected = None;
                true
            }
            Some(id) if self.element(id).is_some() => {
                self.selected = Some(id.to_string());
                true
            }
            Some(_) => false,
        }
    }

    /// Start editing a partial (entering design mode) or return to the
    /// template with `None`.
    pub fn edit_partial(&mut self, name: Option<&str>) -> Result<(), FolioError> {
        self.scope = match name {
            Some(name) if self.template.partials.contains_key(name) => {
                self.mode = EvalMode::Design;
                EditScope::Partial(name.to_string())
            }
            Some(name) => return Err(FolioError::NotFound(format!("partial {}", name))),
            None => EditScope::Template,
        };
        self.selected = None;
        Ok(())
    }

    /// Add an empty partial and switch to editing it.
    pub fn create_partial(&mut self, name: &str) -> Result<(), FolioError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolioError::InvalidTemplate("Partial name is required".into()));
        }
        if self.template.partials.contains_key(name) {
            return Err(FolioError::InvalidTemplate(format!("Partial already exists: {}", name)));
        }
        self.template.partials.insert(name.to_string(), Partial::default());
        self.edit_partial(Some(name))
    }

    // ------------------------------------------------------------------
    // Element edits
    // ------------------------------------------------------------------

    fn unique_id(&mut self, prefix: &str) -> String {
        loop {
            let id = format!("{}_{}", prefix, self.next_id);
            self.next_id += 1;
            if self.element(&id).is_none() {
                return id;
            }
        }
    }

    fn insert(&mut self, mut element: Element) -> Result<String, FolioError> {
        let id = self.unique_id(element.type_name());
        element.base_mut().id = id.clone();
        self.elements_mut()?.push(element);
        self.selected = Some(id.clone());
        Ok(id)
    }

    /// Add an element of `type_name` with editor defaults and select it.
    pub fn add_element(&mut self, type_name: &str) -> Result<String, FolioError> {
        if type_name == "include" {
            return Err(FolioError::InvalidTemplate(
                "includes are added with add_include".into(),
            ));
        }
        let element = default_element(type_name)
            .ok_or_else(|| FolioError::InvalidTemplate(format!("Unknown element type: {}", type_name)))?;
        self.insert(element)
    }

    /// Add an include of `partial`, sized to the partial's bounding box.
    pub fn add_include(&mut self, partial: &str) -> Result<String, FolioError> {
        let children = &self
            .template
            .partials
            .get(partial)
            .ok_or_else(|| FolioError::NotFound(format!("partial {}", partial)))?
            .elements;
        if self.scope == EditScope::Partial(partial.to_string()) {
            return Err(FolioError::CyclicPartial(partial.to_string()));
        }
        let (w, h) = bounding_size(children);
        let include = Element::Include(IncludeElement {
            base: ElementBase {
                region: Some(Region::Body),
                x: 20.0,
                y: 20.0,
                w,
                h,
                ..Default::default()
            },
            reference: partial.to_string(),
        });
        self.insert(include)
    }

    /// Apply `edit` to the element `id` of the current scope.
    pub fn update_element<F>(&mut self, id: &str, edit: F) -> Result<(), FolioError>
    where
        F: FnOnce(&mut Element),
    {
        let element = self
            .elements_mut()?
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| FolioError::NotFound(format!("element {}", id)))?;
        edit(element);
        Ok(())
    }

    /// Place an element in `region`, clamping it inside the region bounds.
    pub fn move_element(&mut self, id: &str, region: Region, x: f64, y: f64) -> Result<(), FolioError> {
        let bounds = self.template.page.region_rect(region);
        self.update_element(id, |el| {
            let base = el.base_mut();
            base.region = Some(region);
            base.x = x.clamp(0.0, (bounds.w - base.w).max(0.0));
            base.y = y.clamp(0.0, (bounds.h - base.h).max(0.0));
        })
    }

    /// Remove an element, clearing the selection if it was selected.
    pub fn delete_element(&mut self, id: &str) -> Result<Element, FolioError> {
        let elements = self.elements_mut()?;
        let index = elements
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| FolioError::NotFound(format!("element {}", id)))?;
        let removed = elements.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Styles & contract
    // ------------------------------------------------------------------

    /// The template's style presets, or a small built-in set when it has none.
    pub fn style_presets(&self) -> BTreeMap<String, Style> {
        if !self.template.styles.is_empty() {
            return self
                .template
                .styles
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        let preset = |size: f64, weight: &str| Style {
            size: Some(size),
            weight: Some(weight.to_string()),
            ..Default::default()
        };
        BTreeMap::from([
            ("Heading".to_string(), preset(16.0, "600")),
            ("Body".to_string(), preset(11.0, "400")),
            ("Caption".to_string(), preset(9.0, "400")),
        ])
    }

    /// Copy a preset's fields onto an element's style.
    pub fn apply_style_preset(&mut self, id: &str, preset: &str) -> Result<(), FolioError> {
        let style = self
            .style_presets()
            .remove(preset)
            .ok_or_else(|| FolioError::NotFound(format!("style preset {}", preset)))?;
        self.update_element(id, |el| {
            let base = el.base_mut();
            base.style = Some(base.style.take().unwrap_or_default().merged(&style));
        })
    }

    pub fn sync_contract(&mut self) -> SyncReport {
        sync_contract(&mut self.template)
    }

    // ------------------------------------------------------------------
    // Preview
    // ------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: EvalMode) {
        self.mode = mode;
    }

    /// Flip between design and data preview.
    pub fn toggle_preview(&mut self) -> EvalMode {
        self.mode = match self.mode {
            EvalMode::Design => EvalMode::Evaluate,
            EvalMode::Evaluate => EvalMode::Design,
        };
        self.mode
    }

    /// Move to another preview page, clamped to the last known page count.
    pub fn set_preview_page(&mut self, index: usize) -> usize {
        self.preview_page = index.min(self.preview_page_count.saturating_sub(1));
        self.preview_page
    }

    /// Lay out the current preview page against `data`.
    pub fn preview(&mut self, data: &Value) -> Result<RenderedDocument, FolioError> {
        let options = RenderOptions {
            mode: self.mode,
            page: Some(self.preview_page),
        };
        let doc = Engine::new(self.template.clone()).preview(data, options)?;
        self.preview_page_count = doc.page_count;
        self.preview_page = self.preview_page.min(doc.page_count.saturating_sub(1));
        Ok(doc)
    }

    // ------------------------------------------------------------------
    // Unsaved changes
    // ------------------------------------------------------------------

    fn snapshot(&self) -> Option<Value> {
        serde_json::to_value(&self.template).ok()
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.snapshot();
    }

    /// Whether the template changed since it was opened or last saved.
    pub fn is_dirty(&self) -> bool {
        self.snapshot() != self.saved
    }
}

/// Width and height spanned by a set of elements, with 200×60 for empty or
/// degenerate sets.
fn bounding_size(elements: &[Element]) -> (f64, f64) {
    if elements.is_empty() {
        return (200.0, 60.0);
    }
    let (mut x1, mut y1) = (f64::INFINITY, f64::INFINITY);
    let (mut x2, mut y2) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for el in elements {
        let b = el.base();
        x1 = x1.min(b.x);
        y1 = y1.min(b.y);
        x2 = x2.max(b.x + b.w);
        y2 = y2.max(b.y + b.h);
    }
    let w = x2 - x1;
    let h = y2 - y1;
    (
        if w.is_finite() && w > 0.0 { w } else { 200.0 },
        if h.is_finite() && h > 0.0 { h } else { 60.0 },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BoxContent;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn editor() -> EditorState {
        EditorState::open(
            Template::from_value(json!({
                "page": {"width": 400, "height": 300, "headerHeight": 40},
                "elements": [
                    {"type": "text", "id": "greeting", "text": "Hi {{name}}", "visibleIf": "exists(name)"}
                ],
                "partials": {
                    "sig": {"elements": [
                        {"type": "text", "id": "a", "x": 10, "y": 5, "w": 100, "h": 20},
                        {"type": "line", "id": "b", "x": 0, "y": 30, "w": 150, "h": 1}
                    ]}
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_open_syncs_contract_and_is_clean() {
        let state = editor();
        let paths: Vec<_> = state
            .template()
            .data_contract
            .fields
            .iter()
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(paths, vec!["name"]);
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_add_update_delete() {
        let mut state = editor();
        let id = state.add_element("qr").unwrap();
        assert_eq!(id, "qr_1");
        assert_eq!(state.selected(), Some("qr_1"));
        assert!(state.is_dirty());

        state
            .update_element(&id, |el| {
                if let Element::Qr(qr) = el {
                    qr.value = "{{invoice.url}}".into();
                }
            })
            .unwrap();
        let report = state.sync_contract();
        assert_eq!(report.added, vec!["invoice.url"]);

        state.delete_element(&id).unwrap();
        assert_eq!(state.selected(), None);
        assert!(matches!(state.delete_element(&id), Err(FolioError::NotFound(_))));
        assert!(matches!(state.add_element("sparkle"), Err(FolioError::InvalidTemplate(_))));
    }

    #[test]
    fn test_move_clamps_to_region() {
        let mut state = editor();
        state.move_element("greeting", Region::Header, 1000.0, -5.0).unwrap();
        let base = state.element("greeting").unwrap().base().clone();
        assert_eq!(base.region, Some(Region::Header));
        assert_eq!(base.x, 400.0 - base.w);
        assert_eq!(base.y, 0.0);
    }

    #[test]
    fn test_include_sized_from_partial() {
        let mut state = editor();
        let id = state.add_include("sig").unwrap();
        let base = state.element(&id).unwrap().base();
        assert_eq!((base.w, base.h), (150.0, 26.0));
        assert!(matches!(state.add_include("missing"), Err(FolioError::NotFound(_))));
    }

    #[test]
    fn test_partial_scope() {
        let mut state = editor();
        state.create_partial("terms").unwrap();
        assert_eq!(state.scope(), &EditScope::Partial("terms".into()));
        assert_eq!(state.mode(), EvalMode::Design);
        state.add_element("text").unwrap();
        assert_eq!(state.template().partials["terms"].elements.len(), 1);
        assert_eq!(state.template().elements.len(), 1);
        assert!(matches!(state.add_include("terms"), Err(FolioError::CyclicPartial(_))));
        assert!(state.create_partial("terms").is_err());

        state.edit_partial(None).unwrap();
        assert_eq!(state.scope(), &EditScope::Template);
        assert!(state.select(Some("greeting")));
        assert!(!state.select(Some("text_1")));
    }

    #[test]
    fn test_style_presets() {
        let mut state = editor();
        assert_eq!(
            state.style_presets().keys().collect::<Vec<_>>(),
            vec!["Body", "Caption", "Heading"]
        );
        state.apply_style_preset("greeting", "Heading").unwrap();
        let style = state.element("greeting").unwrap().base().style.clone().unwrap();
        assert_eq!(style.size, Some(16.0));
        assert_eq!(style.weight.as_deref(), Some("600"));
    }

    #[test]
    fn test_preview_modes() {
        let mut state = editor();
        let doc = state.preview(&json!({})).unwrap();
        assert!(doc.pages[0].body.is_empty());

        assert_eq!(state.toggle_preview(), EvalMode::Design);
        let doc = state.preview(&json!({})).unwrap();
        assert_eq!(
            doc.pages[0].body[0].content,
            BoxContent::Text { text: "Hi ".into(), rich: false }
        );
        assert_eq!(state.set_preview_page(5), 0);
    }
}
