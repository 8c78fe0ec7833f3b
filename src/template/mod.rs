//! # Template Model
//!
//! A single type hierarchy that is both the Rust API and the JSON template
//! format. `Template` is constructible in Rust and deserializable from JSON.
//!
//! ```
//! use folio::template::*;
//!
//! let json = r#"{
//!     "name": "Invoice",
//!     "page": {"width": 595, "height": 842},
//!     "elements": [
//!         {"type": "text", "id": "title", "x": 0, "y": 0, "w": 200, "h": 20, "text": "Invoice {{number}}"}
//!     ]
//! }"#;
//! let template = Template::from_json(json).unwrap();
//! assert_eq!(template.elements.len(), 1);
//! assert_eq!(template.elements[0].type_name(), "text");
//! ```

pub mod types;

pub use types::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::FolioError;

// ============================================================================
// PAGE GEOMETRY
// ============================================================================

/// Page margins in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

/// Physical page description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    /// Informational paper name, e.g. "A4".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub margin: Margins,
    #[serde(default)]
    pub header_height: f64,
    #[serde(default)]
    pub footer_height: f64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::a4()
    }
}

/// Axis-aligned rectangle in page coordinates (points, top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PageSpec {
    /// A4 portrait with half-inch margins and no header/footer bands.
    pub fn a4() -> Self {
        Self {
            size: Some("A4".into()),
            width: 595.0,
            height: 842.0,
            margin: Margins {
                top: 36.0,
                right: 36.0,
                bottom: 36.0,
                left: 36.0,
            },
            header_height: 0.0,
            footer_height: 0.0,
        }
    }

    /// Width shared by all three regions.
    pub fn body_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    /// Height left for the body once margins and bands are removed.
    pub fn body_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom - self.header_height - self.footer_height
    }

    /// Rectangle of a region in page coordinates.
    pub fn region_rect(&self, region: Region) -> Rect {
        let x = self.margin.left;
        let w = self.body_width();
        match region {
            Region::Header => Rect { x, y: self.margin.top, w, h: self.header_height },
            Region::Body => Rect {
                x,
                y: self.margin.top + self.header_height,
                w,
                h: self.body_height(),
            },
            Region::Footer => Rect {
                x,
                y: self.margin.top + self.header_height + self.body_height(),
                w,
                h: self.footer_height,
            },
        }
    }
}

// ============================================================================
// FONTS & PARTIALS
// ============================================================================

/// Where a font face is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontSource {
    #[default]
    Local,
    Url,
    Data,
}

/// Font declaration with fallback families.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    #[serde(default)]
    pub source: FontSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Data URI for embedded fonts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub fallback: Vec<String>,
}

/// Named reusable element group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partial {
    #[serde(default)]
    pub elements: Vec<Element>,
}

// ============================================================================
// TEMPLATE
// ============================================================================

/// Name of the style preset merged under every element style.
pub const DEFAULT_TEXT_STYLE: &str = "defaultText";

/// A page document template: layout, styling, binding rules.
///
/// Immutable once handed to the engine for a render pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "types::deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    /// Coordinate unit; only points are supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub page: PageSpec,
    #[serde(default)]
    pub fonts: Vec<Font>,
    /// Style presets by name. `defaultText` is the base text style.
    #[serde(default)]
    pub styles: HashMap<String, Style>,
    #[serde(default)]
    pub data_contract: DataContract,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub partials: BTreeMap<String, Partial>,
    /// Template-level variables, e.g. the default `currency`.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Manual minimum page count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<f64>,
}

impl Default for Template {
    fn default() -> Self {
        Self::blank("Untitled Template")
    }
}

impl Template {
    /// A fresh template with A4 page, common fonts and a default text style.
    pub fn blank(name: impl Into<String>) -> Self {
        let mut styles = HashMap::new();
        styles.insert(
            DEFAULT_TEXT_STYLE.to_string(),
            Style {
                font: Some("Arial".into()),
                size: Some(11.0),
                color: Some("#111111".into()),
                line_height: Some(14.0),
                ..Default::default()
            },
        );
        Self {
            id: format!("tmpl_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            version: Some("1.0.0".into()),
            unit: Some("pt".into()),
            page: PageSpec::a4(),
            fonts: vec![
                Font {
                    name: "Arial".into(),
                    fallback: vec!["Helvetica".into(), "sans-serif".into()],
                    ..Default::default()
                },
                Font {
                    name: "Times New Roman".into(),
                    fallback: vec!["Times".into(), "serif".into()],
                    ..Default::default()
                },
            ],
            styles,
            data_contract: DataContract::default(),
            elements: Vec::new(),
            partials: BTreeMap::new(),
            variables: HashMap::new(),
            page_count: None,
        }
    }

    /// Parse a template document.
    pub fn from_json(json: &str) -> Result<Self, FolioError> {
        serde_json::from_str(json).map_err(|e| FolioError::Parse(format!("template: {}", e)))
    }

    /// Parse a template from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, FolioError> {
        serde_json::from_value(value).map_err(|e| FolioError::Parse(format!("template: {}", e)))
    }

    /// The `defaultText` style preset, if declared.
    pub fn default_text_style(&self) -> Option<&Style> {
        self.styles.get(DEFAULT_TEXT_STYLE)
    }

    /// Template-level default currency code (`variables.currency`).
    pub fn default_currency(&self) -> Option<&str> {
        self.variables
            .get("currency")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
    }

    /// Manual page count override, at least 1.
    pub fn manual_page_count(&self) -> usize {
        match self.page_count {
            Some(n) if n.is_finite() && n >= 1.0 => n.floor() as usize,
            _ => 1,
        }
    }
}

// ============================================================================
// ELEMENT ENUM
// ============================================================================

/// Define the Element enum and all dispatch methods from a single list.
///
/// Adding a new element kind: add one line here, then define the struct in
/// `types.rs` with `impl ElementMeta`.
macro_rules! define_elements {
    ($($variant:ident($inner:ty) => $tag:literal),+ $(,)?) => {
        /// A template element: closed tagged union over element kinds.
        ///
        /// The `#[serde(tag = "type")]` attribute enables JSON like
        /// `{"type": "text", "id": "t1", "text": "Hello"}`.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(tag = "type")]
        pub enum Element {
            $(#[serde(rename = $tag)] $variant($inner),)+
        }

        impl Element {
            /// Fields shared by all kinds.
            pub fn base(&self) -> &ElementBase {
                match self { $(Element::$variant(e) => &e.base,)+ }
            }

            /// Mutable access to the shared fields.
            pub fn base_mut(&mut self) -> &mut ElementBase {
                match self { $(Element::$variant(e) => &mut e.base,)+ }
            }

            /// JSON type tag (e.g. `"flowText"`).
            pub fn type_name(&self) -> &'static str {
                match self { $(Element::$variant(_) => $tag,)+ }
            }

            /// Human-readable display label (from [`ElementMeta::label`]).
            pub fn label(&self) -> &'static str {
                match self { $(Element::$variant(_) => <$inner>::label(),)+ }
            }

            /// Editor defaults for every element kind (from [`ElementMeta::editor_default`]).
            pub fn all_editor_defaults() -> Vec<Self> {
                vec![$(Element::$variant(<$inner>::editor_default()),)+]
            }
        }
    };
}

define_elements! {
    Text(TextElement) => "text",
    FlowText(FlowTextElement) => "flowText",
    Image(ImageElement) => "image",
    Table(TableElement) => "table",
    Qr(QrElement) => "qr",
    Line(LineElement) => "line",
    Rect(RectElement) => "box",
    Include(IncludeElement) => "include",
}

impl Element {
    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Text-bearing fields that may contain `{{bindings}}`.
    pub fn binding_fields(&self) -> Vec<&str> {
        match self {
            Element::Text(e) => vec![e.text.as_str()],
            Element::FlowText(e) => vec![e.text.as_str()],
            Element::Image(e) => vec![e.src.as_str()],
            Element::Table(e) => vec![e.rows.as_str()],
            Element::Qr(e) => vec![e.value.as_str()],
            Element::Line(_) | Element::Rect(_) | Element::Include(_) => Vec::new(),
        }
    }
}

/// Element kinds for the editor palette.
#[derive(Debug, Clone, Serialize)]
pub struct ElementTypeMeta {
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: String,
}

/// Element kind metadata, derived from [`Element::all_editor_defaults`].
pub fn element_types() -> Vec<ElementTypeMeta> {
    Element::all_editor_defaults()
        .iter()
        .map(|e| ElementTypeMeta {
            type_name: e.type_name().to_string(),
            label: e.label().to_string(),
        })
        .collect()
}

/// Create an element with editor defaults by type name.
///
/// Returns `None` for unknown type names.
pub fn default_element(type_name: &str) -> Option<Element> {
    Element::all_editor_defaults()
        .into_iter()
        .find(|e| e.type_name() == type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_template() {
        let json = r#"{"page": {"width": 300, "height": 400}}"#;
        let t = Template::from_json(json).unwrap();
        assert_eq!(t.page.width, 300.0);
        assert_eq!(t.page.margin, Margins::default());
        assert!(t.elements.is_empty());
        assert_eq!(t.manual_page_count(), 1);
    }

    #[test]
    fn test_region_rects() {
        let page = PageSpec {
            size: None,
            width: 600.0,
            height: 800.0,
            margin: Margins { top: 20.0, right: 30.0, bottom: 40.0, left: 10.0 },
            header_height: 50.0,
            footer_height: 60.0,
        };
        assert_eq!(page.body_width(), 560.0);
        assert_eq!(page.body_height(), 630.0);
        assert_eq!(page.region_rect(Region::Header), Rect { x: 10.0, y: 20.0, w: 560.0, h: 50.0 });
        assert_eq!(page.region_rect(Region::Body), Rect { x: 10.0, y: 70.0, w: 560.0, h: 630.0 });
        assert_eq!(page.region_rect(Region::Footer), Rect { x: 10.0, y: 700.0, w: 560.0, h: 60.0 });
    }

    #[test]
    fn test_element_kinds_parse() {
        let json = r##"{
            "page": {"width": 595, "height": 842},
            "elements": [
                {"type": "text", "id": "a", "text": "hi", "richText": true},
                {"type": "flowText", "id": "b", "text": "long", "columns": 2},
                {"type": "image", "id": "c", "src": "{{logo}}", "fit": "cover"},
                {"type": "table", "id": "d", "rows": "{{items}}", "columns": [{"header": "Name", "field": "name"}],
                 "pagination": {"mode": "auto", "rowHeight": 16}, "fillMode": "pad", "continuationY": 10},
                {"type": "qr", "id": "e", "value": "{{url}}"},
                {"type": "line", "id": "f", "region": "footer"},
                {"type": "box", "id": "g", "style": {"fill": "#eee", "weight": 600}},
                {"type": "include", "id": "h", "ref": "address"}
            ]
        }"##;
        let t = Template::from_json(json).unwrap();
        let names: Vec<_> = t.elements.iter().map(|e| e.type_name()).collect();
        assert_eq!(
            names,
            vec!["text", "flowText", "image", "table", "qr", "line", "box", "include"]
        );
        match &t.elements[3] {
            Element::Table(table) => {
                assert!(table.is_auto_paginated());
                assert_eq!(table.row_height(), 16.0);
                assert_eq!(table.fill_mode, FillMode::Pad);
                assert_eq!(table.continuation_y(), 10.0);
            }
            other => panic!("expected table, got {:?}", other),
        }
        match &t.elements[6] {
            Element::Rect(r) => {
                assert_eq!(r.base.style.as_ref().unwrap().weight.as_deref(), Some("600"));
            }
            other => panic!("expected box, got {:?}", other),
        }
        match &t.elements[7] {
            Element::Include(inc) => assert_eq!(inc.reference, "address"),
            other => panic!("expected include, got {:?}", other),
        }
        assert_eq!(t.elements[5].base().region(), Region::Footer);
    }

    #[test]
    fn test_unknown_element_type_is_error() {
        let json = r#"{"page": {"width": 1, "height": 1}, "elements": [{"type": "video", "id": "v"}]}"#;
        assert!(matches!(Template::from_json(json), Err(FolioError::Parse(_))));
    }

    #[test]
    fn test_default_repeat_by_region() {
        let mut base = ElementBase::default();
        assert_eq!(base.repeat(), Repeat::First);
        base.region = Some(Region::Header);
        assert_eq!(base.repeat(), Repeat::All);
        base.repeat = Some(Repeat::Last);
        assert_eq!(base.repeat(), Repeat::Last);
    }

    #[test]
    fn test_unknown_repeat_shows_on_first_page() {
        let json = r#"{"page": {"width": 100, "height": 100},
            "elements": [{"type": "text", "id": "a", "repeat": "everyOther", "text": "x"}]}"#;
        let t = Template::from_json(json).unwrap();
        let repeat = t.elements[0].base().repeat();
        assert_eq!(repeat, Repeat::Unknown);
        assert!(repeat.includes(0, 3));
        assert!(!repeat.includes(1, 3));
    }

    #[test]
    fn test_explicit_page() {
        let mut base = ElementBase::default();
        assert_eq!(base.explicit_page(), None);
        base.page = Some(2.7);
        assert_eq!(base.explicit_page(), Some(2));
        base.page = Some(0.0);
        assert_eq!(base.explicit_page(), None);
    }

    #[test]
    fn test_row_height_priority() {
        let mut table = TableElement::default();
        assert_eq!(table.row_height(), 14.0);
        table.row_style = Some(Style { line_height: Some(18.0), ..Default::default() });
        assert_eq!(table.row_height(), 18.0);
        table.pagination = Some(TablePagination { mode: PaginationMode::Auto, row_height: Some(20.0) });
        assert_eq!(table.row_height(), 20.0);
    }

    #[test]
    fn test_style_merge() {
        let base = Style { size: Some(11.0), color: Some("#111".into()), ..Default::default() };
        let over = Style { color: Some("#f00".into()), ..Default::default() };
        let merged = base.merged(&over);
        assert_eq!(merged.size, Some(11.0));
        assert_eq!(merged.color.as_deref(), Some("#f00"));
    }

    #[test]
    fn test_editor_defaults_complete() {
        let types = element_types();
        let defaults = Element::all_editor_defaults();
        assert_eq!(types.len(), defaults.len());

        let mut seen = std::collections::HashSet::new();
        for meta in &types {
            assert!(seen.insert(&meta.type_name), "Duplicate type: {}", meta.type_name);
            let el = default_element(&meta.type_name);
            assert!(el.is_some(), "No default for type: {}", meta.type_name);
            let json = serde_json::to_value(el.unwrap()).unwrap();
            assert_eq!(json["type"].as_str().unwrap(), meta.type_name);
        }
    }

    #[test]
    fn test_serialize_roundtrip_keeps_tags() {
        let mut t = Template::blank("Letter");
        t.elements.push(default_element("flowText").unwrap());
        t.elements.push(default_element("box").unwrap());
        let json = serde_json::to_string(&t).unwrap();
        let back = Template::from_json(&json).unwrap();
        assert_eq!(back.elements[0].type_name(), "flowText");
        assert_eq!(back.elements[1].type_name(), "box");
        assert_eq!(back.default_text_style().unwrap().size, Some(11.0));
    }

    #[test]
    fn test_default_currency() {
        let mut t = Template::blank("x");
        assert_eq!(t.default_currency(), None);
        t.variables.insert("currency".into(), Value::String("EUR".into()));
        assert_eq!(t.default_currency(), Some("EUR"));
    }
}
