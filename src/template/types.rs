//! Element, style, and data-contract types for the template model.
//!
//! All types derive `Serialize + Deserialize` so the same types work for
//! both Rust API construction and JSON template documents.
//!
//! Each element struct implements [`ElementMeta`] to declare its display label
//! and editor default. This metadata is used by the editor state and API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata that every element struct must provide.
///
/// The label and editor default live next to each struct definition,
/// so adding a new element kind is self-contained: implement this
/// trait and the compiler will guide you to the remaining exhaustive
/// matches in `Element`.
pub trait ElementMeta: Sized {
    /// Human-readable display label (e.g. "Flow Text", "QR Code").
    fn label() -> &'static str;

    /// Sensible starter value for the editor.
    ///
    /// Distinct from `Default`: editor defaults have example content and a
    /// usable size so new elements are immediately visible on the page.
    fn editor_default() -> Self;
}

/// Accepts either a JSON string or a JSON number and keeps it as a string.
///
/// Used for fields like font weight (`"bold"` or `600`) and template
/// version (`"1.0.0"` or `3`).
pub(crate) fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    let opt: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(opt.map(|v| match v {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

// ============================================================================
// PLACEMENT
// ============================================================================

/// Page subdivision an element is positioned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Header,
    #[default]
    Body,
    Footer,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Header => "header",
            Region::Body => "body",
            Region::Footer => "footer",
        }
    }
}

/// Which document pages an element appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    All,
    First,
    AfterFirst,
    Middle,
    Last,
    /// Unrecognized policy; shows on the first page only.
    #[serde(other)]
    Unknown,
}

impl Repeat {
    /// Default policy: body content appears once, header/footer content on every page.
    pub fn default_for(region: Region) -> Self {
        match region {
            Region::Body => Repeat::First,
            Region::Header | Region::Footer => Repeat::All,
        }
    }

    /// Whether a non-paginated element with this policy shows on page `index` of `count`.
    pub fn includes(&self, index: usize, count: usize) -> bool {
        match self {
            Repeat::All => true,
            Repeat::First | Repeat::Unknown => index == 0,
            Repeat::AfterFirst => index > 0,
            Repeat::Middle => index > 0 && index + 1 < count,
            Repeat::Last => index + 1 == count,
        }
    }
}

// ============================================================================
// STYLE
// ============================================================================

/// Visual style of an element. Every field is optional; merging is field-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Font size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// CSS-like weight: `"bold"` or a number such as `600`.
    #[serde(
        default,
        deserialize_with = "deserialize_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// "left", "center", "right".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Style {
    /// Layer `over` on top of `self`; fields set in `over` win.
    pub fn merged(&self, over: &Style) -> Style {
        Style {
            font: over.font.clone().or_else(|| self.font.clone()),
            size: over.size.or(self.size),
            weight: over.weight.clone().or_else(|| self.weight.clone()),
            font_style: over.font_style.clone().or_else(|| self.font_style.clone()),
            color: over.color.clone().or_else(|| self.color.clone()),
            align: over.align.clone().or_else(|| self.align.clone()),
            line_height: over.line_height.or(self.line_height),
            border_color: over.border_color.clone().or_else(|| self.border_color.clone()),
            border_width: over.border_width.or(self.border_width),
            border_radius: over.border_radius.or(self.border_radius),
            fill: over.fill.clone().or_else(|| self.fill.clone()),
            opacity: over.opacity.or(self.opacity),
        }
    }

    /// Merge an optional base and an optional override.
    pub fn layered(base: Option<&Style>, over: Option<&Style>) -> Style {
        match (base, over) {
            (Some(b), Some(o)) => b.merged(o),
            (Some(b), None) => b.clone(),
            (None, Some(o)) => o.clone(),
            (None, None) => Style::default(),
        }
    }
}

// ============================================================================
// ELEMENTS
// ============================================================================

/// Fields shared by every element kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementBase {
    /// Unique within the owning scope (template or partial).
    pub id: String,
    /// Placement region; `None` means body (or the including element's region
    /// once the element is expanded from a partial).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub w: f64,
    #[serde(default)]
    pub h: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    /// Boolean visibility expression, e.g. `exists(customer.vat) && len(items) > 0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    /// Explicit 1-based page pin; overrides `repeat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl ElementBase {
    fn placed(prefix: &str, w: f64, h: f64) -> Self {
        Self {
            id: prefix.to_string(),
            region: Some(Region::Body),
            x: 20.0,
            y: 20.0,
            w,
            h,
            ..Default::default()
        }
    }

    /// Effective region (body when unset).
    pub fn region(&self) -> Region {
        self.region.unwrap_or_default()
    }

    /// Effective repeat policy for this element's region.
    pub fn repeat(&self) -> Repeat {
        self.repeat.unwrap_or_else(|| Repeat::default_for(self.region()))
    }

    /// Explicit page pin as a 1-based page number, if it is a usable value.
    pub fn explicit_page(&self) -> Option<usize> {
        match self.page {
            Some(p) if p.is_finite() && p >= 1.0 => Some(p.floor() as usize),
            _ => None,
        }
    }

    /// The `visibleIf` expression, ignoring blank strings.
    pub fn condition(&self) -> Option<&str> {
        self.visible_if.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Static text, optionally with data bindings and rich markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default)]
    pub text: String,
    /// Pass the resolved text through as markup instead of escaping it.
    #[serde(default)]
    pub rich_text: bool,
}

impl ElementMeta for TextElement {
    fn label() -> &'static str { "Text" }
    fn editor_default() -> Self {
        Self {
            base: ElementBase::placed("text", 120.0, 24.0),
            text: "New text".into(),
            rich_text: false,
        }
    }
}

/// Long text that wraps into columns and continues across pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTextElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default)]
    pub text: String,
    /// Column count (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    /// Gap between columns in points (default 12).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
}

impl ElementMeta for FlowTextElement {
    fn label() -> &'static str { "Flow Text" }
    fn editor_default() -> Self {
        Self {
            base: ElementBase::placed("flowText", 300.0, 300.0),
            text: "Flowing text...".into(),
            columns: Some(1),
            gap: Some(12.0),
        }
    }
}

/// Image referenced by URL or data URI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default)]
    pub src: String,
    /// CSS object-fit: "contain" (default), "cover", "fill".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
}

impl ElementMeta for ImageElement {
    fn label() -> &'static str { "Image" }
    fn editor_default() -> Self {
        Self {
            base: ElementBase::placed("image", 120.0, 60.0),
            src: "https://via.placeholder.com/120x60".into(),
            fit: Some("contain".into()),
        }
    }
}

/// How a table column renders its cell values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFormat {
    Currency,
    Number,
    #[serde(other)]
    Plain,
}

/// One table column: header label and the row field it displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ColumnFormat>,
    /// Fixed fraction digits for `number` format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
}

impl TableColumn {
    pub fn new(header: impl Into<String>, field: impl Into<String>, w: f64) -> Self {
        Self {
            header: header.into(),
            field: field.into(),
            w: Some(w),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    Auto,
    #[default]
    #[serde(other)]
    Off,
}

/// Table pagination settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePagination {
    #[serde(default)]
    pub mode: PaginationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_height: Option<f64>,
}

/// Whether the last page of a paginated table is padded with empty rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    Pad,
    #[default]
    #[serde(other)]
    None,
}

/// Repeating table bound to an array in the data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableElement {
    #[serde(flatten)]
    pub base: ElementBase,
    /// Binding to the row array, e.g. `"{{items}}"`.
    #[serde(default)]
    pub rows: String,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<TablePagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_style: Option<Style>,
    #[serde(default)]
    pub fill_mode: FillMode,
    /// Table top on continuation pages (defaults to `y`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_y: Option<f64>,
    /// Explicit available height on continuation pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_h: Option<f64>,
}

impl TableElement {
    /// Whether this table splits its rows across pages.
    pub fn is_auto_paginated(&self) -> bool {
        self.pagination
            .as_ref()
            .is_some_and(|p| p.mode == PaginationMode::Auto)
    }

    /// Row height: pagination setting, then row line height, then 14pt.
    pub fn row_height(&self) -> f64 {
        self.pagination
            .as_ref()
            .and_then(|p| p.row_height)
            .filter(|h| *h > 0.0)
            .or_else(|| {
                self.row_style
                    .as_ref()
                    .and_then(|s| s.line_height)
                    .filter(|h| *h > 0.0)
            })
            .unwrap_or(14.0)
    }

    pub fn continuation_y(&self) -> f64 {
        self.continuation_y.unwrap_or(self.base.y)
    }
}

impl ElementMeta for TableElement {
    fn label() -> &'static str { "Table" }
    fn editor_default() -> Self {
        Self {
            base: ElementBase::placed("table", 300.0, 120.0),
            rows: "{{items}}".into(),
            columns: vec![
                TableColumn::new("Item", "name", 160.0),
                TableColumn::new("Qty", "qty", 40.0),
                TableColumn::new("Price", "price", 80.0),
            ],
            ..Default::default()
        }
    }
}

/// QR code encoding a (possibly bound) value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrElement {
    #[serde(flatten)]
    pub base: ElementBase,
    #[serde(default)]
    pub value: String,
    /// Error correction level: "L", "M" (default), "Q", "H".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecc: Option<String>,
}

impl ElementMeta for QrElement {
    fn label() -> &'static str { "QR Code" }
    fn editor_default() -> Self {
        Self {
            base: ElementBase::placed("qr", 80.0, 80.0),
            value: "{{qr.value}}".into(),
            ecc: Some("M".into()),
        }
    }
}

/// Horizontal rule along the element's top edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineElement {
    #[serde(flatten)]
    pub base: ElementBase,
}

impl ElementMeta for LineElement {
    fn label() -> &'static str { "Line" }
    fn editor_default() -> Self {
        Self { base: ElementBase::placed("line", 200.0, 1.0) }
    }
}

/// Filled or bordered rectangle (`"type": "box"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RectElement {
    #[serde(flatten)]
    pub base: ElementBase,
}

impl ElementMeta for RectElement {
    fn label() -> &'static str { "Box" }
    fn editor_default() -> Self {
        Self { base: ElementBase::placed("box", 200.0, 60.0) }
    }
}

/// Placeholder that inlines a named partial's elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeElement {
    #[serde(flatten)]
    pub base: ElementBase,
    /// Partial name.
    #[serde(rename = "ref", default)]
    pub reference: String,
}

impl ElementMeta for IncludeElement {
    fn label() -> &'static str { "Include" }
    fn editor_default() -> Self {
        Self {
            base: ElementBase::placed("include", 200.0, 60.0),
            reference: String::new(),
        }
    }
}

// ============================================================================
// DATA CONTRACT
// ============================================================================

/// Where a contract field takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    #[default]
    External,
    Template,
    Computed,
}

/// Value transform applied after a contract field is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    Trim,
    Uppercase,
    Lowercase,
    Titlecase,
    Number,
    Boolean,
    Date,
    Currency,
    /// Unrecognized transform names behave like `none`.
    #[serde(other)]
    Unknown,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::None | Transform::Unknown => "none",
            Transform::Trim => "trim",
            Transform::Uppercase => "uppercase",
            Transform::Lowercase => "lowercase",
            Transform::Titlecase => "titlecase",
            Transform::Number => "number",
            Transform::Boolean => "boolean",
            Transform::Date => "date",
            Transform::Currency => "currency",
        }
    }
}

/// Date formatting length for the `date` transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    Short,
    Long,
    Full,
    #[default]
    #[serde(other)]
    Medium,
}

/// One declared field of the data contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContractField {
    /// Path in the mapped data; unique within the contract.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub required: bool,
    /// Declared value type (informational, e.g. "string").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub source: FieldSource,
    /// Path in the external payload (defaults to `path`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_date_style: Option<DateStyle>,
}

impl DataContractField {
    /// Field as added by binding discovery: optional external string, no transform.
    pub fn discovered(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            external_path: Some(path.clone()),
            path,
            required: false,
            field_type: Some("string".into()),
            source: FieldSource::External,
            default_value: Some(Value::String(String::new())),
            transform: Transform::None,
            ..Default::default()
        }
    }

    /// External lookup path, falling back to `path`.
    pub fn external_path(&self) -> &str {
        self.external_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.path)
    }
}

/// Declarative mapping from an external payload to the template's data shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataContract {
    #[serde(default)]
    pub fields: Vec<DataContractField>,
}
