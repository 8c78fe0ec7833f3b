//! # Page Layout
//!
//! Turns expanded elements, mapped data and a [`PagePlan`] into positioned,
//! styled boxes per page and region. Box coordinates are relative to the
//! top-left corner of their region.

pub mod cells;

use serde::Serialize;
use serde_json::Value;

use crate::binding::path::resolve;
use crate::binding::substitute::{normalize_binding, substitute, RenderContext};
use crate::paginate::{capacity, PagePlan, TableRow};
use crate::template::{
    Element, ElementBase, FillMode, Region, Style, TableColumn, TableElement, Template,
};
use crate::visibility::{is_visible, EvalMode};

/// Assembled table contents for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableContent {
    pub columns: Vec<TableColumn>,
    pub header: Vec<String>,
    /// Formatted cells; pad rows are all-empty.
    pub rows: Vec<Vec<String>>,
    pub row_height: f64,
    /// Number of trailing pad rows in `rows`.
    pub padded: usize,
    pub header_style: Style,
    pub row_style: Style,
}

/// What a box draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BoxContent {
    Text { text: String, rich: bool },
    Image { src: String, fit: String },
    Table(TableContent),
    Qr { value: String, ecc: String },
    Line { color: String, width: f64 },
    Box,
}

/// A positioned, styled element instance on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutBox {
    pub id: String,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<i32>,
    pub style: Style,
    pub content: BoxContent,
}

/// All boxes of one document page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageLayout {
    /// 1-based page number.
    pub number: usize,
    pub header: Vec<LayoutBox>,
    pub body: Vec<LayoutBox>,
    pub footer: Vec<LayoutBox>,
}

impl PageLayout {
    pub fn region(&self, region: Region) -> &[LayoutBox] {
        match region {
            Region::Header => &self.header,
            Region::Body => &self.body,
            Region::Footer => &self.footer,
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut Vec<LayoutBox> {
        match region {
            Region::Header => &mut self.header,
            Region::Body => &mut self.body,
            Region::Footer => &mut self.footer,
        }
    }

    /// Every box on the page, header first.
    pub fn boxes(&self) -> impl Iterator<Item = &LayoutBox> {
        self.header.iter().chain(&self.body).chain(&self.footer)
    }

    pub fn find(&self, id: &str) -> Option<&LayoutBox> {
        self.boxes().find(|b| b.id == id)
    }
}

/// Whether a non-paginated element appears on page `index` of `count`.
///
/// An explicit page pin wins over the repeat policy.
pub fn should_render_on(base: &ElementBase, index: usize, count: usize) -> bool {
    match base.explicit_page() {
        Some(page) => index + 1 == page,
        None => base.repeat().includes(index, count),
    }
}

/// Shared inputs for assembling a page.
struct Assembler<'a> {
    template: &'a Template,
    data: &'a Value,
    plan: &'a PagePlan,
    mode: EvalMode,
    currency: &'a str,
}

/// Lay out pages `range` (0-based) of the document.
pub fn assemble(
    template: &Template,
    elements: &[Element],
    data: &Value,
    plan: &PagePlan,
    mode: EvalMode,
    range: std::ops::Range<usize>,
) -> Vec<PageLayout> {
    let assembler = Assembler {
        template,
        data,
        plan,
        mode,
        currency: template.default_currency().unwrap_or("USD"),
    };
    range
        .filter(|p| *p < plan.page_count)
        .map(|p| assembler.page(elements, p))
        .collect()
}

impl Assembler<'_> {
    fn page(&self, elements: &[Element], index: usize) -> PageLayout {
        let count = self.plan.page_count;
        let ctx = RenderContext::new(index + 1, count);
        let mut page = PageLayout {
            number: index + 1,
            ..Default::default()
        };

        for element in elements {
            let base = element.base();
            if !is_visible(base.condition(), self.data, self.mode) {
                continue;
            }
            let region = base.region();
            let boxes = match element {
                Element::Table(t) if self.plan.table_for(&t.base.id).is_some() => {
                    self.paginated_table(t, index).into_iter().collect()
                }
                Element::FlowText(f) if self.plan.flow_for(&f.base.id).is_some() => {
                    self.flow_columns(element, index)
                }
                Element::Include(_) => Vec::new(),
                _ if !should_render_on(base, index, count) => Vec::new(),
                _ => self.element_box(element, &ctx).into_iter().collect(),
            };
            page.region_mut(region).extend(boxes);
        }
        page
    }

    fn text_style(&self, own: Option<&Style>) -> Style {
        Style::layered(self.template.default_text_style(), own)
    }

    fn positioned(&self, base: &ElementBase, kind: &str, style: Style, content: BoxContent) -> LayoutBox {
        LayoutBox {
            id: base.id.clone(),
            kind: kind.to_string(),
            x: base.x,
            y: base.y,
            w: base.w,
            h: base.h,
            z: base.z_index,
            style,
            content,
        }
    }

    fn element_box(&self, element: &Element, ctx: &RenderContext) -> Option<LayoutBox> {
        let base = element.base();
        let own = base.style.clone().unwrap_or_default();
        let b = match element {
            Element::Text(e) => self.positioned(
                base,
                "text",
                self.text_style(base.style.as_ref()),
                BoxContent::Text {
                    text: substitute(&e.text, self.data, ctx),
                    rich: e.rich_text,
                },
            ),
            Element::FlowText(e) => self.positioned(
                base,
                "flowText",
                self.text_style(base.style.as_ref()),
                BoxContent::Text {
                    text: substitute(&e.text, self.data, ctx),
                    rich: false,
                },
            ),
            Element::Image(e) => self.positioned(
                base,
                "image",
                own,
                BoxContent::Image {
                    src: substitute(&e.src, self.data, ctx),
                    fit: e.fit.clone().unwrap_or_else(|| "contain".into()),
                },
            ),
            Element::Table(t) => {
                let rows = bound_rows(t, self.data);
                let mut slots: Vec<TableRow> = rows.into_iter().map(TableRow::Data).collect();
                let row_height = t.row_height();
                if t.fill_mode == FillMode::Pad && t.base.h > row_height {
                    let target = capacity(t.base.h, row_height);
                    if slots.len() < target {
                        slots.resize(target, TableRow::Pad);
                    }
                }
                self.positioned(base, "table", own, BoxContent::Table(self.table_content(t, &slots)))
            }
            Element::Qr(e) => self.positioned(
                base,
                "qr",
                own,
                BoxContent::Qr {
                    value: substitute(&e.value, self.data, ctx),
                    ecc: e.ecc.clone().unwrap_or_else(|| "M".into()),
                },
            ),
            Element::Line(_) => {
                let color = own.border_color.clone().unwrap_or_else(|| "#333".into());
                let width = own.border_width.unwrap_or(1.0);
                self.positioned(base, "line", own, BoxContent::Line { color, width })
            }
            Element::Rect(_) => self.positioned(base, "box", own, BoxContent::Box),
            Element::Include(_) => return None,
        };
        Some(b)
    }

    fn table_content(&self, t: &TableElement, slots: &[TableRow]) -> TableContent {
        let rows = slots
            .iter()
            .map(|slot| match slot {
                TableRow::Data(row) => cells::row_cells(row, &t.columns, self.currency),
                TableRow::Pad => vec![String::new(); t.columns.len()],
            })
            .collect();
        TableContent {
            columns: t.columns.clone(),
            header: t.columns.iter().map(|c| c.header.clone()).collect(),
            rows,
            row_height: t.row_height(),
            padded: slots.iter().filter(|s| matches!(s, TableRow::Pad)).count(),
            header_style: self.text_style(t.header_style.as_ref()),
            row_style: self.text_style(t.row_style.as_ref()),
        }
    }

    fn paginated_table(&self, t: &TableElement, index: usize) -> Option<LayoutBox> {
        let pages = self.plan.table_for(&t.base.id)?;
        let slots = pages.rows_on(index)?;
        let (y, h) = if index == 0 {
            let h = if t.base.h > 0.0 { t.base.h } else { pages.first_available };
            (t.base.y, h)
        } else {
            let h = match t.continuation_h {
                Some(h) if h > 0.0 => h,
                _ => pages.other_available,
            };
            (t.continuation_y(), h)
        };
        let mut b = self.positioned(
            &t.base,
            "table",
            t.base.style.clone().unwrap_or_default(),
            BoxContent::Table(self.table_content(t, slots)),
        );
        b.y = y;
        b.h = h;
        Some(b)
    }

    fn flow_columns(&self, element: &Element, index: usize) -> Vec<LayoutBox> {
        let base = element.base();
        let Some(flow) = self.plan.flow_for(&base.id) else {
            return Vec::new();
        };
        let Some(columns) = flow.columns_on(index, self.plan.page_count) else {
            return Vec::new();
        };
        let style = self.text_style(base.style.as_ref());
        columns
            .iter()
            .enumerate()
            .map(|(idx, text)| LayoutBox {
                id: format!("{}__c{}", base.id, idx),
                kind: "flowText".into(),
                x: base.x + flow.column_offset(idx),
                y: base.y,
                w: flow.column_width,
                h: flow.flow_height,
                z: base.z_index,
                style: style.clone(),
                content: BoxContent::Text {
                    text: text.clone(),
                    rich: false,
                },
            })
            .collect()
    }
}

/// Rows bound by a table's `rows` reference; non-arrays yield none.
fn bound_rows(t: &TableElement, data: &Value) -> Vec<Value> {
    match resolve(data, normalize_binding(&t.rows)) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}
