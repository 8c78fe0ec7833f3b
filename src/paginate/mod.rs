//! # Pagination
//!
//! Decides how many document pages a render needs and what slice of the
//! paginated table and flow text each page shows. Pure functions of the
//! expanded elements and the mapped data.

pub mod flow;
pub mod table;

pub use flow::{paginate_flow, wrap_text, FlowPages};
pub use table::{blocker_space, capacity, paginate_table, BlockerSpace, TablePages, TableRow};

use serde_json::Value;

use crate::binding::substitute::{substitute, RenderContext};
use crate::template::{Element, FlowTextElement, Region, Template};

/// Pagination outcome for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// Id of the auto-paginated table, with its slices.
    pub table: Option<(String, TablePages)>,
    /// Id of the paginated flow element, with its pages.
    pub flow: Option<(String, FlowPages)>,
    pub page_count: usize,
}

impl PagePlan {
    pub fn table_for(&self, id: &str) -> Option<&TablePages> {
        self.table.as_ref().filter(|(tid, _)| tid == id).map(|(_, p)| p)
    }

    pub fn flow_for(&self, id: &str) -> Option<&FlowPages> {
        self.flow.as_ref().filter(|(fid, _)| fid == id).map(|(_, p)| p)
    }
}

/// The first flow-text element in the body region.
pub fn find_flow(elements: &[Element]) -> Option<&FlowTextElement> {
    elements.iter().find_map(|el| match el {
        Element::FlowText(f) if f.base.region() == Region::Body => Some(f),
        _ => None,
    })
}

/// Highest explicit 1-based page pin among the elements.
pub fn highest_explicit_page(elements: &[Element]) -> usize {
    elements
        .iter()
        .filter_map(|el| el.base().explicit_page())
        .max()
        .unwrap_or(1)
}

/// Paginate the table and flow text and settle the document page count.
///
/// `elements` must already have includes expanded; `data` is the mapped data.
pub fn plan_pages(template: &Template, elements: &[Element], data: &Value) -> PagePlan {
    let body_width = template.page.body_width();
    let body_height = template.page.body_height();

    let table = table::find_paginated(elements).map(|t| {
        let space = blocker_space(t, elements);
        (t.base.id.clone(), paginate_table(t, data, body_height, space))
    });

    let flow = find_flow(elements).map(|f| {
        let text = substitute(&f.text, data, &RenderContext::default());
        let pages = paginate_flow(f, &text, template.default_text_style(), body_width, body_height);
        (f.base.id.clone(), pages)
    });

    let table_pages = table.as_ref().map_or(1, |(_, t)| t.page_count());
    let flow_pages = flow.as_ref().map_or(1, |(_, f)| f.document_pages());
    let page_count = [
        1,
        table_pages,
        flow_pages,
        template.manual_page_count(),
        highest_explicit_page(elements),
    ]
    .into_iter()
    .max()
    .unwrap_or(1);

    tracing::debug!(table_pages, flow_pages, page_count, "page count settled");

    PagePlan {
        table,
        flow,
        page_count,
    }
}
