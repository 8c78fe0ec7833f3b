//! Row pagination for auto-growing tables.
//!
//! Space on each page runs from the table's top to the bottom of the body
//! region, or to the nearest body element positioned below the table that
//! also appears on that page. The header row takes one row height.

use serde::Serialize;
use serde_json::Value;

use crate::binding::path::resolve;
use crate::binding::substitute::normalize_binding;
use crate::template::{Element, FillMode, Region, Repeat, TableElement};

/// One row slot in a paginated table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum TableRow {
    Data(Value),
    /// Cosmetic filler row; never carries source data.
    Pad,
}

impl TableRow {
    pub fn data(&self) -> Option<&Value> {
        match self {
            TableRow::Data(v) => Some(v),
            TableRow::Pad => None,
        }
    }
}

/// Ceilings imposed by other body elements below the table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockerSpace {
    pub first_available: Option<f64>,
    pub other_available: Option<f64>,
}

/// Row slices for every page the table spans.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePages {
    pub pages: Vec<Vec<TableRow>>,
    pub row_height: f64,
    pub first_available: f64,
    pub other_available: f64,
    pub first_capacity: usize,
    pub other_capacity: usize,
}

impl TablePages {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Rows for document page `index`, or `None` past the table's end.
    pub fn rows_on(&self, index: usize) -> Option<&[TableRow]> {
        self.pages.get(index).map(Vec::as_slice)
    }

    /// Height the table occupies on document page `index`.
    pub fn available_on(&self, index: usize) -> f64 {
        if index == 0 {
            self.first_available
        } else {
            self.other_available
        }
    }

    /// Data rows per page, pad rows excluded.
    pub fn data_counts(&self) -> Vec<usize> {
        self.pages
            .iter()
            .map(|rows| rows.iter().filter(|r| r.data().is_some()).count())
            .collect()
    }
}

/// Rows that fit below a header row in `available` points, at least one.
pub fn capacity(available: f64, row_height: f64) -> usize {
    if row_height <= 0.0 {
        return 1;
    }
    let rows = ((available - row_height) / row_height).floor();
    if rows.is_finite() && rows >= 1.0 {
        rows as usize
    } else {
        1
    }
}

/// The first auto-paginated table in the body region.
pub fn find_paginated(elements: &[Element]) -> Option<&TableElement> {
    elements.iter().find_map(|el| match el {
        Element::Table(t) if t.base.region() == Region::Body && t.is_auto_paginated() => Some(t),
        _ => None,
    })
}

/// Nearest blocking element below the table on the first and later pages.
pub fn blocker_space(table: &TableElement, elements: &[Element]) -> BlockerSpace {
    let first_y = table.base.y;
    let other_y = table.continuation_y();
    let mut first_ceiling: Option<f64> = None;
    let mut other_ceiling: Option<f64> = None;

    for el in elements {
        let base = el.base();
        if base.region() != Region::Body || base.id == table.base.id {
            continue;
        }
        let (on_first, on_later) = match base.explicit_page() {
            Some(p) => (p == 1, p > 1),
            None => {
                let repeat = base.repeat.unwrap_or(Repeat::First);
                (
                    matches!(repeat, Repeat::First | Repeat::All | Repeat::Unknown),
                    matches!(repeat, Repeat::All | Repeat::AfterFirst),
                )
            }
        };
        if on_first && base.y > first_y {
            first_ceiling = Some(first_ceiling.map_or(base.y, |c: f64| c.min(base.y)));
        }
        if on_later && base.y > other_y {
            other_ceiling = Some(other_ceiling.map_or(base.y, |c: f64| c.min(base.y)));
        }
    }

    BlockerSpace {
        first_available: first_ceiling.map(|y| (y - first_y).max(0.0)),
        other_available: other_ceiling.map(|y| (y - other_y).max(0.0)),
    }
}

/// Slice the table's bound rows into pages.
pub fn paginate_table(
    table: &TableElement,
    data: &Value,
    body_height: f64,
    space: BlockerSpace,
) -> TablePages {
    let row_height = table.row_height();
    let rows: Vec<Value> = match resolve(data, normalize_binding(&table.rows)) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let first_y = table.base.y;
    let other_y = table.continuation_y();
    let base_first = if table.base.h > 0.0 {
        table.base.h
    } else {
        (body_height - first_y).max(0.0)
    };
    let base_other = match table.continuation_h {
        Some(h) if h > 0.0 => h,
        _ => (body_height - other_y).max(0.0),
    };
    let first_available = base_first.min(space.first_available.unwrap_or(base_first)).max(0.0);
    let other_available = base_other.min(space.other_available.unwrap_or(base_other)).max(0.0);
    let first_capacity = capacity(first_available, row_height);
    let other_capacity = capacity(other_available, row_height);

    let mut pages: Vec<Vec<TableRow>> = Vec::new();
    let mut remaining = rows.into_iter().peekable();
    while remaining.peek().is_some() {
        let per_page = if pages.is_empty() { first_capacity } else { other_capacity };
        pages.push(remaining.by_ref().take(per_page).map(TableRow::Data).collect());
    }
    if pages.is_empty() {
        pages.push(Vec::new());
    }

    if table.fill_mode == FillMode::Pad {
        let last_index = pages.len() - 1;
        let target = if last_index == 0 { first_capacity } else { other_capacity };
        if let Some(last) = pages.last_mut() {
            if last.len() < target {
                last.resize(target, TableRow::Pad);
            }
        }
    }

    tracing::debug!(
        table = %table.base.id,
        pages = pages.len(),
        first_capacity,
        other_capacity,
        "table paginated"
    );

    TablePages {
        pages,
        row_height,
        first_available,
        other_available,
        first_capacity,
        other_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{PaginationMode, TablePagination, Template};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn auto_table() -> TableElement {
        TableElement {
            rows: "{{items}}".into(),
            pagination: Some(TablePagination {
                mode: PaginationMode::Auto,
                row_height: Some(14.0),
            }),
            ..Default::default()
        }
    }

    fn items(n: usize) -> Value {
        json!({"items": (0..n).map(|i| json!({"n": i})).collect::<Vec<_>>()})
    }

    #[test]
    fn test_capacity() {
        assert_eq!(capacity(140.0, 14.0), 9);
        assert_eq!(capacity(154.0, 14.0), 10);
        assert_eq!(capacity(28.0, 14.0), 1);
        assert_eq!(capacity(14.0, 14.0), 1);
        assert_eq!(capacity(0.0, 14.0), 1);
    }

    #[test]
    fn test_first_and_continuation_capacity() {
        let mut table = auto_table();
        table.base.h = 140.0;
        table.continuation_h = Some(154.0);
        let pages = paginate_table(&table, &items(25), 700.0, BlockerSpace::default());
        assert_eq!(pages.data_counts(), vec![9, 10, 6]);
        assert_eq!(pages.page_count(), 3);
    }

    #[test]
    fn test_available_from_body_height() {
        let mut table = auto_table();
        table.base.y = 560.0;
        table.continuation_y = Some(546.0);
        let pages = paginate_table(&table, &items(25), 700.0, BlockerSpace::default());
        assert_eq!(pages.first_available, 140.0);
        assert_eq!(pages.other_available, 154.0);
        assert_eq!(pages.data_counts(), vec![9, 10, 6]);
    }

    #[test]
    fn test_rows_conserved_in_order() {
        let mut table = auto_table();
        table.base.h = 100.0;
        table.fill_mode = FillMode::Pad;
        let data = items(47);
        let pages = paginate_table(&table, &data, 700.0, BlockerSpace::default());
        let flat: Vec<Value> = pages
            .pages
            .iter()
            .flatten()
            .filter_map(|r| r.data().cloned())
            .collect();
        assert_eq!(Value::Array(flat), data["items"]);
    }

    #[test]
    fn test_pad_fills_last_page_only() {
        let mut table = auto_table();
        table.base.h = 70.0;
        table.fill_mode = FillMode::Pad;
        let pages = paginate_table(&table, &items(6), 70.0, BlockerSpace::default());
        // capacity 4 per page
        assert_eq!(pages.data_counts(), vec![4, 2]);
        assert_eq!(pages.pages[0].len(), 4);
        assert_eq!(pages.pages[1].len(), 4);
        assert_eq!(pages.pages[1][2], TableRow::Pad);
    }

    #[test]
    fn test_empty_rows_single_page() {
        let table = auto_table();
        let pages = paginate_table(&table, &json!({"items": "nope"}), 700.0, BlockerSpace::default());
        assert_eq!(pages.pages, vec![Vec::<TableRow>::new()]);
    }

    #[test]
    fn test_tight_space_still_one_row() {
        let mut table = auto_table();
        table.base.h = 28.0;
        let pages = paginate_table(&table, &items(3), 700.0, BlockerSpace::default());
        assert_eq!(pages.data_counts(), vec![1, 1, 1]);
    }

    #[test]
    fn test_blockers_clamp_available_height() {
        let t = Template::from_value(json!({
            "page": {"width": 595, "height": 842},
            "elements": [
                {"type": "table", "id": "items", "y": 100, "rows": "{{items}}",
                 "pagination": {"mode": "auto"}, "continuationY": 20},
                {"type": "text", "id": "totals", "y": 300, "text": "Total"},
                {"type": "text", "id": "above", "y": 50, "text": "above"},
                {"type": "text", "id": "carry", "y": 500, "repeat": "afterFirst", "text": "..."},
                {"type": "text", "id": "pinned", "y": 400, "page": 3, "text": "p3"},
                {"type": "text", "id": "hdr", "region": "header", "y": 150, "text": "h"}
            ]
        }))
        .unwrap();
        let table = find_paginated(&t.elements).unwrap();
        assert_eq!(table.base.id, "items");
        let space = blocker_space(table, &t.elements);
        assert_eq!(space.first_available, Some(200.0));
        assert_eq!(space.other_available, Some(380.0));
    }

    #[test]
    fn test_non_auto_tables_ignored() {
        let t = Template::from_value(json!({
            "page": {"width": 595, "height": 842},
            "elements": [
                {"type": "table", "id": "static", "rows": "{{items}}"},
                {"type": "table", "id": "foot", "region": "footer", "pagination": {"mode": "auto"}}
            ]
        }))
        .unwrap();
        assert!(find_paginated(&t.elements).is_none());
    }
}
