//! Table cell formatting.

use serde_json::Value;

use crate::binding::path::{resolve, value_to_string};
use crate::contract::locale::Locale;
use crate::contract::transform::to_number;
use crate::template::{ColumnFormat, TableColumn};

/// Display text for one cell. Null and missing values are blank; values that
/// are not numeric fall back to their plain text under numeric formats.
pub fn format_cell(value: Option<&Value>, column: &TableColumn, currency: &str) -> String {
    let value = match value {
        None | Some(Value::Null) => return String::new(),
        Some(v) => v,
    };
    let numeric = || to_number(value).filter(|_| !matches!(value, Value::String(s) if s.trim().is_empty()));
    match column.format {
        Some(ColumnFormat::Currency) => match numeric() {
            Some(n) => Locale::EnUs.format_currency(n, currency),
            None => value_to_string(value),
        },
        Some(ColumnFormat::Number) => match numeric() {
            Some(n) => Locale::EnUs.format_number(n, column.precision),
            None => value_to_string(value),
        },
        Some(ColumnFormat::Plain) | None => value_to_string(value),
    }
}

/// Cells of a data row in column order.
pub fn row_cells(row: &Value, columns: &[TableColumn], currency: &str) -> Vec<String> {
    columns
        .iter()
        .map(|col| format_cell(resolve(row, &col.field), col, currency))
        .collect()
}
