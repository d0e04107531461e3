use std::collections::HashMap;

use derive_setters::Setters;
use tracing::trace;

use crate::records::{Record, Value};
use crate::view::VisibleFields;

/// One rendered column: header plus the cell text for the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

/// Per-field cell formatter. Receives the field value and the whole
/// record so derived cells (links, badges) can combine fields.
pub type CellFormat = fn(&Value, &Record) -> String;

/// Renders an action cell for a row.
pub type RowAction = fn(&Record) -> String;

pub const ACTIONS_COLUMN: &str = "Acciones";
pub const NO_DATA_TEXT: &str = "Sin datos para mostrar";

/// Declarative description of a table: which columns to draw, how to
/// label them, and any per-field formatting overrides.
#[derive(Setters, Clone, Default)]
#[setters(prefix = "with_")]
pub struct TableSpec {
    pub labels: HashMap<String, String>,
    pub formats: HashMap<String, CellFormat>,
    #[setters(strip_option)]
    pub row_action: Option<RowAction>,
    pub max_column_width: usize,
}

impl TableSpec {
    pub fn with_format(mut self, field: &str, format: CellFormat) -> Self {
        self.formats.insert(field.to_string(), format);
        self
    }

    fn label(&self, field: &str) -> String {
        self.labels.get(field).cloned().unwrap_or_else(|| field.to_string())
    }

    fn cell(&self, field: &str, record: &Record) -> String {
        match self.formats.get(field) {
            Some(format) => format(record.get(field), record),
            // No registered formatter: default string form.
            None => record.get(field).display(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub columns: Vec<ColumnView>,
    /// Set when the page holds no records; the UI draws this as a
    /// single full-width row instead of per-field cells.
    pub placeholder: Option<String>,
}

impl RenderedPage {
    pub fn is_empty(&self) -> bool {
        self.placeholder.is_some()
    }
}

fn column_width(name: &str, data: &[String], max_width: usize) -> usize {
    let widest = data.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    let width = std::cmp::max(name.chars().count(), widest);
    if max_width > 0 {
        std::cmp::min(width, max_width)
    } else {
        width
    }
}

/// Project one page of records into columns, honoring field order from
/// the visible set, label and formatter overrides, and the optional
/// leading actions column.
pub fn render_page(spec: &TableSpec, visible: &VisibleFields, page: &[&Record]) -> RenderedPage {
    let mut columns = Vec::with_capacity(visible.len() + 1);

    if let Some(action) = spec.row_action {
        let data: Vec<String> = page.iter().map(|r| action(r)).collect();
        let width = column_width(ACTIONS_COLUMN, &data, spec.max_column_width);
        columns.push(ColumnView {
            name: ACTIONS_COLUMN.to_string(),
            width,
            data,
        });
    }

    for field in visible.names() {
        let name = spec.label(field);
        let data: Vec<String> = page.iter().map(|r| spec.cell(field, r)).collect();
        let width = column_width(&name, &data, spec.max_column_width);
        columns.push(ColumnView { name, width, data });
    }

    let placeholder = if page.is_empty() {
        Some(NO_DATA_TEXT.to_string())
    } else {
        None
    };

    trace!(
        "Rendered page: {} columns, {} rows, empty: {}",
        columns.len(),
        page.len(),
        placeholder.is_some()
    );
    RenderedPage { columns, placeholder }
}

/// Formatters shared by the management and report tables.
pub mod formats {
    use super::*;

    /// Colombian peso style: $ 1.234.567
    pub fn currency(value: &Value, _record: &Record) -> String {
        let n = match value {
            Value::Number(n) => *n,
            Value::Text(s) => match s.parse::<f64>() {
                Ok(n) => n,
                Err(_) => return "N/A".to_string(),
            },
            Value::Null => return String::new(),
            _ => return "N/A".to_string(),
        };
        let negative = n < 0.0;
        let whole = n.abs().trunc() as u64;
        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        let sign = if negative { "-" } else { "" };
        format!("$ {sign}{grouped}")
    }

    /// YYYY-MM-DD (optionally with a trailing time part) rendered as
    /// DD/MM/YYYY. Anything unparsable renders as "N/A".
    pub fn date(value: &Value, _record: &Record) -> String {
        let raw = match value {
            Value::Date(s) | Value::Text(s) => s.as_str(),
            Value::Null => return String::new(),
            _ => return "N/A".to_string(),
        };
        let day_part = raw.split(['T', ' ']).next().unwrap_or(raw);
        let parts: Vec<&str> = day_part.split('-').collect();
        if parts.len() != 3 {
            return "N/A".to_string();
        }
        let (y, m, d) = (parts[0], parts[1], parts[2]);
        let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !(numeric(y) && numeric(m) && numeric(d)) || y.len() != 4 {
            return "N/A".to_string();
        }
        let month: u32 = m.parse().unwrap_or(0);
        let day: u32 = d.parse().unwrap_or(0);
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return "N/A".to_string();
        }
        format!("{day:02}/{month:02}/{y}")
    }

    /// Payment status badge.
    pub fn payment_badge(value: &Value, _record: &Record) -> String {
        match value.display().to_lowercase().as_str() {
            "pagado" | "paid" => "[PAGADO]".to_string(),
            "pendiente" | "pending" => "[PENDIENTE]".to_string(),
            "" => String::new(),
            other => format!("[{}]", other.to_uppercase()),
        }
    }
}
