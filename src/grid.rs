use std::path::Path;

use calamine::{Data, Reader};
use chrono::NaiveDate;

use crate::error::{MargenError, Result};

/// A primitive spreadsheet value. Parsers work on these instead of calamine
/// types so they can be exercised with inline grids in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

pub type Grid = Vec<Vec<Cell>>;

impl Cell {
    pub fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => {
                if s.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(s.clone())
                }
            }
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Trimmed display text. Whole numbers render without a decimal point so
    /// numeric codes survive the round trip through a Number cell.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

/// Read a whole workbook into per-sheet grids, preserving sheet order.
pub fn load_workbook(path: &Path) -> Result<Vec<(String, Grid)>> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| MargenError::Workbook(format!("failed to open {}: {e}", path.display())))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| MargenError::Workbook(format!("sheet {name}: {e}")))?;
        let grid: Grid = range
            .rows()
            .map(|row| row.iter().map(Cell::from_data).collect())
            .collect();
        sheets.push((name, grid));
    }
    if sheets.is_empty() {
        return Err(MargenError::Workbook(format!(
            "{} contains no sheets",
            path.display()
        )));
    }
    Ok(sheets)
}

// ---------------------------------------------------------------------------
// Value coercion
// ---------------------------------------------------------------------------

/// Parse a currency-formatted string: strips `$`, thousands separators and
/// quotes, honors parenthesized negatives. Unparseable input is 0.0.
pub fn parse_amount(raw: &str) -> f64 {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

/// Numeric value of a cell; text cells go through currency parsing.
pub fn coerce_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => parse_amount(s),
        _ => 0.0,
    }
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
pub fn excel_serial_to_date(serial: f64) -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    base + chrono::Duration::days(serial as i64)
}

pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let d: u32 = parts[0].parse().ok()?;
    let m: u32 = parts[1].parse().ok()?;
    let mut y: i32 = parts[2].parse().ok()?;
    if y < 100 {
        y += 2000;
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Best-effort date from a cell, in priority order: Excel serial number,
/// DD/MM/YYYY, then a few generic string formats. Falls back to `today`,
/// lossy on purpose: a bad date cell must not discard the row.
pub fn coerce_date(cell: &Cell, today: NaiveDate) -> NaiveDate {
    match cell {
        Cell::Number(serial) if *serial > 0.0 => excel_serial_to_date(*serial),
        Cell::Text(s) => {
            if let Some(d) = parse_date_dmy(s) {
                return d;
            }
            for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"] {
                if let Ok(d) = NaiveDate::parse_from_str(s.trim(), fmt) {
                    return d;
                }
            }
            today
        }
        _ => today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("$31.50"), 31.5);
        assert_eq!(parse_amount("  -42.50  "), -42.5);
        assert_eq!(parse_amount("(500.00)"), -500.0);
        assert_eq!(parse_amount("not_a_number"), 0.0);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), d(2025, 1, 10));
        assert_eq!(excel_serial_to_date(25569.0), d(1970, 1, 1));
    }

    #[test]
    fn test_parse_date_dmy() {
        assert_eq!(parse_date_dmy("06/10/2025"), Some(d(2025, 10, 6)));
        assert_eq!(parse_date_dmy("31/01/25"), Some(d(2025, 1, 31)));
        assert_eq!(parse_date_dmy("13/13/2025"), None);
        assert_eq!(parse_date_dmy("2025-10-06"), None);
    }

    #[test]
    fn test_coerce_date_priority() {
        let today = d(2026, 8, 30);
        assert_eq!(coerce_date(&Cell::Number(45667.0), today), d(2025, 1, 10));
        assert_eq!(
            coerce_date(&Cell::Text("06/10/2025".into()), today),
            d(2025, 10, 6)
        );
        assert_eq!(
            coerce_date(&Cell::Text("2025-10-06".into()), today),
            d(2025, 10, 6)
        );
        // Unparseable falls back to today rather than failing the row
        assert_eq!(coerce_date(&Cell::Text("pronto".into()), today), today);
        assert_eq!(coerce_date(&Cell::Empty, today), today);
    }

    #[test]
    fn test_cell_text_renders_whole_numbers_as_codes() {
        assert_eq!(Cell::Number(1046.0).text(), "1046");
        assert_eq!(Cell::Number(2.5).text(), "2.5");
        assert_eq!(Cell::Text("  PR100 ".into()).text(), "PR100");
        assert_eq!(Cell::Empty.text(), "");
    }
}
