use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{MargenError, Result};
use crate::grid::Grid;
use crate::normalize::normalize;

/// Payroll exports are visually formatted reports, not tables: header
/// position, the period banner and the shift sub-header all move between
/// export runs, so everything positional is detected here and nowhere else.
const HEADER_SCAN_ROWS: usize = 20;
const PERIOD_SCAN_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoursLayout {
    pub header_row: usize,
    pub data_start_row: usize,
    pub period_start: NaiveDate,
}

fn row_key(grid: &Grid, row: usize) -> String {
    let joined: String = grid[row]
        .iter()
        .map(|c| c.text())
        .collect::<Vec<_>>()
        .join(" ");
    normalize(&joined)
}

/// Locate the header row, period-start anchor and data start of a weekly
/// hours sheet. `fallback_start` is used when no in-file period banner is
/// found; with neither available this is a validation error.
pub fn detect_hours_layout(grid: &Grid, fallback_start: Option<NaiveDate>) -> Result<HoursLayout> {
    let header_row = (0..grid.len().min(HEADER_SCAN_ROWS))
        .find(|&r| {
            let key = row_key(grid, r);
            key.contains("CLAVE")
                && (key.contains("EMPLEAD") || key.contains("NOMBRE") || key.contains("NO."))
        })
        .ok_or_else(|| {
            MargenError::Layout(format!(
                "header not found: no row containing \"Clave\" plus an employee column \
                 (\"Empleado\"/\"Nombre\"/\"No.\") in the first {HEADER_SCAN_ROWS} rows"
            ))
        })?;

    let period_start = find_period_anchor(grid, header_row);
    let period_start = match period_start.or(fallback_start) {
        Some(d) => d,
        None => {
            return Err(MargenError::Validation(
                "no \"PERIODO DEL ...\" banner found above the header; \
                 supply the week start explicitly with --week-start YYYY-MM-DD"
                    .to_string(),
            ))
        }
    };

    let mut data_start_row = header_row + 1;
    if data_start_row < grid.len() && is_time_range_subheader(grid, data_start_row) {
        data_start_row += 1;
    }

    Ok(HoursLayout {
        header_row,
        data_start_row,
        period_start,
    })
}

/// "PERIODO DEL 06-10 DE OCTUBRE 2025" → 2025-10-06, scanned in the rows
/// just above the header. Month names are Spanish, abbreviations accepted.
fn find_period_anchor(grid: &Grid, header_row: usize) -> Option<NaiveDate> {
    let re = Regex::new(
        r"PERIODO DEL\s+(\d{1,2})\s*-\s*(\d{1,2})\s+DE\s+([A-Z]+)\.?\s+(?:DE\s+)?(\d{4})",
    )
    .unwrap();

    let from = header_row.saturating_sub(PERIOD_SCAN_ROWS);
    for r in (from..header_row).rev() {
        let key = row_key(grid, r);
        if let Some(caps) = re.captures(&key) {
            let day: u32 = caps[1].parse().ok()?;
            let month = spanish_month(&caps[3])?;
            let year: i32 = caps[4].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
    }
    None
}

fn spanish_month(name: &str) -> Option<u32> {
    // Input is already normalized (uppercase, accents stripped).
    let month = match name {
        n if n.starts_with("ENE") => 1,
        n if n.starts_with("FEB") => 2,
        n if n.starts_with("MAR") => 3,
        n if n.starts_with("ABR") => 4,
        n if n.starts_with("MAY") => 5,
        n if n.starts_with("JUN") => 6,
        n if n.starts_with("JUL") => 7,
        n if n.starts_with("AGO") => 8,
        n if n.starts_with("SEP") => 9,
        n if n.starts_with("OCT") => 10,
        n if n.starts_with("NOV") => 11,
        n if n.starts_with("DIC") => 12,
        _ => return None,
    };
    Some(month)
}

/// A sub-header row carries shift time ranges like "08:00 - 13:00". More
/// than two such cells means the data rows start one row lower.
fn is_time_range_subheader(grid: &Grid, row: usize) -> bool {
    let re = Regex::new(r"^\d{1,2}:\d{2}\s*-\s*\d{1,2}:\d{2}$").unwrap();
    let hits = grid[row]
        .iter()
        .filter(|c| re.is_match(c.text().as_str()))
        .count();
    hits > 2
}

// ---------------------------------------------------------------------------
// Column-header detection (SAE materials sheets)
// ---------------------------------------------------------------------------

/// Find the header row of a materials sheet and build a normalized
/// column-name → index map. Returns None for sheets without a recognizable
/// header (multi-sheet files legitimately contain non-data sheets).
pub fn detect_column_header(grid: &Grid) -> Option<(usize, HashMap<String, usize>)> {
    for r in 0..grid.len().min(HEADER_SCAN_ROWS) {
        let mut map = HashMap::new();
        for (i, cell) in grid[r].iter().enumerate() {
            let key = normalize(&cell.text());
            if !key.is_empty() {
                map.entry(key).or_insert(i);
            }
        }
        let has_part = map.contains_key("CLAVE DE ARTICULO");
        let has_desc_qty = map.contains_key("DESCRIPCION") && map.contains_key("CANTIDAD");
        if has_part || has_desc_qty {
            return Some((r, map));
        }
    }
    None
}
