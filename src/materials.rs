use std::collections::HashMap;

use chrono::NaiveDate;

use crate::catalog::Catalog;
use crate::error::{MargenError, Result};
use crate::grid::{coerce_date, coerce_number, Cell, Grid};
use crate::layout::detect_column_header;
use crate::models::{
    MaterialCandidate, Mismatch, MismatchKind, ParseResult, ProjectStatus, RecoveredContext,
};

// Header name variants seen across SAE exports. Lookup is against the
// normalized header map, exact match first, then substring.
const PART_COLS: &[&str] = &["CLAVE DE ARTICULO", "CLAVE ARTICULO", "CLAVE"];
const DESC_COLS: &[&str] = &["DESCRIPCION"];
const QTY_COLS: &[&str] = &["CANTIDAD"];
const COST_COLS: &[&str] = &["COSTO UNITARIO", "COSTO"];
const AMOUNT_COLS: &[&str] = &["IMPORTE", "MONTO", "TOTAL"];
const DATE_COLS: &[&str] = &["FECHA DE MOVIMIENTO", "FECHA"];
const PROJECT_COLS: &[&str] = &["PROYECTO", "OBRA", "CVE. PROYECTO", "CVE PROYECTO"];

fn find_col(map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    for name in names {
        if let Some(&i) = map.get(*name) {
            return Some(i);
        }
    }
    // Substring fallback; lowest column index wins so the choice is stable
    // when several headers contain the same token.
    for name in names {
        if let Some(i) = map
            .iter()
            .filter(|(k, _)| k.contains(*name))
            .map(|(_, &i)| i)
            .min()
        {
            return Some(i);
        }
    }
    None
}

fn cell_at<'a>(row: &'a [Cell], col: Option<usize>) -> &'a Cell {
    col.and_then(|c| row.get(c)).unwrap_or(&Cell::Empty)
}

/// Walk every sheet of an SAE materials workbook. Sheets without a
/// recognizable header are skipped; the parse fails only when the whole
/// workbook produced neither candidates nor mismatches.
pub fn parse_materials(
    sheets: &[(String, Grid)],
    catalog: &Catalog,
    today: NaiveDate,
) -> Result<ParseResult> {
    let mut result = ParseResult::default();

    for (sheet_name, grid) in sheets {
        let Some((header_row, columns)) = detect_column_header(grid) else {
            continue;
        };

        let part_col = find_col(&columns, PART_COLS);
        let desc_col = find_col(&columns, DESC_COLS);
        let qty_col = find_col(&columns, QTY_COLS);
        let cost_col = find_col(&columns, COST_COLS);
        let amount_col = find_col(&columns, AMOUNT_COLS);
        let date_col = find_col(&columns, DATE_COLS);
        let project_col = find_col(&columns, PROJECT_COLS);

        for r in header_row + 1..grid.len() {
            let row = &grid[r];

            let part_number = cell_at(row, part_col).text();
            let description = cell_at(row, desc_col).text();
            if part_number.is_empty() && description.is_empty() {
                continue;
            }

            let quantity = coerce_number(cell_at(row, qty_col));
            let unit_cost = coerce_number(cell_at(row, cost_col));
            let mut amount = coerce_number(cell_at(row, amount_col));
            if amount == 0.0 && quantity != 0.0 && unit_cost != 0.0 {
                amount = quantity * unit_cost;
            }
            // Noise row: contributes nothing
            if amount == 0.0 && quantity == 0.0 {
                continue;
            }

            let date = coerce_date(cell_at(row, date_col), today);

            let token = cell_at(row, project_col).text();
            if token.is_empty() {
                // No project reference attempted; nothing to mismatch on
                continue;
            }

            match catalog.resolve_material_token(&token) {
                None => result.mismatches.push(Mismatch {
                    row: r,
                    kind: MismatchKind::UnresolvedProject,
                    raw_value: token,
                    sheet: Some(sheet_name.clone()),
                    context: RecoveredContext::MaterialRow {
                        part_number,
                        description,
                        quantity,
                        unit_cost,
                        amount,
                        date,
                    },
                }),
                Some(project) if project.status == ProjectStatus::Finished => {
                    result.mismatches.push(Mismatch {
                        row: r,
                        kind: MismatchKind::ProjectFinished,
                        raw_value: token,
                        sheet: Some(sheet_name.clone()),
                        context: RecoveredContext::None,
                    })
                }
                Some(project) => result.push_material(MaterialCandidate {
                    project_id: project.id,
                    part_number,
                    description,
                    quantity,
                    unit_cost,
                    amount,
                    date,
                    source_sheet: sheet_name.clone(),
                }),
            }
        }
    }

    if result.candidates.is_empty() && result.mismatches.is_empty() {
        return Err(MargenError::Layout(
            "no recognizable columns: expected a sheet with \"Clave de artículo\" \
             or \"Descripción\" and \"Cantidad\" headers"
                .to_string(),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Employee, Project};

    fn catalog() -> Catalog {
        let projects = vec![
            Project {
                id: 1,
                sae_code: "25-046-00".into(),
                internal_code: "PR100".into(),
                name: "Nave industrial".into(),
                status: ProjectStatus::Open,
            },
            Project {
                id: 2,
                sae_code: "24-012-00".into(),
                internal_code: "PR200".into(),
                name: "Bodega".into(),
                status: ProjectStatus::Finished,
            },
        ];
        let employees: Vec<Employee> = Vec::new();
        Catalog::new(projects, employees)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn header() -> Vec<Cell> {
        vec![
            t("CLAVE DE ARTÍCULO"),
            t("DESCRIPCIÓN"),
            t("CANTIDAD"),
            t("COSTO"),
            t("IMPORTE"),
            t("FECHA"),
            t("PROYECTO"),
        ]
    }

    fn material_candidates(result: &ParseResult) -> Vec<&MaterialCandidate> {
        result
            .candidates
            .iter()
            .map(|c| match c {
                Candidate::Material(m) => m,
                Candidate::Hours(_) => panic!("unexpected hours candidate"),
            })
            .collect()
    }

    #[test]
    fn test_parses_rows_by_column_name() {
        let grid = vec![
            vec![t("Reporte de consumos")],
            header(),
            vec![t("TOR-10"), t("Tornillo 3/8"), n(20.0), n(1.5), n(30.0), n(45937.0), t("PR100")],
        ];
        let sheets = vec![("Consumos".to_string(), grid)];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        let mats = material_candidates(&result);
        assert_eq!(mats.len(), 1);
        assert_eq!(mats[0].project_id, 1);
        assert_eq!(mats[0].part_number, "TOR-10");
        assert_eq!(mats[0].amount, 30.0);
        assert_eq!(mats[0].source_sheet, "Consumos");
        assert_eq!(mats[0].date, NaiveDate::from_ymd_opt(2025, 10, 7).unwrap());
    }

    #[test]
    fn test_amount_computed_from_quantity_and_cost() {
        // IMPORTE blank, CANTIDAD=3, COSTO=10.5 falls back to 31.5
        let grid = vec![
            header(),
            vec![t("SOL-1"), t("Soldadura"), n(3.0), n(10.5), Cell::Empty, t("06/10/2025"), t("PR100")],
        ];
        let sheets = vec![("Compras_Dir".to_string(), grid)];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        assert_eq!(material_candidates(&result)[0].amount, 31.5);
    }

    #[test]
    fn test_currency_strings_and_zero_rows() {
        let grid = vec![
            header(),
            // currency-formatted amount
            vec![t("A"), t("Lámina"), n(2.0), t("$1,000.00"), t("$2,000.00"), t("06/10/2025"), t("PR100")],
            // zero amount and zero quantity: noise, dropped silently
            vec![t("B"), t("Flete"), n(0.0), n(0.0), n(0.0), t("06/10/2025"), t("PR100")],
        ];
        let sheets = vec![("Compras_Dir".to_string(), grid)];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        let mats = material_candidates(&result);
        assert_eq!(mats.len(), 1);
        assert_eq!(mats[0].amount, 2000.0);
        assert!(result.mismatches.is_empty());
    }

    #[test]
    fn test_unparseable_date_falls_back_to_today() {
        let grid = vec![
            header(),
            vec![t("A"), t("Lámina"), n(1.0), n(5.0), n(5.0), t("???"), t("PR100")],
        ];
        let sheets = vec![("Consumos".to_string(), grid)];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        assert_eq!(material_candidates(&result)[0].date, today());
    }

    #[test]
    fn test_unresolved_token_and_empty_token() {
        let grid = vec![
            header(),
            vec![t("A"), t("Lámina"), n(1.0), n(5.0), n(5.0), t("06/10/2025"), t("OBRA-X")],
            vec![t("B"), t("Perfil"), n(1.0), n(5.0), n(5.0), t("06/10/2025"), Cell::Empty],
        ];
        let sheets = vec![("Consumos".to_string(), grid)];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        assert!(result.candidates.is_empty());
        // empty token row dropped without a mismatch
        assert_eq!(result.mismatches.len(), 1);
        let m = &result.mismatches[0];
        assert_eq!(m.kind, MismatchKind::UnresolvedProject);
        assert_eq!(m.raw_value, "OBRA-X");
        assert_eq!(m.sheet.as_deref(), Some("Consumos"));
        match &m.context {
            RecoveredContext::MaterialRow { amount, .. } => assert_eq!(*amount, 5.0),
            other => panic!("wrong context: {other:?}"),
        }
    }

    #[test]
    fn test_finished_project_informational() {
        let grid = vec![
            header(),
            vec![t("A"), t("Lámina"), n(1.0), n(5.0), n(5.0), t("06/10/2025"), t("PR200")],
        ];
        let sheets = vec![("Consumos".to_string(), grid)];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.mismatches[0].kind, MismatchKind::ProjectFinished);
    }

    #[test]
    fn test_non_data_sheets_skipped_and_empty_workbook_fails() {
        let notes = vec![vec![t("Notas"), t("varias")]];
        let data = vec![
            header(),
            vec![t("A"), t("Lámina"), n(1.0), n(5.0), n(5.0), t("06/10/2025"), t("PR100")],
        ];
        let sheets = vec![
            ("Portada".to_string(), notes.clone()),
            ("Consumos".to_string(), data),
        ];
        let result = parse_materials(&sheets, &catalog(), today()).unwrap();
        assert_eq!(result.candidates.len(), 1);

        let only_notes = vec![("Portada".to_string(), notes)];
        let err = parse_materials(&only_notes, &catalog(), today()).unwrap_err();
        assert!(err.to_string().contains("no recognizable columns"));
    }

    #[test]
    fn test_rows_without_part_or_description_skipped() {
        let grid = vec![
            header(),
            vec![Cell::Empty, Cell::Empty, n(4.0), n(2.0), n(8.0), t("06/10/2025"), t("PR100")],
        ];
        let sheets = vec![("Consumos".to_string(), grid)];
        let err = parse_materials(&sheets, &catalog(), today()).unwrap_err();
        assert!(err.to_string().contains("no recognizable columns"));
    }

    #[test]
    fn test_find_col_substring_fallback_takes_lowest_column() {
        let mut map = HashMap::new();
        map.insert("TOTAL GENERAL".to_string(), 7);
        map.insert("COSTO TOTAL".to_string(), 4);
        // Two headers contain "TOTAL"; the leftmost column wins every run
        assert_eq!(find_col(&map, AMOUNT_COLS), Some(4));

        // An exact variant still beats any substring hit
        map.insert("IMPORTE".to_string(), 9);
        assert_eq!(find_col(&map, AMOUNT_COLS), Some(9));
    }
}
