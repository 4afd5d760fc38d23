use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::grid::Grid;
use crate::layout::{detect_hours_layout, HoursLayout};
use crate::models::{
    HourCandidate, HourCellContext, HourType, Mismatch, MismatchKind, ParseResult,
    ProjectStatus, RecoveredContext,
};
use crate::normalize::normalize;

/// One of the 17 fixed positions of the weekly grid. The geometry is a
/// declarative table so it can be swapped without touching row processing.
#[derive(Debug, Clone, Copy)]
pub struct ShiftColumn {
    pub col: usize,
    pub day_offset: i64,
    pub start_hour: f64,
    pub default_hours: f64,
}

/// Mon–Fri carry morning/afternoon/evening shifts, Saturday only the first
/// two. Data columns start at column index 3 (0-based).
pub const SHIFT_COLUMNS: [ShiftColumn; 17] = [
    // Monday
    ShiftColumn { col: 3, day_offset: 0, start_hour: 8.0, default_hours: 5.0 },
    ShiftColumn { col: 4, day_offset: 0, start_hour: 14.0, default_hours: 3.5 },
    ShiftColumn { col: 5, day_offset: 0, start_hour: 17.5, default_hours: 2.0 },
    // Tuesday
    ShiftColumn { col: 6, day_offset: 1, start_hour: 8.0, default_hours: 5.0 },
    ShiftColumn { col: 7, day_offset: 1, start_hour: 14.0, default_hours: 3.5 },
    ShiftColumn { col: 8, day_offset: 1, start_hour: 17.5, default_hours: 2.0 },
    // Wednesday
    ShiftColumn { col: 9, day_offset: 2, start_hour: 8.0, default_hours: 5.0 },
    ShiftColumn { col: 10, day_offset: 2, start_hour: 14.0, default_hours: 3.5 },
    ShiftColumn { col: 11, day_offset: 2, start_hour: 17.5, default_hours: 2.0 },
    // Thursday
    ShiftColumn { col: 12, day_offset: 3, start_hour: 8.0, default_hours: 5.0 },
    ShiftColumn { col: 13, day_offset: 3, start_hour: 14.0, default_hours: 3.5 },
    ShiftColumn { col: 14, day_offset: 3, start_hour: 17.5, default_hours: 2.0 },
    // Friday
    ShiftColumn { col: 15, day_offset: 4, start_hour: 8.0, default_hours: 5.0 },
    ShiftColumn { col: 16, day_offset: 4, start_hour: 14.0, default_hours: 3.5 },
    ShiftColumn { col: 17, day_offset: 4, start_hour: 17.5, default_hours: 2.0 },
    // Saturday
    ShiftColumn { col: 18, day_offset: 5, start_hour: 8.0, default_hours: 5.0 },
    ShiftColumn { col: 19, day_offset: 5, start_hour: 14.0, default_hours: 3.5 },
];

#[derive(Debug)]
pub struct HoursParse {
    pub layout: HoursLayout,
    pub result: ParseResult,
}

/// Project code with an optional explicit end time, e.g. "25-046-00(12:30)".
struct CellEntry {
    code: String,
    hours: f64,
}

fn parse_cell(raw: &str, shift: &ShiftColumn, end_time_re: &Regex) -> CellEntry {
    if let Some(caps) = end_time_re.captures(raw) {
        let hh: f64 = caps[2].parse().unwrap_or(0.0);
        let mm: f64 = caps[3].parse().unwrap_or(0.0);
        let end = hh + mm / 60.0;
        // Cross-midnight shifts are not modeled; negative durations clamp.
        let hours = (end - shift.start_hour).max(0.0);
        CellEntry {
            code: caps[1].trim().to_string(),
            hours,
        }
    } else {
        CellEntry {
            code: raw.to_string(),
            hours: shift.default_hours,
        }
    }
}

/// Walk the weekly time grid. Each row is one employee; each populated shift
/// cell resolves to (employee, day, project, hours) or to exactly one
/// mismatch, never both.
pub fn parse_hours(
    grid: &Grid,
    catalog: &Catalog,
    fallback_start: Option<NaiveDate>,
) -> Result<HoursParse> {
    let layout = detect_hours_layout(grid, fallback_start)?;
    let end_time_re = Regex::new(r"^(.+?)\s*\((\d{1,2}):(\d{2})\)$").unwrap();

    let mut result = ParseResult::default();

    for r in layout.data_start_row..grid.len() {
        let row = &grid[r];
        let raw_emp = row.first().map(|c| c.text()).unwrap_or_default();
        if raw_emp.is_empty() {
            continue;
        }

        let employee = catalog.employee(&raw_emp);

        // Row with an unknown employee id: collect the resolvable cells as
        // recovered context and emit a single row-level mismatch.
        let mut recovered_cells: Vec<HourCellContext> = Vec::new();

        for shift in &SHIFT_COLUMNS {
            let raw = match row.get(shift.col) {
                Some(c) => c.text(),
                None => continue,
            };
            if raw.chars().count() < 3 || normalize(&raw) == "X" {
                continue;
            }

            let entry = parse_cell(&raw, shift, &end_time_re);
            let date = layout.period_start + Duration::days(shift.day_offset);
            let week = date.iso_week().week();

            let Some(employee) = employee else {
                if let Some(project) = catalog.project_by_code(&entry.code) {
                    if project.status != ProjectStatus::Finished {
                        recovered_cells.push(HourCellContext {
                            project_id: project.id,
                            date,
                            week,
                            hours: entry.hours,
                        });
                    }
                }
                continue;
            };

            match catalog.project_by_code(&entry.code) {
                None => result.mismatches.push(Mismatch {
                    row: r,
                    kind: MismatchKind::UnresolvedProject,
                    raw_value: entry.code,
                    sheet: None,
                    context: RecoveredContext::HoursCell {
                        employee_id: employee.id,
                        date,
                        week,
                        hours: entry.hours,
                    },
                }),
                Some(project) if project.status == ProjectStatus::Finished => {
                    result.mismatches.push(Mismatch {
                        row: r,
                        kind: MismatchKind::ProjectFinished,
                        raw_value: entry.code,
                        sheet: None,
                        context: RecoveredContext::None,
                    })
                }
                Some(project) => {
                    let rate = employee.hourly_rate;
                    result.push_hours(HourCandidate {
                        project_id: project.id,
                        employee_id: employee.id,
                        date,
                        week,
                        hours: entry.hours,
                        rate,
                        cost: entry.hours * rate,
                        hour_type: HourType::Normal,
                    });
                }
            }
        }

        if employee.is_none() {
            result.mismatches.push(Mismatch {
                row: r,
                kind: MismatchKind::UnresolvedEmployee,
                raw_value: raw_emp,
                sheet: None,
                context: RecoveredContext::HoursRow {
                    cells: recovered_cells,
                },
            });
        }
    }

    Ok(HoursParse { layout, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
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
        let employees = vec![Employee {
            id: 10,
            emp_code: "E1".into(),
            name: "José Peña".into(),
            hourly_rate: 80.0,
            overtime_rate: 120.0,
            active: true,
        }];
        Catalog::new(projects, employees)
    }

    fn grid_with_row(cells: Vec<(usize, &str)>) -> Grid {
        let mut row = vec![Cell::Empty; 20];
        for (col, val) in cells {
            row[col] = Cell::Text(val.to_string());
        }
        vec![
            vec![Cell::Text("PERIODO DEL 06-10 DE OCTUBRE 2025".into())],
            vec![
                Cell::Text("Clave".into()),
                Cell::Text("Nombre del empleado".into()),
            ],
            row,
        ]
    }

    fn hour_candidates(result: &ParseResult) -> Vec<&HourCandidate> {
        result
            .candidates
            .iter()
            .map(|c| match c {
                Candidate::Hours(h) => h,
                Candidate::Material(_) => panic!("unexpected material candidate"),
            })
            .collect()
    }

    #[test]
    fn test_default_duration_and_end_time_override() {
        let grid = grid_with_row(vec![(0, "E1"), (3, "25-046-00"), (4, "25-046-00(16:00)")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        let cands = hour_candidates(&parse.result);
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].hours, 5.0); // column default
        assert_eq!(cands[1].hours, 2.0); // 16.0 - 14.0
        assert_eq!(cands[1].cost, 160.0);
        assert_eq!(cands[1].hour_type, HourType::Normal);
    }

    #[test]
    fn test_end_time_override() {
        // start 8.0, cell "25-046-00(12:30)" → 12.5 - 8.0 = 4.5
        let grid = grid_with_row(vec![(0, "E1"), (3, "25-046-00(12:30)")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        assert_eq!(hour_candidates(&parse.result)[0].hours, 4.5);
    }

    #[test]
    fn test_scenario_x_cell_and_cross_midnight_clamp() {
        // Mon-morning default 5.0h; "X" produces nothing; Mon-evening ends
        // 14:45 before the 17.5 start → clamps to 0 but is still emitted.
        let grid = grid_with_row(vec![(0, "E1"), (3, "PR100"), (4, "X"), (5, "PR100(14:45)")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        let cands = hour_candidates(&parse.result);
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].hours, 5.0);
        assert_eq!(cands[1].hours, 0.0);
        assert!(parse.result.mismatches.is_empty());
    }

    #[test]
    fn test_short_tokens_are_noise() {
        let grid = grid_with_row(vec![(0, "E1"), (3, "AB"), (4, "--")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        assert!(parse.result.candidates.is_empty());
        assert!(parse.result.mismatches.is_empty());
    }

    #[test]
    fn test_dates_and_iso_week_numbers() {
        // Monday 2025-10-06 is ISO week 41; Saturday lands on 10-11.
        let grid = grid_with_row(vec![(0, "E1"), (3, "PR100"), (18, "PR100")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        let cands = hour_candidates(&parse.result);
        assert_eq!(cands[0].date, NaiveDate::from_ymd_opt(2025, 10, 6).unwrap());
        assert_eq!(cands[0].week, 41);
        assert_eq!(cands[1].date, NaiveDate::from_ymd_opt(2025, 10, 11).unwrap());
        assert_eq!(cands[1].week, 41);
    }

    #[test]
    fn test_unresolved_project_mismatch_carries_context() {
        let grid = grid_with_row(vec![(0, "E1"), (6, "ZZ-999")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        assert!(parse.result.candidates.is_empty());
        assert_eq!(parse.result.mismatches.len(), 1);
        let m = &parse.result.mismatches[0];
        assert_eq!(m.kind, MismatchKind::UnresolvedProject);
        assert_eq!(m.raw_value, "ZZ-999");
        match &m.context {
            RecoveredContext::HoursCell {
                employee_id,
                date,
                hours,
                ..
            } => {
                assert_eq!(*employee_id, 10);
                assert_eq!(*date, NaiveDate::from_ymd_opt(2025, 10, 7).unwrap());
                assert_eq!(*hours, 5.0);
            }
            other => panic!("wrong context: {other:?}"),
        }
    }

    #[test]
    fn test_finished_project_is_informational() {
        let grid = grid_with_row(vec![(0, "E1"), (3, "PR200")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        assert!(parse.result.candidates.is_empty());
        let m = &parse.result.mismatches[0];
        assert_eq!(m.kind, MismatchKind::ProjectFinished);
        assert!(!m.kind.is_correctable());
    }

    #[test]
    fn test_unknown_employee_is_one_mismatch_for_the_row() {
        let grid = grid_with_row(vec![(0, "E9"), (3, "PR100"), (4, "PR100"), (6, "ZZ-999")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        assert!(parse.result.candidates.is_empty());
        assert_eq!(parse.result.mismatches.len(), 1);
        let m = &parse.result.mismatches[0];
        assert_eq!(m.kind, MismatchKind::UnresolvedEmployee);
        assert_eq!(m.raw_value, "E9");
        match &m.context {
            RecoveredContext::HoursRow { cells } => {
                // ZZ-999 did not resolve, so only the two PR100 cells survive
                assert_eq!(cells.len(), 2);
                assert!(cells.iter().all(|c| c.project_id == 1));
            }
            other => panic!("wrong context: {other:?}"),
        }
    }

    #[test]
    fn test_blank_identifier_rows_are_skipped() {
        let grid = grid_with_row(vec![(3, "PR100")]);
        let parse = parse_hours(&grid, &catalog(), None).unwrap();
        assert!(parse.result.candidates.is_empty());
        assert!(parse.result.mismatches.is_empty());
    }
}
