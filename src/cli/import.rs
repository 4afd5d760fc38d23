use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use crate::catalog::Catalog;
use crate::db::{self, get_connection, SqliteSink};
use crate::error::{MargenError, Result};
use crate::fmt::{hours as fmt_hours, money};
use crate::grid::load_workbook;
use crate::models::{Candidate, MismatchKind};
use crate::recon::{Decision, Session};
use crate::settings::get_data_dir;

use super::correct_manager;

pub fn hours(
    file: &str,
    week_start: Option<&str>,
    map: &[String],
    ignore: &[String],
    dry_run: bool,
) -> Result<()> {
    let fallback = week_start
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                MargenError::Validation(format!("--week-start must be YYYY-MM-DD, got {s}"))
            })
        })
        .transpose()?;

    run_import("hours", file, map, ignore, dry_run, |sheets, catalog| {
        let (_, grid) = sheets
            .first()
            .ok_or_else(|| MargenError::Workbook("workbook has no sheets".to_string()))?;
        let parse = crate::hours::parse_hours(grid, catalog, fallback)?;
        println!(
            "Week starting {} (ISO week {})",
            parse.layout.period_start,
            parse.layout.period_start.format("%V")
        );
        Ok(parse.result)
    })
}

pub fn materials(file: &str, map: &[String], ignore: &[String], dry_run: bool) -> Result<()> {
    run_import("materials", file, map, ignore, dry_run, |sheets, catalog| {
        let today = chrono::Local::now().date_naive();
        crate::materials::parse_materials(sheets, catalog, today)
    })
}

fn run_import<F>(
    kind: &str,
    file: &str,
    map: &[String],
    ignore: &[String],
    dry_run: bool,
    parse: F,
) -> Result<()>
where
    F: FnOnce(
        &[(String, crate::grid::Grid)],
        &Catalog,
    ) -> Result<crate::models::ParseResult>,
{
    let file_path = PathBuf::from(file);
    let mut conn = get_connection(&get_data_dir().join("margen.db"))?;

    let checksum = db::compute_checksum(&file_path)?;
    if !dry_run && db::is_duplicate_upload(&conn, kind, &checksum)? {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }

    // Snapshot the catalog once; every row of this run resolves against it.
    let catalog = Catalog::new(db::list_projects(&conn)?, db::list_employees(&conn)?);

    let sheets = load_workbook(&file_path)?;
    let result = parse(&sheets, &catalog)?;
    let mut session = Session::new(result);

    apply_decisions(&mut session, &catalog, map, ignore)?;
    print_notices(&session);

    if session.unresolved() > 0 {
        if std::io::stdout().is_terminal() {
            correct_manager::run(&mut session, &catalog)?;
        }
        if session.unresolved() > 0 {
            print_worklist(&session);
            return Err(MargenError::Validation(format!(
                "{} mismatch group(s) unresolved; nothing was committed. \
                 Re-run with --map/--ignore or correct interactively.",
                session.unresolved()
            )));
        }
    }

    let batch = session.preview(&catalog)?;
    if dry_run {
        print_summary(&batch, &catalog);
        println!("{}", "Dry run: nothing was committed.".yellow());
        return Ok(());
    }

    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    let mut sink = SqliteSink::new(&mut conn, filename, kind, Some(checksum));
    let outcome = session.save(&catalog, &mut sink)?;

    print_summary(&batch, &catalog);
    println!("{}", outcome.message.green());
    if let Some(id) = sink.last_import_id() {
        println!("Recorded as import #{id}.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scripted decisions: --map project:RAW=CODE, --ignore employee:RAW
// ---------------------------------------------------------------------------

fn parse_kind(token: &str) -> Result<MismatchKind> {
    match token {
        "project" => Ok(MismatchKind::UnresolvedProject),
        "employee" => Ok(MismatchKind::UnresolvedEmployee),
        other => Err(MargenError::Validation(format!(
            "expected \"project\" or \"employee\", got \"{other}\""
        ))),
    }
}

fn apply_decisions(
    session: &mut Session,
    catalog: &Catalog,
    map: &[String],
    ignore: &[String],
) -> Result<()> {
    for entry in map {
        let (kind_raw, assignment) = entry.split_once(':').ok_or_else(|| {
            MargenError::Validation(format!("--map expects kind:RAW=CODE, got \"{entry}\""))
        })?;
        let (raw, code) = assignment.split_once('=').ok_or_else(|| {
            MargenError::Validation(format!("--map expects kind:RAW=CODE, got \"{entry}\""))
        })?;
        let kind = parse_kind(kind_raw)?;
        let id = match kind {
            MismatchKind::UnresolvedEmployee => catalog
                .employee(code)
                .map(|e| e.id)
                .ok_or_else(|| MargenError::UnknownEmployee(code.to_string()))?,
            _ => catalog
                .resolve_material_token(code)
                .map(|p| p.id)
                .ok_or_else(|| MargenError::UnknownProject(code.to_string()))?,
        };
        session.set_correction(kind, raw, id, catalog)?;
    }
    for entry in ignore {
        let (kind_raw, raw) = entry.split_once(':').ok_or_else(|| {
            MargenError::Validation(format!("--ignore expects kind:RAW, got \"{entry}\""))
        })?;
        session.set_ignore(parse_kind(kind_raw)?, raw);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_notices(session: &Session) {
    for group in session.groups() {
        if group.kind == MismatchKind::ProjectFinished {
            println!(
                "{} {} row(s) reference finished project \"{}\"; skipped.",
                "note:".yellow(),
                group.rows,
                group.raw_value
            );
        }
    }
}

fn print_worklist(session: &Session) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["Kind", "Value", "Rows", "Decision"]);
    for g in session.groups() {
        if !g.kind.is_correctable() {
            continue;
        }
        let decision = match g.decision {
            Some(Decision::Correct(id)) => format!("corrected → #{id}"),
            Some(Decision::Ignore) => "ignored".to_string(),
            None => "pending".to_string(),
        };
        table.add_row([
            g.kind.label().to_string(),
            g.raw_value.clone(),
            g.rows.to_string(),
            decision,
        ]);
    }
    println!("{table}");
}

fn print_summary(batch: &[Candidate], catalog: &Catalog) {
    let project_name = |id: i64| {
        catalog
            .project_by_id(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    };

    // Hours roll up per project; materials per (sheet, project)
    let mut hour_totals: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut material_totals: BTreeMap<(String, String), f64> = BTreeMap::new();
    for c in batch {
        match c {
            Candidate::Hours(h) => {
                let entry = hour_totals.entry(project_name(h.project_id)).or_default();
                entry.0 += h.hours;
                entry.1 += h.cost;
            }
            Candidate::Material(m) => {
                *material_totals
                    .entry((m.source_sheet.clone(), project_name(m.project_id)))
                    .or_default() += m.amount;
            }
        }
    }

    if !hour_totals.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(["Project", "Hours", "Labor cost"]);
        for (name, (hours, cost)) in &hour_totals {
            table.add_row([name.clone(), fmt_hours(*hours), money(*cost)]);
        }
        println!("{table}");
    }
    if !material_totals.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(["Sheet", "Project", "Amount"]);
        for ((sheet, name), amount) in &material_totals {
            table.add_row([sheet.clone(), name.clone(), money(*amount)]);
        }
        println!("{table}");
    }
}
