use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::Rng;
use rusqlite::Connection;

use crate::db::{add_employee, add_project, get_connection, init_db, SqliteSink};
use crate::error::Result;
use crate::factors::{self, MANUFACTURING, OPERATING};
use crate::models::{Candidate, HourCandidate, HourType, MaterialCandidate};
use crate::recon::TransactionSink;
use crate::settings::get_data_dir;

const DEMO_PROJECTS: &[(&str, &str, &str)] = &[
    ("PR-9001", "OB-101", "Nave industrial Apodaca"),
    ("PR-9002", "OB-102", "Bodega refrigerada Santa Catarina"),
    ("PR-9003", "OB-103", "Mezzanine planta Escobedo"),
];

const DEMO_EMPLOYEES: &[(&str, &str, f64)] = &[
    ("1001", "JUAN PEREZ GARCIA", 85.0),
    ("1002", "MARIA LOPEZ HERNANDEZ", 92.5),
    ("1003", "CARLOS RAMIREZ TORRES", 78.0),
    ("1004", "ANA MARTINEZ FLORES", 110.0),
];

const DEMO_PARTS: &[(&str, &str, f64)] = &[
    ("TOR-1/2", "TORNILLO ESTRUCTURAL 1/2", 14.80),
    ("PLA-3/16", "PLACA ACERO 3/16", 420.00),
    ("SOL-6013", "SOLDADURA 6013 KG", 96.50),
    ("PIN-EPX", "PINTURA EPOXICA CUBETA", 1850.00),
];

/// Weeks of demo history generated before the current week.
const DEMO_WEEKS: i64 = 6;

fn seed_hours(
    conn: &mut Connection,
    project_ids: &[i64],
    employees: &[(i64, f64)],
    monday: NaiveDate,
) -> Result<usize> {
    let mut rng = rand::thread_rng();
    let mut batch = Vec::new();

    for week_offset in 0..DEMO_WEEKS {
        let week_start = monday - Duration::weeks(DEMO_WEEKS - week_offset);
        for day in 0..5 {
            let date = week_start + Duration::days(day);
            let week = date.iso_week().week();
            for (i, &(employee_id, rate)) in employees.iter().enumerate() {
                let project_id = project_ids[(i + day as usize) % project_ids.len()];
                // Morning and afternoon shifts, with the occasional early leave
                for base in [5.0f64, 3.5] {
                    let hours = if rng.gen_ratio(1, 12) { base - 0.5 } else { base };
                    batch.push(Candidate::Hours(HourCandidate {
                        project_id,
                        employee_id,
                        date,
                        week,
                        hours,
                        rate,
                        cost: hours * rate,
                        hour_type: HourType::Normal,
                    }));
                }
                // Occasional overtime at 1.5x
                if rng.gen_ratio(1, 10) {
                    let overtime_rate = rate * 1.5;
                    batch.push(Candidate::Hours(HourCandidate {
                        project_id,
                        employee_id,
                        date,
                        week,
                        hours: 2.0,
                        rate: overtime_rate,
                        cost: 2.0 * overtime_rate,
                        hour_type: HourType::Extra,
                    }));
                }
            }
        }
    }

    let count = batch.len();
    let mut sink = SqliteSink::new(conn, "demo-horas.xlsx", "hours", None);
    sink.submit(&batch)?;
    Ok(count)
}

fn seed_materials(
    conn: &mut Connection,
    project_ids: &[i64],
    monday: NaiveDate,
) -> Result<usize> {
    let mut rng = rand::thread_rng();
    let mut batch = Vec::new();

    for week_offset in 0..DEMO_WEEKS {
        let week_start = monday - Duration::weeks(DEMO_WEEKS - week_offset);
        for (i, &(part, desc, unit_cost)) in DEMO_PARTS.iter().enumerate() {
            let quantity = rng.gen_range(1..=8) as f64;
            batch.push(Candidate::Material(MaterialCandidate {
                project_id: project_ids[i % project_ids.len()],
                part_number: part.to_string(),
                description: desc.to_string(),
                quantity,
                unit_cost,
                amount: quantity * unit_cost,
                date: week_start + Duration::days((i as i64) % 5),
                source_sheet: "DEMO".to_string(),
            }));
        }
    }

    let count = batch.len();
    let mut sink = SqliteSink::new(conn, "demo-materiales.xlsx", "materials", None);
    sink.submit(&batch)?;
    Ok(count)
}

pub fn run() -> Result<()> {
    let db_path = get_data_dir().join("margen.db");
    if !db_path.exists() {
        eprintln!("No database found. Run `margen init` first.");
        std::process::exit(1);
    }

    let mut conn = get_connection(&db_path)?;
    init_db(&conn)?;

    // Idempotency guard
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE sae_code = ?1)",
        [DEMO_PROJECTS[0].0],
        |r| r.get(0),
    )?;
    if exists {
        println!(
            "Demo data already loaded (project {} exists).",
            DEMO_PROJECTS[0].0
        );
        return Ok(());
    }

    let mut project_ids = Vec::new();
    for &(sae, internal, name) in DEMO_PROJECTS {
        project_ids.push(add_project(&conn, sae, internal, name)?);
    }

    let mut employees = Vec::new();
    for &(code, name, rate) in DEMO_EMPLOYEES {
        let id = add_employee(&conn, code, name, rate, rate * 1.5)?;
        employees.push((id, rate));
    }

    let today = Local::now().date_naive();
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let since = monday - Duration::weeks(DEMO_WEEKS);

    factors::set_factor(&conn, MANUFACTURING, 1.18, since)?;
    factors::set_factor(&conn, OPERATING, 1.32, since)?;

    let hour_rows = seed_hours(&mut conn, &project_ids, &employees, monday)?;
    let material_rows = seed_materials(&mut conn, &project_ids, monday)?;

    println!("Demo data loaded!");
    println!(
        "  {} projects, {} employees, {DEMO_WEEKS} weeks of history",
        DEMO_PROJECTS.len(),
        DEMO_EMPLOYEES.len()
    );
    println!("  {hour_rows} hour transactions, {material_rows} material transactions");
    println!("Try `margen status` or `margen projects list`.");
    Ok(())
}
