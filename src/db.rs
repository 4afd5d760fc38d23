use std::path::Path;

use chrono::Datelike;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{MargenError, Result};
use crate::models::{Candidate, Employee, Project, ProjectStatus};
use crate::recon::TransactionSink;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    sae_code TEXT NOT NULL,
    internal_code TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    deleted INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_sae
    ON projects(sae_code) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_internal
    ON projects(internal_code) WHERE deleted = 0;

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY,
    emp_code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    hourly_rate REAL NOT NULL,
    overtime_rate REAL NOT NULL,
    active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    kind TEXT NOT NULL,
    imported_at TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS cost_transactions (
    id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    project_id INTEGER NOT NULL,
    employee_id INTEGER,
    date TEXT NOT NULL,
    week INTEGER NOT NULL,
    hours REAL,
    rate REAL,
    hour_type TEXT,
    part_number TEXT,
    description TEXT,
    quantity REAL,
    unit_cost REAL,
    amount REAL NOT NULL,
    source_sheet TEXT,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (project_id) REFERENCES projects(id),
    FOREIGN KEY (employee_id) REFERENCES employees(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS factor_history (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    value REAL NOT NULL,
    effective_date TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog snapshot
// ---------------------------------------------------------------------------

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, sae_code, internal_code, name, status FROM projects \
         WHERE deleted = 0 ORDER BY sae_code",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let status: String = row.get(4)?;
            Ok(Project {
                id: row.get(0)?,
                sae_code: row.get(1)?,
                internal_code: row.get(2)?,
                name: row.get(3)?,
                status: ProjectStatus::parse(&status).unwrap_or(ProjectStatus::Open),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_employees(conn: &Connection) -> Result<Vec<Employee>> {
    let mut stmt = conn.prepare(
        "SELECT id, emp_code, name, hourly_rate, overtime_rate, active FROM employees \
         ORDER BY emp_code",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Employee {
                id: row.get(0)?,
                emp_code: row.get(1)?,
                name: row.get(2)?,
                hourly_rate: row.get(3)?,
                overtime_rate: row.get(4)?,
                active: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Upload records
// ---------------------------------------------------------------------------

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// A byte-identical file already committed for the same report kind.
pub fn is_duplicate_upload(conn: &Connection, kind: &str, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE kind = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![kind, checksum])?)
}

// ---------------------------------------------------------------------------
// Transaction sink
// ---------------------------------------------------------------------------

/// Appends validated batches to `cost_transactions` inside a single SQL
/// transaction and records the upload in `imports`. All-or-nothing: a failed
/// insert rolls the whole batch back.
pub struct SqliteSink<'a> {
    conn: &'a mut Connection,
    filename: String,
    kind: String,
    checksum: Option<String>,
    last_import_id: Option<i64>,
}

impl<'a> SqliteSink<'a> {
    pub fn new(conn: &'a mut Connection, filename: &str, kind: &str, checksum: Option<String>) -> Self {
        Self {
            conn,
            filename: filename.to_string(),
            kind: kind.to_string(),
            checksum,
            last_import_id: None,
        }
    }

    pub fn last_import_id(&self) -> Option<i64> {
        self.last_import_id
    }
}

impl TransactionSink for SqliteSink<'_> {
    fn submit(&mut self, batch: &[Candidate]) -> Result<()> {
        let tx = self.conn.transaction()?;

        let mut dates: Vec<String> = batch
            .iter()
            .map(|c| match c {
                Candidate::Hours(h) => h.date.format("%Y-%m-%d").to_string(),
                Candidate::Material(m) => m.date.format("%Y-%m-%d").to_string(),
            })
            .collect();
        dates.sort();

        tx.execute(
            "INSERT INTO imports (filename, kind, record_count, date_range_start, date_range_end, checksum) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                self.filename,
                self.kind,
                batch.len() as i64,
                dates.first(),
                dates.last(),
                self.checksum,
            ],
        )?;
        let import_id = tx.last_insert_rowid();

        for candidate in batch {
            match candidate {
                Candidate::Hours(h) => {
                    tx.execute(
                        "INSERT INTO cost_transactions \
                         (kind, project_id, employee_id, date, week, hours, rate, hour_type, amount, import_id) \
                         VALUES ('hours', ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        rusqlite::params![
                            h.project_id,
                            h.employee_id,
                            h.date.format("%Y-%m-%d").to_string(),
                            h.week,
                            h.hours,
                            h.rate,
                            h.hour_type.as_str(),
                            h.cost,
                            import_id,
                        ],
                    )?;
                }
                Candidate::Material(m) => {
                    tx.execute(
                        "INSERT INTO cost_transactions \
                         (kind, project_id, date, week, part_number, description, quantity, unit_cost, amount, source_sheet, import_id) \
                         VALUES ('material', ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                        rusqlite::params![
                            m.project_id,
                            m.date.format("%Y-%m-%d").to_string(),
                            m.date.iso_week().week(),
                            m.part_number,
                            m.description,
                            m.quantity,
                            m.unit_cost,
                            m.amount,
                            m.source_sheet,
                            import_id,
                        ],
                    )?;
                }
            }
        }

        tx.commit()?;
        self.last_import_id = Some(import_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog writes (thin CRUD used by the cli modules)
// ---------------------------------------------------------------------------

pub fn add_project(
    conn: &Connection,
    sae_code: &str,
    internal_code: &str,
    name: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO projects (sae_code, internal_code, name, status) VALUES (?1, ?2, ?3, 'open')",
        rusqlite::params![sae_code, internal_code, name],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            MargenError::Validation(format!(
                "a project with SAE code {sae_code} or internal code {internal_code} already exists"
            ))
        }
        other => MargenError::Db(other),
    })?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_project(conn: &Connection, code: &str) -> Result<String> {
    let (id, name): (i64, String) = conn
        .query_row(
            "SELECT id, name FROM projects WHERE deleted = 0 AND (sae_code = ?1 OR internal_code = ?1)",
            [code],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|_| MargenError::UnknownProject(code.to_string()))?;
    conn.execute(
        "UPDATE projects SET status = 'finished' WHERE id = ?1",
        [id],
    )?;
    Ok(name)
}

pub fn add_employee(
    conn: &Connection,
    emp_code: &str,
    name: &str,
    hourly_rate: f64,
    overtime_rate: f64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO employees (emp_code, name, hourly_rate, overtime_rate) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![emp_code, name, hourly_rate, overtime_rate],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            MargenError::Validation(format!("an employee with id {emp_code} already exists"))
        }
        other => MargenError::Db(other),
    })?;
    Ok(conn.last_insert_rowid())
}
