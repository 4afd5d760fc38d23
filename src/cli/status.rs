use colored::Colorize;
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::get_data_dir;

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

pub fn run() -> Result<()> {
    let data_dir = get_data_dir();
    let db_path = data_dir.join("margen.db");

    println!("Data directory: {}", data_dir.display().to_string().bold());
    if !db_path.exists() {
        println!("Database not found. Run `margen init` first.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("Database: {} ({:.1} KB)", db_path.display(), size as f64 / 1024.0);

    let conn = get_connection(&db_path)?;
    let projects = count(&conn, "SELECT COUNT(*) FROM projects WHERE deleted = 0")?;
    let open = count(
        &conn,
        "SELECT COUNT(*) FROM projects WHERE deleted = 0 AND status != 'finished'",
    )?;
    let employees = count(&conn, "SELECT COUNT(*) FROM employees WHERE active = 1")?;
    let transactions = count(&conn, "SELECT COUNT(*) FROM cost_transactions")?;
    let imports = count(&conn, "SELECT COUNT(*) FROM imports")?;

    println!("Projects:     {projects} ({open} open)");
    println!("Employees:    {employees} active");
    println!("Transactions: {transactions}");
    println!("Imports:      {imports}");

    let last: Option<(String, String)> = conn
        .query_row(
            "SELECT filename, kind FROM imports ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .ok();
    if let Some((filename, kind)) = last {
        println!("Last import:  {filename} ({kind})");
    }
    Ok(())
}
