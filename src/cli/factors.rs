use chrono::{Local, NaiveDate};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use crate::db::get_connection;
use crate::error::{MargenError, Result};
use crate::factors;
use crate::settings::get_data_dir;

pub fn set(name: &str, value: f64, effective: Option<&str>) -> Result<()> {
    let date = match effective {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            MargenError::Validation(format!("invalid date \"{s}\"; expected YYYY-MM-DD"))
        })?,
        None => Local::now().date_naive(),
    };
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    factors::set_factor(&conn, name, value, date)?;
    println!(
        "Set {} factor to {} effective {}",
        name.bold(),
        value,
        date.format("%Y-%m-%d")
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    let entries = factors::history(&conn)?;
    if entries.is_empty() {
        println!("No factors recorded. Set one with `margen factors set`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["Factor", "Value", "Effective"]);
    for entry in &entries {
        table.add_row([
            entry.name.clone(),
            format!("{:.2}", entry.value),
            entry.effective_date.format("%Y-%m-%d").to_string(),
        ]);
    }
    println!("{table}");

    let today = Local::now().date_naive();
    for name in [factors::MANUFACTURING, factors::OPERATING] {
        match factors::factor_at(&conn, name, today)? {
            Some(v) => println!("Current {name}: {v:.2}"),
            None => println!("Current {name}: {}", "not set".yellow()),
        }
    }
    Ok(())
}
