use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use crate::db::{add_employee, get_connection, list_employees};
use crate::error::Result;
use crate::fmt::money;
use crate::settings::get_data_dir;

pub fn add(emp_code: &str, name: &str, rate: f64, overtime_rate: Option<f64>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    let overtime = overtime_rate.unwrap_or(rate * 1.5);
    add_employee(&conn, emp_code, name, rate, overtime)?;
    println!(
        "Added employee {} ({}, {}/h)",
        name.bold(),
        emp_code,
        money(rate)
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    let employees = list_employees(&conn)?;
    if employees.is_empty() {
        println!("No employees yet. Add one with `margen employees add`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["Id", "Name", "Hourly", "Overtime", "Active"]);
    for e in &employees {
        table.add_row([
            e.emp_code.clone(),
            e.name.clone(),
            money(e.hourly_rate),
            money(e.overtime_rate),
            if e.active { "yes".into() } else { "no".into() },
        ]);
    }
    println!("{table}");
    Ok(())
}
