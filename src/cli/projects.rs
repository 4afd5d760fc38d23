use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use crate::db::{add_project, finish_project, get_connection, list_projects};
use crate::error::Result;
use crate::settings::get_data_dir;

pub fn add(sae_code: &str, internal_code: &str, name: &str) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    add_project(&conn, sae_code, internal_code, name)?;
    println!("Added project {} ({} / {})", name.bold(), sae_code, internal_code);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    let projects = list_projects(&conn)?;
    if projects.is_empty() {
        println!("No projects yet. Add one with `margen projects add`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["SAE code", "Internal", "Name", "Status"]);
    for p in &projects {
        table.add_row([
            p.sae_code.as_str(),
            p.internal_code.as_str(),
            p.name.as_str(),
            p.status.as_str(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn finish(code: &str) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("margen.db"))?;
    let name = finish_project(&conn, code)?;
    println!(
        "Marked {} finished. New costs against it will be flagged, not posted.",
        name.bold()
    );
    Ok(())
}
