use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::{MargenError, Result};

/// Append-only history of the two cost factors downstream reporting applies
/// on top of raw transactions. Old entries are never edited; the effective
/// value at any date is the latest entry at or before it.
pub const MANUFACTURING: &str = "manufacturing";
pub const OPERATING: &str = "operating";

#[derive(Debug, Clone)]
pub struct FactorEntry {
    pub name: String,
    pub value: f64,
    pub effective_date: NaiveDate,
}

fn validate_name(name: &str) -> Result<()> {
    if name == MANUFACTURING || name == OPERATING {
        Ok(())
    } else {
        Err(MargenError::Validation(format!(
            "unknown factor \"{name}\"; expected \"{MANUFACTURING}\" or \"{OPERATING}\""
        )))
    }
}

pub fn set_factor(
    conn: &Connection,
    name: &str,
    value: f64,
    effective_date: NaiveDate,
) -> Result<()> {
    validate_name(name)?;
    if value <= 0.0 {
        return Err(MargenError::Validation(format!(
            "factor value must be positive, got {value}"
        )));
    }
    conn.execute(
        "INSERT INTO factor_history (name, value, effective_date) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, value, effective_date.format("%Y-%m-%d").to_string()],
    )?;
    Ok(())
}

/// Factor in effect on `date`, if any entry covers it.
pub fn factor_at(conn: &Connection, name: &str, date: NaiveDate) -> Result<Option<f64>> {
    validate_name(name)?;
    let mut stmt = conn.prepare(
        "SELECT value FROM factor_history WHERE name = ?1 AND effective_date <= ?2 \
         ORDER BY effective_date DESC, id DESC LIMIT 1",
    )?;
    let value = stmt
        .query_row(
            rusqlite::params![name, date.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(value)
}

pub fn history(conn: &Connection) -> Result<Vec<FactorEntry>> {
    let mut stmt = conn.prepare(
        "SELECT name, value, effective_date FROM factor_history \
         ORDER BY name, effective_date, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let date: String = row.get(2)?;
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, date))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut entries = Vec::with_capacity(rows.len());
    for (name, value, date) in rows {
        let effective_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| MargenError::Other(format!("bad date in factor_history: {e}")))?;
        entries.push(FactorEntry {
            name,
            value,
            effective_date,
        });
    }
    Ok(entries)
}
