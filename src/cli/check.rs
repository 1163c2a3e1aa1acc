use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::{failure_table, open_db, read_source, SourceArgs};
use crate::settings::Settings;
use crate::sync::check_rows;

pub fn run(settings: &Settings, file: &Path, source: &SourceArgs) -> Result<()> {
    let (rows, first_row) = read_source(file, source, settings)?;
    let conn = open_db(settings)?;
    let failures = check_rows(&conn, &rows, first_row)?;

    if failures.is_empty() {
        println!("{} rows OK", rows.len().to_string().green());
        return Ok(());
    }

    println!(
        "{} of {} rows would be rejected",
        failures.len().to_string().red(),
        rows.len()
    );
    println!("{}", failure_table(&failures));
    Ok(())
}
