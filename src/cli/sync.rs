use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use super::{failure_table, open_db, read_source, SourceArgs};
use crate::settings::Settings;
use crate::sync::sync_rows;

pub fn run(settings: &Settings, file: &Path, source: &SourceArgs) -> Result<()> {
    let (rows, first_row) = read_source(file, source, settings)?;
    let mut conn = open_db(settings)?;

    info!(
        env = %settings.env,
        service = %settings.service_name,
        file = %file.display(),
        rows = rows.len(),
        "starting sync"
    );
    let summary = sync_rows(&mut conn, &rows, first_row);

    println!(
        "{} rows: {} applied, {} rejected, {} rolled back, {} commit failed",
        summary.total(),
        summary.applied.to_string().green(),
        summary.rejected.to_string().yellow(),
        summary.rolled_back.to_string().red(),
        summary.commit_failed.to_string().red(),
    );
    println!(
        "Bank accounts: {} inserted, {} updated",
        summary.bank_inserted, summary.bank_updated
    );

    if !summary.failures.is_empty() {
        println!();
        println!("{failures}", failures = failure_table(&summary.failures));
    }
    Ok(())
}
