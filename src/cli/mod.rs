pub mod check;
pub mod init;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::SyncError;
use crate::settings::Settings;
use crate::source::{read_rows, CellRange};
use crate::sync::RowFailure;

#[derive(Parser)]
#[command(
    name = "supplier-sync",
    version,
    about = "Apply supplier spreadsheet updates to the supplier database."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/supplier-sync/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database schema and seed the employee count brackets.
    Init,
    /// Apply every row of a spreadsheet export to the database.
    Sync {
        /// CSV, TSV or workbook file to read
        file: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Map and validate a spreadsheet without writing anything.
    Check {
        /// CSV, TSV or workbook file to read
        file: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show the configured database and record counts.
    Status,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Worksheet name (workbooks only)
    #[arg(long)]
    pub sheet: Option<String>,
    /// A1 range to read, e.g. A3:AR
    #[arg(long)]
    pub range: Option<String>,
}

/// Rows read from `file`, and the sheet row number of the first one.
pub(crate) fn read_source(
    file: &Path,
    args: &SourceArgs,
    settings: &Settings,
) -> Result<(Vec<Vec<String>>, usize)> {
    let range = CellRange::parse(args.range.as_deref().unwrap_or(&settings.range))?;
    let sheet = args.sheet.as_deref().unwrap_or(&settings.sheet);
    let rows = read_rows(file, sheet, &range)
        .with_context(|| format!("reading {}", file.display()))?;
    Ok((rows, range.start_row as usize + 1))
}

/// Open the configured database, which `init` must have created.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let db_path = settings.db_path();
    if !db_path.exists() {
        bail!(
            "Database not found at {}. Run `supplier-sync init` first.",
            db_path.display()
        );
    }
    let conn = get_connection(&db_path, settings.busy_timeout())
        .with_context(|| format!("opening {}", db_path.display()))?;
    Ok(conn)
}

fn describe(error: &SyncError) -> String {
    match error {
        SyncError::Invalid(violations) => violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

pub(crate) fn failure_table(failures: &[RowFailure]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Row", "Supplier", "Problem"]);
    for f in failures {
        table.add_row(vec![
            Cell::new(f.row),
            Cell::new(f.supplier_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(describe(&f.error)),
        ]);
    }
    table
}
