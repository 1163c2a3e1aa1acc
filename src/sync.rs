use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::changeset::{apply_insert, apply_update};
use crate::db::{find_bank_account, live_bank_account_id};
use crate::error::{Result, SyncError};
use crate::mapper::{map_row, parse_supplier_id, MappedRow};
use crate::models::{BANK_ACCOUNT_DETAILS, SUPPLIERS, SUPPLIER_DETAILS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankWrite {
    Inserted(i64),
    Updated(usize),
    Skipped,
}

/// What a committed row wrote. `None` means the table had nothing to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRow {
    pub supplier_id: i64,
    pub supplier_rows: Option<usize>,
    pub detail_rows: Option<usize>,
    pub bank: BankWrite,
}

#[derive(Debug)]
pub enum RowOutcome {
    Applied(AppliedRow),
    /// Rejected before any write: bad id or failed validation.
    Rejected(SyncError),
    RolledBack(SyncError),
    CommitFailed(SyncError),
}

/// A row that did not make it into the database.
#[derive(Debug)]
pub struct RowFailure {
    /// Sheet row number (1-based).
    pub row: usize,
    pub supplier_id: Option<i64>,
    pub error: SyncError,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub applied: usize,
    pub rejected: usize,
    pub rolled_back: usize,
    pub commit_failed: usize,
    pub bank_inserted: usize,
    pub bank_updated: usize,
    pub failures: Vec<RowFailure>,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.applied + self.rejected + self.rolled_back + self.commit_failed
    }

    fn record(&mut self, row: usize, supplier_id: Option<i64>, outcome: RowOutcome) {
        let error = match outcome {
            RowOutcome::Applied(applied) => {
                self.applied += 1;
                match applied.bank {
                    BankWrite::Inserted(_) => self.bank_inserted += 1,
                    BankWrite::Updated(_) => self.bank_updated += 1,
                    BankWrite::Skipped => {}
                }
                return;
            }
            RowOutcome::Rejected(e) => {
                self.rejected += 1;
                e
            }
            RowOutcome::RolledBack(e) => {
                self.rolled_back += 1;
                e
            }
            RowOutcome::CommitFailed(e) => {
                self.commit_failed += 1;
                e
            }
        };
        self.failures.push(RowFailure {
            row,
            supplier_id,
            error,
        });
    }
}

// ---------------------------------------------------------------------------
// Single row
// ---------------------------------------------------------------------------

/// Map and validate a row without writing anything.
pub fn prepare_row<S: AsRef<str>>(conn: &Connection, row: &[S]) -> Result<MappedRow> {
    let mapped = map_row(row)?;
    let stored = if mapped.has_bank_fields() {
        find_bank_account(conn, mapped.supplier_id())?
    } else {
        None
    };
    let violations = mapped.validate(stored.as_ref());
    if !violations.is_empty() {
        return Err(SyncError::Invalid(violations));
    }
    Ok(mapped)
}

fn log_affected(supplier_id: i64, table: &str, affected: Option<usize>) {
    if affected == Some(0) {
        info!(supplier_id, table, "no rows affected");
    }
}

/// The three writes, in order. Runs inside the caller's transaction.
fn write_row(conn: &Connection, mapped: &MappedRow) -> Result<AppliedRow> {
    let id = mapped.supplier_id();

    let supplier_rows = apply_update(conn, SUPPLIERS, "id", id, &mapped.supplier.changes())?;
    log_affected(id, SUPPLIERS, supplier_rows);

    let detail_rows = apply_update(conn, SUPPLIER_DETAILS, "supplier_id", id, &mapped.detail.changes())?;
    log_affected(id, SUPPLIER_DETAILS, detail_rows);

    let bank_changes = mapped.bank.changes();
    let bank = if bank_changes.is_empty() {
        BankWrite::Skipped
    } else {
        match live_bank_account_id(conn, id)? {
            Some(account_id) => {
                let affected = apply_update(conn, BANK_ACCOUNT_DETAILS, "id", account_id, &bank_changes)?;
                log_affected(id, BANK_ACCOUNT_DETAILS, affected);
                BankWrite::Updated(affected.unwrap_or(0))
            }
            None => BankWrite::Inserted(apply_insert(
                conn,
                BANK_ACCOUNT_DETAILS,
                "supplier_id",
                id,
                &bank_changes,
            )?),
        }
    };

    Ok(AppliedRow {
        supplier_id: id,
        supplier_rows,
        detail_rows,
        bank,
    })
}

/// Apply one row in its own transaction. Never panics and never returns
/// early with `?`: every failure becomes a `RowOutcome`.
pub fn sync_row<S: AsRef<str>>(conn: &mut Connection, row: &[S]) -> RowOutcome {
    let mapped = match prepare_row(conn, row) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "row rejected");
            return RowOutcome::Rejected(e);
        }
    };
    let id = mapped.supplier_id();

    let tx = match conn.transaction() {
        Ok(tx) => tx,
        Err(e) => {
            error!(supplier_id = id, error = %e, "could not begin transaction");
            return RowOutcome::RolledBack(e.into());
        }
    };

    match write_row(&tx, &mapped) {
        Ok(applied) => match tx.commit() {
            Ok(()) => {
                info!(supplier_id = id, bank = ?applied.bank, "row applied");
                RowOutcome::Applied(applied)
            }
            Err(e) => {
                error!(supplier_id = id, error = %e, "commit failed");
                if !conn.is_autocommit() {
                    if let Err(rb) = conn.execute_batch("ROLLBACK") {
                        error!(supplier_id = id, error = %rb, "rollback failed");
                    }
                }
                RowOutcome::CommitFailed(e.into())
            }
        },
        Err(e) => {
            error!(supplier_id = id, error = %e, "write failed, rolling back");
            if let Err(rb) = tx.rollback() {
                error!(supplier_id = id, error = %rb, "rollback failed");
            }
            RowOutcome::RolledBack(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Apply every row in order. `first_row` is the sheet row number of `rows[0]`.
/// A failing row is recorded and the job moves on.
pub fn sync_rows<S: AsRef<str>>(conn: &mut Connection, rows: &[Vec<S>], first_row: usize) -> SyncSummary {
    let mut summary = SyncSummary::default();
    for (i, row) in rows.iter().enumerate() {
        let sheet_row = first_row + i;
        let supplier_id = parse_supplier_id(row).ok();
        info!(row = sheet_row, supplier_id, "processing row");
        let outcome = sync_row(conn, row);
        summary.record(sheet_row, supplier_id, outcome);
    }
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        rolled_back = summary.rolled_back,
        commit_failed = summary.commit_failed,
        "sync finished"
    );
    summary
}

/// Map and validate every row, returning the ones that would be rejected.
pub fn check_rows<S: AsRef<str>>(conn: &Connection, rows: &[Vec<S>], first_row: usize) -> Result<Vec<RowFailure>> {
    let mut failures = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match prepare_row(conn, row) {
            Ok(_) => {}
            Err(SyncError::Db(e)) => return Err(SyncError::Db(e)),
            Err(error) => failures.push(RowFailure {
                row: first_row + i,
                supplier_id: parse_supplier_id(row).ok(),
                error,
            }),
        }
    }
    Ok(failures)
}
