use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{BankAccountPatch, EMPLOYEE_BRACKETS};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS employee_count_ranges (
    id INTEGER PRIMARY KEY,
    label TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS suppliers (
    id INTEGER PRIMARY KEY,
    entity TEXT NOT NULL DEFAULT '',
    company_name TEXT NOT NULL DEFAULT '',
    alternate_company_name TEXT,
    country TEXT NOT NULL DEFAULT '',
    city TEXT,
    location_region TEXT,
    legal_person TEXT,
    legal_person_id TEXT,
    number_of_employees_range_id INTEGER,
    passed_vetting TEXT,
    vetting_info_url TEXT,
    contact_person TEXT NOT NULL DEFAULT '',
    contact_number TEXT NOT NULL DEFAULT '',
    social_network_id TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT,
    deleted_at TEXT,
    FOREIGN KEY (number_of_employees_range_id) REFERENCES employee_count_ranges(id)
);

CREATE TABLE IF NOT EXISTS supplier_details (
    id INTEGER PRIMARY KEY,
    supplier_id INTEGER NOT NULL UNIQUE,
    business_registration_number TEXT,
    registered_business_address TEXT,
    supplier_address TEXT,
    date_of_establishment TEXT,
    paid_up_capital INTEGER,
    email_address TEXT,
    supplier_website_url TEXT,
    supplier_type TEXT,
    branded_goods INTEGER NOT NULL DEFAULT 0,
    brand_check_id TEXT,
    origin_source TEXT NOT NULL DEFAULT '',
    honest_civil_debtor INTEGER,
    invoice_under_alias INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT,
    deleted_at TEXT,
    FOREIGN KEY (supplier_id) REFERENCES suppliers(id)
);

CREATE TABLE IF NOT EXISTS bank_account_details (
    id INTEGER PRIMARY KEY,
    supplier_id INTEGER NOT NULL,
    account_type TEXT,
    account_holder_name TEXT,
    account_number TEXT,
    bank_name TEXT,
    swift_code TEXT,
    bank_address TEXT,
    supplier_company_address TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT,
    deleted_at TEXT,
    FOREIGN KEY (supplier_id) REFERENCES suppliers(id)
);

CREATE INDEX IF NOT EXISTS idx_bank_account_details_supplier
    ON bank_account_details (supplier_id);
";

pub fn get_connection(db_path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM employee_count_ranges", [], |row| row.get(0))?;
    if count == 0 {
        for (id, label) in EMPLOYEE_BRACKETS {
            conn.execute(
                "INSERT INTO employee_count_ranges (id, label) VALUES (?1, ?2)",
                rusqlite::params![id, label],
            )?;
        }
    }
    Ok(())
}

/// Existence check for the bank-account branch: the id of the supplier's live
/// (not soft-deleted) bank account, or `None` when there is none.
pub fn live_bank_account_id(conn: &Connection, supplier_id: i64) -> Result<Option<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM bank_account_details WHERE supplier_id = ?1 AND deleted_at IS NULL \
         ORDER BY id LIMIT 1",
    )?;
    Ok(stmt.query_row([supplier_id], |row| row.get(0)).optional()?)
}

/// The live bank account for a supplier, if there is one.
pub fn find_bank_account(conn: &Connection, supplier_id: i64) -> Result<Option<BankAccountPatch>> {
    let mut stmt = conn.prepare_cached(
        "SELECT account_type, account_holder_name, account_number, bank_name, swift_code, \
         bank_address, supplier_company_address \
         FROM bank_account_details WHERE supplier_id = ?1 AND deleted_at IS NULL \
         ORDER BY id LIMIT 1",
    )?;
    let account = stmt
        .query_row([supplier_id], |row| {
            Ok(BankAccountPatch {
                supplier_id,
                account_type: row.get(0)?,
                account_holder_name: row.get(1)?,
                account_number: row.get(2)?,
                bank_name: row.get(3)?,
                swift_code: row.get(4)?,
                bank_address: row.get(5)?,
                supplier_company_address: row.get(6)?,
            })
        })
        .optional()?;
    Ok(account)
}

pub struct TableCounts {
    pub suppliers: i64,
    pub supplier_details: i64,
    pub bank_accounts: i64,
}

pub fn table_counts(conn: &Connection) -> Result<TableCounts> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(TableCounts {
        suppliers: count("SELECT count(*) FROM suppliers WHERE deleted_at IS NULL")?,
        supplier_details: count("SELECT count(*) FROM supplier_details WHERE deleted_at IS NULL")?,
        bank_accounts: count("SELECT count(*) FROM bank_account_details WHERE deleted_at IS NULL")?,
    })
}
