use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use tempfile::TempDir;

const WIDTH: usize = 36;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("data").join("suppliers.db")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("supplier-sync").unwrap();
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env("SUPPLIER_SYNC_DB_PATH", self.db_path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("SUPPLIER_SYNC_RANGE")
            .env_remove("SUPPLIER_SYNC_SHEET");
        cmd
    }

    fn init(&self) -> Connection {
        self.cmd().arg("init").assert().success();
        Connection::open(self.db_path()).unwrap()
    }

    fn write_csv(&self, name: &str, rows: &[Vec<String>]) -> PathBuf {
        let mut content = String::from("Supplier updates\nid,entity,company name\n");
        for row in rows {
            content.push_str(&row.join(","));
            content.push('\n');
        }
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn add_supplier(conn: &Connection, id: i64, name: &str) {
    conn.execute(
        "INSERT INTO suppliers (id, company_name) VALUES (?1, ?2)",
        rusqlite::params![id, name],
    )
    .unwrap();
    conn.execute("INSERT INTO supplier_details (supplier_id) VALUES (?1)", [id])
        .unwrap();
}

fn row(cells: &[(usize, &str)]) -> Vec<String> {
    let mut r = vec![String::new(); WIDTH];
    for (idx, value) in cells {
        r[*idx] = value.to_string();
    }
    r
}

fn acme(id: &str) -> Vec<String> {
    row(&[
        (0, id),
        (2, "Acme Co"),
        (27, "YES"),
        (29, "Corporate"),
        (30, "Jane Doe"),
        (31, "00112233"),
        (32, "Bank X"),
        (33, "ABCDEFGH"),
        (34, "123 St"),
        (35, "456 Ave"),
    ])
}

fn company_name(db: &Path, id: i64) -> String {
    Connection::open(db)
        .unwrap()
        .query_row("SELECT company_name FROM suppliers WHERE id = ?1", [id], |r| r.get(0))
        .unwrap()
}

#[test]
fn test_init_then_status() {
    let env = Env::new();
    env.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database ready"));
    assert!(env.db_path().exists());

    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Suppliers:         0"))
        .stdout(predicate::str::contains("Range:        A3:AR"));
}

#[test]
fn test_status_without_database() {
    let env = Env::new();
    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database not found"));
}

#[test]
fn test_sync_requires_init() {
    let env = Env::new();
    let csv = env.write_csv("updates.csv", &[acme("42")]);
    env.cmd()
        .arg("sync")
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `supplier-sync init` first"));
}

#[test]
fn test_sync_applies_rows_and_reports_failures() {
    let env = Env::new();
    let conn = env.init();
    add_supplier(&conn, 42, "Old Co");
    add_supplier(&conn, 43, "Beta");
    drop(conn);

    let mut bad = acme("43");
    bad[19] = "not-an-email".to_string();
    let rows = [acme("42"), row(&[(2, "No Id Ltd")]), bad, row(&[]), row(&[])];
    let csv = env.write_csv("updates.csv", &rows);

    env.cmd()
        .arg("sync")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 rows: 1 applied, 2 rejected, 0 rolled back, 0 commit failed",
        ))
        .stdout(predicate::str::contains("Bank accounts: 1 inserted, 0 updated"))
        .stdout(predicate::str::contains("Supplier id is empty"))
        .stdout(predicate::str::contains("email_address must be an email address"));

    assert_eq!(company_name(&env.db_path(), 42), "Acme Co");
    assert_eq!(company_name(&env.db_path(), 43), "Beta");
}

#[test]
fn test_check_writes_nothing() {
    let env = Env::new();
    let conn = env.init();
    add_supplier(&conn, 42, "Old Co");
    drop(conn);

    let mut bad = acme("42");
    bad[33] = "ABCD 123".to_string();
    let csv = env.write_csv("updates.csv", &[acme("42"), bad]);

    env.cmd()
        .arg("check")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 2 rows would be rejected"))
        .stdout(predicate::str::contains("swift_code must not contain whitespace"));

    assert_eq!(company_name(&env.db_path(), 42), "Old Co");
}

#[test]
fn test_range_flag_limits_rows() {
    let env = Env::new();
    let conn = env.init();
    add_supplier(&conn, 42, "Old Co");
    add_supplier(&conn, 43, "Beta");
    drop(conn);

    let csv = env.write_csv("updates.csv", &[acme("42"), acme("43")]);
    env.cmd()
        .args(["sync", "--range", "A3:AJ3"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rows: 1 applied"))
        .stdout(predicate::str::contains("Bank accounts: 1 inserted, 0 updated"));

    assert_eq!(company_name(&env.db_path(), 42), "Acme Co");
    assert_eq!(company_name(&env.db_path(), 43), "Beta");
}

#[test]
fn test_config_file_is_read() {
    let env = Env::new();
    let config = env.dir.path().join("settings.json");
    std::fs::write(&config, r#"{"range": "B2:C"}"#).unwrap();
    env.cmd()
        .args(["--config"])
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Range:        B2:C"));
}

#[test]
fn test_missing_config_file_fails() {
    let env = Env::new();
    env.cmd()
        .args(["--config", "nope.json", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn test_unsupported_source_fails() {
    let env = Env::new();
    env.init();
    let path = env.dir.path().join("updates.pdf");
    std::fs::write(&path, "").unwrap();
    env.cmd()
        .arg("sync")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported source file"));
}
