use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::error::Result;

/// Ordered set of column assignments for a single record.
///
/// Only columns that were explicitly set take part in the generated SQL, so a
/// partial update never touches the other columns of the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    columns: Vec<(&'static str, Value)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column`, replacing any earlier value for the same column.
    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Set `column` only when a value is present.
    pub fn set_opt<T: Into<Value>>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(v) = value {
            self.set(column, v);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(c, _)| *c)
    }

    /// `UPDATE <table> SET a = ?1, b = ?2 WHERE <key> = ?3`, or `None` when
    /// there is nothing to set.
    pub fn update_sql(&self, table: &str, key_column: &str) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let assignments: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("{c} = ?{}", i + 1))
            .collect();
        Some(format!(
            "UPDATE {table} SET {} WHERE {key_column} = ?{}",
            assignments.join(", "),
            self.columns.len() + 1
        ))
    }

    /// `INSERT INTO <table> (key, a, b) VALUES (?1, ?2, ?3)`. The key column is
    /// always present so the statement is never empty.
    pub fn insert_sql(&self, table: &str, key_column: &str) -> String {
        let mut names: Vec<&str> = vec![key_column];
        for column in self.columns() {
            names.push(column);
        }
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        )
    }

    fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, v)| v)
    }
}

/// Run a partial update keyed by `key`. Returns `None` without touching the
/// database when the change set is empty, otherwise the number of rows
/// affected.
pub fn apply_update(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: i64,
    changes: &ChangeSet,
) -> Result<Option<usize>> {
    let Some(sql) = changes.update_sql(table, key_column) else {
        return Ok(None);
    };
    let key = Value::Integer(key);
    let affected = conn.execute(&sql, params_from_iter(changes.values().chain(std::iter::once(&key))))?;
    Ok(Some(affected))
}

/// Insert a new row with `key_column = key` plus every column in `changes`.
/// Returns the new rowid.
pub fn apply_insert(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: i64,
    changes: &ChangeSet,
) -> Result<i64> {
    let sql = changes.insert_sql(table, key_column);
    let key = Value::Integer(key);
    conn.execute(&sql, params_from_iter(std::iter::once(&key).chain(changes.values())))?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_changeset_has_no_update() {
        let changes = ChangeSet::new();
        assert!(changes.is_empty());
        assert_eq!(changes.update_sql("suppliers", "id"), None);
    }

    #[test]
    fn test_update_sql_numbers_placeholders() {
        let mut changes = ChangeSet::new();
        changes.set("company_name", "Acme Co".to_string());
        changes.set("city", "Shenzhen".to_string());
        assert_eq!(
            changes.update_sql("suppliers", "id").as_deref(),
            Some("UPDATE suppliers SET company_name = ?1, city = ?2 WHERE id = ?3")
        );
    }

    #[test]
    fn test_insert_sql_always_has_key() {
        let changes = ChangeSet::new();
        assert_eq!(
            changes.insert_sql("bank_account_details", "supplier_id"),
            "INSERT INTO bank_account_details (supplier_id) VALUES (?1)"
        );
        let mut changes = ChangeSet::new();
        changes.set("bank_name", "Bank X".to_string());
        assert_eq!(
            changes.insert_sql("bank_account_details", "supplier_id"),
            "INSERT INTO bank_account_details (supplier_id, bank_name) VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_insert_sql_with_owned_names() {
        let table = String::from("supplier_details");
        let key = String::from("supplier_id");
        let mut changes = ChangeSet::new();
        changes.set("city", "Xiamen".to_string());
        changes.set("supplier_type", "Factory".to_string());
        assert_eq!(
            changes.insert_sql(&table, &key),
            "INSERT INTO supplier_details (supplier_id, city, supplier_type) VALUES (?1, ?2, ?3)"
        );
    }

    #[test]
    fn test_set_replaces_existing_column() {
        let mut changes = ChangeSet::new();
        changes.set("city", "A".to_string());
        changes.set("city", "B".to_string());
        assert_eq!(changes.columns().count(), 1);
        assert_eq!(changes.values().collect::<Vec<_>>(), vec![&Value::Text("B".into())]);
    }

    #[test]
    fn test_set_opt_skips_none() {
        let mut changes = ChangeSet::new();
        changes.set_opt::<i64>("paid_up_capital", None);
        changes.set_opt("branded_goods", Some(1i64));
        assert_eq!(changes.columns().collect::<Vec<_>>(), vec!["branded_goods"]);
    }

    #[test]
    fn test_apply_update_and_insert() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, k INTEGER, a TEXT, b TEXT)")
            .unwrap();

        let mut changes = ChangeSet::new();
        changes.set("a", "one".to_string());
        let rowid = apply_insert(&conn, "t", "k", 7, &changes).unwrap();
        assert_eq!(rowid, 1);

        let mut changes = ChangeSet::new();
        changes.set("b", "two".to_string());
        assert_eq!(apply_update(&conn, "t", "k", 7, &changes).unwrap(), Some(1));
        assert_eq!(apply_update(&conn, "t", "k", 8, &changes).unwrap(), Some(0));
        assert_eq!(apply_update(&conn, "t", "k", 7, &ChangeSet::new()).unwrap(), None);

        let (a, b): (String, String) = conn
            .query_row("SELECT a, b FROM t WHERE k = 7", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(a, "one");
        assert_eq!(b, "two");
    }
}
