use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::{PfennigError, Result};
use crate::hasher::content_id;
use crate::models::{Column, ColumnType, Transaction};

/// The single schema version this build reads and writes. Anything else in an
/// existing store is a fatal configuration error.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
BEGIN;
CREATE TABLE schema_version (version INTEGER NOT NULL);
INSERT INTO schema_version (version) VALUES (1);
CREATE TABLE transactions (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    sender_account TEXT,
    receiver_account TEXT,
    text TEXT NOT NULL,
    amount REAL NOT NULL,
    total_balance REAL NOT NULL,
    currency TEXT,
    category TEXT,
    tags TEXT,
    origin TEXT
);
CREATE INDEX idx_transactions_date ON transactions (date);
COMMIT;
";

const COLUMN_LIST: &str = "id, date, sender_account, receiver_account, text, amount, \
                           total_balance, currency, category, tags, origin";

fn exists_table(conn: &Connection, table_name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(count == 1)
}

fn exists_temp_table(conn: &Connection, table_name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_temp_master WHERE type = 'table' AND name = ?1",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(count == 1)
}

/// Column definitions for a table mirroring the canonical schema, derived
/// from the canonical column list so the two cannot drift apart.
fn column_definitions() -> String {
    Column::ALL
        .iter()
        .map(|column| {
            let sql_type = match column.column_type() {
                ColumnType::Number => "REAL",
                ColumnType::Date | ColumnType::Text => "TEXT",
            };
            format!("{} {}", column.name(), sql_type)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Connection-scoped staging table, dropped again on every exit path.
///
/// Naming retries with the next candidate when a concurrently staged table
/// already took the name.
struct StageTable<'conn> {
    conn: &'conn Connection,
    name: String,
}

impl<'conn> StageTable<'conn> {
    fn create(conn: &'conn Connection) -> Result<StageTable<'conn>> {
        let mut i = 0;
        loop {
            let name = format!("stage_tx_{i}");
            if exists_temp_table(conn, &name)? {
                i += 1;
                continue;
            }
            let sql = format!("CREATE TEMPORARY TABLE {} ({})", name, column_definitions());
            conn.execute(&sql, [])?;
            return Ok(StageTable { conn, name });
        }
    }
}

impl Drop for StageTable<'_> {
    fn drop(&mut self) {
        let _ = self
            .conn
            .execute(&format!("DROP TABLE IF EXISTS temp.{}", self.name), []);
    }
}

/// Persistent, deduplicated transaction store backed by SQLite.
///
/// Single writer at a time is assumed; concurrent writers on the same file
/// are unsupported. Concurrent readers are fine.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (and on first use initializes) the store at `db_path`. Schema
    /// creation is atomic and repeat opens verify the recorded version.
    pub fn open(db_path: &Path) -> Result<Store> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        if exists_table(&self.conn, "schema_version")? {
            let version: i64 =
                self.conn
                    .query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;
            if version != SCHEMA_VERSION {
                return Err(PfennigError::Config(format!(
                    "store has schema version {version}, this build supports {SCHEMA_VERSION}"
                )));
            }
            return Ok(());
        }
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Appends a record set, skipping every row whose content id is already
    /// persisted. Returns the newly inserted subset in input order; appending
    /// the same set again is a no-op returning an empty vector.
    ///
    /// Rows are staged into a temp table first and merged in one transaction,
    /// so a failure mid-append leaves the persisted table untouched.
    pub fn append(&self, records: &[Transaction]) -> Result<Vec<Transaction>> {
        let rows = assign_ids(records)?;

        let stage = StageTable::create(&self.conn)?;
        {
            let sql = format!(
                "INSERT INTO temp.{} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                stage.name, COLUMN_LIST
            );
            let mut stmt = self.conn.prepare(&sql)?;
            for tx in &rows {
                stmt.execute(rusqlite::params![
                    tx.id,
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.sender_account,
                    tx.receiver_account,
                    tx.text,
                    tx.amount,
                    tx.total_balance,
                    tx.currency,
                    tx.category,
                    tx.tags,
                    tx.origin,
                ])?;
            }
        }

        let txn = self.conn.unchecked_transaction()?;
        let mut new_ids: HashSet<String> = HashSet::new();
        {
            let sql = format!(
                "SELECT DISTINCT id FROM temp.{} \
                 WHERE id NOT IN (SELECT id FROM transactions)",
                stage.name
            );
            let mut stmt = txn.prepare(&sql)?;
            let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for id in ids {
                new_ids.insert(id?);
            }
        }
        txn.execute(
            &format!(
                "INSERT INTO transactions ({COLUMN_LIST}) \
                 SELECT {COLUMN_LIST} FROM temp.{} \
                 WHERE id NOT IN (SELECT id FROM transactions) \
                 GROUP BY id",
                stage.name
            ),
            [],
        )?;
        txn.commit()?;
        drop(stage);

        // First occurrence per new id, preserving input order.
        let mut reported: HashSet<String> = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|tx| match &tx.id {
                Some(id) => new_ids.contains(id) && reported.insert(id.clone()),
                None => false,
            })
            .collect())
    }

    /// Loads every persisted row, newest date first.
    pub fn load(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMN_LIST} FROM transactions ORDER BY date DESC"
        ))?;
        let rows = stmt.query_map([], |row| {
            let date_raw: String = row.get(1)?;
            let date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(Transaction {
                id: Some(row.get(0)?),
                date,
                sender_account: row.get(2)?,
                receiver_account: row.get(3)?,
                text: row.get(4)?,
                amount: row.get(5)?,
                total_balance: row.get(6)?,
                currency: row.get(7)?,
                category: row.get(8)?,
                tags: row.get(9)?,
                origin: row.get(10)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Number of persisted transactions.
    #[cfg(test)]
    fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT count(*) FROM transactions", [], |row| row.get(0))
            .map_err(Into::into)
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Gives every record its content id. A pre-assigned id that disagrees with
/// the recomputed hash means the batch was tampered with or corrupted and is
/// rejected before anything is staged.
fn assign_ids(records: &[Transaction]) -> Result<Vec<Transaction>> {
    records
        .iter()
        .map(|tx| {
            let hash = content_id(tx);
            if let Some(existing) = &tx.id {
                if *existing != hash {
                    return Err(PfennigError::Validation(format!(
                        "record id '{existing}' does not match its content hash '{hash}'"
                    )));
                }
            }
            let mut owned = tx.clone();
            owned.id = Some(hash);
            Ok(owned)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn tx(date: &str, text: &str, amount: f64, balance: f64) -> Transaction {
        Transaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            sender_account: Some("DE12345678901234567890".to_string()),
            receiver_account: None,
            text: text.to_string(),
            amount,
            total_balance: balance,
            currency: Some("EUR".to_string()),
            category: None,
            tags: None,
            origin: Some("dkb-cash".to_string()),
            id: None,
        }
    }

    fn sample_records() -> Vec<Transaction> {
        vec![
            tx("2019-01-28", "Einkauf Januar", -12.16, 1248.54),
            tx("2019-01-20", "Gehalt", 120.0, 1260.70),
            tx("2019-01-05", "Abschlag Strom", -10.0, 1140.70),
        ]
    }

    #[test]
    fn test_open_creates_schema_and_version_row() {
        let (_dir, store) = test_store();
        assert!(exists_table(store.connection(), "schema_version").unwrap());
        assert!(exists_table(store.connection(), "transactions").unwrap());
        let version: i64 = store
            .connection()
            .query_row("SELECT version FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_does_not_recreate_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        drop(Store::open(&path).unwrap());
        let store = Store::open(&path).unwrap();
        let rows: i64 = store
            .connection()
            .query_row("SELECT count(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_version_mismatch_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .connection()
                .execute("UPDATE schema_version SET version = 99", [])
                .unwrap();
        }
        match Store::open(&path) {
            Err(PfennigError::Config(msg)) => assert!(msg.contains("99"), "{msg}"),
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_append_returns_all_rows_with_ids_on_first_call() {
        let (_dir, store) = test_store();
        let new_rows = store.append(&sample_records()).unwrap();
        assert_eq!(new_rows.len(), 3);
        for row in &new_rows {
            let id = row.id.as_deref().unwrap();
            assert_eq!(id.len(), 32);
        }
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_append_twice_is_idempotent() {
        let (_dir, store) = test_store();
        store.append(&sample_records()).unwrap();
        let second = store.append(&sample_records()).unwrap();
        assert!(second.is_empty());
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_append_skips_only_the_overlapping_rows() {
        let (_dir, store) = test_store();
        store.append(&sample_records()).unwrap();

        let next_month = vec![
            tx("2019-02-27", "Miete Februar", -460.0, 800.70),
            tx("2019-01-28", "Einkauf Januar", -12.16, 1248.54), // overlap
        ];
        let new_rows = store.append(&next_month).unwrap();
        assert_eq!(new_rows.len(), 1);
        assert_eq!(new_rows[0].text, "Miete Februar");
        assert_eq!(store.count().unwrap(), 4);
    }

    #[test]
    fn test_append_load_round_trip() {
        let (_dir, store) = test_store();
        let input = sample_records();
        store.append(&input).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), input.len());

        for tx_in in &input {
            let tx_out = loaded
                .iter()
                .find(|t| t.text == tx_in.text)
                .unwrap_or_else(|| panic!("row '{}' missing after round trip", tx_in.text));
            assert_eq!(tx_out.date, tx_in.date);
            assert_eq!(tx_out.sender_account, tx_in.sender_account);
            assert_eq!(tx_out.receiver_account, tx_in.receiver_account);
            assert_eq!(tx_out.amount, tx_in.amount);
            assert_eq!(tx_out.total_balance, tx_in.total_balance);
            assert_eq!(tx_out.currency, tx_in.currency);
            assert_eq!(tx_out.origin, tx_in.origin);
            assert!(!tx_out.id.as_deref().unwrap_or("").is_empty());
        }
    }

    #[test]
    fn test_loaded_rows_can_be_appended_again_as_a_noop() {
        let (_dir, store) = test_store();
        store.append(&sample_records()).unwrap();
        let loaded = store.load().unwrap();
        let again = store.append(&loaded).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_mismatched_id_is_a_validation_error_and_writes_nothing() {
        let (_dir, store) = test_store();
        let mut records = sample_records();
        records[1].id = Some("0000000000000000".to_string());
        assert!(matches!(
            store.append(&records),
            Err(PfennigError::Validation(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_in_batch_duplicates_collapse_to_one_row() {
        let (_dir, store) = test_store();
        let records = vec![
            tx("2019-01-28", "Einkauf Januar", -12.16, 1248.54),
            tx("2019-01-28", "Einkauf Januar", -12.16, 1248.54),
        ];
        let new_rows = store.append(&records).unwrap();
        assert_eq!(new_rows.len(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_empty_append_is_a_noop() {
        let (_dir, store) = test_store();
        let new_rows = store.append(&[]).unwrap();
        assert!(new_rows.is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_stage_table_is_dropped_after_append() {
        let (_dir, store) = test_store();
        store.append(&sample_records()).unwrap();
        // the name the first append used must be free again
        let count = store
            .connection()
            .query_row(
                "SELECT count(*) FROM sqlite_temp_master WHERE name = 'stage_tx_0'",
                [],
                |r| r.get::<_, i64>(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_stage_table_retries_taken_names() {
        let (_dir, store) = test_store();
        store
            .connection()
            .execute("CREATE TEMPORARY TABLE stage_tx_0 (id TEXT)", [])
            .unwrap();
        store
            .connection()
            .execute("CREATE TEMPORARY TABLE stage_tx_1 (id TEXT)", [])
            .unwrap();
        let stage = StageTable::create(store.connection()).unwrap();
        assert_eq!(stage.name, "stage_tx_2");
    }

    #[test]
    fn test_stage_table_guard_drops_the_table() {
        let (_dir, store) = test_store();
        let name;
        {
            let stage = StageTable::create(store.connection()).unwrap();
            name = stage.name.clone();
            let count: i64 = store
                .connection()
                .query_row(
                    "SELECT count(*) FROM sqlite_temp_master WHERE name = ?1",
                    [&name],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1);
        }
        let count: i64 = store
            .connection()
            .query_row(
                "SELECT count(*) FROM sqlite_temp_master WHERE name = ?1",
                [&name],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
