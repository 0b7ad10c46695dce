// Store Gateway - Employee Documents
// Append-style document store on SQLite: every write gets its own key

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::models::{Employee, EmployeeDocument};

// ============================================================================
// GATEWAY TRAIT
// ============================================================================

/// EmployeeStore - the operations the service needs from a document store
///
/// Keys are assigned by the store and are unrelated to the `id` found in
/// the dump; two employees with the same `id` get two distinct keys.
pub trait EmployeeStore {
    /// Append an employee as a new child record, returning its storage key
    fn push(&mut self, employee: &Employee) -> Result<String>;

    /// Read one record by storage key
    fn get(&self, key: &str) -> Result<Option<StoredRecord>>;

    /// Read every readable record, in the order they were written
    fn all(&self) -> Result<Vec<StoredRecord>>;
}

/// A document together with its storage key
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: String,
    pub stored_at: DateTime<Utc>,
    pub document: EmployeeDocument,
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Event for the import audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_key: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, entity_key: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_key: entity_key.to_string(),
            data,
        }
    }
}

// ============================================================================
// SQLITE IMPLEMENTATION
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Store a raw JSON document under a caller-chosen key.
    ///
    /// Used for documents written by other clients of the store, whose
    /// shape may differ from what `push` produces.
    pub fn insert_document(&mut self, key: &str, document: &serde_json::Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO employees (key, document, stored_at) VALUES (?1, ?2, ?3)",
            params![key, serde_json::to_string(document)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Audit events recorded for one storage key, oldest first
    pub fn events_for(&self, key: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_key, data
             FROM events
             WHERE entity_key = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt
            .query_map([key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(event_id, timestamp, event_type, entity_key, data)| {
                Ok(Event {
                    event_id,
                    timestamp: parse_timestamp(&timestamp)?,
                    event_type,
                    entity_key,
                    data: serde_json::from_str(&data)
                        .context("Failed to decode event data")?,
                })
            })
            .collect()
    }
}

impl EmployeeStore for SqliteStore {
    fn push(&mut self, employee: &Employee) -> Result<String> {
        let key = uuid::Uuid::new_v4().to_string();
        let document = serde_json::to_string(employee).context("Failed to encode employee")?;

        let event = Event::new(
            "employee_imported",
            &key,
            serde_json::json!({
                "id": employee.id,
                "statements": employee.statements.len(),
            }),
        );

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO employees (key, document, stored_at) VALUES (?1, ?2, ?3)",
            params![key, document, Utc::now().to_rfc3339()],
        )?;
        insert_event(&tx, &event)?;
        tx.commit()?;

        debug!(key = %key, employee_id = employee.id_or_empty(), "stored employee");
        Ok(key)
    }

    fn get(&self, key: &str) -> Result<Option<StoredRecord>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT key, document, stored_at FROM employees WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(decode_record).transpose()
    }

    fn all(&self) -> Result<Vec<StoredRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, document, stored_at FROM employees ORDER BY seq ASC")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<(String, String, String)>, _>>()?;

        // One foreign document must not hide every other employee
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.0.clone();
            match decode_record(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key = %key, "Skipping undecodable employee document: {:#}", e),
            }
        }

        Ok(records)
    }
}

/// Insert event into the audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, entity_key, data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_key,
            serde_json::to_string(&event.data)?,
        ],
    )?;
    Ok(())
}

fn decode_record((key, document, stored_at): (String, String, String)) -> Result<StoredRecord> {
    let document: EmployeeDocument = serde_json::from_str(&document)
        .with_context(|| format!("Failed to decode employee document {}", key))?;

    Ok(StoredRecord {
        stored_at: parse_timestamp(&stored_at)?,
        key,
        document,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid timestamp {:?}: {}", value, e))
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (no-op for in-memory databases)
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // seq keeps insertion order independent of the random keys
    conn.execute(
        "CREATE TABLE IF NOT EXISTS employees (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT UNIQUE NOT NULL,
            document TEXT NOT NULL,
            stored_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_key TEXT NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_key)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, Statement, StatementsField};
    use crate::parser::parse_str;

    fn create_test_employee(id: &str, amounts: &[f64]) -> Employee {
        Employee {
            id: Some(id.to_string()),
            name: Some(format!("Employee {}", id)),
            department: Department {
                id: Some("D1".to_string()),
                name: Some("Dept".to_string()),
            },
            statements: amounts
                .iter()
                .enumerate()
                .map(|(i, amount)| Statement {
                    id: Some(format!("S{}", i)),
                    amount: Some(*amount),
                    date: Some("2020-01-01".to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_push_then_get() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let employee = create_test_employee("42", &[10.0, 20.0]);

        let key = store.push(&employee).unwrap();
        let record = store.get(&key).unwrap().expect("record should exist");

        assert_eq!(record.key, key);
        assert_eq!(record.document.clone().into_employee(), employee);
        assert!(matches!(
            record.document.statements,
            Some(StatementsField::Sequence(_))
        ));
    }

    #[test]
    fn test_store_key_is_not_employee_id() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let employee = create_test_employee("1", &[]);

        let first = store.push(&employee).unwrap();
        let second = store.push(&employee).unwrap();

        assert_ne!(first, "1");
        assert_ne!(first, second);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_parsed_id_survives_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let employees = parse_str("Employee\nid: 00117\nname: A\n");

        let key = store.push(&employees[0]).unwrap();
        let record = store.get(&key).unwrap().unwrap();

        assert_eq!(record.document.id.as_deref(), Some("00117"));
    }

    #[test]
    fn test_get_missing_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let keys: Vec<String> = ["3", "1", "2"]
            .iter()
            .map(|id| store.push(&create_test_employee(id, &[1.0])).unwrap())
            .collect();

        let records = store.all().unwrap();
        let stored_keys: Vec<String> = records.iter().map(|r| r.key.clone()).collect();
        let ids: Vec<&str> = records
            .iter()
            .map(|r| r.document.id.as_deref().unwrap())
            .collect();

        assert_eq!(stored_keys, keys);
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_insert_keyed_document() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_document(
                "legacy",
                &serde_json::json!({
                    "id": "9",
                    "statements": {"1": {"id": "B", "amount": 2}, "0": {"id": "A", "amount": 1}}
                }),
            )
            .unwrap();

        let record = store.get("legacy").unwrap().unwrap();
        let employee = record.document.into_employee();
        assert_eq!(employee.statements[0].id.as_deref(), Some("A"));
        assert_eq!(employee.statements[1].id.as_deref(), Some("B"));
    }

    #[test]
    fn test_all_skips_undecodable_documents() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = store.push(&create_test_employee("1", &[150.0])).unwrap();
        store
            .insert_document("scalar", &serde_json::json!("not an employee"))
            .unwrap();
        let numeric = serde_json::json!({"id": 5, "statements": [{"amount": 250}]});
        store.insert_document("numeric", &numeric).unwrap();

        let records = store.all().unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();

        assert_eq!(keys, vec![first.as_str(), "numeric"]);
        assert_eq!(records[1].document.id.as_deref(), Some("5"));
        assert!(store.get("scalar").is_err());
    }

    #[test]
    fn test_push_logs_audit_event() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let key = store.push(&create_test_employee("5", &[1.0, 2.0])).unwrap();

        let events = store.events_for(&key).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "employee_imported");
        assert_eq!(events[0].data["id"], "5");
        assert_eq!(events[0].data["statements"], 2);
    }
}
