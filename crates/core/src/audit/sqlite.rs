use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use super::{AuditError, AuditEvent, AuditPage, AuditQuery, AuditRecord, AuditStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor_id TEXT,
    event TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_event_cases (
    event_id INTEGER NOT NULL REFERENCES audit_events(id),
    case_id TEXT NOT NULL,
    PRIMARY KEY (event_id, case_id)
);

CREATE INDEX IF NOT EXISTS idx_audit_events_recorded_at ON audit_events(recorded_at);
CREATE INDEX IF NOT EXISTS idx_audit_events_type ON audit_events(event_type);
CREATE INDEX IF NOT EXISTS idx_audit_events_actor ON audit_events(actor_id);
CREATE INDEX IF NOT EXISTS idx_audit_event_cases_case ON audit_event_cases(case_id);
"#;

impl From<rusqlite::Error> for AuditError {
    fn from(e: rusqlite::Error) -> Self {
        AuditError::Database(e.to_string())
    }
}

/// Audit trail in SQLite. Each event also gets one index row per case it touches.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        Self::open(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, AuditError> {
        Self::open(Connection::open_in_memory()?)
    }

    fn open(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("connection lock poisoned".to_string()))
    }
}

/// Fixed-width UTC timestamps so text order is time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn where_clause(query: &AuditQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(case_id) = &query.case_id {
        clauses.push("id IN (SELECT event_id FROM audit_event_cases WHERE case_id = ?)");
        values.push(Value::Text(case_id.clone()));
    }
    if let Some(event_type) = &query.event_type {
        clauses.push("event_type = ?");
        values.push(Value::Text(event_type.clone()));
    }
    if let Some(actor_id) = &query.actor_id {
        clauses.push("actor_id = ?");
        values.push(Value::Text(actor_id.clone()));
    }
    if let Some(since) = &query.since {
        clauses.push("recorded_at >= ?");
        values.push(Value::Text(timestamp(since)));
    }
    if let Some(until) = &query.until {
        clauses.push("recorded_at <= ?");
        values.push(Value::Text(timestamp(until)));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn decode(id: i64, recorded_at: &str, event: &str) -> Result<AuditRecord, AuditError> {
    let recorded_at = DateTime::parse_from_rfc3339(recorded_at)
        .map_err(|e| AuditError::Serialization(format!("bad timestamp on event {}: {}", id, e)))?
        .with_timezone(&Utc);
    let event: AuditEvent =
        serde_json::from_str(event).map_err(|e| AuditError::Serialization(e.to_string()))?;
    Ok(AuditRecord::new(id, recorded_at, event))
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, event: &AuditEvent, recorded_at: DateTime<Utc>) -> Result<i64, AuditError> {
        let body =
            serde_json::to_string(event).map_err(|e| AuditError::Serialization(e.to_string()))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO audit_events (recorded_at, event_type, actor_id, event) VALUES (?1, ?2, ?3, ?4)",
            params![timestamp(&recorded_at), event.event_type(), event.actor_id(), body],
        )?;
        let id = tx.last_insert_rowid();
        for case_id in event.case_ids() {
            tx.execute(
                "INSERT OR IGNORE INTO audit_event_cases (event_id, case_id) VALUES (?1, ?2)",
                params![id, case_id],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    fn search(&self, query: &AuditQuery) -> Result<AuditPage, AuditError> {
        let (clause, mut values) = where_clause(query);
        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_events{}", clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(i64::from(query.limit)));
        values.push(Value::Integer(i64::from(query.offset)));
        let mut stmt = conn.prepare(&format!(
            "SELECT id, recorded_at, event FROM audit_events{} ORDER BY recorded_at DESC, id DESC LIMIT ? OFFSET ?",
            clause
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, recorded_at, event) = row?;
            records.push(decode(id, &recorded_at, &event)?);
        }

        Ok(AuditPage {
            records,
            total: total.max(0) as u64,
        })
    }
}
