//! SQLite-backed case repository.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{
    Address, Case, CaseError, CaseFile, CaseStage, CaseStatus, CaseStore, CaseTransaction,
    Clinic, CreateCaseRequest, FileLabel, NewCaseFile, NewStatusEvent, Patient, Shipment,
    StatusEvent, StoreError, TransactionWork,
};
use crate::money::Money;

const CASE_COLUMNS: &str = "id, clinic_id, doctor_id, designer_id, sales_rep_id, \
    patient_first_name, patient_last_name, patient_alias, shade, product, material, units, \
    status, stage, cost, shipping_batch_id, shipping_carrier, tracking_number, shipping_cost, \
    created_at, updated_at, designed_at, milled_at, shipped_at";

const FILE_COLUMNS: &str =
    "id, case_id, label, kind, storage_key, file_name, size_bytes, created_at";

/// SQLite-backed case store.
pub struct SqliteCaseStore {
    conn: Mutex<Connection>,
}

impl SqliteCaseStore {
    /// Create a new SQLite case store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite case store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS clinics (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                street TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                zip_code TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cases (
                id TEXT PRIMARY KEY,
                clinic_id TEXT NOT NULL REFERENCES clinics(id),
                doctor_id TEXT NOT NULL,
                designer_id TEXT,
                sales_rep_id TEXT,
                patient_first_name TEXT NOT NULL,
                patient_last_name TEXT NOT NULL,
                patient_alias TEXT NOT NULL,
                shade TEXT NOT NULL,
                product TEXT NOT NULL,
                material TEXT NOT NULL,
                units INTEGER NOT NULL CHECK (units > 0),
                status TEXT NOT NULL,
                stage TEXT NOT NULL,
                cost TEXT NOT NULL,
                shipping_batch_id TEXT,
                shipping_carrier TEXT,
                tracking_number TEXT,
                shipping_cost TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                designed_at TEXT,
                milled_at TEXT,
                shipped_at TEXT,
                CHECK (
                    (shipping_batch_id IS NULL AND shipping_carrier IS NULL
                        AND tracking_number IS NULL AND shipping_cost IS NULL)
                    OR (shipping_batch_id IS NOT NULL AND shipping_carrier IS NOT NULL
                        AND tracking_number IS NOT NULL AND shipped_at IS NOT NULL)
                )
            );

            CREATE INDEX IF NOT EXISTS idx_cases_clinic_id ON cases(clinic_id);
            CREATE INDEX IF NOT EXISTS idx_cases_shipping_batch_id ON cases(shipping_batch_id);

            CREATE TABLE IF NOT EXISTS case_files (
                id TEXT PRIMARY KEY,
                case_id TEXT NOT NULL REFERENCES cases(id),
                label TEXT NOT NULL,
                kind TEXT NOT NULL,
                storage_key TEXT NOT NULL,
                file_name TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                retired_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_case_files_case_id ON case_files(case_id);

            CREATE TABLE IF NOT EXISTS status_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                case_id TEXT NOT NULL REFERENCES cases(id),
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                note TEXT,
                actor_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_status_events_case_id ON status_events(case_id);

            CREATE TRIGGER IF NOT EXISTS status_events_no_update
            BEFORE UPDATE ON status_events
            BEGIN
                SELECT RAISE(ABORT, 'status events are append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS status_events_no_delete
            BEFORE DELETE ON status_events
            BEGIN
                SELECT RAISE(ABORT, 'status events are append-only');
            END;
            "#,
        )?;

        // One live file per replace slot
        let slot_labels = FileLabel::ALL
            .iter()
            .filter(|label| label.is_replace_slot())
            .map(|label| format!("'{}'", label.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_case_files_live_slot \
             ON case_files(case_id, label) \
             WHERE retired_at IS NULL AND label IN ({});",
            slot_labels
        ))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn conversion_error<E>(idx: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(error))
}

fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn parse_optional_column<T>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| t.parse::<T>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn row_to_case(row: &Row) -> rusqlite::Result<Case> {
    let batch_id: Option<String> = row.get(15)?;
    let carrier: Option<String> = row.get(16)?;
    let tracking_number: Option<String> = row.get(17)?;
    let shipping_cost: Option<Money> = parse_optional_column(row, 18)?;

    let shipment = match (batch_id, carrier, tracking_number) {
        (Some(batch_id), Some(carrier), Some(tracking_number)) => Some(Shipment {
            batch_id,
            carrier,
            tracking_number,
            cost: shipping_cost,
        }),
        _ => None,
    };

    Ok(Case {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        doctor_id: row.get(2)?,
        designer_id: row.get(3)?,
        sales_rep_id: row.get(4)?,
        patient: Patient {
            first_name: row.get(5)?,
            last_name: row.get(6)?,
            alias: row.get(7)?,
        },
        shade: row.get(8)?,
        product: parse_column(row, 9)?,
        material: parse_column(row, 10)?,
        units: row.get(11)?,
        status: parse_column(row, 12)?,
        stage: parse_column(row, 13)?,
        cost: parse_column(row, 14)?,
        shipment,
        created_at: parse_column(row, 19)?,
        updated_at: parse_column(row, 20)?,
        designed_at: parse_optional_column(row, 21)?,
        milled_at: parse_optional_column(row, 22)?,
        shipped_at: parse_optional_column(row, 23)?,
    })
}

fn row_to_file(row: &Row) -> rusqlite::Result<CaseFile> {
    let size: i64 = row.get(6)?;
    Ok(CaseFile {
        id: row.get(0)?,
        case_id: row.get(1)?,
        label: parse_column(row, 2)?,
        kind: row.get(3)?,
        key: row.get(4)?,
        file_name: row.get(5)?,
        size_bytes: size.max(0) as u64,
        created_at: parse_column(row, 7)?,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<StatusEvent> {
    Ok(StatusEvent {
        id: row.get(0)?,
        case_id: row.get(1)?,
        from: parse_column(row, 2)?,
        to: parse_column(row, 3)?,
        note: row.get(4)?,
        actor_id: row.get(5)?,
        created_at: parse_column(row, 6)?,
    })
}

fn rfc3339(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

// ============================================================================
// Queries shared by the store and its transactions
// ============================================================================

fn fetch_case(conn: &Connection, id: &str) -> Result<Option<Case>, StoreError> {
    let sql = format!("SELECT {} FROM cases WHERE id = ?", CASE_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_case).optional()?)
}

fn fetch_files(conn: &Connection, case_id: &str) -> Result<Vec<CaseFile>, StoreError> {
    let sql = format!(
        "SELECT {} FROM case_files WHERE case_id = ? AND retired_at IS NULL ORDER BY created_at ASC, rowid ASC",
        FILE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![case_id], row_to_file)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn write_case(conn: &Connection, case: &Case) -> Result<(), StoreError> {
    let shipment = case.shipment.as_ref();
    let updated = conn.execute(
        "UPDATE cases SET designer_id = ?, status = ?, stage = ?, cost = ?, \
         shipping_batch_id = ?, shipping_carrier = ?, tracking_number = ?, shipping_cost = ?, \
         updated_at = ?, designed_at = ?, milled_at = ?, shipped_at = ? WHERE id = ?",
        params![
            case.designer_id,
            case.status.as_str(),
            case.stage.as_str(),
            case.cost.to_string(),
            shipment.map(|s| s.batch_id.as_str()),
            shipment.map(|s| s.carrier.as_str()),
            shipment.map(|s| s.tracking_number.as_str()),
            shipment.and_then(|s| s.cost).map(|c| c.to_string()),
            case.updated_at.to_rfc3339(),
            rfc3339(case.designed_at),
            rfc3339(case.milled_at),
            rfc3339(case.shipped_at),
            case.id,
        ],
    )?;

    if updated == 0 {
        return Err(StoreError::Database(format!(
            "Case {} does not exist",
            case.id
        )));
    }
    Ok(())
}

fn write_status_event(
    conn: &Connection,
    event: &NewStatusEvent,
) -> Result<StatusEvent, StoreError> {
    conn.execute(
        "INSERT INTO status_events (case_id, from_status, to_status, note, actor_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            event.case_id,
            event.from.as_str(),
            event.to.as_str(),
            event.note,
            event.actor_id,
            event.created_at.to_rfc3339(),
        ],
    )?;

    Ok(StatusEvent {
        id: conn.last_insert_rowid(),
        case_id: event.case_id.clone(),
        from: event.from,
        to: event.to,
        note: event.note.clone(),
        actor_id: event.actor_id.clone(),
        created_at: event.created_at,
    })
}

// ============================================================================
// Transactions
// ============================================================================

struct SqliteCaseTransaction<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

impl CaseTransaction for SqliteCaseTransaction<'_> {
    fn get_case(&mut self, id: &str) -> Result<Option<Case>, StoreError> {
        fetch_case(self.tx, id)
    }

    fn list_files(&mut self, case_id: &str) -> Result<Vec<CaseFile>, StoreError> {
        fetch_files(self.tx, case_id)
    }

    fn update_case(&mut self, case: &Case) -> Result<(), StoreError> {
        write_case(self.tx, case)
    }

    fn insert_status_event(&mut self, event: &NewStatusEvent) -> Result<StatusEvent, StoreError> {
        write_status_event(self.tx, event)
    }
}

impl CaseStore for SqliteCaseStore {
    fn get_case(&self, id: &str) -> Result<Option<Case>, StoreError> {
        let conn = self.lock()?;
        fetch_case(&conn, id)
    }

    fn get_cases_by_ids(&self, ids: &[String]) -> Result<Vec<Case>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM cases WHERE id IN ({})",
            CASE_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), row_to_case)?;

        let mut by_id: HashMap<String, Case> = HashMap::new();
        for row in rows {
            let case = row?;
            by_id.insert(case.id.clone(), case);
        }

        // Preserve the caller's order
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn find_cases_by_batch(&self, batch_id: &str) -> Result<Vec<Case>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM cases WHERE shipping_batch_id = ? ORDER BY created_at ASC, id ASC",
            CASE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![batch_id], row_to_case)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_clinic(&self, id: &str) -> Result<Option<Clinic>, StoreError> {
        let conn = self.lock()?;
        let clinic = conn
            .query_row(
                "SELECT id, name, street, city, state, zip_code FROM clinics WHERE id = ?",
                params![id],
                |row| {
                    Ok(Clinic {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        address: Address {
                            street: row.get(2)?,
                            city: row.get(3)?,
                            state: row.get(4)?,
                            zip_code: row.get(5)?,
                        },
                    })
                },
            )
            .optional()?;
        Ok(clinic)
    }

    fn list_files(&self, case_id: &str) -> Result<Vec<CaseFile>, StoreError> {
        let conn = self.lock()?;
        fetch_files(&conn, case_id)
    }

    fn list_status_events(&self, case_id: &str) -> Result<Vec<StatusEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, case_id, from_status, to_status, note, actor_id, created_at \
             FROM status_events WHERE case_id = ? ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![case_id], row_to_event)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_clinic(&self, clinic: &Clinic) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO clinics (id, name, street, city, state, zip_code) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                clinic.id,
                clinic.name,
                clinic.address.street,
                clinic.address.city,
                clinic.address.state,
                clinic.address.zip_code,
            ],
        )?;
        Ok(())
    }

    fn insert_case(&self, request: CreateCaseRequest) -> Result<Case, StoreError> {
        let conn = self.lock()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = CaseStatus::InDesign;
        let stage = CaseStage::Design;

        conn.execute(
            "INSERT INTO cases (id, clinic_id, doctor_id, designer_id, sales_rep_id, \
             patient_first_name, patient_last_name, patient_alias, shade, product, material, \
             units, status, stage, cost, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.clinic_id,
                request.doctor_id,
                request.designer_id,
                request.sales_rep_id,
                request.patient.first_name,
                request.patient.last_name,
                request.patient.alias,
                request.shade,
                request.product.as_str(),
                request.material.as_str(),
                request.units,
                status.as_str(),
                stage.as_str(),
                request.cost.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(Case {
            id,
            clinic_id: request.clinic_id,
            doctor_id: request.doctor_id,
            designer_id: request.designer_id,
            sales_rep_id: request.sales_rep_id,
            patient: request.patient,
            shade: request.shade,
            product: request.product,
            material: request.material,
            units: request.units,
            status,
            stage,
            cost: request.cost,
            shipment: None,
            created_at: now,
            updated_at: now,
            designed_at: None,
            milled_at: None,
            shipped_at: None,
        })
    }

    fn replace_file(&self, file: NewCaseFile) -> Result<CaseFile, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let now = Utc::now();
        if file.label.is_replace_slot() {
            tx.execute(
                "UPDATE case_files SET retired_at = ? \
                 WHERE case_id = ? AND label = ? AND retired_at IS NULL",
                params![now.to_rfc3339(), file.case_id, file.label.as_str()],
            )?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO case_files (id, case_id, label, kind, storage_key, file_name, size_bytes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                file.case_id,
                file.label.as_str(),
                file.kind,
                file.key,
                file.file_name,
                file.size_bytes as i64,
                now.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        Ok(CaseFile {
            id,
            case_id: file.case_id,
            label: file.label,
            kind: file.kind,
            key: file.key,
            file_name: file.file_name,
            size_bytes: file.size_bytes,
            created_at: now,
        })
    }

    fn with_transaction(&self, work: TransactionWork<'_>) -> Result<(), CaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::from)?;

        {
            let mut handle = SqliteCaseTransaction { tx: &tx };
            // Dropping `tx` without commit rolls everything back
            work(&mut handle)?;
        }

        tx.commit().map_err(StoreError::from)?;
        Ok(())
    }
}
