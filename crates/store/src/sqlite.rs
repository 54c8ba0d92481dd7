//! SQLite-backed store
//!
//! Every operation opens its own connection on the blocking pool, so each
//! insert is an independent transaction and concurrent callers share no
//! connection state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::{
    parse_utc, Reading, ReadingStore, StoreError, MAX_DESCRIPTION_LEN, MAX_TYPE_LEN, MAX_UNIT_LEN,
};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument};

use crate::model::{NewReading, StoredReading};
use crate::query::{Page, ReadingFilter};

fn schema() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS sensor_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sensor_id INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            value REAL NOT NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            unit TEXT NOT NULL CHECK (length(unit) <= {MAX_UNIT_LEN}),
            type TEXT NOT NULL CHECK (length(type) <= {MAX_TYPE_LEN}),
            description TEXT NOT NULL CHECK (length(description) <= {MAX_DESCRIPTION_LEN})
        );
        CREATE INDEX IF NOT EXISTS idx_sensor_data_sensor_id ON sensor_data (sensor_id);
        CREATE INDEX IF NOT EXISTS idx_sensor_data_timestamp ON sensor_data (timestamp);"
    )
}

const COLUMNS: &str = "id, sensor_id, timestamp, value, lat, lng, unit, type, description";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed-width UTC text, so string order matches time order
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Handle to a SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database and its table
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = connect(&path)?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::connection("failed to enable WAL", e))?;
        conn.execute_batch(&schema())
            .map_err(|e| StoreError::connection("failed to create table", e))?;

        info!(path = %path.display(), "sqlite store opened");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows matching `filter`, ordered by id, within `page`
    pub async fn list(
        &self,
        filter: ReadingFilter,
        page: Page,
    ) -> Result<Vec<StoredReading>, StoreError> {
        self.with_connection(move |conn| {
            let (clause, mut values) = filter.to_sql();
            values.push((page.limit() as i64).into());
            values.push((page.skip() as i64).into());

            let sql = format!(
                "SELECT {COLUMNS} FROM sensor_data{clause} ORDER BY id LIMIT ? OFFSET ?"
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StoreError::query("failed to prepare list", e))?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), map_row)
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
                .map_err(|e| StoreError::query("failed to list readings", e))?;
            Ok(rows)
        })
        .await
    }

    /// Number of rows matching `filter`
    pub async fn count(&self, filter: ReadingFilter) -> Result<u64, StoreError> {
        self.with_connection(move |conn| {
            let (clause, values) = filter.to_sql();
            let sql = format!("SELECT COUNT(*) FROM sensor_data{clause}");
            let count: i64 = conn
                .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
                .map_err(|e| StoreError::query("failed to count readings", e))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<StoredReading, StoreError> {
        self.with_connection(move |conn| fetch(conn, id)).await
    }

    /// Insert one row and return it as stored
    #[instrument(name = "store_create", skip_all, fields(sensor_id = row.sensor_id))]
    pub async fn create(&self, row: NewReading) -> Result<StoredReading, StoreError> {
        row.validate()?;
        self.with_connection(move |conn| {
            let id = insert_row(conn, &row)
                .map_err(|e| StoreError::write("failed to insert reading", e))?;
            debug!(id, "reading created");
            fetch(conn, id)
        })
        .await
    }

    /// Replace every column of row `id`
    #[instrument(name = "store_update", skip(self, row))]
    pub async fn update(&self, id: i64, row: NewReading) -> Result<StoredReading, StoreError> {
        row.validate()?;
        self.with_connection(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE sensor_data SET sensor_id = ?1, timestamp = ?2, value = ?3, lat = ?4, \
                     lng = ?5, unit = ?6, type = ?7, description = ?8 WHERE id = ?9",
                    params![
                        row.sensor_id,
                        format_timestamp(&row.timestamp),
                        row.value,
                        row.lat,
                        row.lng,
                        row.unit,
                        row.sensor_type,
                        row.description,
                        id,
                    ],
                )
                .map_err(|e| StoreError::write("failed to update reading", e))?;
            if changed == 0 {
                return Err(StoreError::NotFound { id });
            }
            debug!("reading updated");
            fetch(conn, id)
        })
        .await
    }

    /// Remove row `id`, returning what was deleted
    #[instrument(name = "store_delete", skip(self))]
    pub async fn delete(&self, id: i64) -> Result<StoredReading, StoreError> {
        self.with_connection(move |conn| {
            let existing = fetch(conn, id)?;
            conn.execute("DELETE FROM sensor_data WHERE id = ?1", [id])
                .map_err(|e| StoreError::write("failed to delete reading", e))?;
            debug!("reading deleted");
            Ok(existing)
        })
        .await
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connect(&path)?;
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::connection("store task failed", e))?
    }
}

impl ReadingStore for SqliteStore {
    async fn insert(&self, reading: &Reading) -> Result<i64, StoreError> {
        let row = NewReading::from(reading);
        row.validate()?;
        self.with_connection(move |conn| {
            insert_row(conn, &row).map_err(|e| StoreError::write("failed to insert reading", e))
        })
        .await
    }
}

fn connect(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)
        .map_err(|e| StoreError::connection(format!("failed to open {}", path.display()), e))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| StoreError::connection("failed to set busy timeout", e))?;
    Ok(conn)
}

fn insert_row(conn: &Connection, row: &NewReading) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO sensor_data (sensor_id, timestamp, value, lat, lng, unit, type, description) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            row.sensor_id,
            format_timestamp(&row.timestamp),
            row.value,
            row.lat,
            row.lng,
            row.unit,
            row.sensor_type,
            row.description,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn fetch(conn: &Connection, id: i64) -> Result<StoredReading, StoreError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM sensor_data WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()
    .map_err(|e| StoreError::query("failed to fetch reading", e))?
    .ok_or(StoreError::NotFound { id })
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<StoredReading> {
    let raw: String = row.get(2)?;
    let timestamp = parse_utc(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("invalid timestamp '{raw}'").into(),
        )
    })?;

    Ok(StoredReading {
        id: row.get(0)?,
        sensor_id: row.get(1)?,
        timestamp,
        value: row.get(3)?,
        lat: row.get(4)?,
        lng: row.get(5)?,
        unit: row.get(6)?,
        sensor_type: row.get(7)?,
        description: row.get(8)?,
    })
}
