//! SQLite-backed feature repository.
//! One immutable row per extraction run; features stored as JSON text.

use crate::error::StoreError;
use crate::features::{FeatureMetadata, FeatureSet, MLFeatureVector};
use crate::schema::FeatureVersion;
use crate::store::FeatureRepository;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Student IDs bound per batch lookup statement, well under SQLite's
/// bound-parameter limit
const MAX_IDS_PER_QUERY: usize = 500;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ml_feature_store (
    student_id TEXT NOT NULL,
    feature_version TEXT NOT NULL,
    extraction_timestamp INTEGER NOT NULL,
    features TEXT NOT NULL,
    PRIMARY KEY (student_id, feature_version, extraction_timestamp)
);
CREATE INDEX IF NOT EXISTS idx_feature_store_version
    ON ml_feature_store(feature_version, extraction_timestamp);
"#;

#[derive(Debug, Clone)]
pub struct SqliteFeatureRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFeatureRepository {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection off the async executor
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Raw `(student_id, extraction_timestamp, features)` row
type Row = (String, i64, String);

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| StoreError::Query(format!("invalid extraction timestamp {}", micros)))
}

fn row_to_vector(row: Row, version: FeatureVersion) -> Result<MLFeatureVector, StoreError> {
    let (student_id, micros, features_json) = row;
    let extraction_timestamp = from_micros(micros)?;
    let features: FeatureSet = serde_json::from_str(&features_json)?;
    Ok(MLFeatureVector {
        student_id,
        timestamp: extraction_timestamp,
        features,
        metadata: FeatureMetadata {
            feature_version: version,
            extraction_timestamp,
        },
    })
}

#[async_trait]
impl FeatureRepository for SqliteFeatureRepository {
    async fn upsert_feature_vector(&self, vector: &MLFeatureVector) -> Result<(), StoreError> {
        let student_id = vector.student_id.clone();
        let version = vector.metadata.feature_version.as_str();
        let micros = to_micros(vector.metadata.extraction_timestamp);
        let features = serde_json::to_string(&vector.features)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO ml_feature_store
                     (student_id, feature_version, extraction_timestamp, features)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(student_id, feature_version, extraction_timestamp)
                 DO UPDATE SET features = excluded.features",
                params![student_id, version, micros, features],
            )?;
            Ok(())
        })
        .await
    }

    async fn latest_feature_vector(
        &self,
        student_id: &str,
        version: FeatureVersion,
    ) -> Result<Option<MLFeatureVector>, StoreError> {
        let student_id = student_id.to_string();
        let row: Option<Row> = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT student_id, extraction_timestamp, features FROM ml_feature_store
                     WHERE student_id = ?1 AND feature_version = ?2
                     ORDER BY extraction_timestamp DESC LIMIT 1",
                )?;
                let mut rows = stmt.query(params![student_id, version.as_str()])?;
                match rows.next()? {
                    Some(row) => Ok(Some((row.get(0)?, row.get(1)?, row.get(2)?))),
                    None => Ok(None),
                }
            })
            .await?;

        row.map(|r| row_to_vector(r, version)).transpose()
    }

    async fn latest_feature_vectors(
        &self,
        student_ids: &[String],
        version: FeatureVersion,
    ) -> Result<HashMap<String, MLFeatureVector>, StoreError> {
        if student_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = student_ids.to_vec();
        let rows: Vec<Row> = self
            .with_conn(move |conn| {
                let mut rows: Vec<Row> = Vec::new();
                for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!(
                        "SELECT student_id, extraction_timestamp, features FROM ml_feature_store
                         WHERE feature_version = ? AND student_id IN ({})",
                        placeholders
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let bound = std::iter::once(version.as_str())
                        .chain(chunk.iter().map(String::as_str));
                    let chunk_rows = stmt.query_map(params_from_iter(bound), |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?;
                    for row in chunk_rows {
                        rows.push(row?);
                    }
                }
                Ok(rows)
            })
            .await?;

        let mut newest: HashMap<String, Row> = HashMap::new();
        for row in rows {
            match newest.get(&row.0) {
                Some(kept) if kept.1 >= row.1 => {}
                _ => {
                    newest.insert(row.0.clone(), row);
                }
            }
        }

        newest
            .into_iter()
            .map(|(student_id, row)| Ok((student_id, row_to_vector(row, version)?)))
            .collect()
    }
}
