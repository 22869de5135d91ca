use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::proxy::types::Origin;
use crate::registry::store::{IngestBatch, ModuleStore};
use crate::registry::types::{ModuleRecord, ModuleState};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: origin column
    &["ALTER TABLE modules ADD COLUMN origin TEXT"],
    // v2: state column
    &[
        "ALTER TABLE modules ADD COLUMN state TEXT NOT NULL DEFAULT 'index'",
        "CREATE INDEX IF NOT EXISTS idx_modules_state ON modules(state)",
    ],
];

/// Columns of a module row before the origin blob is decoded
type RawRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// SQLite-backed module registry
///
/// SQLite allows one writer at a time, so the connection sits behind a
/// mutex and every read or write holds it for the whole statement or
/// transaction.
pub struct Registry {
    conn: Mutex<Connection>,
}

impl Registry {
    /// Opens the database without touching the schema.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        info!("Opening registry database at {:?}", db_path);

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Creates the tables if they are missing and applies pending migrations.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating registry schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                error TEXT,
                latest_version TEXT,
                info_time TEXT
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS params (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Registry schema ready");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    fn decode_row(row: RawRow) -> Result<ModuleRecord, StoreError> {
        let (path, state, error, latest_version, info_time, origin) = row;
        let state = state.parse::<ModuleState>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let origin = origin
            .filter(|o| !o.is_empty())
            .map(|o| serde_json::from_str::<Origin>(&o))
            .transpose()?;

        Ok(ModuleRecord {
            path,
            state,
            latest_version,
            info_time,
            origin,
            error,
        })
    }
}

impl ModuleStore for Registry {
    fn load_all(&self) -> Result<Vec<ModuleRecord>, StoreError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT path, state, error, latest_version, info_time, origin
            FROM modules ORDER BY path
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<RawRow>, _>>()?;

        rows.into_iter().map(Self::decode_row).collect()
    }

    fn get_param(&self, name: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row("SELECT value FROM params WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn upsert_param(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO params (name, value) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
            (name, value),
        )?;
        Ok(())
    }

    fn ingest(&self, param: &str, batch: &IngestBatch) -> Result<usize, StoreError> {
        debug!(
            "Ingesting {} new paths, watermark {:?}",
            batch.new_paths.len(),
            batch.watermark
        );

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            // A path inserted since the snapshot was taken is left alone.
            let mut stmt = tx.prepare(
                "INSERT INTO modules (path, state) VALUES (?1, ?2) ON CONFLICT(path) DO NOTHING",
            )?;
            for path in &batch.new_paths {
                inserted += stmt.execute((path, ModuleState::Index.as_str()))?;
            }
        }

        if let Some(watermark) = &batch.watermark {
            tx.execute(
                r#"
                INSERT INTO params (name, value) VALUES (?1, ?2)
                ON CONFLICT(name) DO UPDATE SET value = excluded.value
                "#,
                (param, watermark),
            )?;
        }

        // Dropping the transaction without commit rolls everything back.
        tx.commit()?;
        Ok(inserted)
    }

    fn update_module(&self, record: &ModuleRecord) -> Result<(), StoreError> {
        let origin = record
            .origin
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO modules (path, state, error, latest_version, info_time, origin)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(path) DO UPDATE SET
                state = excluded.state,
                error = excluded.error,
                latest_version = excluded.latest_version,
                info_time = excluded.info_time,
                origin = excluded.origin
            "#,
            (
                &record.path,
                record.state.as_str(),
                &record.error,
                &record.latest_version,
                &record.info_time,
                &origin,
            ),
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::types::InfoEntry;
    use tempfile::TempDir;

    fn registry(temp_dir: &TempDir) -> Registry {
        let registry = Registry::open(&temp_dir.path().join("db.sqlite")).unwrap();
        registry.create_schema().unwrap();
        registry
    }

    fn batch(paths: &[&str], watermark: Option<&str>) -> IngestBatch {
        IngestBatch {
            new_paths: paths.iter().map(|p| p.to_string()).collect(),
            watermark: watermark.map(str::to_string),
        }
    }

    #[test]
    fn create_schema_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);
        registry.create_schema().unwrap();

        let conn = registry.lock_conn().unwrap();
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn migrations_upgrade_a_base_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("db.sqlite");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute(
                "CREATE TABLE modules (id INTEGER PRIMARY KEY AUTOINCREMENT, path TEXT NOT NULL UNIQUE, error TEXT, latest_version TEXT, info_time TEXT)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO modules (path, latest_version) VALUES ('old.com/m', 'v1.0.0')",
                [],
            )
            .unwrap();
        }

        let registry = Registry::open(&db_path).unwrap();
        registry.create_schema().unwrap();

        let records = registry.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, ModuleState::Index);
        assert_eq!(records[0].origin, None);
        assert_eq!(records[0].latest_version.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn params_are_upserted() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);

        assert_eq!(registry.get_param("feedSince").unwrap(), None);
        registry.upsert_param("feedSince", "2024-01-01T00:00:00Z").unwrap();
        registry.upsert_param("feedSince", "2024-02-01T00:00:00Z").unwrap();
        assert_eq!(
            registry.get_param("feedSince").unwrap().as_deref(),
            Some("2024-02-01T00:00:00Z")
        );
    }

    #[test]
    fn ingest_inserts_paths_and_watermark_together() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);

        let inserted = registry
            .ingest(
                "feedSince",
                &batch(&["a.com/a", "b.com/b"], Some("2024-01-01T00:00:00Z")),
            )
            .unwrap();

        assert_eq!(inserted, 2);
        let paths: Vec<String> = registry.load_all().unwrap().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["a.com/a", "b.com/b"]);
        assert_eq!(
            registry.get_param("feedSince").unwrap().as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn ingest_skips_paths_already_present() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);
        registry.ingest("feedSince", &batch(&["a.com/a"], None)).unwrap();

        let inserted = registry
            .ingest("feedSince", &batch(&["a.com/a", "c.com/c"], None))
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(registry.load_all().unwrap().len(), 2);
        assert_eq!(registry.get_param("feedSince").unwrap(), None);
    }

    #[test]
    fn failed_ingest_leaves_no_partial_inserts() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);
        registry
            .lock_conn()
            .unwrap()
            .execute_batch("DROP TABLE params")
            .unwrap();

        let result = registry.ingest(
            "feedSince",
            &batch(&["a.com/a", "b.com/b"], Some("2024-01-01T00:00:00Z")),
        );

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(registry.load_all().unwrap().is_empty());
    }

    #[test]
    fn update_module_round_trips_every_field() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);
        registry.ingest("feedSince", &batch(&["a.com/a"], None)).unwrap();

        let mut record = ModuleRecord::new("a.com/a");
        record.set_resolved(InfoEntry {
            version: "v1.4.0".to_string(),
            time: "2024-03-01T10:00:00Z".to_string(),
            origin: Some(Origin {
                vcs: "git".to_string(),
                url: "https://a.com/a".to_string(),
                reference: "refs/tags/v1.4.0".to_string(),
                hash: "0123abcd".to_string(),
            }),
        });
        registry.update_module(&record).unwrap();

        assert_eq!(registry.load_all().unwrap(), vec![record]);
    }

    #[test]
    fn update_module_replaces_version_with_error() {
        let temp_dir = TempDir::new().unwrap();
        let registry = registry(&temp_dir);

        let mut record = ModuleRecord::new("a.com/a");
        record.set_resolved(InfoEntry {
            version: "v1.0.0".to_string(),
            time: "2024-03-01T10:00:00Z".to_string(),
            origin: None,
        });
        registry.update_module(&record).unwrap();

        record.set_error("no versions from proxy");
        registry.update_module(&record).unwrap();

        let stored = &registry.load_all().unwrap()[0];
        assert_eq!(stored.latest_version, None);
        assert_eq!(stored.info_time, None);
        assert_eq!(stored.error.as_deref(), Some("no versions from proxy"));
    }
}
