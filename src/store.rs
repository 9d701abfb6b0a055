use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection};

use crate::analytics::{Bucket, ReportQuery};
use crate::clock::format_timestamp;
use crate::errors::{ApiError, ApiResult};
use crate::models::{ActivityRecord, NewActivity};

/// Schema versions, applied in order and tracked in `PRAGMA user_version`.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS activity (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        app TEXT NOT NULL,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        duration INTEGER NOT NULL DEFAULT 0 CHECK (duration >= 0),
        user_id TEXT NOT NULL DEFAULT 'default'
    );",
    "CREATE INDEX IF NOT EXISTS idx_activity_timestamp ON activity (timestamp);",
];

/// Append-only activity table in a single SQLite database
#[derive(Debug)]
pub struct ActivityStore {
    conn: Mutex<Connection>,
}

impl ActivityStore {
    pub fn open(path: &Path) -> ApiResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| ApiError::Store(err.to_string()))?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened activity store");

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> ApiResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Brings the schema up to date. Safe to call repeatedly.
    pub fn migrate(&self) -> ApiResult<()> {
        let mut conn = self.lock()?;
        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
            let version = idx as i64 + 1;
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::info!(version, "applied store migration");
        }
        Ok(())
    }

    /// Inserts one row stamped with `at` and returns its id.
    pub fn record(&self, activity: &NewActivity, at: NaiveDateTime) -> ApiResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO activity (timestamp, app, title, category, duration, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_timestamp(at),
                activity.app,
                activity.title,
                activity.category,
                activity.duration,
                activity.user_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest first, at most `limit` rows.
    pub fn list(&self, limit: usize) -> ApiResult<Vec<ActivityRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, app, title, category, duration, user_id
             FROM activity
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(ActivityRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                app: row.get(2)?,
                title: row.get(3)?,
                category: row.get(4)?,
                duration: row.get(5)?,
                user_id: row.get(6)?,
            })
        })?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn aggregate(&self, query: &ReportQuery, now: NaiveDateTime) -> ApiResult<Vec<Bucket>> {
        let cutoff = query.window.cutoff(now);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query.sql())?;
        let rows = stmt.query_map(params_from_iter(cutoff.iter()), |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut buckets = Vec::new();
        for row in rows {
            // strftime/date yield NULL for unparseable timestamps
            if let (Some(key), count, total_duration) = row? {
                buckets.push(Bucket { key, count, total_duration });
            }
        }
        Ok(buckets)
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Store("database mutex poisoned".to_string()))
    }
}
