//! SQLite-backed job store, the single source of truth for queue state.
//!
//! Every mutation is a single-row statement, so a crash mid-update leaves
//! the prior state intact. The connection is shared behind a mutex taken
//! per operation, never across a compression.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::queue::job::{Job, JobState};

/// Snapshot of job counts per state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errors: usize,
}

/// Durable job table
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

impl JobStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // WAL so API reads do not block worker writes
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                input_path TEXT NOT NULL UNIQUE,
                output_path TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'pending',
                error_reason TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
        "#,
        )?;

        Ok(())
    }

    /// Queue a new pending job. Returns `None` when the input path is
    /// already present; re-admission is a no-op, not an error.
    pub fn insert(&self, input_path: &Path, output_path: &Path) -> Result<Option<i64>> {
        let conn = self.conn.lock();

        let changed = conn.execute(
            r#"
            INSERT OR IGNORE INTO jobs (input_path, output_path, state, created_at)
            VALUES (?1, ?2, 'pending', ?3)
            "#,
            params![
                input_path.to_string_lossy(),
                output_path.to_string_lossy(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            Ok(None)
        } else {
            Ok(Some(conn.last_insert_rowid()))
        }
    }

    /// Claim a pending job for processing. Returns false when the row is
    /// no longer pending (deleted or already handled).
    pub fn claim(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE jobs SET state = 'processing', error_reason = NULL \
             WHERE id = ?1 AND state = 'pending'",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Mark a processing job completed and record the actual output path
    pub fn complete(&self, id: i64, output_path: &Path) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE jobs SET state = 'completed', output_path = ?2 \
             WHERE id = ?1 AND state = 'processing'",
            params![id, output_path.to_string_lossy()],
        )?;
        Ok(())
    }

    /// Mark a processing job failed with a reason
    pub fn fail(&self, id: i64, reason: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE jobs SET state = 'error', error_reason = ?2 \
             WHERE id = ?1 AND state = 'processing'",
            params![id, reason],
        )?;
        Ok(())
    }

    /// All pending jobs in insertion order; one worker cycle's batch
    pub fn pending(&self) -> Result<Vec<Job>> {
        self.query_jobs("SELECT * FROM jobs WHERE state = 'pending' ORDER BY id")
    }

    /// All jobs in insertion order
    pub fn list(&self) -> Result<Vec<Job>> {
        self.query_jobs("SELECT * FROM jobs ORDER BY id")
    }

    /// Fetch a single job
    pub fn get(&self, id: i64) -> Result<Option<Job>> {
        use rusqlite::OptionalExtension;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let job = stmt.query_row(params![id], row_to_job).optional()?;
        Ok(job)
    }

    /// Count jobs per state, computed at call time
    pub fn counts(&self) -> Result<QueueCounts> {
        let conn = self.conn.lock();
        let counts = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COUNT(CASE WHEN state = 'pending' THEN 1 END),
                COUNT(CASE WHEN state = 'processing' THEN 1 END),
                COUNT(CASE WHEN state = 'completed' THEN 1 END),
                COUNT(CASE WHEN state = 'error' THEN 1 END)
            FROM jobs
            "#,
            [],
            |row| {
                Ok(QueueCounts {
                    total: row.get::<_, i64>(0)? as usize,
                    pending: row.get::<_, i64>(1)? as usize,
                    processing: row.get::<_, i64>(2)? as usize,
                    completed: row.get::<_, i64>(3)? as usize,
                    errors: row.get::<_, i64>(4)? as usize,
                })
            },
        )?;
        Ok(counts)
    }

    /// Delete all completed jobs, returning how many were removed
    pub fn clear_completed(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM jobs WHERE state = 'completed'", [])?;
        Ok(deleted)
    }

    fn query_jobs(&self, sql: &str) -> Result<Vec<Job>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }
}

fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
    let state_text: String = row.get(3)?;
    let state = JobState::parse(&state_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown job state: {}", state_text).into(),
        )
    })?;

    let created_raw: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Job {
        id: row.get(0)?,
        input_path: PathBuf::from(row.get::<_, String>(1)?),
        output_path: PathBuf::from(row.get::<_, String>(2)?),
        state,
        error_reason: row.get(4)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_per_input_path() {
        let store = JobStore::in_memory().unwrap();

        let first = store
            .insert(Path::new("/in/a.jpg"), Path::new("/out/a.jpg"))
            .unwrap();
        assert!(first.is_some());

        // Same input with a different output root: first admission wins.
        let second = store
            .insert(Path::new("/in/a.jpg"), Path::new("/elsewhere/a.jpg"))
            .unwrap();
        assert!(second.is_none());

        let jobs = store.list().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].output_path, PathBuf::from("/out/a.jpg"));
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        let store = JobStore::in_memory().unwrap();
        let id = store
            .insert(Path::new("/in/a.jpg"), Path::new("/out/a.jpg"))
            .unwrap()
            .unwrap();

        assert!(store.claim(id).unwrap());
        assert_eq!(store.get(id).unwrap().unwrap().state, JobState::Processing);

        // A claimed job cannot be claimed again.
        assert!(!store.claim(id).unwrap());

        store.complete(id, Path::new("/out/a.webp")).unwrap();
        let job = store.get(id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.output_path, PathBuf::from("/out/a.webp"));

        // Terminal states never re-enter processing.
        assert!(!store.claim(id).unwrap());
    }

    #[test]
    fn fail_records_the_reason() {
        let store = JobStore::in_memory().unwrap();
        let id = store
            .insert(Path::new("/in/b.mp4"), Path::new("/out/b.mp4"))
            .unwrap()
            .unwrap();

        store.claim(id).unwrap();
        store.fail(id, "Timeout: b.mp4").unwrap();

        let job = store.get(id).unwrap().unwrap();
        assert_eq!(job.state, JobState::Error);
        assert_eq!(job.error_reason.as_deref(), Some("Timeout: b.mp4"));
        // Output path is untouched by a failure.
        assert_eq!(job.output_path, PathBuf::from("/out/b.mp4"));
    }

    #[test]
    fn counts_sum_to_list_length() {
        let store = JobStore::in_memory().unwrap();
        for i in 0..4 {
            store
                .insert(
                    Path::new(&format!("/in/{i}.jpg")),
                    Path::new(&format!("/out/{i}.jpg")),
                )
                .unwrap();
        }

        store.claim(1).unwrap();
        store.complete(1, Path::new("/out/0.webp")).unwrap();
        store.claim(2).unwrap();
        store.fail(2, "Compression failed: 1.jpg").unwrap();
        store.claim(3).unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.errors, 1);
        assert_eq!(
            counts.total,
            counts.pending + counts.processing + counts.completed + counts.errors
        );
        assert_eq!(counts.total, store.list().unwrap().len());
    }

    #[test]
    fn pending_batch_is_in_insertion_order() {
        let store = JobStore::in_memory().unwrap();
        for name in ["c.jpg", "a.jpg", "b.jpg"] {
            store
                .insert(
                    &PathBuf::from("/in").join(name),
                    &PathBuf::from("/out").join(name),
                )
                .unwrap();
        }

        let names: Vec<String> = store.pending().unwrap().iter().map(|j| j.filename()).collect();
        assert_eq!(names, ["c.jpg", "a.jpg", "b.jpg"]);
    }

    #[test]
    fn clear_completed_is_idempotent_and_leaves_other_states() {
        let store = JobStore::in_memory().unwrap();
        for i in 0..3 {
            store
                .insert(
                    Path::new(&format!("/in/{i}.jpg")),
                    Path::new(&format!("/out/{i}.jpg")),
                )
                .unwrap();
        }
        store.claim(1).unwrap();
        store.complete(1, Path::new("/out/0.webp")).unwrap();
        store.claim(2).unwrap();
        store.fail(2, "Compression failed: 1.jpg").unwrap();

        assert_eq!(store.clear_completed().unwrap(), 1);
        assert_eq!(store.clear_completed().unwrap(), 0);

        let counts = store.counts().unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.pending, 1);
    }
}
