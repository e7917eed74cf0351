//! SQLite-backed two-lane job queue.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use super::traits::{JobQueue, Lane, QueueError};
use crate::job::Job;

/// Upper bound on a single sleep inside a bounded wait. Wakeups from other
/// processes sharing the database file are only observed by re-polling.
const REPOLL_INTERVAL: Duration = Duration::from_millis(250);

/// SQLite-backed job queue.
///
/// Both lanes live in one table. Push appends a row, pop deletes the lowest
/// sequence number of a lane in a single `DELETE ... RETURNING` statement, so a
/// row is returned to exactly one caller.
pub struct SqliteJobQueue {
    conn: Mutex<Connection>,
    high_ready: Notify,
    low_ready: Notify,
}

impl SqliteJobQueue {
    /// Open (or create) the queue in the given database file.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Connection(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory queue (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueError::Connection(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, QueueError> {
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            high_ready: Notify::new(),
            low_ready: Notify::new(),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue_jobs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                lane TEXT NOT NULL CHECK (lane IN ('high', 'low')),
                payload TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_queue_jobs_lane_seq ON queue_jobs(lane, seq);
            "#,
        )
        .map_err(|e| QueueError::Connection(e.to_string()))
    }

    fn ready_signal(&self, lane: Lane) -> &Notify {
        match lane {
            Lane::High => &self.high_ready,
            Lane::Low => &self.low_ready,
        }
    }

    /// Pop the oldest job of a lane without waiting.
    fn try_pop(&self, lane: Lane) -> Result<Option<Job>, QueueError> {
        let payload = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| QueueError::Storage(e.to_string()))?;

            let result = conn.query_row(
                "DELETE FROM queue_jobs
                 WHERE seq = (SELECT MIN(seq) FROM queue_jobs WHERE lane = ?1)
                 RETURNING payload",
                params![lane.as_str()],
                |row| row.get::<_, String>(0),
            );

            match result {
                Ok(payload) => payload,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(QueueError::Storage(e.to_string())),
            }
        };

        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|e| QueueError::Serialization(e.to_string()))
    }

    /// Pop from a lane, waiting up to `wait` for a job to arrive.
    async fn pop_within(&self, lane: Lane, wait: Duration) -> Result<Option<Job>, QueueError> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(job) = self.try_pop(lane)? {
                return Ok(Some(job));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let _ = tokio::time::timeout(
                remaining.min(REPOLL_INTERVAL),
                self.ready_signal(lane).notified(),
            )
            .await;
        }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;
        let lane = Lane::for_priority(job.priority);

        {
            let conn = self
                .conn
                .lock()
                .map_err(|e| QueueError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT INTO queue_jobs (lane, payload) VALUES (?1, ?2)",
                params![lane.as_str(), payload],
            )
            .map_err(|e| QueueError::Storage(e.to_string()))?;
        }

        debug!(job_id = %job.id, lane = lane.as_str(), "Job enqueued");
        self.ready_signal(lane).notify_one();
        Ok(())
    }

    async fn dequeue(&self, lane_timeout: Duration) -> Result<Option<Job>, QueueError> {
        for lane in Lane::POLL_ORDER {
            if let Some(job) = self.pop_within(lane, lane_timeout).await? {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    fn lane_len(&self, lane: Lane) -> Result<usize, QueueError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| QueueError::Storage(e.to_string()))?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM queue_jobs WHERE lane = ?1",
                params![lane.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| QueueError::Storage(e.to_string()))?;
        Ok(count as usize)
    }
}
