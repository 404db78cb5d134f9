use std::path::Path;

use chrono::Utc;
use tokio_rusqlite::Connection;

use crate::types::{BoardId, HealthRecord, HealthState, IssueRef};

/// Async SQLite-backed store for per-board health records.
///
/// Exactly one row per known board; owned exclusively by the health engine
/// and passed into each component as an explicit dependency.
pub struct HealthStore {
    conn: Connection,
}

// ---------------------------------------------------------------------------
// helpers – enum <-> SQLite string
// ---------------------------------------------------------------------------

fn enum_to_sql<T: serde::Serialize>(val: &T) -> String {
    let s = serde_json::to_string(val).expect("serialize enum");
    s.trim_matches('"').to_string()
}

fn enum_from_sql<T: serde::de::DeserializeOwned>(raw: &str) -> T {
    let quoted = format!("\"{}\"", raw);
    serde_json::from_str(&quoted).expect("deserialize enum")
}

impl HealthStore {
    /// Open (or create) a database at the given file path.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, tokio_rusqlite::Error> {
        let conn = Connection::open(path.as_ref()).await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    /// Create a purely in-memory database (useful for tests).
    pub async fn new_in_memory() -> Result<Self, tokio_rusqlite::Error> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    async fn init_schema(&self) -> Result<(), tokio_rusqlite::Error> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA busy_timeout=5000;

                    CREATE TABLE IF NOT EXISTS health (
                        board             TEXT PRIMARY KEY,
                        state             TEXT NOT NULL,
                        streak_started_at TEXT,
                        issue_number      INTEGER,
                        issue_url         TEXT,
                        last_run          INTEGER NOT NULL DEFAULT 0,
                        updated_at        TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_health_state ON health(state);
                    ",
                )?;
                Ok(())
            })
            .await
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    pub async fn upsert(&self, record: &HealthRecord) -> Result<(), tokio_rusqlite::Error> {
        let board = record.board.as_str().to_string();
        let state = enum_to_sql(&record.state);
        let streak_started_at = record.streak_started_at.map(|d| d.to_rfc3339());
        let issue_number = record.issue.as_ref().map(|i| i.number as i64);
        let issue_url = record.issue.as_ref().and_then(|i| i.url.clone());
        let last_run = record.last_run as i64;
        let updated_at = record.updated_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO health (board, state, streak_started_at, issue_number,
                        issue_url, last_run, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)
                     ON CONFLICT(board) DO UPDATE SET
                        state=excluded.state,
                        streak_started_at=excluded.streak_started_at,
                        issue_number=excluded.issue_number,
                        issue_url=excluded.issue_url,
                        last_run=excluded.last_run,
                        updated_at=excluded.updated_at",
                    rusqlite::params![
                        board,
                        state,
                        streak_started_at,
                        issue_number,
                        issue_url,
                        last_run,
                        updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, board: &BoardId) -> Result<Option<HealthRecord>, tokio_rusqlite::Error> {
        let board_str = board.as_str().to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT board, state, streak_started_at, issue_number,
                            issue_url, last_run, updated_at
                     FROM health WHERE board = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![board_str])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_record(row)?)),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Get the record for a board, or a fresh healthy record when the board
    /// has never been seen.
    pub async fn get_or_healthy(
        &self,
        board: &BoardId,
    ) -> Result<HealthRecord, tokio_rusqlite::Error> {
        Ok(self
            .get(board)
            .await?
            .unwrap_or_else(|| HealthRecord::healthy(board.clone())))
    }

    pub async fn list_all(&self) -> Result<Vec<HealthRecord>, tokio_rusqlite::Error> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT board, state, streak_started_at, issue_number,
                            issue_url, last_run, updated_at
                     FROM health ORDER BY board",
                )?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_record(row)?);
                }
                Ok(out)
            })
            .await
    }

    pub async fn list_by_state(
        &self,
        state: HealthState,
    ) -> Result<Vec<HealthRecord>, tokio_rusqlite::Error> {
        let state_str = enum_to_sql(&state);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT board, state, streak_started_at, issue_number,
                            issue_url, last_run, updated_at
                     FROM health WHERE state = ?1 ORDER BY board",
                )?;
                let mut rows = stmt.query(rusqlite::params![state_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_record(row)?);
                }
                Ok(out)
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<HealthRecord> {
    let board: String = row.get(0)?;
    let state_str: String = row.get(1)?;
    let streak_str: Option<String> = row.get(2)?;
    let issue_number: Option<i64> = row.get(3)?;
    let issue_url: Option<String> = row.get(4)?;
    let last_run: i64 = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(HealthRecord {
        board: BoardId::from(board.as_str()),
        state: enum_from_sql(&state_str),
        streak_started_at: streak_str.map(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .expect("valid date")
                .with_timezone(&Utc)
        }),
        issue: issue_number.map(|n| IssueRef {
            number: n as u64,
            url: issue_url,
        }),
        last_run: last_run as u64,
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at_str)
            .expect("valid date")
            .with_timezone(&Utc),
    })
}
