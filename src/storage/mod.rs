use crate::activity::ideas::merge_ideas;
use crate::activity::{Session, SessionTimer, SessionType, Student, TimerStart};
use crate::config::StorageConfig;
use crate::error::{LimitlabError, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;
pub use types::{DeleteSummary, StoredSession};

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> LimitlabError {
    move |e| LimitlabError::Storage(format!("{context}: {e}"))
}

fn to_db_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LimitlabError::Storage(format!("Invalid timestamp '{s}': {e}")).into())
}

fn parse_session_type(s: &str) -> SessionType {
    match s {
        "group" => SessionType::Group,
        "individual" => SessionType::Individual,
        other => {
            tracing::warn!("Unknown session type '{}', treating as individual", other);
            SessionType::Individual
        }
    }
}

/// Raw `sessions` row before JSON decoding
type SessionRow = (String, String, String, String, String);

/// Raw `timers` row
type TimerRow = (String, Option<String>, i64, String, String);

/// Storage backend for sessions, timers, and idea logs
///
/// Every call opens its own connection. Read-modify-write operations run
/// inside an `IMMEDIATE` transaction so concurrent writers to the same
/// session serialize instead of losing updates.
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a storage instance from configuration
    ///
    /// Uses `config.db_path` when set, otherwise `limitlab.db` in the user's
    /// data directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if let Some(path) = &config.db_path {
            return Self::new_with_path(path.clone());
        }

        let proj_dirs = ProjectDirs::from("org", "limitlab", "limitlab")
            .ok_or_else(|| LimitlabError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("limitlab.db"))
    }

    /// Create a storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use limitlab::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("test.db")).unwrap();
    /// assert!(storage.list_sessions().unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| LimitlabError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).map_err(storage_err("Failed to open database"))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(storage_err("Failed to set busy timeout"))?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                session_type TEXT NOT NULL,
                students JSON NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS timers (
                session_id TEXT PRIMARY KEY,
                timer_start_time TEXT,
                timer_duration_seconds INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS randomization_ideas (
                session_id TEXT PRIMARY KEY,
                ideas JSON NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .map_err(storage_err("Failed to create tables"))?;

        Ok(())
    }

    // ── Sessions ────────────────────────────────────────────────────

    fn read_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
        let row: Option<SessionRow> = conn
            .query_row(
                "SELECT session_id, session_type, students, created_at, updated_at
                FROM sessions WHERE session_id = ?",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()
            .map_err(storage_err("Failed to query session"))?;

        row.map(Self::decode_session).transpose()
    }

    fn decode_session(row: SessionRow) -> Result<Session> {
        let (session_id, session_type, students_json, created_at, updated_at) = row;
        let students: Vec<Student> = serde_json::from_str(&students_json)
            .with_context(|| format!("Failed to deserialize students of session {session_id}"))
            .map_err(|e| LimitlabError::Storage(format!("{e:#}")))?;

        Ok(Session {
            session_type: parse_session_type(&session_type),
            students,
            created_at: from_db_time(&created_at)?,
            updated_at: from_db_time(&updated_at)?,
            session_id,
        })
    }

    fn write_session(conn: &Connection, session: &Session) -> Result<()> {
        let students_json = serde_json::to_string(&session.students)
            .context("Failed to serialize students")
            .map_err(|e| LimitlabError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT INTO sessions (session_id, session_type, students, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(session_id) DO UPDATE SET
                session_type = excluded.session_type,
                students = excluded.students,
                updated_at = excluded.updated_at",
            params![
                session.session_id,
                session.session_type.to_string(),
                students_json,
                to_db_time(&session.created_at),
                to_db_time(&session.updated_at),
            ],
        )
        .map_err(storage_err("Failed to save session"))?;

        Ok(())
    }

    /// Load a session by ID
    pub fn load_session(&self, session_id: &str) -> Result<Option<Session>> {
        let conn = self.open()?;
        Self::read_session(&conn, session_id)
    }

    /// Read, mutate, and write back one session atomically.
    ///
    /// `f` receives the current session (or `None`) and may create, edit, or
    /// leave it alone. The row is written only if the session changed, with
    /// `updated_at` refreshed. Clearing the slot to `None` does not delete
    /// the row. If `f` fails nothing is written.
    pub fn modify_session<T, F>(&self, session_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Option<Session>) -> Result<T>,
    {
        let mut conn = self.open()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err("Failed to start transaction"))?;

        let before = Self::read_session(&tx, session_id)?;
        let mut slot = before.clone();
        let out = f(&mut slot)?;

        if let Some(session) = slot.as_mut() {
            if before.as_ref() != Some(&*session) {
                session.updated_at = Utc::now();
                Self::write_session(&tx, session)?;
            }
        }

        tx.commit()
            .map_err(storage_err("Failed to commit transaction"))?;

        Ok(out)
    }

    /// Insert a brand-new session; fails with a conflict if the ID is taken
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.modify_session(&session.session_id, |slot| {
            if slot.is_some() {
                return Err(LimitlabError::Conflict(format!(
                    "Session '{}' already exists",
                    session.session_id
                ))
                .into());
            }
            *slot = Some(session.clone());
            Ok(())
        })
    }

    /// List all stored sessions, most recently updated first
    pub fn list_sessions(&self) -> Result<Vec<StoredSession>> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT session_id, session_type, students, created_at, updated_at
                FROM sessions
                ORDER BY updated_at DESC",
            )
            .map_err(storage_err("Failed to prepare statement"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(storage_err("Failed to query sessions"))?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, session_type, students_json, created_at, updated_at) =
                row.map_err(storage_err("Failed to read session row"))?;

            // Count without decoding every student record.
            let student_count = serde_json::from_str::<serde_json::Value>(&students_json)
                .ok()
                .and_then(|v| v.as_array().map(Vec::len))
                .unwrap_or(0);

            sessions.push(StoredSession {
                session_id,
                session_type: parse_session_type(&session_type),
                created_at: from_db_time(&created_at)?,
                updated_at: from_db_time(&updated_at)?,
                student_count,
            });
        }

        Ok(sessions)
    }

    /// Delete one session, returning `None` if it did not exist
    pub fn delete_session(&self, session_id: &str) -> Result<Option<DeleteSummary>> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err("Failed to start transaction"))?;

        let Some(session) = Self::read_session(&tx, session_id)? else {
            return Ok(None);
        };

        let deleted = tx
            .execute("DELETE FROM sessions WHERE session_id = ?", params![session_id])
            .map_err(storage_err("Failed to delete session"))?;

        tx.commit()
            .map_err(storage_err("Failed to commit transaction"))?;

        Ok(Some(DeleteSummary {
            deleted_count: deleted,
            total_students_deleted: session.students.len(),
        }))
    }

    /// Delete every session
    pub fn delete_all_sessions(&self) -> Result<DeleteSummary> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err("Failed to start transaction"))?;

        let total_students_deleted = {
            let mut stmt = tx
                .prepare("SELECT students FROM sessions")
                .map_err(storage_err("Failed to prepare statement"))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(storage_err("Failed to query sessions"))?;

            let mut total = 0;
            for row in rows {
                let json = row.map_err(storage_err("Failed to read session row"))?;
                total += serde_json::from_str::<serde_json::Value>(&json)
                    .ok()
                    .and_then(|v| v.as_array().map(Vec::len))
                    .unwrap_or(0);
            }
            total
        };

        let deleted_count = tx
            .execute("DELETE FROM sessions", [])
            .map_err(storage_err("Failed to delete sessions"))?;

        tx.commit()
            .map_err(storage_err("Failed to commit transaction"))?;

        Ok(DeleteSummary {
            deleted_count,
            total_students_deleted,
        })
    }

    // ── Timers ──────────────────────────────────────────────────────

    fn read_timer(conn: &Connection, session_id: &str) -> Result<Option<SessionTimer>> {
        let row: Option<TimerRow> = conn
            .query_row(
                "SELECT session_id, timer_start_time, timer_duration_seconds, created_at, updated_at
                FROM timers WHERE session_id = ?",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()
            .map_err(storage_err("Failed to query timer"))?;

        let Some((session_id, start, duration, created_at, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(SessionTimer {
            session_id,
            timer_start_time: start.as_deref().map(from_db_time).transpose()?,
            timer_duration_seconds: duration,
            created_at: from_db_time(&created_at)?,
            updated_at: from_db_time(&updated_at)?,
        }))
    }

    /// Load the countdown for a session
    pub fn load_timer(&self, session_id: &str) -> Result<Option<SessionTimer>> {
        let conn = self.open()?;
        Self::read_timer(&conn, session_id)
    }

    /// Start the countdown unless it is already running.
    ///
    /// The first caller sets the start time to `now`; everyone after sees
    /// that start time and `started == false`.
    pub fn start_timer(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        default_duration_seconds: i64,
    ) -> Result<TimerStart> {
        // Stored precision, so the returned start time matches later reads
        let now = now.trunc_subsecs(6);
        let mut conn = self.open()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err("Failed to start transaction"))?;

        let result = match Self::read_timer(&tx, session_id)? {
            Some(timer) if timer.timer_start_time.is_some() => TimerStart {
                timer,
                started: false,
            },
            Some(mut timer) => {
                tx.execute(
                    "UPDATE timers SET timer_start_time = ?, updated_at = ? WHERE session_id = ?",
                    params![to_db_time(&now), to_db_time(&now), session_id],
                )
                .map_err(storage_err("Failed to start timer"))?;
                timer.timer_start_time = Some(now);
                timer.updated_at = now;
                TimerStart {
                    timer,
                    started: true,
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO timers
                        (session_id, timer_start_time, timer_duration_seconds, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?)",
                    params![
                        session_id,
                        to_db_time(&now),
                        default_duration_seconds,
                        to_db_time(&now),
                        to_db_time(&now)
                    ],
                )
                .map_err(storage_err("Failed to create timer"))?;
                TimerStart {
                    timer: SessionTimer {
                        session_id: session_id.to_string(),
                        timer_start_time: Some(now),
                        timer_duration_seconds: default_duration_seconds,
                        created_at: now,
                        updated_at: now,
                    },
                    started: true,
                }
            }
        };

        tx.commit()
            .map_err(storage_err("Failed to commit transaction"))?;

        Ok(result)
    }

    /// Clear the start time, returning `None` if the session has no timer
    pub fn reset_timer(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<SessionTimer>> {
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE timers SET timer_start_time = NULL, updated_at = ? WHERE session_id = ?",
                params![to_db_time(&now), session_id],
            )
            .map_err(storage_err("Failed to reset timer"))?;

        if changed == 0 {
            return Ok(None);
        }
        Self::read_timer(&conn, session_id)
    }

    // ── Idea log ────────────────────────────────────────────────────

    /// Append ideas to a session's log, returning the merged list
    pub fn append_ideas(
        &self,
        session_id: &str,
        ideas: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err("Failed to start transaction"))?;

        let existing = Self::read_ideas(&tx, session_id)?.unwrap_or_default();
        let merged = merge_ideas(&existing, ideas);
        let json = serde_json::to_string(&merged)?;

        tx.execute(
            "INSERT INTO randomization_ideas (session_id, ideas, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                ideas = excluded.ideas,
                updated_at = excluded.updated_at",
            params![session_id, json, to_db_time(&now)],
        )
        .map_err(storage_err("Failed to save ideas"))?;

        tx.commit()
            .map_err(storage_err("Failed to commit transaction"))?;

        Ok(merged)
    }

    fn read_ideas(conn: &Connection, session_id: &str) -> Result<Option<Vec<String>>> {
        let json: Option<String> = conn
            .query_row(
                "SELECT ideas FROM randomization_ideas WHERE session_id = ?",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err("Failed to query ideas"))?;

        json.map(|j| serde_json::from_str(&j).map_err(Into::into))
            .transpose()
    }

    /// Load a session's idea log
    pub fn load_ideas(&self, session_id: &str) -> Result<Option<Vec<String>>> {
        let conn = self.open()?;
        Self::read_ideas(&conn, session_id)
    }
}
