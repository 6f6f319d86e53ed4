//! Activity operations shared by the HTTP API and the CLI.
//!
//! Each method is synchronous and touches SQLite; async callers run them on
//! the blocking pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::activity::ideas::parse_ideas;
use crate::activity::moderation::remove_keysmash;
use crate::activity::{
    option_chart, result_rows, select_peer, ChartEntry, CompromiseOption, LimitSlot,
    PeerSelection, ResultRow, ReviewRequest, Session, SessionTimer, SessionType, Student,
    StudentSubmission, SubmitAction, TimerStart, TimerStatus,
};
use crate::config::TimerConfig;
use crate::error::{LimitlabError, Result};
use crate::storage::{DeleteSummary, SqliteStorage};

/// Outcome of a submit step
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub session_id: String,
    pub action: SubmitAction,
    pub student: Student,
    pub updated_fields: Vec<&'static str>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of recording a critique
#[derive(Debug, Clone)]
pub struct ExplanationOutcome {
    pub slot: LimitSlot,
    pub student: Student,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a confirmed delete
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub message: String,
    pub session_id: Option<String>,
    pub summary: DeleteSummary,
}

/// Outcome of saving randomization ideas
#[derive(Debug, Clone)]
pub struct IdeasOutcome {
    pub ideas: Vec<String>,
    pub timer: TimerStart,
}

/// Chart and table data for the results dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub session_id: String,
    pub total_students: usize,
    pub chart: Vec<ChartEntry>,
    pub selected_option: Option<CompromiseOption>,
    pub rows: Vec<ResultRow>,
}

/// Figures from a keysmash cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub sessions_processed: usize,
    pub sessions_modified: usize,
    pub students_processed: usize,
    pub students_removed: usize,
    pub dry_run: bool,
}

fn not_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Entry point for every activity operation
pub struct ActivityService {
    storage: Arc<SqliteStorage>,
    timer: TimerConfig,
}

impl ActivityService {
    pub fn new(storage: Arc<SqliteStorage>, timer: TimerConfig) -> Self {
        Self { storage, timer }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn timer_config(&self) -> &TimerConfig {
        &self.timer
    }

    /// Create or update a student from a submit step.
    ///
    /// Sessions are created lazily as `individual`. A request carrying only
    /// a critique must target an existing student.
    pub fn submit(&self, submission: StudentSubmission) -> Result<SubmitOutcome> {
        let valid = submission.validate()?;
        let now = Utc::now();
        let explanation_only = valid.is_explanation_only();
        let updated_fields = valid.updated_fields();

        let (action, student) = self.storage.modify_session(&valid.session_id, |slot| {
            if slot.is_none() && explanation_only {
                return Err(LimitlabError::NotFound(
                    "Cannot create new session with only limitExplanation. Session must exist."
                        .to_string(),
                )
                .into());
            }
            let session = slot.get_or_insert_with(|| {
                Session::new(valid.session_id.clone(), SessionType::Individual, now)
            });

            if explanation_only && session.student(&valid.student_id).is_none() {
                return Err(LimitlabError::NotFound(
                    "Cannot create new student with only limitExplanation. Student must exist in session."
                        .to_string(),
                )
                .into());
            }

            let (action, student) = session.upsert_student(&valid, now);
            Ok((action, student.clone()))
        })?;

        tracing::info!(
            session_id = %valid.session_id,
            student_id = %valid.student_id,
            %action,
            fields = ?updated_fields,
            "student submission saved"
        );

        Ok(SubmitOutcome {
            session_id: valid.session_id,
            action,
            student,
            updated_fields,
            updated_at: now,
        })
    }

    /// Store a critique in the displayed student's next free slot
    pub fn record_limit_explanation(
        &self,
        session_id: Option<&str>,
        student_id: Option<&str>,
        text: Option<&str>,
    ) -> Result<ExplanationOutcome> {
        let (Some(session_id), Some(student_id)) = (not_blank(session_id), not_blank(student_id))
        else {
            return Err(LimitlabError::Validation(
                "Missing required fields: sessionId and studentId are required".to_string(),
            )
            .into());
        };
        let Some(text) = text else {
            return Err(LimitlabError::Validation(
                "limitExplanation is required for this operation".to_string(),
            )
            .into());
        };

        let now = Utc::now();
        let (slot, student) = self.storage.modify_session(session_id, |slot| {
            let session = slot
                .as_mut()
                .ok_or_else(|| LimitlabError::NotFound("Session not found".to_string()))?;
            let student = session
                .student_mut(student_id)
                .ok_or_else(|| LimitlabError::NotFound("Student not found in session".to_string()))?;
            let written = student.record_limit_explanation(text, now);
            Ok((written, student.clone()))
        })?;

        tracing::info!(
            session_id,
            student_id,
            field = %slot.field,
            "limit explanation recorded"
        );

        Ok(ExplanationOutcome {
            slot,
            student,
            updated_at: now,
        })
    }

    /// Load a session or fail with a not-found error
    pub fn get_session(&self, session_id: &str) -> Result<Session> {
        self.storage
            .load_session(session_id)?
            .ok_or_else(|| LimitlabError::NotFound(format!("Session '{session_id}' not found")).into())
    }

    /// Pre-create an empty session with a fresh id
    pub fn create_session(&self, session_type: SessionType) -> Result<Session> {
        let session = Session::new(uuid::Uuid::new_v4().to_string(), session_type, Utc::now());
        self.storage.create_session(&session)?;
        tracing::info!(session_id = %session.session_id, %session_type, "session created");
        Ok(session)
    }

    /// Delete one session, or all of them when `session_id` is `None`.
    ///
    /// Nothing is deleted unless `confirm` is set.
    pub fn delete(&self, session_id: Option<&str>, confirm: bool) -> Result<DeleteOutcome> {
        let session_id = not_blank(session_id);

        if !confirm {
            let (message, warning) = match session_id {
                Some(id) => (
                    format!("Confirmation required. Add ?confirm=true to delete session '{id}'."),
                    format!("This action will permanently delete session '{id}' and all its student data."),
                ),
                None => (
                    "Confirmation required. Add ?confirm=true to delete all sessions.".to_string(),
                    "This action will permanently delete ALL session data and cannot be undone."
                        .to_string(),
                ),
            };
            return Err(LimitlabError::ConfirmationRequired { message, warning }.into());
        }

        match session_id {
            Some(id) => {
                let summary = self
                    .storage
                    .delete_session(id)?
                    .ok_or_else(|| LimitlabError::NotFound(format!("Session '{id}' not found")))?;
                tracing::info!(
                    session_id = id,
                    students = summary.total_students_deleted,
                    "session deleted"
                );
                Ok(DeleteOutcome {
                    message: format!("Session '{id}' deleted successfully"),
                    session_id: Some(id.to_string()),
                    summary,
                })
            }
            None => {
                let summary = self.storage.delete_all_sessions()?;
                let message = if summary.deleted_count == 0 {
                    "No sessions found to delete"
                } else {
                    "All sessions deleted successfully"
                };
                tracing::info!(
                    sessions = summary.deleted_count,
                    students = summary.total_students_deleted,
                    "all sessions deleted"
                );
                Ok(DeleteOutcome {
                    message: message.to_string(),
                    session_id: None,
                    summary,
                })
            }
        }
    }

    /// Current countdown state for a session
    pub fn timer_status(&self, session_id: &str) -> Result<TimerStatus> {
        self.timer_status_at(session_id, Utc::now())
    }

    pub fn timer_status_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<TimerStatus> {
        Ok(match self.storage.load_timer(session_id)? {
            Some(timer) => timer.status(now, &self.timer),
            None => TimerStatus::not_started(self.timer.default_duration_seconds, &self.timer),
        })
    }

    /// Clear a session's start time
    pub fn reset_timer(&self, session_id: &str) -> Result<SessionTimer> {
        let timer = self
            .storage
            .reset_timer(session_id, Utc::now())?
            .ok_or_else(|| LimitlabError::NotFound("Session not found.".to_string()))?;
        tracing::info!(session_id, "timer reset");
        Ok(timer)
    }

    /// Append ideas to the session log and start the countdown if needed
    pub fn save_ideas(&self, session_id: Option<&str>, ideas: Option<&Value>) -> Result<IdeasOutcome> {
        let ideas = parse_ideas(ideas)?;
        let session_id = not_blank(session_id).ok_or_else(|| {
            LimitlabError::Validation("Missing or invalid sessionID.".to_string())
        })?;

        let now = Utc::now();
        let timer = self
            .storage
            .start_timer(session_id, now, self.timer.default_duration_seconds)?;
        if timer.started {
            tracing::info!(session_id, "countdown started");
        }

        let ideas = self.storage.append_ideas(session_id, &ideas, now)?;
        tracing::info!(session_id, total = ideas.len(), "randomization ideas saved");

        Ok(IdeasOutcome { ideas, timer })
    }

    /// Pick an answer for the reviewer to critique
    pub fn peer_response(&self, session_id: &str, request: &ReviewRequest) -> Result<PeerSelection> {
        self.peer_response_with(session_id, request, &mut rand::rng())
    }

    pub fn peer_response_with<R: Rng + ?Sized>(
        &self,
        session_id: &str,
        request: &ReviewRequest,
        rng: &mut R,
    ) -> Result<PeerSelection> {
        let session = self.get_session(session_id)?;
        Ok(select_peer(&session.students, request, rng))
    }

    /// Dashboard chart plus table rows for one option tab
    pub fn results(&self, session_id: &str, option: Option<CompromiseOption>) -> Result<ResultsView> {
        let session = self.get_session(session_id)?;
        Ok(ResultsView {
            session_id: session.session_id.clone(),
            total_students: session.students.len(),
            chart: option_chart(&session.students),
            selected_option: option,
            rows: result_rows(&session.students, option),
        })
    }

    /// Remove keysmash responses from every session
    pub fn cleanup_keysmash(&self, dry_run: bool) -> Result<CleanupReport> {
        let mut report = CleanupReport {
            dry_run,
            ..Default::default()
        };

        for stored in self.storage.list_sessions()? {
            report.sessions_processed += 1;

            let (processed, removed) = self.storage.modify_session(&stored.session_id, |slot| {
                let Some(session) = slot.as_mut() else {
                    return Ok((0, Vec::new()));
                };
                let processed = session.students.len();
                let mut candidate = session.clone();
                let removed = remove_keysmash(&mut candidate);
                if !dry_run {
                    *session = candidate;
                }
                Ok((processed, removed))
            })?;

            report.students_processed += processed;
            if !removed.is_empty() {
                report.sessions_modified += 1;
                report.students_removed += removed.len();
                for student in &removed {
                    tracing::info!(
                        session_id = %stored.session_id,
                        student_id = %student.student_id,
                        response = student.response.as_deref().unwrap_or_default(),
                        dry_run,
                        "keysmash response removed"
                    );
                }
            }
        }

        Ok(report)
    }
}
