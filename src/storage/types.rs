use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::SessionType;

/// Metadata for a stored session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    /// Unique identifier for the session
    pub session_id: String,
    /// Individual or group activity
    pub session_type: SessionType,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last written
    pub updated_at: DateTime<Utc>,
    /// Number of student records in the session
    pub student_count: usize,
}

/// Outcome of a bulk or single delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted_count: usize,
    pub total_students_deleted: usize,
}
