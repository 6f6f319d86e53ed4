//! Sessions: one classroom activity instance and its students.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::option::CompromiseOption;
use super::student::{Student, ValidSubmission};

/// How the activity is run
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Individual,
    Group,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Individual => f.write_str("individual"),
            SessionType::Group => f.write_str("group"),
        }
    }
}

/// One classroom activity instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub session_type: SessionType,
    pub students: Vec<Student>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a submit created or updated the student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitAction {
    Created,
    Updated,
}

impl fmt::Display for SubmitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitAction::Created => f.write_str("created"),
            SubmitAction::Updated => f.write_str("updated"),
        }
    }
}

impl Session {
    /// An empty session
    pub fn new(session_id: impl Into<String>, session_type: SessionType, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            session_type,
            students: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.student_id == student_id)
    }

    pub fn student_mut(&mut self, student_id: &str) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| s.student_id == student_id)
    }

    /// Create or update the submitting student. The caller has already
    /// rejected explanation-only submissions for unknown students.
    pub fn upsert_student(
        &mut self,
        submission: &ValidSubmission,
        now: DateTime<Utc>,
    ) -> (SubmitAction, &Student) {
        match self
            .students
            .iter()
            .position(|s| s.student_id == submission.student_id)
        {
            Some(idx) => {
                submission.apply_to(&mut self.students[idx], now);
                (SubmitAction::Updated, &self.students[idx])
            }
            None => {
                self.students.push(submission.new_student(now));
                let last = self.students.len() - 1;
                (SubmitAction::Created, &self.students[last])
            }
        }
    }

    /// Aggregate figures for the session view
    pub fn analytics(&self) -> SessionAnalytics {
        SessionAnalytics::from_students(&self.students)
    }
}

/// Aggregates shown alongside a full session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    /// Count per chosen option; options nobody picked are absent
    pub option_breakdown: BTreeMap<CompromiseOption, usize>,
    pub timer_stats: TimerStats,
    pub response_stats: ResponseStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    pub within_timer: usize,
    pub outside_timer: usize,
    pub total: usize,
    pub percentage_within_timer: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStats {
    pub with_response: usize,
    pub without_response: usize,
    pub total: usize,
    /// Mean character count over non-empty responses
    pub average_response_length: usize,
}

impl SessionAnalytics {
    pub fn from_students(students: &[Student]) -> Self {
        let total = students.len();

        let mut option_breakdown = BTreeMap::new();
        for option in students.iter().filter_map(|s| s.option) {
            *option_breakdown.entry(option).or_insert(0) += 1;
        }

        let within = students.iter().filter(|s| s.within_timer).count();
        let percentage_within_timer = if total > 0 {
            ((within as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };

        let with_response = students.iter().filter(|s| s.has_response()).count();
        let lengths: Vec<usize> = students
            .iter()
            .filter_map(|s| s.response.as_deref())
            .map(|r| r.chars().count())
            .filter(|&len| len > 0)
            .collect();
        let average_response_length = if lengths.is_empty() {
            0
        } else {
            (lengths.iter().sum::<usize>() as f64 / lengths.len() as f64).round() as usize
        };

        Self {
            option_breakdown,
            timer_stats: TimerStats {
                within_timer: within,
                outside_timer: total - within,
                total,
                percentage_within_timer,
            },
            response_stats: ResponseStats {
                with_response,
                without_response: total - with_response,
                total,
                average_response_length,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::student::StudentSubmission;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn valid(student: &str, option: Option<&str>, response: Option<&str>) -> ValidSubmission {
        StudentSubmission {
            session_id: Some("s1".to_string()),
            student_id: Some(student.to_string()),
            option: option.map(String::from),
            response: response.map(String::from),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let mut session = Session::new("s1", SessionType::Individual, now());

        let (action, _) =
            session.upsert_student(&valid("a", Some("Compromise option 1."), None), now());
        assert_eq!(action, SubmitAction::Created);

        let (action, student) =
            session.upsert_student(&valid("a", None, Some("because")), now());
        assert_eq!(action, SubmitAction::Updated);
        assert_eq!(student.response.as_deref(), Some("because"));
        assert_eq!(student.option, Some(CompromiseOption::PilotStudy));
        assert_eq!(session.students.len(), 1);
    }

    #[test]
    fn test_upsert_keeps_one_record_per_student() {
        let mut session = Session::new("s1", SessionType::Group, now());
        for id in ["a", "b", "a", "b", "c"] {
            session.upsert_student(&valid(id, Some("Compromise option 2."), None), now());
        }
        assert_eq!(session.students.len(), 3);
    }

    #[test]
    fn test_updating_last_student_reports_updated() {
        let mut session = Session::new("s1", SessionType::Individual, now());
        session.upsert_student(&valid("a", Some("Compromise option 2."), None), now());
        session.upsert_student(&valid("b", Some("Compromise option 1."), None), now());
        let (action, _) = session.upsert_student(&valid("b", None, Some("r")), now());
        assert_eq!(action, SubmitAction::Updated);
    }

    #[test]
    fn test_analytics_empty_session() {
        let a = SessionAnalytics::from_students(&[]);
        assert!(a.option_breakdown.is_empty());
        assert_eq!(a.timer_stats.percentage_within_timer, 0);
        assert_eq!(a.response_stats.average_response_length, 0);
    }

    #[test]
    fn test_analytics_counts() {
        let mut session = Session::new("s1", SessionType::Individual, now());
        session.upsert_student(&valid("a", Some("Compromise option 1."), Some("abcd")), now());
        session.upsert_student(&valid("b", Some("Compromise option 1."), Some("ab")), now());
        session.upsert_student(&valid("c", Some("Set this experiment aside."), Some("   ")), now());
        session.students[2].within_timer = false;

        let a = session.analytics();
        assert_eq!(a.option_breakdown.get(&CompromiseOption::PilotStudy), Some(&2));
        assert_eq!(a.option_breakdown.get(&CompromiseOption::SetAside), Some(&1));
        assert!(!a.option_breakdown.contains_key(&CompromiseOption::Other));

        assert_eq!(a.timer_stats.within_timer, 2);
        assert_eq!(a.timer_stats.outside_timer, 1);
        assert_eq!(a.timer_stats.percentage_within_timer, 67);

        assert_eq!(a.response_stats.with_response, 2);
        assert_eq!(a.response_stats.without_response, 1);
        // (4 + 2 + 3) / 3
        assert_eq!(a.response_stats.average_response_length, 3);
    }

    #[test]
    fn test_option_breakdown_serializes_with_wire_keys() {
        let mut session = Session::new("s1", SessionType::Individual, now());
        session.upsert_student(&valid("a", Some("Compromise option 2."), None), now());
        let json = serde_json::to_value(session.analytics()).unwrap();
        assert_eq!(json["optionBreakdown"]["Compromise option 2."], 1);
        assert_eq!(json["timerStats"]["percentageWithinTimer"], 100);
    }

    #[test]
    fn test_session_type_serde() {
        assert_eq!(
            serde_json::to_string(&SessionType::Group).unwrap(),
            "\"group\""
        );
        assert_eq!(SessionType::default(), SessionType::Individual);
    }
}
