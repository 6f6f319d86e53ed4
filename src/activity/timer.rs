//! Session-wide submission countdown.
//!
//! A timer starts the first time a session reports an idea submission and
//! keeps that start time until an admin resets it. Status is derived from
//! wall-clock subtraction on every read; nothing is pushed to clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TimerConfig;

/// Stored countdown state for one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTimer {
    pub session_id: String,
    pub timer_start_time: Option<DateTime<Utc>>,
    pub timer_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a start request
#[derive(Debug, Clone, PartialEq)]
pub struct TimerStart {
    pub timer: SessionTimer,
    /// True only for the request that actually set the start time
    pub started: bool,
}

/// What polling clients receive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub is_active: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    /// Whole seconds left, rounded up; zero once expired or not started
    pub remaining_seconds: i64,
    /// Suggested delay before the next poll
    pub poll_interval_seconds: u64,
}

impl TimerStatus {
    /// Status of a session whose countdown has not begun
    pub fn not_started(duration_seconds: i64, config: &TimerConfig) -> Self {
        Self {
            is_active: false,
            start_time: None,
            duration_seconds,
            remaining_seconds: 0,
            poll_interval_seconds: config.poll_interval_pending_seconds,
        }
    }
}

impl SessionTimer {
    /// Milliseconds until expiry; negative once expired
    pub fn remaining_millis(&self, now: DateTime<Utc>) -> Option<i64> {
        let start = self.timer_start_time?;
        let elapsed = (now - start).num_milliseconds();
        Some(
            self.timer_duration_seconds
                .saturating_mul(1000)
                .saturating_sub(elapsed),
        )
    }

    pub fn status(&self, now: DateTime<Utc>, config: &TimerConfig) -> TimerStatus {
        let Some(remaining_ms) = self.remaining_millis(now) else {
            return TimerStatus::not_started(self.timer_duration_seconds, config);
        };

        let remaining_seconds = if remaining_ms > 0 {
            remaining_ms.saturating_add(999) / 1000
        } else {
            0
        };

        TimerStatus {
            is_active: remaining_ms > 0,
            start_time: self.timer_start_time,
            duration_seconds: self.timer_duration_seconds,
            remaining_seconds,
            poll_interval_seconds: config.poll_interval_started_seconds,
        }
    }
}

/// Format seconds as `MM:SS`, the way the countdown is displayed.
pub fn format_countdown(seconds: i64) -> String {
    let s = seconds.max(0);
    format!("{:02}:{:02}", s / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn timer(started: bool) -> SessionTimer {
        SessionTimer {
            session_id: "s1".to_string(),
            timer_start_time: started.then(start),
            timer_duration_seconds: 90,
            created_at: start(),
            updated_at: start(),
        }
    }

    #[test]
    fn test_not_started_reports_inactive_with_pending_poll() {
        let cfg = TimerConfig::default();
        let status = timer(false).status(start(), &cfg);
        assert!(!status.is_active);
        assert!(status.start_time.is_none());
        assert_eq!(status.duration_seconds, 90);
        assert_eq!(status.poll_interval_seconds, 5);
    }

    #[test]
    fn test_active_within_duration() {
        let cfg = TimerConfig::default();
        let status = timer(true).status(start() + Duration::milliseconds(30_500), &cfg);
        assert!(status.is_active);
        assert_eq!(status.remaining_seconds, 60);
        assert_eq!(status.poll_interval_seconds, 30);
    }

    #[test]
    fn test_expires_exactly_at_duration() {
        let cfg = TimerConfig::default();
        let t = timer(true);
        assert!(t.status(start() + Duration::milliseconds(89_999), &cfg).is_active);
        let expired = t.status(start() + Duration::seconds(90), &cfg);
        assert!(!expired.is_active);
        assert_eq!(expired.remaining_seconds, 0);
        assert_eq!(expired.start_time, Some(start()));
    }

    #[test]
    fn test_long_expired_never_goes_negative() {
        let cfg = TimerConfig::default();
        let status = timer(true).status(start() + Duration::hours(3), &cfg);
        assert_eq!(status.remaining_seconds, 0);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let cfg = TimerConfig::default();
        let json = serde_json::to_value(timer(false).status(start(), &cfg)).unwrap();
        assert_eq!(json["isActive"], false);
        assert!(json["startTime"].is_null());
        assert_eq!(json["durationSeconds"], 90);
        assert_eq!(json["pollIntervalSeconds"], 5);
    }

    #[test]
    fn test_huge_duration_saturates_instead_of_overflowing() {
        let cfg = TimerConfig::default();
        let mut t = timer(true);
        t.timer_duration_seconds = i64::MAX / 100;
        let status = t.status(start() + Duration::seconds(1), &cfg);
        assert!(status.is_active);
        assert!(status.remaining_seconds > 0);
        assert_eq!(status.remaining_seconds, i64::MAX / 1000);
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(90), "01:30");
        assert_eq!(format_countdown(5), "00:05");
        assert_eq!(format_countdown(-3), "00:00");
    }
}
