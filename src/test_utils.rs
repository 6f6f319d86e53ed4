//! Test utilities for Limitlab
//!
//! Shared fixtures for unit tests: a service over a throwaway database and
//! a terse submission builder.

use crate::activity::StudentSubmission;
use crate::config::TimerConfig;
use crate::error::Result;
use crate::service::ActivityService;
use crate::storage::SqliteStorage;
use std::sync::Arc;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Service backed by a fresh database inside a temp directory.
///
/// Keep the returned `TempDir` alive for as long as the service is used.
pub fn test_service() -> (ActivityService, TempDir) {
    let dir = temp_dir();
    let storage =
        SqliteStorage::new_with_path(dir.path().join("limitlab.db")).expect("Failed to open storage");
    (
        ActivityService::new(Arc::new(storage), TimerConfig::default()),
        dir,
    )
}

/// Submission carrying just the two ids; fill the rest with struct update syntax
pub fn submission(session_id: &str, student_id: &str) -> StudentSubmission {
    StudentSubmission {
        session_id: Some(session_id.to_string()),
        student_id: Some(student_id.to_string()),
        ..Default::default()
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error to contain '{}', but got '{}'",
                expected,
                msg
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_service_starts_empty() {
        let (service, _dir) = test_service();
        assert!(service.storage().list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> =
            Err(crate::error::LimitlabError::Validation("bad option".to_string()).into());
        assert_error_contains(result, "bad option");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_panics_on_ok() {
        let result: Result<i32> = Ok(42);
        assert_error_contains(result, "error");
    }
}
