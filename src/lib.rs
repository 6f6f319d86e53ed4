//! Limitlab - classroom activity backend
//!
//! Students choose how to compromise on a stated experimental limitation,
//! justify the choice within a session-wide countdown, then critique an
//! anonymized peer's answer. Instructors read aggregate results.
//!
//! # Architecture
//!
//! - `activity`: domain model (options, students, sessions, peer selection, timer math)
//! - `storage`: SQLite persistence with transactional read-modify-write
//! - `service`: the operations shared by the HTTP API and the CLI
//! - `api`: axum router and handlers
//! - `commands`: CLI command handlers
//! - `config`, `logging`, `error`, `cli`: ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use limitlab::{ActivityService, Config};
//! use limitlab::storage::SqliteStorage;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load("config/config.yaml", &Default::default())?;
//! config.validate()?;
//!
//! let storage = Arc::new(SqliteStorage::new(&config.storage)?);
//! let service = ActivityService::new(storage, config.timer.clone());
//! let session = service.get_session("demo")?;
//! println!("{} students", session.students.len());
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod storage;

pub use activity::{CompromiseOption, Session, Student};
pub use config::Config;
pub use error::{LimitlabError, Result};
pub use service::ActivityService;

#[cfg(test)]
pub mod test_utils;
