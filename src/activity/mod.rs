//! Domain model of the limitation/compromise activity
//!
//! Everything here is plain data plus pure functions over it: time and
//! randomness are passed in, and persistence lives in [`crate::storage`].

pub mod ideas;
pub mod moderation;
pub mod option;
pub mod peer;
pub mod results;
pub mod session;
pub mod student;
pub mod timer;

pub use option::CompromiseOption;
pub use peer::{select_peer, PeerSelection, ReviewRequest, SelectionSource};
pub use results::{option_chart, result_rows, ChartEntry, ResultRow};
pub use session::{Session, SessionAnalytics, SessionType, SubmitAction};
pub use student::{LimitSlot, Student, StudentSubmission, ValidSubmission};
pub use timer::{SessionTimer, TimerStart, TimerStatus};
