//! Command handlers invoked by the CLI entrypoint.
//!
//! - `serve`    runs the HTTP API
//! - `sessions` lists, shows, creates, and deletes sessions
//! - `cleanup`  removes keysmash responses

pub mod cleanup;
pub mod serve;
pub mod sessions;

pub use cleanup::handle_cleanup;
pub use serve::run_serve;
pub use sessions::handle_sessions;
