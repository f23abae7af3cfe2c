//! Console host for the frontdesk assistant.
//!
//! Runs the desk over stdin/stdout: one JSON event per input line, one JSON
//! transport call per output line. Logs go to stderr.

pub mod config;
pub mod console;
