//! Test support.
//!
//! Provides a script engine that records instead of evaluating, so the
//! bridge can be exercised without a web view.

mod recording_engine;

pub use recording_engine::RecordingEngine;
