//! WebView Bridge Runtime
//!
//! This crate runs on the host's UI thread and connects native code to the
//! JavaScript running in an embedded web view.
//!
//! ## Module Structure
//!
//! - `bridge` - the `Bridge` handle: registration, outbound calls, inbound dispatch, lifecycle
//! - `registry` - method table, name validation and stale-target purging
//! - `calls` - callback IDs, readiness state, startup queue and pending completions
//! - `reply` - `AsyncReply`, the completion handed to asynchronous handlers
//! - `engine` - the `ScriptEngine` seam to the embedding toolkit
//! - `target` - weak handles binding handlers to an owning object
//! - `config` - runtime configuration
//! - `error` - `BridgeError`
//! - `testing` - in-memory `ScriptEngine` for tests
//!
//! ## Architecture
//!
//! ```text
//!   native code                                        web page
//!   ───────────                                        ────────
//!   bridge.call() ──► calls (queue until ready) ──► engine.evaluate(dispatch script)
//!                                                        │
//!   completion ◄── _dsb.returnValue ◄── handle_message ◄─┘ (reply)
//!
//!   handler ◄── registry ◄── handle_message / handle_prompt ◄── page call
//!      │
//!      └──► AsyncReply ──► reply queue ──► poll() ──► engine.evaluate(callback script)
//! ```
//!
//! The bridge never blocks except on the synchronous prompt channel, which
//! mirrors the blocking primitive the page uses.
//!
//! ## Threading
//!
//! `Bridge` is `!Send`: it lives on the thread that owns the script engine.
//! Asynchronous handlers may finish their work anywhere; `AsyncReply` is
//! `Send`, and its result is applied on the owner thread by `Bridge::poll`.

mod bridge;
mod calls;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod reply;
pub mod target;
pub mod testing;

pub use bridge::{Bridge, WeakBridge};
pub use calls::{CallResult, Completion};
pub use config::BridgeConfig;
pub use engine::{EngineError, ScriptEngine};
pub use error::{BridgeError, HandlerResult, Result};
pub use reply::AsyncReply;
pub use target::{LivenessFlag, TargetHandle};

// Re-export the protocol crate for convenience
pub use wvb_protocol as protocol;
pub use wvb_protocol::{CallbackId, Value};
