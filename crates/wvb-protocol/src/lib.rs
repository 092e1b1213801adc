//! WebView Bridge Protocol
//!
//! This crate defines everything that crosses the native/script boundary:
//!
//! - **Value model** (`Value`) - the single JSON value type used for every payload
//! - **Wire constants** (`wire`) - handler names, prefixes and internal method names
//! - **Messages** (`CallInfo`, `InboundMessage`, `ReturnValue`, `Envelope`)
//! - **Script builders** (`script`) - the JavaScript snippets injected into the page
//! - **Percent-encoding** (`encoding`) - escaping used for reply delivery
//!
//! It is the **single source of truth** for the wire contract shared with the
//! in-page bridge library. Nothing here touches a script engine; the runtime
//! lives in `wvb-bridge`.
//!
//! # Message Shapes
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | native → script | `{"method": string, "callbackId": int, "data": string}` |
//! | script → native (async) | `{"method": string, "arg": string}`, `arg` = `{"data": any, "_dscbstub": string}` |
//! | script → native (sync) | prompt `"_dsbridge=<method>"` + text `{"data": any}` |
//! | native → script (reply) | `{"code": 0 \| -1, "data": any}` |
//!
//! # Usage
//!
//! ```rust
//! use wvb_protocol::{CallInfo, Value};
//!
//! let args = Value::Array(vec![Value::from("AAA")]);
//! let call = CallInfo::new("foo.bar", 1, &args);
//! assert_eq!(call.data, r#"["AAA"]"#);
//! ```

pub mod any;
pub mod encoding;
pub mod error;
pub mod message;
pub mod script;
pub mod value;
pub mod wire;

// Convenient re-exports at crate root
pub use error::CodecError;
pub use message::{CallInfo, CallbackId, Envelope, InboundMessage, ReturnValue, ScriptError};
pub use value::{Map, Value};
