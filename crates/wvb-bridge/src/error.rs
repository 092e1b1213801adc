//! Error types for the bridge runtime.

use thiserror::Error;
use wvb_protocol::{CodecError, ScriptError, Value};

/// Result type alias using the bridge error type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// What a synchronous handler returns: an optional value or an error.
pub type HandlerResult = std::result::Result<Option<Value>, BridgeError>;

/// Errors produced by the bridge.
///
/// Dispatch errors (`MethodNotFound` through `Handler`) are turned into
/// `{code: -1}` envelopes for the page. Call errors (`Serialization` through
/// `Script`) reach native callers through their completion.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BridgeError {
    /// No handler registered under the name
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// The handler's owning object no longer exists
    #[error("Method handler target has been deallocated: {0}")]
    TargetDeallocated(String),

    /// An async handler was invoked through the synchronous channel
    #[error("Async method cannot be called synchronously: {0}")]
    AsyncCalledSynchronously(String),

    /// The handler itself failed
    #[error("{0}")]
    Handler(String),

    /// Arguments or results could not be encoded as JSON
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A JSON value did not match the requested Rust type
    #[error("Type conversion failed: {0}")]
    TypeConversion(String),

    /// The call was voided by a page navigation
    #[error("Page navigation occurred, JavaScript call cancelled")]
    Cancelled,

    /// The page reported an exception
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// A reply stub that is not a plain script identifier
    #[error("Invalid callback stub: {0}")]
    InvalidCallbackStub(String),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BridgeError {
    /// Create a handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion(message.into())
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Check if the call was cancelled by navigation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BridgeError::Cancelled)
    }

    /// Check if this error arose while resolving or running an inbound call.
    pub fn is_dispatch_error(&self) -> bool {
        matches!(
            self,
            BridgeError::MethodNotFound(_)
                | BridgeError::TargetDeallocated(_)
                | BridgeError::AsyncCalledSynchronously(_)
                | BridgeError::Handler(_)
        )
    }
}

impl From<CodecError> for BridgeError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Encode(msg) => Self::Serialization(msg),
            CodecError::Decode(msg) => Self::TypeConversion(msg),
        }
    }
}

impl From<String> for BridgeError {
    fn from(value: String) -> Self {
        Self::Handler(value)
    }
}

impl From<&str> for BridgeError {
    fn from(value: &str) -> Self {
        Self::Handler(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_messages() {
        assert_eq!(
            BridgeError::MethodNotFound(String::from("nonExistentMethod")).to_string(),
            "Method not found: nonExistentMethod"
        );
        assert_eq!(
            BridgeError::TargetDeallocated(String::from("testMethod")).to_string(),
            "Method handler target has been deallocated: testMethod"
        );
        assert_eq!(
            BridgeError::AsyncCalledSynchronously(String::from("fetch")).to_string(),
            "Async method cannot be called synchronously: fetch"
        );
        assert_eq!(BridgeError::handler("boom").to_string(), "boom");
    }

    #[test]
    fn test_codec_error_mapping() {
        let err: BridgeError = CodecError::decode("expected u32").into();
        assert!(matches!(err, BridgeError::TypeConversion(_)));
        let err: BridgeError = CodecError::encode("key must be a string").into();
        assert!(matches!(err, BridgeError::Serialization(_)));
    }

    #[test]
    fn test_script_error_description() {
        let err = BridgeError::from(ScriptError {
            name: String::from("Error"),
            message: String::from("boom"),
            stack: String::from("at main.js:1"),
        });
        assert_eq!(err.to_string(), "name: Error\nmessage: boom\nstack: at main.js:1");
        assert!(!err.is_dispatch_error());
    }

    #[test]
    fn test_predicates() {
        assert!(BridgeError::Cancelled.is_cancelled());
        assert!(!BridgeError::handler("x").is_cancelled());
        assert!(BridgeError::MethodNotFound(String::new()).is_dispatch_error());
        assert!(!BridgeError::Cancelled.is_dispatch_error());
    }
}
