//! Script engine abstraction.
//!
//! The bridge never talks to a web view directly. The embedding toolkit
//! implements [`ScriptEngine`] and the bridge hands it script text.

use std::rc::Rc;

use thiserror::Error;

/// Failure reported by the embedding toolkit while evaluating script.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("script evaluation failed: {0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Script evaluation capability of a web view.
///
/// Both operations are fire-and-forget from the bridge's point of view:
/// results of evaluated scripts are never read back, and errors are only
/// logged.
pub trait ScriptEngine {
    /// Evaluate script text in the page's main frame.
    fn evaluate(&self, script: &str) -> Result<(), EngineError>;

    /// Install a script that runs at document start on every future page load.
    ///
    /// Engines without that capability may ignore it.
    fn add_document_start_script(&self, _script: &str) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<E: ScriptEngine + ?Sized> ScriptEngine for Rc<E> {
    fn evaluate(&self, script: &str) -> Result<(), EngineError> {
        (**self).evaluate(script)
    }

    fn add_document_start_script(&self, script: &str) -> Result<(), EngineError> {
        (**self).add_document_start_script(script)
    }
}

impl<E: ScriptEngine + ?Sized> ScriptEngine for Box<E> {
    fn evaluate(&self, script: &str) -> Result<(), EngineError> {
        (**self).evaluate(script)
    }

    fn add_document_start_script(&self, script: &str) -> Result<(), EngineError> {
        (**self).add_document_start_script(script)
    }
}
