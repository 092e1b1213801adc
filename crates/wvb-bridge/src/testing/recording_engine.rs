//! In-memory script engine for testing.

use std::cell::RefCell;
use std::rc::Rc;

use wvb_protocol::encoding::percent_decode;
use wvb_protocol::script::extract_encoded_reply;
use wvb_protocol::{wire, CallInfo, Envelope};

use crate::engine::{EngineError, ScriptEngine};

#[derive(Default)]
struct Recorded {
    /// Evaluated scripts, in order
    scripts: Vec<String>,
    /// Installed document-start scripts
    document_start: Vec<String>,
    /// Refuse every evaluation when set
    failing: bool,
}

/// Script engine that records every script it is given.
///
/// Clones share the same record, so a test can keep one clone and hand
/// another to the bridge.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    recorded: Rc<RefCell<Recorded>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// All evaluated scripts.
    pub fn scripts(&self) -> Vec<String> {
        self.recorded.borrow().scripts.clone()
    }

    /// Evaluated scripts, clearing the record.
    pub fn take_scripts(&self) -> Vec<String> {
        std::mem::take(&mut self.recorded.borrow_mut().scripts)
    }

    pub fn document_start_scripts(&self) -> Vec<String> {
        self.recorded.borrow().document_start.clone()
    }

    /// Make subsequent evaluations fail (they are still recorded).
    pub fn fail_evaluations(&self, failing: bool) {
        self.recorded.borrow_mut().failing = failing;
    }

    /// Native → script calls found among the evaluated scripts, in order.
    pub fn dispatched_calls(&self) -> Vec<CallInfo> {
        let prefix = format!("{}(", wire::NATIVE_DISPATCH_FUNCTION);
        self.recorded
            .borrow()
            .scripts
            .iter()
            .filter_map(|script| {
                let json = script.strip_prefix(&prefix)?.strip_suffix(')')?;
                serde_json::from_str(json).ok()
            })
            .collect()
    }

    /// Replies delivered to page callback stubs, as `(stub, envelope)`.
    pub fn callback_replies(&self) -> Vec<(String, Envelope)> {
        self.recorded
            .borrow()
            .scripts
            .iter()
            .filter_map(|script| {
                let body = script.strip_prefix("try {")?.trim_start();
                let stub = &body[..body.find('(')?];
                let decoded = percent_decode(extract_encoded_reply(script)?)?;
                let envelope: Envelope = serde_json::from_str(&decoded).ok()?;
                Some((stub.to_string(), envelope))
            })
            .collect()
    }
}

impl ScriptEngine for RecordingEngine {
    fn evaluate(&self, script: &str) -> Result<(), EngineError> {
        let mut recorded = self.recorded.borrow_mut();
        recorded.scripts.push(script.to_string());
        if recorded.failing {
            return Err(EngineError::new("evaluation disabled"));
        }
        Ok(())
    }

    fn add_document_start_script(&self, script: &str) -> Result<(), EngineError> {
        self.recorded.borrow_mut().document_start.push(script.to_string());
        Ok(())
    }
}
