//! Native → script calls.
//!
//! Calls issued before the page signals readiness wait in the startup queue.
//! A call's completion is recorded before the call is queued or transmitted,
//! so a reply can never arrive ahead of it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use wvb_protocol::{script, CallInfo, CallbackId, CodecError, ReturnValue, Value};

use super::Bridge;
use crate::calls::{CallResult, Completion};
use crate::engine::ScriptEngine;
use crate::error::{BridgeError, Result};

impl<E: ScriptEngine + 'static> Bridge<E> {
    /// Call a page method without waiting for its result.
    ///
    /// `args` travel as one JSON array. Returns the call's callback ID.
    pub fn call(&self, method: &str, args: Vec<Value>) -> CallbackId {
        self.issue(method, Value::Array(args).to_json_string(), None)
    }

    /// Call a page method; `completion` receives the result.
    pub fn call_with<F>(&self, method: &str, args: Vec<Value>, completion: F) -> CallbackId
    where
        F: FnMut(CallResult) + 'static,
    {
        self.issue(method, Value::Array(args).to_json_string(), Some(Box::new(completion)))
    }

    /// Call a page method with arguments of any serializable type.
    ///
    /// If the arguments cannot be encoded, `completion` receives
    /// [`BridgeError::Serialization`] immediately, nothing is sent and `None`
    /// is returned.
    pub fn call_serialize<A, F>(&self, method: &str, args: &[A], completion: F) -> Option<CallbackId>
    where
        A: Serialize,
        F: FnMut(CallResult) + 'static,
    {
        let mut completion = completion;
        match serde_json::to_string(args) {
            Ok(data) => Some(self.issue(method, data, Some(Box::new(completion)))),
            Err(e) => {
                log::warn!("[bridge] Failed to encode arguments for '{}': {}", method, e);
                completion(Err(CodecError::encode(e).into()));
                None
            }
        }
    }

    /// Call a page method and decode its result into `R`.
    ///
    /// A result that does not match `R` fails with
    /// [`BridgeError::TypeConversion`]. A missing result decodes from `null`.
    pub fn call_typed<R, F>(&self, method: &str, args: Vec<Value>, completion: F) -> CallbackId
    where
        R: DeserializeOwned,
        F: FnMut(Result<R>) + 'static,
    {
        let mut completion = completion;
        self.call_with(method, args, move |result| {
            completion(result.and_then(|value| Ok(value.unwrap_or_default().decode::<R>()?)))
        })
    }

    fn issue(&self, method: &str, data: String, completion: Option<Completion>) -> CallbackId {
        let call = {
            let mut calls = self.inner.calls.borrow_mut();
            let id = calls.next_id();
            if let Some(completion) = completion {
                calls.insert_pending(id, completion);
            }
            let call = CallInfo {
                method: method.to_string(),
                callback_id: id,
                data,
            };
            if !calls.is_ready() {
                if self.is_debug() {
                    log::debug!("[bridge] Queued '{}' (id={}) until page is ready", method, id);
                }
                calls.enqueue(call);
                return id;
            }
            call
        };
        self.transmit(&call);
        call.callback_id
    }

    /// Inject a call into the page.
    fn transmit(&self, call: &CallInfo) {
        let script = match script::dispatch_script(call) {
            Ok(script) => script,
            Err(e) => {
                let completion = self.inner.calls.borrow_mut().take_pending(call.callback_id);
                if let Some(mut completion) = completion {
                    completion(Err(e.into()));
                }
                return;
            }
        };
        if self.is_debug() {
            log::debug!("[bridge] -> {}", script);
        }
        if let Err(e) = self.inner.engine.evaluate(&script) {
            log::warn!(
                "[bridge] Failed to deliver call '{}' (id={}): {}",
                call.method,
                call.callback_id,
                e
            );
        }
    }

    /// Readiness signal from the page: flush the startup queue in order.
    pub(super) fn page_ready(&self) {
        let flushed = self.inner.calls.borrow_mut().mark_ready();
        if !flushed.is_empty() {
            log::debug!("[bridge] Page ready, flushing {} queued call(s)", flushed.len());
        }
        for call in &flushed {
            self.transmit(call);
        }
    }

    /// Correlate a page reply with its pending completion.
    ///
    /// Terminal replies remove the completion before invoking it, so a
    /// duplicate is a no-op. A partial reply (`complete: false`) keeps it,
    /// unless it carries a structured error, which always ends the call.
    pub(super) fn handle_return_value(&self, param: &Value) {
        let Some(reply) = ReturnValue::from_value(param) else {
            log::warn!("[bridge] Ignoring malformed return value: {}", param);
            return;
        };

        let (mut completion, epoch) = {
            let mut calls = self.inner.calls.borrow_mut();
            let epoch = calls.epoch();
            match calls.take_pending(reply.id) {
                Some(completion) => (completion, epoch),
                None => {
                    if self.is_debug() {
                        log::debug!("[bridge] No pending call for id={}", reply.id);
                    }
                    return;
                }
            }
        };

        let script_error = reply.script_error();
        let terminal = reply.complete || script_error.is_some();
        let result = match script_error {
            Some(e) => Err(BridgeError::Script(e)),
            None => Ok(reply.data),
        };
        completion(result);

        if !terminal {
            self.inner
                .calls
                .borrow_mut()
                .restore_pending(reply.id, completion, epoch);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::testing::RecordingEngine;

    fn ready_bridge() -> (Bridge<RecordingEngine>, RecordingEngine) {
        let engine = RecordingEngine::new();
        let bridge = Bridge::new(engine.clone());
        bridge.handle_message("_dsb.dsinit", "{}");
        (bridge, engine)
    }

    #[test]
    fn test_ready_call_transmits_immediately() {
        let (bridge, engine) = ready_bridge();
        let id = bridge.call("page.notify", vec![Value::from(1)]);
        let calls = engine.dispatched_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callback_id, id);
        assert_eq!(calls[0].data, "[1]");
        assert_eq!(bridge.pending_call_count(), 0);
    }

    #[test]
    fn test_call_serialize_failure() {
        let (bridge, engine) = ready_bridge();
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], 1);
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let id = bridge.call_serialize("page.fn", &[bad], move |r| *sink.borrow_mut() = Some(r));
        assert!(id.is_none());
        assert!(matches!(*seen.borrow(), Some(Err(BridgeError::Serialization(_)))));
        assert!(engine.dispatched_calls().is_empty());
        assert_eq!(bridge.pending_call_count(), 0);
    }

    #[test]
    fn test_unknown_reply_id_ignored() {
        let (bridge, _engine) = ready_bridge();
        bridge.handle_return_value(&Value::from_json_str(r#"{"id":99,"data":1}"#));
        bridge.handle_return_value(&Value::from("garbage"));
        assert_eq!(bridge.pending_call_count(), 0);
    }
}
