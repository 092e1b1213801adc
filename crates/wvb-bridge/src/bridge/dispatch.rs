//! Script → native dispatch.
//!
//! Two channels reach the same registry:
//!
//! | Channel | Entry point | Reply |
//! |---------|-------------|-------|
//! | async message handler | [`Bridge::handle_message`] | callback stub script, via [`Bridge::poll`] |
//! | blocking prompt | [`Bridge::handle_prompt`] | envelope string, returned inline |
//!
//! Resolution and handler errors never escape: they become `{code: -1}`
//! envelopes for the page.

use std::rc::Rc;

use wvb_protocol::{script, wire, Envelope, InboundMessage, Value};

use super::Bridge;
use crate::engine::ScriptEngine;
use crate::error::{BridgeError, HandlerResult, Result};
use crate::registry::{Handler, Lookup, MethodEntry};
use crate::reply::AsyncReply;

fn envelope(result: HandlerResult) -> Envelope {
    match result {
        Ok(value) => Envelope::success(value),
        Err(e) => Envelope::failure(e.to_string()),
    }
}

impl<E: ScriptEngine + 'static> Bridge<E> {
    // =========================================================================
    // Async channel
    // =========================================================================

    /// Handle a call posted to the async message handler.
    ///
    /// `arg` is the JSON text of `{"data": .., "_dscbstub": ..}`. Malformed
    /// text dispatches with a `null` parameter and no reply.
    pub fn handle_message(&self, method: &str, arg: &str) {
        if self.is_debug() {
            log::debug!("[bridge] <- {} {}", method, arg);
        }
        let message = InboundMessage::parse(arg);
        let param = message.param();
        let reply = AsyncReply::new(
            method,
            message.callback_stub,
            self.inner.generation.get(),
            self.inner.replies.clone(),
        );

        match self.lookup(method) {
            Ok(entry) => match &entry.handler {
                Handler::Sync(handler) => reply.resolve(handler(param)),
                Handler::Async(handler) => handler(param, reply),
            },
            Err(e) => {
                log::warn!("[bridge] {}", e);
                reply.resolve(Err(e));
            }
        }

        self.poll();
    }

    /// Handle a raw message body posted by the page.
    ///
    /// Only bodies sent to the bridge's handler name with string `method` and
    /// `arg` fields are accepted. Returns whether the body was dispatched.
    pub fn handle_message_body(&self, handler_name: &str, body: &str) -> bool {
        if handler_name != wire::MESSAGE_HANDLER_NAME {
            return false;
        }
        let body = Value::from_json_str(body);
        let method = body.get("method").and_then(Value::as_str);
        let arg = body.get("arg").and_then(Value::as_str);
        match (method, arg) {
            (Some(method), Some(arg)) => {
                self.handle_message(method, arg);
                true
            }
            _ => {
                log::warn!("[bridge] Ignoring message without method/arg: {}", body);
                false
            }
        }
    }

    // =========================================================================
    // Sync channel
    // =========================================================================

    /// Whether a prompt is a synchronous bridge call.
    pub fn is_bridge_prompt(prompt: &str) -> bool {
        prompt.starts_with(wire::SYNC_PROMPT_PREFIX)
    }

    /// Handle a blocking prompt.
    ///
    /// Bridge prompts (`_dsbridge=<method>`) return the reply envelope as
    /// JSON text. Any other prompt passes `default_text` through unchanged.
    pub fn handle_prompt(&self, prompt: &str, default_text: Option<&str>) -> Option<String> {
        match prompt.strip_prefix(wire::SYNC_PROMPT_PREFIX) {
            Some(method) => Some(self.handle_sync_call(method, default_text.unwrap_or(""))),
            None => default_text.map(str::to_owned),
        }
    }

    /// Run a synchronous call and encode its envelope.
    pub fn handle_sync_call(&self, method: &str, arg: &str) -> String {
        if self.is_debug() {
            log::debug!("[bridge] <= {} {}", method, arg);
        }
        let param = InboundMessage::parse(arg).param();
        let result = self.lookup(method).and_then(|entry| match &entry.handler {
            Handler::Sync(handler) => handler(param),
            Handler::Async(_) => Err(BridgeError::AsyncCalledSynchronously(method.to_string())),
        });
        if let Err(e) = &result {
            log::warn!("[bridge] Sync call failed: {}", e);
        }
        let reply = envelope(result).to_json_string();
        if self.is_debug() {
            log::debug!("[bridge] => {}", reply);
        }
        reply
    }

    // =========================================================================
    // Replies
    // =========================================================================

    /// Deliver finished async calls to the page.
    ///
    /// Must run on the owner thread. Replies from a previous document and
    /// calls that asked for no reply are dropped. Returns how many replies
    /// were delivered.
    pub fn poll(&self) -> usize {
        let generation = self.inner.generation.get();
        let mut delivered = 0;
        for finished in self.inner.replies.drain() {
            if finished.generation != generation {
                log::debug!("[bridge] Discarding reply for '{}' from a previous page", finished.method);
                continue;
            }
            let Some(stub) = finished.stub else {
                continue;
            };
            match self.send_reply(&stub, &finished.envelope) {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!("[bridge] Dropping reply for '{}': {}", finished.method, e),
            }
        }
        delivered
    }

    fn send_reply(&self, stub: &str, envelope: &Envelope) -> Result<()> {
        let script = script::callback_script(stub, envelope)
            .ok_or_else(|| BridgeError::InvalidCallbackStub(stub.to_string()))?;
        if self.is_debug() {
            log::debug!("[bridge] -> {}({})", stub, envelope.to_json_string());
        }
        if let Err(e) = self.inner.engine.evaluate(&script) {
            log::warn!("[bridge] Failed to send reply to '{}': {}", stub, e);
        }
        Ok(())
    }

    fn lookup(&self, method: &str) -> Result<Rc<MethodEntry>> {
        let lookup = self.inner.registry.borrow_mut().resolve(method);
        match lookup {
            Lookup::Found(entry) => Ok(entry),
            Lookup::NotFound => Err(BridgeError::MethodNotFound(method.to_string())),
            Lookup::Stale => Err(BridgeError::TargetDeallocated(method.to_string())),
        }
    }
}
