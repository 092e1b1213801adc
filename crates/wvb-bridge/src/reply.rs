//! Completions handed to asynchronous handlers.
//!
//! An [`AsyncReply`] may travel to any thread. Resolving it never touches the
//! script engine: the outcome is pushed onto a shared queue and the host's
//! wake hook is fired. The owner thread applies queued outcomes in
//! [`Bridge::poll`](crate::Bridge::poll).

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use wvb_protocol::{Envelope, Value};

use crate::error::HandlerResult;

/// Callback fired whenever a reply is queued. Must be cheap and thread-safe.
pub type WakeHook = Arc<dyn Fn() + Send + Sync>;

/// An async handler outcome waiting to be delivered to the page.
#[derive(Debug)]
pub(crate) struct FinishedCall {
    pub method: String,
    pub stub: Option<String>,
    /// Document generation the call arrived in
    pub generation: u64,
    pub envelope: Envelope,
}

#[derive(Default)]
struct ReplyShared {
    finished: Mutex<VecDeque<FinishedCall>>,
    wake: Mutex<Option<WakeHook>>,
}

/// Cross-thread queue of finished async calls.
#[derive(Clone, Default)]
pub(crate) struct ReplyQueue {
    shared: Arc<ReplyShared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ReplyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: FinishedCall) {
        lock(&self.shared.finished).push_back(call);
        let wake = lock(&self.shared.wake).clone();
        if let Some(wake) = wake {
            wake();
        }
    }

    pub fn drain(&self) -> Vec<FinishedCall> {
        lock(&self.shared.finished).drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.shared.finished).len()
    }

    pub fn set_wake_hook(&self, hook: Option<WakeHook>) {
        *lock(&self.shared.wake) = hook;
    }
}

/// One-shot completion of an asynchronous handler.
///
/// Consumed by value, so it can only be resolved once. Dropping it
/// unresolved replies with an error so the page is never left waiting.
pub struct AsyncReply {
    method: String,
    stub: Option<String>,
    generation: u64,
    queue: Option<ReplyQueue>,
}

impl AsyncReply {
    pub(crate) fn new(method: &str, stub: Option<String>, generation: u64, queue: ReplyQueue) -> Self {
        Self {
            method: method.to_string(),
            stub,
            generation,
            queue: Some(queue),
        }
    }

    /// Name of the method this reply answers.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the page is waiting for this reply.
    pub fn expects_reply(&self) -> bool {
        self.stub.is_some()
    }

    /// Resolve with a handler outcome.
    pub fn resolve(mut self, result: HandlerResult) {
        let envelope = match result {
            Ok(value) => Envelope::success(value),
            Err(e) => Envelope::failure(e.to_string()),
        };
        self.finish(envelope);
    }

    /// Resolve successfully with a value.
    pub fn success(self, value: impl Into<Value>) {
        self.resolve(Ok(Some(value.into())));
    }

    /// Resolve successfully without a value (`null` for the page).
    pub fn done(self) {
        self.resolve(Ok(None));
    }

    /// Resolve with an error message.
    pub fn failure(mut self, message: impl Into<String>) {
        self.finish(Envelope::failure(message));
    }

    fn finish(&mut self, envelope: Envelope) {
        if let Some(queue) = self.queue.take() {
            queue.push(FinishedCall {
                method: std::mem::take(&mut self.method),
                stub: self.stub.take(),
                generation: self.generation,
                envelope,
            });
        }
    }
}

impl Drop for AsyncReply {
    fn drop(&mut self) {
        if self.queue.is_some() {
            log::warn!("[bridge] Async reply for '{}' dropped without a result", self.method);
            let message = format!("Async method dropped its reply: {}", self.method);
            self.finish(Envelope::failure(message));
        }
    }
}

impl fmt::Debug for AsyncReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncReply")
            .field("method", &self.method)
            .field("stub", &self.stub)
            .field("generation", &self.generation)
            .field("resolved", &self.queue.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn assert_send<T: Send + 'static>() {}

    #[test]
    fn test_async_reply_is_send() {
        assert_send::<AsyncReply>();
    }

    #[test]
    fn test_resolve_queues_once() {
        let queue = ReplyQueue::new();
        let reply = AsyncReply::new("m", Some("cb".into()), 0, queue.clone());
        reply.success("ok");
        let finished = queue.drain();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].stub.as_deref(), Some("cb"));
        assert_eq!(finished[0].method, "m");
        assert_eq!(finished[0].envelope, Envelope::success(Some(Value::from("ok"))));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_error_result() {
        let queue = ReplyQueue::new();
        AsyncReply::new("m", None, 0, queue.clone()).resolve(Err(BridgeError::handler("nope")));
        assert_eq!(queue.drain()[0].envelope, Envelope::failure("nope"));
    }

    #[test]
    fn test_drop_sends_error() {
        let queue = ReplyQueue::new();
        drop(AsyncReply::new("fetch", Some("cb".into()), 0, queue.clone()));
        let finished = queue.drain();
        assert_eq!(finished.len(), 1);
        assert!(!finished[0].envelope.is_success());
    }

    #[test]
    fn test_wake_hook_fires() {
        let queue = ReplyQueue::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        queue.set_wake_hook(Some(Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })));
        AsyncReply::new("a", None, 0, queue.clone()).done();
        AsyncReply::new("b", None, 0, queue.clone()).failure("x");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolve_from_other_thread() {
        let queue = ReplyQueue::new();
        let reply = AsyncReply::new("m", Some("cb".into()), 3, queue.clone());
        std::thread::spawn(move || reply.success(7)).join().unwrap();
        let finished = queue.drain();
        assert_eq!(finished[0].generation, 3);
        assert_eq!(finished[0].envelope.data, Value::from(7));
    }
}
