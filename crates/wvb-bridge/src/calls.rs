//! Outbound call bookkeeping.
//!
//! Tracks callback IDs, page readiness, the startup queue and pending
//! completions. Pure state: nothing here evaluates script or invokes a
//! completion, so every method can run under a `RefCell` borrow.

use std::collections::{HashMap, VecDeque};

use wvb_protocol::{CallInfo, CallbackId, Value};

use crate::error::BridgeError;

/// Outcome delivered to an outbound call's completion.
pub type CallResult = Result<Option<Value>, BridgeError>;

/// Completion of an outbound call.
///
/// `FnMut` because partial replies may invoke it more than once before the
/// terminal reply.
pub type Completion = Box<dyn FnMut(CallResult)>;

pub(crate) struct OutboundCalls {
    /// Next callback ID; starts at 1 and never goes back
    next_id: CallbackId,
    /// Set by the readiness signal, cleared on navigation
    ready: bool,
    /// Calls issued while not ready, in issue order
    queue: VecDeque<CallInfo>,
    /// Completions awaiting a reply
    pending: HashMap<CallbackId, Completion>,
    /// Bumped on every reset so completions taken before it are not restored after it
    epoch: u64,
}

impl OutboundCalls {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ready: false,
            queue: VecDeque::new(),
            pending: HashMap::new(),
            epoch: 0,
        }
    }

    pub fn next_id(&mut self) -> CallbackId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn insert_pending(&mut self, id: CallbackId, completion: Completion) {
        self.pending.insert(id, completion);
    }

    pub fn take_pending(&mut self, id: CallbackId) -> Option<Completion> {
        self.pending.remove(&id)
    }

    /// Put back a completion after a partial reply.
    ///
    /// Ignored when a reset happened in between or the ID was answered again.
    pub fn restore_pending(&mut self, id: CallbackId, completion: Completion, epoch: u64) -> bool {
        if epoch != self.epoch || self.pending.contains_key(&id) {
            return false;
        }
        self.pending.insert(id, completion);
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn enqueue(&mut self, call: CallInfo) {
        self.queue.push_back(call);
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Enter the ready state, handing back the startup queue in FIFO order.
    pub fn mark_ready(&mut self) -> Vec<CallInfo> {
        self.ready = true;
        self.queue.drain(..).collect()
    }

    /// Return to not-ready, drop the queue and hand back every pending
    /// completion, ordered by callback ID.
    pub fn reset(&mut self) -> Vec<Completion> {
        self.ready = false;
        self.queue.clear();
        self.epoch += 1;
        let mut pending: Vec<(CallbackId, Completion)> = self.pending.drain().collect();
        pending.sort_by_key(|(id, _)| *id);
        pending.into_iter().map(|(_, completion)| completion).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_ids_start_at_one() {
        let mut calls = OutboundCalls::new();
        assert_eq!(calls.next_id(), 1);
        assert_eq!(calls.next_id(), 2);
        calls.reset();
        assert_eq!(calls.next_id(), 3);
    }

    #[test]
    fn test_mark_ready_drains_fifo() {
        let mut calls = OutboundCalls::new();
        calls.enqueue(CallInfo::without_payload("a", 1));
        calls.enqueue(CallInfo::without_payload("b", 2));
        let flushed = calls.mark_ready();
        assert_eq!(flushed.iter().map(|c| c.method.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert!(calls.is_ready());
        assert_eq!(calls.queued_count(), 0);
        assert!(calls.mark_ready().is_empty());
    }

    #[test]
    fn test_reset_returns_pending_in_id_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut calls = OutboundCalls::new();
        for id in [3, 1, 2] {
            let order = order.clone();
            calls.insert_pending(id, Box::new(move |_| order.borrow_mut().push(id)));
        }
        calls.enqueue(CallInfo::without_payload("q", 4));
        calls.mark_ready();

        for mut completion in calls.reset() {
            completion(Err(BridgeError::Cancelled));
        }
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
        assert!(!calls.is_ready());
        assert_eq!(calls.pending_count(), 0);
    }

    #[test]
    fn test_restore_after_reset_is_refused() {
        let mut calls = OutboundCalls::new();
        calls.insert_pending(1, Box::new(|_| {}));
        let epoch = calls.epoch();
        let completion = calls.take_pending(1).unwrap();
        calls.reset();
        assert!(!calls.restore_pending(1, completion, epoch));
        assert_eq!(calls.pending_count(), 0);
    }

    #[test]
    fn test_restore_same_epoch() {
        let mut calls = OutboundCalls::new();
        calls.insert_pending(5, Box::new(|_| {}));
        let epoch = calls.epoch();
        let completion = calls.take_pending(5).unwrap();
        assert!(calls.restore_pending(5, completion, epoch));
        assert_eq!(calls.pending_count(), 1);
    }
}
