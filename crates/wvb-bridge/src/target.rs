//! Weak handles to the objects that own bound handlers.
//!
//! A bound handler keeps only a weak reference to its target. Once the target
//! is dropped the handler is stale: lookups report it as deallocated and the
//! registry purges it.

use std::rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{self, Arc};

/// Liveness check on a weakly held handler target.
pub trait TargetHandle {
    /// Whether the target still exists.
    fn is_alive(&self) -> bool;
}

impl<T: ?Sized> TargetHandle for rc::Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

impl<T: ?Sized> TargetHandle for sync::Weak<T> {
    fn is_alive(&self) -> bool {
        self.strong_count() > 0
    }
}

/// Explicit liveness marker for targets that are not reference counted.
///
/// Clones share state; calling [`LivenessFlag::revoke`] on any of them marks
/// the target dead everywhere.
#[derive(Clone, Debug)]
pub struct LivenessFlag {
    alive: Arc<AtomicBool>,
}

impl LivenessFlag {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Mark the target as gone.
    pub fn revoke(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl Default for LivenessFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetHandle for LivenessFlag {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_rc_weak() {
        let owner = Rc::new(5);
        let weak = Rc::downgrade(&owner);
        assert!(weak.is_alive());
        drop(owner);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_arc_weak() {
        let owner = Arc::new(String::from("target"));
        let weak = Arc::downgrade(&owner);
        assert!(weak.is_alive());
        drop(owner);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_liveness_flag_shared() {
        let flag = LivenessFlag::new();
        let copy = flag.clone();
        assert!(copy.is_alive());
        flag.revoke();
        assert!(!copy.is_alive());
    }
}
