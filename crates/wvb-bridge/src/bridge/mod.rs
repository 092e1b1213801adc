//! Bridge - owner-thread handle to one web view
//!
//! `Bridge` ties together the method registry, the outbound call tables and
//! the async reply queue, and talks to the page through a [`ScriptEngine`].
//!
//! ## Responsibilities
//!
//! - Method registration (this file)
//! - Native → script calls, startup queue, reply correlation (`outbound`)
//! - Script → native dispatch on both channels, reply delivery (`dispatch`)
//! - Navigation reset and teardown (this file)
//!
//! ## Re-entrancy
//!
//! No `RefCell` borrow is held while a handler, a completion or the script
//! engine runs, so all of them may call back into the bridge.
//!
//! ## Ownership
//!
//! `Bridge` is a cheap `Rc` handle. Handlers that need the bridge should
//! capture a [`WeakBridge`] from [`Bridge::downgrade`]; a captured strong
//! clone forms a reference cycle that only [`Bridge::teardown`] breaks.

mod dispatch;
mod outbound;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use wvb_protocol::{wire, Value};

use crate::calls::OutboundCalls;
use crate::config::BridgeConfig;
use crate::engine::ScriptEngine;
use crate::error::{BridgeError, HandlerResult, Result};
use crate::registry::{Handler, MethodEntry, MethodRegistry};
use crate::reply::{AsyncReply, ReplyQueue};
use crate::target::TargetHandle;

/// Bidirectional RPC bridge bound to one script engine.
pub struct Bridge<E> {
    inner: Rc<BridgeInner<E>>,
}

struct BridgeInner<E> {
    /// Page the bridge talks to
    engine: E,
    /// Per-message debug logging
    debug: Cell<bool>,
    /// Script-callable methods
    registry: RefCell<MethodRegistry>,
    /// Native-initiated calls
    calls: RefCell<OutboundCalls>,
    /// Finished async handler calls awaiting delivery
    replies: ReplyQueue,
    /// Bumped on every navigation; replies from older documents are discarded
    generation: Cell<u64>,
}

/// Non-owning handle to a [`Bridge`], for capture inside its own handlers.
pub struct WeakBridge<E> {
    inner: Weak<BridgeInner<E>>,
}

impl<E> WeakBridge<E> {
    /// The bridge, if it is still alive.
    pub fn upgrade(&self) -> Option<Bridge<E>> {
        self.inner.upgrade().map(|inner| Bridge { inner })
    }
}

impl<E> Clone for WeakBridge<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E> Bridge<E> {
    /// A handle that does not keep the bridge alive.
    pub fn downgrade(&self) -> WeakBridge<E> {
        WeakBridge {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<E> Clone for Bridge<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for Bridge<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let calls = self.inner.calls.borrow();
        f.debug_struct("Bridge")
            .field("methods", &self.inner.registry.borrow().len())
            .field("ready", &calls.is_ready())
            .field("pending", &calls.pending_count())
            .field("queued", &calls.queued_count())
            .field("generation", &self.inner.generation.get())
            .finish()
    }
}

impl<E: ScriptEngine + 'static> Bridge<E> {
    /// Create a bridge with the default configuration.
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, BridgeConfig::default())
    }

    /// Create a bridge, register the internal methods and install the
    /// document-start bootstrap script.
    pub fn with_config(engine: E, config: BridgeConfig) -> Self {
        let bridge = Self {
            inner: Rc::new(BridgeInner {
                engine,
                debug: Cell::new(config.debug),
                registry: RefCell::new(MethodRegistry::new(config.strict_names)),
                calls: RefCell::new(OutboundCalls::new()),
                replies: ReplyQueue::new(),
                generation: Cell::new(0),
            }),
        };
        bridge.install_internal_methods();
        if let Err(e) = bridge.inner.engine.add_document_start_script(wire::BOOTSTRAP_SCRIPT) {
            log::warn!("[bridge] Failed to install bootstrap script: {}", e);
        }
        bridge
    }

    fn install_internal_methods(&self) {
        let weak = self.downgrade();
        let return_value = Handler::Sync(Box::new(move |param| {
            if let Some(bridge) = weak.upgrade() {
                bridge.handle_return_value(&param);
            }
            Ok(None)
        }));

        let weak = self.downgrade();
        let init = Handler::Sync(Box::new(move |_| {
            if let Some(bridge) = weak.upgrade() {
                bridge.page_ready();
            }
            Ok(None)
        }));

        let mut registry = self.inner.registry.borrow_mut();
        registry.insert_internal(wire::METHOD_RETURN_VALUE, MethodEntry::new(return_value));
        registry.insert_internal(wire::METHOD_INIT, MethodEntry::new(init));
    }

    // =========================================================================
    // Registration
    // =========================================================================

    fn insert(&self, name: &str, entry: MethodEntry) -> bool {
        self.inner.registry.borrow_mut().insert(name, entry)
    }

    /// Register a synchronous method.
    ///
    /// Returns `false` (and logs) when the name is rejected.
    pub fn register<F>(&self, name: &str, handler: F) -> bool
    where
        F: Fn(Value) -> HandlerResult + 'static,
    {
        self.insert(name, MethodEntry::new(Handler::Sync(Box::new(handler))))
    }

    /// Register a synchronous method bound to `target`.
    ///
    /// The registry holds `target` weakly; once every strong reference is
    /// gone the method reports as deallocated and is purged.
    pub fn register_bound<T, F>(&self, name: &str, target: &Rc<T>, handler: F) -> bool
    where
        T: 'static,
        F: Fn(&T, Value) -> HandlerResult + 'static,
    {
        let weak = Rc::downgrade(target);
        let owner = weak.clone();
        let method = name.to_string();
        let sync = Handler::Sync(Box::new(move |param| match owner.upgrade() {
            Some(target) => handler(&target, param),
            None => Err(BridgeError::TargetDeallocated(method.clone())),
        }));
        self.insert(name, MethodEntry::bound(sync, weak))
    }

    /// Register a synchronous method whose liveness is tracked by `handle`.
    pub fn register_with_target<H, F>(&self, name: &str, handle: H, handler: F) -> bool
    where
        H: TargetHandle + 'static,
        F: Fn(Value) -> HandlerResult + 'static,
    {
        self.insert(name, MethodEntry::bound(Handler::Sync(Box::new(handler)), handle))
    }

    /// Register a synchronous method with typed parameter and result.
    ///
    /// A parameter that does not decode into `P` is answered with a type
    /// conversion error; the handler is not invoked.
    pub fn register_typed<P, R, F>(&self, name: &str, handler: F) -> bool
    where
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(P) -> Result<R> + 'static,
    {
        self.register(name, move |param| {
            let args: P = param.decode()?;
            let result = handler(args)?;
            Ok(Some(Value::from_serialize(&result)?))
        })
    }

    /// Typed variant of [`Bridge::register_bound`].
    pub fn register_bound_typed<T, P, R, F>(&self, name: &str, target: &Rc<T>, handler: F) -> bool
    where
        T: 'static,
        P: DeserializeOwned,
        R: Serialize,
        F: Fn(&T, P) -> Result<R> + 'static,
    {
        self.register_bound(name, target, move |target, param| {
            let args: P = param.decode()?;
            let result = handler(target, args)?;
            Ok(Some(Value::from_serialize(&result)?))
        })
    }

    /// Register an asynchronous method.
    ///
    /// The handler must resolve the [`AsyncReply`] exactly once, from any
    /// thread. Async methods cannot be called through the synchronous channel.
    pub fn register_async<F>(&self, name: &str, handler: F) -> bool
    where
        F: Fn(Value, AsyncReply) + 'static,
    {
        self.insert(name, MethodEntry::new(Handler::Async(Box::new(handler))))
    }

    /// Register an asynchronous method bound to `target`.
    pub fn register_async_bound<T, F>(&self, name: &str, target: &Rc<T>, handler: F) -> bool
    where
        T: 'static,
        F: Fn(&T, Value, AsyncReply) + 'static,
    {
        let weak = Rc::downgrade(target);
        let owner = weak.clone();
        let method = name.to_string();
        let async_handler = Handler::Async(Box::new(move |param, reply| match owner.upgrade() {
            Some(target) => handler(&target, param, reply),
            None => reply.resolve(Err(BridgeError::TargetDeallocated(method.clone()))),
        }));
        self.insert(name, MethodEntry::bound(async_handler, weak))
    }

    /// Register an asynchronous method whose liveness is tracked by `handle`.
    pub fn register_async_with_target<H, F>(&self, name: &str, handle: H, handler: F) -> bool
    where
        H: TargetHandle + 'static,
        F: Fn(Value, AsyncReply) + 'static,
    {
        self.insert(name, MethodEntry::bound(Handler::Async(Box::new(handler)), handle))
    }

    /// Remove a method. Unknown names and internal methods are left alone.
    pub fn unregister(&self, name: &str) -> bool {
        self.inner.registry.borrow_mut().remove(name)
    }

    /// Names of all registered methods, internal ones included.
    pub fn registered_methods(&self) -> Vec<String> {
        self.inner.registry.borrow().names()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Reset for a new document.
    ///
    /// Every pending call fails with [`BridgeError::Cancelled`], the startup
    /// queue is dropped and the bridge waits for the next readiness signal.
    /// Async replies still in flight for the old document are discarded.
    /// Safe to call repeatedly.
    pub fn navigation_started(&self) {
        self.inner.generation.set(self.inner.generation.get() + 1);
        let cancelled = self.inner.calls.borrow_mut().reset();
        if !cancelled.is_empty() {
            log::debug!("[bridge] Navigation cancelled {} pending call(s)", cancelled.len());
        }
        for mut completion in cancelled {
            completion(Err(BridgeError::Cancelled));
        }
    }

    /// Release everything tied to the view.
    ///
    /// User methods are unregistered; pending completions, the startup queue
    /// and undelivered replies are dropped without being invoked.
    pub fn teardown(&self) {
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner.registry.borrow_mut().clear_user();
        let dropped = self.inner.calls.borrow_mut().reset();
        drop(dropped);
        drop(self.inner.replies.drain());
        self.inner.replies.set_wake_hook(None);
        log::debug!("[bridge] Torn down");
    }

    // =========================================================================
    // Host integration
    // =========================================================================

    /// Install a callback fired whenever an async reply is queued.
    ///
    /// It may run on any thread. The host should respond by scheduling
    /// [`Bridge::poll`] on the owner thread.
    pub fn set_wake_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.replies.set_wake_hook(Some(Arc::new(hook)));
    }

    /// Remove the wake callback.
    pub fn clear_wake_hook(&self) {
        self.inner.replies.set_wake_hook(None);
    }

    /// Toggle per-message debug logging.
    pub fn set_debug(&self, debug: bool) {
        self.inner.debug.set(debug);
    }

    /// Whether per-message debug logging is on.
    pub fn is_debug(&self) -> bool {
        self.inner.debug.get()
    }

    /// Whether the page has signalled readiness since the last navigation.
    pub fn is_ready(&self) -> bool {
        self.inner.calls.borrow().is_ready()
    }

    /// Number of outbound calls awaiting a reply.
    pub fn pending_call_count(&self) -> usize {
        self.inner.calls.borrow().pending_count()
    }

    /// Number of outbound calls held until readiness.
    pub fn queued_call_count(&self) -> usize {
        self.inner.calls.borrow().queued_count()
    }

    /// Number of async replies waiting for [`Bridge::poll`].
    pub fn queued_reply_count(&self) -> usize {
        self.inner.replies.len()
    }

    /// The document-start script installed by [`Bridge::new`].
    pub fn bootstrap_script(&self) -> &'static str {
        wire::BOOTSTRAP_SCRIPT
    }

    /// The script engine this bridge evaluates through.
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }
}
