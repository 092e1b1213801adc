//! Method registry.
//!
//! Maps method names to handlers. A handler is either synchronous (returns
//! its result inline) or asynchronous (receives an [`AsyncReply`]). A handler
//! may be bound to a target through a weak [`TargetHandle`]; once the target
//! is gone the entry is stale and is purged lazily on the next lookup.
//!
//! ## Name rules
//!
//! | Name | Accepted |
//! |------|----------|
//! | `""` | no |
//! | contains whitespace | no |
//! | starts with `_` | only when strict names are off |
//! | `_dsb.returnValue`, `_dsb.dsinit` | never through the public API |
//! | dots, dashes, digits, inner underscores | yes |

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use wvb_protocol::wire;
use wvb_protocol::Value;

use crate::error::HandlerResult;
use crate::reply::AsyncReply;
use crate::target::TargetHandle;

/// Boxed synchronous handler.
pub type SyncHandler = Box<dyn Fn(Value) -> HandlerResult>;

/// Boxed asynchronous handler.
pub type AsyncHandler = Box<dyn Fn(Value, AsyncReply)>;

/// A registered handler, sync XOR async.
pub enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

impl Handler {
    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// A registry entry: the handler plus its optional target.
pub struct MethodEntry {
    pub handler: Handler,
    target: Option<Box<dyn TargetHandle>>,
}

impl MethodEntry {
    /// Entry without a target; never goes stale.
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            target: None,
        }
    }

    /// Entry bound to a weakly held target.
    pub fn bound(handler: Handler, target: impl TargetHandle + 'static) -> Self {
        Self {
            handler,
            target: Some(Box::new(target)),
        }
    }

    /// Whether the entry can still be invoked.
    pub fn is_alive(&self) -> bool {
        self.target.as_ref().map_or(true, |t| t.is_alive())
    }
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("handler", &self.handler)
            .field("bound", &self.target.is_some())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Result of resolving a method name.
#[derive(Debug)]
pub enum Lookup {
    /// Live entry; the `Rc` lets the caller invoke it without holding the registry
    Found(Rc<MethodEntry>),
    /// No entry under that name
    NotFound,
    /// The entry's target was gone; it has been removed
    Stale,
}

/// Validate a user method name.
pub fn check_method_name(name: &str, strict: bool) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("method name is empty");
    }
    if name.chars().any(char::is_whitespace) {
        return Err("method name contains whitespace");
    }
    if strict && name.starts_with(wire::RESERVED_PREFIX) {
        return Err("method name uses the reserved prefix");
    }
    Ok(())
}

/// Name → handler table.
#[derive(Debug)]
pub struct MethodRegistry {
    methods: HashMap<String, Rc<MethodEntry>>,
    strict_names: bool,
}

impl MethodRegistry {
    pub fn new(strict_names: bool) -> Self {
        Self {
            methods: HashMap::new(),
            strict_names,
        }
    }

    /// Register a user method. Rejected names are logged and ignored.
    ///
    /// Re-registration replaces the existing entry, whatever its kind.
    pub fn insert(&mut self, name: &str, entry: MethodEntry) -> bool {
        if wire::is_internal_method(name) {
            log::warn!("[registry] Refusing to overwrite internal method '{}'", name);
            return false;
        }
        if let Err(reason) = check_method_name(name, self.strict_names) {
            log::warn!("[registry] Rejected method '{}': {}", name, reason);
            return false;
        }
        if self.methods.insert(name.to_string(), Rc::new(entry)).is_some() {
            log::debug!("[registry] Replaced method '{}'", name);
        }
        true
    }

    /// Register a bridge-internal method, bypassing name validation.
    pub(crate) fn insert_internal(&mut self, name: &str, entry: MethodEntry) {
        self.methods.insert(name.to_string(), Rc::new(entry));
    }

    /// Remove a user method. Unknown names are a no-op.
    pub fn remove(&mut self, name: &str) -> bool {
        if wire::is_internal_method(name) {
            log::warn!("[registry] Refusing to remove internal method '{}'", name);
            return false;
        }
        self.methods.remove(name).is_some()
    }

    /// Current method names, sorted, internal ones included.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Drop every entry whose target is gone. Returns the purged names.
    pub fn purge_stale(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .methods
            .iter()
            .filter(|(_, entry)| !entry.is_alive())
            .map(|(name, _)| name.clone())
            .collect();
        for name in &stale {
            self.methods.remove(name);
            log::warn!("[registry] Purged method '{}': target deallocated", name);
        }
        stale
    }

    /// Look up a method for dispatch.
    ///
    /// The requested entry is checked first so a dead target reports as
    /// [`Lookup::Stale`]; the rest of the table is swept afterwards.
    pub fn resolve(&mut self, name: &str) -> Lookup {
        let lookup = match self.methods.get(name) {
            None => Lookup::NotFound,
            Some(entry) if entry.is_alive() => Lookup::Found(Rc::clone(entry)),
            Some(_) => {
                self.methods.remove(name);
                log::warn!("[registry] Method '{}' target deallocated, removed", name);
                Lookup::Stale
            }
        };
        self.purge_stale();
        lookup
    }

    /// Remove every user method, keeping the internal ones.
    pub fn clear_user(&mut self) {
        self.methods.retain(|name, _| wire::is_internal_method(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> MethodEntry {
        MethodEntry::new(Handler::Sync(Box::new(|_| Ok(None))))
    }

    #[test]
    fn test_name_rules() {
        assert!(check_method_name("echo", true).is_ok());
        assert!(check_method_name("name.space-1_a", true).is_ok());
        assert!(check_method_name("42", true).is_ok());
        assert!(check_method_name("", true).is_err());
        assert!(check_method_name("has space", true).is_err());
        assert!(check_method_name("tab\there", false).is_err());
        assert!(check_method_name("_private", true).is_err());
        assert!(check_method_name("_private", false).is_ok());
    }

    #[test]
    fn test_insert_rejects_invalid() {
        let mut registry = MethodRegistry::new(true);
        assert!(!registry.insert("", noop()));
        assert!(!registry.insert("a b", noop()));
        assert!(!registry.insert("_x", noop()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_overwrite_changes_kind() {
        let mut registry = MethodRegistry::new(true);
        registry.insert("m", noop());
        registry.insert("m", MethodEntry::new(Handler::Async(Box::new(|_, _| {}))));
        assert_eq!(registry.len(), 1);
        match registry.resolve("m") {
            Lookup::Found(entry) => assert!(entry.handler.is_async()),
            other => panic!("unexpected lookup: {:?}", other),
        }
    }

    #[test]
    fn test_internal_methods_protected() {
        let mut registry = MethodRegistry::new(false);
        registry.insert_internal(wire::METHOD_INIT, noop());
        assert!(!registry.insert(wire::METHOD_INIT, noop()));
        assert!(!registry.remove(wire::METHOD_INIT));
        registry.insert("user", noop());
        registry.clear_user();
        assert_eq!(registry.names(), vec![wire::METHOD_INIT.to_string()]);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = MethodRegistry::new(true);
        assert!(!registry.remove("missing"));
    }

    #[test]
    fn test_resolve_stale_then_sweep() {
        let mut registry = MethodRegistry::new(true);
        let a = Rc::new(());
        let b = Rc::new(());
        registry.insert("a", MethodEntry::bound(Handler::Sync(Box::new(|_| Ok(None))), Rc::downgrade(&a)));
        registry.insert("b", MethodEntry::bound(Handler::Sync(Box::new(|_| Ok(None))), Rc::downgrade(&b)));
        registry.insert("c", noop());
        drop(a);
        drop(b);

        assert!(matches!(registry.resolve("a"), Lookup::Stale));
        assert_eq!(registry.names(), vec!["c".to_string()]);
        assert!(matches!(registry.resolve("a"), Lookup::NotFound));
    }

    #[test]
    fn test_names_do_not_purge() {
        let mut registry = MethodRegistry::new(true);
        let owner = Rc::new(());
        registry.insert("bound", MethodEntry::bound(Handler::Sync(Box::new(|_| Ok(None))), Rc::downgrade(&owner)));
        drop(owner);
        assert!(registry.contains("bound"));
        assert_eq!(registry.purge_stale(), vec!["bound".to_string()]);
        assert!(!registry.contains("bound"));
    }
}
