//! Wire constants shared with the in-page bridge library.
//!
//! These names are fixed by the page-side library; changing any of them
//! breaks interoperability.

// =============================================================================
// Channels
// =============================================================================

/// Name of the message handler the page posts asynchronous calls to.
pub const MESSAGE_HANDLER_NAME: &str = "asyncBridge";

/// Prefix marking a blocking prompt as a synchronous bridge call.
/// The method name follows the prefix; the argument envelope travels as the
/// prompt's default text.
pub const SYNC_PROMPT_PREFIX: &str = "_dsbridge=";

/// Key of the callback stub inside an asynchronous argument envelope.
pub const CALLBACK_STUB_KEY: &str = "_dscbstub";

/// Key of the payload inside an argument envelope.
pub const DATA_KEY: &str = "data";

// =============================================================================
// Script entry points
// =============================================================================

/// Global page function receiving native-initiated calls.
pub const NATIVE_DISPATCH_FUNCTION: &str = "window._handleMessageFromNative";

/// Document-start script announcing the native bridge to the page.
pub const BOOTSTRAP_SCRIPT: &str = "window._dswk=true;";

// =============================================================================
// Internal methods
// =============================================================================

/// Namespace of bridge-internal methods.
pub const INTERNAL_NAMESPACE: &str = "_dsb";

/// Script replies to a native-initiated call.
/// Payload: `{id, data, complete, error}`.
pub const METHOD_RETURN_VALUE: &str = "_dsb.returnValue";

/// Script runtime finished initializing (readiness signal). Payload ignored.
pub const METHOD_INIT: &str = "_dsb.dsinit";

/// All internal method names.
pub const INTERNAL_METHODS: [&str; 2] = [METHOD_RETURN_VALUE, METHOD_INIT];

/// Prefix reserved for internal names; rejected for user methods in strict mode.
pub const RESERVED_PREFIX: &str = "_";

// =============================================================================
// Reply codes
// =============================================================================

/// Envelope code for a successful call.
pub const CODE_SUCCESS: i32 = 0;

/// Envelope code for a failed call.
pub const CODE_FAILURE: i32 = -1;

/// Check whether a method name belongs to the bridge itself.
pub fn is_internal_method(name: &str) -> bool {
    INTERNAL_METHODS.contains(&name)
}
