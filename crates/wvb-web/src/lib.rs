//! Browser host adapter for the web view bridge
//!
//! Exposes [`Bridge`] to JavaScript hosts through `wasm-bindgen`. The host
//! feeds page messages in and supplies the functions that evaluate script in
//! the page.
//!
//! ## Module Structure
//!
//! - `convert` - `JsValue` ⇄ `Value` adapters
//! - `engine` - `ScriptEngine` backed by host functions
//! - `logger` - `log` sink writing to the browser console
//!
//! ## Host wiring
//!
//! | Host event | Call |
//! |------------|------|
//! | message posted to `asyncBridge` | `handleMessage(method, arg)` or `handleMessageBody(name, body)` |
//! | blocking prompt | `handlePrompt(prompt, defaultText)` |
//! | navigation start | `navigationStarted()` |
//! | async work finished | `poll()` |

pub mod convert;
pub mod engine;
pub mod logger;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function};
use wasm_bindgen::prelude::*;
use wvb_bridge::{AsyncReply, Bridge, BridgeConfig, BridgeError, Value};

use crate::convert::{error_message, js_to_value, value_to_js};
use crate::engine::JsEngine;

pub use logger::{init_logging, ConsoleLogger};

/// Set the console log level (`"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`).
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) {
    let _ = init_logging(logger::parse_level(level));
}

/// Bridge handle exported to JavaScript.
#[wasm_bindgen]
pub struct WebBridge {
    bridge: Bridge<JsEngine>,
}

#[wasm_bindgen]
impl WebBridge {
    /// Create a bridge.
    ///
    /// `evaluate(script)` runs script in the page (global `eval` if omitted);
    /// `document_start(script)` installs a script for future page loads.
    /// `config` is optional JSON such as `{"debug": true}`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        evaluate: Option<Function>,
        document_start: Option<Function>,
        config: Option<String>,
    ) -> Result<WebBridge, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let _ = init_logging(log::LevelFilter::Info);

        let config = match config {
            Some(text) => BridgeConfig::from_json(&text).map_err(to_js_error)?,
            None => BridgeConfig::default(),
        };
        let bridge = Bridge::with_config(JsEngine::new(evaluate, document_start), config);
        log::info!("[wvb-web] Bridge created");
        Ok(WebBridge { bridge })
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, method: &str, arg: &str) {
        self.bridge.handle_message(method, arg);
    }

    #[wasm_bindgen(js_name = handleMessageBody)]
    pub fn handle_message_body(&self, handler_name: &str, body: &str) -> bool {
        self.bridge.handle_message_body(handler_name, body)
    }

    /// Answer a blocking prompt; non-bridge prompts return `default_text`.
    #[wasm_bindgen(js_name = handlePrompt)]
    pub fn handle_prompt(&self, prompt: &str, default_text: Option<String>) -> Option<String> {
        self.bridge.handle_prompt(prompt, default_text.as_deref())
    }

    /// Deliver finished async replies. Returns how many were sent.
    pub fn poll(&self) -> u32 {
        self.bridge.poll() as u32
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a synchronous method backed by `handler(param)`.
    ///
    /// A thrown exception becomes an error reply.
    pub fn register(&self, name: &str, handler: Function) -> bool {
        self.bridge.register(name, move |param| {
            let result = handler
                .call1(&JsValue::NULL, &value_to_js(&param))
                .map_err(|e| BridgeError::handler(error_message(&e)))?;
            if result.is_undefined() {
                return Ok(None);
            }
            js_to_value(&result)
                .map(Some)
                .ok_or_else(|| BridgeError::type_conversion("unsupported result type"))
        })
    }

    /// Register an asynchronous method backed by `handler(param, resolve, reject)`.
    #[wasm_bindgen(js_name = registerAsync)]
    pub fn register_async(&self, name: &str, handler: Function) -> bool {
        let bridge = self.bridge.downgrade();
        self.bridge.register_async(name, move |param, reply| match bridge.upgrade() {
            Some(bridge) => invoke_async(&bridge, &handler, &param, reply),
            None => reply.failure("bridge has been released"),
        })
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.bridge.unregister(name)
    }

    #[wasm_bindgen(js_name = registeredMethods)]
    pub fn registered_methods(&self) -> Array {
        self.bridge
            .registered_methods()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Call a page method. `callback(error, result)` receives the outcome.
    ///
    /// Returns the call's callback ID.
    pub fn call(&self, method: &str, args: Array, callback: Option<Function>) -> Result<f64, JsValue> {
        let args = args
            .iter()
            .map(|arg| js_to_value(&arg))
            .collect::<Option<Vec<Value>>>()
            .ok_or_else(|| JsValue::from_str("unsupported argument type"))?;

        let id = match callback {
            Some(callback) => self.bridge.call_with(method, args, move |result| {
                let outcome = match result {
                    Ok(value) => callback.call2(
                        &JsValue::NULL,
                        &JsValue::NULL,
                        &value.as_ref().map_or(JsValue::UNDEFINED, value_to_js),
                    ),
                    Err(e) => callback.call1(&JsValue::NULL, &to_js_error(e)),
                };
                if let Err(e) = outcome {
                    log::warn!("[wvb-web] Call callback threw: {}", error_message(&e));
                }
            }),
            None => self.bridge.call(method, args),
        };
        Ok(id as f64)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[wasm_bindgen(js_name = navigationStarted)]
    pub fn navigation_started(&self) {
        self.bridge.navigation_started();
    }

    pub fn teardown(&self) {
        self.bridge.teardown();
    }

    #[wasm_bindgen(js_name = bootstrapScript)]
    pub fn bootstrap_script(&self) -> String {
        self.bridge.bootstrap_script().to_string()
    }

    #[wasm_bindgen(js_name = setDebug)]
    pub fn set_debug(&self, debug: bool) {
        self.bridge.set_debug(debug);
    }

    #[wasm_bindgen(js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.bridge.is_ready()
    }

    #[wasm_bindgen(js_name = pendingCallCount)]
    pub fn pending_call_count(&self) -> u32 {
        self.bridge.pending_call_count() as u32
    }
}

impl Drop for WebBridge {
    /// Release user handlers and pending work when the host frees the bridge.
    fn drop(&mut self) {
        self.bridge.teardown();
    }
}

/// Hand an async call to a script handler with one-shot resolve/reject functions.
///
/// Settling either function delivers the reply immediately. A handler that
/// throws before settling fails the call.
fn invoke_async(bridge: &Bridge<JsEngine>, handler: &Function, param: &Value, reply: AsyncReply) {
    let slot = Rc::new(RefCell::new(Some(reply)));

    let (resolve_slot, resolve_bridge) = (slot.clone(), bridge.downgrade());
    let resolve = Closure::once_into_js(move |value: JsValue| {
        if let Some(reply) = resolve_slot.borrow_mut().take() {
            match js_to_value(&value) {
                Some(value) => reply.success(value),
                None => reply.failure("unsupported result type"),
            }
        }
        if let Some(bridge) = resolve_bridge.upgrade() {
            bridge.poll();
        }
    });

    let (reject_slot, reject_bridge) = (slot.clone(), bridge.downgrade());
    let reject = Closure::once_into_js(move |error: JsValue| {
        if let Some(reply) = reject_slot.borrow_mut().take() {
            reply.failure(error_message(&error));
        }
        if let Some(bridge) = reject_bridge.upgrade() {
            bridge.poll();
        }
    });

    if let Err(e) = handler.call3(&JsValue::NULL, &value_to_js(param), &resolve, &reject) {
        if let Some(reply) = slot.borrow_mut().take() {
            reply.failure(error_message(&e));
        }
    }
}

fn to_js_error(error: BridgeError) -> JsValue {
    js_sys::Error::new(&error.to_string()).into()
}
