//! Script engine backed by JavaScript functions.

use js_sys::Function;
use wasm_bindgen::JsValue;
use wvb_bridge::{EngineError, ScriptEngine};

use crate::convert::error_message;

/// Evaluates scripts through host-supplied functions.
///
/// Without an `evaluate` function, scripts go to the global `eval`. Without a
/// `document_start` function, bootstrap scripts are not installed.
pub struct JsEngine {
    evaluate: Option<Function>,
    document_start: Option<Function>,
}

impl JsEngine {
    pub fn new(evaluate: Option<Function>, document_start: Option<Function>) -> Self {
        Self {
            evaluate,
            document_start,
        }
    }
}

impl ScriptEngine for JsEngine {
    fn evaluate(&self, script: &str) -> Result<(), EngineError> {
        let result = match &self.evaluate {
            Some(f) => f.call1(&JsValue::NULL, &JsValue::from_str(script)),
            None => js_sys::eval(script),
        };
        result
            .map(|_| ())
            .map_err(|e| EngineError::new(error_message(&e)))
    }

    fn add_document_start_script(&self, script: &str) -> Result<(), EngineError> {
        match &self.document_start {
            Some(f) => f
                .call1(&JsValue::NULL, &JsValue::from_str(script))
                .map(|_| ())
                .map_err(|e| EngineError::new(error_message(&e))),
            None => Ok(()),
        }
    }
}
