//! `JsValue` ⇄ `Value` adapters.
//!
//! The only place dynamically typed script values are handled. Everything
//! past this boundary sees `Value`.

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wvb_protocol::{Map, Value};

/// Convert a script value into a `Value`.
///
/// `undefined` maps to `Null`. Functions, symbols and bigints are not
/// representable and yield `None`, as does any container holding one.
pub fn js_to_value(value: &JsValue) -> Option<Value> {
    if value.is_null() || value.is_undefined() {
        return Some(Value::Null);
    }
    if let Some(b) = value.as_bool() {
        return Some(Value::Bool(b));
    }
    if let Some(n) = value.as_f64() {
        return Some(Value::Number(n));
    }
    if let Some(s) = value.as_string() {
        return Some(Value::String(s));
    }
    if value.is_function() || value.is_symbol() || value.is_bigint() {
        return None;
    }
    if Array::is_array(value) {
        let array: &Array = value.unchecked_ref();
        return array
            .iter()
            .map(|item| js_to_value(&item))
            .collect::<Option<Vec<Value>>>()
            .map(Value::Array);
    }
    if value.is_object() {
        let object: &Object = value.unchecked_ref();
        let mut map = Map::new();
        for entry in Object::entries(object).iter() {
            let pair: Array = entry.unchecked_into();
            let key = pair.get(0).as_string()?;
            map.insert(key, js_to_value(&pair.get(1))?);
        }
        return Some(Value::Object(map));
    }
    None
}

/// Convert a `Value` into a fresh script value.
pub fn value_to_js(value: &Value) -> JsValue {
    match value {
        Value::Null => JsValue::NULL,
        Value::Bool(b) => JsValue::from_bool(*b),
        Value::Number(n) => JsValue::from_f64(*n),
        Value::String(s) => JsValue::from_str(s),
        Value::Array(items) => items.iter().map(value_to_js).collect::<Array>().into(),
        Value::Object(map) => {
            let object = Object::new();
            for (key, item) in map {
                if let Err(e) = Reflect::set(&object, &JsValue::from_str(key), &value_to_js(item)) {
                    log::warn!("[wvb-web] Failed to set property '{}': {}", key, error_message(&e));
                }
            }
            object.into()
        }
    }
}

/// Best-effort message text of a thrown script value.
pub fn error_message(error: &JsValue) -> String {
    if let Some(text) = error.as_string() {
        return text;
    }
    Reflect::get(error, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", error))
}
