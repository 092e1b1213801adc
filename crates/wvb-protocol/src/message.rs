//! Message types carried over the bridge.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::CodecError;
use crate::value::Value;
use crate::wire;

/// Identifier correlating a native-initiated call with its reply.
pub type CallbackId = u64;

// ============================================================================
// Native → Script
// ============================================================================

/// A native-initiated call, as handed to the page's dispatch function.
///
/// `data` is the JSON *text* of the payload, not a nested JSON value. The
/// page library parses it a second time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInfo {
    /// Page-side method name, e.g. `"nameA.funcB"`
    pub method: String,
    /// Correlation ID for the reply
    pub callback_id: CallbackId,
    /// JSON-encoded payload
    pub data: String,
}

impl CallInfo {
    /// Build a call with a `Value` payload.
    pub fn new(method: impl Into<String>, callback_id: CallbackId, payload: &Value) -> Self {
        Self {
            method: method.into(),
            callback_id,
            data: payload.to_json_string(),
        }
    }

    /// Build a call whose payload is absent (`"null"` on the wire).
    pub fn without_payload(method: impl Into<String>, callback_id: CallbackId) -> Self {
        Self::new(method, callback_id, &Value::Null)
    }

    /// Build a call from any serializable payload.
    pub fn with_serializable<T: Serialize + ?Sized>(
        method: impl Into<String>,
        callback_id: CallbackId,
        payload: &T,
    ) -> Result<Self, CodecError> {
        let data = serde_json::to_string(payload).map_err(CodecError::encode)?;
        Ok(Self {
            method: method.into(),
            callback_id,
            data,
        })
    }

    /// Encode the frame as JSON text.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::encode)
    }

    /// Decode the payload text back into a value.
    pub fn payload(&self) -> Value {
        Value::from_json_str(&self.data)
    }
}

// ============================================================================
// Script → Native
// ============================================================================

/// Argument envelope of a script-originated call.
///
/// `data` distinguishes an absent key (`None`) from an explicit JSON `null`
/// (`Some(Value::Null)`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Name of the page function awaiting the reply
    #[serde(rename = "_dscbstub", default)]
    pub callback_stub: Option<String>,
    /// Call argument
    #[serde(default, deserialize_with = "present_value")]
    pub data: Option<Value>,
}

/// A key that is present always yields `Some`, even when its value is `null`.
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl InboundMessage {
    pub fn new(callback_stub: Option<String>, data: Option<Value>) -> Self {
        Self {
            callback_stub,
            data,
        }
    }

    /// Parse an argument envelope leniently.
    ///
    /// Malformed text, a non-object envelope or a non-string stub never fail:
    /// the affected fields are simply absent.
    pub fn parse(text: &str) -> Self {
        Self::from_value(&Value::from_json_str(text))
    }

    /// Extract the envelope fields from an already-decoded value.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        Self {
            callback_stub: map
                .get(wire::CALLBACK_STUB_KEY)
                .and_then(Value::as_str)
                .map(str::to_owned),
            data: map.get(wire::DATA_KEY).cloned(),
        }
    }

    /// The handler parameter: the payload, or `Null` when absent.
    pub fn param(&self) -> Value {
        self.data.clone().unwrap_or(Value::Null)
    }
}

/// Payload of the internal return-value method.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnValue {
    /// Callback ID of the native call being answered
    pub id: CallbackId,
    /// Result data (absent when the page sent none)
    pub data: Option<Value>,
    /// `false` marks a partial reply; more will follow
    pub complete: bool,
    /// Error object reported by the page, if any
    pub error: Option<Value>,
}

impl ReturnValue {
    /// Decode a return-value payload.
    ///
    /// Returns `None` unless `id` is a non-negative integral number.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let id = map.get("id").and_then(Value::as_u64)?;
        Some(Self {
            id,
            data: map.get("data").cloned(),
            complete: map.get("complete").and_then(Value::as_bool).unwrap_or(true),
            error: map.get("error").filter(|e| !e.is_null()).cloned(),
        })
    }

    /// The structured error carried by this reply, if it has a valid one.
    pub fn script_error(&self) -> Option<ScriptError> {
        self.error.as_ref().and_then(ScriptError::from_value)
    }
}

/// An exception reported by the page in transportable form.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("name: {name}\nmessage: {message}\nstack: {stack}")]
pub struct ScriptError {
    pub name: String,
    pub message: String,
    pub stack: String,
}

impl ScriptError {
    /// Recognize `{name, message, stack}`; all three must be strings.
    /// Extra fields are ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
        Some(Self {
            name: field("name")?,
            message: field("message")?,
            stack: field("stack")?,
        })
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Reply envelope `{code, data}` returned to the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i32,
    pub data: Value,
}

impl Envelope {
    /// Successful reply; a handler that returned nothing replies `null`.
    pub fn success(result: Option<Value>) -> Self {
        Self {
            code: wire::CODE_SUCCESS,
            data: result.unwrap_or(Value::Null),
        }
    }

    /// Failed reply carrying a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: wire::CODE_FAILURE,
            data: Value::String(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == wire::CODE_SUCCESS
    }

    /// Encode as JSON text.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"data":null}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_info_encoding() {
        let call = CallInfo::new("foo.bar", 1, &Value::Array(vec![Value::from("AAA")]));
        assert_eq!(
            call.to_json().unwrap(),
            r#"{"method":"foo.bar","callbackId":1,"data":"[\"AAA\"]"}"#
        );
    }

    #[test]
    fn test_call_info_without_payload() {
        let call = CallInfo::without_payload("ping", 7);
        assert_eq!(call.data, "null");
        assert_eq!(call.payload(), Value::Null);
    }

    #[test]
    fn test_call_info_with_serializable() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }
        let call = CallInfo::with_serializable("draw", 3, &[Point { x: 1, y: 2 }]).unwrap();
        assert_eq!(call.data, r#"[{"x":1,"y":2}]"#);
    }

    #[test]
    fn test_call_info_decoding() {
        let call: CallInfo =
            serde_json::from_str(r#"{"method":"m","callbackId":42,"data":"{}"}"#).unwrap();
        assert_eq!(call.callback_id, 42);
        assert_eq!(call.payload(), Value::Object(Default::default()));
    }

    #[test]
    fn test_inbound_absent_vs_null_data() {
        let absent: InboundMessage = serde_json::from_str(r#"{"_dscbstub":"cb"}"#).unwrap();
        let null: InboundMessage = serde_json::from_str(r#"{"_dscbstub":"cb","data":null}"#).unwrap();
        assert_eq!(absent.data, None);
        assert_eq!(null.data, Some(Value::Null));
        assert_ne!(absent, null);
        assert_eq!(absent.param(), Value::Null);
        assert_eq!(null.param(), Value::Null);
    }

    #[test]
    fn test_inbound_missing_stub() {
        let msg: InboundMessage = serde_json::from_str(r#"{"data":[1,2]}"#).unwrap();
        assert_eq!(msg.callback_stub, None);
        assert_eq!(msg.data, Some(Value::from_json_str("[1,2]")));
    }

    #[test]
    fn test_inbound_encoding_writes_both_keys() {
        let text = serde_json::to_string(&InboundMessage::default()).unwrap();
        assert_eq!(text, r#"{"_dscbstub":null,"data":null}"#);
    }

    #[test]
    fn test_inbound_lenient_parse() {
        let msg = InboundMessage::parse(r#"{"_dscbstub":12,"data":"x"}"#);
        assert_eq!(msg.callback_stub, None);
        assert_eq!(msg.data, Some(Value::from("x")));

        assert_eq!(InboundMessage::parse("garbage"), InboundMessage::default());
        assert_eq!(InboundMessage::parse("[1]"), InboundMessage::default());
        assert_eq!(InboundMessage::parse(r#"{"data":null}"#).data, Some(Value::Null));
    }

    #[test]
    fn test_return_value_defaults() {
        let rv = ReturnValue::from_value(&Value::from_json_str(r#"{"id":3,"data":"ok"}"#)).unwrap();
        assert_eq!(rv.id, 3);
        assert_eq!(rv.data, Some(Value::from("ok")));
        assert!(rv.complete);
        assert!(rv.error.is_none());
    }

    #[test]
    fn test_return_value_requires_integral_id() {
        assert!(ReturnValue::from_value(&Value::from_json_str(r#"{"id":"3"}"#)).is_none());
        assert!(ReturnValue::from_value(&Value::from_json_str(r#"{"id":1.5}"#)).is_none());
        assert!(ReturnValue::from_value(&Value::from_json_str(r#"{"data":1}"#)).is_none());
        assert!(ReturnValue::from_value(&Value::Null).is_none());
    }

    #[test]
    fn test_return_value_null_error_is_no_error() {
        let rv = ReturnValue::from_value(&Value::from_json_str(r#"{"id":1,"error":null}"#)).unwrap();
        assert!(rv.error.is_none());
    }

    #[test]
    fn test_script_error_recognition() {
        let value = Value::from_json_str(
            r#"{"name":"TypeError","message":"x is undefined","stack":"at f (a.js:1)","code":"UNKNOWN"}"#,
        );
        let err = ScriptError::from_value(&value).unwrap();
        assert_eq!(
            err.to_string(),
            "name: TypeError\nmessage: x is undefined\nstack: at f (a.js:1)"
        );

        let partial = Value::from_json_str(r#"{"name":"Error","message":"m"}"#);
        assert!(ScriptError::from_value(&partial).is_none());
    }

    #[test]
    fn test_envelope_json() {
        assert_eq!(Envelope::success(None).to_json_string(), r#"{"code":0,"data":null}"#);
        assert_eq!(
            Envelope::success(Some(Value::from(42))).to_json_string(),
            r#"{"code":0,"data":42}"#
        );
        assert_eq!(
            Envelope::failure("Method not found").to_json_string(),
            r#"{"code":-1,"data":"Method not found"}"#
        );
        assert_eq!(Envelope::failure("").to_json_string(), r#"{"code":-1,"data":""}"#);
    }
}
