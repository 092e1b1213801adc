//! JSON value model shared by every bridge payload.
//!
//! `Value` is the canonical in-memory representation of anything that crosses
//! the bridge. Numbers are always `f64`; the wire does not distinguish
//! integers from floats.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Object representation used by `Value::Object`.
pub type Map = BTreeMap<String, Value>;

/// Largest integer that `f64` represents exactly (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A JSON value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// JSON string
    String(String),
    /// JSON number (integers are not preserved as a distinct type)
    Number(f64),
    /// JSON boolean
    Bool(bool),
    /// JSON array
    Array(Vec<Value>),
    /// JSON object (key order is not significant)
    Object(Map),
    /// JSON null
    #[default]
    Null,
}

// =============================================================================
// Type checks and extraction
// =============================================================================

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Look up an element when this value is an array.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|items| items.get(index))
    }

    /// The number as an exact non-negative integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        let n = self.as_f64()?;
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= MAX_EXACT_INTEGER {
            Some(n as u64)
        } else {
            None
        }
    }
}

// =============================================================================
// JSON text
// =============================================================================

impl Value {
    /// Parse JSON text.
    ///
    /// Malformed text yields `Value::Null`. A broken frame from the page must
    /// never take the bridge down, so the parse error is only logged.
    pub fn from_json_str(text: &str) -> Value {
        match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("[value] Discarding malformed JSON ({}): {:.120}", e, text);
                Value::Null
            }
        }
    }

    /// Encode as compact JSON text. Falls back to `"null"`.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("null"))
    }

    /// Build a value from any serializable Rust type.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value, CodecError> {
        serde_json::to_value(value)
            .map(Value::from)
            .map_err(CodecError::encode)
    }

    /// Decode this value into a Rust type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        T::deserialize(serde_json::Value::from(self)).map_err(CodecError::decode)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

// =============================================================================
// Serde
// =============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                // Integral numbers go out as JSON integers, the way the page emits them
                if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

// =============================================================================
// serde_json interop
// =============================================================================

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                // Integral numbers must stay integers so typed decoding into u32 etc. works
                if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        serde_json::Value::from(&value)
    }
}

// =============================================================================
// Literal construction
// =============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(f64::from(n))
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Object(map.into_iter().collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<f64>().prop_filter("finite", |n| n.is_finite()).prop_map(Value::Number),
            any::<i32>().prop_map(Value::from),
            ".{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map(".{0,8}", inner, 0..6).prop_map(Value::Object),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_json_text_round_trip(value in arb_value()) {
            let text = value.to_json_string();
            prop_assert_eq!(Value::from_json_str(&text), value);
        }
    }

    #[test]
    fn test_float_text_round_trip_is_exact() {
        for n in [
            2.3655054145979826e19,
            4.258267445644768e-8,
            0.1 + 0.2,
            f64::MAX,
            f64::MIN_POSITIVE,
            5e-324,
            -1.7976931348623157e308,
        ] {
            let text = Value::Number(n).to_json_string();
            assert_eq!(Value::from_json_str(&text), Value::Number(n), "{}", text);
        }
    }

    #[test]
    fn test_malformed_json_is_null() {
        assert_eq!(Value::from_json_str("{not json"), Value::Null);
        assert_eq!(Value::from_json_str(""), Value::Null);
        assert_eq!(Value::from_json_str("[1, 2"), Value::Null);
    }

    #[test]
    fn test_equality_is_type_strict() {
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::from(true), Value::from(1));
        assert_ne!(Value::Null, Value::from(0));
        assert_eq!(Value::from(1), Value::Number(1.0));
    }

    #[test]
    fn test_bool_is_not_number() {
        assert_eq!(Value::from_json_str("true"), Value::Bool(true));
        assert_eq!(Value::from_json_str("1"), Value::Number(1.0));
    }

    #[test]
    fn test_integral_numbers_encode_as_integers() {
        assert_eq!(Value::from(42).to_json_string(), "42");
        assert_eq!(Value::from(-3.0).to_json_string(), "-3");
        assert_eq!(Value::from(2.5).to_json_string(), "2.5");
    }

    #[test]
    fn test_non_finite_number_encodes_as_null() {
        assert_eq!(Value::Number(f64::NAN).to_json_string(), "null");
        assert_eq!(Value::Number(f64::INFINITY).to_json_string(), "null");
    }

    #[test]
    fn test_object_encoding_is_sorted() {
        let value: Value = vec![("b", Value::from(2)), ("a", Value::from(1))]
            .into_iter()
            .collect();
        assert_eq!(value.to_json_string(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_nested_accessors() {
        let value = Value::from_json_str(r#"{"user":{"tags":["x","y"],"age":30}}"#);
        let user = value.get("user").unwrap();
        assert_eq!(user.get("age").and_then(Value::as_f64), Some(30.0));
        assert_eq!(user.get("tags").and_then(|t| t.get_index(1)), Some(&Value::from("y")));
        assert!(value.get("missing").is_none());
        assert!(Value::from(3).get("x").is_none());
    }

    #[test]
    fn test_as_u64() {
        assert_eq!(Value::from(7).as_u64(), Some(7));
        assert_eq!(Value::from(7.5).as_u64(), None);
        assert_eq!(Value::from(-1).as_u64(), None);
        assert_eq!(Value::from("7").as_u64(), None);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
        tags: Vec<String>,
    }

    #[test]
    fn test_typed_round_trip() {
        let user = User {
            name: String::from("Alice"),
            age: 28,
            tags: vec![String::from("admin")],
        };
        let value = Value::from_serialize(&user).unwrap();
        assert_eq!(value.get("age"), Some(&Value::Number(28.0)));
        let back: User = value.decode().unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_typed_decode_mismatch() {
        let value = Value::from("not a user");
        let err = value.decode::<User>().unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_from_option_and_unit() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
        assert_eq!(Value::from(()), Value::Null);
    }

    #[test]
    fn test_serde_json_interop() {
        let json = serde_json::json!({"a": [1, 2.5, null, true, "s"]});
        let value = Value::from(json.clone());
        assert_eq!(serde_json::Value::from(&value), json);
    }
}
