//! Adapter between `Value` and dynamically typed host values.
//!
//! Native hosts sometimes hand the bridge loosely typed data (`Box<dyn Any>`
//! trees built by plugin layers or scripting glue). This adapter is the only
//! place such values are accepted; everything past it works on `Value`.
//!
//! Supported host types:
//!
//! | Host type | Value |
//! |-----------|-------|
//! | `()`, `Option::None` | `Null` |
//! | `bool` | `Bool` |
//! | integer and float primitives | `Number` |
//! | `String`, `&'static str` | `String` |
//! | `Vec<Box<dyn Any>>` | `Array` |
//! | `HashMap` / `BTreeMap` of `String -> Box<dyn Any>` | `Object` |
//! | `Value` | itself |
//!
//! Anything else (including an unsupported element nested in a collection)
//! fails the conversion with `None`.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};

use crate::value::{Map, Value};

macro_rules! downcast_number {
    ($value:expr, $($ty:ty),*) => {
        $(
            if let Some(n) = $value.downcast_ref::<$ty>() {
                return Some(Value::Number(*n as f64));
            }
        )*
    };
}

impl Value {
    /// Convert a dynamically typed host value.
    ///
    /// Returns `None` when the value (or anything nested in it) has a type
    /// the bridge cannot represent.
    pub fn from_any(value: &dyn Any) -> Option<Value> {
        if let Some(v) = value.downcast_ref::<Value>() {
            return Some(v.clone());
        }
        if value.is::<()>() {
            return Some(Value::Null);
        }
        if let Some(b) = value.downcast_ref::<bool>() {
            return Some(Value::Bool(*b));
        }
        downcast_number!(value, f64, f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        if let Some(s) = value.downcast_ref::<String>() {
            return Some(Value::String(s.clone()));
        }
        if let Some(s) = value.downcast_ref::<&'static str>() {
            return Some(Value::String((*s).to_owned()));
        }
        if let Some(opt) = value.downcast_ref::<Option<Box<dyn Any>>>() {
            return match opt {
                Some(inner) => Value::from_any(inner.as_ref()),
                None => Some(Value::Null),
            };
        }
        if let Some(items) = value.downcast_ref::<Vec<Box<dyn Any>>>() {
            return items
                .iter()
                .map(|item| Value::from_any(item.as_ref()))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array);
        }
        if let Some(map) = value.downcast_ref::<HashMap<String, Box<dyn Any>>>() {
            return convert_entries(map.iter());
        }
        if let Some(map) = value.downcast_ref::<BTreeMap<String, Box<dyn Any>>>() {
            return convert_entries(map.iter());
        }
        None
    }

    /// Convert into a dynamically typed host value.
    ///
    /// `Null` becomes `()`, numbers become `f64`, arrays become
    /// `Vec<Box<dyn Any>>` and objects `HashMap<String, Box<dyn Any>>`, so the
    /// result always converts back with [`Value::from_any`].
    pub fn to_any(&self) -> Box<dyn Any> {
        match self {
            Value::Null => Box::new(()),
            Value::Bool(b) => Box::new(*b),
            Value::Number(n) => Box::new(*n),
            Value::String(s) => Box::new(s.clone()),
            Value::Array(items) => {
                Box::new(items.iter().map(Value::to_any).collect::<Vec<Box<dyn Any>>>())
            }
            Value::Object(map) => Box::new(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_any()))
                    .collect::<HashMap<String, Box<dyn Any>>>(),
            ),
        }
    }
}

fn convert_entries<'a>(entries: impl Iterator<Item = (&'a String, &'a Box<dyn Any>)>) -> Option<Value> {
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert(key.clone(), Value::from_any(value.as_ref())?);
    }
    Some(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(Value::from_any(&42i32), Some(Value::Number(42.0)));
        assert_eq!(Value::from_any(&1.5f32), Some(Value::Number(1.5)));
        assert_eq!(Value::from_any(&true), Some(Value::Bool(true)));
        assert_eq!(Value::from_any(&String::from("hi")), Some(Value::from("hi")));
        assert_eq!(Value::from_any(&"static"), Some(Value::from("static")));
        assert_eq!(Value::from_any(&()), Some(Value::Null));
    }

    #[test]
    fn test_unsupported_type_is_none() {
        struct Opaque;
        assert_eq!(Value::from_any(&Opaque), None);
        assert_eq!(Value::from_any(&vec![1u8, 2, 3]), None);
    }

    #[test]
    fn test_nested_collections() {
        let mut inner: HashMap<String, Box<dyn Any>> = HashMap::new();
        inner.insert(String::from("n"), Box::new(3u64));
        let items: Vec<Box<dyn Any>> = vec![Box::new("a"), Box::new(inner), Box::new(None::<Box<dyn Any>>)];

        let value = Value::from_any(&items).unwrap();
        assert_eq!(value, Value::from_json_str(r#"["a",{"n":3},null]"#));
    }

    #[test]
    fn test_unsupported_nested_element_fails_whole_conversion() {
        struct Opaque;
        let items: Vec<Box<dyn Any>> = vec![Box::new(1i32), Box::new(Opaque)];
        assert_eq!(Value::from_any(&items), None);
    }

    #[test]
    fn test_to_any_round_trip() {
        let value = Value::from_json_str(r#"{"list":[1,"two",false,null],"nested":{"x":1.5}}"#);
        let any = value.to_any();
        assert_eq!(Value::from_any(any.as_ref()), Some(value));
    }
}
