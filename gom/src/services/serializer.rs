// gom/src/services/serializer.rs
use std::marker::PhantomData;
use std::str::FromStr;
use std::fmt::Display;
use std::rc::Rc;
use glam::{DVec2, DVec3, DVec4};
use crate::reflection::meta_enum::MetaEnum;
use crate::types::value::{GomType, Value};

/// Text conversion attached to a meta type. Returning `None` means
/// the conversion is not possible.
pub trait Serializer {
    fn serialize_read(&self, text: &str) -> Option<Value>;
    fn serialize_write(&self, value: &Value) -> Option<String>;
}

/// Serializer for any native type with `FromStr` and `Display`.
pub struct GenericSerializer<T>(PhantomData<T>);

impl<T> GenericSerializer<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for GenericSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GomType + FromStr + Display> Serializer for GenericSerializer<T> {
    fn serialize_read(&self, text: &str) -> Option<Value> {
        text.trim().parse::<T>().ok().map(GomType::into_value)
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        T::from_value(value).map(|v| v.to_string())
    }
}

/// Strings read a whole line.
pub struct StringSerializer;

impl Serializer for StringSerializer {
    fn serialize_read(&self, text: &str) -> Option<Value> {
        Some(Value::Str(text.lines().next().unwrap_or("").to_string()))
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        String::from_value(value)
    }
}

/// Accepts `true`/`1` and `false`/`0`.
pub struct BoolSerializer;

impl Serializer for BoolSerializer {
    fn serialize_read(&self, text: &str) -> Option<Value> {
        match text.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        }
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        bool::from_value(value).map(|b| b.to_string())
    }
}

/// `void` writes nothing and cannot be read.
pub struct VoidSerializer;

impl Serializer for VoidSerializer {
    fn serialize_read(&self, _text: &str) -> Option<Value> {
        None
    }

    fn serialize_write(&self, _value: &Value) -> Option<String> {
        Some(String::new())
    }
}

/// Pointers write the object string id. Only a null pointer can be read back.
pub struct PointerSerializer;

impl Serializer for PointerSerializer {
    fn serialize_read(&self, text: &str) -> Option<Value> {
        match text.trim() {
            "nil" | "null" | "0" => Some(Value::Object(None)),
            _ => None,
        }
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        match value {
            Value::Object(Some(object)) => Some(object.string_id()),
            Value::Object(None) | Value::Callable(None) | Value::Null => Some("nil".to_string()),
            Value::Callable(Some(_)) => Some("@callable".to_string()),
            _ => None,
        }
    }
}

/// Argument lists write `(name:value ...)`.
pub struct ArgListSerializer;

impl Serializer for ArgListSerializer {
    fn serialize_read(&self, _text: &str) -> Option<Value> {
        None
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        match value {
            Value::ArgList(args) => Some(args.serialize()),
            _ => None,
        }
    }
}

/// Class types have no values of their own, only pointers to them.
pub struct OpaqueSerializer;

impl Serializer for OpaqueSerializer {
    fn serialize_read(&self, _text: &str) -> Option<Value> {
        None
    }

    fn serialize_write(&self, _value: &Value) -> Option<String> {
        None
    }
}

/// Enums read and write value names. Integers are accepted on read.
pub struct EnumSerializer {
    meta_enum: Rc<MetaEnum>,
}

impl EnumSerializer {
    pub fn new(meta_enum: Rc<MetaEnum>) -> Self {
        Self { meta_enum }
    }
}

impl Serializer for EnumSerializer {
    fn serialize_read(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        if let Some(value) = self.meta_enum.get_value_by_name(text) {
            return Some(Value::Int(value));
        }
        text.parse::<i32>()
            .ok()
            .filter(|value| self.meta_enum.has_value(*value))
            .map(Value::Int)
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        match value {
            Value::Int(v) => self.meta_enum.get_name_by_value(*v),
            _ => None,
        }
    }
}

/// Fixed-size float vectors written as space-separated components.
pub trait VectorValue: GomType + Sized {
    const DIMENSION: usize;
    fn from_components(components: &[f64]) -> Self;
    fn components(&self) -> Vec<f64>;
}

impl VectorValue for DVec2 {
    const DIMENSION: usize = 2;
    fn from_components(c: &[f64]) -> Self { DVec2::new(c[0], c[1]) }
    fn components(&self) -> Vec<f64> { self.to_array().to_vec() }
}

impl VectorValue for DVec3 {
    const DIMENSION: usize = 3;
    fn from_components(c: &[f64]) -> Self { DVec3::new(c[0], c[1], c[2]) }
    fn components(&self) -> Vec<f64> { self.to_array().to_vec() }
}

impl VectorValue for DVec4 {
    const DIMENSION: usize = 4;
    fn from_components(c: &[f64]) -> Self { DVec4::new(c[0], c[1], c[2], c[3]) }
    fn components(&self) -> Vec<f64> { self.to_array().to_vec() }
}

pub struct VectorSerializer<V>(PhantomData<V>);

impl<V> VectorSerializer<V> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for VectorSerializer<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: VectorValue> Serializer for VectorSerializer<V> {
    fn serialize_read(&self, text: &str) -> Option<Value> {
        let components = text
            .split_whitespace()
            .map(|c| c.parse::<f64>().ok())
            .collect::<Option<Vec<f64>>>()?;
        if components.len() != V::DIMENSION {
            return None;
        }
        Some(V::from_components(&components).into_value())
    }

    fn serialize_write(&self, value: &Value) -> Option<String> {
        let v = V::from_value(value)?;
        let parts: Vec<String> = v.components().iter().map(|c| c.to_string()).collect();
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bool_accepts_digits() {
        assert_eq!(BoolSerializer.serialize_read("1"), Some(Value::Bool(true)));
        assert_eq!(BoolSerializer.serialize_read(" false "), Some(Value::Bool(false)));
        assert_eq!(BoolSerializer.serialize_read("yes"), None);
    }

    #[test]
    fn strings_stop_at_end_of_line() {
        assert_eq!(
            StringSerializer.serialize_read("first line\nsecond"),
            Some(Value::Str("first line".to_string()))
        );
    }

    #[test]
    fn vectors_need_every_component() {
        let s = VectorSerializer::<DVec3>::new();
        assert_eq!(s.serialize_read("1 2"), None);
        let v = s.serialize_read("1 2.5 -3").unwrap();
        assert_eq!(s.serialize_write(&v).unwrap(), "1 2.5 -3");
    }

    #[test]
    fn generic_rejects_garbage() {
        assert_eq!(GenericSerializer::<i32>::new().serialize_read("12a"), None);
        assert_eq!(GenericSerializer::<u32>::new().serialize_read("-1"), None);
    }

    proptest! {
        #[test]
        fn doubles_round_trip(x in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let s = GenericSerializer::<f64>::new();
            let text = s.serialize_write(&Value::Double(x)).unwrap();
            prop_assert_eq!(s.serialize_read(&text), Some(Value::Double(x)));
        }

        #[test]
        fn ints_round_trip(x in any::<i32>()) {
            let s = GenericSerializer::<i32>::new();
            let text = s.serialize_write(&Value::Int(x)).unwrap();
            prop_assert_eq!(s.serialize_read(&text), Some(Value::Int(x)));
        }

        #[test]
        fn single_line_strings_round_trip(x in "[^\r\n]*") {
            let text = StringSerializer.serialize_write(&Value::Str(x.clone())).unwrap();
            prop_assert_eq!(StringSerializer.serialize_read(&text), Some(Value::Str(x)));
        }
    }
}
