// gom/src/types/value.rs
use std::fmt;
use std::rc::Rc;
use glam::{DVec2, DVec3, DVec4};
use crate::types::arg_list::ArgList;
use crate::types::callable::{same_callable, CallableRef};
use crate::types::object::{same_object, ObjectRef};
use crate::types::any::Any;

/// Storage behind an [`Any`]. The meta type of the owning `Any`
/// says how the payload is interpreted.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Size(usize),
    Float(f32),
    Double(f64),
    Str(String),
    Object(Option<ObjectRef>),
    Callable(Option<CallableRef>),
    ArgList(ArgList),
    /// User-defined types registered with [`impl_gom_blob!`](crate::impl_gom_blob).
    Blob(Rc<dyn std::any::Any>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "unsigned int",
            Value::Long(_) => "long",
            Value::ULong(_) => "unsigned long",
            Value::Size(_) => "size_t",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Callable(_) => "callable",
            Value::ArgList(_) => "arglist",
            Value::Blob(_) => "blob",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::ULong(a), Value::ULong(b)) => a == b,
            (Value::Size(a), Value::Size(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => match (a, b) {
                (Some(a), Some(b)) => same_object(a, b),
                (None, None) => true,
                _ => false,
            },
            (Value::Callable(a), Value::Callable(b)) => match (a, b) {
                (Some(a), Some(b)) => same_callable(a, b),
                (None, None) => true,
                _ => false,
            },
            (Value::ArgList(a), Value::ArgList(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::UInt(v) => write!(f, "UInt({v})"),
            Value::Long(v) => write!(f, "Long({v})"),
            Value::ULong(v) => write!(f, "ULong({v})"),
            Value::Size(v) => write!(f, "Size({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Double(v) => write!(f, "Double({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Object(Some(o)) => write!(f, "Object({})", o.string_id()),
            Value::Object(None) => write!(f, "Object(nil)"),
            Value::Callable(Some(_)) => write!(f, "Callable"),
            Value::Callable(None) => write!(f, "Callable(nil)"),
            Value::ArgList(args) => write!(f, "ArgList{args}"),
            Value::Blob(_) => write!(f, "Blob"),
        }
    }
}

/// Native Rust types that can live inside an [`Any`].
///
/// The native type identifier used by the registry is
/// `std::any::type_name::<Self>()`.
pub trait GomType: Clone + 'static {
    fn into_value(self) -> Value;

    /// Exact extraction: the payload must have the matching variant.
    fn from_value(value: &Value) -> Option<Self>;

    /// Lenient extraction used by [`Any::convert_value`]. The default tries
    /// the exact payload and then a string through the serializer of `Self`.
    fn convert_from(any: &Any) -> Option<Self> {
        any.get_value::<Self>().or_else(|| any.get_from_string::<Self>())
    }

    fn typeid_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

macro_rules! impl_gom_primitive {
    ($t:ty, $variant:ident) => {
        impl GomType for $t {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

// Numeric types with the legacy fallback chain: exact (or string), then
// the listed types in order, narrowed with `as`.
macro_rules! impl_gom_numeric {
    ($t:ty, $variant:ident, [$($fallback:ty),*]) => {
        impl GomType for $t {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn convert_from(any: &Any) -> Option<Self> {
                if let Some(v) = any.get_value::<Self>().or_else(|| any.get_from_string::<Self>()) {
                    return Some(v);
                }
                $(
                    if let Some(v) = any.get_value::<$fallback>() {
                        return Some(v as $t);
                    }
                )*
                None
            }
        }
    };
}

impl_gom_primitive!(bool, Bool);
impl_gom_primitive!(i64, Long);
impl_gom_primitive!(u64, ULong);
impl_gom_primitive!(usize, Size);
impl_gom_primitive!(ArgList, ArgList);
impl_gom_numeric!(u32, UInt, [i32, f32, f64]);
impl_gom_numeric!(i32, Int, [u32, f32, f64]);
impl_gom_numeric!(f32, Float, [f64, u32, i32]);
impl_gom_numeric!(f64, Double, [f32, u32, i32]);

impl GomType for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn convert_from(any: &Any) -> Option<Self> {
        if any.is_null() {
            None
        } else {
            Some(any.as_string())
        }
    }
}

/// Marker for the `void` type.
impl GomType for () {
    fn into_value(self) -> Value {
        Value::Null
    }

    fn from_value(_value: &Value) -> Option<Self> {
        Some(())
    }
}

impl GomType for ObjectRef {
    fn into_value(self) -> Value {
        Value::Object(Some(self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(Some(o)) => Some(o.clone()),
            _ => None,
        }
    }

    // Any pointer-to-class type carries an object.
    fn convert_from(any: &Any) -> Option<Self> {
        Self::from_value(any.value())
    }
}

impl GomType for CallableRef {
    fn into_value(self) -> Value {
        Value::Callable(Some(self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Callable(Some(c)) => Some(c.clone()),
            _ => None,
        }
    }

    fn convert_from(any: &Any) -> Option<Self> {
        Self::from_value(any.value())
    }
}

/// Opts a `Clone + 'static` type into [`Value::Blob`] storage.
#[macro_export]
macro_rules! impl_gom_blob {
    ($t:ty) => {
        impl $crate::types::value::GomType for $t {
            fn into_value(self) -> $crate::types::value::Value {
                $crate::types::value::Value::Blob(::std::rc::Rc::new(self))
            }

            fn from_value(value: &$crate::types::value::Value) -> Option<Self> {
                match value {
                    $crate::types::value::Value::Blob(blob) => blob.downcast_ref::<$t>().cloned(),
                    _ => None,
                }
            }
        }
    };
}

impl_gom_blob!(DVec2);
impl_gom_blob!(DVec3);
impl_gom_blob!(DVec4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_extraction_needs_matching_variant() {
        assert_eq!(i32::from_value(&Value::Int(3)), Some(3));
        assert_eq!(i32::from_value(&Value::UInt(3)), None);
        assert_eq!(String::from_value(&Value::Str("a".into())), Some("a".to_string()));
    }

    #[test]
    fn blobs_downcast_to_their_type() {
        let v = DVec3::new(1.0, 2.0, 3.0).into_value();
        assert_eq!(DVec3::from_value(&v), Some(DVec3::new(1.0, 2.0, 3.0)));
        assert_eq!(DVec2::from_value(&v), None);
    }

    #[test]
    fn values_compare_by_payload() {
        assert_eq!(Value::Double(1.5), Value::Double(1.5));
        assert_ne!(Value::Int(1), Value::UInt(1));
        assert_eq!(Value::Object(None), Value::Object(None));
    }
}
