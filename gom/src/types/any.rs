// gom/src/types/any.rs
use std::fmt;
use std::rc::Rc;
use crate::reflection::registry::{TypeRegistry, NULL_POINTER_TYPE};
use crate::reflection::meta_type::{MetaType, MetaTypeRef};
use crate::types::callable::CallableRef;
use crate::types::value::{GomType, Value};
use crate::types::arg_list::ArgList;
use crate::types::object::ObjectRef;
use crate::*;

/// A value tagged with its meta type. An `Any` without a meta type is null.
#[derive(Clone, Default)]
pub struct Any {
    meta_type: Option<MetaTypeRef>,
    value: Value,
}

impl Any {
    pub fn null() -> Self {
        Self::default()
    }

    /// Pairs a value with a type without checking that they agree.
    pub fn from_parts(meta_type: MetaTypeRef, value: Value) -> Self {
        Self { meta_type: Some(meta_type), value }
    }

    /// Wraps a native value, typed through the registry binding of `T`.
    pub fn new<T: GomType>(registry: &TypeRegistry, value: T) -> Self {
        let mut result = Self::null();
        result.set_value(registry, value);
        result
    }

    /// A default-constructed value of a type.
    pub fn create(meta_type: &MetaTypeRef) -> Self {
        Self {
            meta_type: Some(meta_type.clone()),
            value: meta_type.life_cycle().construct(),
        }
    }

    /// A pointer to an object, typed with the object's own class.
    pub fn from_object(object: &ObjectRef) -> Self {
        let class = object.meta_class();
        match class.registry().and_then(|r| r.pointer_type(class.name())) {
            Some(pointer) => Self::from_parts(pointer, Value::Object(Some(object.clone()))),
            None => {
                gom_err!("GOM", "Any::from_object() : no pointer type for {}", class.name());
                Self::null()
            }
        }
    }

    pub fn from_callable(registry: &TypeRegistry, callable: CallableRef) -> Self {
        Self::new(registry, callable)
    }

    /// The `nullptr_t` literal.
    pub fn null_pointer(registry: &TypeRegistry) -> Self {
        match registry.resolve_meta_type(NULL_POINTER_TYPE) {
            Some(t) => Self::from_parts(t, Value::Object(None)),
            None => Self::null(),
        }
    }

    /// An enum value by name.
    pub fn from_enum(meta_type: &MetaTypeRef, value_name: &str) -> Option<Self> {
        let value = meta_type.as_meta_enum()?.get_value_by_name(value_name)?;
        Some(Self::from_parts(meta_type.clone(), Value::Int(value)))
    }

    pub fn is_null(&self) -> bool {
        self.meta_type.is_none()
    }

    pub fn meta_type(&self) -> Option<&MetaTypeRef> {
        self.meta_type.as_ref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn reset(&mut self) {
        self.meta_type = None;
        self.value = Value::Null;
    }

    /// Whether this Any currently holds a `T`.
    pub fn has_type<T: GomType>(&self) -> bool {
        self.meta_type.as_ref().is_some_and(|t| accepts::<T>(t))
    }

    /// Stores a native value. A typed Any refuses a value of another type.
    pub fn set_value<T: GomType>(&mut self, registry: &TypeRegistry, value: T) -> bool {
        if let Some(current) = &self.meta_type {
            if !accepts::<T>(current) {
                gom_err!(
                    "GOM",
                    "Any::set_value() : cannot store {} in an Any of type {}",
                    T::typeid_name(),
                    current.name()
                );
                return false;
            }
            self.value = value.into_value();
            return true;
        }

        match registry.resolve_native::<T>() {
            Some(meta_type) => {
                self.meta_type = Some(meta_type);
                self.value = value.into_value();
                true
            }
            None => {
                gom_err!("GOM", "Any::set_value() : no meta type bound for {}", T::typeid_name());
                false
            }
        }
    }

    /// The stored value, only if it is a `T`.
    pub fn get_value<T: GomType>(&self) -> Option<T> {
        if self.has_type::<T>() {
            T::from_value(&self.value)
        } else {
            None
        }
    }

    /// The stored value as a `T`, converting where the legacy rules allow:
    /// strings go through the serializer of `T`, numbers through the
    /// fallback chains, and anything converts to a string.
    pub fn convert_value<T: GomType>(&self) -> Option<T> {
        if self.is_null() {
            None
        } else {
            T::convert_from(self)
        }
    }

    /// Reads a stored string as a `T` through the serializer of `T`.
    pub(crate) fn get_from_string<T: GomType>(&self) -> Option<T> {
        let Value::Str(text) = &self.value else {
            return None;
        };
        let registry = self.meta_type.as_ref()?.registry()?;
        let target = registry.resolve_native::<T>()?;
        let mut value = target.life_cycle().construct();
        if !Self::convert_from_string(&target, text, &mut value) {
            return None;
        }
        T::from_value(&value)
    }

    /// Text form through the serializer. Null gives an empty string.
    pub fn as_string(&self) -> String {
        match &self.meta_type {
            None => String::new(),
            Some(t) => Self::convert_to_string(t, &self.value).unwrap_or_default(),
        }
    }

    /// Parses `text` with the serializer of `meta_type` into `target`.
    pub fn convert_from_string(meta_type: &MetaType, text: &str, target: &mut Value) -> bool {
        match meta_type.serializer().serialize_read(text) {
            Some(value) => {
                *target = value;
                true
            }
            None => {
                gom_warn!("GOM", "Invalid value '{}' for {}", text, meta_type.name());
                false
            }
        }
    }

    pub fn convert_to_string(meta_type: &MetaType, value: &Value) -> Option<String> {
        let result = meta_type.serializer().serialize_write(value);
        if result.is_none() {
            gom_warn!("GOM", "Could not convert {} to string", meta_type.name());
        }
        result
    }

    /// Retypes this Any and parses `text` into it.
    pub fn set_from_string(&mut self, meta_type: &MetaTypeRef, text: &str) -> bool {
        let mut value = meta_type.life_cycle().construct();
        if !Self::convert_from_string(meta_type, text, &mut value) {
            return false;
        }
        self.meta_type = Some(meta_type.clone());
        self.value = value;
        true
    }

    /// The null pointer literal, or a name ending in `*`.
    pub fn is_pointer_type(meta_type: &MetaType) -> bool {
        meta_type.name() == NULL_POINTER_TYPE || meta_type.name().ends_with('*')
    }

    /// `T` for `T*`, `void` for the null pointer literal.
    pub fn pointed_type(meta_type: &MetaType) -> Option<MetaTypeRef> {
        let registry = meta_type.registry()?;
        if meta_type.name() == NULL_POINTER_TYPE {
            return registry.resolve_meta_type("void");
        }
        let pointed = meta_type.name().strip_suffix('*')?;
        registry.resolve_meta_type(pointed.trim_end())
    }

    /// Both types point to classes and the first derives from the second.
    pub fn pointer_can_be_casted_to(derived: &MetaType, base: &MetaType) -> bool {
        let (Some(derived), Some(base)) = (Self::pointed_type(derived), Self::pointed_type(base)) else {
            return false;
        };
        match (derived.as_meta_class(), base.as_meta_class()) {
            (Some(derived), Some(base)) => derived.is_subclass_of(base),
            _ => false,
        }
    }

    /// Copies into a value of `meta_type`, converting if the types differ.
    pub fn copy_to(&self, target: &mut Value, meta_type: &MetaTypeRef) -> bool {
        if let Some(own) = &self.meta_type {
            if Rc::ptr_eq(own, meta_type) {
                *target = self.value.clone();
                return true;
            }
        }
        self.copy_convert_to(target, meta_type)
    }

    /// Converts into a value of `meta_type`. The candidate types are
    /// tried in a fixed order; pointer casts come last.
    pub fn copy_convert_to(&self, target: &mut Value, meta_type: &MetaTypeRef) -> bool {
        fn attempt<T: GomType>(source: &Any, target: &mut Value, meta_type: &MetaType) -> Option<bool> {
            if !accepts::<T>(meta_type) {
                return None;
            }
            Some(match source.convert_value::<T>() {
                Some(v) => {
                    *target = v.into_value();
                    true
                }
                None => false,
            })
        }

        type Attempt = fn(&Any, &mut Value, &MetaType) -> Option<bool>;
        let attempts: [Attempt; 7] = [
            attempt::<u32>,
            attempt::<i32>,
            attempt::<f32>,
            attempt::<f64>,
            attempt::<String>,
            attempt::<usize>,
            attempt::<bool>,
        ];
        let meta: &MetaType = meta_type;
        for attempt in attempts {
            if let Some(done) = attempt(self, target, meta) {
                return done;
            }
        }

        if let Some(own) = &self.meta_type {
            if Self::is_pointer_type(own)
                && Self::is_pointer_type(meta_type)
                && Self::pointer_can_be_casted_to(own, meta_type)
            {
                *target = self.value.clone();
                return true;
            }
        }
        false
    }

    /// The same pointer retyped as `pointer_type`, if the cast is allowed.
    pub fn cast_to(&self, pointer_type: &MetaTypeRef) -> Option<Any> {
        let own = self.meta_type.as_ref()?;
        if Rc::ptr_eq(own, pointer_type) || Self::pointer_can_be_casted_to(own, pointer_type) {
            Some(Self::from_parts(pointer_type.clone(), self.value.clone()))
        } else {
            gom_warn!("GOM", "Cannot cast {} to {}", own.name(), pointer_type.name());
            None
        }
    }

    /// Converts into a fresh Any of `meta_type`.
    pub fn converted_to(&self, meta_type: &MetaTypeRef) -> Option<Any> {
        let mut value = meta_type.life_cycle().construct();
        if self.copy_to(&mut value, meta_type) {
            Some(Self::from_parts(meta_type.clone(), value))
        } else {
            None
        }
    }

    /// The stored object, for pointer values.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match &self.value {
            Value::Object(object) => object.clone(),
            _ => None,
        }
    }

    pub fn as_arg_list(&self) -> Option<&ArgList> {
        match &self.value {
            Value::ArgList(args) => Some(args),
            _ => None,
        }
    }
}

// Whether a meta type stores values of native type `T`. Objects are
// accepted by every pointer-to-class type.
fn accepts<T: GomType>(meta_type: &MetaType) -> bool {
    if std::any::TypeId::of::<T>() == std::any::TypeId::of::<ObjectRef>() {
        return Any::is_pointer_type(meta_type)
            && Any::pointed_type(meta_type).is_some_and(|t| t.is_class());
    }
    meta_type.typeid_name().as_deref() == Some(T::typeid_name())
}

impl PartialEq for Any {
    fn eq(&self, other: &Self) -> bool {
        let same_type = match (&self.meta_type, &other.meta_type) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_type && self.value == other.value
    }
}

impl fmt::Display for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.meta_type {
            Some(t) => write!(f, "Any({}: {:?})", t.name(), self.value),
            None => write!(f, "Any(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::registry::OBJECT_CLASS;
    use crate::reflection::dynamic::DynamicObject;
    use proptest::prelude::*;

    #[test]
    fn typed_any_refuses_other_types() {
        let registry = TypeRegistry::new();
        let mut any = registry.any(1i32);
        assert!(!any.set_value(&registry, 1.5f64));
        assert_eq!(any.get_value::<i32>(), Some(1));
        assert!(any.set_value(&registry, 7i32));
        assert_eq!(any.get_value::<i32>(), Some(7));
        assert_eq!(any.get_value::<f64>(), None);
    }

    #[test]
    fn aliases_share_the_type() {
        let registry = TypeRegistry::new();
        let any = registry.any(3u32);
        assert!(Rc::ptr_eq(any.meta_type().unwrap(), &registry.resolve_meta_type("index_t").unwrap()));
    }

    #[test]
    fn conversions_follow_the_legacy_chains() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.any(2.9f64).convert_value::<u32>(), Some(2));
        assert_eq!(registry.any(-4i32).convert_value::<f32>(), Some(-4.0));
        assert_eq!(registry.any("12".to_string()).convert_value::<i32>(), Some(12));
        assert_eq!(registry.any("x".to_string()).convert_value::<i32>(), None);
        assert_eq!(registry.any(true).convert_value::<String>(), Some("true".to_string()));
        assert_eq!(registry.any(true).convert_value::<i32>(), None);
    }

    #[test]
    fn bad_text_logs_and_fails() {
        let registry = TypeRegistry::new();
        let int_type = registry.resolve_meta_type("int").unwrap();
        let mut value = Value::Null;
        assert!(!Any::convert_from_string(&int_type, "abc", &mut value));
        assert_eq!(
            crate::logging::logging::last_log().unwrap().message,
            "Invalid value 'abc' for int"
        );
    }

    #[test]
    fn copy_convert_to_targets_the_requested_type() {
        let registry = TypeRegistry::new();
        let double_type = registry.resolve_meta_type("double").unwrap();
        let string_type = registry.resolve_meta_type("string").unwrap();
        let source = registry.any(5u32);

        let mut value = Value::Null;
        assert!(source.copy_to(&mut value, &double_type));
        assert_eq!(value, Value::Double(5.0));
        assert!(source.copy_to(&mut value, &string_type));
        assert_eq!(value, Value::Str("5".to_string()));

        let vec_type = registry.resolve_meta_type("vec3").unwrap();
        assert!(!source.copy_to(&mut value, &vec_type));
    }

    #[test]
    fn pointer_types_and_casts() {
        let registry = TypeRegistry::new();
        let base = registry.create_dynamic_class("Base", None, false).unwrap();
        base.as_meta_class().unwrap().add_constructor(None).unwrap();
        let derived = base.as_meta_class().unwrap().create_subclass("Derived", false).unwrap();
        derived.as_meta_class().unwrap().add_constructor(None).unwrap();

        let base_ptr = registry.pointer_type("Base").unwrap();
        let derived_ptr = registry.pointer_type("Derived").unwrap();
        let object_ptr = registry.pointer_type(OBJECT_CLASS).unwrap();
        let nullptr = registry.resolve_meta_type(NULL_POINTER_TYPE).unwrap();

        assert!(Any::is_pointer_type(&nullptr));
        assert_eq!(Any::pointed_type(&nullptr).unwrap().name(), "void");
        assert!(Any::pointer_can_be_casted_to(&derived_ptr, &base_ptr));
        assert!(Any::pointer_can_be_casted_to(&derived_ptr, &object_ptr));
        assert!(!Any::pointer_can_be_casted_to(&base_ptr, &derived_ptr));

        let object = derived.as_meta_class().unwrap().create(&ArgList::new()).unwrap();
        let any = Any::from_object(&object);
        assert!(Rc::ptr_eq(any.meta_type().unwrap(), &derived_ptr));
        assert!(any.cast_to(&base_ptr).is_some());

        let base_object = base.as_meta_class().unwrap().create(&ArgList::new()).unwrap();
        assert!(Any::from_object(&base_object).cast_to(&derived_ptr).is_none());
        assert!(object.downcast_ref::<DynamicObject>().is_some());
        assert!(any.get_value::<ObjectRef>().is_some());
    }

    proptest! {
        #[test]
        fn ints_survive_text(x in any::<i32>()) {
            let registry = TypeRegistry::new();
            let int_type = registry.resolve_meta_type("int").unwrap();
            let text = registry.any(x).as_string();
            let mut back = Any::null();
            prop_assert!(back.set_from_string(&int_type, &text));
            prop_assert_eq!(back.get_value::<i32>(), Some(x));
        }

        #[test]
        fn floats_survive_text(x in proptest::num::f32::NORMAL | proptest::num::f32::ZERO) {
            let registry = TypeRegistry::new();
            let float_type = registry.resolve_meta_type("float").unwrap();
            let text = registry.any(x).as_string();
            let mut back = Any::null();
            prop_assert!(back.set_from_string(&float_type, &text));
            prop_assert_eq!(back.get_value::<f32>(), Some(x));
        }
    }
}
