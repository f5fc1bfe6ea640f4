// gom/src/reflection/meta_builtin.rs
use glam::{DVec2, DVec3, DVec4};
use crate::services::serializer::{
    ArgListSerializer, BoolSerializer, GenericSerializer, PointerSerializer, Serializer,
    StringSerializer, VectorSerializer, VoidSerializer,
};
use crate::reflection::registry::{TypeRegistry, CALLABLE_CLASS, COMMANDS_CLASS, NULL_POINTER_TYPE, OBJECT_CLASS};
use crate::reflection::meta_type::{MetaType, MetaTypeKind};
use crate::reflection::meta_method::method_adapter;
use crate::reflection::meta_property::{MetaProperty, SETTER_ARG};
use crate::reflection::meta_member::MetaMember;
use crate::reflection::meta_arg::MetaArg;
use crate::services::life_cycle::LifeCycle;
use crate::types::callable::CallableRef;
use crate::types::object::ObjectRef;
use crate::types::value::GomType;
use crate::types::any::Any;
use crate::*;

fn bind_builtin<T: GomType>(registry: &TypeRegistry, name: &str, serializer: Box<dyn Serializer>, life_cycle: LifeCycle) {
    let meta_type = MetaType::new(name, serializer, life_cycle, MetaTypeKind::Builtin);
    if !registry.bind_meta_type_with_typeid(meta_type, T::typeid_name()) {
        gom_err!("GOM", "Could not bind builtin type {}", name);
    }
}

fn bind_generic<T>(registry: &TypeRegistry, names: &[&str])
where
    T: GomType + Default + std::str::FromStr + std::fmt::Display,
{
    for name in names {
        bind_builtin::<T>(registry, name, Box::new(GenericSerializer::<T>::new()), LifeCycle::of::<T>());
    }
}

/// Binds the primitive types and the root classes.
pub fn register_builtin_types(registry: &TypeRegistry) {
    bind_builtin::<()>(registry, "void", Box::new(VoidSerializer), LifeCycle::empty());
    bind_builtin::<bool>(registry, "bool", Box::new(BoolSerializer), LifeCycle::of::<bool>());
    bind_generic::<i32>(registry, &["int", "signed_index_t"]);
    bind_generic::<u32>(registry, &["unsigned int", "index_t"]);
    bind_generic::<i64>(registry, &["long"]);
    bind_generic::<u64>(registry, &["unsigned long"]);
    bind_generic::<usize>(registry, &["size_t"]);
    bind_generic::<f32>(registry, &["float"]);
    bind_generic::<f64>(registry, &["double"]);
    bind_builtin::<String>(registry, "string", Box::new(StringSerializer), LifeCycle::of::<String>());
    bind_builtin::<ArgList>(registry, "gom::ArgList", Box::new(ArgListSerializer), LifeCycle::of::<ArgList>());
    bind_builtin::<DVec2>(registry, "vec2", Box::new(VectorSerializer::<DVec2>::new()), LifeCycle::of::<DVec2>());
    bind_builtin::<DVec3>(registry, "vec3", Box::new(VectorSerializer::<DVec3>::new()), LifeCycle::of::<DVec3>());
    bind_builtin::<DVec4>(registry, "vec4", Box::new(VectorSerializer::<DVec4>::new()), LifeCycle::of::<DVec4>());
    registry.bind_meta_type(MetaType::new(
        NULL_POINTER_TYPE,
        Box::new(PointerSerializer),
        LifeCycle::pointer(),
        MetaTypeKind::Builtin,
    ));

    if let Err(e) = register_root_classes(registry) {
        gom_err!("GOM", "Could not register root classes ({})", e);
    }
}

fn register_root_classes(registry: &TypeRegistry) -> GomResult<()> {
    let object = registry.create_meta_class(OBJECT_CLASS, None, false)?;
    if let Some(class) = object.as_meta_class() {
        class.add_computed_property("id", "unsigned int", |target, registry| {
            Ok(Any::new(registry, target.id()))
        });
        class.add_computed_property("string_id", "string", |target, registry| {
            Ok(Any::new(registry, target.string_id()))
        });
        class.add_computed_property("class_name", "string", |target, registry| {
            Ok(Any::new(registry, target.meta_class().name().to_string()))
        });
        add_flag_property(class, "slots_enabled", |base| base.slots_enabled(), |base, v| base.set_slots_enabled(v));
        add_flag_property(class, "signals_enabled", |base| base.signals_enabled(), |base, v| base.set_signals_enabled(v));

        class.add_native_slot("is_a", "bool", vec![MetaArg::new("type_name", "string")], |target, args, registry| {
            let type_name = args.get_arg_value::<String>("type_name")?;
            Ok(Any::new(registry, target.is_a(&type_name)))
        });
        class.add_native_slot("has_method", "bool", vec![MetaArg::new("method_name", "string")], |target, args, registry| {
            let method_name = args.get_arg_value::<String>("method_name")?;
            Ok(Any::new(registry, target.has_method(&method_name)))
        });
        class.add_native_slot("has_property", "bool", vec![MetaArg::new("prop_name", "string")], |target, args, registry| {
            let prop_name = args.get_arg_value::<String>("prop_name")?;
            Ok(Any::new(registry, target.has_property(&prop_name)))
        });
    }
    registry.create_meta_class(CALLABLE_CLASS, Some(OBJECT_CLASS), true)?;
    registry.create_meta_class(COMMANDS_CLASS, Some(OBJECT_CLASS), true)?;

    // Native handles resolve to the root pointer types.
    if let Some(pointer) = registry.pointer_type(OBJECT_CLASS) {
        registry.bind_typeid_name(<ObjectRef as GomType>::typeid_name(), &pointer);
    }
    if let Some(pointer) = registry.pointer_type(CALLABLE_CLASS) {
        registry.bind_typeid_name(<CallableRef as GomType>::typeid_name(), &pointer);
    }
    Ok(())
}

fn add_flag_property(
    class: &MetaClass,
    name: &str,
    get: fn(&ObjectBase) -> bool,
    set: fn(&ObjectBase, bool),
) {
    let getter = method_adapter(move |target, _, _, registry| Ok(Any::new(registry, get(target.object_base()))));
    let setter = method_adapter(move |target, _, args, _| {
        set(target.object_base(), args.get_arg_value::<bool>(SETTER_ARG)?);
        Ok(Any::null())
    });
    let prop = MetaProperty::new(name, class.name(), "bool", getter, Some(setter));
    class.add_member(MetaMember::Property(std::rc::Rc::new(prop)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn aliases_resolve_to_the_same_type() {
        let registry = TypeRegistry::new();
        let int = registry.resolve_meta_type("int").unwrap();
        let alias = registry.resolve_meta_type("signed_index_t").unwrap();
        assert!(Rc::ptr_eq(&int, &alias));
        let index = registry.resolve_meta_type("index_t").unwrap();
        assert_eq!(index.name(), "unsigned int");
    }

    #[test]
    fn natives_resolve_by_typeid() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.resolve_native::<f64>().unwrap().name(), "double");
        assert_eq!(registry.resolve_native::<String>().unwrap().name(), "string");
        assert_eq!(registry.resolve_native::<DVec3>().unwrap().name(), "vec3");
        assert_eq!(registry.resolve_native::<ObjectRef>().unwrap().name(), "gom::Object*");
        assert_eq!(registry.resolve_native::<CallableRef>().unwrap().name(), "gom::Callable*");
    }

    #[test]
    fn root_classes() {
        let registry = TypeRegistry::new();
        let commands = registry.resolve_meta_class(COMMANDS_CLASS).unwrap();
        let commands = commands.as_meta_class().unwrap();
        assert!(commands.is_abstract());
        assert!(commands.is_a(OBJECT_CLASS));

        let object = registry.resolve_meta_class(OBJECT_CLASS).unwrap();
        let object = object.as_meta_class().unwrap();
        assert!(object.find_property("string_id").unwrap().read_only());
        assert!(!object.find_property("slots_enabled").unwrap().read_only());
        assert!(object.find_slot("is_a").is_some());
    }

    #[test]
    fn vectors_read_their_text_form() {
        let registry = TypeRegistry::new();
        let vec3 = registry.resolve_meta_type("vec3").unwrap();
        let mut value = Any::null();
        assert!(value.set_from_string(&vec3, "1 2 3"));
        assert_eq!(value.get_value::<DVec3>(), Some(DVec3::new(1.0, 2.0, 3.0)));
        assert!(!value.set_from_string(&vec3, "1 2"));
    }
}
