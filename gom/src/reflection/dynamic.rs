// gom/src/reflection/dynamic.rs
use std::collections::HashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use crate::reflection::meta_method::{method_adapter, object_factory, MetaMethod, MethodAdapter, ObjectFactory};
use crate::types::object::{default_get_property, default_set_property, make_object, Object, ObjectBase, ObjectRef};
use crate::reflection::registry::{TypeRegistry, OBJECT_CLASS};
use crate::reflection::meta_type::{MetaType, MetaTypeRef};
use crate::reflection::meta_property::SETTER_ARG;
use crate::types::error::{GomError, GomResult};
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// Instance of a class declared at run time. Property values live in a
/// name to value map.
#[derive(GomObject)]
pub struct DynamicObject {
    base: ObjectBase,
    properties: RefCell<HashMap<String, Any>>,
}

impl DynamicObject {
    pub fn new(meta_class: MetaTypeRef) -> Self {
        Self {
            base: ObjectBase::new(meta_class),
            properties: RefCell::new(HashMap::new()),
        }
    }

    fn is_builtin_property(&self, name: &str) -> bool {
        self.base
            .meta_class()
            .registry()
            .and_then(|r| r.resolve_meta_class(OBJECT_CLASS))
            .and_then(|t| t.as_meta_class().map(|c| c.find_property(name).is_some()))
            .unwrap_or(false)
    }

    fn declared_type(&self, name: &str) -> GomResult<Option<MetaTypeRef>> {
        let meta_class = self.base.meta_class();
        let prop = meta_class.as_meta_class().and_then(|c| c.find_property(name));
        match prop {
            Some(prop) => Ok(meta_class.registry().and_then(|r| r.resolve_meta_type(prop.type_name()))),
            None => {
                gom_err!("GOM", "{}::{} : no such property", meta_class.name(), name);
                Err(GomError::NoSuchProperty { class: meta_class.name().to_string(), name: name.to_string() })
            }
        }
    }

    fn read_stored(&self, name: &str) -> GomResult<Any> {
        let declared = self.declared_type(name)?;
        if let Some(value) = self.properties.borrow().get(name) {
            return Ok(value.clone());
        }
        Ok(declared.map(|t| Any::create(&t)).unwrap_or_default())
    }

    fn write_stored(&self, name: &str, value: &Any) -> GomResult<()> {
        let declared = self.declared_type(name)?;
        let stored = match declared {
            Some(meta_type) if !value.is_null() => {
                match value.meta_type() {
                    Some(own) if Rc::ptr_eq(own, &meta_type) => value.clone(),
                    _ => value.converted_to(&meta_type).ok_or_else(|| {
                        gom_err!(
                            "GOM",
                            "{}::{} : cannot convert {} to {}",
                            self.base.meta_class().name(),
                            name,
                            value.meta_type().map_or("(null)", |t| t.name()),
                            meta_type.name()
                        );
                        GomError::InvalidCast {
                            from: value.meta_type().map_or("(null)".to_string(), |t| t.name().to_string()),
                            to: meta_type.name().to_string(),
                        }
                    })?,
                }
            }
            _ => value.clone(),
        };
        self.properties.borrow_mut().insert(name.to_string(), stored);
        Ok(())
    }
}

impl Object for DynamicObject {
    fn get_property(&self, name: &str) -> GomResult<Any> {
        if self.is_builtin_property(name) {
            return default_get_property(self, name);
        }
        self.read_stored(name)
    }

    fn set_property(&self, name: &str, value: &Any) -> GomResult<()> {
        if self.is_builtin_property(name) {
            return default_set_property(self, name, value);
        }
        self.write_stored(name, value)
    }
}

/// Accessors of a property stored by [`DynamicObject`].
pub(crate) fn dynamic_property_adapters(name: &str) -> (MethodAdapter, MethodAdapter) {
    let get_name = name.to_string();
    let getter = method_adapter(move |target, method, _, _| {
        target
            .downcast_ref::<DynamicObject>()
            .ok_or_else(|| not_dynamic(target, method))?
            .read_stored(&get_name)
    });
    let set_name = name.to_string();
    let setter = method_adapter(move |target, method, args, _| {
        let object = target
            .downcast_ref::<DynamicObject>()
            .ok_or_else(|| not_dynamic(target, method))?;
        let value = args.get_arg(SETTER_ARG).cloned().unwrap_or_default();
        object.write_stored(&set_name, &value)?;
        Ok(Any::null())
    });
    (getter, setter)
}

fn not_dynamic(target: &dyn Object, method: &str) -> GomError {
    gom_err!("GOM", "{}::{} : target is not a dynamic object", target.meta_class().name(), method);
    GomError::TypeMismatch {
        expected: "DynamicObject".to_string(),
        actual: target.meta_class().name().to_string(),
    }
}

/// Body of script-defined slots.
///
/// The slot is looked up again on the class of the target, so a subclass
/// declared later can override it. Positional calls pass `self` first;
/// named calls also pass `method`.
pub(crate) fn dynamic_slot_adapter() -> MethodAdapter {
    method_adapter(|target, method, args, _| {
        let meta_class = target.meta_class();
        let Some(slot) = meta_class.as_meta_class().and_then(|c| c.find_slot(method)) else {
            gom_err!("GOM", "{}: no such method", method);
            return Err(GomError::NoSuchMethod { class: meta_class.name().to_string(), name: method.to_string() });
        };
        let Some(action) = slot.action() else {
            gom_warn!("GOM", "{} has no action", slot.qualified_name());
            return Ok(Any::null());
        };
        let this = target.self_ref().map(|o| Any::from_object(&o)).unwrap_or_default();

        let mut call_args = ArgList::new();
        if args.has_unnamed_args() {
            call_args.create_unnamed_arg(this);
            for (_, value) in args.iter() {
                call_args.create_unnamed_arg(value.clone());
            }
        } else {
            call_args.create_arg("self", this);
            if let Some(registry) = meta_class.registry() {
                call_args.create_arg("method", Any::new(&registry, method.to_string()));
            }
            call_args.append(args, true);
        }
        action.invoke(&call_args)
    })
}

/// Body of signals: invoking one emits it.
pub(crate) fn signal_adapter() -> MethodAdapter {
    method_adapter(|target, method, args, _| {
        target.emit_signal(method, args);
        Ok(Any::null())
    })
}

/// Factory of dynamic objects. Without an action the args are written
/// to writable properties; otherwise the action gets them with `self`.
pub(crate) fn dynamic_constructor(owner: Weak<MetaType>, constructor: Weak<MetaMethod>) -> ObjectFactory {
    object_factory(move |args: &ArgList, _: &TypeRegistry| {
        let meta_class = owner.upgrade().ok_or(GomError::RegistryShutDown)?;
        let object: ObjectRef = make_object(DynamicObject::new(meta_class.clone()));
        match constructor.upgrade().and_then(|c| c.action()) {
            None => {
                if let Some(class) = meta_class.as_meta_class() {
                    for (name, value) in args.iter() {
                        if class.find_property(name).is_some_and(|p| !p.read_only()) {
                            object.set_property(name, value)?;
                        }
                    }
                }
            }
            Some(action) => {
                let mut call_args = args.clone();
                call_args.set_arg("self", Any::from_object(&object));
                action.invoke(&call_args)?;
            }
        }
        Ok(object)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::types::callable::{CallableRef, NativeCallable};

    fn point_class(registry: &TypeRegistry) -> MetaTypeRef {
        let mclass = registry.create_dynamic_class("Point", None, false).unwrap();
        let class = mclass.as_meta_class().unwrap();
        class.add_property("x", "double", false).unwrap();
        class.add_property("y", "double", false).unwrap();
        class.add_constructor(None).unwrap();
        mclass
    }

    #[test]
    fn point_properties_round_trip() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let point = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();

        point.set_property("x", &registry.any(3.0f64)).unwrap();
        assert_eq!(point.get_property("x").unwrap().get_value::<f64>(), Some(3.0));
        assert_eq!(point.get_property("y").unwrap().get_value::<f64>(), Some(0.0));
        assert_eq!(point.get_attributes(), "x;y");
    }

    #[test]
    fn values_are_converted_to_the_declared_type() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let point = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();

        point.set_property("y", &registry.any("2.5".to_string())).unwrap();
        assert_eq!(point.get_property("y").unwrap().get_value::<f64>(), Some(2.5));
        assert!(point.set_property("y", &registry.any("abc".to_string())).is_err());
    }

    #[test]
    fn unknown_property_fails() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let point = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();
        assert!(matches!(point.get_property("z"), Err(GomError::NoSuchProperty { .. })));
        assert!(point.set_property("z", &Any::null()).is_err());
    }

    #[test]
    fn constructor_without_action_sets_properties() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let mut args = ArgList::new();
        args.create_arg("x", registry.any(1.5f64));
        args.create_arg("y", registry.any(-2.0f64));
        let point = mclass.as_meta_class().unwrap().create(&args).unwrap();
        assert_eq!(point.get_property("x").unwrap().get_value::<f64>(), Some(1.5));
        assert_eq!(point.get_property("y").unwrap().get_value::<f64>(), Some(-2.0));
    }

    #[test]
    fn constructor_action_receives_self() {
        let registry = TypeRegistry::new();
        let mclass = registry.create_dynamic_class("Counter", None, false).unwrap();
        let class = mclass.as_meta_class().unwrap();
        class.add_property("count", "int", false).unwrap();
        let action: CallableRef = NativeCallable::new_ref("init", |args| {
            let this = args.get_arg("self").and_then(Any::as_object).unwrap();
            let start = args.get_arg("start").cloned().unwrap();
            this.set_property("count", &start)?;
            Ok(Any::null())
        });
        class.add_constructor(Some(action)).unwrap();

        let mut args = ArgList::new();
        args.create_arg("start", registry.any(7i32));
        let counter = class.create(&args).unwrap();
        assert_eq!(counter.get_property("count").unwrap().get_value::<i32>(), Some(7));
    }

    #[test]
    fn slot_gets_self_and_method_on_named_calls() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let class = mclass.as_meta_class().unwrap();
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let seen_in_slot = seen.clone();
        let action = NativeCallable::new_ref("move", move |args| {
            let names = args.iter().map(|(n, _)| n.to_string()).collect();
            *seen_in_slot.borrow_mut() = names;
            Ok(Any::null())
        });
        class.add_slot("move", Some(action), "void").unwrap();

        let point = class.create(&ArgList::new()).unwrap();
        let mut args = ArgList::new();
        args.create_arg("dx", registry.any(1.0f64));
        point.invoke_method("move", &args).unwrap();
        assert_eq!(*seen.borrow(), vec!["self", "method", "dx"]);

        let mut positional = ArgList::new();
        positional.create_unnamed_arg(registry.any(1.0f64));
        positional.create_unnamed_arg(registry.any(2.0f64));
        point.invoke_method("move", &positional).unwrap();
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(seen.borrow()[0], "arg#0");
    }

    #[test]
    fn subclass_slot_overrides_base_slot() {
        let registry = TypeRegistry::new();
        let base = registry.create_dynamic_class("Base", None, false).unwrap();
        let calls = Rc::new(Cell::new(0));
        let base_calls = calls.clone();
        base.as_meta_class()
            .unwrap()
            .add_slot("run", Some(NativeCallable::new_ref("base", move |_| {
                base_calls.set(base_calls.get() + 1);
                Ok(Any::null())
            })), "void")
            .unwrap();
        let base_slot = base.as_meta_class().unwrap().find_slot("run").unwrap();

        let derived = base.as_meta_class().unwrap().create_subclass("Derived", false).unwrap();
        let derived_class = derived.as_meta_class().unwrap();
        let derived_calls = calls.clone();
        derived_class
            .add_slot("run", Some(NativeCallable::new_ref("derived", move |_| {
                derived_calls.set(derived_calls.get() + 10);
                Ok(Any::null())
            })), "void")
            .unwrap();
        derived_class.add_constructor(None).unwrap();

        let object = derived_class.create(&ArgList::new()).unwrap();
        base_slot.invoke(&*object, &ArgList::new()).unwrap();
        assert_eq!(calls.get(), 10);
    }

    #[test]
    fn removed_slot_releases_its_action() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let action = NativeCallable::new_ref("noop", |_| Ok(Any::null()));
        mclass.as_meta_class().unwrap().add_slot("noop", Some(action.clone()), "void").unwrap();
        assert_eq!(Rc::strong_count(&action), 2);

        mclass.as_meta_class().unwrap().remove_member("noop").unwrap();
        assert_eq!(Rc::strong_count(&action), 1);
    }

    #[test]
    fn shutdown_releases_slot_actions() {
        let registry = TypeRegistry::new();
        let mclass = point_class(&registry);
        let action = NativeCallable::new_ref("noop", |_| Ok(Any::null()));
        mclass.as_meta_class().unwrap().add_slot("noop", Some(action.clone()), "void").unwrap();
        drop(mclass);

        registry.shutdown();
        assert_eq!(Rc::strong_count(&action), 1);
        assert!(registry.resolve_meta_type("Point").is_none());
    }
}
