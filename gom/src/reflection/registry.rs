// gom/src/reflection/registry.rs
use std::collections::BTreeMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use crate::services::serializer::{EnumSerializer, OpaqueSerializer, PointerSerializer};
use crate::reflection::meta_type::{MetaType, MetaTypeKind, MetaTypeRef};
use crate::reflection::reflect::{register_native_classes, Reflect};
use crate::reflection::meta_builtin::register_builtin_types;
use crate::reflection::meta_class::MetaClass;
use crate::reflection::meta_enum::MetaEnum;
use crate::services::life_cycle::LifeCycle;
use crate::types::error::{GomError, GomResult};
use crate::types::value::GomType;
use crate::types::any::Any;
use crate::*;

/// Name of the base class of every object.
pub const OBJECT_CLASS: &str = "gom::Object";
/// Name of the base class of command holders.
pub const COMMANDS_CLASS: &str = "gom::Commands";
pub const CALLABLE_CLASS: &str = "gom::Callable";
/// Type of the null pointer literal.
pub const NULL_POINTER_TYPE: &str = "nullptr_t";

#[derive(Default)]
struct RegistryInner {
    type_name_to_meta_type: RefCell<BTreeMap<String, MetaTypeRef>>,
    typeid_name_to_meta_type: RefCell<BTreeMap<String, MetaTypeRef>>,
    shut_down: Cell<bool>,
}

impl RegistryInner {
    fn pre_delete_all(&self) {
        let types: Vec<MetaTypeRef> = self.type_name_to_meta_type.borrow().values().cloned().collect();
        for meta_type in types {
            meta_type.pre_delete();
        }
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        self.pre_delete_all();
    }
}

/// Name to meta type registry. Clones share the same tables.
#[derive(Clone)]
pub struct TypeRegistry {
    inner: Rc<RegistryInner>,
}

/// Non-owning handle to a [`TypeRegistry`], held by meta types and scripting states.
#[derive(Clone, Default)]
pub struct WeakTypeRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakTypeRegistry {
    pub fn upgrade(&self) -> Option<TypeRegistry> {
        self.inner.upgrade().map(|inner| TypeRegistry { inner })
    }

    /// Upgrades or fails with [`GomError::RegistryShutDown`].
    pub fn get(&self) -> GomResult<TypeRegistry> {
        self.upgrade().ok_or(GomError::RegistryShutDown)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry with the builtin types and every native class
    /// submitted with `register_gom_class!`.
    pub fn new() -> Self {
        let registry = Self::empty();
        register_builtin_types(&registry);
        register_native_classes(&registry);
        registry
    }

    /// A registry with nothing bound.
    pub fn empty() -> Self {
        Self { inner: Rc::new(RegistryInner::default()) }
    }

    pub fn downgrade(&self) -> WeakTypeRegistry {
        WeakTypeRegistry { inner: Rc::downgrade(&self.inner) }
    }

    pub fn ptr_eq(&self, other: &TypeRegistry) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.get()
    }

    pub fn meta_type_is_bound(&self, name: &str) -> bool {
        self.inner.type_name_to_meta_type.borrow().contains_key(name)
    }

    pub fn typeid_name_is_bound(&self, typeid_name: &str) -> bool {
        self.inner.typeid_name_to_meta_type.borrow().contains_key(typeid_name)
    }

    /// Binds a type under its own name. Fails if the name is taken.
    pub fn bind_meta_type(&self, meta_type: MetaTypeRef) -> bool {
        if self.is_shut_down() {
            gom_err!("GOM", "Cannot bind {} : registry was shut down", meta_type.name());
            return false;
        }
        if self.meta_type_is_bound(meta_type.name()) {
            gom_warn!("GOM", "Meta type {} is already bound", meta_type.name());
            return false;
        }
        meta_type.attach_registry(self.downgrade());
        self.inner
            .type_name_to_meta_type
            .borrow_mut()
            .insert(meta_type.name().to_string(), meta_type);
        true
    }

    /// Binds a type under its name and a native type identifier. If the
    /// identifier is already bound, the name becomes an alias of the type
    /// bound to it.
    pub fn bind_meta_type_with_typeid(&self, meta_type: MetaTypeRef, typeid_name: &str) -> bool {
        if self.is_shut_down() {
            gom_err!("GOM", "Cannot bind {} : registry was shut down", meta_type.name());
            return false;
        }
        if self.meta_type_is_bound(meta_type.name()) {
            gom_warn!("GOM", "Meta type {} is already bound", meta_type.name());
            return false;
        }

        let existing = self.resolve_meta_type_by_typeid_name(typeid_name);
        match existing {
            Some(existing) => {
                self.inner
                    .type_name_to_meta_type
                    .borrow_mut()
                    .insert(meta_type.name().to_string(), existing);
            }
            None => {
                meta_type.set_typeid_name(typeid_name);
                meta_type.attach_registry(self.downgrade());
                self.inner
                    .typeid_name_to_meta_type
                    .borrow_mut()
                    .insert(typeid_name.to_string(), meta_type.clone());
                self.inner
                    .type_name_to_meta_type
                    .borrow_mut()
                    .insert(meta_type.name().to_string(), meta_type);
            }
        }
        true
    }

    /// Maps a native type identifier to an already bound type.
    pub fn bind_typeid_name(&self, typeid_name: &str, meta_type: &MetaTypeRef) -> bool {
        if self.typeid_name_is_bound(typeid_name) {
            gom_warn!("GOM", "Native type {} is already bound", typeid_name);
            return false;
        }
        if meta_type.typeid_name().is_none() {
            meta_type.set_typeid_name(typeid_name);
        }
        self.inner
            .typeid_name_to_meta_type
            .borrow_mut()
            .insert(typeid_name.to_string(), meta_type.clone());
        true
    }

    /// Removes a name. The typeid mapping goes away with the last name
    /// that refers to the type.
    pub fn unbind_meta_type(&self, name: &str) -> bool {
        let removed = self.inner.type_name_to_meta_type.borrow_mut().remove(name);
        let Some(removed) = removed else {
            gom_warn!("GOM", "Cannot unbind {} : not bound", name);
            return false;
        };

        let still_named = self
            .inner
            .type_name_to_meta_type
            .borrow()
            .values()
            .any(|t| Rc::ptr_eq(t, &removed));

        if !still_named {
            self.inner
                .typeid_name_to_meta_type
                .borrow_mut()
                .retain(|_, t| !Rc::ptr_eq(t, &removed));
        }
        true
    }

    pub fn resolve_meta_type(&self, name: &str) -> Option<MetaTypeRef> {
        self.inner.type_name_to_meta_type.borrow().get(name).cloned()
    }

    pub fn resolve_meta_type_by_typeid_name(&self, typeid_name: &str) -> Option<MetaTypeRef> {
        self.inner.typeid_name_to_meta_type.borrow().get(typeid_name).cloned()
    }

    /// The meta type bound to a native Rust type.
    pub fn resolve_native<T: GomType>(&self) -> Option<MetaTypeRef> {
        self.resolve_meta_type_by_typeid_name(T::typeid_name())
    }

    /// Like [`resolve_meta_type`](Self::resolve_meta_type) but only for classes.
    pub fn resolve_meta_class(&self, name: &str) -> Option<MetaTypeRef> {
        self.resolve_meta_type(name).filter(|t| t.is_class())
    }

    /// The meta class or an error that says why not.
    pub fn meta_class(&self, name: &str) -> GomResult<MetaTypeRef> {
        match self.resolve_meta_type(name) {
            Some(t) if t.is_class() => Ok(t),
            Some(_) => Err(GomError::NotAClass(name.to_string())),
            None => Err(GomError::UnknownType(name.to_string())),
        }
    }

    /// The type of pointers to a class, e.g. `"Point*"`.
    pub fn pointer_type(&self, class_name: &str) -> Option<MetaTypeRef> {
        self.resolve_meta_type(&format!("{class_name}*"))
    }

    /// Every bound name, in name order. Aliases appear once per name.
    pub fn list_type_names(&self) -> Vec<String> {
        self.inner.type_name_to_meta_type.borrow().keys().cloned().collect()
    }

    /// Every distinct bound type.
    pub fn list_types(&self) -> Vec<MetaTypeRef> {
        let mut result: Vec<MetaTypeRef> = Vec::new();
        for t in self.inner.type_name_to_meta_type.borrow().values() {
            if !result.iter().any(|r| Rc::ptr_eq(r, t)) {
                result.push(t.clone());
            }
        }
        result
    }

    /// Wraps a native value in an `Any` typed through this registry.
    pub fn any<T: GomType>(&self, value: T) -> Any {
        Any::new(self, value)
    }

    /// Creates and binds a compiled class, and its pointer type.
    pub fn create_meta_class(
        &self,
        name: &str,
        super_class_name: Option<&str>,
        is_abstract: bool,
    ) -> GomResult<MetaTypeRef> {
        self.create_class(name, super_class_name, is_abstract, false, None)
    }

    /// Creates and binds a class whose members can be added and removed at runtime.
    pub fn create_dynamic_class(
        &self,
        name: &str,
        super_class_name: Option<&str>,
        is_abstract: bool,
    ) -> GomResult<MetaTypeRef> {
        let super_class_name = super_class_name.unwrap_or(OBJECT_CLASS);
        self.create_class(name, Some(super_class_name), is_abstract, true, None)
    }

    /// Creates a class for a native type and lets the type declare its members.
    pub fn bind_native_class<T: Reflect + 'static>(
        &self,
        name: &str,
        super_class_name: &str,
    ) -> GomResult<MetaTypeRef> {
        let typeid_name = std::any::type_name::<T>();
        let mclass = self.create_class(name, Some(super_class_name), false, false, Some(typeid_name))?;
        if let Some(class) = mclass.as_meta_class() {
            T::declare_members(class, self);
        }
        Ok(mclass)
    }

    fn create_class(
        &self,
        name: &str,
        super_class_name: Option<&str>,
        is_abstract: bool,
        is_dynamic: bool,
        typeid_name: Option<&str>,
    ) -> GomResult<MetaTypeRef> {
        if self.is_shut_down() {
            return Err(GomError::RegistryShutDown);
        }
        if self.meta_type_is_bound(name) {
            gom_err!("GOM", "Class {} is already bound", name);
            return Err(GomError::DuplicateType(name.to_string()));
        }
        if let Some(super_name) = super_class_name {
            if self.resolve_meta_class(super_name).is_none() {
                gom_err!("GOM", "Cannot create {} : no such super class {}", name, super_name);
                return Err(GomError::UnknownType(super_name.to_string()));
            }
        }

        let mclass = MetaType::new_class(name, Box::new(OpaqueSerializer), |owner| {
            MetaClass::new(owner, name, super_class_name, is_abstract, is_dynamic)
        });
        let bound = match typeid_name {
            Some(typeid_name) => self.bind_meta_type_with_typeid(mclass.clone(), typeid_name),
            None => self.bind_meta_type(mclass.clone()),
        };
        if !bound {
            return Err(GomError::DuplicateType(name.to_string()));
        }

        let pointer = MetaType::new(
            &format!("{name}*"),
            Box::new(PointerSerializer),
            LifeCycle::pointer(),
            MetaTypeKind::Builtin,
        );
        self.bind_meta_type(pointer);
        Ok(mclass)
    }

    /// Creates and binds an enum type.
    pub fn create_meta_enum(&self, name: &str, values: &[(&str, i32)]) -> GomResult<MetaTypeRef> {
        let meta_enum = Rc::new(MetaEnum::new(values));
        let meta_type = MetaType::new(
            name,
            Box::new(EnumSerializer::new(meta_enum.clone())),
            LifeCycle::of::<i32>(),
            MetaTypeKind::Enum(meta_enum),
        );
        if self.bind_meta_type(meta_type.clone()) {
            Ok(meta_type)
        } else {
            Err(GomError::DuplicateType(name.to_string()))
        }
    }

    /// Two-phase teardown. Every type first releases what it holds
    /// (argument lists, default values, adapters, slot actions), then
    /// the tables are cleared.
    pub fn shutdown(&self) {
        if self.is_shut_down() {
            return;
        }
        self.inner.pre_delete_all();
        self.inner.shut_down.set(true);
        self.inner.type_name_to_meta_type.borrow_mut().clear();
        self.inner.typeid_name_to_meta_type.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::serializer::GenericSerializer;

    fn int_type(name: &str) -> MetaTypeRef {
        MetaType::new(name, Box::new(GenericSerializer::<i32>::new()), LifeCycle::of::<i32>(), MetaTypeKind::Builtin)
    }

    #[test]
    fn resolve_returns_the_bound_instance() {
        let registry = TypeRegistry::empty();
        let t = int_type("my_int");
        assert!(registry.bind_meta_type(t.clone()));
        assert!(Rc::ptr_eq(&registry.resolve_meta_type("my_int").unwrap(), &t));
        assert!(registry.resolve_meta_type("other").is_none());
    }

    #[test]
    fn duplicate_names_are_refused() {
        let registry = TypeRegistry::empty();
        assert!(registry.bind_meta_type(int_type("dup")));
        assert!(!registry.bind_meta_type(int_type("dup")));
    }

    #[test]
    fn second_name_for_a_typeid_is_an_alias() {
        let registry = TypeRegistry::empty();
        let original = int_type("int32");
        assert!(registry.bind_meta_type_with_typeid(original.clone(), "i32"));
        assert!(registry.bind_meta_type_with_typeid(int_type("signed"), "i32"));

        let alias = registry.resolve_meta_type("signed").unwrap();
        assert!(Rc::ptr_eq(&alias, &original));
        assert_eq!(original.typeid_name().as_deref(), Some("i32"));
    }

    #[test]
    fn unbind_drops_typeid_with_last_name() {
        let registry = TypeRegistry::empty();
        registry.bind_meta_type_with_typeid(int_type("a"), "i32");
        registry.bind_meta_type_with_typeid(int_type("b"), "i32");

        assert!(registry.unbind_meta_type("a"));
        assert!(registry.typeid_name_is_bound("i32"));
        assert!(registry.unbind_meta_type("b"));
        assert!(!registry.typeid_name_is_bound("i32"));
        assert!(!registry.unbind_meta_type("b"));
    }

    #[test]
    fn bound_types_know_their_registry() {
        let registry = TypeRegistry::empty();
        let t = int_type("x");
        registry.bind_meta_type(t.clone());
        assert!(t.registry().unwrap().ptr_eq(&registry));
    }

    #[test]
    fn shutdown_empties_and_locks_the_registry() {
        let registry = TypeRegistry::new();
        assert!(registry.resolve_meta_type(OBJECT_CLASS).is_some());
        registry.shutdown();

        assert!(registry.resolve_meta_type(OBJECT_CLASS).is_none());
        assert!(registry.list_types().is_empty());
        assert!(!registry.bind_meta_type(int_type("late")));
    }

    #[test]
    fn classes_bind_their_pointer_type() {
        let registry = TypeRegistry::new();
        registry.create_meta_class("Shape", Some(OBJECT_CLASS), true).unwrap();
        let pointer = registry.pointer_type("Shape").unwrap();
        assert!(Any::is_pointer_type(&pointer));
        assert_eq!(Any::pointed_type(&pointer).unwrap().name(), "Shape");
    }

    #[test]
    fn unknown_super_class_is_an_error() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.create_meta_class("Orphan", Some("Nope"), false).unwrap_err(),
            GomError::UnknownType("Nope".to_string())
        );
    }

    #[test]
    fn enums_read_and_write_names() {
        let registry = TypeRegistry::new();
        let color = registry.create_meta_enum("Color", &[("RED", 0), ("GREEN", 1)]).unwrap();
        let mut any = Any::create(&color);
        assert!(any.set_from_string(&color, "GREEN"));
        assert_eq!(any.as_string(), "GREEN");
        assert_eq!(any.value(), &crate::types::value::Value::Int(1));
    }
}
