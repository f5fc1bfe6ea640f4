// gom/src/reflection/meta_type.rs
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::fmt;
use crate::reflection::registry::{TypeRegistry, WeakTypeRegistry};
use crate::reflection::meta_class::MetaClass;
use crate::services::serializer::Serializer;
use crate::reflection::meta_enum::MetaEnum;
use crate::services::life_cycle::LifeCycle;

pub type MetaTypeRef = Rc<MetaType>;

/// Ordered `name = value` pairs attached to types, members and args.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomAttributes {
    attributes: Vec<(String, String)>,
}

impl CustomAttributes {
    pub fn nb(&self) -> usize {
        self.attributes.len()
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing a previous value with the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// What a meta type describes beyond its name and serializer.
pub enum MetaTypeKind {
    Builtin,
    Enum(Rc<MetaEnum>),
    Class(MetaClass),
}

/// Named runtime type descriptor.
pub struct MetaType {
    name: String,
    typeid_name: RefCell<Option<String>>,
    serializer: Box<dyn Serializer>,
    life_cycle: LifeCycle,
    attributes: RefCell<CustomAttributes>,
    registry: RefCell<WeakTypeRegistry>,
    kind: MetaTypeKind,
}

impl MetaType {
    pub fn new(
        name: &str,
        serializer: Box<dyn Serializer>,
        life_cycle: LifeCycle,
        kind: MetaTypeKind,
    ) -> MetaTypeRef {
        Rc::new(Self::build(name, serializer, life_cycle, kind))
    }

    /// Creates a class type. The class gets a weak link to its own type.
    pub fn new_class(
        name: &str,
        serializer: Box<dyn Serializer>,
        make_class: impl FnOnce(Weak<MetaType>) -> MetaClass,
    ) -> MetaTypeRef {
        Rc::new_cyclic(|owner| {
            let class = make_class(owner.clone());
            Self::build(name, serializer, LifeCycle::empty(), MetaTypeKind::Class(class))
        })
    }

    fn build(
        name: &str,
        serializer: Box<dyn Serializer>,
        life_cycle: LifeCycle,
        kind: MetaTypeKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            typeid_name: RefCell::new(None),
            serializer,
            life_cycle,
            attributes: RefCell::new(CustomAttributes::default()),
            registry: RefCell::new(WeakTypeRegistry::default()),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native type identifier this type was bound with, if any.
    pub fn typeid_name(&self) -> Option<String> {
        self.typeid_name.borrow().clone()
    }

    pub fn set_typeid_name(&self, typeid_name: &str) {
        *self.typeid_name.borrow_mut() = Some(typeid_name.to_string());
    }

    pub fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }

    pub fn life_cycle(&self) -> &LifeCycle {
        &self.life_cycle
    }

    pub fn kind(&self) -> &MetaTypeKind {
        &self.kind
    }

    /// Registry this type is bound in, while it is alive.
    pub fn registry(&self) -> Option<TypeRegistry> {
        self.registry.borrow().upgrade()
    }

    pub(crate) fn attach_registry(&self, registry: WeakTypeRegistry) {
        let mut current = self.registry.borrow_mut();
        if current.upgrade().is_none() {
            *current = registry;
        }
    }

    pub fn as_meta_class(&self) -> Option<&MetaClass> {
        match &self.kind {
            MetaTypeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_meta_enum(&self) -> Option<&Rc<MetaEnum>> {
        match &self.kind {
            MetaTypeKind::Enum(meta_enum) => Some(meta_enum),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, MetaTypeKind::Class(_))
    }

    /// Same type, or for classes, a subclass.
    pub fn is_subtype_of(&self, other: &MetaType) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self.as_meta_class(), other.as_meta_class()) {
            (Some(derived), Some(base)) => derived.is_subclass_of(base),
            _ => false,
        }
    }

    pub fn has_custom_attribute(&self, name: &str) -> bool {
        self.attributes.borrow().has(name)
    }

    pub fn custom_attribute_value(&self, name: &str) -> Option<String> {
        self.attributes.borrow().value(name).map(str::to_string)
    }

    pub fn set_custom_attribute(&self, name: &str, value: &str) {
        self.attributes.borrow_mut().set(name, value);
    }

    /// First teardown phase: drops everything that may point back at other types.
    pub fn pre_delete(&self) {
        if let MetaTypeKind::Class(class) = &self.kind {
            class.pre_delete();
        }
    }
}

impl fmt::Debug for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetaType({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_keep_insertion_order_and_overwrite() {
        let mut attrs = CustomAttributes::default();
        attrs.set("help", "first");
        attrs.set("menu", "/Edit");
        attrs.set("help", "second");

        assert_eq!(attrs.nb(), 2);
        assert_eq!(attrs.value("help"), Some("second"));
        let names: Vec<&str> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["help", "menu"]);
    }
}
