// gom/src/reflection/meta_member.rs
use std::rc::Rc;
use crate::reflection::meta_property::MetaProperty;
use crate::reflection::meta_method::MetaMethod;

/// A declared member of a class.
#[derive(Clone)]
pub enum MetaMember {
    Method(Rc<MetaMethod>),
    Property(Rc<MetaProperty>),
}

impl MetaMember {
    pub fn name(&self) -> &str {
        match self {
            MetaMember::Method(m) => m.name(),
            MetaMember::Property(p) => p.name(),
        }
    }

    pub fn container_name(&self) -> &str {
        match self {
            MetaMember::Method(m) => m.container_name(),
            MetaMember::Property(p) => p.container_name(),
        }
    }

    pub fn as_method(&self) -> Option<&Rc<MetaMethod>> {
        match self {
            MetaMember::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&Rc<MetaProperty>> {
        match self {
            MetaMember::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn pre_delete(&self) {
        match self {
            MetaMember::Method(m) => m.pre_delete(),
            MetaMember::Property(p) => p.pre_delete(),
        }
    }
}
