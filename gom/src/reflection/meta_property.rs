// gom/src/reflection/meta_property.rs
use std::cell::RefCell;
use std::rc::Rc;
use crate::reflection::meta_method::{MetaMethod, MethodAdapter, MethodKind};
use crate::reflection::meta_type::{CustomAttributes, MetaTypeRef};
use crate::reflection::registry::TypeRegistry;
use crate::types::error::{GomError, GomResult};
use crate::reflection::meta_arg::MetaArg;
use crate::types::arg_list::ArgList;
use crate::types::object::Object;
use crate::types::any::Any;
use crate::*;

/// Name of the single argument of every property setter.
pub const SETTER_ARG: &str = "value";

/// A typed property. Reads and writes go through a synthesized
/// `get_<name>` method and, unless read-only, a `set_<name>` method.
pub struct MetaProperty {
    name: String,
    container_name: String,
    type_name: String,
    read_only: bool,
    getter: Rc<MetaMethod>,
    setter: Option<Rc<MetaMethod>>,
    attributes: RefCell<CustomAttributes>,
}

impl MetaProperty {
    pub fn new(
        name: &str,
        container_name: &str,
        type_name: &str,
        getter: MethodAdapter,
        setter: Option<MethodAdapter>,
    ) -> Self {
        let get = MetaMethod::new(&format!("get_{name}"), container_name, MethodKind::Method, type_name);
        get.set_adapter(getter);

        let set = setter.map(|adapter| {
            let set = MetaMethod::new(&format!("set_{name}"), container_name, MethodKind::Method, "void");
            set.add_arg(MetaArg::new(SETTER_ARG, type_name));
            set.set_adapter(adapter);
            Rc::new(set)
        });

        Self {
            name: name.to_string(),
            container_name: container_name.to_string(),
            type_name: type_name.to_string(),
            read_only: set.is_none(),
            getter: Rc::new(get),
            setter: set,
            attributes: RefCell::new(CustomAttributes::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn meta_type(&self, registry: &TypeRegistry) -> Option<MetaTypeRef> {
        registry.resolve_meta_type(&self.type_name)
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn getter(&self) -> &Rc<MetaMethod> {
        &self.getter
    }

    pub fn setter(&self) -> Option<&Rc<MetaMethod>> {
        self.setter.as_ref()
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

    pub fn get_value(&self, target: &dyn Object) -> GomResult<Any> {
        self.getter.invoke(target, &ArgList::new())
    }

    pub fn set_value(&self, target: &dyn Object, value: &Any) -> GomResult<()> {
        let Some(setter) = &self.setter else {
            gom_err!("Object", "Property {}::{} is read-only", self.container_name, self.name);
            return Err(GomError::ReadOnlyProperty {
                class: self.container_name.clone(),
                name: self.name.clone(),
            });
        };
        let mut args = ArgList::new();
        args.create_arg(SETTER_ARG, value.clone());
        setter.invoke(target, &args).map(|_| ())
    }

    pub fn pre_delete(&self) {
        self.getter.pre_delete();
        if let Some(setter) = &self.setter {
            setter.pre_delete();
        }
    }
}
