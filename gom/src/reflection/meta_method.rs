// gom/src/reflection/meta_method.rs
use std::cell::RefCell;
use std::rc::Rc;
use strum_macros::{Display, EnumString};
use crate::reflection::meta_type::{CustomAttributes, MetaTypeRef};
use crate::reflection::registry::TypeRegistry;
use crate::types::error::{GomError, GomResult};
use crate::types::callable::CallableRef;
use crate::reflection::meta_arg::MetaArg;
use crate::types::object::{Object, ObjectRef};
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// Type name of a method taking its arguments as one list.
pub const ARG_LIST_TYPE: &str = "gom::ArgList";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MethodKind {
    Method,
    Slot,
    Signal,
    Constructor,
}

/// Native side of a method: receives the target, the method name and
/// the prepared arguments.
pub type MethodAdapter = Rc<dyn Fn(&dyn Object, &str, &ArgList, &TypeRegistry) -> GomResult<Any>>;

/// Native side of a constructor.
pub type ObjectFactory = Rc<dyn Fn(&ArgList, &TypeRegistry) -> GomResult<ObjectRef>>;

/// Wraps a closure as a [`MethodAdapter`].
pub fn method_adapter(
    f: impl Fn(&dyn Object, &str, &ArgList, &TypeRegistry) -> GomResult<Any> + 'static,
) -> MethodAdapter {
    Rc::new(f)
}

/// Wraps a closure as an [`ObjectFactory`].
pub fn object_factory(
    f: impl Fn(&ArgList, &TypeRegistry) -> GomResult<ObjectRef> + 'static,
) -> ObjectFactory {
    Rc::new(f)
}

/// A method, slot, signal or constructor of a class.
pub struct MetaMethod {
    name: String,
    container_name: String,
    kind: MethodKind,
    return_type_name: String,
    args: RefCell<Vec<MetaArg>>,
    attributes: RefCell<CustomAttributes>,
    adapter: RefCell<Option<MethodAdapter>>,
    factory: RefCell<Option<ObjectFactory>>,
    action: RefCell<Option<CallableRef>>,
}

impl MetaMethod {
    pub fn new(name: &str, container_name: &str, kind: MethodKind, return_type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            container_name: container_name.to_string(),
            kind,
            return_type_name: return_type_name.to_string(),
            args: RefCell::new(Vec::new()),
            attributes: RefCell::new(CustomAttributes::default()),
            adapter: RefCell::new(None),
            factory: RefCell::new(None),
            action: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class that declares this method.
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// `Class::method`, as used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.container_name, self.name)
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn return_type_name(&self) -> &str {
        &self.return_type_name
    }

    pub fn return_type(&self, registry: &TypeRegistry) -> Option<MetaTypeRef> {
        registry.resolve_meta_type(&self.return_type_name)
    }

    pub fn nb_args(&self) -> usize {
        self.args.borrow().len()
    }

    pub fn ith_arg(&self, i: usize) -> Option<MetaArg> {
        self.args.borrow().get(i).cloned()
    }

    pub fn args(&self) -> Vec<MetaArg> {
        self.args.borrow().clone()
    }

    pub fn find_arg(&self, name: &str) -> Option<MetaArg> {
        self.args.borrow().iter().find(|a| a.name() == name).cloned()
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.args.borrow().iter().any(|a| a.name() == name)
    }

    /// Appends a declared argument. Names are unique within a method.
    pub fn add_arg(&self, arg: MetaArg) -> bool {
        if self.has_arg(arg.name()) {
            gom_err!("MetaMethod", "{} : duplicate arg {}", self.qualified_name(), arg.name());
            return false;
        }
        self.args.borrow_mut().push(arg);
        true
    }

    pub fn set_arg_default_value(&self, name: &str, value: Any) -> bool {
        match self.args.borrow_mut().iter_mut().find(|a| a.name() == name) {
            Some(arg) => {
                arg.set_default_value(value);
                true
            }
            None => {
                gom_err!("MetaMethod", "{} : no such arg {}", self.qualified_name(), name);
                false
            }
        }
    }

    pub fn set_arg_custom_attribute(&self, arg_name: &str, name: &str, value: &str) -> bool {
        match self.args.borrow_mut().iter_mut().find(|a| a.name() == arg_name) {
            Some(arg) => {
                arg.attributes_mut().set(name, value);
                true
            }
            None => {
                gom_err!("MetaMethod", "{} : no such arg {}", self.qualified_name(), arg_name);
                false
            }
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

    pub fn set_adapter(&self, adapter: MethodAdapter) {
        *self.adapter.borrow_mut() = Some(adapter);
    }

    pub fn adapter(&self) -> Option<MethodAdapter> {
        self.adapter.borrow().clone()
    }

    pub fn set_factory(&self, factory: ObjectFactory) {
        *self.factory.borrow_mut() = Some(factory);
    }

    pub fn factory(&self) -> Option<ObjectFactory> {
        self.factory.borrow().clone()
    }

    /// Script function run by a dynamic slot or constructor.
    pub fn action(&self) -> Option<CallableRef> {
        self.action.borrow().clone()
    }

    pub fn set_action(&self, action: Option<CallableRef>) {
        *self.action.borrow_mut() = action;
    }

    /// True for methods that take their arguments as one untouched list.
    pub fn takes_arg_list(&self) -> bool {
        let args = self.args.borrow();
        args.len() == 1 && args[0].type_name() == ARG_LIST_TYPE
    }

    /// Declared args that have no default and are absent from `args`.
    pub fn missing_args(&self, args: &ArgList) -> Vec<String> {
        self.args
            .borrow()
            .iter()
            .filter(|a| !a.has_default_value() && !args.has_arg(a.name()))
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Every declared argument without a default is present.
    pub fn check_args(&self, args: &ArgList) -> bool {
        self.takes_arg_list() || self.missing_args(args).is_empty()
    }

    /// How many of the declared arguments are present in `args`.
    pub fn nb_used_args(&self, args: &ArgList) -> usize {
        self.args.borrow().iter().filter(|a| args.has_arg(a.name())).count()
    }

    pub fn nb_default_args(&self) -> usize {
        self.args.borrow().iter().filter(|a| a.has_default_value()).count()
    }

    /// Adds the default value of every declared argument missing from `args`.
    pub fn add_default_args(&self, args: &mut ArgList) {
        for arg in self.args.borrow().iter() {
            if arg.has_default_value() && !args.has_arg(arg.name()) {
                args.create_arg(arg.name(), arg.default_value().clone());
            }
        }
    }

    /// Names an unnamed list after the declared arguments, in order.
    pub fn name_positional_args(&self, args: &ArgList) -> GomResult<ArgList> {
        let declared = self.args.borrow();
        if args.nb_args() > declared.len() {
            gom_err!(
                "MetaMethod",
                "{} : expected {} args, got {}",
                self.qualified_name(),
                declared.len(),
                args.nb_args()
            );
            return Err(GomError::WrongArgCount {
                method: self.qualified_name(),
                expected: declared.len(),
                actual: args.nb_args(),
            });
        }

        let mut named = ArgList::new();
        for (i, (_, value)) in args.iter().enumerate() {
            named.create_arg(declared[i].name(), value.clone());
        }
        Ok(named)
    }

    /// The list the adapter receives: positional args named, presence
    /// checked, defaults added.
    pub fn prepare_args(&self, args: &ArgList) -> GomResult<ArgList> {
        if self.takes_arg_list() {
            return Ok(args.clone());
        }

        let mut prepared = if args.has_unnamed_args() && self.nb_args() > 0 {
            self.name_positional_args(args)?
        } else {
            args.clone()
        };

        let missing = self.missing_args(&prepared);
        if let Some(first) = missing.first() {
            gom_err!("MetaMethod", "MetaMethod {} : missing arguments", self.qualified_name());
            for name in &missing {
                gom_err!("MetaMethod", "   missing arg: {}", name);
            }
            gom_err!("MetaMethod", "   got: {}", prepared);
            return Err(GomError::MissingArgument {
                method: self.qualified_name(),
                arg: first.clone(),
            });
        }

        self.add_default_args(&mut prepared);
        Ok(prepared)
    }

    /// Calls the adapter on `target`. Nothing reaches the native side
    /// when a required argument is missing.
    pub fn invoke(&self, target: &dyn Object, args: &ArgList) -> GomResult<Any> {
        let adapter = self.adapter().ok_or_else(|| {
            gom_err!("MetaMethod", "{} does not have a method adapter", self.qualified_name());
            GomError::NoAdapter(self.qualified_name())
        })?;
        let registry = target
            .meta_class()
            .registry()
            .ok_or(GomError::RegistryShutDown)?;
        let args = self.prepare_args(args)?;
        adapter(target, &self.name, &args, &registry)
    }

    /// Runs a constructor.
    pub fn construct(&self, args: &ArgList, registry: &TypeRegistry) -> GomResult<ObjectRef> {
        let factory = self.factory().ok_or_else(|| {
            gom_err!("MetaMethod", "{} does not have a factory", self.qualified_name());
            GomError::NoAdapter(self.qualified_name())
        })?;
        let args = self.prepare_args(args)?;
        factory(&args, registry)
    }

    /// One-line signature followed by the `help` attribute, if any.
    pub fn get_doc(&self) -> String {
        let args: Vec<String> = self
            .args
            .borrow()
            .iter()
            .map(|a| {
                if a.has_default_value() {
                    format!("{}: {} = {}", a.name(), a.type_name(), a.default_value())
                } else {
                    format!("{}: {}", a.name(), a.type_name())
                }
            })
            .collect();

        let mut doc = format!("{} {}({}) -> {}", self.kind, self.name, args.join(", "), self.return_type_name);
        if let Some(help) = self.custom_attribute_value("help") {
            doc.push_str("\n  ");
            doc.push_str(&help);
        }
        doc
    }

    /// Releases args, default values and callbacks.
    pub fn pre_delete(&self) {
        for arg in self.args.borrow_mut().iter_mut() {
            arg.clear_default_value();
        }
        self.args.borrow_mut().clear();
        self.adapter.borrow_mut().take();
        self.factory.borrow_mut().take();
        self.action.borrow_mut().take();
    }
}

/// Downcasts a call target to the native type an adapter was written for.
pub fn downcast_target<'a, C: Object>(target: &'a dyn Object, method: &str) -> GomResult<&'a C> {
    target.as_any().downcast_ref::<C>().ok_or_else(|| {
        gom_err!(
            "MetaMethod",
            "{} : target {} is not a {}",
            method,
            target.string_id(),
            std::any::type_name::<C>()
        );
        GomError::TypeMismatch {
            expected: std::any::type_name::<C>().to_string(),
            actual: target.meta_class().name().to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_and_args() -> (TypeRegistry, MetaMethod) {
        let registry = TypeRegistry::new();
        let method = MetaMethod::new("add", "Calc", MethodKind::Slot, "int");
        method.add_arg(MetaArg::new("a", "int"));
        method.add_arg(MetaArg::with_default("b", "int", registry.any(10)));
        (registry, method)
    }

    #[test]
    fn duplicate_args_are_refused() {
        let (_registry, method) = registry_and_args();
        assert!(!method.add_arg(MetaArg::new("a", "double")));
        assert_eq!(method.nb_args(), 2);
    }

    #[test]
    fn defaults_fill_missing_args() {
        let (registry, method) = registry_and_args();
        let mut args = ArgList::new();
        args.create_arg("a", registry.any(1));

        assert!(method.check_args(&args));
        assert_eq!(method.nb_used_args(&args), 1);
        let prepared = method.prepare_args(&args).unwrap();
        assert_eq!(prepared.get_arg_value::<i32>("b").unwrap(), 10);
    }

    #[test]
    fn required_args_must_be_present() {
        let (registry, method) = registry_and_args();
        let mut args = ArgList::new();
        args.create_arg("b", registry.any(1));

        assert!(!method.check_args(&args));
        assert_eq!(
            method.prepare_args(&args).unwrap_err(),
            GomError::MissingArgument { method: "Calc::add".into(), arg: "a".into() }
        );
    }

    #[test]
    fn positional_args_follow_declared_order() {
        let (registry, method) = registry_and_args();
        let mut args = ArgList::new();
        args.create_unnamed_arg(registry.any(4));
        args.create_unnamed_arg(registry.any(5));

        let prepared = method.prepare_args(&args).unwrap();
        assert_eq!(prepared.ith_arg_name(0), "a");
        assert_eq!(prepared.get_arg_value::<i32>("b").unwrap(), 5);

        args.create_unnamed_arg(registry.any(6));
        assert!(matches!(method.prepare_args(&args), Err(GomError::WrongArgCount { .. })));
    }

    #[test]
    fn arg_list_methods_get_the_list_untouched() {
        let registry = TypeRegistry::new();
        let method = MetaMethod::new("apply", "Calc", MethodKind::Method, "void");
        method.add_arg(MetaArg::new("args", ARG_LIST_TYPE));
        let mut args = ArgList::new();
        args.create_arg("anything", registry.any(true));

        assert!(method.check_args(&args));
        assert_eq!(method.prepare_args(&args).unwrap(), args);
    }

    #[test]
    fn doc_lists_signature() {
        let (_registry, method) = registry_and_args();
        method.set_custom_attribute("help", "adds two numbers");
        assert_eq!(method.get_doc(), "slot add(a: int, b: int = 10) -> int\n  adds two numbers");
    }

    #[test]
    fn pre_delete_releases_everything() {
        let (_registry, method) = registry_and_args();
        method.set_adapter(method_adapter(|_, _, _, _| Ok(Any::null())));
        method.pre_delete();
        assert_eq!(method.nb_args(), 0);
        assert!(method.adapter().is_none());
    }
}
