// gom/src/reflection/meta_class.rs
use std::collections::BTreeSet;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use crate::reflection::meta_method::{downcast_target, method_adapter, object_factory, MetaMethod, MethodKind};
use crate::reflection::dynamic::{dynamic_constructor, dynamic_property_adapters, dynamic_slot_adapter, signal_adapter};
use crate::reflection::meta_type::{MetaType, MetaTypeRef};
use crate::reflection::meta_property::MetaProperty;
use crate::reflection::registry::TypeRegistry;
use crate::types::error::{GomError, GomResult};
use crate::reflection::meta_member::MetaMember;
use crate::types::object::{Object, ObjectRef};
use crate::reflection::meta_arg::MetaArg;
use crate::types::callable::CallableRef;
use crate::types::arg_list::ArgList;
use crate::types::value::GomType;
use crate::types::any::Any;
use crate::*;

/// Class part of a [`MetaType`]: super class, members and constructors.
pub struct MetaClass {
    owner: Weak<MetaType>,
    name: String,
    super_class_name: Option<String>,
    is_abstract: bool,
    is_dynamic: bool,
    members: RefCell<Vec<MetaMember>>,
    nb_constructors_created: Cell<usize>,
}

impl MetaClass {
    pub fn new(
        owner: Weak<MetaType>,
        name: &str,
        super_class_name: Option<&str>,
        is_abstract: bool,
        is_dynamic: bool,
    ) -> Self {
        Self {
            owner,
            name: name.to_string(),
            super_class_name: super_class_name.map(str::to_string),
            is_abstract,
            is_dynamic,
            members: RefCell::new(Vec::new()),
            nb_constructors_created: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The meta type this class belongs to.
    pub fn meta_type(&self) -> Option<MetaTypeRef> {
        self.owner.upgrade()
    }

    pub fn registry(&self) -> Option<TypeRegistry> {
        self.owner.upgrade().and_then(|t| t.registry())
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Dynamic classes accept member removal and script-defined members.
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.super_class_name.as_deref()
    }

    pub fn super_class(&self) -> Option<MetaTypeRef> {
        let name = self.super_class_name.as_deref()?;
        self.registry()?.resolve_meta_class(name)
    }

    pub fn is_subclass_of(&self, other: &MetaClass) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match self.super_class() {
            Some(super_type) => super_type
                .as_meta_class()
                .is_some_and(|super_class| super_class.is_subclass_of(other)),
            None => false,
        }
    }

    /// Same as [`is_subclass_of`](Self::is_subclass_of), by class name.
    pub fn is_a(&self, class_name: &str) -> bool {
        if self.name == class_name {
            return true;
        }
        match self.super_class() {
            Some(super_type) => super_type.as_meta_class().is_some_and(|c| c.is_a(class_name)),
            None => false,
        }
    }

    /// Members of this class, after those of the super classes when
    /// `with_super` is set.
    pub fn members(&self, with_super: bool) -> Vec<MetaMember> {
        let mut result = Vec::new();
        if with_super {
            if let Some(super_type) = self.super_class() {
                if let Some(super_class) = super_type.as_meta_class() {
                    result = super_class.members(true);
                }
            }
        }
        result.extend(self.members.borrow().iter().cloned());
        result
    }

    pub fn nb_members(&self, with_super: bool) -> usize {
        self.members(with_super).len()
    }

    pub fn ith_member(&self, i: usize, with_super: bool) -> Option<MetaMember> {
        self.members(with_super).get(i).cloned()
    }

    /// Looks in this class first, then up the chain.
    pub fn find_member(&self, name: &str, with_super: bool) -> Option<MetaMember> {
        let own = self
            .members
            .borrow()
            .iter()
            .find(|m| m.name() == name)
            .cloned();
        if own.is_some() || !with_super {
            return own;
        }
        let super_type = self.super_class()?;
        super_type.as_meta_class()?.find_member(name, true)
    }

    /// A method by name. `get_<p>` and `set_<p>` resolve to the
    /// accessors of property `p`.
    pub fn find_method(&self, name: &str) -> Option<Rc<MetaMethod>> {
        if let Some(MetaMember::Method(method)) = self.find_member(name, true) {
            return Some(method);
        }
        if let Some(prop_name) = name.strip_prefix("get_") {
            if let Some(prop) = self.find_property(prop_name) {
                return Some(prop.getter().clone());
            }
        }
        if let Some(prop_name) = name.strip_prefix("set_") {
            if let Some(prop) = self.find_property(prop_name) {
                return prop.setter().cloned();
            }
        }
        None
    }

    pub fn find_slot(&self, name: &str) -> Option<Rc<MetaMethod>> {
        self.find_method(name).filter(|m| m.kind() == MethodKind::Slot)
    }

    pub fn find_signal(&self, name: &str) -> Option<Rc<MetaMethod>> {
        self.find_method(name).filter(|m| m.kind() == MethodKind::Signal)
    }

    pub fn find_property(&self, name: &str) -> Option<Rc<MetaProperty>> {
        match self.find_member(name, true) {
            Some(MetaMember::Property(prop)) => Some(prop),
            _ => None,
        }
    }

    pub fn methods(&self, with_super: bool) -> Vec<Rc<MetaMethod>> {
        self.members(with_super)
            .iter()
            .filter_map(|m| m.as_method().cloned())
            .filter(|m| m.kind() != MethodKind::Constructor)
            .collect()
    }

    pub fn slots(&self, with_super: bool) -> Vec<Rc<MetaMethod>> {
        self.methods(with_super)
            .into_iter()
            .filter(|m| m.kind() == MethodKind::Slot)
            .collect()
    }

    pub fn signals(&self, with_super: bool) -> Vec<Rc<MetaMethod>> {
        self.methods(with_super)
            .into_iter()
            .filter(|m| m.kind() == MethodKind::Signal)
            .collect()
    }

    pub fn properties(&self, with_super: bool) -> Vec<Rc<MetaProperty>> {
        self.members(with_super)
            .iter()
            .filter_map(|m| m.as_property().cloned())
            .collect()
    }

    /// Constructors are not inherited.
    pub fn constructors(&self) -> Vec<Rc<MetaMethod>> {
        self.members(false)
            .iter()
            .filter_map(|m| m.as_method().cloned())
            .filter(|m| m.kind() == MethodKind::Constructor)
            .collect()
    }

    /// Appends a member. Names are unique within a class.
    pub fn add_member(&self, member: MetaMember) -> bool {
        if self.members.borrow().iter().any(|m| m.name() == member.name()) {
            gom_err!("GOM", "{}::{} is already declared", self.name, member.name());
            return false;
        }
        self.members.borrow_mut().push(member);
        true
    }

    /// Removes a member of a dynamic class and releases what it holds.
    pub fn remove_member(&self, name: &str) -> GomResult<()> {
        self.require_dynamic("remove_member")?;
        let position = self.members.borrow().iter().position(|m| m.name() == name);
        match position {
            Some(i) => {
                let member = self.members.borrow_mut().remove(i);
                member.pre_delete();
                Ok(())
            }
            None => {
                gom_err!("GOM", "{}::{} : no such member", self.name, name);
                Err(GomError::NoSuchMethod { class: self.name.clone(), name: name.to_string() })
            }
        }
    }

    /// Names of every type used by members, e.g. to list dependencies.
    pub fn used_types(&self, with_super: bool) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        for member in self.members(with_super) {
            match member {
                MetaMember::Method(method) => {
                    result.insert(method.return_type_name().to_string());
                    for arg in method.args() {
                        result.insert(arg.type_name().to_string());
                    }
                }
                MetaMember::Property(prop) => {
                    result.insert(prop.type_name().to_string());
                }
            }
        }
        result
    }

    /// `constructor_<n>`, unique within this class.
    pub fn new_constructor_name(&self) -> String {
        let n = self.nb_constructors_created.get();
        self.nb_constructors_created.set(n + 1);
        format!("constructor_{n}")
    }

    /// Chooses a constructor. Unnamed lists match by count. Named lists
    /// pick the acceptable constructor that uses the most args.
    pub fn best_constructor(&self, args: &ArgList) -> Option<Rc<MetaMethod>> {
        let constructors = self.constructors();
        if args.has_unnamed_args() {
            return constructors
                .into_iter()
                .filter(|c| c.nb_args() == args.nb_args())
                .last();
        }

        let mut best: Option<(Rc<MetaMethod>, usize)> = None;
        for constructor in constructors {
            if !constructor.check_args(args) {
                continue;
            }
            let used = constructor.nb_used_args(args);
            if best.as_ref().map_or(true, |(_, best_used)| used >= *best_used) {
                best = Some((constructor, used));
            }
        }
        best.map(|(constructor, _)| constructor)
    }

    /// Instantiates the class. Named args the constructor does not use
    /// are written to writable properties of the new object.
    pub fn create(&self, args: &ArgList) -> GomResult<ObjectRef> {
        if self.is_abstract {
            gom_err!("GOM", "{} is abstract (cannot create() instances)", self.name);
            return Err(GomError::AbstractClass(self.name.clone()));
        }
        let registry = self.registry().ok_or(GomError::RegistryShutDown)?;

        let Some(constructor) = self.best_constructor(args) else {
            gom_err!("GOM", "{} does not have a matching constructor (missing arg?)", self.name);
            gom_err!("GOM", "   args: {}", args);
            return Err(GomError::NoMatchingConstructor(self.name.clone()));
        };

        let object = constructor.construct(args, &registry)?;

        if !args.has_unnamed_args() {
            for (name, value) in args.iter() {
                if constructor.has_arg(name) {
                    continue;
                }
                match self.find_property(name) {
                    Some(prop) if !prop.read_only() => {
                        if let Err(e) = object.set_property(name, value) {
                            gom_warn!("GOM", "{}::create() : could not set {} ({})", self.name, name, e);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(object)
    }

    /// Creates a dynamic subclass and binds it in the registry.
    pub fn create_subclass(&self, name: &str, is_abstract: bool) -> GomResult<MetaTypeRef> {
        let registry = self.registry().ok_or(GomError::RegistryShutDown)?;
        registry.create_dynamic_class(name, Some(&self.name), is_abstract)
    }

    fn require_dynamic(&self, operation: &str) -> GomResult<()> {
        if self.is_dynamic {
            Ok(())
        } else {
            gom_err!("GOM", "{}::{}() : class is not dynamic", self.name, operation);
            Err(GomError::NotImplemented(format!("{}::{}", self.name, operation)))
        }
    }

    fn type_name_of<T: GomType>(&self) -> String {
        self.registry()
            .and_then(|r| r.resolve_native::<T>())
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| T::typeid_name().to_string())
    }

    /// Declares a native method. `f` gets the prepared args. `None` if
    /// the name is already taken.
    pub fn add_method(
        &self,
        name: &str,
        return_type: &str,
        args: Vec<MetaArg>,
        f: impl Fn(&dyn Object, &ArgList, &TypeRegistry) -> GomResult<Any> + 'static,
    ) -> Option<Rc<MetaMethod>> {
        self.add_native(name, MethodKind::Method, return_type, args, f)
    }

    /// Declares a native slot.
    pub fn add_native_slot(
        &self,
        name: &str,
        return_type: &str,
        args: Vec<MetaArg>,
        f: impl Fn(&dyn Object, &ArgList, &TypeRegistry) -> GomResult<Any> + 'static,
    ) -> Option<Rc<MetaMethod>> {
        self.add_native(name, MethodKind::Slot, return_type, args, f)
    }

    fn add_native(
        &self,
        name: &str,
        kind: MethodKind,
        return_type: &str,
        args: Vec<MetaArg>,
        f: impl Fn(&dyn Object, &ArgList, &TypeRegistry) -> GomResult<Any> + 'static,
    ) -> Option<Rc<MetaMethod>> {
        let method = Rc::new(MetaMethod::new(name, &self.name, kind, return_type));
        for arg in args {
            method.add_arg(arg);
        }
        if !self.add_member(MetaMember::Method(method.clone())) {
            return None;
        }
        method.set_adapter(method_adapter(move |target, _, args, registry| f(target, args, registry)));
        Some(method)
    }

    fn add_property_member(&self, prop: MetaProperty) -> Option<Rc<MetaProperty>> {
        let prop = Rc::new(prop);
        self.add_member(MetaMember::Property(prop.clone())).then_some(prop)
    }

    /// Declares a read-write property backed by native accessors of `C`.
    pub fn add_native_property<C, T>(
        &self,
        name: &str,
        get: impl Fn(&C) -> T + 'static,
        set: impl Fn(&C, T) + 'static,
    ) -> Option<Rc<MetaProperty>>
    where
        C: Object,
        T: GomType,
    {
        let getter = method_adapter(move |target, method, _, registry| {
            let this = downcast_target::<C>(target, method)?;
            Ok(Any::new(registry, get(this)))
        });
        let setter = method_adapter(move |target, method, args, _| {
            let this = downcast_target::<C>(target, method)?;
            let value = args.get_arg_value::<T>(crate::reflection::meta_property::SETTER_ARG)?;
            set(this, value);
            Ok(Any::null())
        });
        self.add_property_member(MetaProperty::new(name, &self.name, &self.type_name_of::<T>(), getter, Some(setter)))
    }

    /// Declares a read-only property backed by a native getter of `C`.
    pub fn add_native_read_only_property<C, T>(
        &self,
        name: &str,
        get: impl Fn(&C) -> T + 'static,
    ) -> Option<Rc<MetaProperty>>
    where
        C: Object,
        T: GomType,
    {
        let getter = method_adapter(move |target, method, _, registry| {
            let this = downcast_target::<C>(target, method)?;
            Ok(Any::new(registry, get(this)))
        });
        self.add_property_member(MetaProperty::new(name, &self.name, &self.type_name_of::<T>(), getter, None))
    }

    /// Declares a property computed from the object by an adapter.
    pub fn add_computed_property(
        &self,
        name: &str,
        type_name: &str,
        get: impl Fn(&dyn Object, &TypeRegistry) -> GomResult<Any> + 'static,
    ) -> Option<Rc<MetaProperty>> {
        let getter = method_adapter(move |target, _, _, registry| {
            get(target, registry)
        });
        self.add_property_member(MetaProperty::new(name, &self.name, type_name, getter, None))
    }

    /// Declares a constructor implemented in Rust.
    pub fn add_native_constructor(
        &self,
        args: Vec<MetaArg>,
        factory: impl Fn(&ArgList, &TypeRegistry) -> GomResult<ObjectRef> + 'static,
    ) -> Rc<MetaMethod> {
        let constructor = Rc::new(MetaMethod::new(
            &self.new_constructor_name(),
            &self.name,
            MethodKind::Constructor,
            &format!("{}*", self.name),
        ));
        for arg in args {
            constructor.add_arg(arg);
        }
        constructor.set_factory(object_factory(factory));
        self.add_member(MetaMember::Method(constructor.clone()));
        constructor
    }

    /// Declares a property stored per object by dynamic objects.
    pub fn add_property(&self, name: &str, type_name: &str, read_only: bool) -> GomResult<Rc<MetaProperty>> {
        self.require_dynamic("add_property")?;
        let (getter, setter) = dynamic_property_adapters(name);
        let setter = if read_only { None } else { Some(setter) };
        let prop = Rc::new(MetaProperty::new(name, &self.name, type_name, getter, setter));
        if !self.add_member(MetaMember::Property(prop.clone())) {
            return Err(GomError::DuplicateType(format!("{}::{}", self.name, name)));
        }
        Ok(prop)
    }

    /// Declares a slot whose body is a script callable. The action
    /// receives `self` (and `method` for named calls) before the args.
    pub fn add_slot(&self, name: &str, action: Option<CallableRef>, return_type: &str) -> GomResult<Rc<MetaMethod>> {
        self.require_dynamic("add_slot")?;
        let slot = Rc::new(MetaMethod::new(name, &self.name, MethodKind::Slot, return_type));
        slot.set_action(action);
        slot.set_adapter(dynamic_slot_adapter());
        if !self.add_member(MetaMember::Method(slot.clone())) {
            return Err(GomError::DuplicateType(format!("{}::{}", self.name, name)));
        }
        Ok(slot)
    }

    /// Declares a signal. Invoking it emits it.
    pub fn add_signal(&self, name: &str) -> GomResult<Rc<MetaMethod>> {
        self.require_dynamic("add_signal")?;
        let signal = Rc::new(MetaMethod::new(name, &self.name, MethodKind::Signal, "void"));
        signal.set_adapter(signal_adapter());
        if !self.add_member(MetaMember::Method(signal.clone())) {
            return Err(GomError::DuplicateType(format!("{}::{}", self.name, name)));
        }
        Ok(signal)
    }

    /// Declares a constructor of dynamic objects. Without an action the
    /// args are copied to writable properties. With an action, the action
    /// runs with `self` added to the args.
    pub fn add_constructor(&self, action: Option<CallableRef>) -> GomResult<Rc<MetaMethod>> {
        self.require_dynamic("add_constructor")?;
        let constructor = Rc::new(MetaMethod::new(
            &self.new_constructor_name(),
            &self.name,
            MethodKind::Constructor,
            &format!("{}*", self.name),
        ));
        constructor.set_action(action);
        constructor.set_factory(dynamic_constructor(self.owner.clone(), Rc::downgrade(&constructor)));
        self.add_member(MetaMember::Method(constructor.clone()));
        Ok(constructor)
    }

    /// Signatures of every member, one per line.
    pub fn get_doc(&self) -> String {
        let mut doc = match &self.super_class_name {
            Some(super_name) => format!("class {} : {}", self.name, super_name),
            None => format!("class {}", self.name),
        };
        for member in self.members(false) {
            doc.push_str("\n  ");
            match member {
                MetaMember::Method(method) => doc.push_str(&method.get_doc().replace('\n', "\n  ")),
                MetaMember::Property(prop) => {
                    let access = if prop.read_only() { " (read-only)" } else { "" };
                    doc.push_str(&format!("property {}: {}{}", prop.name(), prop.type_name(), access));
                }
            }
        }
        doc
    }

    pub(crate) fn pre_delete(&self) {
        let members: Vec<MetaMember> = self.members.borrow_mut().drain(..).collect();
        for member in members {
            member.pre_delete();
        }
    }
}
