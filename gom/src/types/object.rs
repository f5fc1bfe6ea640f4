// gom/src/types/object.rs
use std::collections::HashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use crate::reflection::registry::{TypeRegistry, OBJECT_CLASS};
use crate::types::connection::{Connection, ConnectionTarget};
use crate::types::error::{GomError, GomResult};
use crate::reflection::meta_type::MetaTypeRef;
use crate::types::callable::CallableRef;
use crate::types::commands;
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

pub type ObjectRef = Rc<dyn Object>;
pub type WeakObjectRef = Weak<dyn Object>;

thread_local! {
    static NEXT_ID: Cell<u32> = const { Cell::new(1) };
    static OBJECTS: RefCell<HashMap<u32, WeakObjectRef>> = RefCell::new(HashMap::new());
}

/// Plumbing every object provides. Usually derived with `#[derive(GomObject)]`.
pub trait ObjectCore: std::any::Any {
    fn object_base(&self) -> &ObjectBase;
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_object(&self) -> &dyn Object;
}

/// Reflective dispatch. The default methods resolve names through the
/// object's meta class; implementors override them to store state elsewhere.
pub trait Object: ObjectCore {
    fn invoke_method(&self, name: &str, args: &ArgList) -> GomResult<Any> {
        default_invoke_method(self.as_object(), name, args)
    }

    fn get_property(&self, name: &str) -> GomResult<Any> {
        default_get_property(self.as_object(), name)
    }

    fn set_property(&self, name: &str, value: &Any) -> GomResult<()> {
        default_set_property(self.as_object(), name, value)
    }

    /// Containers expose their elements by index.
    fn get_nb_elements(&self) -> usize {
        0
    }

    fn get_element(&self, i: usize) -> GomResult<Any> {
        gom_err!("Object", "{} : get_element({}) not implemented", self.as_object().string_id(), i);
        Err(GomError::NotImplemented("get_element".to_string()))
    }

    fn set_element(&self, i: usize, _value: &Any) -> GomResult<()> {
        gom_err!("Object", "{} : set_element({}) not implemented", self.as_object().string_id(), i);
        Err(GomError::NotImplemented("set_element".to_string()))
    }
}

/// State shared by every object: identity, class, flags and the
/// outgoing connections grouped by signal.
pub struct ObjectBase {
    id: u32,
    meta_class: MetaTypeRef,
    self_ref: RefCell<Option<WeakObjectRef>>,
    connections: RefCell<HashMap<String, Vec<Rc<Connection>>>>,
    slots_enabled: Cell<bool>,
    signals_enabled: Cell<bool>,
}

impl ObjectBase {
    pub fn new(meta_class: MetaTypeRef) -> Self {
        let id = NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            id,
            meta_class,
            self_ref: RefCell::new(None),
            connections: RefCell::new(HashMap::new()),
            slots_enabled: Cell::new(true),
            signals_enabled: Cell::new(true),
        }
    }

    /// Base for an instance of the native class bound to `T`.
    pub fn of<T: 'static>(registry: &TypeRegistry) -> GomResult<Self> {
        let typeid_name = std::any::type_name::<T>();
        match registry.resolve_meta_type_by_typeid_name(typeid_name) {
            Some(meta_class) if meta_class.is_class() => Ok(Self::new(meta_class)),
            _ => {
                gom_err!("Object", "No meta class bound for {}", typeid_name);
                Err(GomError::UnknownType(typeid_name.to_string()))
            }
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn meta_class(&self) -> &MetaTypeRef {
        &self.meta_class
    }

    pub fn slots_enabled(&self) -> bool {
        self.slots_enabled.get()
    }

    pub fn set_slots_enabled(&self, enabled: bool) {
        self.slots_enabled.set(enabled);
    }

    pub fn signals_enabled(&self) -> bool {
        self.signals_enabled.get()
    }

    pub fn set_signals_enabled(&self, enabled: bool) {
        self.signals_enabled.set(enabled);
    }

    /// Snapshot of the connections of a signal, in registration order.
    pub fn connections(&self, signal: &str) -> Vec<Rc<Connection>> {
        self.connections
            .borrow()
            .get(signal)
            .cloned()
            .unwrap_or_default()
    }

    pub fn nb_connections(&self, signal: &str) -> usize {
        self.connections.borrow().get(signal).map_or(0, Vec::len)
    }

    pub(crate) fn add_connection(&self, connection: Rc<Connection>) {
        self.connections
            .borrow_mut()
            .entry(connection.signal_name().to_string())
            .or_default()
            .push(connection);
    }

    pub(crate) fn remove_connection(&self, connection: &Connection) {
        let mut connections = self.connections.borrow_mut();
        if let Some(list) = connections.get_mut(connection.signal_name()) {
            list.retain(|c| !std::ptr::eq(Rc::as_ptr(c), connection));
            if list.is_empty() {
                connections.remove(connection.signal_name());
            }
        }
    }

    /// Drops every outgoing connection.
    pub fn disconnect_all(&self) {
        let connections: Vec<Rc<Connection>> = self
            .connections
            .borrow_mut()
            .drain()
            .flat_map(|(_, list)| list)
            .collect();
        for connection in connections {
            connection.mark_removed();
        }
    }
}

impl Drop for ObjectBase {
    fn drop(&mut self) {
        let id = self.id;
        let _ = OBJECTS.try_with(|objects| objects.borrow_mut().remove(&id));
    }
}

/// Shares an object and binds its self reference. Objects must be created
/// through this function to be connected or passed to scripts.
pub fn make_object<T: Object>(value: T) -> Rc<T> {
    let object = Rc::new(value);
    let shared: ObjectRef = object.clone();
    let weak = Rc::downgrade(&shared);
    *object.object_base().self_ref.borrow_mut() = Some(weak.clone());
    let id = object.object_base().id();
    OBJECTS.with(|objects| objects.borrow_mut().insert(id, weak));
    object
}

/// A live object by id.
pub fn find_object_by_id(id: u32) -> Option<ObjectRef> {
    OBJECTS.with(|objects| objects.borrow().get(&id).and_then(Weak::upgrade))
}

/// Whether two handles share the same object.
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl<'o> dyn Object + 'o {
    pub fn meta_class(&self) -> MetaTypeRef {
        self.object_base().meta_class().clone()
    }

    pub fn id(&self) -> u32 {
        self.object_base().id()
    }

    /// `@Class::#id`.
    pub fn string_id(&self) -> String {
        format!("@{}::#{}", self.object_base().meta_class().name(), self.id())
    }

    /// Shared handle to this object, if it was created with [`make_object`].
    pub fn self_ref(&self) -> Option<ObjectRef> {
        self.object_base().self_ref.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is_a(&self, class_name: &str) -> bool {
        self.object_base()
            .meta_class()
            .as_meta_class()
            .is_some_and(|c| c.is_a(class_name))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.object_base()
            .meta_class()
            .as_meta_class()
            .is_some_and(|c| c.find_method(name).is_some())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.object_base()
            .meta_class()
            .as_meta_class()
            .is_some_and(|c| c.find_property(name).is_some())
    }

    /// Writes every argument naming a known property. Returns false if
    /// a write failed.
    pub fn set_properties(&self, args: &ArgList) -> bool {
        let mut ok = true;
        for (name, value) in args.iter() {
            if !self.has_property(name) {
                continue;
            }
            if let Err(e) = self.set_property(name, value) {
                gom_warn!("Object", "{} : could not set {} ({})", self.string_id(), name, e);
                ok = false;
            }
        }
        ok
    }

    /// Property names declared below `gom::Object`, joined with `;`.
    pub fn get_attributes(&self) -> String {
        let meta_class = self.meta_class();
        let Some(class) = meta_class.as_meta_class() else {
            return String::new();
        };
        class
            .properties(true)
            .iter()
            .filter(|p| p.container_name() != OBJECT_CLASS)
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    fn connect(&self, signal: &str, target: ConnectionTarget) -> GomResult<Rc<Connection>> {
        let meta_class = self.meta_class();
        let has_signal = meta_class
            .as_meta_class()
            .is_some_and(|c| c.find_signal(signal).is_some());
        if !has_signal {
            gom_err!("Object", "{}::{} : no such signal", meta_class.name(), signal);
            return Err(GomError::NoSuchMethod { class: meta_class.name().to_string(), name: signal.to_string() });
        }
        let Some(source) = self.object_base().self_ref.borrow().clone() else {
            gom_err!("Object", "{} : cannot connect an object that is not shared", self.string_id());
            return Err(GomError::NullValue);
        };
        let connection = Rc::new(Connection::new(source, signal, target));
        self.object_base().add_connection(connection.clone());
        Ok(connection)
    }

    /// Connects a signal of this object to a slot (or any method) of `target`.
    pub fn connect_signal_to_slot(&self, signal: &str, target: &ObjectRef, slot: &str) -> GomResult<Rc<Connection>> {
        if !target.has_method(slot) {
            gom_err!("Object", "No such method: {}::{}", target.meta_class().name(), slot);
            return Err(GomError::NoSuchMethod { class: target.meta_class().name().to_string(), name: slot.to_string() });
        }
        self.connect(
            signal,
            ConnectionTarget::Slot { target: Rc::downgrade(target), slot_name: slot.to_string() },
        )
    }

    /// Connects a signal of this object to a callable.
    pub fn connect_signal_to_callable(&self, signal: &str, callable: CallableRef) -> GomResult<Rc<Connection>> {
        self.connect(signal, ConnectionTarget::Callable(callable))
    }

    /// Invokes the connections of a signal in registration order. A
    /// failing connection is logged and the next one still runs.
    pub fn emit_signal(&self, signal: &str, args: &ArgList) -> bool {
        if !self.object_base().signals_enabled() {
            return true;
        }
        let mut ok = true;
        for connection in self.object_base().connections(signal) {
            if let Err(e) = connection.invoke(args) {
                gom_err!("Object", "{} : error in connection of signal {} ({})", self.string_id(), signal, e);
                ok = false;
            }
        }
        ok
    }

    /// Drops every outgoing connection.
    pub fn disconnect(&self) {
        self.object_base().disconnect_all();
    }
}

/// What [`Object::invoke_method`] does unless overridden.
pub fn default_invoke_method(target: &dyn Object, name: &str, args: &ArgList) -> GomResult<Any> {
    if !target.object_base().slots_enabled() && name != "set_slots_enabled" && name != "slots_enabled" {
        return Ok(Any::null());
    }

    let meta_class = target.meta_class();
    let Some(class) = meta_class.as_meta_class() else {
        return Err(GomError::NotAClass(meta_class.name().to_string()));
    };

    if let Some(method) = class.find_method(name) {
        if commands::is_command(&method, target) {
            return commands::invoke_command(target, &method, args);
        }
        return method.invoke(target, args);
    }

    if let Some(prop) = class.find_property(name) {
        if prop.read_only() {
            gom_err!("Object", "Property {}::{} is read-only", meta_class.name(), name);
            return Err(GomError::ReadOnlyProperty { class: meta_class.name().to_string(), name: name.to_string() });
        }
        if args.is_empty() {
            return Err(GomError::MissingArgument {
                method: format!("{}::{}", meta_class.name(), name),
                arg: crate::reflection::meta_property::SETTER_ARG.to_string(),
            });
        }
        target.set_property(name, args.ith_arg_value(0))?;
        return Ok(Any::null());
    }

    gom_err!("Object", "No such method: {}::{}", meta_class.name(), name);
    Err(GomError::NoSuchMethod { class: meta_class.name().to_string(), name: name.to_string() })
}

/// What [`Object::get_property`] does unless overridden.
pub fn default_get_property(target: &dyn Object, name: &str) -> GomResult<Any> {
    let meta_class = target.meta_class();
    match meta_class.as_meta_class().and_then(|c| c.find_property(name)) {
        Some(prop) => prop.get_value(target),
        None => {
            gom_err!("Object", "{}::{} : no such property", meta_class.name(), name);
            Err(GomError::NoSuchProperty { class: meta_class.name().to_string(), name: name.to_string() })
        }
    }
}

/// What [`Object::set_property`] does unless overridden.
pub fn default_set_property(target: &dyn Object, name: &str, value: &Any) -> GomResult<()> {
    let meta_class = target.meta_class();
    match meta_class.as_meta_class().and_then(|c| c.find_property(name)) {
        Some(prop) => prop.set_value(target, value),
        None => {
            gom_err!("Object", "{}::{} : no such property", meta_class.name(), name);
            Err(GomError::NoSuchProperty { class: meta_class.name().to_string(), name: name.to_string() })
        }
    }
}
