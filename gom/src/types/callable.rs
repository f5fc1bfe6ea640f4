// gom/src/types/callable.rs
use std::rc::Rc;
use crate::reflection::meta_method::MetaMethod;
use crate::types::error::{GomError, GomResult};
use crate::types::object::ObjectRef;
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// Something that can be called with an argument list: a bound method,
/// a script function or a Rust closure.
pub trait Callable {
    fn invoke(&self, args: &ArgList) -> GomResult<Any>;

    /// Short description used in diagnostics.
    fn describe(&self) -> String {
        "callable".to_string()
    }
}

pub type CallableRef = Rc<dyn Callable>;

/// Whether two handles share the same callable.
pub fn same_callable(a: &CallableRef, b: &CallableRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// A method bound to an object.
#[derive(Clone)]
pub struct Request {
    object: ObjectRef,
    method: Rc<MetaMethod>,
}

impl Request {
    pub fn new(object: ObjectRef, method: Rc<MetaMethod>) -> Self {
        Self { object, method }
    }

    /// Binds `object.name`, resolving the method on the object's class.
    pub fn from_name(object: &ObjectRef, name: &str) -> GomResult<Self> {
        let class_type = object.meta_class();
        let method = class_type.as_meta_class().and_then(|c| c.find_method(name));
        match method {
            Some(method) => Ok(Self::new(object.clone(), method)),
            None => {
                gom_err!("Object", "No such method: {}::{}", class_type.name(), name);
                Err(GomError::NoSuchMethod { class: class_type.name().to_string(), name: name.to_string() })
            }
        }
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn method(&self) -> &Rc<MetaMethod> {
        &self.method
    }
}

impl Callable for Request {
    fn invoke(&self, args: &ArgList) -> GomResult<Any> {
        self.object.invoke_method(self.method.name(), args)
    }

    fn describe(&self) -> String {
        format!("{}.{}", self.object.string_id(), self.method.name())
    }
}

/// A Rust closure exposed as a callable.
pub struct NativeCallable {
    name: String,
    f: Box<dyn Fn(&ArgList) -> GomResult<Any>>,
}

impl NativeCallable {
    pub fn new(name: &str, f: impl Fn(&ArgList) -> GomResult<Any> + 'static) -> Self {
        Self { name: name.to_string(), f: Box::new(f) }
    }

    /// Shared handle, ready to be stored in an `Any` or a connection.
    pub fn new_ref(name: &str, f: impl Fn(&ArgList) -> GomResult<Any> + 'static) -> CallableRef {
        Rc::new(Self::new(name, f))
    }
}

impl Callable for NativeCallable {
    fn invoke(&self, args: &ArgList) -> GomResult<Any> {
        (self.f)(args)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
