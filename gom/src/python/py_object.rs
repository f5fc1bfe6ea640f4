// gom/src/python/py_object.rs
use pyo3::exceptions::{PyAttributeError, PyRuntimeError};
use pyo3::types::{PyDict, PyTuple};
use pyo3::pyclass::CompareOp;
use pyo3::prelude::*;
use std::rc::Rc;
use crate::python::interop::{push, py_to_args, to_native};
use crate::reflection::registry::{TypeRegistry, WeakTypeRegistry};
use crate::types::object::{find_object_by_id, same_object, ObjectRef};
use crate::reflection::meta_method::MetaMethod;
use crate::types::callable::CallableRef;
use crate::types::value::Value;

fn object_registry(object: &ObjectRef) -> PyResult<TypeRegistry> {
    object
        .meta_class()
        .registry()
        .ok_or_else(|| PyRuntimeError::new_err("GOM type registry is not available"))
}

fn upgrade(registry: &WeakTypeRegistry) -> PyResult<TypeRegistry> {
    registry
        .upgrade()
        .ok_or_else(|| PyRuntimeError::new_err("GOM type registry is not available"))
}

/// Python handle to an object. Attributes are properties, then methods.
#[pyclass(unsendable, name = "GomObject")]
pub struct GomObject {
    pub object: ObjectRef,
}

impl GomObject {
    pub fn new(object: ObjectRef) -> Self {
        Self { object }
    }
}

#[pymethods]
impl GomObject {
    fn __getattr__(&self, py: Python<'_>, name: &str) -> PyResult<PyObject> {
        if self.object.has_property(name) {
            return push(py, &self.object.get_property(name)?);
        }
        let meta_class = self.object.meta_class();
        match meta_class.as_meta_class().and_then(|c| c.find_method(name)) {
            Some(method) => Ok(Py::new(py, GomRequest::new(self.object.clone(), method))?.into_py(py)),
            None => Err(PyAttributeError::new_err(format!("{}::{} : no such member", meta_class.name(), name))),
        }
    }

    fn __setattr__(&self, name: &str, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let meta_class = self.object.meta_class();
        let Some(prop) = meta_class.as_meta_class().and_then(|c| c.find_property(name)) else {
            return Err(PyAttributeError::new_err(format!("{}::{} : no such property", meta_class.name(), name)));
        };
        let registry = object_registry(&self.object)?;
        let expected = prop.meta_type(&registry);
        let value = to_native(value, expected.as_ref(), &registry)?;
        self.object.set_property(name, &value)?;
        Ok(())
    }

    fn __len__(&self) -> usize {
        self.object.get_nb_elements()
    }

    fn __getitem__(&self, py: Python<'_>, i: usize) -> PyResult<PyObject> {
        push(py, &self.object.get_element(i)?)
    }

    fn __setitem__(&self, i: usize, value: &Bound<'_, PyAny>) -> PyResult<()> {
        let registry = object_registry(&self.object)?;
        self.object.set_element(i, &to_native(value, None, &registry)?)?;
        Ok(())
    }

    fn __repr__(&self) -> String {
        self.object.string_id()
    }

    fn __richcmp__(&self, py: Python<'_>, other: &Bound<'_, PyAny>, op: CompareOp) -> PyObject {
        let same = other
            .downcast::<GomObject>()
            .is_ok_and(|o| same_object(&o.borrow().object, &self.object));
        match op {
            CompareOp::Eq => same.into_py(py),
            CompareOp::Ne => (!same).into_py(py),
            _ => py.NotImplemented(),
        }
    }
}

/// A method bound to an object, as seen from Python.
#[pyclass(unsendable, name = "GomRequest")]
pub struct GomRequest {
    pub object: ObjectRef,
    pub method: Rc<MetaMethod>,
}

impl GomRequest {
    pub fn new(object: ObjectRef, method: Rc<MetaMethod>) -> Self {
        Self { object, method }
    }
}

#[pymethods]
impl GomRequest {
    #[pyo3(signature = (*args, **kwargs))]
    fn __call__(
        &self,
        py: Python<'_>,
        args: &Bound<'_, PyTuple>,
        kwargs: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<PyObject> {
        let registry = object_registry(&self.object)?;
        let args = py_to_args(args, kwargs, Some(&self.method), &registry)?;
        match self.object.invoke_method(self.method.name(), &args) {
            Ok(result) => push(py, &result),
            Err(e) => Err(PyRuntimeError::new_err(format!(
                "GOM error while invoking {}::{} ({})",
                self.object.meta_class().name(),
                self.method.name(),
                e
            ))),
        }
    }

    fn __repr__(&self) -> String {
        format!("{}.{}", self.object.string_id(), self.method.name())
    }
}

/// Python handle to a callable.
#[pyclass(unsendable, name = "GomCallable")]
pub struct GomCallable {
    pub callable: CallableRef,
    registry: WeakTypeRegistry,
}

impl GomCallable {
    pub fn new(callable: CallableRef, registry: WeakTypeRegistry) -> Self {
        Self { callable, registry }
    }
}

#[pymethods]
impl GomCallable {
    #[pyo3(signature = (*args, **kwargs))]
    fn __call__(
        &self,
        py: Python<'_>,
        args: &Bound<'_, PyTuple>,
        kwargs: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<PyObject> {
        let registry = upgrade(&self.registry)?;
        let args = py_to_args(args, kwargs, None, &registry)?;
        let result = self.callable.invoke(&args)?;
        push(py, &result)
    }

    fn __repr__(&self) -> String {
        self.callable.describe()
    }
}

/// The `gom` helper bound in the interpreter globals.
#[pyclass(unsendable, name = "gom")]
pub struct GomHelper {
    registry: WeakTypeRegistry,
}

impl GomHelper {
    pub fn new(registry: WeakTypeRegistry) -> Self {
        Self { registry }
    }
}

#[pymethods]
impl GomHelper {
    /// gom.create("Point", x=1, y=2)
    #[pyo3(signature = (classname, **kwargs))]
    fn create(&self, py: Python<'_>, classname: &str, kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<GomObject> {
        let registry = upgrade(&self.registry)?;
        let meta_class = registry.meta_class(classname)?;
        let class = meta_class
            .as_meta_class()
            .ok_or_else(|| PyRuntimeError::new_err(format!("{classname} is not a class")))?;
        let args = py_to_args(&PyTuple::empty_bound(py), kwargs, None, &registry)?;
        Ok(GomObject::new(class.create(&args)?))
    }

    fn find_object(&self, id: u32) -> Option<GomObject> {
        find_object_by_id(id).map(GomObject::new)
    }

    fn resolve_meta_type(&self, name: &str) -> PyResult<Option<String>> {
        let registry = upgrade(&self.registry)?;
        Ok(registry.resolve_meta_type(name).map(|t| t.name().to_string()))
    }

    /// gom.connect(obj.signal, target.slot) or gom.connect(obj.signal, function)
    fn connect(&self, signal: &Bound<'_, GomRequest>, target: &Bound<'_, PyAny>) -> PyResult<()> {
        let registry = upgrade(&self.registry)?;
        let signal = signal.borrow();
        let source = signal.object.clone();
        let signal_name = signal.method.name();
        if let Ok(slot) = target.downcast::<GomRequest>() {
            let slot = slot.borrow();
            source.connect_signal_to_slot(signal_name, &slot.object, slot.method.name())?;
            return Ok(());
        }
        let Value::Callable(Some(callable)) = to_native(target, None, &registry)?.into_value() else {
            return Err(PyRuntimeError::new_err("connect target must be a slot or a callable"));
        };
        source.connect_signal_to_callable(signal_name, callable)?;
        Ok(())
    }
}
