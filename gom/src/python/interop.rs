// gom/src/python/interop.rs
use glam::{DVec2, DVec3, DVec4};
use pyo3::exceptions::PyRuntimeError;
use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyLong, PyString, PyTuple};
use pyo3::prelude::*;
use std::rc::Rc;
use crate::python::py_object::{GomCallable, GomObject, GomRequest};
use crate::python::python_callable::PythonCallable;
use crate::services::serializer::VectorValue;
use crate::reflection::registry::TypeRegistry;
use crate::reflection::meta_method::MetaMethod;
use crate::reflection::meta_type::MetaTypeRef;
use crate::types::callable::{CallableRef, Request};
use crate::types::error::GomError;
use crate::types::arg_list::ArgList;
use crate::types::value::Value;
use crate::types::any::Any;
use crate::*;

/// Channel of the Python bridge.
pub const PYTHON_CHANNEL: &str = "Python";

impl From<GomError> for PyErr {
    fn from(error: GomError) -> Self {
        PyRuntimeError::new_err(error.to_string())
    }
}

/// Converts a GOM value to a Python object.
pub fn push(py: Python<'_>, value: &Any) -> PyResult<PyObject> {
    let Some(meta_type) = value.meta_type() else {
        return Ok(py.None());
    };
    if meta_type.as_meta_enum().is_some() {
        return Ok(value.as_string().into_py(py));
    }
    Ok(match value.value() {
        Value::Null | Value::Object(None) | Value::Callable(None) => py.None(),
        Value::Bool(b) => b.into_py(py),
        Value::Int(i) => i.into_py(py),
        Value::UInt(u) => u.into_py(py),
        Value::Long(l) => l.into_py(py),
        Value::ULong(u) => u.into_py(py),
        Value::Size(s) => s.into_py(py),
        Value::Float(f) => (*f as f64).into_py(py),
        Value::Double(d) => d.into_py(py),
        Value::Str(s) => s.into_py(py),
        Value::Object(Some(object)) => Py::new(py, GomObject::new(object.clone()))?.into_py(py),
        Value::Callable(Some(callable)) => {
            let registry = meta_type.registry().map(|r| r.downgrade()).unwrap_or_default();
            Py::new(py, GomCallable::new(callable.clone(), registry))?.into_py(py)
        }
        Value::ArgList(args) => args_to_dict(py, args)?.into_py(py),
        Value::Blob(_) => {
            let components = value
                .get_value::<DVec2>()
                .map(|v| v.components())
                .or_else(|| value.get_value::<DVec3>().map(|v| v.components()))
                .or_else(|| value.get_value::<DVec4>().map(|v| v.components()));
            match components {
                Some(components) => PyList::new_bound(py, components).into_py(py),
                None => value.as_string().into_py(py),
            }
        }
    })
}

/// A dict holding the args by name.
pub fn args_to_dict<'py>(py: Python<'py>, args: &ArgList) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    for (name, value) in args.iter() {
        dict.set_item(name, push(py, value)?)?;
    }
    Ok(dict)
}

/// Converts a Python object to a GOM value, typed as `expected` when the
/// conversion allows it.
pub fn to_native(object: &Bound<'_, PyAny>, expected: Option<&MetaTypeRef>, registry: &TypeRegistry) -> PyResult<Any> {
    let any = if object.is_none() {
        Any::null()
    } else if object.is_instance_of::<PyBool>() {
        registry.any(object.extract::<bool>()?)
    } else if object.is_instance_of::<PyLong>() {
        let i = object.extract::<i64>()?;
        match i32::try_from(i) {
            Ok(i) => registry.any(i),
            Err(_) => registry.any(i),
        }
    } else if object.is_instance_of::<PyFloat>() {
        registry.any(object.extract::<f64>()?)
    } else if object.is_instance_of::<PyString>() {
        registry.any(object.extract::<String>()?)
    } else if let Ok(gom_object) = object.downcast::<GomObject>() {
        Any::from_object(&gom_object.borrow().object)
    } else if let Ok(request) = object.downcast::<GomRequest>() {
        let request = request.borrow();
        let callable: CallableRef = Rc::new(Request::new(request.object.clone(), request.method.clone()));
        Any::from_callable(registry, callable)
    } else if let Ok(callable) = object.downcast::<GomCallable>() {
        Any::from_callable(registry, callable.borrow().callable.clone())
    } else if let Ok(dict) = object.downcast::<PyDict>() {
        registry.any(dict_to_args(dict, registry)?)
    } else if object.is_instance_of::<PyList>() || object.is_instance_of::<PyTuple>() {
        match expected.and_then(|t| sequence_to_vector(object, t, registry)) {
            Some(vector) => vector,
            None => {
                let mut args = ArgList::new();
                for item in object.iter()? {
                    args.create_unnamed_arg(to_native(&item?, None, registry)?);
                }
                registry.any(args)
            }
        }
    } else if object.is_callable() {
        let callable: CallableRef = Rc::new(PythonCallable::new(object.clone().unbind(), registry.downgrade()));
        Any::from_callable(registry, callable)
    } else {
        let text = object.str()?.to_string();
        gom_warn!(PYTHON_CHANNEL, "Passing {} to GOM as a string", text);
        registry.any(text)
    };

    match expected {
        Some(expected) if !any.is_null() => {
            if any.meta_type().is_some_and(|own| Rc::ptr_eq(own, expected)) {
                return Ok(any);
            }
            Ok(any.converted_to(expected).unwrap_or(any))
        }
        _ => Ok(any),
    }
}

fn vector<V: VectorValue>(registry: &TypeRegistry, components: &[f64]) -> Option<Any> {
    (components.len() == V::DIMENSION).then(|| registry.any(V::from_components(components)))
}

fn sequence_to_vector(object: &Bound<'_, PyAny>, expected: &MetaTypeRef, registry: &TypeRegistry) -> Option<Any> {
    let components = object.extract::<Vec<f64>>().ok()?;
    match expected.name() {
        "vec2" => vector::<DVec2>(registry, &components),
        "vec3" => vector::<DVec3>(registry, &components),
        "vec4" => vector::<DVec4>(registry, &components),
        _ => None,
    }
}

/// Named args from a dict with string keys.
pub fn dict_to_args(dict: &Bound<'_, PyDict>, registry: &TypeRegistry) -> PyResult<ArgList> {
    let mut args = ArgList::new();
    for (key, value) in dict.iter() {
        let name = key.extract::<String>()?;
        args.create_arg(&name, to_native(&value, None, registry)?);
    }
    Ok(args)
}

/// Arguments of a call from Python. Keyword arguments make a named call,
/// positional arguments an unnamed one.
pub fn py_to_args(
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
    method: Option<&MetaMethod>,
    registry: &TypeRegistry,
) -> PyResult<ArgList> {
    let mut result = ArgList::new();
    if let Some(kwargs) = kwargs.filter(|k| !k.is_empty()) {
        for (key, value) in kwargs.iter() {
            let name = key.extract::<String>()?;
            let expected = method
                .and_then(|m| m.find_arg(&name))
                .and_then(|a| registry.resolve_meta_type(a.type_name()));
            result.create_arg(&name, to_native(&value, expected.as_ref(), registry)?);
        }
        return Ok(result);
    }
    for (i, value) in args.iter().enumerate() {
        let expected = method
            .and_then(|m| m.ith_arg(i))
            .and_then(|a| registry.resolve_meta_type(a.type_name()));
        result.create_unnamed_arg(to_native(&value, expected.as_ref(), registry)?);
    }
    Ok(result)
}
