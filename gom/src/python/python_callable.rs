// gom/src/python/python_callable.rs
use pyo3::types::PyTuple;
use pyo3::prelude::*;
use crate::python::interop::{args_to_dict, push, to_native, PYTHON_CHANNEL};
use crate::reflection::meta_property::SETTER_ARG;
use crate::reflection::registry::WeakTypeRegistry;
use crate::types::error::{GomError, GomResult};
use crate::types::callable::Callable;
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// A Python callable invoked from Rust.
///
/// Unnamed args, or a single `value` arg, are passed positionally. Other
/// named args are passed as one dict.
pub struct PythonCallable {
    function: Py<PyAny>,
    registry: WeakTypeRegistry,
}

impl PythonCallable {
    pub fn new(function: Py<PyAny>, registry: WeakTypeRegistry) -> Self {
        Self { function, registry }
    }
}

impl Callable for PythonCallable {
    fn invoke(&self, args: &ArgList) -> GomResult<Any> {
        let registry = self.registry.get()?;
        Python::with_gil(|py| {
            let function = self.function.bind(py);
            let positional = args.is_empty()
                || args.has_unnamed_args()
                || (args.nb_args() == 1 && args.ith_arg_name(0) == SETTER_ARG);
            let result = if positional {
                let values = args
                    .iter()
                    .map(|(_, value)| push(py, value))
                    .collect::<PyResult<Vec<PyObject>>>()?;
                function.call1(PyTuple::new_bound(py, values))?
            } else {
                function.call1((args_to_dict(py, args)?,))?
            };
            to_native(&result, None, &registry)
        })
        .map_err(|e: PyErr| {
            gom_err!(PYTHON_CHANNEL, "{}", e);
            GomError::script("Python", e.to_string())
        })
    }

    fn describe(&self) -> String {
        "Python function".to_string()
    }
}
