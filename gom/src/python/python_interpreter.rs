// gom/src/python/python_interpreter.rs
use pyo3::types::PyDict;
use pyo3::prelude::*;
use std::path::Path;
use std::fs;
use crate::interpreter::interpreter::{Interpreter, InterpreterHistory};
use crate::reflection::registry::{TypeRegistry, WeakTypeRegistry};
use crate::python::interop::{push, to_native, PYTHON_CHANNEL};
use crate::python::py_object::GomHelper;
use crate::types::error::GomResult;
use crate::types::any::Any;
use crate::*;

/// Python interpreter running in the `__main__` namespace, with a `gom`
/// helper to create objects and connect signals.
pub struct PythonInterpreter {
    globals: Py<PyDict>,
    registry: WeakTypeRegistry,
    history: InterpreterHistory,
}

impl PythonInterpreter {
    pub fn new(registry: &TypeRegistry) -> PyResult<Self> {
        let weak = registry.downgrade();
        let globals = Python::with_gil(|py| -> PyResult<Py<PyDict>> {
            let globals = py.import_bound("__main__")?.dict();
            globals.set_item("gom", Py::new(py, GomHelper::new(weak.clone()))?)?;
            Ok(globals.unbind())
        })?;
        Ok(Self { globals, registry: weak, history: InterpreterHistory::default() })
    }

    fn run(&self, code: &str, log: bool) -> bool {
        Python::with_gil(|py| match py.run_bound(code, Some(self.globals.bind(py)), None) {
            Ok(()) => true,
            Err(e) => {
                if log {
                    gom_err!(PYTHON_CHANNEL, "{}", e);
                }
                false
            }
        })
    }
}

impl Interpreter for PythonInterpreter {
    fn language(&self) -> &'static str {
        "Python"
    }

    fn filename_extension(&self) -> &'static str {
        "py"
    }

    fn registry(&self) -> GomResult<TypeRegistry> {
        self.registry.get()
    }

    fn execute(&self, command: &str, save_in_history: bool, log: bool) -> bool {
        let ok = self.run(command, log);
        if ok && save_in_history {
            self.history.push(command);
        }
        ok
    }

    fn execute_file(&self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(code) => self.run(&code, true),
            Err(e) => {
                gom_err!(PYTHON_CHANNEL, "Could not read {}: {}", path.display(), e);
                false
            }
        }
    }

    fn bind(&self, id: &str, value: &Any) -> bool {
        Python::with_gil(|py| {
            let result = push(py, value).and_then(|object| self.globals.bind(py).set_item(id, object));
            result.map_err(|e| gom_err!(PYTHON_CHANNEL, "Could not bind {}: {}", id, e)).is_ok()
        })
    }

    fn resolve(&self, id: &str) -> Any {
        let Ok(registry) = self.registry.get() else {
            return Any::null();
        };
        Python::with_gil(|py| {
            let found = self.globals.bind(py).get_item(id);
            match found {
                Ok(Some(object)) => to_native(&object, None, &registry).unwrap_or_else(|e| {
                    gom_err!(PYTHON_CHANNEL, "{}", e);
                    Any::null()
                }),
                _ => Any::null(),
            }
        })
    }

    fn eval(&self, expression: &str) -> Any {
        let Ok(registry) = self.registry.get() else {
            return Any::null();
        };
        Python::with_gil(|py| {
            let result = py
                .eval_bound(expression, Some(self.globals.bind(py)), None)
                .and_then(|object| to_native(&object, None, &registry));
            result.unwrap_or_else(|e| {
                gom_err!(PYTHON_CHANNEL, "{}", e);
                Any::null()
            })
        })
    }

    fn history(&self) -> &InterpreterHistory {
        &self.history
    }
}
