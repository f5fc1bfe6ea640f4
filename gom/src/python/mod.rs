// gom/src/python/mod.rs
pub mod interop;
pub mod py_object;
pub mod python_callable;
pub mod python_interpreter;
