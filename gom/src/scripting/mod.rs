// gom/src/scripting/mod.rs
pub mod interop;
pub mod lua_callable;
pub mod lua_constants;
pub mod lua_interpreter;
pub mod lua_object;
pub mod modules;
