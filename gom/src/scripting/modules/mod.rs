// gom/src/scripting/modules/mod.rs
pub mod gom_module;
pub mod log_module;
pub mod lua_module;
