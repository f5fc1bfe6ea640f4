// gom/src/interpreter/mod.rs
pub mod interpreter;
