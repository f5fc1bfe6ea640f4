// gom/src/types/mod.rs
pub mod any;
pub mod arg_list;
pub mod callable;
pub mod commands;
pub mod connection;
pub mod error;
pub mod object;
pub mod value;
