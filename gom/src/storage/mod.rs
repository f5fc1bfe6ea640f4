// gom/src/storage/mod.rs
pub mod gom_config;
