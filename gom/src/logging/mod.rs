// gom/src/logging/mod.rs
pub mod logging;
