// gom/src/services/mod.rs
pub mod life_cycle;
pub mod serializer;
