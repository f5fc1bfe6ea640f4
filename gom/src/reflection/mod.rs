// gom/src/reflection/mod.rs
pub mod dynamic;
pub mod meta_arg;
pub mod meta_builtin;
pub mod meta_class;
pub mod meta_enum;
pub mod meta_member;
pub mod meta_method;
pub mod meta_property;
pub mod meta_type;
pub mod reflect;
pub mod registry;
