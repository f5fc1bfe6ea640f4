// gom/src/lib.rs
extern crate self as gom;

pub mod interpreter;
pub mod logging;
pub mod reflection;
pub mod scripting;
pub mod services;
pub mod storage;
pub mod types;
#[cfg(feature = "python")]
pub mod python;

#[doc(hidden)]
pub use inventory;
#[doc(hidden)]
pub use log;

pub use gom_derive::{GomObject, Reflect};

pub use crate::reflection::meta_class::MetaClass;
pub use crate::reflection::meta_type::{MetaType, MetaTypeRef};
pub use crate::reflection::registry::{TypeRegistry, WeakTypeRegistry};
pub use crate::types::any::Any;
pub use crate::types::arg_list::ArgList;
pub use crate::types::callable::{Callable, CallableRef};
pub use crate::types::error::{GomError, GomResult};
pub use crate::types::object::{make_object, Object, ObjectBase, ObjectCore, ObjectRef};
pub use crate::types::value::{GomType, Value};
