// gom/src/services/life_cycle.rs
use crate::types::value::{GomType, Value};

/// How values of a meta type are sized and default-constructed.
#[derive(Clone, Copy)]
pub struct LifeCycle {
    object_size: usize,
    construct: fn() -> Value,
}

impl LifeCycle {
    pub fn new(object_size: usize, construct: fn() -> Value) -> Self {
        Self { object_size, construct }
    }

    /// Life cycle of a native type with a default value.
    pub fn of<T: GomType + Default>() -> Self {
        Self {
            object_size: std::mem::size_of::<T>(),
            construct: || T::default().into_value(),
        }
    }

    /// Life cycle of a pointer type: a null pointer by default.
    pub fn pointer() -> Self {
        Self {
            object_size: std::mem::size_of::<usize>(),
            construct: || Value::Object(None),
        }
    }

    /// Life cycle of types that have no values of their own.
    pub fn empty() -> Self {
        Self { object_size: 0, construct: || Value::Null }
    }

    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// A freshly default-constructed value.
    pub fn construct(&self) -> Value {
        (self.construct)()
    }
}
