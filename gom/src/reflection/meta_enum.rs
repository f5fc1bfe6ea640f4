// gom/src/reflection/meta_enum.rs
use std::cell::RefCell;

/// Ordered `(name, value)` pairs of an enum type.
#[derive(Debug, Default)]
pub struct MetaEnum {
    values: RefCell<Vec<(String, i32)>>,
}

impl MetaEnum {
    pub fn new(values: &[(&str, i32)]) -> Self {
        let meta_enum = Self::default();
        for (name, value) in values {
            meta_enum.add_value(name, *value);
        }
        meta_enum
    }

    pub fn add_value(&self, name: &str, value: i32) {
        self.values.borrow_mut().push((name.to_string(), value));
    }

    pub fn nb_values(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn ith_value_name(&self, i: usize) -> Option<String> {
        self.values.borrow().get(i).map(|(n, _)| n.clone())
    }

    pub fn ith_value(&self, i: usize) -> Option<i32> {
        self.values.borrow().get(i).map(|(_, v)| *v)
    }

    pub fn has_value_name(&self, name: &str) -> bool {
        self.get_value_by_name(name).is_some()
    }

    pub fn has_value(&self, value: i32) -> bool {
        self.values.borrow().iter().any(|(_, v)| *v == value)
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<i32> {
        self.values
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// First name bound to a value.
    pub fn get_name_by_value(&self, value: i32) -> Option<String> {
        self.values
            .borrow()
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.clone())
    }
}
