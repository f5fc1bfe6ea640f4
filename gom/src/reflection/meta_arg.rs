// gom/src/reflection/meta_arg.rs
use crate::reflection::meta_type::CustomAttributes;
use crate::types::any::Any;

/// One declared argument of a method.
#[derive(Clone, Debug, Default)]
pub struct MetaArg {
    name: String,
    type_name: String,
    default_value: Any,
    attributes: CustomAttributes,
}

impl MetaArg {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_default(name: &str, type_name: &str, default_value: Any) -> Self {
        Self { default_value, ..Self::new(name, type_name) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn has_default_value(&self) -> bool {
        !self.default_value.is_null()
    }

    pub fn default_value(&self) -> &Any {
        &self.default_value
    }

    pub fn set_default_value(&mut self, value: Any) {
        self.default_value = value;
    }

    pub fn attributes(&self) -> &CustomAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut CustomAttributes {
        &mut self.attributes
    }

    pub(crate) fn clear_default_value(&mut self) {
        self.default_value.reset();
    }
}
