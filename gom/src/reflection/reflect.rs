// gom/src/reflection/reflect.rs
use crate::reflection::registry::TypeRegistry;
use crate::reflection::meta_type::MetaTypeRef;
use crate::reflection::meta_class::MetaClass;
use crate::types::error::GomResult;
use crate::*;

/// Native types that describe their own members.
/// Usually derived with `#[derive(Reflect)]`.
pub trait Reflect {
    /// Declares properties and methods on a freshly created class.
    fn declare_members(mclass: &MetaClass, registry: &TypeRegistry);
}

/// One native class to bind when a registry is created.
pub struct GomClassRegistry {
    pub class_name: &'static str,
    pub super_class_name: &'static str,
    pub register: fn(&TypeRegistry, &'static str, &'static str) -> GomResult<MetaTypeRef>,
}

inventory::collect!(GomClassRegistry);

/// Submits a native class, bound by every [`TypeRegistry::new`].
#[macro_export]
macro_rules! register_gom_class {
    ($ty:ty, $name:expr) => {
        $crate::register_gom_class!($ty, $name, "gom::Object");
    };
    ($ty:ty, $name:expr, $super:expr) => {
        $crate::inventory::submit! {
            $crate::reflection::reflect::GomClassRegistry {
                class_name: $name,
                super_class_name: $super,
                register: |registry, name, super_name| registry.bind_native_class::<$ty>(name, super_name),
            }
        }
    };
}

/// Binds every submitted class. Super classes are bound before their
/// subclasses whatever the submission order.
pub fn register_native_classes(registry: &TypeRegistry) {
    let mut pending: Vec<&GomClassRegistry> = inventory::iter::<GomClassRegistry>.into_iter().collect();
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|entry| {
            if registry.resolve_meta_class(entry.super_class_name).is_none() {
                return true;
            }
            if let Err(e) = (entry.register)(registry, entry.class_name, entry.super_class_name) {
                gom_err!("GOM", "Could not register class {} ({})", entry.class_name, e);
            }
            false
        });
        if pending.len() == before {
            for entry in pending {
                gom_err!(
                    "GOM",
                    "Could not register class {} : no such super class {}",
                    entry.class_name,
                    entry.super_class_name
                );
            }
            break;
        }
    }
}
