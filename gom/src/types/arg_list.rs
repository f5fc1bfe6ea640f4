// gom/src/types/arg_list.rs
use std::fmt;
use crate::types::error::{GomError, GomResult};
use crate::types::value::GomType;
use crate::types::any::Any;
use crate::*;

/// Ordered list of named values passed to methods, signals and callables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgList {
    args: Vec<(String, Any)>,
}

/// Name given to the `i`-th unnamed argument.
pub fn unnamed_arg_name(i: usize) -> String {
    format!("arg#{i}")
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nb_args(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn clear(&mut self) {
        self.args.clear();
    }

    /// True iff the list is not empty and every name is `arg#<i>` in order.
    pub fn has_unnamed_args(&self) -> bool {
        !self.args.is_empty()
            && self
                .args
                .iter()
                .enumerate()
                .all(|(i, (name, _))| *name == unnamed_arg_name(i))
    }

    pub fn find_arg_index(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|(n, _)| n == name)
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.find_arg_index(name).is_some()
    }

    pub fn get_arg(&self, name: &str) -> Option<&Any> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Text form of an argument, as used by connection conditions.
    pub fn arg_as_string(&self, name: &str) -> Option<String> {
        self.get_arg(name).map(Any::as_string)
    }

    /// Typed argument, with the lenient conversions of [`Any::convert_value`].
    pub fn get_arg_value<T: GomType>(&self, name: &str) -> GomResult<T> {
        let Some(i) = self.find_arg_index(name) else {
            return Err(GomError::MissingArgument { method: String::new(), arg: name.to_string() });
        };
        self.args[i]
            .1
            .convert_value::<T>()
            .ok_or_else(|| self.arg_type_error(i, T::typeid_name()))
    }

    pub fn ith_arg_name(&self, i: usize) -> &str {
        &self.args[i].0
    }

    pub fn ith_arg_value(&self, i: usize) -> &Any {
        &self.args[i].1
    }

    pub fn ith_arg_value_mut(&mut self, i: usize) -> &mut Any {
        &mut self.args[i].1
    }

    /// Appends an argument. An existing name is left untouched.
    pub fn create_arg(&mut self, name: &str, value: Any) -> bool {
        if self.has_arg(name) {
            gom_err!("GOM", "ArgList: duplicate arg {}", name);
            return false;
        }
        self.args.push((name.to_string(), value));
        true
    }

    /// Appends an argument named `arg#<i>`.
    pub fn create_unnamed_arg(&mut self, value: Any) {
        let name = unnamed_arg_name(self.args.len());
        self.args.push((name, value));
    }

    /// Replaces an argument, or appends it if absent.
    pub fn set_arg(&mut self, name: &str, value: Any) {
        match self.args.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.args.push((name.to_string(), value)),
        }
    }

    pub fn delete_ith_arg(&mut self, i: usize) {
        if i < self.args.len() {
            self.args.remove(i);
        }
    }

    /// Removes an argument by name.
    pub fn delete_arg(&mut self, name: &str) -> bool {
        match self.find_arg_index(name) {
            Some(i) => {
                self.args.remove(i);
                true
            }
            None => false,
        }
    }

    /// Appends the `i`-th argument of `rhs`. New names are pushed; existing
    /// names are replaced only when `overwrite` is set.
    pub fn append_ith_arg(&mut self, rhs: &ArgList, i: usize, overwrite: bool) {
        let (name, value) = &rhs.args[i];
        match self.find_arg_index(name) {
            None => self.args.push((name.clone(), value.clone())),
            Some(j) if overwrite => self.args[j].1 = value.clone(),
            Some(_) => {}
        }
    }

    /// Appends every argument of `rhs`, see [`append_ith_arg`](Self::append_ith_arg).
    pub fn append(&mut self, rhs: &ArgList, overwrite: bool) {
        for i in 0..rhs.nb_args() {
            self.append_ith_arg(rhs, i, overwrite);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Any)> {
        self.args.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// `(name:value name:value )`.
    pub fn serialize(&self) -> String {
        let mut out = String::from("(");
        for (name, value) in &self.args {
            out.push_str(name);
            out.push(':');
            out.push_str(&value.as_string());
            out.push(' ');
        }
        out.push(')');
        out
    }

    /// Logs a type mismatch on argument `i` and builds the error.
    pub fn arg_type_error(&self, i: usize, expected_typeid_name: &str) -> GomError {
        let (name, value) = &self.args[i];
        let actual = match value.meta_type() {
            None => "(null)".to_string(),
            Some(t) => t.name().to_string(),
        };
        let expected = value
            .meta_type()
            .and_then(|t| t.registry())
            .and_then(|r| r.resolve_meta_type_by_typeid_name(expected_typeid_name))
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| format!("(unknown: {expected_typeid_name})"));

        gom_err!(
            "GOM",
            "Arg type error: i = {} name = {} type = {} expected type = {}",
            i,
            name,
            actual,
            expected
        );
        gom_err!("GOM", "Arglist = {}", self);
        GomError::ArgTypeError { name: name.clone(), expected, actual }
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromIterator<(String, Any)> for ArgList {
    fn from_iter<I: IntoIterator<Item = (String, Any)>>(iter: I) -> Self {
        let mut args = ArgList::new();
        for (name, value) in iter {
            args.set_arg(&name, value);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::registry::TypeRegistry;
    use proptest::prelude::*;

    fn named(registry: &TypeRegistry, pairs: &[(&str, i32)]) -> ArgList {
        let mut args = ArgList::new();
        for (n, v) in pairs {
            args.create_arg(n, registry.any(*v));
        }
        args
    }

    #[test]
    fn unnamed_args_follow_the_pattern() {
        let registry = TypeRegistry::new();
        let mut args = ArgList::new();
        assert!(!args.has_unnamed_args());

        args.create_unnamed_arg(registry.any(1));
        args.create_unnamed_arg(registry.any(2));
        assert!(args.has_unnamed_args());
        assert_eq!(args.ith_arg_name(1), "arg#1");

        args.create_arg("x", registry.any(3));
        assert!(!args.has_unnamed_args());
    }

    #[test]
    fn duplicates_are_refused_by_create_arg() {
        let registry = TypeRegistry::new();
        let mut args = named(&registry, &[("x", 1)]);
        assert!(!args.create_arg("x", registry.any(2)));
        assert_eq!(args.get_arg_value::<i32>("x").unwrap(), 1);
        args.set_arg("x", registry.any(2));
        assert_eq!(args.get_arg_value::<i32>("x").unwrap(), 2);
    }

    #[test]
    fn serialize_writes_names_and_values() {
        let registry = TypeRegistry::new();
        let mut args = named(&registry, &[("x", 1)]);
        args.create_arg("name", registry.any("foo".to_string()));
        assert_eq!(args.serialize(), "(x:1 name:foo )");
    }

    #[test]
    fn typed_access_converts_and_reports() {
        let registry = TypeRegistry::new();
        let mut args = named(&registry, &[("n", 3)]);
        args.create_arg("s", registry.any("2.5".to_string()));
        args.create_arg("flag", registry.any(true));

        assert_eq!(args.get_arg_value::<f64>("n").unwrap(), 3.0);
        assert_eq!(args.get_arg_value::<f64>("s").unwrap(), 2.5);
        assert!(matches!(args.get_arg_value::<i32>("flag"), Err(GomError::ArgTypeError { .. })));
        assert!(matches!(args.get_arg_value::<i32>("nope"), Err(GomError::MissingArgument { .. })));
    }

    #[test]
    fn delete_removes_by_position() {
        let registry = TypeRegistry::new();
        let mut args = named(&registry, &[("a", 1), ("b", 2), ("c", 3)]);
        args.delete_ith_arg(1);
        assert_eq!(args.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(args.delete_arg("c"));
        assert_eq!(args.nb_args(), 1);
    }

    fn pairs() -> impl Strategy<Value = Vec<(String, i32)>> {
        prop::collection::vec(("[a-e]", any::<i32>()), 0..8)
    }

    proptest! {
        #[test]
        fn append_respects_overwrite(a in pairs(), b in pairs(), overwrite in any::<bool>()) {
            let registry = TypeRegistry::new();
            let build = |pairs: &Vec<(String, i32)>| {
                let mut args = ArgList::new();
                for (n, v) in pairs {
                    args.set_arg(n, registry.any(*v));
                }
                args
            };
            let lhs = build(&a);
            let rhs = build(&b);
            let mut result = lhs.clone();
            result.append(&rhs, overwrite);

            for (name, value) in rhs.iter() {
                let got = result.get_arg(name).unwrap();
                if overwrite || !lhs.has_arg(name) {
                    prop_assert_eq!(got, value);
                } else {
                    prop_assert_eq!(got, lhs.get_arg(name).unwrap());
                }
            }
            for (name, value) in lhs.iter() {
                if !rhs.has_arg(name) {
                    prop_assert_eq!(result.get_arg(name).unwrap(), value);
                }
            }

            // Existing names keep their place, new ones follow in rhs order.
            let mut expected: Vec<&str> = lhs.iter().map(|(n, _)| n).collect();
            expected.extend(rhs.iter().map(|(n, _)| n).filter(|n| !lhs.has_arg(n)));
            let names: Vec<&str> = result.iter().map(|(n, _)| n).collect();
            prop_assert_eq!(names, expected);
        }
    }
}
