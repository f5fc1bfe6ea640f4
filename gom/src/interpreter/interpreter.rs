// gom/src/interpreter/interpreter.rs
use std::cell::RefCell;
use std::path::Path;
use std::io::Write;
use std::fs;
use crate::reflection::registry::TypeRegistry;
use crate::types::error::{GomError, GomResult};
use crate::types::object::ObjectRef;
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// Commands executed by an interpreter, oldest first.
#[derive(Default)]
pub struct InterpreterHistory {
    entries: RefCell<Vec<String>>,
}

impl InterpreterHistory {
    pub fn push(&self, command: &str) {
        self.entries.borrow_mut().push(command.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Appends the history to `path`, one command per line.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        for entry in self.entries.borrow().iter() {
            writeln!(file, "{entry}")?;
        }
        Ok(())
    }
}

/// An embedded scripting language bound to a type registry.
pub trait Interpreter {
    /// Name of the language, e.g. `"Lua"`.
    fn language(&self) -> &'static str;

    /// Extension of script files, without the dot.
    fn filename_extension(&self) -> &'static str;

    fn registry(&self) -> GomResult<TypeRegistry>;

    /// Runs a chunk of code. Errors are logged when `log` is set.
    fn execute(&self, command: &str, save_in_history: bool, log: bool) -> bool;

    fn execute_file(&self, path: &Path) -> bool;

    /// Binds a global variable.
    fn bind(&self, id: &str, value: &Any) -> bool;

    /// Value of a global variable, null if unbound.
    fn resolve(&self, id: &str) -> Any;

    /// Evaluates an expression.
    fn eval(&self, expression: &str) -> Any;

    fn history(&self) -> &InterpreterHistory;

    fn resolve_object(&self, id: &str) -> Option<ObjectRef> {
        self.resolve(id).as_object()
    }

    fn bind_object(&self, id: &str, object: &ObjectRef) -> bool {
        self.bind(id, &Any::from_object(object))
    }

    /// Instantiates a class by name.
    fn create(&self, class_name: &str, args: &ArgList) -> GomResult<ObjectRef> {
        let mclass = self.registry()?.meta_class(class_name)?;
        match mclass.as_meta_class() {
            Some(class) => class.create(args),
            None => Err(GomError::NotAClass(class_name.to_string())),
        }
    }

    fn save_history(&self, path: &Path) -> bool {
        match self.history().save(path) {
            Ok(()) => true,
            Err(e) => {
                gom_err!("GOM", "Could not save {} history to {} ({})", self.language(), path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_appended_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("history.txt");
        let history = InterpreterHistory::default();
        history.push("a = 1");
        history.push("print(a)");
        history.save(&path).unwrap();
        history.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["a = 1", "print(a)", "a = 1", "print(a)"]);
        assert_eq!(history.len(), 2);
    }
}
