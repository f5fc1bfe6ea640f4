// gom/src/types/connection.rs
use std::collections::BTreeSet;
use std::cell::{Cell, RefCell};
use crate::types::object::{ObjectRef, WeakObjectRef};
use crate::types::error::{GomError, GomResult};
use crate::types::callable::CallableRef;
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// Where a connection delivers a signal.
pub enum ConnectionTarget {
    /// A method of an object, looked up by name at each emission.
    Slot { target: WeakObjectRef, slot_name: String },
    Callable(CallableRef),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Removed,
}

/// Link from a signal of a source object to a slot or a callable, with
/// optional argument conditions and translations.
pub struct Connection {
    source: WeakObjectRef,
    signal_name: String,
    target: ConnectionTarget,
    conditions: RefCell<Vec<(String, String)>>,
    extra_args: RefCell<ArgList>,
    renamed_args: RefCell<Vec<(String, String)>>,
    discarded_args: RefCell<BTreeSet<String>>,
    state: Cell<ConnectionState>,
}

impl Connection {
    pub(crate) fn new(source: WeakObjectRef, signal_name: &str, target: ConnectionTarget) -> Self {
        Self {
            source,
            signal_name: signal_name.to_string(),
            target,
            conditions: RefCell::new(Vec::new()),
            extra_args: RefCell::new(ArgList::new()),
            renamed_args: RefCell::new(Vec::new()),
            discarded_args: RefCell::new(BTreeSet::new()),
            state: Cell::new(ConnectionState::Active),
        }
    }

    pub fn source(&self) -> Option<ObjectRef> {
        self.source.upgrade()
    }

    pub fn signal_name(&self) -> &str {
        &self.signal_name
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Only forwards emissions whose argument `name` satisfies `value`.
    /// `value` may start with `==` or `!=`; otherwise it must be equal.
    pub fn if_arg(&self, name: &str, value: &str) -> &Self {
        let mut conditions = self.conditions.borrow_mut();
        if conditions.iter().any(|(n, _)| n == name) {
            gom_err!("GOM", "Connection: duplicate condition on arg {}", name);
        } else {
            conditions.push((name.to_string(), value.to_string()));
        }
        self
    }

    /// Adds an argument to every forwarded emission.
    pub fn add_arg(&self, name: &str, value: Any) -> &Self {
        if !self.extra_args.borrow_mut().create_arg(name, value) {
            gom_err!("GOM", "Connection: duplicate added arg {}", name);
        }
        self
    }

    /// Forwards argument `name` as `new_name`.
    pub fn rename_arg(&self, name: &str, new_name: &str) -> &Self {
        let mut renamed = self.renamed_args.borrow_mut();
        if renamed.iter().any(|(n, _)| n == name) {
            gom_err!("GOM", "Connection: duplicate renamed arg {}", name);
        } else {
            renamed.push((name.to_string(), new_name.to_string()));
        }
        self
    }

    /// Does not forward argument `name`.
    pub fn discard_arg(&self, name: &str) -> &Self {
        self.discarded_args.borrow_mut().insert(name.to_string());
        self
    }

    /// Detaches from the source. A removed connection never fires again.
    pub fn remove(&self) {
        if self.state() == ConnectionState::Removed {
            return;
        }
        self.mark_removed();
        if let Some(source) = self.source.upgrade() {
            source.object_base().remove_connection(self);
        }
    }

    pub(crate) fn mark_removed(&self) {
        self.state.set(ConnectionState::Removed);
    }

    /// Compares an argument value with a condition.
    pub fn test_arg_condition(value: &str, condition: &str) -> bool {
        if let Some(rest) = condition.strip_prefix("==") {
            value == rest.trim_start()
        } else if let Some(rest) = condition.strip_prefix("!=") {
            value != rest.trim_start()
        } else {
            value == condition
        }
    }

    /// Whether every condition holds. A condition on an argument that is
    /// not there is logged and counts as satisfied.
    pub fn test_arg_conditions(&self, args: &ArgList) -> bool {
        for (name, condition) in self.conditions.borrow().iter() {
            match args.arg_as_string(name) {
                Some(value) => {
                    if !Self::test_arg_condition(&value, condition) {
                        return false;
                    }
                }
                None => {
                    gom_err!("Connection", "Condition on unexisting arg: {}{}", name, condition);
                }
            }
        }
        true
    }

    /// Discards, renames, then appends the added args (overwriting).
    pub fn translate_args(&self, args: &ArgList) -> ArgList {
        let discarded = self.discarded_args.borrow();
        let renamed = self.renamed_args.borrow();
        let mut result = ArgList::new();
        for (name, value) in args.iter() {
            if discarded.contains(name) {
                continue;
            }
            let name = renamed
                .iter()
                .find(|(from, _)| from == name)
                .map_or(name, |(_, to)| to.as_str());
            result.create_arg(name, value.clone());
        }
        result.append(&self.extra_args.borrow(), true);
        result
    }

    /// Forwards one emission. Emissions filtered out by a condition
    /// succeed with a null result.
    pub fn invoke(&self, args: &ArgList) -> GomResult<Any> {
        if self.state() == ConnectionState::Removed {
            return Err(GomError::Disconnected(self.signal_name.clone()));
        }
        if !self.test_arg_conditions(args) {
            return Ok(Any::null());
        }
        let args = self.translate_args(args);
        match &self.target {
            ConnectionTarget::Slot { target, slot_name } => {
                let Some(target) = target.upgrade() else {
                    gom_warn!("Connection", "Target of signal {} was destroyed", self.signal_name);
                    return Err(GomError::Disconnected(self.signal_name.clone()));
                };
                target.invoke_method(slot_name, &args)
            }
            ConnectionTarget::Callable(callable) => callable.invoke(&args),
        }
    }
}
