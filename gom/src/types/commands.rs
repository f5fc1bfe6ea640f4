// gom/src/types/commands.rs
use std::cell::{Cell, RefCell};
use std::time::Instant;
use crate::reflection::registry::COMMANDS_CLASS;
use crate::reflection::meta_method::MetaMethod;
use crate::types::error::{GomError, GomResult};
use crate::types::arg_list::ArgList;
use crate::types::object::Object;
use crate::types::any::Any;
use crate::*;

/// Argument that lets a command run while another one is running.
pub const OVERRIDE_LOCK_ARG: &str = "override_lock";
/// Argument set by user interfaces; `true` records the command in the history.
pub const INVOKED_FROM_GUI_ARG: &str = "_invoked_from_gui";
/// Methods with this attribute are not timed.
pub const CONTINUOUS_UPDATE_ATTRIBUTE: &str = "continuous_update";

thread_local! {
    static COMMAND_IS_RUNNING: Cell<bool> = const { Cell::new(false) };
    static COMMAND_HISTORY: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Whether a command is running on this thread.
pub fn command_is_running() -> bool {
    COMMAND_IS_RUNNING.with(Cell::get)
}

/// Commands recorded from user interfaces, oldest first.
pub fn command_history() -> Vec<String> {
    COMMAND_HISTORY.with(|history| history.borrow().clone())
}

pub fn clear_command_history() {
    COMMAND_HISTORY.with(|history| history.borrow_mut().clear());
}

// Marks a command as running for the lifetime of the scope.
struct CommandScope {
    previous: bool,
}

impl CommandScope {
    fn enter() -> Self {
        let previous = COMMAND_IS_RUNNING.with(|running| running.replace(true));
        Self { previous }
    }
}

impl Drop for CommandScope {
    fn drop(&mut self) {
        let previous = self.previous;
        COMMAND_IS_RUNNING.with(|running| running.set(previous));
    }
}

/// Whether `method` was declared by a subclass of `gom::Commands`.
pub fn is_command(method: &MetaMethod, target: &dyn Object) -> bool {
    target
        .meta_class()
        .registry()
        .and_then(|registry| registry.resolve_meta_class(method.container_name()))
        .and_then(|container| container.as_meta_class().map(|c| c.is_a(COMMANDS_CLASS)))
        .unwrap_or(false)
}

/// Invokes a command under the guard.
///
/// A command cannot start while another one runs, unless its args hold
/// `override_lock`. Args starting with `_` are stripped before the call.
pub fn invoke_command(target: &dyn Object, method: &MetaMethod, args: &ArgList) -> GomResult<Any> {
    if command_is_running() && !args.has_arg(OVERRIDE_LOCK_ARG) {
        gom_warn!(
            "Commands",
            "Tried to invoke command {} from locked Commands class",
            method.qualified_name()
        );
        return Err(GomError::CommandLocked(method.qualified_name()));
    }

    let _scope = CommandScope::enter();

    let mut stripped = ArgList::new();
    let mut invoked_from_gui = false;
    for (name, value) in args.iter() {
        if name == INVOKED_FROM_GUI_ARG {
            invoked_from_gui = value.as_string() == "true";
        }
        if !name.starts_with('_') {
            stripped.create_arg(name, value.clone());
        }
    }

    if invoked_from_gui {
        let line = format!("{}.{}{}", target.meta_class().name(), method.name(), stripped);
        COMMAND_HISTORY.with(|history| history.borrow_mut().push(line));
    }

    let start = Instant::now();
    let result = method.invoke(target, &stripped);
    if !method.has_custom_attribute(CONTINUOUS_UPDATE_ATTRIBUTE) {
        log::debug!(
            target: "timings",
            "{} : {:.3} s",
            method.qualified_name(),
            start.elapsed().as_secs_f64()
        );
    }
    result
}
