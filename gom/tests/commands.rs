// gom/tests/commands.rs
use std::cell::RefCell;
use std::rc::Rc;
use gom::types::commands::{clear_command_history, command_history, command_is_running, INVOKED_FROM_GUI_ARG, OVERRIDE_LOCK_ARG};
use gom::reflection::meta_type::MetaTypeRef;
use gom::types::callable::NativeCallable;
use gom::types::error::GomError;
use gom::*;

type Results = Rc<RefCell<Vec<GomResult<Any>>>>;

// Commands with a `smooth` command that records the args it gets, and an
// `outer` command that runs `smooth` while it is itself running.
fn mesh_commands(registry: &TypeRegistry, seen: &Rc<RefCell<Vec<String>>>, nested: &Results) -> MetaTypeRef {
    let mclass = registry.create_dynamic_class("MeshCommands", Some("gom::Commands"), false).unwrap();
    let class = mclass.as_meta_class().unwrap();

    let seen = seen.clone();
    class
        .add_slot(
            "smooth",
            Some(NativeCallable::new_ref("smooth", move |args| {
                let names = args
                    .iter()
                    .map(|(name, _)| name)
                    .filter(|name| *name != "self" && *name != "method")
                    .collect::<Vec<_>>()
                    .join(",");
                seen.borrow_mut().push(format!("running={} args={}", command_is_running(), names));
                Ok(Any::null())
            })),
            "void",
        )
        .unwrap();

    let nested = nested.clone();
    class
        .add_slot(
            "outer",
            Some(NativeCallable::new_ref("outer", move |args| {
                let this = args.get_arg("self").and_then(Any::as_object).unwrap();
                let registry = this.meta_class().registry().unwrap();
                let mut inner = ArgList::new();
                inner.create_arg("iterations", registry.any(2i32));
                let refused = this.invoke_method("smooth", &inner);
                inner.create_arg(OVERRIDE_LOCK_ARG, registry.any(true));
                let allowed = this.invoke_method("smooth", &inner);
                nested.borrow_mut().extend([refused, allowed]);
                Ok(Any::null())
            })),
            "void",
        )
        .unwrap();

    class.add_constructor(None).unwrap();
    mclass
}

fn named(registry: &TypeRegistry, name: &str) -> ArgList {
    let mut args = ArgList::new();
    args.create_arg(name, registry.any(3i32));
    args
}

#[test]
fn command_runs_under_the_guard() {
    let registry = TypeRegistry::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mclass = mesh_commands(&registry, &seen, &Results::default());
    let commands = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();

    commands.invoke_method("smooth", &named(&registry, "iterations")).unwrap();
    assert_eq!(*seen.borrow(), vec!["running=true args=iterations"]);
    assert!(!command_is_running());
}

#[test]
fn nested_command_needs_override_lock() {
    let registry = TypeRegistry::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let nested = Results::default();
    let mclass = mesh_commands(&registry, &seen, &nested);
    let commands = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();

    commands.invoke_method("outer", &ArgList::new()).unwrap();

    let nested = nested.borrow();
    assert!(matches!(nested[0], Err(GomError::CommandLocked(_))));
    assert!(nested[1].is_ok());
    assert_eq!(*seen.borrow(), vec!["running=true args=iterations,override_lock"]);
    assert!(!command_is_running());
}

#[test]
fn underscore_args_are_stripped() {
    let registry = TypeRegistry::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mclass = mesh_commands(&registry, &seen, &Results::default());
    let commands = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();

    let mut args = named(&registry, "iterations");
    args.create_arg("_internal", registry.any(1i32));
    commands.invoke_method("smooth", &args).unwrap();
    assert_eq!(*seen.borrow(), vec!["running=true args=iterations"]);
}

#[test]
fn gui_invocations_are_recorded() {
    let registry = TypeRegistry::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mclass = mesh_commands(&registry, &seen, &Results::default());
    let commands = mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap();
    clear_command_history();

    commands.invoke_method("smooth", &named(&registry, "iterations")).unwrap();
    assert!(command_history().is_empty());

    let mut args = named(&registry, "iterations");
    args.create_arg(INVOKED_FROM_GUI_ARG, registry.any(true));
    commands.invoke_method("smooth", &args).unwrap();
    assert_eq!(command_history(), vec!["MeshCommands.smooth(iterations:3 )"]);
}

#[test]
fn commands_class_is_abstract() {
    let registry = TypeRegistry::new();
    let commands = registry.meta_class("gom::Commands").unwrap();
    let result = commands.as_meta_class().unwrap().create(&ArgList::new());
    assert!(matches!(result, Err(GomError::AbstractClass(_))));
}
