// gom/tests/connections.rs
use std::cell::RefCell;
use std::rc::Rc;
use gom::reflection::meta_type::MetaTypeRef;
use gom::types::connection::ConnectionState;
use gom::types::callable::NativeCallable;
use gom::logging::logging::{clear_recent_logs, recent_logs};
use gom::types::error::GomError;
use gom::*;

type Seen = Rc<RefCell<Vec<String>>>;

// A class with a `changed` signal and a `record` slot that logs the args it gets.
fn emitter_class(registry: &TypeRegistry, seen: &Seen) -> MetaTypeRef {
    let mclass = registry.create_dynamic_class("Emitter", None, false).unwrap();
    let class = mclass.as_meta_class().unwrap();
    class.add_signal("changed").unwrap();
    let seen = seen.clone();
    let record = NativeCallable::new_ref("record", move |args| {
        let line = args
            .iter()
            .filter(|(name, _)| *name != "self" && *name != "method")
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        seen.borrow_mut().push(line);
        Ok(Any::null())
    });
    class.add_slot("record", Some(record), "void").unwrap();
    class.add_constructor(None).unwrap();
    mclass
}

fn create(mclass: &MetaTypeRef) -> ObjectRef {
    mclass.as_meta_class().unwrap().create(&ArgList::new()).unwrap()
}

fn args(registry: &TypeRegistry, values: &[(&str, i32)]) -> ArgList {
    let mut args = ArgList::new();
    for (name, value) in values {
        args.create_arg(name, registry.any(*value));
    }
    args
}

#[test]
fn args_are_discarded_renamed_then_extended() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    let connection = source.connect_signal_to_slot("changed", &target, "record").unwrap();
    connection
        .discard_arg("noise")
        .rename_arg("old", "new")
        .add_arg("new", registry.any(100i32))
        .add_arg("extra", registry.any(1i32));

    assert!(source.emit_signal("changed", &args(&registry, &[("noise", 0), ("old", 5), ("kept", 2)])));
    assert_eq!(*seen.borrow(), vec!["new=100,kept=2,extra=1"]);
}

#[test]
fn conditions_filter_emissions() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    source
        .connect_signal_to_slot("changed", &target, "record")
        .unwrap()
        .if_arg("value", "!=0");

    source.emit_signal("changed", &args(&registry, &[("value", 0)]));
    source.emit_signal("changed", &args(&registry, &[("value", 3)]));
    assert_eq!(*seen.borrow(), vec!["value=3"]);
}

#[test]
fn condition_on_missing_arg_is_logged_and_ignored() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    source
        .connect_signal_to_slot("changed", &target, "record")
        .unwrap()
        .if_arg("missing", "==1");

    clear_recent_logs();
    source.emit_signal("changed", &args(&registry, &[("value", 3)]));
    assert_eq!(*seen.borrow(), vec!["value=3"]);
    assert!(recent_logs()
        .iter()
        .any(|log| log.channel == "Connection" && log.message.contains("Condition on unexisting arg: missing==1")));
}

#[test]
fn connections_fire_in_registration_order() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let source = create(&mclass);

    for i in 0..3 {
        let seen = seen.clone();
        source
            .connect_signal_to_callable(
                "changed",
                NativeCallable::new_ref("tag", move |_| {
                    seen.borrow_mut().push(format!("callable {i}"));
                    Ok(Any::null())
                }),
            )
            .unwrap();
    }
    source.emit_signal("changed", &ArgList::new());
    assert_eq!(*seen.borrow(), vec!["callable 0", "callable 1", "callable 2"]);
}

#[test]
fn removed_connection_never_fires() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    let connection = source.connect_signal_to_slot("changed", &target, "record").unwrap();
    connection.remove();

    assert_eq!(connection.state(), ConnectionState::Removed);
    assert_eq!(source.object_base().nb_connections("changed"), 0);
    source.emit_signal("changed", &args(&registry, &[("value", 1)]));
    assert!(seen.borrow().is_empty());
    assert!(matches!(connection.invoke(&ArgList::new()), Err(GomError::Disconnected(_))));
}

#[test]
fn connection_does_not_keep_its_target_alive() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let source = create(&mclass);
    let target = create(&mclass);
    let weak = Rc::downgrade(&target);

    source.connect_signal_to_slot("changed", &target, "record").unwrap();
    drop(target);

    assert!(weak.upgrade().is_none());
    assert!(!source.emit_signal("changed", &args(&registry, &[("value", 1)])));
    assert!(seen.borrow().is_empty());
}

#[test]
fn disabled_signals_are_not_emitted() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    source.connect_signal_to_slot("changed", &target, "record").unwrap();
    source.set_property("signals_enabled", &registry.any(false)).unwrap();
    source.emit_signal("changed", &args(&registry, &[("value", 1)]));
    assert!(seen.borrow().is_empty());
}

#[test]
fn invoking_a_signal_emits_it() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    source.connect_signal_to_slot("changed", &target, "record").unwrap();
    source.invoke_method("changed", &args(&registry, &[("value", 4)])).unwrap();
    assert_eq!(*seen.borrow(), vec!["value=4"]);
}

#[test]
fn connecting_an_unknown_signal_fails() {
    let registry = TypeRegistry::new();
    let seen = Seen::default();
    let mclass = emitter_class(&registry, &seen);
    let (source, target) = (create(&mclass), create(&mclass));

    assert!(source.connect_signal_to_slot("nope", &target, "record").is_err());
    assert!(source.connect_signal_to_slot("changed", &target, "nope").is_err());
}
