// gom/tests/native_class.rs
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use gom::reflection::meta_class::MetaClass;
use gom::reflection::meta_arg::MetaArg;
use gom::reflection::meta_method::downcast_target;
use gom::types::error::GomError;
use gom::*;

#[derive(GomObject, Reflect)]
#[gom(methods = calculator_methods)]
struct Calculator {
    base: ObjectBase,
    precision: Cell<i32>,
    label: RefCell<String>,
    #[gom(read_only)]
    memory: Cell<f64>,
    #[gom(skip)]
    native_calls: Cell<u32>,
}

impl Object for Calculator {}

impl Calculator {
    fn new(registry: &TypeRegistry) -> GomResult<Self> {
        Ok(Self {
            base: ObjectBase::of::<Calculator>(registry)?,
            precision: Cell::new(2),
            label: RefCell::new("calc".to_string()),
            memory: Cell::new(0.0),
            native_calls: Cell::new(0),
        })
    }
}

fn calculator_methods(mclass: &MetaClass, _registry: &TypeRegistry) {
    mclass.add_method(
        "add",
        "int",
        vec![MetaArg::new("a", "int"), MetaArg::new("b", "int")],
        |target, args, registry| {
            let this = downcast_target::<Calculator>(target, "add")?;
            this.native_calls.set(this.native_calls.get() + 1);
            let sum = args.get_arg_value::<i32>("a")? + args.get_arg_value::<i32>("b")?;
            this.memory.set(sum as f64);
            Ok(Any::new(registry, sum))
        },
    );
    mclass.add_native_constructor(vec![], |_, registry| {
        let object: ObjectRef = make_object(Calculator::new(registry)?);
        Ok(object)
    });
}

register_gom_class!(Calculator, "test::Calculator");

fn calculator(registry: &TypeRegistry) -> ObjectRef {
    registry
        .meta_class("test::Calculator")
        .unwrap()
        .as_meta_class()
        .unwrap()
        .create(&ArgList::new())
        .unwrap()
}

#[test]
fn registered_class_is_bound_by_new_registries() {
    let registry = TypeRegistry::new();
    let mclass = registry.meta_class("test::Calculator").unwrap();
    let class = mclass.as_meta_class().unwrap();
    assert!(class.is_a("gom::Object"));
    assert!(class.find_property("precision").is_some());
    assert!(class.find_property("native_calls").is_none());
    assert!(class.find_property("memory").unwrap().read_only());
}

#[test]
fn add_by_name_and_by_position() {
    let registry = TypeRegistry::new();
    let calc = calculator(&registry);

    let mut named = ArgList::new();
    named.create_arg("b", registry.any(2i32));
    named.create_arg("a", registry.any(1i32));
    assert_eq!(calc.invoke_method("add", &named).unwrap().get_value::<i32>(), Some(3));

    let mut positional = ArgList::new();
    positional.create_unnamed_arg(registry.any(4i32));
    positional.create_unnamed_arg(registry.any(5i32));
    assert_eq!(calc.invoke_method("add", &positional).unwrap().get_value::<i32>(), Some(9));
    assert_eq!(calc.get_property("memory").unwrap().get_value::<f64>(), Some(9.0));
}

#[test]
fn missing_arg_never_reaches_native_code() {
    let registry = TypeRegistry::new();
    let calc = calculator(&registry);

    let mut args = ArgList::new();
    args.create_arg("a", registry.any(1i32));
    let result = calc.invoke_method("add", &args);
    assert!(matches!(result, Err(GomError::MissingArgument { ref arg, .. }) if arg == "b"));
    assert_eq!(calc.downcast_ref::<Calculator>().unwrap().native_calls.get(), 0);
}

#[test]
fn derived_properties_read_and_write() {
    let registry = TypeRegistry::new();
    let calc = calculator(&registry);

    calc.set_property("precision", &registry.any(5i32)).unwrap();
    calc.set_property("label", &registry.any("sci".to_string())).unwrap();
    assert_eq!(calc.get_property("precision").unwrap().get_value::<i32>(), Some(5));
    assert_eq!(calc.get_property("label").unwrap().as_string(), "sci");
    assert!(calc.set_property("memory", &registry.any(1.0f64)).is_err());
    assert_eq!(calc.get_attributes(), "precision;label;memory");
}

#[test]
fn create_writes_unused_named_args_to_properties() {
    let registry = TypeRegistry::new();
    let mut args = ArgList::new();
    args.create_arg("precision", registry.any(7i32));
    let calc = registry
        .meta_class("test::Calculator")
        .unwrap()
        .as_meta_class()
        .unwrap()
        .create(&args)
        .unwrap();
    assert_eq!(calc.get_property("precision").unwrap().get_value::<i32>(), Some(7));
}

#[test]
fn object_pointers_cast_to_base_classes() {
    let registry = TypeRegistry::new();
    let calc = Any::from_object(&calculator(&registry));
    let object_ptr = registry.resolve_meta_type("gom::Object*").unwrap();
    let commands_ptr = registry.resolve_meta_type("gom::Commands*").unwrap();

    let cast = calc.cast_to(&object_ptr).unwrap();
    assert_eq!(cast.as_object().unwrap().meta_class().name(), "test::Calculator");
    assert!(calc.cast_to(&commands_ptr).is_none());
}

#[test]
fn builtin_object_slots_answer_questions() {
    let registry = TypeRegistry::new();
    let calc = calculator(&registry);

    let mut args = ArgList::new();
    args.create_arg("type_name", registry.any("gom::Object".to_string()));
    assert_eq!(calc.invoke_method("is_a", &args).unwrap().get_value::<bool>(), Some(true));
    assert_eq!(calc.get_property("class_name").unwrap().as_string(), "test::Calculator");
    assert_eq!(calc.get_property("id").unwrap().get_value::<u32>(), Some(calc.id()));
}

#[test]
fn duplicate_native_members_are_not_declared() {
    let registry = TypeRegistry::new();
    let shape = registry.create_meta_class("test::Shape", Some("gom::Object"), true).unwrap();
    let class = shape.as_meta_class().unwrap();

    let area = |_: &dyn Object, _: &ArgList, registry: &TypeRegistry| -> GomResult<Any> {
        Ok(Any::new(registry, 1.0f64))
    };
    let first = class.add_method("area", "double", vec![], area).unwrap();
    assert!(class.add_method("area", "double", vec![], area).is_none());
    assert!(class.add_computed_property("area", "double", |_, registry| Ok(Any::new(registry, 2.0f64))).is_none());

    assert_eq!(class.nb_members(false), 1);
    assert!(Rc::ptr_eq(&class.find_method("area").unwrap(), &first));
    assert!(first.adapter().is_some());
}
