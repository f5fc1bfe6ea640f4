// gom/tests/lua_bridge.rs
use gom::scripting::lua_interpreter::LuaInterpreter;
use gom::interpreter::interpreter::Interpreter;
use gom::logging::logging::{clear_recent_logs, recent_logs};
use gom::types::callable::Request;
use gom::types::error::GomError;
use gom::types::value::Value;
use std::rc::Rc;
use gom::*;

fn lua(registry: &TypeRegistry) -> LuaInterpreter {
    LuaInterpreter::new(registry).unwrap()
}

#[test]
fn classes_declared_in_lua_are_usable_from_rust() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Point = gom.declare_class("Point")
        Point:add_property("x", "double")
        Point:add_property("y", "double")
        Point:add_constructor()
        p = gom.create{classname = "Point", x = 1.5, y = 2}
        "#,
        false,
        true,
    ));

    let point = lua.resolve_object("p").unwrap();
    assert_eq!(point.meta_class().name(), "Point");
    assert_eq!(point.get_property("x").unwrap().get_value::<f64>(), Some(1.5));
    assert_eq!(point.get_property("y").unwrap().get_value::<f64>(), Some(2.0));
    assert_eq!(lua.eval("p.x + p.y").value(), &Value::Double(3.5));
}

#[test]
fn slots_get_a_table_for_named_calls_and_values_for_positional_ones() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Greeter = gom.declare_class("Greeter")
        Greeter:add_slot("greet", function(args) return "hello " .. args.who end, "string")
            :add_arg("who", "string")
        Greeter:add_slot("sum", function(self, a, b) return a + b end, "int")
        Greeter:add_constructor()
        g = gom.create("Greeter")
        "#,
        false,
        true,
    ));

    assert_eq!(lua.eval("g:greet('bob')").as_string(), "hello bob");
    assert_eq!(lua.eval("g.greet{who = 'ann'}").as_string(), "hello ann");
    assert_eq!(lua.eval("g:sum(2, 3)").value(), &Value::Int(5));

    let greeter = lua.resolve_object("g").unwrap();
    let mut args = ArgList::new();
    args.create_arg("who", registry.any("rust".to_string()));
    assert_eq!(greeter.invoke_method("greet", &args).unwrap().as_string(), "hello rust");
}

#[test]
fn lua_functions_receive_signals() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Button = gom.declare_class("Button")
        Button:add_signal("clicked")
        Button:add_constructor()
        b = gom.create("Button")
        clicks = 0
        gom.connect(b.clicked, function(args) clicks = clicks + args.count end)
            :if_arg("count", "!=0")
        "#,
        false,
        true,
    ));

    let button = lua.resolve_object("b").unwrap();
    for count in [2, 0, 3] {
        let mut args = ArgList::new();
        args.create_arg("count", registry.any(count));
        assert!(button.emit_signal("clicked", &args));
    }
    assert_eq!(lua.resolve("clicks").value(), &Value::Int(5));
}

#[test]
fn failing_lua_callable_reports_a_script_error() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Faulty = gom.declare_class("Faulty")
        Faulty:add_slot("explode", function(args) error("kaboom") end, "void")
        Faulty:add_constructor()
        f = gom.create("Faulty")
        "#,
        false,
        true,
    ));

    let faulty = lua.resolve_object("f").unwrap();
    clear_recent_logs();
    let result = faulty.invoke_method("explode", &ArgList::new());
    assert!(matches!(result, Err(GomError::Script { ref language, .. }) if language == "Lua"));
    assert!(recent_logs()
        .iter()
        .any(|log| log.channel == "Lua" && log.message.contains("kaboom")));
}

#[test]
fn objects_and_requests_cross_the_bridge() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Counter = gom.declare_class("Counter")
        Counter:add_property("n", "int")
        -- calls without args are named calls: the slot gets {self = ..., method = ...}
        Counter:add_slot("bump", function(args) args.self.n = args.self.n + 1 end, "void")
        Counter:add_constructor()
        "#,
        false,
        true,
    ));

    let counter = lua.create("Counter", &ArgList::new()).unwrap();
    assert!(lua.bind_object("c", &counter));
    assert!(lua.execute("c:bump() c.bump()", true, true));
    assert_eq!(counter.get_property("n").unwrap().get_value::<i32>(), Some(2));
    assert_eq!(lua.history().len(), 1);

    let method = counter.meta_class().as_meta_class().unwrap().find_method("bump").unwrap();
    let request: CallableRef = Rc::new(Request::new(counter.clone(), method));
    assert!(lua.bind("bump", &Any::from_callable(&registry, request)));
    assert!(lua.execute("bump()", false, true));
    assert_eq!(counter.get_property("n").unwrap().get_value::<i32>(), Some(3));
    assert_eq!(lua.eval("c == gom.find_object(c.id)").value(), &Value::Bool(true));
}

#[test]
fn unknown_members_raise_lua_errors() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Empty = gom.declare_class("Empty")
        Empty:add_constructor()
        e = gom.create("Empty")
        "#,
        false,
        true,
    ));
    assert!(!lua.execute("return e.nothing", false, false));
    assert!(!lua.execute("e.nothing = 1", false, false));
    assert!(!lua.execute("gom.create('NoSuchClass')", false, false));
}

#[test]
fn out_of_range_element_indices_are_lua_errors() {
    let registry = TypeRegistry::new();
    let lua = lua(&registry);
    assert!(lua.execute(
        r#"
        local Box = gom.declare_class("Box")
        Box:add_constructor()
        b = gom.create("Box")
        "#,
        false,
        true,
    ));

    assert!(!lua.execute("return b[math.mininteger]", false, false));
    assert!(!lua.execute("b[math.mininteger] = 1", false, false));
    assert!(!lua.execute("return b[0]", false, false));
    assert!(lua.execute("ok = pcall(function() return b[math.mininteger] end)", false, true));
    assert_eq!(lua.eval("ok").value(), &Value::Bool(false));
}
