// gom/src/scripting/lua_object.rs
use mlua::MetaMethod as LuaMetaMethod;
use mlua::prelude::LuaResult;
use mlua::Value as LuaValue;
use mlua::UserDataMethods;
use mlua::AnyUserData;
use mlua::MultiValue;
use mlua::UserData;
use mlua::Function;
use std::rc::Rc;
use mlua::Lua;
use crate::scripting::interop::{lua_to_args, push, registry, to_native};
use crate::types::object::{same_object, ObjectRef};
use crate::scripting::lua_callable::LuaCallable;
use crate::reflection::meta_method::MetaMethod;
use crate::reflection::meta_type::MetaTypeRef;
use crate::reflection::meta_class::MetaClass;
use crate::types::callable::CallableRef;
use crate::types::connection::Connection;
use crate::reflection::meta_arg::MetaArg;
use crate::types::any::Any;
use crate::*;

/// Lua handle to an object. The object lives at least as long as the handle.
#[derive(Clone)]
pub struct LuaGomObject {
    pub object: ObjectRef,
}

impl LuaGomObject {
    pub fn new(object: ObjectRef) -> Self {
        Self { object }
    }
}

fn element_index(i: i64) -> LuaResult<usize> {
    // Lua sequences start at 1.
    i.checked_sub(1)
        .and_then(|j| usize::try_from(j).ok())
        .ok_or_else(|| mlua::Error::RuntimeError(format!("invalid element index {i}")))
}

impl UserData for LuaGomObject {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // obj.name: property value, then method
        methods.add_meta_method(LuaMetaMethod::Index, |lua, this, key: LuaValue| {
            let name = match key {
                LuaValue::Integer(i) => return push(lua, &this.object.get_element(element_index(i)?)?),
                LuaValue::String(s) => s.to_str()?.to_string(),
                other => {
                    return Err(mlua::Error::RuntimeError(format!("invalid key of type {}", other.type_name())))
                }
            };
            if this.object.has_property(&name) {
                return push(lua, &this.object.get_property(&name)?);
            }
            let meta_class = this.object.meta_class();
            match meta_class.as_meta_class().and_then(|c| c.find_method(&name)) {
                Some(method) => Ok(LuaValue::UserData(
                    lua.create_userdata(LuaRequest::new(this.object.clone(), method))?,
                )),
                None => Err(mlua::Error::RuntimeError(format!(
                    "{}::{} : no such member",
                    meta_class.name(),
                    name
                ))),
            }
        });

        // obj.name = value
        methods.add_meta_method(LuaMetaMethod::NewIndex, |lua, this, (key, value): (LuaValue, LuaValue)| {
            let name = match key {
                LuaValue::Integer(i) => {
                    let value = to_native(lua, value, None)?;
                    this.object.set_element(element_index(i)?, &value)?;
                    return Ok(());
                }
                LuaValue::String(s) => s.to_str()?.to_string(),
                other => {
                    return Err(mlua::Error::RuntimeError(format!("invalid key of type {}", other.type_name())))
                }
            };
            let meta_class = this.object.meta_class();
            let Some(prop) = meta_class.as_meta_class().and_then(|c| c.find_property(&name)) else {
                return Err(mlua::Error::RuntimeError(format!(
                    "{}::{} : no such property",
                    meta_class.name(),
                    name
                )));
            };
            let expected = prop.meta_type(&registry(lua)?);
            let value = to_native(lua, value, expected.as_ref())?;
            this.object.set_property(&name, &value)?;
            Ok(())
        });

        methods.add_meta_method(LuaMetaMethod::Len, |_, this, ()| Ok(this.object.get_nb_elements()));
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.object.string_id()));
        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<LuaGomObject>()
                .is_ok_and(|o| same_object(&o.object, &this.object)))
        });
    }
}

/// A method bound to an object, as seen from Lua. Calling it invokes the method.
#[derive(Clone)]
pub struct LuaRequest {
    pub object: ObjectRef,
    pub method: Rc<MetaMethod>,
}

impl LuaRequest {
    pub fn new(object: ObjectRef, method: Rc<MetaMethod>) -> Self {
        Self { object, method }
    }
}

impl UserData for LuaRequest {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Call, |lua, this, args: MultiValue| {
            let args = lua_to_args(lua, args, Some(&this.object), Some(&this.method))?;
            match this.object.invoke_method(this.method.name(), &args) {
                Ok(result) => push(lua, &result),
                Err(e) => Err(mlua::Error::RuntimeError(format!(
                    "GOM error while invoking {}::{} ({})",
                    this.object.meta_class().name(),
                    this.method.name(),
                    e
                ))),
            }
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}.{}", this.object.string_id(), this.method.name()))
        });
    }
}

/// Lua handle to a callable.
#[derive(Clone)]
pub struct LuaGomCallable {
    pub callable: CallableRef,
}

impl LuaGomCallable {
    pub fn new(callable: CallableRef) -> Self {
        Self { callable }
    }
}

impl UserData for LuaGomCallable {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Call, |lua, this, args: MultiValue| {
            let args = lua_to_args(lua, args, None, None)?;
            let result = this.callable.invoke(&args)?;
            push(lua, &result)
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.callable.describe()));
    }
}

/// A meta type as seen from Lua. Classes can be extended and instantiated.
#[derive(Clone)]
pub struct LuaMetaClass {
    pub meta_type: MetaTypeRef,
}

impl LuaMetaClass {
    pub fn new(meta_type: MetaTypeRef) -> Self {
        Self { meta_type }
    }

    fn class(&self) -> LuaResult<&MetaClass> {
        self.meta_type
            .as_meta_class()
            .ok_or_else(|| mlua::Error::RuntimeError(format!("{} is not a class", self.meta_type.name())))
    }
}

fn lua_action(lua: &Lua, function: Function) -> CallableRef {
    Rc::new(LuaCallable::new(lua, function))
}

impl UserData for LuaMetaClass {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("name", |_, this, ()| Ok(this.meta_type.name().to_string()));

        methods.add_method("is_class", |_, this, ()| Ok(this.meta_type.is_class()));

        methods.add_method("get_doc", |_, this, ()| Ok(this.class()?.get_doc()));

        // mclass:add_property("x", "double", read_only)
        methods.add_method(
            "add_property",
            |_, this, (name, type_name, read_only): (String, String, Option<bool>)| {
                this.class()?.add_property(&name, &type_name, read_only.unwrap_or(false))?;
                Ok(())
            },
        );

        // mclass:add_slot("name", function(...) end, "return type")
        methods.add_method(
            "add_slot",
            |lua, this, (name, function, return_type): (String, Function, Option<String>)| {
                let return_type = return_type.unwrap_or_else(|| "void".to_string());
                let slot = this.class()?.add_slot(&name, Some(lua_action(lua, function)), &return_type)?;
                Ok(LuaMetaSlot::new(slot))
            },
        );

        methods.add_method("add_signal", |_, this, name: String| {
            Ok(LuaMetaSlot::new(this.class()?.add_signal(&name)?))
        });

        methods.add_method("add_constructor", |lua, this, function: Option<Function>| {
            let action = function.map(|f| lua_action(lua, f));
            Ok(LuaMetaSlot::new(this.class()?.add_constructor(action)?))
        });

        methods.add_method("create_subclass", |_, this, (name, is_abstract): (String, Option<bool>)| {
            let subclass = this.class()?.create_subclass(&name, is_abstract.unwrap_or(false))?;
            Ok(LuaMetaClass::new(subclass))
        });

        // mclass:create{x = 1} or mclass:create(1, 2)
        methods.add_method("create", |lua, this, args: MultiValue| {
            let args = lua_to_args(lua, args, None, None)?;
            let object = this.class()?.create(&args)?;
            Ok(LuaGomObject::new(object))
        });

        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.meta_type.name().to_string()));
    }
}

/// A method of a dynamic class being declared from Lua.
#[derive(Clone)]
pub struct LuaMetaSlot {
    pub method: Rc<MetaMethod>,
}

impl LuaMetaSlot {
    pub fn new(method: Rc<MetaMethod>) -> Self {
        Self { method }
    }
}

// Parses a default value written in Lua with the serializer of its type.
fn parse_default(lua: &Lua, type_name: &str, text: &str) -> LuaResult<Any> {
    let meta_type = registry(lua)?
        .resolve_meta_type(type_name)
        .ok_or_else(|| mlua::Error::RuntimeError(format!("no such type: {type_name}")))?;
    let mut value = Any::null();
    if !value.set_from_string(&meta_type, text) {
        return Err(mlua::Error::RuntimeError(format!("invalid default value '{text}' for {type_name}")));
    }
    Ok(value)
}

impl UserData for LuaMetaSlot {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("name", |_, this, ()| Ok(this.method.name().to_string()));

        // slot:add_arg("x", "double", "0.0")
        methods.add_method(
            "add_arg",
            |lua, this, (name, type_name, default): (String, String, Option<String>)| {
                let arg = match default {
                    Some(text) => MetaArg::with_default(&name, &type_name, parse_default(lua, &type_name, &text)?),
                    None => MetaArg::new(&name, &type_name),
                };
                if !this.method.add_arg(arg) {
                    return Err(mlua::Error::RuntimeError(format!(
                        "{} : duplicate argument {}",
                        this.method.qualified_name(),
                        name
                    )));
                }
                Ok(this.clone())
            },
        );

        methods.add_method("set_arg_default_value", |lua, this, (name, text): (String, String)| {
            let arg = this.method.find_arg(&name).ok_or_else(|| {
                mlua::Error::RuntimeError(format!("{} : no such argument {}", this.method.qualified_name(), name))
            })?;
            let value = parse_default(lua, arg.type_name(), &text)?;
            this.method.set_arg_default_value(&name, value);
            Ok(this.clone())
        });

        methods.add_method("set_attribute", |_, this, (name, value): (String, String)| {
            this.method.set_custom_attribute(&name, &value);
            Ok(this.clone())
        });

        methods.add_method(
            "set_arg_attribute",
            |_, this, (arg_name, name, value): (String, String, String)| {
                this.method.set_arg_custom_attribute(&arg_name, &name, &value);
                Ok(this.clone())
            },
        );

        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.method.get_doc()));
    }
}

/// A connection as seen from Lua. Builders return the connection for chaining.
#[derive(Clone)]
pub struct LuaConnection {
    pub connection: Rc<Connection>,
}

impl LuaConnection {
    pub fn new(connection: Rc<Connection>) -> Self {
        Self { connection }
    }
}

impl UserData for LuaConnection {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("if_arg", |_, this, (name, value): (String, String)| {
            this.connection.if_arg(&name, &value);
            Ok(this.clone())
        });

        methods.add_method("add_arg", |lua, this, (name, value): (String, LuaValue)| {
            this.connection.add_arg(&name, to_native(lua, value, None)?);
            Ok(this.clone())
        });

        methods.add_method("rename_arg", |_, this, (name, new_name): (String, String)| {
            this.connection.rename_arg(&name, &new_name);
            Ok(this.clone())
        });

        methods.add_method("discard_arg", |_, this, name: String| {
            this.connection.discard_arg(&name);
            Ok(this.clone())
        });

        methods.add_method("remove", |_, this, ()| {
            this.connection.remove();
            Ok(())
        });
    }
}
