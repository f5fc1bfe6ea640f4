// gom/src/scripting/interop.rs
use glam::{DVec2, DVec3, DVec4};
use mlua::prelude::LuaResult;
use mlua::Value as LuaValue;
use mlua::AnyUserData;
use mlua::MultiValue;
use std::rc::Rc;
use mlua::Table;
use mlua::Lua;
use crate::scripting::lua_object::{LuaGomCallable, LuaGomObject, LuaMetaClass, LuaRequest};
use crate::reflection::registry::{TypeRegistry, WeakTypeRegistry};
use crate::types::object::{same_object, ObjectRef};
use crate::services::serializer::VectorValue;
use crate::scripting::lua_callable::LuaCallable;
use crate::reflection::meta_method::MetaMethod;
use crate::scripting::lua_constants::GOM_LUA_CHANNEL;
use crate::reflection::meta_type::MetaTypeRef;
use crate::types::callable::{CallableRef, Request};
use crate::types::arg_list::ArgList;
use crate::types::value::Value;
use crate::types::any::Any;
use crate::*;

/// The registry the Lua state was created for.
pub fn registry(lua: &Lua) -> LuaResult<TypeRegistry> {
    lua.app_data_ref::<WeakTypeRegistry>()
        .and_then(|weak| weak.upgrade())
        .ok_or_else(|| mlua::Error::RuntimeError("GOM type registry is not available".into()))
}

/// Converts a GOM value to a Lua value.
pub fn push(lua: &Lua, value: &Any) -> LuaResult<LuaValue> {
    let Some(meta_type) = value.meta_type() else {
        return Ok(LuaValue::Nil);
    };
    if meta_type.as_meta_enum().is_some() {
        return Ok(LuaValue::String(lua.create_string(value.as_string())?));
    }
    Ok(match value.value() {
        Value::Null | Value::Object(None) | Value::Callable(None) => LuaValue::Nil,
        Value::Bool(b) => LuaValue::Boolean(*b),
        Value::Int(i) => LuaValue::Integer(*i as i64),
        Value::UInt(u) => LuaValue::Integer(*u as i64),
        Value::Long(l) => LuaValue::Integer(*l),
        Value::ULong(u) => wide_integer(*u),
        Value::Size(s) => wide_integer(*s as u64),
        Value::Float(f) => LuaValue::Number(*f as f64),
        Value::Double(d) => LuaValue::Number(*d),
        Value::Str(s) => LuaValue::String(lua.create_string(s)?),
        Value::Object(Some(object)) => LuaValue::UserData(lua.create_userdata(LuaGomObject::new(object.clone()))?),
        Value::Callable(Some(callable)) => {
            LuaValue::UserData(lua.create_userdata(LuaGomCallable::new(callable.clone()))?)
        }
        Value::ArgList(args) => LuaValue::Table(args_to_table(lua, args)?),
        Value::Blob(_) => push_blob(lua, value)?,
    })
}

// Lua integers are signed 64 bits; larger values become floats.
fn wide_integer(u: u64) -> LuaValue {
    i64::try_from(u).map_or(LuaValue::Number(u as f64), LuaValue::Integer)
}

// Vectors become arrays, anything else its text form.
fn push_blob(lua: &Lua, value: &Any) -> LuaResult<LuaValue> {
    let components = value
        .get_value::<DVec2>()
        .map(|v| v.components())
        .or_else(|| value.get_value::<DVec3>().map(|v| v.components()))
        .or_else(|| value.get_value::<DVec4>().map(|v| v.components()));
    match components {
        Some(components) => Ok(LuaValue::Table(lua.create_sequence_from(components)?)),
        None => Ok(LuaValue::String(lua.create_string(value.as_string())?)),
    }
}

/// A table holding the args by name, or a sequence for unnamed args.
pub fn args_to_table(lua: &Lua, args: &ArgList) -> LuaResult<Table> {
    let table = lua.create_table()?;
    if args.has_unnamed_args() {
        for (i, (_, value)) in args.iter().enumerate() {
            table.raw_set(i + 1, push(lua, value)?)?;
        }
    } else {
        for (name, value) in args.iter() {
            table.raw_set(name, push(lua, value)?)?;
        }
    }
    Ok(table)
}

/// Converts a Lua value to a GOM value, typed as `expected` when the
/// conversion allows it.
pub fn to_native(lua: &Lua, value: LuaValue, expected: Option<&MetaTypeRef>) -> LuaResult<Any> {
    let registry = registry(lua)?;
    let any = match value {
        LuaValue::Nil => Any::null(),
        LuaValue::Boolean(b) => registry.any(b),
        LuaValue::Integer(i) => match i32::try_from(i) {
            Ok(i) => registry.any(i),
            Err(_) => registry.any(i),
        },
        LuaValue::Number(n) => registry.any(n),
        LuaValue::String(s) => registry.any(s.to_str()?.to_string()),
        LuaValue::Function(function) => {
            let callable: CallableRef = Rc::new(LuaCallable::new(lua, function));
            Any::from_callable(&registry, callable)
        }
        LuaValue::Table(table) => match expected.and_then(|t| table_to_vector(&registry, &table, t).transpose()) {
            Some(vector) => vector?,
            None => registry.any(table_to_args(lua, &table)?),
        },
        LuaValue::UserData(ud) => userdata_to_native(&registry, &ud)?,
        other => {
            gom_warn!(GOM_LUA_CHANNEL, "Cannot convert Lua {} to a GOM value", other.type_name());
            Any::null()
        }
    };

    match expected {
        Some(expected) if !any.is_null() => {
            if any.meta_type().is_some_and(|own| Rc::ptr_eq(own, expected)) {
                return Ok(any);
            }
            Ok(any.converted_to(expected).unwrap_or(any))
        }
        _ => Ok(any),
    }
}

fn vector<V: VectorValue>(registry: &TypeRegistry, components: &[f64]) -> Option<Any> {
    (components.len() == V::DIMENSION).then(|| registry.any(V::from_components(components)))
}

fn table_to_vector(registry: &TypeRegistry, table: &Table, expected: &MetaTypeRef) -> LuaResult<Option<Any>> {
    let read = || table.clone().sequence_values::<f64>().collect::<LuaResult<Vec<f64>>>();
    Ok(match expected.name() {
        "vec2" => vector::<DVec2>(registry, &read()?),
        "vec3" => vector::<DVec3>(registry, &read()?),
        "vec4" => vector::<DVec4>(registry, &read()?),
        _ => None,
    })
}

/// A sequence gives unnamed args. Otherwise string keys give named
/// args, sorted by name.
pub fn table_to_args(lua: &Lua, table: &Table) -> LuaResult<ArgList> {
    let mut args = ArgList::new();
    if table.raw_len() > 0 {
        for value in table.clone().sequence_values::<LuaValue>() {
            args.create_unnamed_arg(to_native(lua, value?, None)?);
        }
        return Ok(args);
    }

    let mut named = Vec::new();
    for pair in table.clone().pairs::<LuaValue, LuaValue>() {
        let (key, value) = pair?;
        match key {
            LuaValue::String(key) => named.push((key.to_str()?.to_string(), value)),
            other => gom_warn!(GOM_LUA_CHANNEL, "Ignoring table key of type {}", other.type_name()),
        }
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in named {
        args.create_arg(&name, to_native(lua, value, None)?);
    }
    Ok(args)
}

fn userdata_to_native(registry: &TypeRegistry, ud: &AnyUserData) -> LuaResult<Any> {
    if let Ok(object) = ud.borrow::<LuaGomObject>() {
        return Ok(Any::from_object(&object.object));
    }
    if let Ok(callable) = ud.borrow::<LuaGomCallable>() {
        return Ok(Any::from_callable(registry, callable.callable.clone()));
    }
    if let Ok(request) = ud.borrow::<LuaRequest>() {
        let callable: CallableRef = Rc::new(Request::new(request.object.clone(), request.method.clone()));
        return Ok(Any::from_callable(registry, callable));
    }
    if let Ok(mclass) = ud.borrow::<LuaMetaClass>() {
        return Ok(registry.any(mclass.meta_type.name().to_string()));
    }
    gom_warn!(GOM_LUA_CHANNEL, "Cannot convert this userdata to a GOM value");
    Ok(Any::null())
}

fn is_named_table(value: &LuaValue) -> bool {
    matches!(value, LuaValue::Table(table) if table.raw_len() == 0)
}

/// Arguments of a call from Lua.
///
/// A single string-keyed table is a named call, anything else is a
/// positional call. A leading `receiver` is dropped so that `obj:m()`
/// and `obj.m()` are the same call. Declared argument types of `method`
/// guide the conversions.
pub fn lua_to_args(
    lua: &Lua,
    args: MultiValue,
    receiver: Option<&ObjectRef>,
    method: Option<&MetaMethod>,
) -> LuaResult<ArgList> {
    let mut values: Vec<LuaValue> = args.into_iter().collect();
    if let (Some(receiver), Some(LuaValue::UserData(ud))) = (receiver, values.first()) {
        if ud.borrow::<LuaGomObject>().is_ok_and(|o| same_object(&o.object, receiver)) {
            values.remove(0);
        }
    }

    let registry = registry(lua)?;
    let arg_type = |name: &str| {
        method
            .and_then(|m| m.find_arg(name))
            .and_then(|a| registry.resolve_meta_type(a.type_name()))
    };

    if values.len() == 1 && is_named_table(&values[0]) {
        if let Some(LuaValue::Table(table)) = values.pop() {
            let raw = table_to_args(lua, &table)?;
            let mut args = ArgList::new();
            for (name, value) in raw.iter() {
                let typed = match arg_type(name) {
                    Some(expected) if !value.is_null() => value.converted_to(&expected).unwrap_or_else(|| value.clone()),
                    _ => value.clone(),
                };
                args.create_arg(name, typed);
            }
            return Ok(args);
        }
    }

    let mut args = ArgList::new();
    for (i, value) in values.into_iter().enumerate() {
        let expected = method
            .and_then(|m| m.ith_arg(i))
            .and_then(|a| registry.resolve_meta_type(a.type_name()));
        args.create_unnamed_arg(to_native(lua, value, expected.as_ref())?);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_values_past_the_lua_range_become_floats() {
        let registry = TypeRegistry::new();
        let lua = Lua::new();

        let small = push(&lua, &registry.any(7u64)).unwrap();
        assert!(matches!(small, LuaValue::Integer(7)));

        let large = push(&lua, &registry.any(u64::MAX)).unwrap();
        match large {
            LuaValue::Number(n) => assert_eq!(n, u64::MAX as f64),
            other => panic!("expected a float, got {other:?}"),
        }
    }
}
