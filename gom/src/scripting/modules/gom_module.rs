// gom/src/scripting/modules/gom_module.rs
use crate::scripting::modules::lua_module::{gom_table, LuaApi, LuaApiWriter, LuaModule};
use crate::scripting::lua_object::{LuaConnection, LuaGomObject, LuaMetaClass, LuaRequest};
use crate::scripting::interop::{lua_to_args, registry, table_to_args};
use crate::scripting::lua_callable::LuaCallable;
use crate::storage::gom_config::GOM_CONFIG;
use crate::types::object::find_object_by_id;
use crate::types::callable::CallableRef;
use crate::scripting::lua_constants::*;
use mlua::prelude::LuaResult;
use mlua::Value as LuaValue;
use mlua::LuaSerdeExt;
use mlua::AnyUserData;
use mlua::MultiValue;
use std::rc::Rc;
use mlua::Lua;
use crate::*;

/// Lua module that installs the `gom` table.
#[derive(Default)]
pub struct GomModule;
register_lua_module!(GomModule);

// gom.create("Class", args...) or gom.create{classname = "Class", ...}
fn create(lua: &Lua, args: MultiValue) -> LuaResult<LuaGomObject> {
    let mut values = args.into_iter();
    let (class_name, args) = match values.next() {
        Some(LuaValue::String(name)) => {
            let name = name.to_str()?.to_string();
            (name, lua_to_args(lua, values.collect(), None, None)?)
        }
        Some(LuaValue::Table(table)) => {
            let mut args = table_to_args(lua, &table)?;
            let name = args.arg_as_string(CLASSNAME).ok_or_else(|| {
                mlua::Error::RuntimeError(format!("gom.create : missing {CLASSNAME}"))
            })?;
            args.delete_arg(CLASSNAME);
            (name, args)
        }
        _ => return Err(mlua::Error::RuntimeError("gom.create expects a class name".into())),
    };

    let mclass = registry(lua)?.meta_class(&class_name)?;
    let class = mclass
        .as_meta_class()
        .ok_or_else(|| mlua::Error::RuntimeError(format!("{class_name} is not a class")))?;
    Ok(LuaGomObject::new(class.create(&args)?))
}

// gom.connect(obj.signal, other.slot) or gom.connect(obj.signal, function(...) end)
fn connect(lua: &Lua, (signal, target): (AnyUserData, LuaValue)) -> LuaResult<LuaConnection> {
    let signal = signal.borrow::<LuaRequest>()?;
    let source = &signal.object;
    let connection = match target {
        LuaValue::UserData(ud) if ud.is::<LuaRequest>() => {
            let slot = ud.borrow::<LuaRequest>()?;
            source.connect_signal_to_slot(signal.method.name(), &slot.object, slot.method.name())?
        }
        LuaValue::Function(function) => {
            let callable: CallableRef = Rc::new(LuaCallable::new(lua, function));
            source.connect_signal_to_callable(signal.method.name(), callable)?
        }
        other => {
            return Err(mlua::Error::RuntimeError(format!(
                "gom.connect : cannot connect to a {}",
                other.type_name()
            )))
        }
    };
    Ok(LuaConnection::new(connection))
}

impl LuaModule for GomModule {
    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let gom_tbl = gom_table(lua)?;

        gom_tbl.set(CREATE, lua.create_function(create)?)?;

        gom_tbl.set(CONNECT, lua.create_function(connect)?)?;

        gom_tbl.set(
            DECLARE_CLASS,
            lua.create_function(|lua, (name, super_name): (String, Option<String>)| {
                let mclass = registry(lua)?.create_dynamic_class(&name, super_name.as_deref(), false)?;
                Ok(LuaMetaClass::new(mclass))
            })?,
        )?;

        gom_tbl.set(
            RESOLVE_META_TYPE,
            lua.create_function(|lua, name: String| {
                Ok(registry(lua)?.resolve_meta_type(&name).map(LuaMetaClass::new))
            })?,
        )?;

        gom_tbl.set(
            FIND_OBJECT,
            lua.create_function(|_, id: u32| Ok(find_object_by_id(id).map(LuaGomObject::new)))?,
        )?;

        gom_tbl.set(
            BIND,
            lua.create_function(|lua, (name, value): (String, LuaValue)| lua.globals().set(name, value))?,
        )?;

        let config = GOM_CONFIG
            .read()
            .map_err(|e| mlua::Error::RuntimeError(e.to_string()))?
            .clone();
        gom_tbl.set(CONFIG, lua.to_value(&config)?)?;

        Ok(())
    }
}

impl LuaApi for GomModule {
    fn emit_api(&self, out: &mut LuaApiWriter) {
        out.line("---@meta");
        out.line(&format!("{GOM} = {GOM} or {{}}"));
        out.line("");
        out.line("---@param classname string");
        out.line("---@return userdata");
        out.write(format_args!("function {GOM}.{CREATE}(classname, ...) end\n\n"));
        out.line("---@param name string");
        out.line("---@param super_name string|nil");
        out.write(format_args!("function {GOM}.{DECLARE_CLASS}(name, super_name) end\n\n"));
        out.line("---@param name string");
        out.write(format_args!("function {GOM}.{RESOLVE_META_TYPE}(name) end\n\n"));
        out.line("---@param id integer");
        out.write(format_args!("function {GOM}.{FIND_OBJECT}(id) end\n\n"));
        out.line("---@param signal userdata");
        out.line("---@param target userdata|function");
        out.write(format_args!("function {GOM}.{CONNECT}(signal, target) end\n\n"));
        out.line("---@param name string");
        out.write(format_args!("function {GOM}.{BIND}(name, value) end\n\n"));
        out.write(format_args!("---@type table\n{GOM}.{CONFIG} = {{}}\n"));
    }
}
