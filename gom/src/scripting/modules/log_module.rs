// gom/src/scripting/modules/log_module.rs
use crate::scripting::modules::lua_module::{gom_table, LuaApi, LuaApiWriter, LuaModule};
use crate::scripting::lua_constants::*;
use mlua::prelude::LuaResult;
use mlua::Variadic;
use mlua::Function;
use mlua::Value;
use mlua::Lua;
use crate::*;

/// Lua module that exposes the four log levels as `gom.log`.
#[derive(Default)]
pub struct LogModule;
register_lua_module!(LogModule);

impl LuaModule for LogModule {
    fn register(&self, lua: &Lua) -> LuaResult<()> {
        // Helper that creates a wrapper for a concrete log level
        fn level_wrapper(lua: &Lua, level_name: &'static str) -> LuaResult<Function> {
            lua.create_function(move |_lua, args: Variadic<Value>| {
                let parts = args
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<LuaResult<Vec<String>>>()?;
                let msg = parts.join(" ");

                match level_name {
                    LOG_INFO => gom_info!(LUA_CHANNEL, "{}", msg),
                    LOG_WARN => gom_warn!(LUA_CHANNEL, "{}", msg),
                    LOG_ERROR => gom_err!(LUA_CHANNEL, "{}", msg),
                    LOG_DEBUG => gom_debug!(LUA_CHANNEL, "{}", msg),
                    _ => gom_err!(LUA_CHANNEL, "Log level from Lua was not recognised."),
                }

                Ok(Value::Nil)
            })
        }

        // Create a table that will become `gom.log`
        let log_tbl = lua.create_table()?;

        log_tbl.set(LOG_INFO, level_wrapper(lua, LOG_INFO)?)?;
        log_tbl.set(LOG_WARN, level_wrapper(lua, LOG_WARN)?)?;
        log_tbl.set(LOG_ERROR, level_wrapper(lua, LOG_ERROR)?)?;
        log_tbl.set(LOG_DEBUG, level_wrapper(lua, LOG_DEBUG)?)?;

        gom_table(lua)?.set(LOG, log_tbl)?;

        Ok(())
    }
}

impl LuaApi for LogModule {
    fn emit_api(&self, out: &mut LuaApiWriter) {
        out.line("---@meta");
        out.write(format_args!("{GOM}.{LOG} = {{}}\n\n"));
        for level in [LOG_INFO, LOG_WARN, LOG_ERROR, LOG_DEBUG] {
            out.line("---@param ... any");
            out.write(format_args!("function {GOM}.{LOG}.{level}(...) end\n\n"));
        }
    }
}
