// gom/src/scripting/lua_callable.rs
use mlua::prelude::LuaResult;
use mlua::Value as LuaValue;
use mlua::MultiValue;
use mlua::Function;
use mlua::WeakLua;
use mlua::Lua;
use crate::scripting::interop::{args_to_table, push, to_native};
use crate::scripting::lua_constants::LUA_CHANNEL;
use crate::reflection::meta_property::SETTER_ARG;
use crate::types::error::{GomError, GomResult};
use crate::types::callable::Callable;
use crate::types::arg_list::ArgList;
use crate::types::any::Any;
use crate::*;

/// A Lua function called from Rust.
///
/// Unnamed args, or a single `value` arg, are passed positionally. Other
/// named args are passed as one table.
pub struct LuaCallable {
    function: Function,
    lua: WeakLua,
}

impl LuaCallable {
    pub fn new(lua: &Lua, function: Function) -> Self {
        Self { function, lua: lua.weak() }
    }

    fn call(&self, lua: &Lua, args: &ArgList) -> LuaResult<Any> {
        let positional = args.is_empty()
            || args.has_unnamed_args()
            || (args.nb_args() == 1 && args.ith_arg_name(0) == SETTER_ARG);
        let result: LuaValue = if positional {
            let values = args
                .iter()
                .map(|(_, value)| push(lua, value))
                .collect::<LuaResult<Vec<LuaValue>>>()?;
            self.function.call(MultiValue::from_vec(values))?
        } else {
            self.function.call(args_to_table(lua, args)?)?
        };
        to_native(lua, result, None)
    }
}

impl Callable for LuaCallable {
    fn invoke(&self, args: &ArgList) -> GomResult<Any> {
        let Some(lua) = self.lua.try_upgrade() else {
            gom_err!(LUA_CHANNEL, "Lua function called after its interpreter was closed");
            return Err(GomError::script("Lua", "interpreter was closed"));
        };
        self.call(&lua, args).map_err(|e| {
            gom_err!(LUA_CHANNEL, "{}", e);
            GomError::script("Lua", e.to_string())
        })
    }

    fn describe(&self) -> String {
        "Lua function".to_string()
    }
}
