// gom/src/scripting/lua_interpreter.rs
use crate::interpreter::interpreter::{Interpreter, InterpreterHistory};
use crate::scripting::modules::lua_module::register_all_modules;
use crate::reflection::registry::{TypeRegistry, WeakTypeRegistry};
use crate::scripting::interop::{push, to_native};
use crate::scripting::lua_constants::LUA_CHANNEL;
use crate::types::error::GomResult;
use crate::types::any::Any;
use mlua::prelude::LuaResult;
use mlua::Value as LuaValue;
use std::path::Path;
use mlua::Lua;
use std::fs;
use crate::*;

/// Lua state with the `gom` API installed.
pub struct LuaInterpreter {
    lua: Lua,
    registry: WeakTypeRegistry,
    history: InterpreterHistory,
}

impl LuaInterpreter {
    /// Creates a state bound to `registry` and registers every Lua module.
    pub fn new(registry: &TypeRegistry) -> LuaResult<Self> {
        let lua = Lua::new();
        lua.set_app_data(registry.downgrade());
        register_all_modules(&lua)?;
        Ok(Self {
            lua,
            registry: registry.downgrade(),
            history: InterpreterHistory::default(),
        })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    fn run(&self, chunk: &str, name: &str, log: bool) -> bool {
        match self.lua.load(chunk).set_name(name).exec() {
            Ok(()) => true,
            Err(e) => {
                if log {
                    gom_err!(LUA_CHANNEL, "{}", e);
                }
                false
            }
        }
    }
}

impl Interpreter for LuaInterpreter {
    fn language(&self) -> &'static str {
        "Lua"
    }

    fn filename_extension(&self) -> &'static str {
        "lua"
    }

    fn registry(&self) -> GomResult<TypeRegistry> {
        self.registry.get()
    }

    fn execute(&self, command: &str, save_in_history: bool, log: bool) -> bool {
        let ok = self.run(command, "=command", log);
        if ok && save_in_history {
            self.history.push(command);
        }
        ok
    }

    fn execute_file(&self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(source) => self.run(&source, &format!("@{}", path.display()), true),
            Err(e) => {
                gom_err!(LUA_CHANNEL, "Could not read {} ({})", path.display(), e);
                false
            }
        }
    }

    fn bind(&self, id: &str, value: &Any) -> bool {
        let result = push(&self.lua, value).and_then(|v| self.lua.globals().set(id, v));
        match result {
            Ok(()) => true,
            Err(e) => {
                gom_err!(LUA_CHANNEL, "Could not bind {} ({})", id, e);
                false
            }
        }
    }

    fn resolve(&self, id: &str) -> Any {
        let result = self
            .lua
            .globals()
            .get::<LuaValue>(id)
            .and_then(|v| to_native(&self.lua, v, None));
        result.unwrap_or_else(|e| {
            gom_err!(LUA_CHANNEL, "Could not resolve {} ({})", id, e);
            Any::null()
        })
    }

    fn eval(&self, expression: &str) -> Any {
        let result = self
            .lua
            .load(expression)
            .set_name("=eval")
            .eval::<LuaValue>()
            .and_then(|v| to_native(&self.lua, v, None));
        result.unwrap_or_else(|e| {
            gom_err!(LUA_CHANNEL, "{}", e);
            Any::null()
        })
    }

    fn history(&self) -> &InterpreterHistory {
        &self.history
    }
}
