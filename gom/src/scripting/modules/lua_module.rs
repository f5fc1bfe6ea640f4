// gom/src/scripting/modules/lua_module.rs
use mlua::prelude::LuaResult;
use std::fmt::Write;
use std::path::Path;
use mlua::Table;
use mlua::Lua;
use crate::scripting::lua_constants::GOM;

/// Every part of the `gom` Lua API implements this.
pub trait LuaModule {
    /// Registers the module's functions, types and globals with the given Lua state.
    fn register(&self, lua: &Lua) -> LuaResult<()>;
}

/// Registry that the inventory crate will collect.
pub struct LuaModuleRegistry {
    /// Called once for every module when an interpreter starts.
    pub ctor: fn() -> Box<dyn LuaModule>,
}

// Collect all modules into a slice that lives for the whole program.
inventory::collect!(LuaModuleRegistry);

/// Lua signatures of a module, for editor completion.
pub trait LuaApi {
    /// Emit Lua signatures.
    fn emit_api(&self, out: &mut LuaApiWriter);
}

/// Writes the lua api for a module.
#[derive(Default)]
pub struct LuaApiWriter {
    pub buf: String,
}

impl LuaApiWriter {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    pub fn line(&mut self, s: &str) {
        self.buf.push_str(s);
        self.buf.push('\n');
    }

    pub fn write(&mut self, args: std::fmt::Arguments) {
        let _ = self.buf.write_fmt(args);
    }
}

pub struct LuaApiRegistry {
    pub name: &'static str,
    pub ctor: fn() -> Box<dyn LuaApi>,
}

inventory::collect!(LuaApiRegistry);

#[macro_export]
macro_rules! register_lua_module {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::scripting::modules::lua_module::LuaModuleRegistry {
                ctor: || {
                    // Enforces each module to implement its api generation.
                    fn _assert<T: $crate::scripting::modules::lua_module::LuaExposedModule>() {}
                    _assert::<$ty>();
                    Box::new(<$ty>::default())
                },
            }
        }
        $crate::inventory::submit! {
            $crate::scripting::modules::lua_module::LuaApiRegistry {
                name: stringify!($ty),
                ctor: || Box::new(<$ty>::default()),
            }
        }
    };
}

pub trait LuaExposedModule: LuaModule + LuaApi {}

impl<T> LuaExposedModule for T
where
    T: LuaModule + LuaApi
{}

/// Registers every collected module with `lua`.
pub fn register_all_modules(lua: &Lua) -> LuaResult<()> {
    for reg in inventory::iter::<LuaModuleRegistry> {
        (reg.ctor)().register(lua)?;
    }
    Ok(())
}

/// The global `gom` table, created on first use.
pub fn gom_table(lua: &Lua) -> LuaResult<Table> {
    let globals = lua.globals();
    match globals.get::<Option<Table>>(GOM)? {
        Some(table) => Ok(table),
        None => {
            let table = lua.create_table()?;
            globals.set(GOM, table.clone())?;
            Ok(table)
        }
    }
}

/// Writes the module api to a .lua file per module.
pub fn generate_lua_api(out_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(out_dir)?;

    for reg in inventory::iter::<LuaApiRegistry> {
        let module = (reg.ctor)();
        let mut writer = LuaApiWriter::new();
        module.emit_api(&mut writer);

        let name = reg.name.rsplit("::").next().unwrap_or(reg.name).to_lowercase();
        std::fs::write(out_dir.join(format!("{name}.lua")), writer.buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_stubs_are_written_per_module() {
        let dir = tempfile::tempdir().unwrap();
        generate_lua_api(dir.path()).unwrap();

        let gom = std::fs::read_to_string(dir.path().join("gommodule.lua")).unwrap();
        assert!(gom.contains("function gom.create(classname, ...) end"));
        let log = std::fs::read_to_string(dir.path().join("logmodule.lua")).unwrap();
        assert!(log.contains("gom.log"));
    }
}
