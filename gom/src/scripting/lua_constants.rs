// gom/src/scripting/lua_constants.rs

/// GLOBALS
pub const GOM: &str = "gom";

// gom APIS
pub const CREATE: &str = "create";
pub const DECLARE_CLASS: &str = "declare_class";
pub const RESOLVE_META_TYPE: &str = "resolve_meta_type";
pub const FIND_OBJECT: &str = "find_object";
pub const CONNECT: &str = "connect";
pub const BIND: &str = "bind";
pub const CONFIG: &str = "config";
pub const LOG: &str = "log";

/// Key naming the class in `gom.create{classname = ...}`.
pub const CLASSNAME: &str = "classname";

// Log levels
pub const LOG_INFO: &str = "info";
pub const LOG_WARN: &str = "warn";
pub const LOG_ERROR: &str = "err";
pub const LOG_DEBUG: &str = "debug";

// Channels
pub const LUA_CHANNEL: &str = "Lua";
pub const GOM_LUA_CHANNEL: &str = "GOMLua";
