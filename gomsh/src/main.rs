// gomsh/src/main.rs
use gom::scripting::modules::lua_module::generate_lua_api;
use gom::scripting::lua_interpreter::LuaInterpreter;
use gom::interpreter::interpreter::Interpreter;
use gom::storage::gom_config::{GomConfig, GOM_CONFIG};
use gom::logging::logging::init_logger;
use gom::reflection::registry::TypeRegistry;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::path::PathBuf;
use std::env;

const USAGE: &str = "usage: gomsh [--lang lua|python] [--emit-api DIR] [SCRIPT...]";

/// Command line of the shell.
#[derive(Default)]
struct Options {
    language: Option<String>,
    emit_api: Option<PathBuf>,
    scripts: Vec<PathBuf>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut options = Options::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--lang" => options.language = Some(args.next().ok_or("--lang needs a value")?),
                "--emit-api" => options.emit_api = Some(PathBuf::from(args.next().ok_or("--emit-api needs a directory")?)),
                "-h" | "--help" => return Err(USAGE.to_string()),
                _ if arg.starts_with("--") => return Err(format!("unknown option {arg}\n{USAGE}")),
                _ => options.scripts.push(PathBuf::from(arg)),
            }
        }
        Ok(options)
    }

    /// Language of the session: explicit, else from the first script, else the configured default.
    fn language(&self, config: &GomConfig) -> String {
        if let Some(language) = &self.language {
            return language.to_lowercase();
        }
        let from_script = self
            .scripts
            .first()
            .and_then(|path| path.extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| if ext == "py" { "python" } else { "lua" });
        from_script.map(str::to_string).unwrap_or_else(|| config.default_language.to_lowercase())
    }
}

fn create_interpreter(language: &str, registry: &TypeRegistry) -> Option<Box<dyn Interpreter>> {
    match language {
        "lua" => match LuaInterpreter::new(registry) {
            Ok(lua) => Some(Box::new(lua)),
            Err(e) => {
                gom::gom_err!("GOM", "Could not create the Lua interpreter: {e}");
                None
            }
        },
        #[cfg(feature = "python")]
        "python" => match gom::python::python_interpreter::PythonInterpreter::new(registry) {
            Ok(python) => Some(Box::new(python)),
            Err(e) => {
                gom::gom_err!("GOM", "Could not create the Python interpreter: {e}");
                None
            }
        },
        other => {
            gom::gom_err!("GOM", "Unsupported language {other}");
            None
        }
    }
}

// Reads commands from stdin until end of input. Lines starting with `=`
// are evaluated and printed.
fn repl(interpreter: &dyn Interpreter) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "{}> ", interpreter.language())?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let command = line.trim();
        if command == "quit" || command == "exit" {
            break;
        }
        if let Some(expression) = command.strip_prefix('=') {
            writeln!(stdout, "{}", interpreter.eval(expression.trim()))?;
        } else if !command.is_empty() {
            interpreter.execute(command, true, true);
        }
        write!(stdout, "{}> ", interpreter.language())?;
        stdout.flush()?;
    }
    writeln!(stdout)
}

fn run(registry: &TypeRegistry, config: &GomConfig, options: &Options) -> bool {
    if let Some(dir) = &options.emit_api {
        if let Err(e) = generate_lua_api(dir) {
            gom::gom_err!("GOM", "Could not write the Lua API to {}: {e}", dir.display());
            return false;
        }
        println!("Written to: {}", dir.display());
        if options.scripts.is_empty() {
            return true;
        }
    }

    let Some(interpreter) = create_interpreter(&options.language(config), registry) else {
        return false;
    };

    let ok = if options.scripts.is_empty() {
        match repl(interpreter.as_ref()) {
            Ok(()) => true,
            Err(e) => {
                gom::gom_err!("GOM", "{e}");
                false
            }
        }
    } else {
        options.scripts.iter().all(|script| interpreter.execute_file(script))
    };

    if let Some(path) = &config.history_file {
        interpreter.save_history(path);
    }
    ok
}

fn main() -> ExitCode {
    let options = match Options::parse(env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let config = GOM_CONFIG.read().map(|c| c.clone()).unwrap_or_default();
    // Keep the handle alive so buffered messages are flushed on exit.
    let _logger = init_logger(&config).map_err(|e| eprintln!("Could not start the logger: {e}")).ok();

    let registry = TypeRegistry::new();
    let ok = run(&registry, &config, &options);
    registry.shutdown();

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gom::logging::logging::last_log;

    fn parse(args: &[&str]) -> Result<Options, String> {
        Options::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn scripts_pick_the_language() {
        let config = GomConfig::default();
        assert_eq!(parse(&["run.py"]).unwrap().language(&config), "python");
        assert_eq!(parse(&["run.lua"]).unwrap().language(&config), "lua");
        assert_eq!(parse(&["--lang", "Python", "run.lua"]).unwrap().language(&config), "python");
        assert_eq!(parse(&[]).unwrap().language(&config), "lua");
    }

    #[test]
    fn bad_options_are_reported() {
        assert!(parse(&["--lang"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert_eq!(parse(&["--emit-api", "out"]).unwrap().emit_api, Some(PathBuf::from("out")));
    }

    #[test]
    fn unsupported_languages_reach_the_status_line() {
        let registry = TypeRegistry::new();
        assert!(create_interpreter("cobol", &registry).is_none());
        let last = last_log().unwrap();
        assert_eq!(last.channel, "GOM");
        assert!(last.message.contains("Unsupported language cobol"));
    }
}
