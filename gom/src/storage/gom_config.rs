// gom/src/storage/gom_config.rs
use std::error::Error;
use std::sync::RwLock;
use ron::from_str;
use ron::ser::{PrettyConfig, to_string_pretty};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use directories_next::ProjectDirs;
use once_cell::sync::Lazy;
use std::fs;
use crate::*;

pub const CONFIG_FILE_NAME: &str = "gom_config.ron";

pub static GOM_CONFIG: Lazy<RwLock<GomConfig>> = Lazy::new(|| RwLock::new(load_config()));

/// User settings of the runtime and of the shell.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GomConfig {
    /// Filter string handed to the logger, e.g. `"info"` or `"debug, GOMLua=trace"`.
    pub log_level: String,
    pub log_to_file: bool,
    /// Where log files go. Defaults to `<app dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// Where the shell saves the interpreter history on exit.
    pub history_file: Option<PathBuf>,
    /// Language used by the interactive shell.
    pub default_language: String,
}

impl Default for GomConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: true,
            log_dir: None,
            history_file: None,
            default_language: "Lua".to_string(),
        }
    }
}

/// Saves the in memory config to the .ron file in the app dir.
pub fn save_config() -> Result<(), Box<dyn Error>> {
    let path = config_path().ok_or("Could not resolve app directory.")?;
    let config = GOM_CONFIG.read().map_err(|e| e.to_string())?.clone();
    save_config_to(&path, &config)
}

/// Writes a config as pretty ron.
pub fn save_config_to(path: &Path, config: &GomConfig) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let ron = to_string_pretty(config, PrettyConfig::default())?;
    fs::write(path, ron)?;
    Ok(())
}

/// Reads a config file. Missing or broken files give the defaults.
pub fn load_config_from(path: &Path) -> GomConfig {
    match fs::read_to_string(path) {
        Ok(txt) => match from_str(&txt) {
            Ok(config) => config,
            Err(e) => {
                gom_err!("GOM", "Invalid config {}: {e}.", path.display());
                GomConfig::default()
            }
        },
        Err(e) => {
            gom_warn!("GOM", "Error loading config {}: {e}.", path.display());
            GomConfig::default()
        }
    }
}

/// Returns the app_dir for the program.
pub fn app_dir() -> Option<PathBuf> {
    match ProjectDirs::from("org", "graphite", "gom") {
        Some(project_dir) => Some(project_dir.config_dir().to_path_buf()),
        None => {
            gom_err!("GOM", "Could not resolve app directory.");
            None
        }
    }
}

/// Directory log files are written to.
pub fn log_dir(config: &GomConfig) -> PathBuf {
    config
        .log_dir
        .clone()
        .or_else(|| app_dir().map(|dir| dir.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn load_config() -> GomConfig {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => GomConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = GomConfig {
            log_level: "debug".to_string(),
            log_to_file: false,
            log_dir: Some(dir.path().join("logs")),
            history_file: Some(dir.path().join("history.lua")),
            default_language: "Python".to_string(),
        };

        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "(log_level: \"warn\")").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.log_level, "warn");
        assert!(config.log_to_file);
        assert_eq!(config.default_language, "Lua");
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "(log_level: ").unwrap();

        assert_eq!(load_config_from(&path), GomConfig::default());
        assert_eq!(crate::logging::logging::last_log().unwrap().channel, "GOM");
    }

    #[test]
    fn explicit_log_dir_wins() {
        let config = GomConfig { log_dir: Some(PathBuf::from("/tmp/gom-logs")), ..Default::default() };
        assert_eq!(log_dir(&config), PathBuf::from("/tmp/gom-logs"));
    }
}
