use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::constants;

/// Runtime settings. Every field has a default so a config file may name only what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window_width: u32,
    pub window_height: u32,
    pub shader_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub max_fps: i32,
    /// Enables the Khronos validation layer and debug-utils object names.
    pub validation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_width: constants::WINDOW_WIDTH,
            window_height: constants::WINDOW_HEIGHT,
            shader_dir: PathBuf::from(constants::SHADERS_DIR),
            log_dir: PathBuf::from(constants::LOG_DIR),
            log_level: String::from("debug"),
            max_fps: constants::MAX_FPS,
            validation: cfg!(debug_assertions),
        }
    }
}

impl Config {
    /// Loads the config file if it exists, defaults otherwise.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;

        Config::from_json(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Config, serde_json::Error> {
        let mut config: Config = serde_json::from_str(text)?;
        if config.max_fps <= 0 {
            config.max_fps = constants::MAX_FPS;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{ "window_width": 800, "validation": false }"#).unwrap();
        assert_eq!(config.window_width, 800);
        assert_eq!(config.window_height, constants::WINDOW_HEIGHT);
        assert_eq!(config.shader_dir, PathBuf::from(constants::SHADERS_DIR));
        assert!(!config.validation);
    }

    #[test]
    fn non_positive_fps_is_replaced() {
        let config = Config::from_json(r#"{ "max_fps": 0 }"#).unwrap();
        assert_eq!(config.max_fps, constants::MAX_FPS);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("vkray.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "shader_dir": "out/spv", "log_level": "info" }}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.shader_dir, PathBuf::from("out/spv"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn broken_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ window_width: ").unwrap();

        assert!(matches!(Config::load(file.path()), Err(Error::Config { .. })));
    }
}
