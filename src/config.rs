use crate::geometry::PartialBounds;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// User settings read once per window creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Editor launched for console-log deep links. `None` lets the content pick.
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_devtools_theme")]
    pub default_devtools_theme: String,
    #[serde(default = "default_devtools_port")]
    pub default_devtools_port: u16,
    #[serde(default)]
    pub default_network_inspect: bool,
    #[serde(default)]
    pub zoom_level: Option<f64>,
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
    #[serde(default)]
    pub show_all_devtools_tab: bool,
    /// Reload devtools after this many script loads; negative disables it.
    #[serde(default = "default_times_js_load_to_refresh_devtools")]
    pub times_js_load_to_refresh_devtools: i32,
    /// Kept last so TOML output puts the table after plain values.
    #[serde(default)]
    pub window_bounds: Option<PartialBounds>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }

    /// Underlying error text without the path prefix.
    pub fn raw_message(&self) -> String {
        match self {
            ConfigError::Io { source, .. } => source.to_string(),
            ConfigError::Parse { source, .. } => source.to_string(),
        }
    }
}

/// Outcome of loading the config for a new window. A broken file still yields
/// usable defaults; the error is kept so the caller can report it.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: WindowConfig,
    pub broken: Option<ConfigError>,
}

fn default_font_family() -> String {
    "Menlo, monospace".to_string()
}
fn default_devtools_theme() -> String {
    "default".to_string()
}
fn default_devtools_port() -> u16 {
    19567
}
fn default_auto_update() -> bool {
    true
}
fn default_times_js_load_to_refresh_devtools() -> i32 {
    -1
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            editor: None,
            font_family: default_font_family(),
            default_devtools_theme: default_devtools_theme(),
            default_devtools_port: default_devtools_port(),
            default_network_inspect: false,
            zoom_level: None,
            auto_update: default_auto_update(),
            show_all_devtools_tab: false,
            window_bounds: None,
            times_js_load_to_refresh_devtools: default_times_js_load_to_refresh_devtools(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
        .join(".config")
        .join("debugger-windows")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl WindowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            let config = Self::default();
            if let Err(e) = config.save(path) {
                log::warn!("Could not write default config to {:?}: {}", path, e);
            }
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the config, falling back to defaults when the file is unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> LoadedConfig {
        match Self::load(path) {
            Ok(config) => LoadedConfig {
                config,
                broken: None,
            },
            Err(e) => {
                log::warn!("{}", e);
                LoadedConfig {
                    config: Self::default(),
                    broken: Some(e),
                }
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = Self::load(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults_and_writes_them() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let config = WindowConfig::load(&path).unwrap();
        assert_eq!(config, WindowConfig::default());
        assert!(path.exists());
        assert!(config.auto_update);
        assert_eq!(config.times_js_load_to_refresh_devtools, -1);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
editor = "code"
auto_update = false
zoom_level = 1.5

[window_bounds]
width = 1400.0
"#,
        )
        .unwrap();

        let config = WindowConfig::load(&path).unwrap();
        assert_eq!(config.editor.as_deref(), Some("code"));
        assert!(!config.auto_update);
        assert_eq!(config.zoom_level, Some(1.5));
        assert_eq!(config.font_family, default_font_family());
        let bounds = config.window_bounds.unwrap();
        assert_eq!(bounds.width, Some(1400.0));
        assert_eq!(bounds.x, None);
    }

    #[test]
    fn broken_file_reports_error_and_falls_back() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "editor = [unterminated").unwrap();

        let loaded = WindowConfig::load_or_default(&path);
        assert_eq!(loaded.config, WindowConfig::default());
        let err = loaded.broken.unwrap();
        assert_matches!(err, ConfigError::Parse { .. });
        assert_eq!(err.path(), path.as_path());
        assert!(!err.raw_message().is_empty());
    }

    #[test]
    fn reload_picks_up_changes() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = WindowConfig::load(&path).unwrap();

        std::fs::write(&path, "show_all_devtools_tab = true\n").unwrap();
        config.reload(&path).unwrap();
        assert!(config.show_all_devtools_tab);
    }
}
