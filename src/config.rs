// ============================================
// Config - Настройки сервера
// ============================================
// JSON-файл (необязательный) + переопределения из командной строки

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "0.0.0.0:25580";
pub const DEFAULT_WORLD_FILE: &str = "saves/world.dat";
pub const DEFAULT_CONTROLS_FILE: &str = "saves/controls.json";
pub const DEFAULT_TEMPLATE_DIR: &str = "saves/templates";

/// Ребро под-куба кусковой заливки
pub const DEFAULT_CHUNK_EDGE: i32 = 32;
/// Предел одного вызова ограниченной заливки
pub const DEFAULT_MAX_FILL_VOLUME: u64 = 32768;
pub const DEFAULT_MIN_HEIGHT: i32 = -64;
pub const DEFAULT_MAX_HEIGHT: i32 = 319;
pub const DEFAULT_SAVE_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub world_file: PathBuf,
    pub controls_file: PathBuf,
    pub template_dir: PathBuf,
    pub fill_chunk_edge: i32,
    pub max_fill_volume: u64,
    pub min_height: i32,
    pub max_height: i32,
    pub save_interval_secs: u64,
    /// Имена, которым разрешено редактировать. Пусто = всем
    pub operators: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            world_file: PathBuf::from(DEFAULT_WORLD_FILE),
            controls_file: PathBuf::from(DEFAULT_CONTROLS_FILE),
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            fill_chunk_edge: DEFAULT_CHUNK_EDGE,
            max_fill_volume: DEFAULT_MAX_FILL_VOLUME,
            min_height: DEFAULT_MIN_HEIGHT,
            max_height: DEFAULT_MAX_HEIGHT,
            save_interval_secs: DEFAULT_SAVE_INTERVAL_SECS,
            operators: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_operator(&self, name: &str) -> bool {
        self.operators.is_empty() || self.operators.iter().any(|op| op == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = ServerConfig::from_json(r#"{ "bind": "127.0.0.1:4000", "operators": ["alex"] }"#).unwrap();
        assert_eq!(config.bind, "127.0.0.1:4000");
        assert_eq!(config.fill_chunk_edge, DEFAULT_CHUNK_EDGE);
        assert_eq!(config.template_dir, PathBuf::from(DEFAULT_TEMPLATE_DIR));
        assert!(config.is_operator("alex"));
        assert!(!config.is_operator("sam"));
    }

    #[test]
    fn empty_operator_list_allows_everyone() {
        assert!(ServerConfig::default().is_operator("anyone"));
    }

    #[test]
    fn load_reports_path() {
        let err = ServerConfig::load_from_file("definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("here.json"));

        let path = std::env::temp_dir().join(format!("region_tools_cfg_{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let err = ServerConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        fs::remove_file(&path).ok();
    }
}
