// ============================================
// Save System - Сохранение мира и шаблонов
// ============================================
// Бинарные файлы с заголовком и ZSTD сжатием, объекты в JSON

mod control_file;
mod header;
mod template_file;
mod world_file;

use thiserror::Error;

pub use control_file::ControlFile;
pub use header::{SaveHeader, SAVE_VERSION, TEMPLATE_MAGIC, WORLD_MAGIC};
pub use template_file::{DiskTemplates, TEMPLATE_EXTENSION};
pub use world_file::WorldFile;

/// Ошибки сохранения/загрузки
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialize(String),
    #[error("corrupt save data: {0}")]
    Deserialize(String),
    #[error("not a region tools file")]
    InvalidMagic,
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),
    #[error("compression failed: {0}")]
    Compression(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}
