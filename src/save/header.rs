// ============================================
// Save Header - Заголовок бинарных файлов
// ============================================
// Файл = заголовок (bincode) + ZSTD(bincode(тело))

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::SaveError;

/// "RTWD" - файл вокселей мира
pub const WORLD_MAGIC: [u8; 4] = *b"RTWD";
/// "RTPL" - файл шаблона
pub const TEMPLATE_MAGIC: [u8; 4] = *b"RTPL";

/// Версия формата сохранения
pub const SAVE_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

/// Заголовок файла (8 байт)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    /// Магическое число для валидации
    pub magic: [u8; 4],
    /// Версия формата
    pub version: u32,
}

impl SaveHeader {
    pub fn new(magic: [u8; 4]) -> Self {
        Self {
            magic,
            version: SAVE_VERSION,
        }
    }

    /// Проверка заголовка против ожидаемого типа файла
    pub fn check(&self, magic: [u8; 4]) -> Result<(), SaveError> {
        if self.magic != magic {
            return Err(SaveError::InvalidMagic);
        }
        if self.version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Записать заголовок и сжатое тело. Пишем во временный файл и
/// переименовываем, чтобы старый файл заменялся целиком.
pub fn write_file<T: Serialize>(path: &Path, magic: [u8; 4], body: &T) -> Result<(), SaveError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);

        // 1. Заголовок
        let header_bytes = bincode::serialize(&SaveHeader::new(magic))
            .map_err(|e| SaveError::Serialize(e.to_string()))?;
        writer.write_all(&header_bytes)?;

        // 2. Тело: bincode + ZSTD
        let body_bytes = bincode::serialize(body).map_err(|e| SaveError::Serialize(e.to_string()))?;
        let compressed = zstd::encode_all(&body_bytes[..], ZSTD_LEVEL)
            .map_err(|e| SaveError::Compression(e.to_string()))?;
        writer.write_all(&compressed)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Прочитать файл, проверив заголовок
pub fn read_file<T: DeserializeOwned>(path: &Path, magic: [u8; 4]) -> Result<T, SaveError> {
    let mut reader = BufReader::new(File::open(path)?);

    // 1. Заголовок
    let header_size = bincode::serialized_size(&SaveHeader::new(magic))
        .map_err(|e| SaveError::Serialize(e.to_string()))? as usize;
    let mut header_bytes = vec![0u8; header_size];
    reader.read_exact(&mut header_bytes)?;
    let header: SaveHeader =
        bincode::deserialize(&header_bytes).map_err(|e| SaveError::Deserialize(e.to_string()))?;
    header.check(magic)?;

    // 2. Тело
    let mut compressed = Vec::new();
    reader.read_to_end(&mut compressed)?;
    let body_bytes =
        zstd::decode_all(&compressed[..]).map_err(|e| SaveError::Compression(e.to_string()))?;
    bincode::deserialize(&body_bytes).map_err(|e| SaveError::Deserialize(e.to_string()))
}
