// ============================================
// World File - Чтение/запись вокселей мира
// ============================================
// Храним только непустые секции 16x16x16, у каждой своя палитра,
// индексы упакованы по битам. Тело сжимается ZSTD.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::blocks::Material;
use crate::world::{BlockPos, BlockStorage, WorldAccess, SECTION_SIZE};

use super::header::{read_file, write_file, WORLD_MAGIC};
use super::SaveError;

const SECTION_VOLUME: usize = (SECTION_SIZE * SECTION_SIZE * SECTION_SIZE) as usize; // 4096

/// Сжатая секция с палитрой
#[derive(Debug, Serialize, Deserialize)]
struct SavedSection {
    /// Координаты секции
    cx: i32,
    sy: i32,
    cz: i32,
    /// Палитра; индекс 0 = "нет блока"
    palette: Vec<Material>,
    /// Индексы в палитру (4096 значений, упакованы)
    data: Vec<u8>,
    /// Бит на индекс (1, 2, 4, 8, 16)
    bits_per_block: u8,
}

/// Тело файла (сжимается ZSTD)
#[derive(Debug, Serialize, Deserialize)]
struct SaveBody {
    sections: Vec<SavedSection>,
}

/// Основной интерфейс для работы с файлом мира
pub struct WorldFile;

impl WorldFile {
    /// Сохранить воксели. Возвращает число записанных секций
    pub fn save(path: impl AsRef<Path>, storage: &BlockStorage) -> Result<usize, SaveError> {
        let sections = Self::build_sections(storage);
        let count = sections.len();
        write_file(path.as_ref(), WORLD_MAGIC, &SaveBody { sections })?;
        log::info!(
            "[SAVE] World saved to {} ({} blocks, {} sections)",
            path.as_ref().display(),
            storage.block_count(),
            count
        );
        Ok(count)
    }

    /// Загрузить воксели в `storage` (грязные секции не выставляются)
    pub fn load(path: impl AsRef<Path>, storage: &mut BlockStorage) -> Result<usize, SaveError> {
        let body: SaveBody = read_file(path.as_ref(), WORLD_MAGIC)?;
        let mut loaded = 0;
        for (pos, material) in Self::extract_blocks(&body.sections)? {
            if storage.set_material(pos, material) {
                loaded += 1;
            }
        }
        storage.take_dirty_sections();
        log::info!("[SAVE] Loaded {} blocks from {}", loaded, path.as_ref().display());
        Ok(loaded)
    }

    /// Группируем воксели по секциям 16x16x16
    fn build_sections(storage: &BlockStorage) -> Vec<SavedSection> {
        let mut section_map: HashMap<(i32, i32, i32), Vec<(BlockPos, &Material)>> = HashMap::new();
        for (pos, material) in storage.iter() {
            section_map.entry(pos.section_key()).or_default().push((pos, material));
        }

        let mut keys: Vec<_> = section_map.keys().copied().collect();
        keys.sort_unstable();

        let mut sections = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(blocks) = section_map.remove(&key) else {
                continue;
            };
            let (cx, sy, cz) = key;

            // Индекс 0 = "нет блока" (placeholder)
            let mut palette: Vec<Material> = vec![Material::air()];
            let mut palette_map: HashMap<&Material, u16> = HashMap::new();
            let mut indices = vec![0u16; SECTION_VOLUME];

            for (pos, material) in blocks {
                let palette_idx = *palette_map.entry(material).or_insert_with(|| {
                    palette.push(material.clone());
                    (palette.len() - 1) as u16
                });
                indices[Self::local_index(pos)] = palette_idx;
            }

            let bits = bits_for(palette.len());
            sections.push(SavedSection {
                cx,
                sy,
                cz,
                palette,
                data: pack_indices(&indices, bits),
                bits_per_block: bits,
            });
        }
        sections
    }

    /// Извлекаем воксели из секций
    fn extract_blocks(sections: &[SavedSection]) -> Result<Vec<(BlockPos, &Material)>, SaveError> {
        let mut blocks = Vec::new();
        for section in sections {
            if !matches!(section.bits_per_block, 1 | 2 | 4 | 8 | 16) {
                return Err(SaveError::Deserialize(format!(
                    "section ({}, {}, {}) has {} bits per block",
                    section.cx, section.sy, section.cz, section.bits_per_block
                )));
            }
            let base = BlockPos::new(
                section.cx.saturating_mul(SECTION_SIZE),
                section.sy.saturating_mul(SECTION_SIZE),
                section.cz.saturating_mul(SECTION_SIZE),
            );
            let indices = unpack_indices(&section.data, section.bits_per_block);

            for (i, &palette_idx) in indices.iter().enumerate() {
                if palette_idx == 0 {
                    continue; // Нет блока
                }
                let material = section.palette.get(palette_idx as usize).ok_or_else(|| {
                    SaveError::Deserialize(format!("palette index {} out of range", palette_idx))
                })?;
                let lx = (i % 16) as i32;
                let lz = ((i / 16) % 16) as i32;
                let ly = (i / 256) as i32;
                blocks.push((base.offset(lx, ly, lz), material));
            }
        }
        Ok(blocks)
    }

    fn local_index(pos: BlockPos) -> usize {
        let lx = pos.x.rem_euclid(SECTION_SIZE) as usize;
        let ly = pos.y.rem_euclid(SECTION_SIZE) as usize;
        let lz = pos.z.rem_euclid(SECTION_SIZE) as usize;
        ly * 256 + lz * 16 + lx
    }
}

fn bits_for(palette_len: usize) -> u8 {
    if palette_len <= 2 { 1 }
    else if palette_len <= 4 { 2 }
    else if palette_len <= 16 { 4 }
    else if palette_len <= 256 { 8 }
    else { 16 }
}

/// Упаковка индексов в байты (младшие биты первыми)
fn pack_indices(indices: &[u16], bits: u8) -> Vec<u8> {
    let bits = bits as usize;
    let mut data = vec![0u8; (indices.len() * bits).div_ceil(8)];
    for (i, &idx) in indices.iter().enumerate() {
        for b in 0..bits {
            if (idx >> b) & 1 == 1 {
                let bit = i * bits + b;
                data[bit / 8] |= 1 << (bit % 8);
            }
        }
    }
    data
}

/// Распаковка индексов из байтов
fn unpack_indices(data: &[u8], bits: u8) -> Vec<u16> {
    let bits = bits as usize;
    let mut indices = Vec::with_capacity(SECTION_VOLUME);
    for i in 0..SECTION_VOLUME {
        let mut value = 0u16;
        for b in 0..bits {
            let bit = i * bits + b;
            let byte = data.get(bit / 8).copied().unwrap_or(0);
            if (byte >> (bit % 8)) & 1 == 1 {
                value |= 1 << b;
            }
        }
        indices.push(value);
    }
    indices
}
