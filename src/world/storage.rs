// ============================================
// Block Storage - Хранилище вокселей мира
// ============================================
// Разреженное хранилище: отсутствующий воксель = воздух

use std::collections::{BTreeSet, HashMap};

use crate::blocks::{Material, MaterialPalette};
use crate::config::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_FILL_VOLUME, DEFAULT_MIN_HEIGHT};

use super::BlockPos;

/// Доступ к вокселям мира (get/set)
pub trait WorldAccess {
    /// Материал в позиции (воздух, если ничего нет)
    fn material_at(&self, pos: BlockPos) -> Material;

    /// Поставить материал. Возвращает true, если воксель изменился
    fn set_material(&mut self, pos: BlockPos, material: &Material) -> bool;
}

/// Хранилище вокселей
#[derive(Debug, Clone)]
pub struct BlockStorage {
    /// Палитра, индекс 0 всегда воздух
    palette: MaterialPalette,
    /// Непустые воксели: позиция -> индекс палитры
    blocks: HashMap<BlockPos, u16>,
    /// Секции, изменённые с последнего take_dirty_sections
    dirty_sections: BTreeSet<(i32, i32, i32)>,
    /// Версия изменений (инкрементируется при каждом изменении)
    version: u64,
    min_height: i32,
    max_height: i32,
    pub(super) max_fill_volume: u64,
}

impl BlockStorage {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MIN_HEIGHT, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_FILL_VOLUME)
    }

    pub fn with_limits(min_height: i32, max_height: i32, max_fill_volume: u64) -> Self {
        Self {
            palette: MaterialPalette::with_reserved(Material::air()),
            blocks: HashMap::new(),
            dirty_sections: BTreeSet::new(),
            version: 0,
            min_height: min_height.min(max_height),
            max_height: max_height.max(min_height),
            max_fill_volume,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn min_height(&self) -> i32 {
        self.min_height
    }

    pub fn max_height(&self) -> i32 {
        self.max_height
    }

    /// Находится ли Y внутри границ мира
    pub fn in_build_height(&self, y: i32) -> bool {
        (self.min_height..=self.max_height).contains(&y)
    }

    /// Количество непустых вокселей
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Все непустые воксели (порядок не определён)
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, &Material)> + '_ {
        self.blocks
            .iter()
            .filter_map(|(&pos, &idx)| self.palette.get(idx).map(|m| (pos, m)))
    }

    /// Получить и очистить список грязных секций
    pub fn take_dirty_sections(&mut self) -> Vec<(i32, i32, i32)> {
        std::mem::take(&mut self.dirty_sections).into_iter().collect()
    }

    pub fn has_dirty_sections(&self) -> bool {
        !self.dirty_sections.is_empty()
    }
}

impl Default for BlockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldAccess for BlockStorage {
    fn material_at(&self, pos: BlockPos) -> Material {
        self.blocks
            .get(&pos)
            .and_then(|&idx| self.palette.get(idx))
            .cloned()
            .unwrap_or_default()
    }

    fn set_material(&mut self, pos: BlockPos, material: &Material) -> bool {
        if !self.in_build_height(pos.y) {
            return false;
        }

        let idx = self.palette.get_or_insert(material);
        let previous = if idx == 0 {
            self.blocks.remove(&pos)
        } else {
            self.blocks.insert(pos, idx)
        };
        if previous.unwrap_or(0) == idx {
            return false;
        }

        self.version += 1;
        self.dirty_sections.insert(pos.section_key());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_voxels_are_air() {
        let storage = BlockStorage::new();
        assert!(storage.material_at(BlockPos::new(1, 2, 3)).is_air());
        assert_eq!(storage.block_count(), 0);
    }

    #[test]
    fn set_reports_changes_only() {
        let mut storage = BlockStorage::new();
        let pos = BlockPos::new(10, 64, 10);
        let stone = Material::new("stone");

        assert!(storage.set_material(pos, &stone));
        assert!(!storage.set_material(pos, &stone));
        assert_eq!(storage.material_at(pos), stone);
        assert_eq!(storage.version(), 1);

        assert!(storage.set_material(pos, &Material::air()));
        assert_eq!(storage.block_count(), 0);
        assert!(!storage.set_material(pos, &Material::air()));
        assert_eq!(storage.take_dirty_sections(), vec![(0, 4, 0)]);
        assert!(!storage.has_dirty_sections());
    }

    #[test]
    fn respects_build_height() {
        let mut storage = BlockStorage::with_limits(0, 15, 100);
        assert!(!storage.set_material(BlockPos::new(0, 16, 0), &Material::new("stone")));
        assert!(!storage.set_material(BlockPos::new(0, -1, 0), &Material::new("stone")));
        assert!(storage.set_material(BlockPos::new(0, 15, 0), &Material::new("stone")));
    }
}
