// ============================================
// Template - Сохранённый фрагмент мира
// ============================================
// Размер + палитра + плоский массив индексов (X быстрее всех).
// Индекс палитры 0 = structure_void, при вставке пропускается.

use ndshape::{RuntimeShape, Shape};
use serde::{Deserialize, Serialize};

use crate::blocks::{Material, MaterialPalette};
use crate::region::Region;
use crate::world::{BlockPos, WorldAccess};

use super::TemplateError;

/// Предел объёма одного шаблона (вокселей)
pub const MAX_TEMPLATE_VOLUME: u64 = 1 << 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    size: [u32; 3],
    palette: MaterialPalette,
    blocks: Vec<u16>,
}

impl Template {
    /// Снять содержимое региона
    pub fn capture<W: WorldAccess + ?Sized>(world: &W, region: Region) -> Result<Self, TemplateError> {
        let volume = region.volume();
        if volume > MAX_TEMPLATE_VOLUME {
            return Err(TemplateError::TooLarge {
                volume,
                max: MAX_TEMPLATE_VOLUME,
            });
        }

        let [lx, ly, lz] = region.lengths();
        let size = [lx as u32, ly as u32, lz as u32];
        let shape = RuntimeShape::<u32, 3>::new(size);
        let mut palette = MaterialPalette::with_reserved(Material::void());
        let mut blocks = vec![0u16; shape.usize()];

        let min = region.min();
        for pos in region.positions() {
            let material = world.material_at(pos);
            if material.is_void() {
                continue;
            }
            let local = pos - min;
            let i = shape.linearize([local.x as u32, local.y as u32, local.z as u32]);
            blocks[i as usize] = palette.get_or_insert(&material);
        }

        Ok(Self { size, palette, blocks })
    }

    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    /// Размер как вектор (для преобразований)
    pub fn extent(&self) -> BlockPos {
        BlockPos::new(self.size[0] as i32, self.size[1] as i32, self.size[2] as i32)
    }

    pub fn volume(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Материал в локальной позиции; None для void и вне шаблона
    pub fn material_at(&self, local: [u32; 3]) -> Option<&Material> {
        if (0..3).any(|axis| local[axis] >= self.size[axis]) {
            return None;
        }
        let i = self.shape().linearize(local) as usize;
        match self.blocks.get(i).copied() {
            Some(0) | None => None,
            Some(idx) => self.palette.get(idx),
        }
    }

    /// Все непустые воксели: (локальная позиция, материал)
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, &Material)> + '_ {
        let shape = self.shape();
        self.blocks.iter().enumerate().filter_map(move |(i, &idx)| {
            if idx == 0 {
                return None;
            }
            let [x, y, z] = shape.delinearize(i as u32);
            self.palette
                .get(idx)
                .map(|m| (BlockPos::new(x as i32, y as i32, z as i32), m))
        })
    }

    pub fn non_void_count(&self) -> usize {
        self.blocks.iter().filter(|&&idx| idx != 0).count()
    }

    /// Проверка после загрузки с диска
    pub fn validate(&mut self) -> Result<(), TemplateError> {
        let corrupt = |reason: String| TemplateError::Corrupt(reason);
        let expected = self
            .size
            .iter()
            .try_fold(1u64, |acc, &s| acc.checked_mul(s as u64))
            .filter(|&v| v > 0 && v <= MAX_TEMPLATE_VOLUME)
            .ok_or_else(|| corrupt(format!("bad template size {:?}", self.size)))?;
        if self.blocks.len() as u64 != expected {
            return Err(corrupt(format!(
                "template holds {} voxels, expected {}",
                self.blocks.len(),
                expected
            )));
        }
        if self.palette.is_empty() {
            return Err(corrupt("empty template palette".to_string()));
        }
        let len = self.palette.len();
        if let Some(bad) = self.blocks.iter().find(|&&idx| idx as usize >= len) {
            return Err(corrupt(format!("palette index {} out of range {}", bad, len)));
        }
        self.palette.rebuild_reverse_map();
        Ok(())
    }

    fn shape(&self) -> RuntimeShape<u32, 3> {
        RuntimeShape::<u32, 3>::new(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::BlockStorage;

    fn hut(storage: &mut BlockStorage) -> Region {
        let stone = Material::new("stone");
        storage.set_material(BlockPos::new(10, 64, 10), &stone);
        storage.set_material(BlockPos::new(11, 65, 12), &Material::new("glass"));
        storage.set_material(BlockPos::new(12, 64, 10), &Material::void());
        Region::new(BlockPos::new(10, 64, 10), BlockPos::new(12, 65, 12))
    }

    #[test]
    fn capture_keeps_local_layout() {
        let mut storage = BlockStorage::new();
        let region = hut(&mut storage);
        let template = Template::capture(&storage, region).unwrap();

        assert_eq!(template.size(), [3, 2, 3]);
        assert_eq!(template.volume(), 18);
        assert_eq!(template.material_at([0, 0, 0]).map(Material::id), Some("stone"));
        assert_eq!(template.material_at([1, 1, 2]).map(Material::id), Some("glass"));
        // void не попадает в шаблон, воздух попадает
        assert_eq!(template.material_at([2, 0, 0]), None);
        assert_eq!(template.material_at([1, 0, 0]).map(Material::id), Some("air"));
        assert_eq!(template.material_at([3, 0, 0]), None);
        assert_eq!(template.non_void_count(), 17);
    }

    #[test]
    fn iter_reports_local_positions() {
        let mut storage = BlockStorage::new();
        let region = hut(&mut storage);
        let template = Template::capture(&storage, region).unwrap();

        let glass: Vec<_> = template.iter().filter(|(_, m)| m.id() == "glass").collect();
        assert_eq!(glass.len(), 1);
        assert_eq!(glass[0].0, BlockPos::new(1, 1, 2));
    }

    #[test]
    fn oversized_capture_is_refused() {
        let storage = BlockStorage::new();
        let region = Region::new(BlockPos::ZERO, BlockPos::new(1023, 1023, 1023));
        assert!(matches!(
            Template::capture(&storage, region),
            Err(TemplateError::TooLarge { .. })
        ));
    }

    #[test]
    fn validate_catches_corruption() {
        let mut storage = BlockStorage::new();
        let region = hut(&mut storage);
        let mut template = Template::capture(&storage, region).unwrap();
        assert!(template.validate().is_ok());

        let mut broken = template.clone();
        broken.blocks.pop();
        assert!(broken.validate().is_err());

        template.blocks[0] = 99;
        assert!(matches!(template.validate(), Err(TemplateError::Corrupt(_))));
    }

    #[test]
    fn validate_rejects_overflowing_size() {
        let mut storage = BlockStorage::new();
        let region = hut(&mut storage);
        let mut template = Template::capture(&storage, region).unwrap();
        template.size = [u32::MAX; 3];
        template.blocks = vec![0];
        assert!(matches!(template.validate(), Err(TemplateError::Corrupt(_))));

        template.size = [0, 1, 1];
        template.blocks = Vec::new();
        assert!(matches!(template.validate(), Err(TemplateError::Corrupt(_))));
    }
}
