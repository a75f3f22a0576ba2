// ============================================
// Bounded Fill - Ограниченная заливка объёма
// ============================================
// Аналог команды /fill: один вызов не больше max_fill_volume блоков

use crate::blocks::{global_registry, Material};

use super::{BlockPos, BlockStorage, WorldAccess};

/// Результат одного вызова заливки
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Сколько вокселей реально изменилось
    pub count: u64,
    /// Ошибки, которые команда отправила бы оператору
    pub errors: Vec<String>,
}

impl FillReport {
    pub fn filled(count: u64) -> Self {
        Self { count, errors: Vec::new() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { count: 0, errors: vec![error.into()] }
    }

    /// Ничего не залито и есть ошибки
    pub fn is_failure(&self) -> bool {
        self.count == 0 && !self.errors.is_empty()
    }
}

/// Исполнитель ограниченной заливки
pub trait BoundedFill {
    /// Залить [min, max] (включительно) материалом
    fn fill_bounded(&mut self, min: BlockPos, max: BlockPos, material: &Material) -> FillReport;
}

impl BoundedFill for BlockStorage {
    fn fill_bounded(&mut self, min: BlockPos, max: BlockPos, material: &Material) -> FillReport {
        let (min, max) = (min.min(max), min.max(max));

        let dx = (max.x as i64 - min.x as i64 + 1) as u64;
        let dy = (max.y as i64 - min.y as i64 + 1) as u64;
        let dz = (max.z as i64 - min.z as i64 + 1) as u64;
        let volume = dx.saturating_mul(dy).saturating_mul(dz);
        if volume > self.max_fill_volume {
            return FillReport::failed(format!(
                "Too many blocks in the specified area (maximum {}, specified {})",
                self.max_fill_volume, volume
            ));
        }

        if !self.in_build_height(min.y) || !self.in_build_height(max.y) {
            return FillReport::failed("Cannot place blocks outside of the world");
        }

        if let Err(e) = global_registry().validate(material) {
            return FillReport::failed(e.to_string());
        }

        let mut count = 0u64;
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                for x in min.x..=max.x {
                    if self.set_material(BlockPos::new(x, y, z), material) {
                        count += 1;
                    }
                }
            }
        }

        if count == 0 {
            return FillReport::failed("No blocks were filled");
        }
        FillReport::filled(count)
    }
}
