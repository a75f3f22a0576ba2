// ============================================
// Template Placer - Вставка шаблона в мир
// ============================================

use crate::region::Region;
use crate::world::{BlockPos, WorldAccess};

use super::{Template, Transform};

/// Итог вставки (или подготовки к ней)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Размер шаблона после преобразования, со знаком
    pub size: BlockPos,
    /// Занятая область мира
    pub region: Region,
    /// Сколько вокселей изменилось (0 для предпросмотра)
    pub changed: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePlacer;

impl TemplatePlacer {
    pub fn new() -> Self {
        Self
    }

    /// Вставить шаблон в `anchor + offset`. При `preview_only` мир не
    /// трогаем, только считаем размер и область.
    pub fn place<W: WorldAccess + ?Sized>(
        &self,
        world: &mut W,
        template: &Template,
        anchor: BlockPos,
        offset: BlockPos,
        transform: Transform,
        preview_only: bool,
    ) -> Placement {
        let origin = anchor + offset;
        let extent = template.extent();
        let mut placement = Placement {
            size: transform.transformed_size(extent),
            region: transform.placement_region(origin, extent),
            changed: 0,
        };
        if preview_only {
            return placement;
        }

        for (local, material) in template.iter() {
            let target = origin + transform.apply(local);
            if world.set_material(target, &transform.apply_to_material(material)) {
                placement.changed += 1;
            }
        }
        log::debug!(
            "[TEMPLATE] Placed {}x{}x{} at {} ({:?}, {:?}), {} changed",
            extent.x,
            extent.y,
            extent.z,
            origin,
            transform.rotation,
            transform.mirror,
            placement.changed
        );
        placement
    }
}
