// ============================================
// World - Воксели + объекты мира
// ============================================

mod command;
mod objects;
mod pos;
mod storage;

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::blocks::Material;
use crate::control::ControlState;

pub use command::{BoundedFill, FillReport};
pub use objects::{object_types, ObjectType, ObjectTypes, WorldObject, CONTROL_BLOCK};
pub use pos::{BlockPos, SECTION_SIZE};
pub use storage::{BlockStorage, WorldAccess};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("unknown object type '{0}'")]
    UnknownObjectType(String),
    #[error("an object already exists at {0}")]
    Occupied(BlockPos),
}

/// Мир: воксели и объекты с состоянием
#[derive(Debug, Default)]
pub struct World {
    pub blocks: BlockStorage,
    objects: HashMap<BlockPos, WorldObject>,
    /// Объекты, которые клиенты должны перерисовать
    dirty_objects: BTreeSet<BlockPos>,
}

impl World {
    pub fn new(blocks: BlockStorage) -> Self {
        Self {
            blocks,
            objects: HashMap::new(),
            dirty_objects: BTreeSet::new(),
        }
    }

    /// Поставить объект заданного типа (и его блок)
    pub fn place_object(
        &mut self,
        types: &ObjectTypes,
        type_id: &str,
        pos: BlockPos,
    ) -> Result<(), WorldError> {
        let object_type = types
            .get(type_id)
            .ok_or_else(|| WorldError::UnknownObjectType(type_id.to_string()))?;
        if self.objects.contains_key(&pos) {
            return Err(WorldError::Occupied(pos));
        }

        self.blocks.set_material(pos, &Material::new(object_type.block));
        self.insert_object(pos, object_type.create());
        Ok(())
    }

    /// Вставить готовый объект (загрузка сохранения)
    pub fn insert_object(&mut self, pos: BlockPos, object: WorldObject) {
        self.objects.insert(pos, object);
        self.dirty_objects.insert(pos);
    }

    /// Удалить объект. Воксель очищается, только если там всё ещё блок объекта
    pub fn remove_object(&mut self, pos: BlockPos) -> Option<WorldObject> {
        let removed = self.objects.remove(&pos)?;
        let block = object_types().get(removed.type_id()).map(|t| t.block);
        if block.is_some_and(|b| self.blocks.material_at(pos).id() == b) {
            self.blocks.set_material(pos, &Material::air());
        }
        self.dirty_objects.remove(&pos);
        Some(removed)
    }

    pub fn object(&self, pos: BlockPos) -> Option<&WorldObject> {
        self.objects.get(&pos)
    }

    pub fn objects(&self) -> impl Iterator<Item = (BlockPos, &WorldObject)> + '_ {
        self.objects.iter().map(|(&pos, object)| (pos, object))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn control(&self, pos: BlockPos) -> Option<&ControlState> {
        self.objects.get(&pos).and_then(WorldObject::as_control)
    }

    /// Состояние блока управления и воксели одновременно
    pub fn control_parts_mut(&mut self, pos: BlockPos) -> Option<(&mut ControlState, &mut BlockStorage)> {
        let state = self.objects.get_mut(&pos)?.as_control_mut()?;
        Some((state, &mut self.blocks))
    }

    /// Пометить объект для рассылки клиентам
    pub fn mark_object_dirty(&mut self, pos: BlockPos) {
        if self.objects.contains_key(&pos) {
            self.dirty_objects.insert(pos);
        }
    }

    /// Получить и очистить список изменённых объектов
    pub fn take_dirty_objects(&mut self) -> Vec<BlockPos> {
        std::mem::take(&mut self.dirty_objects).into_iter().collect()
    }
}
