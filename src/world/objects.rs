// ============================================
// World Objects - Объекты мира с состоянием
// ============================================
// Статическая таблица типов объектов, собирается один раз

use std::sync::OnceLock;

use crate::control::ControlState;

/// ID типа "блок управления"
pub const CONTROL_BLOCK: &str = "region_tools:control_block";

/// Объект мира, привязанный к позиции
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldObject {
    Control(ControlState),
}

impl WorldObject {
    pub fn type_id(&self) -> &'static str {
        match self {
            WorldObject::Control(_) => CONTROL_BLOCK,
        }
    }

    pub fn as_control(&self) -> Option<&ControlState> {
        match self {
            WorldObject::Control(state) => Some(state),
        }
    }

    pub fn as_control_mut(&mut self) -> Option<&mut ControlState> {
        match self {
            WorldObject::Control(state) => Some(state),
        }
    }
}

/// Описание типа объекта
#[derive(Debug, Clone, Copy)]
pub struct ObjectType {
    pub id: &'static str,
    /// Материал блока, который стоит на месте объекта
    pub block: &'static str,
    create: fn() -> WorldObject,
}

impl ObjectType {
    pub fn create(&self) -> WorldObject {
        (self.create)()
    }
}

/// Таблица типов объектов
#[derive(Debug)]
pub struct ObjectTypes {
    types: Vec<ObjectType>,
}

impl ObjectTypes {
    fn builtin() -> Self {
        Self {
            types: vec![ObjectType {
                id: CONTROL_BLOCK,
                block: CONTROL_BLOCK,
                create: || WorldObject::Control(ControlState::default()),
            }],
        }
    }

    pub fn get(&self, id: &str) -> Option<&ObjectType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.iter()
    }
}

static OBJECT_TYPES: OnceLock<ObjectTypes> = OnceLock::new();

/// Таблица встроенных типов. Собирается при первом вызове и дальше не меняется;
/// сервер вызывает её на старте и передаёт ссылку туда, где нужны типы.
pub fn object_types() -> &'static ObjectTypes {
    OBJECT_TYPES.get_or_init(ObjectTypes::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_block_is_registered() {
        let types = object_types();
        let control = types.get(CONTROL_BLOCK).unwrap();
        assert_eq!(control.create().type_id(), CONTROL_BLOCK);
        assert!(control.create().as_control().is_some());
        assert!(types.get("region_tools:missing").is_none());
    }
}
