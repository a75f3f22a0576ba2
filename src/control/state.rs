// ============================================
// Control State - Состояние блока управления
// ============================================

use serde::{Deserialize, Serialize};

use crate::blocks::Material;
use crate::region::Region;
use crate::template::{Mirror, Rotation, Transform};
use crate::world::BlockPos;

/// Режим блока управления
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Только рамка, действия нет
    #[default]
    Box,
    Fill,
    Copy,
    Paste,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Box, Mode::Fill, Mode::Copy, Mode::Paste];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Box => "box",
            Mode::Fill => "fill",
            Mode::Copy => "copy",
            Mode::Paste => "paste",
        }
    }
}

/// Состояние блока управления. Меняется только применением
/// сообщения синхронизации (и вставкой шаблона, которая
/// обновляет размер).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub mode: Mode,
    /// Размер со знаком: знак = направление, ноль = неактивно
    pub size: BlockPos,
    /// Смещение угла региона от якоря
    pub offset: BlockPos,
    pub filler: Option<Material>,
    pub template_name: Option<String>,
    pub rotation: Rotation,
    pub mirror: Mirror,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            mode: Mode::Box,
            size: BlockPos::ZERO,
            offset: BlockPos::ZERO,
            filler: Some(Material::air()),
            template_name: None,
            rotation: Rotation::None,
            mirror: Mirror::None,
        }
    }
}

impl ControlState {
    /// Угол региона в мире
    pub fn origin(&self, anchor: BlockPos) -> BlockPos {
        anchor + self.offset
    }

    /// Регион, на который указывает блок (None при нулевом размере)
    pub fn region(&self, anchor: BlockPos) -> Option<Region> {
        Region::from_extent(self.origin(anchor), self.size)
    }

    pub fn is_active(&self) -> bool {
        !self.size.has_zero_axis()
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.rotation, self.mirror)
    }

    /// Пустое имя (после trim) = отсутствует
    pub fn set_template_name(&mut self, raw: &str) {
        let trimmed = raw.trim();
        self.template_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Применить пришедший снимок. Отсутствующий материал не стирает
    /// прежний: остаётся старое значение, а если его нет, воздух.
    pub fn apply(&mut self, incoming: ControlState) {
        let ControlState {
            mode,
            size,
            offset,
            filler,
            template_name,
            rotation,
            mirror,
        } = incoming;

        self.mode = mode;
        self.size = size;
        self.offset = offset;
        self.rotation = rotation;
        self.mirror = mirror;
        match filler {
            Some(material) => self.filler = Some(material),
            None if self.filler.is_none() => self.filler = Some(Material::air()),
            None => {}
        }
        self.set_template_name(template_name.as_deref().unwrap_or(""));
    }
}
