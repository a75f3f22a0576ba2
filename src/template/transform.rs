// ============================================
// Transform - Поворот и отражение шаблона
// ============================================
// Сначала отражение по одной горизонтальной оси, потом поворот
// вокруг вертикали. Север = -Z, восток = +X.

use serde::{Deserialize, Serialize};

use crate::blocks::Material;
use crate::region::Region;
use crate::world::BlockPos;

/// Поворот вокруг вертикальной оси
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Counterclockwise90,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::Counterclockwise90,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn degrees(self) -> u16 {
        self.ordinal() as u16 * 90
    }

    pub fn apply(self, pos: BlockPos) -> BlockPos {
        let BlockPos { x, y, z } = pos;
        match self {
            Rotation::None => pos,
            Rotation::Clockwise90 => BlockPos::new(z.saturating_neg(), y, x),
            Rotation::Clockwise180 => BlockPos::new(x.saturating_neg(), y, z.saturating_neg()),
            Rotation::Counterclockwise90 => BlockPos::new(z, y, x.saturating_neg()),
        }
    }
}

/// Отражение по одной горизонтальной оси
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    /// Отражение по Z (север <-> юг)
    LeftRight,
    /// Отражение по X (восток <-> запад)
    FrontBack,
}

impl Mirror {
    pub const ALL: [Mirror; 3] = [Mirror::None, Mirror::LeftRight, Mirror::FrontBack];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        usize::try_from(ordinal).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn apply(self, pos: BlockPos) -> BlockPos {
        match self {
            Mirror::None => pos,
            Mirror::LeftRight => BlockPos::new(pos.x, pos.y, pos.z.saturating_neg()),
            Mirror::FrontBack => BlockPos::new(pos.x.saturating_neg(), pos.y, pos.z),
        }
    }
}

/// Полное преобразование шаблона
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Transform {
    pub rotation: Rotation,
    pub mirror: Mirror,
}

const HORIZONTAL: [&str; 4] = ["north", "east", "south", "west"];

impl Transform {
    pub fn new(rotation: Rotation, mirror: Mirror) -> Self {
        Self { rotation, mirror }
    }

    /// Локальная позиция шаблона -> смещение от точки вставки
    pub fn apply(&self, pos: BlockPos) -> BlockPos {
        self.rotation.apply(self.mirror.apply(pos))
    }

    /// Размер со знаком после преобразования (знак = направление)
    pub fn transformed_size(&self, size: BlockPos) -> BlockPos {
        self.apply(size)
    }

    /// Дальний угол размещения (включительно)
    pub fn far_corner(&self, origin: BlockPos, size: BlockPos) -> BlockPos {
        origin + self.apply(size - BlockPos::new(1, 1, 1))
    }

    /// Область, которую займёт шаблон размера `size`, вставленный в `origin`
    pub fn placement_region(&self, origin: BlockPos, size: BlockPos) -> Region {
        Region::new(origin, self.far_corner(origin, size))
    }

    /// Повернуть/отразить направленные свойства материала (facing, axis)
    pub fn apply_to_material(&self, material: &Material) -> Material {
        let mut out = material.clone();
        if let Some(facing) = material.property("facing") {
            if let Some(idx) = HORIZONTAL.iter().position(|&d| d == facing) {
                let mirrored = match (self.mirror, idx) {
                    (Mirror::LeftRight, 0 | 2) | (Mirror::FrontBack, 1 | 3) => (idx + 2) % 4,
                    _ => idx,
                };
                let rotated = (mirrored + self.rotation.ordinal() as usize) % 4;
                out = out.with_property("facing", HORIZONTAL[rotated]);
            }
        }
        if matches!(self.rotation, Rotation::Clockwise90 | Rotation::Counterclockwise90) {
            match material.property("axis") {
                Some("x") => out = out.with_property("axis", "z"),
                Some("z") => out = out.with_property("axis", "x"),
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_transforms() -> impl Iterator<Item = Transform> {
        Rotation::ALL
            .into_iter()
            .flat_map(|r| Mirror::ALL.into_iter().map(move |m| Transform::new(r, m)))
    }

    #[test]
    fn clockwise_turns_north_to_east() {
        let north = BlockPos::new(0, 0, -1);
        assert_eq!(Rotation::Clockwise90.apply(north), BlockPos::new(1, 0, 0));
        assert_eq!(Rotation::Clockwise180.apply(north), BlockPos::new(0, 0, 1));
        assert_eq!(Rotation::Counterclockwise90.apply(north), BlockPos::new(-1, 0, 0));
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let size = BlockPos::new(5, 3, 7);
        let offset = BlockPos::new(-2, 9, 4);
        for mirror in Mirror::ALL {
            let once = Transform::new(Rotation::None, mirror);
            let mut s = once.transformed_size(size);
            let mut o = offset;
            for _ in 0..4 {
                s = Rotation::Clockwise90.apply(s);
                o = Rotation::Clockwise90.apply(o);
            }
            assert_eq!(s, once.transformed_size(size));
            assert_eq!(o, offset);
            assert_eq!(
                Region::from_extent(o, s),
                Region::from_extent(offset, once.transformed_size(size))
            );
        }
        let p = BlockPos::new(3, 1, -8);
        let full_turn = (0..4).fold(p, |q, _| Rotation::Clockwise90.apply(q));
        assert_eq!(full_turn, p);
    }

    #[test]
    fn mirror_twice_is_identity() {
        let p = BlockPos::new(5, -3, 7);
        for mirror in Mirror::ALL {
            assert_eq!(mirror.apply(mirror.apply(p)), p);
        }
    }

    #[test]
    fn signed_extent_box_matches_far_corner() {
        let origin = BlockPos::new(100, 64, -20);
        let size = BlockPos::new(4, 2, 6);
        for t in all_transforms() {
            let from_extent = Region::from_extent(origin, t.transformed_size(size)).unwrap();
            assert_eq!(from_extent, t.placement_region(origin, size), "{:?}", t);
            assert_eq!(from_extent.lengths().iter().product::<u64>(), 48);
        }
    }

    #[test]
    fn rotated_box_swaps_horizontal_lengths() {
        let t = Transform::new(Rotation::Clockwise90, Mirror::None);
        let region = t.placement_region(BlockPos::ZERO, BlockPos::new(4, 2, 6));
        assert_eq!(region.lengths(), [6, 2, 4]);
        assert_eq!(region.min(), BlockPos::new(-5, 0, 0));
        assert_eq!(region.max(), BlockPos::new(0, 1, 3));
    }

    #[test]
    fn facing_and_axis_follow_transform() {
        let stairs = Material::new("oak_stairs").with_property("facing", "north");
        let cw = Transform::new(Rotation::Clockwise90, Mirror::None);
        assert_eq!(cw.apply_to_material(&stairs).property("facing"), Some("east"));

        let mirrored = Transform::new(Rotation::None, Mirror::LeftRight);
        assert_eq!(mirrored.apply_to_material(&stairs).property("facing"), Some("south"));

        let east = Material::new("oak_stairs").with_property("facing", "east");
        let front_back = Transform::new(Rotation::Clockwise180, Mirror::FrontBack);
        // east -> west (отражение) -> east (180)
        assert_eq!(front_back.apply_to_material(&east).property("facing"), Some("east"));

        let log = Material::new("oak_log").with_property("axis", "x");
        assert_eq!(cw.apply_to_material(&log).property("axis"), Some("z"));
        assert_eq!(mirrored.apply_to_material(&log).property("axis"), Some("x"));
    }

    #[test]
    fn ordinals_roundtrip() {
        for r in Rotation::ALL {
            assert_eq!(Rotation::from_ordinal(r.ordinal() as i64), Some(r));
        }
        assert_eq!(Rotation::from_ordinal(4), None);
        assert_eq!(Mirror::from_ordinal(-1), None);
        assert_eq!(Rotation::Counterclockwise90.degrees(), 270);
        assert_eq!(Mirror::from_ordinal(2), Some(Mirror::FrontBack));
    }
}
