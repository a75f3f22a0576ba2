// ============================================
// BlockPos - Целочисленная позиция вокселя
// ============================================

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Размер секции хранилища (16x16x16)
pub const SECTION_SIZE: i32 = 16;

/// Ключ для блока в мире
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ZERO: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(arr: [i32; 3]) -> Self {
        Self { x: arr[0], y: arr[1], z: arr[2] }
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    /// Сдвиг с насыщением на границах i32
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// Покомпонентный минимум
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Покомпонентный максимум
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Покомпонентный знак (-1, 0, 1)
    pub fn signum(self) -> Self {
        Self::new(self.x.signum(), self.y.signum(), self.z.signum())
    }

    /// Есть ли нулевая компонента
    pub fn has_zero_axis(self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Ключ секции 16x16x16 для этого блока
    pub fn section_key(self) -> (i32, i32, i32) {
        (
            self.x.div_euclid(SECTION_SIZE),
            self.y.div_euclid(SECTION_SIZE),
            self.z.div_euclid(SECTION_SIZE),
        )
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: BlockPos) -> BlockPos {
        self.offset(rhs.x, rhs.y, rhs.z)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: BlockPos) -> BlockPos {
        Self::new(
            self.x.saturating_sub(rhs.x),
            self.y.saturating_sub(rhs.y),
            self.z.saturating_sub(rhs.z),
        )
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from(arr: [i32; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}
