// ============================================
// Region Geometry - Координатная математика
// ============================================
// Нормализация углов, длины, площади граней и объём

use std::fmt;

use crate::world::BlockPos;

/// Кубоид вокселей, min <= max покомпонентно
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    min: BlockPos,
    max: BlockPos,
}

impl Region {
    /// Регион по двум произвольным углам
    pub fn new(p1: BlockPos, p2: BlockPos) -> Self {
        let (min, max) = normalize(p1, p2);
        Self { min, max }
    }

    /// Регион от угла `origin` на `extent` вокселей; знак = направление.
    /// Нулевая компонента означает пустой регион.
    pub fn from_extent(origin: BlockPos, extent: BlockPos) -> Option<Self> {
        if extent.has_zero_axis() {
            return None;
        }
        let far = (origin + extent) - extent.signum();
        Some(Self::new(origin, far))
    }

    pub fn min(&self) -> BlockPos {
        self.min
    }

    pub fn max(&self) -> BlockPos {
        self.max
    }

    pub fn lengths(&self) -> [u64; 3] {
        lengths(self.min, self.max)
    }

    pub fn areas(&self) -> [u64; 3] {
        areas(self.lengths())
    }

    pub fn volume(&self) -> u64 {
        volume(self.lengths())
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Все позиции региона в порядке x, затем y, затем z
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> {
        let (min, max) = (self.min, self.max);
        (min.z..=max.z).flat_map(move |z| {
            (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| BlockPos::new(x, y, z)))
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] -> [{}]", self.min, self.max)
    }
}

/// Покомпонентные min/max двух углов
pub fn normalize(p1: BlockPos, p2: BlockPos) -> (BlockPos, BlockPos) {
    (p1.min(p2), p1.max(p2))
}

/// Количество вокселей вдоль каждой оси (всегда >= 1 для нормализованных углов)
pub fn lengths(min: BlockPos, max: BlockPos) -> [u64; 3] {
    let axis = |lo: i32, hi: i32| (hi as i64 - lo as i64 + 1) as u64;
    [axis(min.x, max.x), axis(min.y, max.y), axis(min.z, max.z)]
}

/// Площадь грани, перпендикулярной каждой оси
pub fn areas(lengths: [u64; 3]) -> [u64; 3] {
    let [lx, ly, lz] = lengths;
    [
        ly.saturating_mul(lz),
        lx.saturating_mul(lz),
        lx.saturating_mul(ly),
    ]
}

pub fn volume(lengths: [u64; 3]) -> u64 {
    let [lx, ly, lz] = lengths;
    lx.saturating_mul(ly).saturating_mul(lz)
}

/// Какие площади показывать оператору
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaReport {
    /// Выбрана линия блоков, площадь не имеет смысла
    None,
    /// Слой толщиной в один блок
    Single(u64),
    All([u64; 3]),
}

/// Отчёт линейки по двум выбранным позициям
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub lengths: [u64; 3],
    pub areas: AreaReport,
    pub volume: u64,
}

impl Measurement {
    pub fn between(p1: BlockPos, p2: BlockPos) -> Self {
        let region = Region::new(p1, p2);
        let lengths = region.lengths();
        let [lx, ly, lz] = lengths;
        let [ax, ay, az] = region.areas();

        let areas = if lx + ly == 2 || lx + lz == 2 || ly + lz == 2 {
            AreaReport::None
        } else if lx == 1 {
            AreaReport::Single(ax)
        } else if lz == 1 {
            AreaReport::Single(az)
        } else if ly == 1 {
            AreaReport::Single(ay)
        } else {
            AreaReport::All([ax, ay, az])
        };

        Self {
            lengths,
            areas,
            volume: region.volume(),
        }
    }

    /// Строки для оператора
    pub fn lines(&self) -> Vec<String> {
        let [lx, ly, lz] = self.lengths;
        let mut lines = vec![format!("Size: {} x {} x {}", lx, ly, lz)];
        match self.areas {
            AreaReport::None => {}
            AreaReport::Single(area) => lines.push(format!("Area: {}", area)),
            AreaReport::All([ax, ay, az]) => {
                lines.push(format!("Areas: X {}, Y {}, Z {}", ax, ay, az))
            }
        }
        lines.push(format!("Volume: {}", self.volume));
        lines
    }
}
