// ============================================
// Chunked Fill - Заливка больших объёмов кусками
// ============================================
// Регион режется на кубы с ребром S, каждый куб: отдельный
// вызов BoundedFill. Ошибки куба сообщаются и не прерывают заливку.

use crate::blocks::Material;
use crate::config::DEFAULT_CHUNK_EDGE;
use crate::network::{Feedback, Notice};
use crate::world::{BlockPos, BoundedFill};

use super::Region;

/// Неудачный под-куб
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub region: Region,
    pub errors: Vec<String>,
}

/// Итог заливки
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// Сумма изменённых вокселей по всем кубам
    pub filled: u64,
    /// Сколько кубов было отправлено
    pub chunks: usize,
    pub failures: Vec<ChunkFailure>,
}

/// Исполнитель кусковой заливки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedFill {
    edge: i32,
}

impl ChunkedFill {
    pub fn new(edge: i32) -> Self {
        Self { edge: edge.max(1) }
    }

    pub fn edge(&self) -> i32 {
        self.edge
    }

    /// Под-кубы региона в порядке возрастания индекса (x, затем y, затем z)
    pub fn sub_regions(&self, region: Region) -> impl Iterator<Item = Region> {
        let edge = self.edge as i64;
        let (min, max) = (region.min(), region.max());
        let starts = move |lo: i32, hi: i32| (lo as i64..=hi as i64).step_by(edge as usize);
        let end = move |start: i64, hi: i32| (start + edge - 1).min(hi as i64) as i32;

        starts(min.x, max.x).flat_map(move |x| {
            starts(min.y, max.y).flat_map(move |y| {
                starts(min.z, max.z).map(move |z| {
                    Region::new(
                        BlockPos::new(x as i32, y as i32, z as i32),
                        BlockPos::new(end(x, max.x), end(y, max.y), end(z, max.z)),
                    )
                })
            })
        })
    }

    /// Сколько под-кубов получится
    pub fn chunk_count(&self, region: Region) -> u64 {
        let edge = self.edge as u64;
        region
            .lengths()
            .iter()
            .map(|&l| l.div_ceil(edge))
            .fold(1u64, |acc, n| acc.saturating_mul(n))
    }

    /// Залить регион. Каждый куб это свежий вызов `filler`; если куб ничего не
    /// залил и вернул ошибки, ошибки сразу уходят в `feedback`, а куб даёт 0.
    pub fn execute<F, N>(
        &self,
        region: Region,
        material: &Material,
        filler: &mut F,
        feedback: &mut N,
    ) -> FillOutcome
    where
        F: BoundedFill + ?Sized,
        N: Feedback + ?Sized,
    {
        log::debug!(
            "[FILL] {} with {} ({} chunks of edge {})",
            region,
            material,
            self.chunk_count(region),
            self.edge
        );

        let mut outcome = FillOutcome::default();
        for chunk in self.sub_regions(region) {
            outcome.chunks += 1;
            let report = filler.fill_bounded(chunk.min(), chunk.max(), material);
            if report.is_failure() {
                log::warn!("[FILL] chunk {} failed: {:?}", chunk, report.errors);
                for error in &report.errors {
                    feedback.notify(Notice::FillError(error.clone()));
                }
                outcome.failures.push(ChunkFailure {
                    region: chunk,
                    errors: report.errors,
                });
                continue;
            }
            outcome.filled += report.count;
        }
        outcome
    }
}

impl Default for ChunkedFill {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_EDGE)
    }
}
