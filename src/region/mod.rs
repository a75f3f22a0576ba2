// ============================================
// Region Module - Геометрия и заливка регионов
// ============================================

mod fill;
mod geometry;

pub use fill::{ChunkFailure, ChunkedFill, FillOutcome};
pub use geometry::*;
