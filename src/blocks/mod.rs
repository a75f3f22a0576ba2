// ============================================
// Материалы вокселей
// ============================================
// Data-Driven Architecture: допустимые материалы загружаются из JSON

mod material;
mod palette;
mod registry;

pub use material::*;
pub use palette::MaterialPalette;
pub use registry::*;
