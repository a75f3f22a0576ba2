// ============================================
// Region Tools - Инструменты работы с регионами мира
// ============================================
// Блок управления (BOX/FILL/COPY/PASTE), кусковая заливка,
// шаблоны с поворотом/отражением и сетевая синхронизация

pub mod blocks;
pub mod config;
pub mod control;
pub mod network;
pub mod region;
pub mod save;
pub mod template;
pub mod world;
