// ============================================
// Control Module - Блок управления регионом
// ============================================

mod actions;
mod record;
mod state;

pub use actions::{ActionError, ActionOutcome, Actions};
pub use record::{ControlRecord, RecordMaterial, RecordPos};
pub use state::{ControlState, Mode};
