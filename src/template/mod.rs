// ============================================
// Template Module - Снятие и вставка шаблонов
// ============================================

mod model;
mod placer;
mod store;
mod transform;

pub use model::{Template, MAX_TEMPLATE_VOLUME};
pub use placer::{Placement, TemplatePlacer};
pub use store::{MemoryTemplates, TemplateError, TemplateName, TemplateStorage, TemplateStore, MAX_NAME_LEN};
pub use transform::{Mirror, Rotation, Transform};
