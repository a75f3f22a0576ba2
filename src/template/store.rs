// ============================================
// Template Store - Именованные шаблоны
// ============================================

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::region::Region;
use crate::save::SaveError;
use crate::world::WorldAccess;

use super::Template;

pub const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template name '{0}'")]
    InvalidName(String),
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("template volume {volume} exceeds the limit of {max}")]
    TooLarge { volume: u64, max: u64 },
    #[error("template data is corrupt: {0}")]
    Corrupt(String),
    #[error("template storage failed: {0}")]
    Storage(#[from] SaveError),
}

/// Проверенное имя шаблона: [A-Za-z0-9_.-], не только точки
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateName(String);

impl TemplateName {
    pub fn new(raw: &str) -> Result<Self, TemplateError> {
        let name = raw.trim();
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
            && !name.chars().all(|c| c == '.');
        if !valid {
            return Err(TemplateError::InvalidName(raw.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Где физически лежат шаблоны
pub trait TemplateStorage {
    /// Записать шаблон, полностью заменив старый
    fn save(&mut self, name: &TemplateName, template: &Template) -> Result<(), SaveError>;

    /// Прочитать шаблон; Ok(None), если его нет
    fn load(&self, name: &TemplateName) -> Result<Option<Template>, SaveError>;
}

/// Хранилище в памяти (тесты, клиент без диска)
#[derive(Debug, Default)]
pub struct MemoryTemplates {
    templates: HashMap<TemplateName, Template>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateStorage for MemoryTemplates {
    fn save(&mut self, name: &TemplateName, template: &Template) -> Result<(), SaveError> {
        self.templates.insert(name.clone(), template.clone());
        Ok(())
    }

    fn load(&self, name: &TemplateName) -> Result<Option<Template>, SaveError> {
        Ok(self.templates.get(name).cloned())
    }
}

/// Снятие и выдача шаблонов по имени
#[derive(Debug, Default)]
pub struct TemplateStore<S> {
    storage: S,
}

impl<S: TemplateStorage> TemplateStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Снять регион мира и сохранить под именем
    pub fn capture<W: WorldAccess + ?Sized>(
        &mut self,
        name: &str,
        region: Region,
        world: &W,
    ) -> Result<Template, TemplateError> {
        let name = TemplateName::new(name)?;
        let template = Template::capture(world, region)?;
        self.storage.save(&name, &template)?;
        log::info!(
            "[TEMPLATE] Captured '{}' from {} ({} voxels)",
            name,
            region,
            template.non_void_count()
        );
        Ok(template)
    }

    pub fn retrieve(&self, name: &str) -> Result<Template, TemplateError> {
        let name = TemplateName::new(name)?;
        self.storage
            .load(&name)?
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Material;
    use crate::world::{BlockPos, BlockStorage};

    #[test]
    fn name_rules() {
        for good in ["house", "My_House-2", "v1.2", " tower "] {
            assert!(TemplateName::new(good).is_ok(), "{}", good);
        }
        for bad in ["", "   ", "..", ".", "a/b", "../etc", "with space", "ü"] {
            assert!(
                matches!(TemplateName::new(bad), Err(TemplateError::InvalidName(_))),
                "{}",
                bad
            );
        }
        assert!(TemplateName::new(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert_eq!(TemplateName::new(" tower ").unwrap().as_str(), "tower");
    }

    #[test]
    fn capture_then_retrieve() {
        let mut world = BlockStorage::new();
        world.set_material(BlockPos::new(1, 1, 1), &Material::new("bricks"));
        let mut store = TemplateStore::new(MemoryTemplates::new());

        let region = Region::new(BlockPos::ZERO, BlockPos::new(4, 4, 4));
        let captured = store.capture("house", region, &world).unwrap();
        let loaded = store.retrieve("house").unwrap();

        assert_eq!(captured, loaded);
        assert_eq!(loaded.size(), [5, 5, 5]);
        assert_eq!(store.storage().len(), 1);
    }

    #[test]
    fn capture_replaces_previous() {
        let mut world = BlockStorage::new();
        let mut store = TemplateStore::new(MemoryTemplates::new());
        store
            .capture("slot", Region::new(BlockPos::ZERO, BlockPos::ZERO), &world)
            .unwrap();
        world.set_material(BlockPos::ZERO, &Material::new("stone"));
        store
            .capture("slot", Region::new(BlockPos::ZERO, BlockPos::new(1, 0, 0)), &world)
            .unwrap();

        let loaded = store.retrieve("slot").unwrap();
        assert_eq!(loaded.size(), [2, 1, 1]);
        assert_eq!(loaded.material_at([0, 0, 0]).map(Material::id), Some("stone"));
    }

    #[test]
    fn missing_and_invalid_names() {
        let store = TemplateStore::new(MemoryTemplates::new());
        assert!(matches!(store.retrieve("missing"), Err(TemplateError::NotFound(n)) if n == "missing"));
        assert!(matches!(store.retrieve("../x"), Err(TemplateError::InvalidName(_))));
    }
}
