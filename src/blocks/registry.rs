// ============================================
// Material Registry - Data-Driven из JSON
// ============================================
// Единый источник правды для допустимых материалов

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Material;

/// Описание материала в JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Свойство -> допустимые значения
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

/// Корень JSON файла с материалами
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialsFile {
    pub materials: Vec<MaterialDefinition>,
}

/// Ошибки реестра. Текст проверки материала уходит оператору как есть
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown block type '{0}'")]
    UnknownMaterial(String),
    #[error("Block {id} does not have a '{key}' property")]
    UnknownProperty { id: String, key: String },
    #[error("Block {id} does not accept '{value}' for {key} property")]
    InvalidValue { id: String, key: String, value: String },
}

/// Реестр известных материалов
pub struct MaterialRegistry {
    by_id: HashMap<String, MaterialDefinition>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    /// Загрузить материалы из JSON строки
    pub fn load_from_json(&mut self, json: &str) -> Result<usize, RegistryError> {
        let file: MaterialsFile = serde_json::from_str(json)?;

        let count = file.materials.len();
        for definition in file.materials {
            self.register(definition);
        }
        Ok(count)
    }

    /// Зарегистрировать материал (повторная регистрация заменяет старую)
    pub fn register(&mut self, definition: MaterialDefinition) {
        self.by_id.insert(definition.id.clone(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&MaterialDefinition> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.by_id.len()
    }

    /// Проверить материал
    pub fn validate(&self, material: &Material) -> Result<(), RegistryError> {
        let Some(definition) = self.get(material.id()) else {
            return Err(RegistryError::UnknownMaterial(material.id().to_string()));
        };

        for (key, value) in material.properties() {
            let Some(allowed) = definition.properties.get(key) else {
                return Err(RegistryError::UnknownProperty {
                    id: material.id().to_string(),
                    key: key.to_string(),
                });
            };
            if !allowed.iter().any(|v| v == value) {
                return Err(RegistryError::InvalidValue {
                    id: material.id().to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// Global Registry
// ============================================

static GLOBAL_REGISTRY: OnceLock<MaterialRegistry> = OnceLock::new();

/// Получить глобальный реестр материалов.
///
/// Первый вызов загружает встроенный `assets/materials.json`; дальше реестр
/// только читается.
pub fn global_registry() -> &'static MaterialRegistry {
    GLOBAL_REGISTRY.get_or_init(|| {
        let mut registry = MaterialRegistry::new();

        if let Err(e) = registry.load_from_json(include_str!("../../assets/materials.json")) {
            log::warn!("Failed to load default materials: {}", e);
            register_fallback_materials(&mut registry);
        }

        registry
    })
}

/// Fallback материалы если JSON не загрузился
fn register_fallback_materials(registry: &mut MaterialRegistry) {
    for id in [super::AIR_ID, super::VOID_ID, "stone"] {
        registry.register(MaterialDefinition {
            id: id.to_string(),
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_loads() {
        let registry = global_registry();
        assert!(registry.contains("air"));
        assert!(registry.contains("structure_void"));
        assert!(registry.contains("region_tools:control_block"));
    }

    #[test]
    fn validates_properties() {
        let registry = global_registry();
        assert!(registry.validate(&Material::new("stone")).is_ok());
        assert!(registry
            .validate(&Material::new("oak_log").with_property("axis", "x"))
            .is_ok());

        let unknown = registry.validate(&Material::new("unobtainium")).unwrap_err();
        assert!(matches!(unknown, RegistryError::UnknownMaterial(ref id) if id == "unobtainium"));
        assert_eq!(unknown.to_string(), "Unknown block type 'unobtainium'");

        let bad_key = registry
            .validate(&Material::new("stone").with_property("axis", "x"))
            .unwrap_err();
        assert!(matches!(bad_key, RegistryError::UnknownProperty { .. }));
        assert!(bad_key.to_string().contains("does not have"));

        let bad_value = registry
            .validate(&Material::new("oak_log").with_property("axis", "w"))
            .unwrap_err();
        assert!(matches!(bad_value, RegistryError::InvalidValue { ref value, .. } if value == "w"));
        assert!(bad_value.to_string().contains("does not accept"));
    }

    #[test]
    fn later_json_overrides_earlier() {
        let mut registry = MaterialRegistry::new();
        registry
            .load_from_json(r#"{"materials":[{"id":"lamp"}]}"#)
            .unwrap();
        registry
            .load_from_json(r#"{"materials":[{"id":"lamp","properties":{"lit":["false","true"]}}]}"#)
            .unwrap();
        assert_eq!(registry.count(), 1);
        assert!(registry
            .validate(&Material::new("lamp").with_property("lit", "true"))
            .is_ok());
    }

    #[test]
    fn broken_json_is_reported() {
        let mut registry = MaterialRegistry::new();
        let err = registry.load_from_json("{ not json").unwrap_err();
        assert!(matches!(err, RegistryError::Json(_)));
        assert_eq!(registry.count(), 0);
    }
}
