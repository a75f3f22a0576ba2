// ============================================
// Material - Описание материала вокселя
// ============================================
// Текстовая форма: id[prop=val,...]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ID "пустого" материала
pub const AIR_ID: &str = "air";
/// ID заглушки, которая не попадает в шаблоны
pub const VOID_ID: &str = "structure_void";

/// Ошибки разбора материала
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterialParseError {
    #[error("empty material id")]
    EmptyId,
    #[error("illegal character {0:?} in material id")]
    IllegalIdChar(char),
    #[error("unclosed property list")]
    UnclosedProperties,
    #[error("invalid property entry {0:?} (expected key=value)")]
    InvalidProperty(String),
    #[error("duplicate property {0:?}")]
    DuplicateProperty(String),
    #[error("unexpected trailing input {0:?}")]
    TrailingInput(String),
}

/// Материал: id + упорядоченные свойства
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Material {
    id: String,
    properties: BTreeMap<String, String>,
}

impl Material {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Пустой материал (воздух)
    pub fn air() -> Self {
        Self::new(AIR_ID)
    }

    /// Заглушка "пустоты" для шаблонов
    pub fn void() -> Self {
        Self::new(VOID_ID)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_air(&self) -> bool {
        self.id == AIR_ID
    }

    pub fn is_void(&self) -> bool {
        self.id == VOID_ID
    }

    /// Разобрать строку вида `id[prop=val,...]`
    pub fn parse(input: &str) -> Result<Self, MaterialParseError> {
        let input = input.trim();
        let (id_part, rest) = match input.find('[') {
            Some(idx) => (&input[..idx], Some(&input[idx + 1..])),
            None => (input, None),
        };

        let id = id_part.trim();
        if id.is_empty() {
            return Err(MaterialParseError::EmptyId);
        }
        if let Some(c) = id.chars().find(|&c| !is_id_char(c)) {
            return Err(MaterialParseError::IllegalIdChar(c));
        }

        let mut material = Self::new(id);
        let Some(rest) = rest else {
            return Ok(material);
        };

        let close = rest.find(']').ok_or(MaterialParseError::UnclosedProperties)?;
        let trailing = rest[close + 1..].trim();
        if !trailing.is_empty() {
            return Err(MaterialParseError::TrailingInput(trailing.to_string()));
        }

        for entry in rest[..close].split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .filter(|(k, v)| is_property_token(k) && is_property_token(v))
                .ok_or_else(|| MaterialParseError::InvalidProperty(entry.to_string()))?;
            if material.properties.contains_key(key) {
                return Err(MaterialParseError::DuplicateProperty(key.to_string()));
            }
            material.properties.insert(key.to_string(), value.to_string());
        }

        Ok(material)
    }

    /// Разбор, где пустая или битая строка означает "нет материала"
    pub fn parse_lenient(input: &str) -> Option<Self> {
        match Self::parse(input) {
            Ok(material) => Some(material),
            Err(e) => {
                if !input.trim().is_empty() {
                    log::debug!("[MATERIAL] ignoring unparsable material {:?}: {}", input, e);
                }
                None
            }
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::air()
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl FromStr for Material {
    type Err = MaterialParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[inline]
fn is_id_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | ':' | '/')
}

#[inline]
fn is_property_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
