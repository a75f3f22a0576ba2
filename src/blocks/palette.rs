// ============================================
// Material Palette - Палитра материалов
// ============================================
// Превращает Material в компактные индексы 0..N

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

use super::Material;

/// Палитра материалов (общая для мира и шаблонов)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPalette {
    /// Список уникальных материалов (индекс = ID в палитре)
    materials: Vec<Material>,
    /// Обратный маппинг: Material -> индекс палитры
    #[serde(skip)]
    reverse_map: HashMap<Material, u16>,
}

impl MaterialPalette {
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
            reverse_map: HashMap::new(),
        }
    }

    /// Палитра, у которой индекс 0 занят заданным материалом
    pub fn with_reserved(first: Material) -> Self {
        let mut palette = Self::new();
        palette.get_or_insert(&first);
        palette
    }

    /// Получить индекс материала или добавить новый
    pub fn get_or_insert(&mut self, material: &Material) -> u16 {
        if let Some(&idx) = self.reverse_map.get(material) {
            return idx;
        }

        let idx = self.materials.len() as u16;
        self.materials.push(material.clone());
        self.reverse_map.insert(material.clone(), idx);
        idx
    }

    /// Индекс материала, если он уже есть в палитре
    pub fn index_of(&self, material: &Material) -> Option<u16> {
        self.reverse_map.get(material).copied()
    }

    /// Получить материал по индексу палитры
    pub fn get(&self, index: u16) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    /// Количество уникальных материалов
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Пустая ли палитра
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    /// Восстановить reverse_map после десериализации
    pub fn rebuild_reverse_map(&mut self) {
        self.reverse_map.clear();
        for (idx, material) in self.materials.iter().enumerate() {
            self.reverse_map.insert(material.clone(), idx as u16);
        }
    }
}

impl Default for MaterialPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MaterialPalette {
    fn eq(&self, other: &Self) -> bool {
        self.materials == other.materials
    }
}

impl Eq for MaterialPalette {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_stable() {
        let mut palette = MaterialPalette::with_reserved(Material::air());
        let stone = Material::new("stone");
        assert_eq!(palette.get_or_insert(&stone), 1);
        assert_eq!(palette.get_or_insert(&stone), 1);
        assert_eq!(palette.get_or_insert(&Material::air()), 0);
        assert_eq!(palette.get(1), Some(&stone));
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn reverse_map_survives_bincode() {
        let mut palette = MaterialPalette::new();
        palette.get_or_insert(&Material::new("dirt"));
        palette.get_or_insert(&Material::new("log").with_property("axis", "y"));

        let bytes = bincode::serialize(&palette).unwrap();
        let mut loaded: MaterialPalette = bincode::deserialize(&bytes).unwrap();
        assert_eq!(loaded.index_of(&Material::new("dirt")), None);
        loaded.rebuild_reverse_map();
        assert_eq!(loaded.index_of(&Material::new("dirt")), Some(0));
        assert_eq!(loaded, palette);
    }
}
