// ============================================
// Control Record - Сохраняемая форма состояния
// ============================================
// Ключи совпадают с форматом объекта: Size, Offset,
// FillerBlockState {Name, Properties}, StructureName, Mode,
// Rotation, Mirror (порядковые номера).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::blocks::Material;
use crate::template::{Mirror, Rotation};
use crate::world::BlockPos;

use super::{ControlState, Mode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPos {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
    #[serde(rename = "Z")]
    pub z: i32,
}

impl From<BlockPos> for RecordPos {
    fn from(pos: BlockPos) -> Self {
        Self { x: pos.x, y: pos.y, z: pos.z }
    }
}

impl From<RecordPos> for BlockPos {
    fn from(pos: RecordPos) -> Self {
        BlockPos::new(pos.x, pos.y, pos.z)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMaterial {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRecord {
    #[serde(rename = "Size", default)]
    pub size: RecordPos,
    #[serde(rename = "Offset", default)]
    pub offset: RecordPos,
    #[serde(rename = "FillerBlockState", default, skip_serializing_if = "Option::is_none")]
    pub filler: Option<RecordMaterial>,
    #[serde(rename = "StructureName", default, skip_serializing_if = "Option::is_none")]
    pub structure_name: Option<String>,
    #[serde(rename = "Mode", default)]
    pub mode: i32,
    #[serde(rename = "Rotation", default)]
    pub rotation: i32,
    #[serde(rename = "Mirror", default)]
    pub mirror: i32,
}

impl From<&ControlState> for ControlRecord {
    fn from(state: &ControlState) -> Self {
        Self {
            size: state.size.into(),
            offset: state.offset.into(),
            filler: state.filler.as_ref().map(|m| RecordMaterial {
                name: m.id().to_string(),
                properties: m.properties().clone(),
            }),
            structure_name: state.template_name.clone(),
            mode: state.mode.ordinal() as i32,
            rotation: state.rotation.ordinal() as i32,
            mirror: state.mirror.ordinal() as i32,
        }
    }
}

impl ControlRecord {
    /// Восстановить состояние. Битые значения заменяются значениями
    /// по умолчанию с предупреждением в лог.
    pub fn into_state(self) -> ControlState {
        let mode = Mode::from_ordinal(self.mode as i64).unwrap_or_else(|| {
            log::warn!("[SAVE] Unknown mode ordinal {}, using box", self.mode);
            Mode::default()
        });
        let rotation = Rotation::from_ordinal(self.rotation as i64).unwrap_or_else(|| {
            log::warn!("[SAVE] Unknown rotation ordinal {}, using none", self.rotation);
            Rotation::default()
        });
        let mirror = Mirror::from_ordinal(self.mirror as i64).unwrap_or_else(|| {
            log::warn!("[SAVE] Unknown mirror ordinal {}, using none", self.mirror);
            Mirror::default()
        });
        let filler = self.filler.and_then(|record| {
            let text = record
                .properties
                .into_iter()
                .fold(Material::new(record.name), |m, (k, v)| m.with_property(k, v))
                .to_string();
            let material = Material::parse_lenient(&text);
            if material.is_none() {
                log::warn!("[SAVE] Dropping unparsable filler material '{}'", text);
            }
            material
        });

        let mut state = ControlState {
            mode,
            size: self.size.into(),
            offset: self.offset.into(),
            filler,
            template_name: None,
            rotation,
            mirror,
        };
        state.set_template_name(self.structure_name.as_deref().unwrap_or(""));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_uses_object_keys() {
        let state = ControlState {
            mode: Mode::Paste,
            size: BlockPos::new(5, -2, 3),
            offset: BlockPos::new(0, 1, 0),
            filler: Some(Material::new("oak_log").with_property("axis", "x")),
            template_name: Some("house".into()),
            rotation: Rotation::Clockwise180,
            mirror: Mirror::FrontBack,
        };
        let json = serde_json::to_value(ControlRecord::from(&state)).unwrap();

        assert_eq!(json["Size"]["Y"], -2);
        assert_eq!(json["FillerBlockState"]["Name"], "oak_log");
        assert_eq!(json["FillerBlockState"]["Properties"]["axis"], "x");
        assert_eq!(json["StructureName"], "house");
        assert_eq!(json["Mode"], 3);
        assert_eq!(json["Rotation"], 2);
        assert_eq!(json["Mirror"], 2);

        let back: ControlRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_state(), state);
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let state = ControlState {
            filler: None,
            ..ControlState::default()
        };
        let json = serde_json::to_value(ControlRecord::from(&state)).unwrap();
        assert!(json.get("FillerBlockState").is_none());
        assert!(json.get("StructureName").is_none());
    }

    #[test]
    fn bad_ordinals_fall_back() {
        let record: ControlRecord =
            serde_json::from_str(r#"{ "Mode": 9, "Rotation": -1, "Mirror": 3, "StructureName": "" }"#).unwrap();
        let state = record.into_state();
        assert_eq!(state.mode, Mode::Box);
        assert_eq!(state.rotation, Rotation::None);
        assert_eq!(state.mirror, Mirror::None);
        assert_eq!(state.template_name, None);
        assert_eq!(state.filler, None);
    }
}
