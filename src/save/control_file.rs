// ============================================
// Control File - Объекты мира в JSON
// ============================================
// [{ "Type": "...", "Pos": [x, y, z], "Data": { ... } }, ...]

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::control::ControlRecord;
use crate::world::{BlockPos, ObjectTypes, World, WorldObject};

use super::SaveError;

#[derive(Debug, Serialize, Deserialize)]
struct SavedObject {
    #[serde(rename = "Type")]
    type_id: String,
    #[serde(rename = "Pos")]
    pos: [i32; 3],
    #[serde(rename = "Data")]
    data: ControlRecord,
}

pub struct ControlFile;

impl ControlFile {
    /// Записать все объекты мира. Возвращает их количество
    pub fn save(path: impl AsRef<Path>, world: &World) -> Result<usize, SaveError> {
        let path = path.as_ref();
        let mut objects: Vec<SavedObject> = world
            .objects()
            .map(|(pos, object)| match object {
                WorldObject::Control(state) => SavedObject {
                    type_id: object.type_id().to_string(),
                    pos: pos.to_array(),
                    data: ControlRecord::from(state),
                },
            })
            .collect();
        objects.sort_by_key(|o| o.pos);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&objects)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        log::info!("[SAVE] {} objects saved to {}", objects.len(), path.display());
        Ok(objects.len())
    }

    /// Загрузить объекты в мир. Неизвестные типы пропускаются
    pub fn load(path: impl AsRef<Path>, world: &mut World, types: &ObjectTypes) -> Result<usize, SaveError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let objects: Vec<SavedObject> = serde_json::from_str(&json)?;

        let mut loaded = 0;
        for saved in objects {
            let Some(object_type) = types.get(&saved.type_id) else {
                log::warn!("[SAVE] Skipping object of unknown type '{}'", saved.type_id);
                continue;
            };
            let mut object = object_type.create();
            if let Some(state) = object.as_control_mut() {
                *state = saved.data.into_state();
            }
            world.insert_object(BlockPos::from_array(saved.pos), object);
            loaded += 1;
        }
        world.take_dirty_objects();
        log::info!("[SAVE] Loaded {} objects from {}", loaded, path.display());
        Ok(loaded)
    }
}
