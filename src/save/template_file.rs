// ============================================
// Template Files - Шаблоны на диске
// ============================================
// <dir>/<name>.rtpl

use std::path::{Path, PathBuf};

use crate::template::{Template, TemplateName, TemplateStorage};

use super::header::{read_file, write_file, TEMPLATE_MAGIC};
use super::SaveError;

pub const TEMPLATE_EXTENSION: &str = "rtpl";

#[derive(Debug, Clone)]
pub struct DiskTemplates {
    dir: PathBuf,
}

impl DiskTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &TemplateName) -> PathBuf {
        self.dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION))
    }

    /// Имена всех сохранённых шаблонов (по алфавиту)
    pub fn list(&self) -> Result<Vec<TemplateName>, SaveError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            if let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| TemplateName::new(s).ok())
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl TemplateStorage for DiskTemplates {
    fn save(&mut self, name: &TemplateName, template: &Template) -> Result<(), SaveError> {
        let path = self.path_for(name);
        write_file(&path, TEMPLATE_MAGIC, template)?;
        log::debug!("[SAVE] Template written to {}", path.display());
        Ok(())
    }

    fn load(&self, name: &TemplateName) -> Result<Option<Template>, SaveError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let mut template: Template = read_file(&path, TEMPLATE_MAGIC)?;
        template
            .validate()
            .map_err(|e| SaveError::Deserialize(e.to_string()))?;
        Ok(Some(template))
    }
}
