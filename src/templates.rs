// Template store - named watermark configurations persisted as one JSON
// file each in a per-user directory.
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::watermark::WatermarkSpec;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template name {0:?} may only contain letters, digits, '-' and '_'")]
    InvalidName(String),

    #[error("template {0:?} does not exist")]
    Missing(String),

    #[error("template {name:?} is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct TemplateStore {
    directory: PathBuf,
}

impl TemplateStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Per-user default: `~/.sukashi/templates`.
    pub fn default_location() -> PathBuf {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
        match home {
            Some(home) => PathBuf::from(home).join(".sukashi").join("templates"),
            None => PathBuf::from(".sukashi-templates"),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Persist `spec` under `name`, creating the template directory on
    /// first use. Rejects names outside `[A-Za-z0-9_-]+`.
    pub fn save(&self, name: &str, spec: &WatermarkSpec) -> Result<PathBuf, TemplateError> {
        if !is_valid_name(name) {
            return Err(TemplateError::InvalidName(name.to_string()));
        }
        fs::create_dir_all(&self.directory)?;
        let path = self.template_path(name);
        let json = serde_json::to_string_pretty(spec)?;
        fs::write(&path, json)?;
        info!("saved template {:?} to {:?}", name, path);
        Ok(path)
    }

    /// Names of all stored templates, sorted. A store whose directory does
    /// not exist yet is simply empty.
    pub fn list(&self) -> Result<Vec<String>, TemplateError> {
        if !self.directory.exists() {
            debug!("template directory {:?} not present yet", self.directory);
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Restore a stored spec. A file that does not parse into an in-range
    /// spec is reported corrupt rather than silently replaced by defaults.
    pub fn load(&self, name: &str) -> Result<WatermarkSpec, TemplateError> {
        let path = self.template_path(name);
        if !path.exists() {
            return Err(TemplateError::Missing(name.to_string()));
        }
        let json = fs::read_to_string(&path)?;
        let spec: WatermarkSpec =
            serde_json::from_str(&json).map_err(|e| TemplateError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        spec.validate().map_err(|reason| TemplateError::Corrupt {
            name: name.to_string(),
            reason,
        })?;
        Ok(spec)
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.json"))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::{Color, WatermarkMode};
    use tempfile::TempDir;

    fn store() -> (TemplateStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (TemplateStore::new(temp_dir.path().join("templates")), temp_dir)
    }

    fn sample_spec() -> WatermarkSpec {
        WatermarkSpec {
            mode: WatermarkMode::Text,
            text: "© Example".to_string(),
            font_family: "DejaVuSans".to_string(),
            font_size: 36.0,
            bold: true,
            italic: false,
            color: Color::new(200, 180, 40),
            opacity: 0.7,
            image_path: None,
            image_opacity: 0.5,
            image_scale: 1.25,
            x: 42,
            y: 17,
            rotation: -30.0,
        }
    }

    #[test]
    fn test_round_trip_with_null_image_path() {
        let (store, _guard) = store();
        let spec = sample_spec();
        store.save("my-template", &spec).unwrap();
        let restored = store.load("my-template").unwrap();
        assert_eq!(restored, spec);
    }

    #[test]
    fn test_round_trip_with_image_path() {
        let (store, _guard) = store();
        let mut spec = sample_spec();
        spec.mode = WatermarkMode::Image;
        spec.image_path = Some(PathBuf::from("/tmp/logo.png"));
        store.save("logo_v2", &spec).unwrap();
        assert_eq!(store.load("logo_v2").unwrap(), spec);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let (store, _guard) = store();
        for bad in ["", "has space", "slash/name", "dot.name", "naïve"] {
            assert!(
                matches!(
                    store.save(bad, &sample_spec()),
                    Err(TemplateError::InvalidName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_template() {
        let (store, _guard) = store();
        assert!(matches!(
            store.load("nope"),
            Err(TemplateError::Missing(_))
        ));
    }

    #[test]
    fn test_corrupt_template() {
        let (store, _guard) = store();
        store.save("seed", &sample_spec()).unwrap();
        fs::write(store.directory().join("mangled.json"), b"{ not json").unwrap();
        assert!(matches!(
            store.load("mangled"),
            Err(TemplateError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_out_of_range_spec_is_corrupt() {
        let (store, _guard) = store();
        let mut spec = sample_spec();
        store.save("seed", &spec).unwrap();
        // Hand-edit the stored JSON to an impossible opacity
        let path = store.directory().join("seed.json");
        let json = fs::read_to_string(&path).unwrap().replace("0.7", "7.0");
        fs::write(&path, json).unwrap();
        assert!(matches!(
            store.load("seed"),
            Err(TemplateError::Corrupt { .. })
        ));
        // And an invalid scale is caught by the same validation
        spec.image_scale = 0.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_list_is_sorted_and_tolerates_missing_directory() {
        let (store, _guard) = store();
        assert!(store.list().unwrap().is_empty());

        store.save("zebra", &sample_spec()).unwrap();
        store.save("alpha", &sample_spec()).unwrap();
        fs::write(store.directory().join("notes.txt"), b"ignored").unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha", "zebra"]);
    }
}
