use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod assets;
pub mod export;
pub mod preview;
pub mod templates;
pub mod watermark;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FontConfig {
    /// Directory searched for `<family>[-Style].ttf` files.
    pub directory: PathBuf,
    pub default_family: String,
    pub default_size: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewConfig {
    /// Minimum interval between consecutive preview renders.
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplatesConfig {
    /// Overrides the per-user default template directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            fonts: FontConfig::default(),
            preview: PreviewConfig::default(),
            export: ExportConfig::default(),
            templates: TemplatesConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Sukashi".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("fonts"),
            default_family: "DejaVuSans".to_string(),
            default_size: 48.0,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { jpeg_quality: 80 }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self { directory: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.preview.debounce_ms, 100);
        assert_eq!(config.export.jpeg_quality, 80);
        assert!(config.templates.directory.is_none());
    }

    #[test]
    fn test_partial_config_parses_with_defaults() {
        let toml = r#"
            [fonts]
            directory = "/opt/fonts"
            default_family = "Inter"
            default_size = 36.0
        "#;
        let config: Config = toml_edit::de::from_str(toml).unwrap();
        assert_eq!(config.fonts.directory, PathBuf::from("/opt/fonts"));
        assert_eq!(config.fonts.default_family, "Inter");
        // Sections absent from the file keep their defaults
        assert_eq!(config.export.jpeg_quality, 80);
        assert_eq!(config.preview.debounce_ms, 100);
    }
}
