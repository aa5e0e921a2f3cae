//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::OcrBackend;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// OCR engine settings
    pub ocr: OcrSettings,
    /// Image preprocessing settings
    pub preprocessing: PreprocessSettings,
    /// Persistence settings
    pub storage: StorageSettings,
}

/// OCR engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Which backend to construct
    pub backend: OcrBackend,
    /// Tesseract executable name or path
    pub tesseract_path: PathBuf,
    /// Recognition language (tesseract code, e.g. "eng")
    pub language: String,
    /// Serialize calls into the engine
    pub serialize_inference: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            serialize_inference: true,
        }
    }
}

/// Image preprocessing settings applied before the first OCR pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Run the filter chain at all (grayscale only when false)
    pub enabled: bool,
    /// Images wider than this are downscaled
    pub max_width: u32,
    /// Images taller than this are downscaled
    pub max_height: u32,
    /// Histogram equalization for contrast
    pub equalize: bool,
    /// Gaussian blur sigma, 0 disables
    pub blur_sigma: f32,
    /// Adaptive mean binarization
    pub threshold: bool,
    /// Neighborhood size for the adaptive threshold
    pub threshold_block_size: u32,
    /// Constant subtracted from the local mean
    pub threshold_offset: i32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_width: 1200,
            max_height: 1600,
            equalize: true,
            blur_sigma: 0.8,
            threshold: true,
            threshold_block_size: 11,
            threshold_offset: 2,
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file, defaults to the platform data directory
    pub database_path: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // OCR defaults
        assert_eq!(config.ocr.backend, OcrBackend::Tesseract);
        assert_eq!(config.ocr.tesseract_path, PathBuf::from("tesseract"));
        assert_eq!(config.ocr.language, "eng");
        assert!(config.ocr.serialize_inference);

        // Preprocessing defaults
        assert!(config.preprocessing.enabled);
        assert_eq!(config.preprocessing.max_width, 1200);
        assert_eq!(config.preprocessing.max_height, 1600);
        assert!(config.preprocessing.equalize);
        assert!((config.preprocessing.blur_sigma - 0.8).abs() < 0.01);
        assert!(config.preprocessing.threshold);
        assert_eq!(config.preprocessing.threshold_block_size, 11);
        assert_eq!(config.preprocessing.threshold_offset, 2);

        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.ocr.backend = OcrBackend::Windows;
        config.preprocessing.blur_sigma = 0.0;
        config.storage.database_path = Some(PathBuf::from("/tmp/labels.db"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.ocr.backend, OcrBackend::Windows);
        assert_eq!(parsed.preprocessing.blur_sigma, 0.0);
        assert_eq!(
            parsed.storage.database_path,
            Some(PathBuf::from("/tmp/labels.db"))
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [ocr]
            backend = "windows"

            [preprocessing]
            threshold = false
            "#,
        )
        .unwrap();

        assert_eq!(parsed.ocr.backend, OcrBackend::Windows);
        assert_eq!(parsed.ocr.language, "eng");
        assert!(!parsed.preprocessing.threshold);
        assert_eq!(parsed.preprocessing.max_width, 1200);
        assert!(parsed.storage.database_path.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.ocr.language = "deu".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.ocr.language, "deu");
        assert_eq!(
            loaded.preprocessing.threshold_block_size,
            config.preprocessing.threshold_block_size
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[ocr]\nbackend = \"paddle\"\n");
        assert!(result.is_err());
    }
}
