//! Application Coordinator
//!
//! Owns the long-lived collaborators (OCR service, preprocessor, database)
//! and hands out analyzers borrowing them.

use anyhow::Result;
use tracing::info;

use crate::analysis::Analyzer;
use crate::config::AppConfig;
use crate::storage::{self, Database};
use crate::vision::{OcrService, Preprocessor};

/// Main application coordinator
pub struct NutriCheckApp {
    ocr: OcrService,
    preprocessor: Preprocessor,
    database: Database,
}

impl NutriCheckApp {
    /// Wire collaborators from configuration; the OCR engine itself is built on first use
    pub fn new(config: AppConfig) -> Result<Self> {
        let database_path = match config.storage.database_path {
            Some(path) => path,
            None => storage::default_database_path()?,
        };
        let database = Database::open(&database_path)?;

        info!(
            "NutriCheck ready (OCR backend: {:?}, database: {})",
            config.ocr.backend,
            database_path.display()
        );

        Ok(Self {
            ocr: OcrService::from_settings(&config.ocr),
            preprocessor: Preprocessor::new(config.preprocessing),
            database,
        })
    }

    /// Label analysis pipeline over this app's collaborators
    pub fn analyzer(&self) -> Analyzer<'_> {
        Analyzer::new(&self.ocr, &self.preprocessor, &self.database)
    }

    /// Analysis store
    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AnalysisStore;

    #[test]
    fn test_new_uses_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.db");
        let mut config = AppConfig::default();
        config.storage.database_path = Some(path.clone());

        let app = NutriCheckApp::new(config).unwrap();

        assert!(path.exists());
        assert!(app.database().list().unwrap().is_empty());
    }
}
