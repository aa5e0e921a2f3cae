//! Storage Layer
//!
//! Persistence of analysis records using SQLite, plus platform directory
//! resolution for the database and configuration files.

pub mod database;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use database::Database;

use crate::nutrition::NutrientProfile;
use crate::scoring::Verdict;

/// Database file name inside the data directory
const DATABASE_FILE: &str = "nutricheck.db";

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "nutricheck", "NutriCheck")
        .ok_or_else(|| anyhow::anyhow!("Could not determine application directories"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default location of the analysis database
pub fn default_database_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DATABASE_FILE))
}

/// Fields of an analysis before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub product_name: String,
    pub image_path: String,
    #[serde(flatten)]
    pub nutrients: NutrientProfile,
    pub health_score: u8,
    pub verdict: Verdict,
    pub explanation: String,
    pub recommendation: String,
    pub raw_ocr_text: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub product_name: String,
    pub image_path: String,
    #[serde(flatten)]
    pub nutrients: NutrientProfile,
    pub health_score: u8,
    pub verdict: Verdict,
    pub explanation: String,
    pub recommendation: String,
    pub raw_ocr_text: String,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Attach a store-assigned id to new analysis fields
    pub fn from_new(id: i64, analysis: NewAnalysis) -> Self {
        Self {
            id,
            product_name: analysis.product_name,
            image_path: analysis.image_path,
            nutrients: analysis.nutrients,
            health_score: analysis.health_score,
            verdict: analysis.verdict,
            explanation: analysis.explanation,
            recommendation: analysis.recommendation,
            raw_ocr_text: analysis.raw_ocr_text,
            created_at: analysis.created_at,
        }
    }
}

/// Persistence contract for analysis records. Ids are assigned by the store.
pub trait AnalysisStore: Send + Sync {
    /// Save an analysis and return its new id
    fn insert(&self, analysis: &NewAnalysis) -> Result<i64>;

    /// Fetch one record
    fn get(&self, id: i64) -> Result<Option<AnalysisRecord>>;

    /// Remove a record, true if one existed
    fn delete(&self, id: i64) -> Result<bool>;

    /// All records, most recent first
    fn list(&self) -> Result<Vec<AnalysisRecord>>;

    /// Records for the given ids in request order; unknown ids are skipped
    fn get_many(&self, ids: &[i64]) -> Result<Vec<AnalysisRecord>>;
}
