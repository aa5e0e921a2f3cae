//! Analysis Engine
//!
//! Runs the label pipeline: two OCR passes, nutrient extraction on each,
//! merge, product naming, scoring and persistence.

pub mod comparison;

use chrono::{SubsecRound, Utc};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

pub use comparison::{compare_ids, NutrientStanding};

use crate::nutrition::{extract_nutrients, extract_product_name, NutrientProfile};
use crate::scoring::{self, ScoreBreakdown, ScoreBundle};
use crate::storage::{AnalysisRecord, AnalysisStore, NewAnalysis};
use crate::vision::{ImagePreparer, LabelImage, OcrError, OcrService};

/// Errors that abort an analysis; nothing is persisted when one is raised
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("failed to save analysis: {0:#}")]
    Storage(anyhow::Error),
}

/// A saved analysis together with its point breakdown
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisOutcome {
    #[serde(flatten)]
    pub record: AnalysisRecord,
    pub breakdown: ScoreBreakdown,
}

/// Scoring of already transcribed label text
#[derive(Debug, Clone, serde::Serialize)]
pub struct TextEvaluation {
    pub product_name: String,
    pub nutrients: NutrientProfile,
    #[serde(flatten)]
    pub score: ScoreBundle,
}

/// Label analysis pipeline over injected collaborators
pub struct Analyzer<'a> {
    ocr: &'a OcrService,
    preparer: &'a dyn ImagePreparer,
    store: &'a dyn AnalysisStore,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        ocr: &'a OcrService,
        preparer: &'a dyn ImagePreparer,
        store: &'a dyn AnalysisStore,
    ) -> Self {
        Self {
            ocr,
            preparer,
            store,
        }
    }

    /// Analyze a label photograph and persist the result
    pub fn analyze(&self, image_path: &Path) -> Result<AnalysisOutcome, AnalysisError> {
        let start = Instant::now();
        info!("Analyzing {}", image_path.display());

        // Pass A: preprocessed image
        let prepared = self.preparer.prepare(image_path)?;
        let pass_a = self.ocr.recognize(&prepared)?;
        let nutrients_a = extract_nutrients(&pass_a.full_text);
        debug!(
            "Pass A: {} detections, {} nutrients found",
            pass_a.detections.len(),
            nutrients_a.known_count()
        );

        // Pass B: unmodified image
        let pass_b = self
            .ocr
            .recognize(&LabelImage::File(image_path.to_path_buf()))?;
        let nutrients_b = extract_nutrients(&pass_b.full_text);
        debug!(
            "Pass B: {} detections, {} nutrients found",
            pass_b.detections.len(),
            nutrients_b.known_count()
        );

        let nutrients = nutrients_a.merged_with(&nutrients_b);
        debug!("Merged profile: {} of 6 nutrients known", nutrients.known_count());

        let product_name = extract_product_name(&pass_b.lines());
        let bundle = scoring::score(&nutrients);
        debug!("Score {} ({})", bundle.health_score, bundle.verdict);

        let analysis = NewAnalysis {
            product_name,
            image_path: image_path.display().to_string(),
            nutrients,
            health_score: bundle.health_score,
            verdict: bundle.verdict,
            explanation: bundle.explanation,
            recommendation: bundle.recommendation,
            raw_ocr_text: pass_a.full_text,
            // Stored timestamps keep microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        };

        let id = self
            .store
            .insert(&analysis)
            .map_err(AnalysisError::Storage)?;
        info!(
            "Saved analysis {} for '{}' in {:?}",
            id,
            analysis.product_name,
            start.elapsed()
        );

        Ok(AnalysisOutcome {
            record: AnalysisRecord::from_new(id, analysis),
            breakdown: bundle.breakdown,
        })
    }
}

/// Extract and score label text without OCR or persistence
pub fn evaluate_text(text: &str) -> TextEvaluation {
    let lines: Vec<&str> = text.lines().collect();
    let nutrients = extract_nutrients(text);
    TextEvaluation {
        product_name: extract_product_name(&lines),
        nutrients,
        score: scoring::score(&nutrients),
    }
}
