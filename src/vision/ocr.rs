//! OCR (Optical Character Recognition) contracts
//!
//! Backends implement [`TextRecognizer`]. The application owns one
//! [`OcrService`], which builds its backend lazily on first use and reuses
//! it for every later call.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use super::{LabelImage, OcrBackend};
use crate::config::OcrSettings;

/// Errors raised by OCR backends and image preparation
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("failed to initialize OCR engine: {0}")]
    EngineInit(String),

    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image for OCR: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Single OCR detection
#[derive(Debug, Clone, PartialEq)]
pub struct OcrDetection {
    /// Recognized text
    pub text: String,
    /// Bounding box (x, y, width, height)
    pub bounds: (u32, u32, u32, u32),
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl OcrDetection {
    /// Detection with no region or confidence information
    #[cfg(test)]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounds: (0, 0, 0, 0),
            confidence: 1.0,
        }
    }
}

/// Output of one OCR pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrResult {
    /// Detections in recognition order
    pub detections: Vec<OcrDetection>,
    /// Detection texts joined with newlines
    pub full_text: String,
}

impl OcrResult {
    pub fn from_detections(detections: Vec<OcrDetection>) -> Self {
        let full_text = detections
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            detections,
            full_text,
        }
    }

    /// Per-detection texts
    pub fn lines(&self) -> Vec<&str> {
        self.detections.iter().map(|d| d.text.as_str()).collect()
    }
}

/// A text recognition backend
pub trait TextRecognizer: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Recognize text in an image
    fn recognize(&self, image: &LabelImage) -> Result<OcrResult, OcrError>;
}

type RecognizerFactory = Box<dyn Fn() -> Result<Box<dyn TextRecognizer>, OcrError> + Send + Sync>;

/// Lazily constructed, shared OCR engine
pub struct OcrService {
    factory: RecognizerFactory,
    /// Built once on first use; construction runs under this lock
    engine: Mutex<Option<Arc<dyn TextRecognizer>>>,
    /// Present when backend calls must not overlap
    inference: Option<Mutex<()>>,
}

impl OcrService {
    /// Create a service that builds its engine with `factory` on first use
    pub fn new<F>(factory: F, serialize_inference: bool) -> Self
    where
        F: Fn() -> Result<Box<dyn TextRecognizer>, OcrError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            engine: Mutex::new(None),
            inference: serialize_inference.then(|| Mutex::new(())),
        }
    }

    /// Create a service for the backend named in settings
    pub fn from_settings(settings: &OcrSettings) -> Self {
        let settings = settings.clone();
        let serialize = settings.serialize_inference;
        Self::new(move || build_backend(&settings), serialize)
    }

    /// Whether the engine has been constructed
    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.engine.lock().is_some()
    }

    /// Get the engine, constructing it if this is the first call
    fn engine(&self) -> Result<Arc<dyn TextRecognizer>, OcrError> {
        let mut slot = self.engine.lock();
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let start = Instant::now();
        let engine: Arc<dyn TextRecognizer> = Arc::from((self.factory)()?);
        info!("OCR engine '{}' initialized in {:?}", engine.name(), start.elapsed());
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    /// Run one OCR pass
    pub fn recognize(&self, image: &LabelImage) -> Result<OcrResult, OcrError> {
        let engine = self.engine()?;
        let _guard = self.inference.as_ref().map(|lock| lock.lock());

        let start = Instant::now();
        let result = engine.recognize(image)?;
        debug!(
            "OCR ({}) on {} complete in {:?}: {} detections",
            engine.name(),
            image,
            start.elapsed(),
            result.detections.len()
        );
        Ok(result)
    }
}

fn build_backend(settings: &OcrSettings) -> Result<Box<dyn TextRecognizer>, OcrError> {
    match settings.backend {
        OcrBackend::Tesseract => Ok(Box::new(super::TesseractOcr::new(
            &settings.tesseract_path,
            &settings.language,
        )?)),
        #[cfg(windows)]
        OcrBackend::Windows => Ok(Box::new(super::windows_ocr::WindowsOcr::new(
            &settings.language,
        )?)),
        #[cfg(not(windows))]
        OcrBackend::Windows => Err(OcrError::EngineInit(
            "Windows OCR is only available on Windows".to_string(),
        )),
    }
}
