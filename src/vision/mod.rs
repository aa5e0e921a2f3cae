//! Vision/OCR Layer
//!
//! Turns a label photograph into OCR text. Two collaborators live here:
//! - image preprocessing, which prepares a binarized buffer for OCR
//! - OCR backends behind [`TextRecognizer`], owned by an [`OcrService`]
//!
//! Supported OCR backends:
//! - Tesseract via its command-line executable (all platforms)
//! - Windows OCR API (Windows only)

pub mod ocr;
pub mod preprocess;
pub mod tesseract;
#[cfg(windows)]
pub mod windows_ocr;

use image::GrayImage;
use std::fmt;
use std::path::{Path, PathBuf};

pub use ocr::{OcrDetection, OcrError, OcrResult, OcrService, TextRecognizer};
pub use preprocess::Preprocessor;
pub use tesseract::TesseractOcr;

/// OCR backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Tesseract command-line executable
    #[default]
    Tesseract,
    /// Windows built-in OCR
    Windows,
}

/// An image handed to an OCR backend
#[derive(Debug, Clone)]
pub enum LabelImage {
    /// Unmodified image file on disk
    File(PathBuf),
    /// Preprocessed grayscale pixels
    Buffer(GrayImage),
}

impl fmt::Display for LabelImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelImage::File(path) => write!(f, "file {}", path.display()),
            LabelImage::Buffer(buffer) => {
                write!(f, "{}x{} buffer", buffer.width(), buffer.height())
            }
        }
    }
}

/// Prepares a photographed label for OCR
pub trait ImagePreparer: Send + Sync {
    fn prepare(&self, path: &Path) -> Result<LabelImage, OcrError>;
}
