//! Tesseract OCR backend
//!
//! Runs the `tesseract` executable with TSV output and groups word rows into
//! line-level detections.

use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use super::{LabelImage, OcrDetection, OcrError, OcrResult, TextRecognizer};

/// TSV `level` value for word rows
const WORD_LEVEL: &str = "5";

/// Tesseract command-line wrapper
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    /// Create a backend, checking that the executable runs
    pub fn new(binary: impl AsRef<Path>, language: &str) -> Result<Self, OcrError> {
        let binary = binary.as_ref().to_path_buf();
        info!(
            "Initializing Tesseract OCR ({}) with language: {}",
            binary.display(),
            language
        );

        let output = Command::new(&binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                OcrError::EngineInit(format!("cannot run {}: {}", binary.display(), e))
            })?;
        if !output.status.success() {
            return Err(OcrError::EngineInit(format!(
                "{} --version exited with {}",
                binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        debug!(
            "Tesseract version: {}",
            version.lines().next().unwrap_or("unknown")
        );

        Ok(Self {
            binary,
            language: language.to_string(),
        })
    }

    /// Run tesseract on an image file and return its TSV output
    fn run(&self, path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .args(["-l", &self.language])
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextRecognizer for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &LabelImage) -> Result<OcrResult, OcrError> {
        let tsv = match image {
            LabelImage::File(path) => self.run(path)?,
            LabelImage::Buffer(buffer) => {
                let file = tempfile::Builder::new()
                    .prefix("nutricheck-")
                    .suffix(".png")
                    .tempfile()?;
                buffer
                    .save_with_format(file.path(), ImageFormat::Png)
                    .map_err(OcrError::ImageEncode)?;
                self.run(file.path())?
            }
        };

        Ok(OcrResult::from_detections(parse_tsv(&tsv)))
    }
}

/// Line being assembled from word rows
struct LineBuilder {
    key: (u32, u32, u32, u32),
    words: Vec<String>,
    confidence_sum: f32,
    bounds: (u32, u32, u32, u32),
}

impl LineBuilder {
    fn finish(self) -> OcrDetection {
        let count = self.words.len() as f32;
        OcrDetection {
            text: self.words.join(" "),
            bounds: self.bounds,
            confidence: (self.confidence_sum / count / 100.0).clamp(0.0, 1.0),
        }
    }
}

/// Union of two (x, y, width, height) boxes
fn union_bounds(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> (u32, u32, u32, u32) {
    let left = a.0.min(b.0);
    let top = a.1.min(b.1);
    let right = (a.0 + a.2).max(b.0 + b.2);
    let bottom = (a.1 + a.3).max(b.1 + b.3);
    (left, top, right - left, bottom - top)
}

/// Group tesseract TSV word rows into line detections, in reading order
pub fn parse_tsv(tsv: &str) -> Vec<OcrDetection> {
    let mut lines: Vec<LineBuilder> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let text = cols[11..].join("\t");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let key = (num(1), num(2), num(3), num(4));
        let bounds = (num(6), num(7), num(8), num(9));
        let confidence = cols[10].trim().parse::<f32>().unwrap_or(0.0).max(0.0);

        match lines.iter_mut().find(|line| line.key == key) {
            Some(line) => {
                line.words.push(text.to_string());
                line.confidence_sum += confidence;
                line.bounds = union_bounds(line.bounds, bounds);
            }
            None => lines.push(LineBuilder {
                key,
                words: vec![text.to_string()],
                confidence_sum: confidence,
                bounds,
            }),
        }
    }

    lines.into_iter().map(LineBuilder::finish).collect()
}
