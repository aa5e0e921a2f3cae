//! Windows OCR API backend
//!
//! Uses the built-in Windows OCR (Media.Ocr) and reports one detection per
//! recognized line.

use image::GrayImage;
use tracing::{debug, info, warn};
use windows::{
    core::HSTRING,
    Foundation::IAsyncOperation,
    Globalization::Language,
    Graphics::Imaging::{BitmapPixelFormat, SoftwareBitmap},
    Media::Ocr::{OcrEngine as WinOcrEngine, OcrResult as WinOcrResult},
};

use super::{LabelImage, OcrDetection, OcrError, OcrResult, TextRecognizer};

/// Windows OCR engine wrapper
pub struct WindowsOcr {
    engine: WinOcrEngine,
    language: String,
}

impl WindowsOcr {
    /// Create a new Windows OCR engine for a language tag.
    ///
    /// Tesseract-style codes such as `eng` are mapped to `en-US`.
    pub fn new(language: &str) -> Result<Self, OcrError> {
        let language_tag = match language {
            "eng" => "en-US",
            other => other,
        };
        info!("Initializing Windows OCR engine with language: {}", language_tag);

        let language = Language::CreateLanguage(&HSTRING::from(language_tag)).map_err(init_error)?;

        if !WinOcrEngine::IsLanguageSupported(&language).map_err(init_error)? {
            warn!("Language '{}' not supported, falling back to system default", language_tag);
            let engine = WinOcrEngine::TryCreateFromUserProfileLanguages().map_err(init_error)?;
            let lang_tag = engine
                .RecognizerLanguage()
                .and_then(|lang| lang.LanguageTag())
                .map_err(init_error)?
                .to_string();

            info!("Windows OCR initialized with language: {}", lang_tag);
            return Ok(Self {
                engine,
                language: lang_tag,
            });
        }

        let engine = WinOcrEngine::TryCreateFromLanguage(&language).map_err(init_error)?;

        Ok(Self {
            engine,
            language: language_tag.to_string(),
        })
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    fn recognize_gray(&self, gray: &GrayImage) -> Result<Vec<OcrDetection>, OcrError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(vec![]);
        }

        debug!("Windows OCR ({}): processing {}x{} image", self.language, width, height);

        let bgra = gray_to_bgra(gray);
        let bitmap = create_software_bitmap(&bgra, width, height).map_err(recognition_error)?;
        let ocr_result = run_ocr_sync(&self.engine, &bitmap).map_err(recognition_error)?;
        extract_lines(&ocr_result).map_err(recognition_error)
    }
}

impl TextRecognizer for WindowsOcr {
    fn name(&self) -> &str {
        "windows"
    }

    fn recognize(&self, image: &LabelImage) -> Result<OcrResult, OcrError> {
        let detections = match image {
            LabelImage::File(path) => {
                let gray = image::open(path)
                    .map_err(|source| OcrError::ImageLoad {
                        path: path.clone(),
                        source,
                    })?
                    .to_luma8();
                self.recognize_gray(&gray)?
            }
            LabelImage::Buffer(gray) => self.recognize_gray(gray)?,
        };
        Ok(OcrResult::from_detections(detections))
    }
}

fn init_error(err: windows::core::Error) -> OcrError {
    OcrError::EngineInit(err.message().to_string())
}

fn recognition_error(err: windows::core::Error) -> OcrError {
    OcrError::Recognition(err.message().to_string())
}

/// Expand grayscale pixels to BGRA (Windows expects BGRA)
fn gray_to_bgra(gray: &GrayImage) -> Vec<u8> {
    let mut bgra = Vec::with_capacity(gray.as_raw().len() * 4);
    for &value in gray.as_raw() {
        bgra.extend_from_slice(&[value, value, value, 255]);
    }
    bgra
}

/// Create a SoftwareBitmap from BGRA data using CopyFromBuffer
fn create_software_bitmap(
    bgra_data: &[u8],
    width: u32,
    height: u32,
) -> windows::core::Result<SoftwareBitmap> {
    use windows::Storage::Streams::{DataReader, DataWriter, InMemoryRandomAccessStream};

    let stream = InMemoryRandomAccessStream::new()?;
    let writer = DataWriter::CreateDataWriter(&stream)?;
    writer.WriteBytes(bgra_data)?;
    writer.StoreAsync()?.get()?;
    writer.FlushAsync()?.get()?;
    stream.Seek(0)?;

    let bitmap = SoftwareBitmap::Create(BitmapPixelFormat::Bgra8, width as i32, height as i32)?;

    let input_stream = stream.GetInputStreamAt(0)?;
    let reader = DataReader::CreateDataReader(&input_stream)?;
    reader.LoadAsync(bgra_data.len() as u32)?.get()?;
    let buffer = reader.ReadBuffer(bgra_data.len() as u32)?;
    bitmap.CopyFromBuffer(&buffer)?;

    Ok(bitmap)
}

/// Run OCR synchronously (blocks until complete)
fn run_ocr_sync(
    engine: &WinOcrEngine,
    bitmap: &SoftwareBitmap,
) -> windows::core::Result<WinOcrResult> {
    let async_op: IAsyncOperation<WinOcrResult> = engine.RecognizeAsync(bitmap)?;
    async_op.get()
}

/// One detection per OCR line, bounds are the union of its word boxes
fn extract_lines(ocr_result: &WinOcrResult) -> windows::core::Result<Vec<OcrDetection>> {
    let mut detections = Vec::new();

    let lines = ocr_result.Lines()?;
    for i in 0..lines.Size()? {
        let line = lines.GetAt(i)?;
        let text = line.Text()?.to_string();

        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        let words = line.Words()?;
        for j in 0..words.Size()? {
            let rect = words.GetAt(j)?.BoundingRect()?;
            let (x0, y0, x1, y1) = (rect.X, rect.Y, rect.X + rect.Width, rect.Y + rect.Height);
            bounds = Some(match bounds {
                Some((bx0, by0, bx1, by1)) => (bx0.min(x0), by0.min(y0), bx1.max(x1), by1.max(y1)),
                None => (x0, y0, x1, y1),
            });
        }
        let (x0, y0, x1, y1) = bounds.unwrap_or_default();

        detections.push(OcrDetection {
            text,
            bounds: (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32),
            // Windows OCR doesn't provide confidence
            confidence: 1.0,
        });
    }

    Ok(detections)
}
