//! Image preprocessing filters for OCR
//!
//! Prepares a label photograph for the first OCR pass: downscale, grayscale,
//! histogram equalization, blur and adaptive binarization.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use std::path::Path;
use tracing::debug;

use super::{ImagePreparer, LabelImage, OcrError};
use crate::config::PreprocessSettings;

/// Preprocessing pipeline configured from settings
#[derive(Debug, Clone)]
pub struct Preprocessor {
    settings: PreprocessSettings,
}

impl Preprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self { settings }
    }

    /// Apply the configured filters to a decoded image
    pub fn process(&self, image: DynamicImage) -> GrayImage {
        let settings = &self.settings;
        if !settings.enabled {
            debug!("OCR preprocessing disabled");
            return image.to_luma8();
        }

        debug!(
            "OCR preprocessing: max={}x{}, equalize={}, blur_sigma={}, threshold={} (block {}, offset {})",
            settings.max_width,
            settings.max_height,
            settings.equalize,
            settings.blur_sigma,
            settings.threshold,
            settings.threshold_block_size,
            settings.threshold_offset
        );

        let mut gray = fit_within(image, settings.max_width, settings.max_height).to_luma8();

        if settings.equalize {
            gray = imageproc::contrast::equalize_histogram(&gray);
        }

        if settings.blur_sigma > 0.0 {
            gray = imageproc::filter::gaussian_blur_f32(&gray, settings.blur_sigma);
        }

        if settings.threshold {
            gray = adaptive_threshold(
                &gray,
                settings.threshold_block_size,
                settings.threshold_offset,
            );
        }

        gray
    }
}

impl ImagePreparer for Preprocessor {
    fn prepare(&self, path: &Path) -> Result<LabelImage, OcrError> {
        let image = image::open(path).map_err(|source| OcrError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LabelImage::Buffer(self.process(image)))
    }
}

/// Downscale to fit within the bounds, preserving aspect ratio. Never upscales.
fn fit_within(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= max_width && height <= max_height {
        return image;
    }

    let scale = (max_width as f32 / width as f32).min(max_height as f32 / height as f32);
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);
    debug!("Resizing {}x{} -> {}x{}", width, height, new_width, new_height);

    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Binarize against the local mean of a `block_size` square window minus `offset`.
///
/// Pixels brighter than the threshold become white, the rest black. Windows
/// are clipped at the image border.
fn adaptive_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;
    let radius = (block_size.max(1) / 2) as usize;

    // Summed-area table with a zero row/column in front
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * (w + 1) + x + 1] = integral[y * (w + 1) + x + 1] + row_sum;
        }
    }

    let mut result = GrayImage::new(width, height);
    for y in 0..h {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(w);

            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let count = ((y1 - y0) * (x1 - x0)) as f32;
            let threshold = sum as f32 / count - offset as f32;

            let value = image.get_pixel(x as u32, y as u32)[0] as f32;
            let out = if value > threshold { 255 } else { 0 };
            result.put_pixel(x as u32, y as u32, Luma([out]));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn settings() -> PreprocessSettings {
        PreprocessSettings::default()
    }

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        let image = DynamicImage::new_rgb8(2400, 1600);
        let resized = fit_within(image, 1200, 1600);
        assert_eq!((resized.width(), resized.height()), (1200, 800));
    }

    #[test]
    fn test_fit_within_never_upscales() {
        let image = DynamicImage::new_rgb8(300, 200);
        let resized = fit_within(image, 1200, 1600);
        assert_eq!((resized.width(), resized.height()), (300, 200));
    }

    #[test]
    fn test_threshold_uniform_image_is_white() {
        let image = GrayImage::from_pixel(8, 8, Luma([120]));
        let result = adaptive_threshold(&image, 11, 2);
        assert!(result.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_threshold_dark_text_on_light_background() {
        let mut image = GrayImage::from_pixel(15, 15, Luma([220]));
        image.put_pixel(7, 7, Luma([30]));
        let result = adaptive_threshold(&image, 11, 2);
        assert_eq!(result.get_pixel(7, 7)[0], 0);
        assert_eq!(result.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_disabled_preprocessing_returns_grayscale() {
        let mut config = settings();
        config.enabled = false;
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([255, 0, 0])));

        let gray = Preprocessor::new(config).process(image);
        assert_eq!(gray.dimensions(), (4, 3));
        assert!(gray.pixels().all(|p| p[0] == gray.get_pixel(0, 0)[0]));
    }

    #[test]
    fn test_output_is_binary() {
        let mut image = RgbImage::new(40, 30);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let v = ((x * 7 + y * 3) % 256) as u8;
            *pixel = image::Rgb([v, v, v]);
        }

        let gray = Preprocessor::new(settings()).process(DynamicImage::ImageRgb8(image));
        assert_eq!(gray.dimensions(), (40, 30));
        assert!(gray.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_prepare_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        GrayImage::from_pixel(20, 10, Luma([200])).save(&path).unwrap();

        let prepared = Preprocessor::new(settings()).prepare(&path).unwrap();
        match prepared {
            LabelImage::Buffer(buffer) => assert_eq!(buffer.dimensions(), (20, 10)),
            other => panic!("expected buffer, got {}", other),
        }
    }

    #[test]
    fn test_prepare_missing_file() {
        let result = Preprocessor::new(settings()).prepare(Path::new("/nonexistent/label.png"));
        assert!(matches!(result, Err(OcrError::ImageLoad { .. })));
    }
}
