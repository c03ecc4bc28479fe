//! Bitmap loading and resampling.

use crate::EngineResult;
use image::imageops::FilterType;
use image::{ImageBuffer, Rgba};
use std::path::Path;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Decodes any supported image file into an RGBA bitmap.
pub fn load_image(path: impl AsRef<Path>) -> EngineResult<RgbaImage> {
    let path = path.as_ref();
    let image = image::open(path)?.to_rgba8();
    tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "decoded image");
    Ok(image)
}

/// Dimensions of `width x height` scaled by `factor`, rounded, never below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let scale = |value: u32| (value as f32 * factor).round().max(1.0) as u32;
    (scale(width), scale(height))
}

/// Resamples `bitmap` by `factor` with a Lanczos filter.
///
/// Returns `None` when there is no input or the factor is not a positive number.
pub fn resize(bitmap: Option<&RgbaImage>, factor: f32) -> Option<RgbaImage> {
    let bitmap = bitmap?;
    if !factor.is_finite() || factor <= 0.0 {
        return None;
    }

    let (width, height) = scaled_dimensions(bitmap.width(), bitmap.height(), factor);
    if (width, height) == bitmap.dimensions() {
        return Some(bitmap.clone());
    }

    Some(image::imageops::resize(bitmap, width, height, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 128])
            }
        })
    }

    #[test]
    fn resize_rounds_dimensions() {
        let source = checkerboard(101, 33);
        let resized = resize(Some(&source), 0.5).expect("resize should succeed");

        assert_eq!(resized.dimensions(), (51, 17));
    }

    #[test]
    fn resize_by_one_preserves_dimensions() {
        let source = checkerboard(64, 48);
        for &factor in &[0.1_f32, 0.37, 0.5, 1.25, 2.0] {
            let once = resize(Some(&source), factor).expect("first resize should succeed");
            let twice = resize(Some(&once), 1.0).expect("identity resize should succeed");

            assert_eq!(once.dimensions(), twice.dimensions(), "factor {factor}");
            assert_eq!(once.dimensions(), scaled_dimensions(64, 48, factor));
        }
    }

    #[test]
    fn resize_never_collapses_to_zero() {
        let source = checkerboard(3, 3);
        let resized = resize(Some(&source), 0.01).expect("resize should succeed");

        assert_eq!(resized.dimensions(), (1, 1));
    }

    #[test]
    fn resize_without_input_returns_none() {
        assert!(resize(None, 0.5).is_none());
    }

    #[test]
    fn resize_rejects_non_positive_factor() {
        let source = checkerboard(8, 8);

        assert!(resize(Some(&source), 0.0).is_none());
        assert!(resize(Some(&source), -1.0).is_none());
        assert!(resize(Some(&source), f32::NAN).is_none());
    }

    #[test]
    fn load_image_normalizes_to_rgba() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("stamp.png");
        image::RgbImage::from_pixel(7, 5, image::Rgb([10, 20, 30]))
            .save(&path)
            .expect("fixture should be written");

        let loaded = load_image(&path).expect("png should decode");

        assert_eq!(loaded.dimensions(), (7, 5));
        assert_eq!(loaded.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn load_image_reports_garbage() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"definitely not pixels").expect("fixture should be written");

        assert!(load_image(&path).is_err());
    }
}
