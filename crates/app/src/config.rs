//! Stamper configuration.
//!
//! Tunables for placing items on the canvas. Values come from built-in
//! defaults, optionally overridden from the environment.

use stamp_engine::geometry::DEFAULT_DISPLAY_SCALE;
use stamp_engine::{DisplayScale, ScreenPoint};
use std::ops::RangeInclusive;

/// Default top-left position of newly added items, in screen pixels.
pub const DEFAULT_POSITION: ScreenPoint = ScreenPoint { x: 200.0, y: 200.0 };

/// Default scale applied to a freshly loaded image.
pub const DEFAULT_IMAGE_SCALE: f32 = 0.5;

/// Default font size for text items, in points.
pub const DEFAULT_FONT_SIZE: f32 = 24.0;

/// Range offered by the image scale slider.
pub const SCALE_RANGE: RangeInclusive<f32> = 0.1..=2.0;

/// Configuration for the stamping canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct StamperConfig {
    /// Screen pixels per PDF point, used both to render and to place.
    pub display_scale: f32,

    /// Scale given to images when they are first added.
    pub default_image_scale: f32,

    /// Font size of new text items, in points.
    pub text_font_size: f32,

    /// Where new items appear on the canvas.
    pub default_position: ScreenPoint,

    /// Bounds of the image scale slider.
    pub scale_range: RangeInclusive<f32>,
}

impl Default for StamperConfig {
    fn default() -> Self {
        Self {
            display_scale: DEFAULT_DISPLAY_SCALE,
            default_image_scale: DEFAULT_IMAGE_SCALE,
            text_font_size: DEFAULT_FONT_SIZE,
            default_position: DEFAULT_POSITION,
            scale_range: SCALE_RANGE,
        }
    }
}

impl StamperConfig {
    /// Sets the display scale.
    pub fn with_display_scale(mut self, scale: f32) -> Self {
        self.display_scale = scale;
        self
    }

    /// Sets the initial scale of new images.
    pub fn with_image_scale(mut self, scale: f32) -> Self {
        self.default_image_scale = scale;
        self
    }

    /// Sets the font size of new text items.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.text_font_size = size;
        self
    }

    /// Sets where new items are placed.
    pub fn with_default_position(mut self, position: ScreenPoint) -> Self {
        self.default_position = position;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Supported variables:
    /// - `PDF_STAMPER_DISPLAY_SCALE`: screen pixels per point
    /// - `PDF_STAMPER_IMAGE_SCALE`: initial image scale
    /// - `PDF_STAMPER_FONT_SIZE`: text font size in points
    ///
    /// Values that are missing keep their defaults. Values that do not parse
    /// as a positive number are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(scale) = positive_env("PDF_STAMPER_DISPLAY_SCALE") {
            config.display_scale = scale;
        }

        if let Some(scale) = positive_env("PDF_STAMPER_IMAGE_SCALE") {
            config.default_image_scale = scale.clamp(*SCALE_RANGE.start(), *SCALE_RANGE.end());
        }

        if let Some(size) = positive_env("PDF_STAMPER_FONT_SIZE") {
            config.text_font_size = size;
        }

        config
    }

    /// The display scale as the engine's checked type.
    pub fn scale(&self) -> DisplayScale {
        DisplayScale::new(self.display_scale).unwrap_or_default()
    }
}

fn positive_env(key: &str) -> Option<f32> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<f32>() {
        Ok(value) if value.is_finite() && value > 0.0 => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const KEYS: [&str; 3] =
        ["PDF_STAMPER_DISPLAY_SCALE", "PDF_STAMPER_IMAGE_SCALE", "PDF_STAMPER_FONT_SIZE"];

    #[test]
    fn test_default_config() {
        let config = StamperConfig::default();
        assert_eq!(config.display_scale, 1.5);
        assert_eq!(config.default_image_scale, 0.5);
        assert_eq!(config.text_font_size, 24.0);
        assert_eq!(config.default_position, ScreenPoint::new(200.0, 200.0));
        assert_eq!(config.scale_range, 0.1..=2.0);
    }

    #[test]
    fn test_builder_methods() {
        let config = StamperConfig::default()
            .with_display_scale(2.0)
            .with_image_scale(1.0)
            .with_font_size(12.0)
            .with_default_position(ScreenPoint::new(10.0, 20.0));

        assert_eq!(config.display_scale, 2.0);
        assert_eq!(config.default_image_scale, 1.0);
        assert_eq!(config.text_font_size, 12.0);
        assert_eq!(config.default_position, ScreenPoint::new(10.0, 20.0));
    }

    #[test]
    fn test_degenerate_display_scale_falls_back() {
        let config = StamperConfig::default().with_display_scale(0.0);
        assert_eq!(config.scale().factor(), 1.5);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&KEYS);

        env::set_var("PDF_STAMPER_DISPLAY_SCALE", "2");
        env::set_var("PDF_STAMPER_IMAGE_SCALE", "0.75");
        env::set_var("PDF_STAMPER_FONT_SIZE", " 18 ");

        let config = StamperConfig::from_env();
        assert_eq!(config.display_scale, 2.0);
        assert_eq!(config.default_image_scale, 0.75);
        assert_eq!(config.text_font_size, 18.0);
    }

    #[test]
    #[serial]
    fn test_from_env_partial() {
        let _guard = EnvGuard::new(&KEYS);

        env::remove_var("PDF_STAMPER_DISPLAY_SCALE");
        env::remove_var("PDF_STAMPER_IMAGE_SCALE");
        env::set_var("PDF_STAMPER_FONT_SIZE", "30");

        let config = StamperConfig::from_env();
        assert_eq!(config.display_scale, 1.5); // default
        assert_eq!(config.default_image_scale, 0.5); // default
        assert_eq!(config.text_font_size, 30.0);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_values_are_ignored() {
        let _guard = EnvGuard::new(&KEYS);

        env::set_var("PDF_STAMPER_DISPLAY_SCALE", "not_a_number");
        env::set_var("PDF_STAMPER_IMAGE_SCALE", "-1");
        env::set_var("PDF_STAMPER_FONT_SIZE", "0");

        assert_eq!(StamperConfig::from_env(), StamperConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_clamps_image_scale_to_slider() {
        let _guard = EnvGuard::new(&KEYS);

        env::set_var("PDF_STAMPER_IMAGE_SCALE", "5");

        assert_eq!(StamperConfig::from_env().default_image_scale, 2.0);
    }

    // Saves and restores environment variables around a test
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
