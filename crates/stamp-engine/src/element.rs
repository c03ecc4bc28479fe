//! Elements placed on the page, as handed to [`crate::StampEngine::save`].
//!
//! Positions are always in screen space; the engine converts them at save time.

use crate::bitmap::{self, RgbaImage};
use crate::geometry::ScreenPoint;
use std::sync::Arc;

/// RGB fill color with each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const BLACK: TextColor = TextColor { r: 0.0, g: 0.0, b: 0.0 };

    /// Builds a color, clamping each channel into range.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self { r: clamp(r), g: clamp(g), b: clamp(b) }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self { r: r as f32 / 255.0, g: g as f32 / 255.0, b: b as f32 / 255.0 }
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let channel = |v: f32| (v * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b)]
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone)]
pub struct ImageElement {
    /// Top-left corner on the canvas.
    pub position: ScreenPoint,
    pub scale: f32,
    /// Unscaled source bitmap; every resample starts from here.
    pub original: Arc<RgbaImage>,
}

impl ImageElement {
    /// On-screen pixel size at the current scale.
    pub fn screen_size(&self) -> (u32, u32) {
        bitmap::scaled_dimensions(self.original.width(), self.original.height(), self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    /// Start of the baseline on the canvas.
    pub position: ScreenPoint,
    pub content: String,
    /// Font size in points.
    pub font_size: f32,
    pub color: TextColor,
}

#[derive(Debug, Clone)]
pub enum PlacedElement {
    Image(ImageElement),
    Text(TextElement),
}

impl PlacedElement {
    pub fn position(&self) -> ScreenPoint {
        match self {
            PlacedElement::Image(image) => image.position,
            PlacedElement::Text(text) => text.position,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlacedElement::Image(_) => "image",
            PlacedElement::Text(_) => "text",
        }
    }
}
