//! Canvas state: the placed items, their stacking order and the selection.
//!
//! Everything here is in screen space and free of any GUI types so the
//! interaction rules can be exercised without a window.

use crate::config::StamperConfig;
use stamp_engine::{
    resize, DisplayScale, ImageElement, PlacedElement, RgbaImage, ScreenPoint, TextColor,
    TextElement,
};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Stable handle of a canvas item. Ids grow in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u64);

impl ItemId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Image,
    Text,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Image => "IMAGE",
            ItemKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Nothing,
    Item { id: ItemId, kind: ItemKind },
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: ScreenPoint,
    pub max: ScreenPoint,
}

impl ScreenRect {
    pub fn from_min_size(min: ScreenPoint, width: f32, height: f32) -> Self {
        Self { min, max: ScreenPoint::new(min.x + width, min.y + height) }
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

#[derive(Debug, Clone)]
pub struct ImageItem {
    pub original: Arc<RgbaImage>,
    pub scale: f32,
    /// Resampled copy shown on screen.
    pub display: RgbaImage,
    /// Bumped every time `display` is replaced.
    pub revision: u64,
}

/// Laid-out size of a line of text in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
    /// Distance from the top of the line down to the baseline.
    pub ascent: f32,
}

#[derive(Debug, Clone)]
pub struct TextItem {
    pub content: String,
    pub font_size: f32,
    pub color: TextColor,
    /// Reported back by the renderer after the first layout.
    pub extent: Option<TextExtent>,
}

#[derive(Debug, Clone)]
pub enum ItemPayload {
    Image(ImageItem),
    Text(TextItem),
}

#[derive(Debug, Clone)]
pub struct CanvasItem {
    pub id: ItemId,
    /// Top-left corner for images, baseline start for text.
    pub position: ScreenPoint,
    pub payload: ItemPayload,
}

impl CanvasItem {
    pub fn kind(&self) -> ItemKind {
        match self.payload {
            ItemPayload::Image(_) => ItemKind::Image,
            ItemPayload::Text(_) => ItemKind::Text,
        }
    }

    /// On-screen bounds used for hit testing and the selection outline.
    pub fn bounds(&self, scale: DisplayScale) -> ScreenRect {
        match &self.payload {
            ItemPayload::Image(image) => ScreenRect::from_min_size(
                self.position,
                image.display.width() as f32,
                image.display.height() as f32,
            ),
            ItemPayload::Text(text) => {
                let extent = text.extent.unwrap_or_else(|| estimate_text_extent(text, scale));
                ScreenRect::from_min_size(
                    ScreenPoint::new(self.position.x, self.position.y - extent.ascent),
                    extent.width,
                    extent.height,
                )
            }
        }
    }

    fn to_element(&self) -> PlacedElement {
        match &self.payload {
            ItemPayload::Image(image) => PlacedElement::Image(ImageElement {
                position: self.position,
                scale: image.scale,
                original: Arc::clone(&image.original),
            }),
            ItemPayload::Text(text) => PlacedElement::Text(TextElement {
                position: self.position,
                content: text.content.clone(),
                font_size: text.font_size,
                color: text.color,
            }),
        }
    }
}

/// Rough extent until the renderer has laid the text out once.
fn estimate_text_extent(text: &TextItem, scale: DisplayScale) -> TextExtent {
    let pixel_size = text.font_size * scale.factor();
    let glyphs = text.content.chars().count().max(1) as f32;
    TextExtent { width: glyphs * pixel_size * 0.5, height: pixel_size, ascent: pixel_size * 0.8 }
}

/// The live set of items placed over the rendered page.
#[derive(Debug)]
pub struct Canvas {
    items: BTreeMap<ItemId, CanvasItem>,
    next_id: u64,
    selection: Selection,
    drag_anchor: Option<ScreenPoint>,
    display_scale: DisplayScale,
    default_position: ScreenPoint,
    default_image_scale: f32,
    font_size: f32,
    scale_range: RangeInclusive<f32>,
}

impl Canvas {
    pub fn new(config: &StamperConfig) -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
            selection: Selection::Nothing,
            drag_anchor: None,
            display_scale: config.scale(),
            default_position: config.default_position,
            default_image_scale: config.default_image_scale,
            font_size: config.text_font_size,
            scale_range: config.scale_range.clone(),
        }
    }

    pub fn display_scale(&self) -> DisplayScale {
        self.display_scale
    }

    pub fn scale_range(&self) -> RangeInclusive<f32> {
        self.scale_range.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items from bottom to top.
    pub fn items(&self) -> impl Iterator<Item = &CanvasItem> {
        self.items.values()
    }

    pub fn item(&self, id: ItemId) -> Option<&CanvasItem> {
        self.items.get(&id)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected(&self) -> Option<&CanvasItem> {
        match self.selection {
            Selection::Item { id, .. } => self.items.get(&id),
            Selection::Nothing => None,
        }
    }

    fn selected_mut(&mut self) -> Option<&mut CanvasItem> {
        match self.selection {
            Selection::Item { id, .. } => self.items.get_mut(&id),
            Selection::Nothing => None,
        }
    }

    pub fn selection_bounds(&self) -> Option<ScreenRect> {
        self.selected().map(|item| item.bounds(self.display_scale))
    }

    pub fn status_label(&self) -> String {
        match self.selection {
            Selection::Item { kind, .. } => format!("Selected: {}", kind.label()),
            Selection::Nothing => "No item selected".to_owned(),
        }
    }

    /// Drops every item and the selection, as when a new document is loaded.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selection = Selection::Nothing;
        self.drag_anchor = None;
    }

    fn insert(&mut self, payload: ItemPayload) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let item = CanvasItem { id, position: self.default_position, payload };
        let kind = item.kind();
        self.items.insert(id, item);
        self.selection = Selection::Item { id, kind };
        tracing::info!(id = id.raw(), kind = kind.label(), "item added");
        id
    }

    /// Places an image at the default position and scale and selects it.
    pub fn add_image(&mut self, original: RgbaImage) -> ItemId {
        let scale = self.default_image_scale;
        let display = resize(Some(&original), scale).unwrap_or_else(|| original.clone());
        self.insert(ItemPayload::Image(ImageItem {
            original: Arc::new(original),
            scale,
            display,
            revision: 0,
        }))
    }

    /// Places a text run at the default position, in black, and selects it.
    pub fn add_text(&mut self, content: impl Into<String>) -> ItemId {
        self.insert(ItemPayload::Text(TextItem {
            content: content.into(),
            font_size: self.font_size,
            color: TextColor::BLACK,
            extent: None,
        }))
    }

    /// Primary button went down at `point`.
    ///
    /// Selects the topmost item under the pointer, or clears the selection when
    /// the press lands on empty space.
    pub fn press(&mut self, point: ScreenPoint) -> Selection {
        let scale = self.display_scale;
        let hit = self.items.values().rev().find(|item| item.bounds(scale).contains(point));

        self.selection = match hit {
            Some(item) => Selection::Item { id: item.id, kind: item.kind() },
            None => Selection::Nothing,
        };
        self.drag_anchor = hit.map(|_| point);
        self.selection
    }

    /// Clears the selection, e.g. for a press outside the page.
    pub fn deselect(&mut self) {
        self.selection = Selection::Nothing;
        self.drag_anchor = None;
    }

    /// Pointer moved to `point` with the primary button held.
    pub fn drag_to(&mut self, point: ScreenPoint) {
        let Some(anchor) = self.drag_anchor else {
            return;
        };
        let (dx, dy) = (point.x - anchor.x, point.y - anchor.y);

        let Some(item) = self.selected_mut() else {
            return;
        };
        item.position.x += dx;
        item.position.y += dy;
        self.drag_anchor = Some(point);
    }

    pub fn release(&mut self) {
        if self.drag_anchor.take().is_some() {
            if let Some(item) = self.selected() {
                tracing::debug!(
                    id = item.id.raw(),
                    x = item.position.x,
                    y = item.position.y,
                    "item moved"
                );
            }
        }
    }

    pub fn selected_scale(&self) -> Option<f32> {
        match &self.selected()?.payload {
            ItemPayload::Image(image) => Some(image.scale),
            ItemPayload::Text(_) => None,
        }
    }

    /// Rescales the selected image from its original bitmap.
    ///
    /// Returns `false` when nothing changed: no image is selected or the
    /// factor is unusable. Factors outside the slider range are clamped.
    pub fn set_scale(&mut self, factor: f32) -> bool {
        if !factor.is_finite() {
            return false;
        }
        let factor = factor.clamp(*self.scale_range.start(), *self.scale_range.end());

        let Some(CanvasItem { payload: ItemPayload::Image(image), .. }) = self.selected_mut() else {
            return false;
        };
        let Some(display) = resize(Some(&*image.original), factor) else {
            return false;
        };

        image.scale = factor;
        image.display = display;
        image.revision += 1;
        true
    }

    pub fn selected_color(&self) -> Option<TextColor> {
        match &self.selected()?.payload {
            ItemPayload::Text(text) => Some(text.color),
            ItemPayload::Image(_) => None,
        }
    }

    /// Recolors the selected text. Returns `false` when no text is selected.
    pub fn set_color(&mut self, color: TextColor) -> bool {
        match self.selected_mut() {
            Some(CanvasItem { payload: ItemPayload::Text(text), .. }) => {
                text.color = color;
                true
            }
            _ => false,
        }
    }

    /// Records the laid-out size of a text item so hit testing matches what is drawn.
    pub fn set_text_extent(&mut self, id: ItemId, extent: TextExtent) {
        if let Some(CanvasItem { payload: ItemPayload::Text(text), .. }) = self.items.get_mut(&id) {
            text.extent = Some(extent);
        }
    }

    /// Removes the selected item. Returns its id, or `None` without a selection.
    pub fn delete_selected(&mut self) -> Option<ItemId> {
        let Selection::Item { id, .. } = self.selection else {
            return None;
        };
        self.selection = Selection::Nothing;
        self.drag_anchor = None;

        let removed = self.items.remove(&id)?;
        tracing::info!(id = id.raw(), kind = removed.kind().label(), "item deleted");
        Some(id)
    }

    /// Snapshot of every item in stacking order, ready for saving.
    pub fn elements(&self) -> Vec<PlacedElement> {
        self.items.values().map(CanvasItem::to_element).collect()
    }
}
