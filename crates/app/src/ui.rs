//! egui front end: side panel controls, the page canvas and dialogs.

use crate::canvas::{Canvas, ImageItem, ItemId, ItemPayload, Selection, TextExtent};
use crate::config::StamperConfig;
use crate::dialog::MessageDialog;
use eframe::egui;
use stamp_engine::{load_image, with_default_extension, RgbaImage, ScreenPoint, StampEngine, TextColor};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Initial contents of the text entry.
pub const TEXT_PLACEHOLDER: &str = "Type text here...";

const CANVAS_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(0x52, 0x52, 0x52);
const SIDE_PANEL_WIDTH: f32 = 300.0;

/// Uploaded bitmap of an image item, tagged with the revision it was made from.
struct ItemTexture {
    revision: u64,
    handle: egui::TextureHandle,
}

pub struct StamperApp {
    engine: StampEngine,
    canvas: Canvas,
    text_entry: String,

    page_texture: Option<egui::TextureHandle>,
    item_textures: HashMap<ItemId, ItemTexture>,

    dialog: Option<MessageDialog>,
}

impl StamperApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        engine: StampEngine,
        config: &StamperConfig,
        initial_file: Option<PathBuf>,
    ) -> Self {
        let mut app = Self::with_engine(engine, config);
        if let Some(path) = initial_file {
            app.load_pdf(&cc.egui_ctx, &path);
        }
        app
    }

    pub fn with_engine(engine: StampEngine, config: &StamperConfig) -> Self {
        Self {
            engine,
            canvas: Canvas::new(config),
            text_entry: TEXT_PLACEHOLDER.to_owned(),
            page_texture: None,
            item_textures: HashMap::new(),
            dialog: None,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn dialog(&self) -> Option<&MessageDialog> {
        self.dialog.as_ref()
    }

    fn show_error(&mut self, message: impl Into<String>) {
        self.dialog = Some(MessageDialog::error(message));
    }

    /// Opens `path` as the working document, replacing the page and all items.
    pub fn load_pdf(&mut self, ctx: &egui::Context, path: &Path) {
        match self.engine.load_document(path) {
            Ok(page) => {
                self.canvas.clear();
                self.item_textures.clear();
                self.page_texture =
                    Some(ctx.load_texture("page", color_image(&page), egui::TextureOptions::LINEAR));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "load failed");
                self.show_error(format!("Failed to load PDF: {e}"));
            }
        }
    }

    /// Decodes `path` and places it on the canvas.
    pub fn add_image_file(&mut self, path: &Path) {
        if !self.engine.has_document() {
            return;
        }

        match load_image(path) {
            Ok(image) => {
                self.canvas.add_image(image);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "image load failed");
                self.show_error(format!("Failed to load image: {e}"));
            }
        }
    }

    /// Places the current text entry on the canvas.
    pub fn add_text(&mut self) {
        if !self.engine.has_document() {
            return;
        }
        self.canvas.add_text(self.text_entry.clone());
    }

    /// Writes the stamped document to `path`, adding `.pdf` if it has no extension.
    pub fn save_to(&mut self, path: &Path) {
        if !self.engine.has_document() {
            return;
        }

        let path = with_default_extension(path, "pdf");
        match self.engine.save(&path, &self.canvas.elements()) {
            Ok(()) => self.dialog = Some(MessageDialog::info("PDF Saved!")),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "save failed");
                self.show_error(format!("Failed to save PDF: {e}"));
            }
        }
    }

    fn pick_pdf(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new().pick_file() {
            self.load_pdf(ctx, &path);
        }
    }

    fn pick_image(&mut self) {
        if !self.engine.has_document() {
            return;
        }
        if let Some(path) = rfd::FileDialog::new().pick_file() {
            self.add_image_file(&path);
        }
    }

    fn pick_save_path(&mut self) {
        if !self.engine.has_document() {
            return;
        }
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .set_file_name("stamped.pdf")
            .save_file()
        {
            self.save_to(&path);
        }
    }
}

fn color_image(bitmap: &RgbaImage) -> egui::ColorImage {
    egui::ColorImage::from_rgba_unmultiplied(
        [bitmap.width() as usize, bitmap.height() as usize],
        bitmap.as_raw(),
    )
}

fn color32(color: TextColor) -> egui::Color32 {
    let [r, g, b] = color.to_rgb8();
    egui::Color32::from_rgb(r, g, b)
}

/// Distance from the top of a laid-out line to its baseline.
fn baseline_offset(galley: &egui::Galley) -> f32 {
    galley
        .rows
        .first()
        .and_then(|row| row.glyphs.first())
        .map_or(galley.size().y * 0.8, |glyph| glyph.font_ascent)
}

/// Returns the texture for `image`, re-uploading when the item was rescaled.
fn item_texture(
    textures: &mut HashMap<ItemId, ItemTexture>,
    ctx: &egui::Context,
    id: ItemId,
    image: &ImageItem,
) -> egui::TextureId {
    match textures.get(&id) {
        Some(cached) if cached.revision == image.revision => cached.handle.id(),
        _ => {
            let handle = ctx.load_texture(
                format!("item_{}", id.raw()),
                color_image(&image.display),
                egui::TextureOptions::LINEAR,
            );
            let texture_id = handle.id();
            textures.insert(id, ItemTexture { revision: image.revision, handle });
            texture_id
        }
    }
}

impl eframe::App for StamperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard_shortcuts(ctx);
        self.draw_side_panel(ctx);
        self.draw_canvas(ctx);
        self.draw_dialog(ctx);
    }
}

impl StamperApp {
    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        // Escape: close dialogs
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) && self.dialog.is_some() {
            self.dialog = None;
        }
    }

    fn draw_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls")
            .exact_width(SIDE_PANEL_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("1. Document");
                ui.horizontal(|ui| {
                    if ui.button("Load PDF").clicked() {
                        self.pick_pdf(ctx);
                    }
                    if ui.button("Save PDF").clicked() {
                        self.pick_save_path();
                    }
                });
                ui.separator();

                ui.heading("2. Add Items");
                if ui.button("Add Image").clicked() {
                    self.pick_image();
                }
                ui.add_space(4.0);
                ui.text_edit_singleline(&mut self.text_entry);
                if ui.button("Add Text Box").clicked() {
                    self.add_text();
                }
                ui.separator();

                ui.heading("3. Edit Selected");
                ui.label(self.canvas.status_label());

                if let Some(mut scale) = self.canvas.selected_scale() {
                    let slider = egui::Slider::new(&mut scale, self.canvas.scale_range()).text("Scale");
                    if ui.add(slider).changed() {
                        self.canvas.set_scale(scale);
                    }
                }

                if let Some(color) = self.canvas.selected_color() {
                    ui.horizontal(|ui| {
                        ui.label("Text color");
                        let mut rgb = color.to_array();
                        if ui.color_edit_button_rgb(&mut rgb).changed() {
                            self.canvas.set_color(TextColor::new(rgb[0], rgb[1], rgb[2]));
                        }
                    });
                }

                ui.add_space(8.0);
                let has_selection = self.canvas.selection() != Selection::Nothing;
                if ui.add_enabled(has_selection, egui::Button::new("Delete Selected")).clicked() {
                    self.canvas.delete_selected();
                }
            });
    }

    /// Routes a primary press at `pos` to the canvas laid out at `page`.
    fn press_canvas(&mut self, pos: egui::Pos2, page: egui::Rect) {
        if page.contains(pos) {
            self.canvas.press(ScreenPoint::new(pos.x - page.min.x, pos.y - page.min.y));
        } else {
            self.canvas.deselect();
        }
    }

    fn draw_canvas(&mut self, ctx: &egui::Context) {
        let frame = egui::Frame::central_panel(&ctx.style()).fill(CANVAS_BACKGROUND);
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            let Some(page) = self.page_texture.clone() else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Load a PDF to get started");
                });
                return;
            };

            // Presses on the surround outside the page deselect.
            let press = ui
                .input(|i| i.pointer.interact_pos().filter(|_| i.pointer.primary_pressed()))
                .filter(|_| ui.rect_contains_pointer(ui.max_rect()));

            egui::ScrollArea::both()
                .auto_shrink([false, false])
                .drag_to_scroll(false)
                .show(ui, |ui| {
                    let (rect, response) =
                        ui.allocate_exact_size(page.size_vec2(), egui::Sense::click_and_drag());
                    let to_screen =
                        |pos: egui::Pos2| ScreenPoint::new(pos.x - rect.min.x, pos.y - rect.min.y);
                    let to_pos = |point: ScreenPoint| rect.min + egui::vec2(point.x, point.y);

                    if let Some(pos) = press {
                        self.press_canvas(pos, rect);
                    }
                    if response.dragged_by(egui::PointerButton::Primary) {
                        if let Some(pos) = response.interact_pointer_pos() {
                            self.canvas.drag_to(to_screen(pos));
                        }
                    }
                    if ui.input(|i| i.pointer.primary_released()) {
                        self.canvas.release();
                    }

                    let painter = ui.painter_at(rect);
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    painter.image(page.id(), rect, uv, egui::Color32::WHITE);

                    let text_scale = self.canvas.display_scale().factor();
                    let mut extents = Vec::new();
                    for item in self.canvas.items() {
                        match &item.payload {
                            ItemPayload::Image(image) => {
                                let texture = item_texture(&mut self.item_textures, ctx, item.id, image);
                                let size = egui::vec2(image.display.width() as f32, image.display.height() as f32);
                                let target = egui::Rect::from_min_size(to_pos(item.position), size);
                                painter.image(texture, target, uv, egui::Color32::WHITE);
                            }
                            ItemPayload::Text(text) => {
                                let galley = painter.layout_no_wrap(
                                    text.content.clone(),
                                    egui::FontId::proportional(text.font_size * text_scale),
                                    color32(text.color),
                                );
                                let size = galley.size();
                                let ascent = baseline_offset(&galley);
                                let top_left = to_pos(item.position) - egui::vec2(0.0, ascent);
                                painter.galley(top_left, galley, color32(text.color));
                                extents.push((
                                    item.id,
                                    TextExtent { width: size.x, height: size.y, ascent },
                                ));
                            }
                        }
                    }
                    for (id, extent) in extents {
                        self.canvas.set_text_extent(id, extent);
                    }
                    let canvas = &self.canvas;
                    self.item_textures.retain(|id, _| canvas.item(*id).is_some());

                    if let Some(bounds) = self.canvas.selection_bounds() {
                        let (min, max) = (to_pos(bounds.min), to_pos(bounds.max));
                        let outline = [min, egui::pos2(max.x, min.y), max, egui::pos2(min.x, max.y), min];
                        painter.extend(egui::Shape::dashed_line(
                            &outline,
                            egui::Stroke::new(2.0, egui::Color32::RED),
                            4.0,
                            4.0,
                        ));
                    }
                });
        });
    }

    fn draw_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &self.dialog else {
            return;
        };

        if dialog.show(ctx) {
            self.dialog = None;
        }
    }
}
