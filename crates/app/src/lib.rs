//! PDF stamper desktop app: place images and text on a PDF's first page.

pub mod canvas;
pub mod config;
pub mod dialog;
pub mod ui;

pub use canvas::{Canvas, ItemId, ItemKind, Selection};
pub use config::StamperConfig;
pub use ui::StamperApp;

use stamp_engine::{PageRasterizer, PdfiumRasterizer, PlaceholderRasterizer};

/// Picks the page renderer: PDFium when the library can be bound, otherwise a
/// blank placeholder page so stamping still works.
pub fn default_rasterizer() -> Box<dyn PageRasterizer> {
    match PdfiumRasterizer::bind() {
        Ok(pdfium) => Box::new(pdfium),
        Err(e) => {
            tracing::warn!(error = %e, "PDFium unavailable, pages will render blank");
            Box::new(PlaceholderRasterizer)
        }
    }
}
