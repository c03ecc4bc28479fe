//! Document backend for the PDF stamper.
//!
//! Opens a PDF, renders its first page for display, and writes placed image and
//! text elements back into that page.

pub mod bitmap;
pub mod element;
pub mod geometry;
pub mod raster;
mod writer;

pub use bitmap::{load_image, resize, scaled_dimensions, RgbaImage};
pub use element::{ImageElement, PlacedElement, TextColor, TextElement};
pub use geometry::{DisplayScale, PageBox, PageFrame, PagePoint, PageSize, Rotation, ScreenPoint};
pub use raster::{PageRasterizer, PageSource, PlaceholderRasterizer};

#[cfg(feature = "pdfium")]
pub use raster::pdfium_backend::PdfiumRasterizer;

use lopdf::{Document, ObjectId};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("no document loaded")]
    NoDocument,
    #[error("malformed page: {0}")]
    MalformedPage(&'static str),
    #[error("renderer error: {0}")]
    Rasterizer(String),
    #[error("invalid element: {0}")]
    InvalidElement(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A parsed document and the facts about its first page the writer needs.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    path: PathBuf,
    pdf: Document,
    first_page: ObjectId,
    frame: PageFrame,
    page_count: usize,
}

impl LoadedDocument {
    fn parse(path: &Path, bytes: &[u8]) -> EngineResult<Self> {
        let mut pdf = Document::load_mem(bytes)?;

        // Only documents that open without a user password can be stamped.
        if pdf.is_encrypted() {
            if let Err(err) = pdf.decrypt("") {
                tracing::warn!(path = %path.display(), error = %err, "cannot decrypt document");
                return Err(EngineError::EncryptedUnsupported);
            }
            tracing::info!(path = %path.display(), "opened encrypted document with empty password");
        }

        let pages = pdf.get_pages();
        let first_page = *pages.values().next().ok_or(EngineError::NoPages)?;
        let frame = writer::page_frame(&pdf, first_page);

        Ok(Self { path: path.to_path_buf(), pdf, first_page, frame, page_count: pages.len() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_box(&self) -> PageBox {
        self.frame.page_box
    }

    /// The page box together with the page's `/Rotate`.
    pub fn page_frame(&self) -> PageFrame {
        self.frame
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

/// Owns the open document and turns canvas elements into PDF content.
pub struct StampEngine {
    rasterizer: Box<dyn PageRasterizer>,
    display_scale: DisplayScale,
    document: Option<LoadedDocument>,
}

impl StampEngine {
    pub fn new(rasterizer: Box<dyn PageRasterizer>, display_scale: DisplayScale) -> Self {
        Self { rasterizer, display_scale, document: None }
    }

    pub fn display_scale(&self) -> DisplayScale {
        self.display_scale
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn rasterizer_name(&self) -> &'static str {
        self.rasterizer.name()
    }

    /// Opens `path` and renders its first page at the display scale.
    ///
    /// The previous document stays loaded if anything fails.
    pub fn load_document(&mut self, path: impl AsRef<Path>) -> EngineResult<RgbaImage> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let loaded = LoadedDocument::parse(path, &bytes)?;

        let source = PageSource { bytes: &bytes, page_size: loaded.frame.displayed_size() };
        let page = self.rasterizer.render_first_page(source, self.display_scale)?;

        tracing::info!(
            path = %path.display(),
            pages = loaded.page_count,
            width = page.width(),
            height = page.height(),
            renderer = self.rasterizer.name(),
            "loaded document"
        );
        self.document = Some(loaded);
        Ok(page)
    }

    /// Writes the loaded document with `elements` flattened onto its first page.
    ///
    /// Elements are applied to a copy, so repeated saves never stamp twice.
    /// Nothing is written to `path` if any element fails to embed.
    pub fn save(&self, path: impl AsRef<Path>, elements: &[PlacedElement]) -> EngineResult<()> {
        let path = path.as_ref();
        let loaded = self.document.as_ref().ok_or(EngineError::NoDocument)?;

        let mut pdf = loaded.pdf.clone();
        writer::stamp_page(
            &mut pdf,
            loaded.first_page,
            loaded.frame,
            self.display_scale,
            elements,
        )?;

        let mut output = Vec::new();
        pdf.save_to(&mut output)?;
        fs::write(path, output)?;

        tracing::info!(path = %path.display(), elements = elements.len(), "saved document");
        Ok(())
    }
}

/// Appends `.{extension}` when `path` has no extension of its own.
pub fn with_default_extension(path: impl Into<PathBuf>, extension: &str) -> PathBuf {
    let mut path = path.into();
    if path.extension().is_none() {
        path.set_extension(extension);
    }
    path
}
