//! First-page rasterization.

use crate::bitmap::RgbaImage;
use crate::geometry::{DisplayScale, PageSize};
use crate::EngineResult;
use image::Rgba;

/// What a rasterizer gets to work with: the raw file and the parsed page size.
#[derive(Debug, Clone, Copy)]
pub struct PageSource<'a> {
    pub bytes: &'a [u8],
    pub page_size: PageSize,
}

pub trait PageRasterizer {
    /// Renders the first page at `scale` screen pixels per point.
    fn render_first_page(
        &self,
        source: PageSource<'_>,
        scale: DisplayScale,
    ) -> EngineResult<RgbaImage>;

    fn name(&self) -> &'static str;
}

/// Draws a blank white page with a light border at the page's size.
///
/// Used when no real renderer is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRasterizer;

impl PageRasterizer for PlaceholderRasterizer {
    fn render_first_page(
        &self,
        source: PageSource<'_>,
        scale: DisplayScale,
    ) -> EngineResult<RgbaImage> {
        let (width, height) = scale.pixel_size(source.page_size);
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use super::*;
    use crate::EngineError;
    use pdfium_render::prelude::*;

    /// Renders pages through the PDFium dynamic library.
    pub struct PdfiumRasterizer {
        pdfium: Pdfium,
    }

    impl PdfiumRasterizer {
        /// Binds PDFium.
        ///
        /// Search order:
        /// 1. Executable's directory (app bundles)
        /// 2. Current working directory
        /// 3. System library paths
        pub fn bind() -> EngineResult<Self> {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));

            if let Some(ref dir) = exe_dir {
                if let Ok(bindings) =
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                {
                    tracing::debug!(dir = %dir.display(), "bound pdfium next to executable");
                    return Ok(Self { pdfium: Pdfium::new(bindings) });
                }
            }

            let bindings =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
                    .map_err(|e| {
                        EngineError::Rasterizer(format!("failed to bind pdfium library: {e}"))
                    })?;

            Ok(Self { pdfium: Pdfium::new(bindings) })
        }
    }

    impl PageRasterizer for PdfiumRasterizer {
        fn render_first_page(
            &self,
            source: PageSource<'_>,
            scale: DisplayScale,
        ) -> EngineResult<RgbaImage> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(source.bytes, None)
                .map_err(|e| EngineError::Rasterizer(e.to_string()))?;
            let page = document
                .pages()
                .get(0)
                .map_err(|e| EngineError::Rasterizer(e.to_string()))?;

            let width = (page.width().value * scale.factor()).round().max(1.0) as i32;
            let height = (page.height().value * scale.factor()).round().max(1.0) as i32;

            let config = PdfRenderConfig::new().set_target_width(width).set_target_height(height);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| EngineError::Rasterizer(e.to_string()))?;

            let (out_width, out_height) = (bitmap.width() as u32, bitmap.height() as u32);
            RgbaImage::from_raw(out_width, out_height, bitmap.as_rgba_bytes().to_vec()).ok_or_else(
                || {
                    EngineError::Rasterizer(format!(
                        "pdfium returned a bitmap that is not {out_width}x{out_height} RGBA"
                    ))
                },
            )
        }

        fn name(&self) -> &'static str {
            "pdfium"
        }
    }
}
