//! PDF rasterisation: render one page of an in-memory PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. `tokio::task::spawn_blocking` moves the work onto the
//! blocking pool so the runtime's worker threads never stall on a render.
//!
//! Every pdfium handle (library binding, document, page, bitmap) is created
//! and dropped inside the blocking closure, on both the success and the
//! error path.

use crate::config::RenderConfig;
use crate::error::AtsError;
use crate::pipeline::encode::{encode_page, EncodedImagePart};
use crate::pipeline::input::DocumentBytes;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Rasterise the configured page (default: the first) and encode it.
///
/// Returns a sequence holding exactly one [`EncodedImagePart`].
///
/// # Errors
/// - [`AtsError::MissingDocument`] when `document` is `None` or empty; pdfium
///   is not touched.
/// - [`AtsError::DocumentProcessing`] when the bytes are not a PDF, the page
///   does not exist, or rendering/encoding fails.
pub async fn rasterize_first_page(
    document: Option<DocumentBytes>,
    config: &RenderConfig,
) -> Result<Vec<EncodedImagePart>, AtsError> {
    let document = check_document(document)?;
    let config = config.clone();

    tokio::task::spawn_blocking(move || rasterize_checked(&document, &config))
        .await
        .map_err(|e| AtsError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking variant of [`rasterize_first_page`] for synchronous callers.
pub fn rasterize_first_page_blocking(
    document: Option<&DocumentBytes>,
    config: &RenderConfig,
) -> Result<Vec<EncodedImagePart>, AtsError> {
    let document = check_document(document.cloned())?;
    rasterize_checked(&document, config)
}

/// Guard run before any rasterisation attempt.
fn check_document(document: Option<DocumentBytes>) -> Result<DocumentBytes, AtsError> {
    let document = match document {
        Some(doc) if !doc.is_empty() => doc,
        _ => return Err(AtsError::MissingDocument),
    };

    if !document.looks_like_pdf() {
        return Err(AtsError::processing(format!(
            "not a PDF file (first bytes: {:?})",
            document.magic()
        )));
    }

    Ok(document)
}

fn rasterize_checked(
    document: &DocumentBytes,
    config: &RenderConfig,
) -> Result<Vec<EncodedImagePart>, AtsError> {
    let image = render_page_blocking(document.as_bytes(), config)?;
    let part = encode_page(&image)
        .map_err(|e| AtsError::processing(format!("image encoding failed: {}", e)))?;
    Ok(vec![part])
}

/// Bind to a pdfium shared library.
///
/// Resolution order: `config.pdfium_library` (file, or directory holding the
/// platform library), then the working directory, then the system library
/// search path.
pub fn bind_pdfium(config: &RenderConfig) -> Result<Pdfium, AtsError> {
    let bindings = match config.pdfium_library {
        Some(ref path) => {
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(path)
            } else {
                path.clone()
            };
            Pdfium::bind_to_library(&lib).map_err(|e| {
                AtsError::processing(format!(
                    "failed to bind pdfium library at '{}': {}",
                    lib.display(),
                    e
                ))
            })?
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                AtsError::processing(format!(
                    "failed to bind pdfium library: {}\n\
                     Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.",
                    e
                ))
            })?,
    };

    Ok(Pdfium::new(bindings))
}

/// Render a single page of `bytes` to an RGBA image.
pub fn render_page_blocking(bytes: &[u8], config: &RenderConfig) -> Result<DynamicImage, AtsError> {
    let pdfium = bind_pdfium(config)?;
    let password = config.password.as_deref();

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    AtsError::processing("wrong password for encrypted PDF")
                } else {
                    AtsError::processing("PDF is encrypted and requires a password")
                }
            } else {
                AtsError::processing(format!("corrupt or unsupported PDF: {}", err_str))
            }
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    if total_pages == 0 {
        return Err(AtsError::processing("document has no pages"));
    }

    let idx = config.page_index;
    if idx >= total_pages {
        return Err(AtsError::processing(format!(
            "page {} is out of range (document has {} pages)",
            idx + 1,
            total_pages
        )));
    }

    let page_index = idx
        .try_into()
        .map_err(|_| AtsError::processing(format!("page index {} is too large", idx)))?;
    let page = pages
        .get(page_index)
        .map_err(|e| AtsError::processing(format!("failed to load page {}: {:?}", idx + 1, e)))?;

    let (width, height) = target_size(
        page.width().value,
        page.height().value,
        config.scale,
        config.max_rendered_pixels,
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height);

    let bitmap = page.render_with_config(&render_config).map_err(|e| {
        AtsError::processing(format!("rasterisation failed for page {}: {:?}", idx + 1, e))
    })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        idx + 1,
        image.width(),
        image.height()
    );

    Ok(image)
}

/// Pixel size for a page of `width_pt` × `height_pt` points.
///
/// Scales by `scale`, then shrinks proportionally so the longest edge does
/// not exceed `max_pixels`. Never returns a zero dimension.
fn target_size(width_pt: f32, height_pt: f32, scale: f32, max_pixels: u32) -> (i32, i32) {
    let mut w = (width_pt * scale).max(1.0);
    let mut h = (height_pt * scale).max(1.0);

    let longest = w.max(h);
    let cap = max_pixels as f32;
    if longest > cap {
        let shrink = cap / longest;
        w *= shrink;
        h *= shrink;
    }

    ((w.round() as i32).max(1), (h.round() as i32).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_natural_size() {
        assert_eq!(target_size(612.0, 792.0, 1.0, 2000), (612, 792));
    }

    #[test]
    fn scale_doubles_pixels() {
        assert_eq!(target_size(612.0, 792.0, 2.0, 2000), (1224, 1584));
    }

    #[test]
    fn longest_edge_is_capped() {
        let (w, h) = target_size(2384.0, 3370.0, 1.0, 2000);
        assert_eq!(h, 2000);
        assert!(w < 2000 && w > 1400, "got {w}");
    }

    #[test]
    fn degenerate_page_never_zero() {
        assert_eq!(target_size(0.0, 0.0, 1.0, 2000), (1, 1));
    }

    #[tokio::test]
    async fn none_is_missing_document() {
        let err = rasterize_first_page(None, &RenderConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AtsError::MissingDocument));
    }

    #[tokio::test]
    async fn empty_is_missing_document() {
        let err = rasterize_first_page(Some(DocumentBytes::from_vec(vec![])), &RenderConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AtsError::MissingDocument));
    }

    #[test]
    fn non_pdf_fails_before_pdfium() {
        let doc = DocumentBytes::from(&b"PK\x03\x04 this is a zip"[..]);
        let err = rasterize_first_page_blocking(Some(&doc), &RenderConfig::default()).unwrap_err();
        match err {
            AtsError::DocumentProcessing { detail } => assert!(detail.contains("not a PDF")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
