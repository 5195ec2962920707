//! pdfium-render implementation of [`PageSource`].
//!
//! pdfium exposes text as styled segments, graphics as page objects, and
//! rasterisation as whole-page bitmaps. This module adapts those
//! primitives to the backend contract:
//!
//! * text lines — segments grouped by vertical overlap
//!   ([`group_segments_into_lines`]);
//! * tables — thin path objects treated as ruling lines, assembled into
//!   grids ([`detect_grids`]), cells filled from character bounds;
//! * image regions — bounding boxes of image page objects;
//! * cropping — whole-page render at the requested DPI followed by a
//!   pixel crop, since pdfium has no region-render call.
//!
//! All pdfium coordinates are bottom-up; everything is flipped to the
//! crate's top-down convention before leaving this module.

use crate::backend::{detect_grids, group_segments_into_lines, PageSource, TableGrid};
use crate::error::TransformError;
use crate::geometry::{RawTable, Rect, TextLine};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Horizontal gap (points) above which adjacent cell characters get a
/// space inserted between them.
const CELL_CHAR_GAP: f64 = 1.0;

/// A [`PageSource`] backed by an opened pdfium document.
///
/// The borrow of the document (`'s`) is kept apart from the document's
/// own binding lifetime (`'a`) so a source can be created for a
/// locally-owned document.
pub struct PdfiumSource<'s, 'a> {
    document: &'s PdfDocument<'a>,
}

impl<'s, 'a> PdfiumSource<'s, 'a> {
    pub fn new(document: &'s PdfDocument<'a>) -> Self {
        Self { document }
    }

    fn page(&self, page_index: usize) -> Result<PdfPage<'a>, TransformError> {
        let total = self.page_count();
        self.document
            .pages()
            .get(page_index as u16)
            .map_err(|_| TransformError::PageOutOfRange {
                page: page_index + 1,
                total,
            })
    }

    /// Character boxes of a page in top-down coordinates.
    fn char_boxes(
        &self,
        page: &PdfPage<'_>,
        page_height: f64,
        page_index: usize,
    ) -> Result<Vec<CharBox>, TransformError> {
        let text = page
            .text()
            .map_err(|e| TransformError::TableDetectionFailed {
                page: page_index + 1,
                detail: format!("{e:?}"),
            })?;

        let mut boxes = Vec::new();
        for pdf_char in text.chars().iter() {
            let Some(ch) = pdf_char.unicode_char() else {
                continue;
            };
            if ch.is_control() {
                continue;
            }
            let Ok(bounds) = pdf_char.loose_bounds() else {
                continue;
            };
            let left = bounds.left().value as f64;
            let width = bounds.width().value as f64;
            let bottom_up = bounds.bottom().value as f64;
            let height = bounds.height().value as f64;
            boxes.push(CharBox {
                ch,
                rect: Rect::new(
                    page_height - (bottom_up + height),
                    left,
                    page_height - bottom_up,
                    left + width,
                ),
            });
        }
        Ok(boxes)
    }
}

impl PageSource for PdfiumSource<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn text_lines(&self, page_index: usize) -> Result<Vec<TextLine>, TransformError> {
        let page = self.page(page_index)?;
        let page_height = page.height().value as f64;
        let text = page
            .text()
            .map_err(|e| TransformError::TextExtractionFailed {
                page: page_index + 1,
                detail: format!("{e:?}"),
            })?;

        let mut segments = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            segments.push(TextLine {
                text: content,
                top: page_height - bounds.top().value as f64,
                bottom: page_height - bounds.bottom().value as f64,
                x0: bounds.left().value as f64,
                x1: bounds.right().value as f64,
            });
        }

        let lines = group_segments_into_lines(segments);
        debug!(
            "page {}: {} text lines from segments",
            page_index + 1,
            lines.len()
        );
        Ok(lines)
    }

    fn tables(&self, page_index: usize) -> Result<Vec<RawTable>, TransformError> {
        let page = self.page(page_index)?;
        let page_height = page.height().value as f64;

        let mut path_boxes = Vec::new();
        for object in page.objects().iter() {
            if object.object_type() != PdfPageObjectType::Path {
                continue;
            }
            if let Ok(bounds) = object.bounds() {
                path_boxes.push(flip_bounds(
                    bounds.left().value,
                    bounds.top().value,
                    bounds.right().value,
                    bounds.bottom().value,
                    page_height,
                ));
            }
        }

        let grids = detect_grids(&path_boxes);
        if grids.is_empty() {
            return Ok(Vec::new());
        }

        let chars = self.char_boxes(&page, page_height, page_index)?;
        debug!("page {}: {} ruled grids", page_index + 1, grids.len());
        Ok(grids.iter().map(|g| fill_grid(g, &chars)).collect())
    }

    fn image_regions(&self, page_index: usize) -> Result<Vec<Rect>, TransformError> {
        let page = self.page(page_index)?;
        let page_height = page.height().value as f64;

        let mut regions = Vec::new();
        for object in page.objects().iter() {
            if object.object_type() != PdfPageObjectType::Image {
                continue;
            }
            if let Ok(bounds) = object.bounds() {
                let rect = flip_bounds(
                    bounds.left().value,
                    bounds.top().value,
                    bounds.right().value,
                    bounds.bottom().value,
                    page_height,
                );
                if rect.is_valid() {
                    regions.push(rect);
                }
            }
        }

        regions.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(std::cmp::Ordering::Equal));
        Ok(regions)
    }

    fn rasterize(
        &self,
        page_index: usize,
        clip: Option<&Rect>,
        dpi: u32,
    ) -> Result<DynamicImage, TransformError> {
        let page = self.page(page_index)?;
        let page_width = page.width().value as f64;
        let page_height = page.height().value as f64;
        let scale = dpi as f64 / 72.0;

        // Validate the crop box before paying for a render: a box outside
        // the page is the error the extractor's fallback path exists for.
        if let Some(clip) = clip {
            if !clip.is_valid()
                || clip.left < 0.0
                || clip.top < 0.0
                || clip.right > page_width
                || clip.bottom > page_height
            {
                return Err(TransformError::RasterisationFailed {
                    page: page_index + 1,
                    detail: format!(
                        "crop box ({:.1}, {:.1}, {:.1}, {:.1}) outside page {:.1}×{:.1}",
                        clip.left, clip.top, clip.right, clip.bottom, page_width, page_height
                    ),
                });
            }
        }

        let config = PdfRenderConfig::new()
            .set_target_width(((page_width * scale) as i32).max(1))
            .set_target_height(((page_height * scale) as i32).max(1));

        let bitmap =
            page.render_with_config(&config)
                .map_err(|e| TransformError::RasterisationFailed {
                    page: page_index + 1,
                    detail: format!("{e:?}"),
                })?;
        let image = bitmap.as_image();

        let Some(clip) = clip else {
            return Ok(image);
        };

        // Map points to pixels. The render target may round the scale, so
        // recompute it from the actual bitmap size.
        let px_per_pt = image.width() as f64 / page_width;
        let x = (clip.left * px_per_pt).floor().max(0.0) as u32;
        let y = (clip.top * px_per_pt).floor().max(0.0) as u32;
        let w = ((clip.width() * px_per_pt).ceil() as u32)
            .min(image.width().saturating_sub(x))
            .max(1);
        let h = ((clip.height() * px_per_pt).ceil() as u32)
            .min(image.height().saturating_sub(y))
            .max(1);

        Ok(image.crop_imm(x, y, w, h))
    }
}

/// Convert pdfium bottom-up bounds to a top-down [`Rect`].
fn flip_bounds(left: f32, top: f32, right: f32, bottom: f32, page_height: f64) -> Rect {
    Rect::new(
        page_height - top as f64,
        left as f64,
        page_height - bottom as f64,
        right as f64,
    )
}

/// A single character with its top-down bounding box.
struct CharBox {
    ch: char,
    rect: Rect,
}

/// Fill a detected grid's cells with the characters whose centres fall
/// inside them.
///
/// Characters in a cell are read in visual order: sorted by row, then by
/// `x`; a jump to a lower row inserts a newline (which the assembler later
/// renders as `<br>`), and a visible horizontal gap inserts a space.
fn fill_grid(grid: &TableGrid, chars: &[CharBox]) -> RawTable {
    let rows = grid.row_count();
    let cols = grid.col_count();
    let mut cell_chars: Vec<Vec<Vec<&CharBox>>> = vec![vec![Vec::new(); cols]; rows];

    for cb in chars {
        'placed: for i in 0..rows {
            for j in 0..cols {
                if grid.cell(i, j).contains_center_of(&cb.rect) {
                    cell_chars[i][j].push(cb);
                    break 'placed;
                }
            }
        }
    }

    let rows_text = cell_chars
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect();

    RawTable {
        bbox: grid.bbox,
        rows: rows_text,
    }
}

fn cell_text(mut chars: Vec<&CharBox>) -> String {
    chars.sort_by(|a, b| {
        a.rect
            .top
            .partial_cmp(&b.rect.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.rect
                    .left
                    .partial_cmp(&b.rect.left)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut text = String::new();
    let mut prev: Option<&Rect> = None;
    for cb in &chars {
        if let Some(p) = prev {
            if cb.rect.top >= p.bottom {
                // New visual row within the cell.
                while text.ends_with(' ') {
                    text.pop();
                }
                text.push('\n');
            } else if cb.rect.left - p.right > CELL_CHAR_GAP
                && !text.ends_with(' ')
                && !text.ends_with('\n')
            {
                text.push(' ');
            }
        }
        if !(cb.ch == ' ' && (text.ends_with(' ') || text.ends_with('\n') || text.is_empty())) {
            text.push(cb.ch);
        }
        prev = Some(&cb.rect);
    }
    text.trim().to_string()
}

// ── Document-level helpers ───────────────────────────────────────────────

/// Bind to a pdfium library: `PDFIUM_LIB_PATH` first when set, then one
/// shipped next to the executable, then the system-wide one.
pub fn bind_pdfium() -> Result<Pdfium, TransformError> {
    if let Ok(lib_path) = std::env::var("PDFIUM_LIB_PATH") {
        if !lib_path.is_empty() {
            return Pdfium::bind_to_library(&lib_path)
                .map(Pdfium::new)
                .map_err(|e| {
                    TransformError::PdfiumBindingFailed(format!(
                        "PDFIUM_LIB_PATH={lib_path}: {e:?}"
                    ))
                });
        }
    }
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| TransformError::PdfiumBindingFailed(format!("{e:?}")))
}

/// Open a PDF with pdfium, mapping load failures to the crate's fatal
/// error taxonomy (password detection mirrors pdfium's error text).
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, TransformError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                TransformError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                TransformError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            TransformError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Extract document metadata without touching page content.
pub fn document_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}
