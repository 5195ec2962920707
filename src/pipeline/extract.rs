//! Geometry Extractor: pull lines, tables, and images out of the backend
//! for one batch of pages and normalise their geometry.
//!
//! Image regions are rasterised and encoded *before* any line processing,
//! in page order, so their sequence indices are monotone across the
//! batch. A crop that fails (bad bounding box reported by the document)
//! degrades to rasterising the whole page; the failure is recorded as an
//! error string and never aborts the batch. Backend failures for text or
//! table extraction, by contrast, are returned as `Err` — the caller
//! decides whether to skip the batch.

use crate::backend::PageSource;
use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::geometry::{Line, PageImage, Table};
use crate::pipeline::encode;
use tracing::{debug, warn};

/// Everything the classifier and assembler need for one batch, plus the
/// recoverable errors hit along the way and the image counter to thread
/// into the next batch.
#[derive(Debug, Default)]
pub struct BatchGeometry {
    /// Lines in page order, top to bottom within each page.
    pub lines: Vec<Line>,
    /// Tables in page order.
    pub tables: Vec<Table>,
    /// Encoded images in page order, indices strictly increasing.
    pub images: Vec<PageImage>,
    /// Human-readable recoverable errors (crop fallbacks, dropped images).
    pub errors: Vec<String>,
    /// First unused image sequence index after this batch.
    pub next_image_index: u64,
}

/// Extract one batch of pages.
///
/// `page_indices` are 0-based and ascending; `start_image_index` is the
/// global image counter carried over from the previous batch.
pub fn extract_batch<S: PageSource>(
    source: &S,
    page_indices: &[usize],
    config: &TransformConfig,
    start_image_index: u64,
) -> Result<BatchGeometry, TransformError> {
    let mut batch = BatchGeometry {
        next_image_index: start_image_index,
        ..Default::default()
    };

    if config.include_images {
        extract_images(source, page_indices, config, &mut batch)?;
    }

    for &page_index in page_indices {
        let page_number = page_index + 1;

        let raw_lines = source.text_lines(page_index)?;
        for i in 0..raw_lines.len() {
            let next = raw_lines.get(i + 1);
            batch
                .lines
                .push(Line::from_raw(raw_lines[i].clone(), page_number, next));
        }

        for raw in source.tables(page_index)? {
            batch.tables.push(Table {
                bbox: raw.bbox,
                page_number,
                rows: raw.rows,
            });
        }
    }

    debug!(
        "batch extracted: {} lines, {} tables, {} images",
        batch.lines.len(),
        batch.tables.len(),
        batch.images.len()
    );
    Ok(batch)
}

/// Rasterise and encode every image region in the batch, assigning
/// sequence indices in page order.
fn extract_images<S: PageSource>(
    source: &S,
    page_indices: &[usize],
    config: &TransformConfig,
    batch: &mut BatchGeometry,
) -> Result<(), TransformError> {
    let dpi = config.image_resolution;

    for &page_index in page_indices {
        let page_number = page_index + 1;

        for region in source.image_regions(page_index)? {
            let index = batch.next_image_index;
            batch.next_image_index += 1;

            let raster = match source.rasterize(page_index, Some(&region), dpi) {
                Ok(img) => img,
                Err(e) => {
                    warn!("image {index}: crop failed, falling back to whole page: {e}");
                    batch.errors.push(format!(
                        "image {index} crop failed: {e}; rasterised the whole page instead"
                    ));
                    match source.rasterize(page_index, None, dpi) {
                        Ok(img) => img,
                        Err(e2) => {
                            batch.errors.push(format!(
                                "image {index} dropped: whole-page raster failed: {e2}"
                            ));
                            continue;
                        }
                    }
                }
            };

            let data_uri = match encode::encode_region(&raster) {
                Ok(uri) => uri,
                Err(e) => {
                    batch
                        .errors
                        .push(format!("image {index} dropped: PNG encoding failed: {e}"));
                    continue;
                }
            };

            batch.images.push(PageImage {
                bbox: region,
                page_number,
                index,
                data_uri,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RawTable, Rect, TextLine};
    use image::{DynamicImage, Rgba, RgbaImage};

    /// Minimal one-page source: two lines, one image region whose crop
    /// always fails.
    struct FailingCropSource;

    impl PageSource for FailingCropSource {
        fn page_count(&self) -> usize {
            1
        }

        fn text_lines(&self, _page: usize) -> Result<Vec<TextLine>, TransformError> {
            Ok(vec![
                TextLine {
                    text: "alpha".into(),
                    top: 10.0,
                    bottom: 22.0,
                    x0: 10.0,
                    x1: 80.0,
                },
                TextLine {
                    text: "beta".into(),
                    top: 30.0,
                    bottom: 42.0,
                    x0: 10.0,
                    x1: 60.0,
                },
            ])
        }

        fn tables(&self, _page: usize) -> Result<Vec<RawTable>, TransformError> {
            Ok(Vec::new())
        }

        fn image_regions(&self, _page: usize) -> Result<Vec<Rect>, TransformError> {
            Ok(vec![Rect::new(50.0, 10.0, 150.0, 200.0)])
        }

        fn rasterize(
            &self,
            page: usize,
            clip: Option<&Rect>,
            _dpi: u32,
        ) -> Result<DynamicImage, TransformError> {
            match clip {
                Some(_) => Err(TransformError::RasterisationFailed {
                    page: page + 1,
                    detail: "crop box outside page".into(),
                }),
                None => Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    4,
                    4,
                    Rgba([0, 0, 0, 255]),
                ))),
            }
        }
    }

    /// Like [`FailingCropSource`], but whole-page rasters fail as well.
    struct DeadRasterSource;

    impl PageSource for DeadRasterSource {
        fn page_count(&self) -> usize {
            1
        }

        fn text_lines(&self, page: usize) -> Result<Vec<TextLine>, TransformError> {
            FailingCropSource.text_lines(page)
        }

        fn tables(&self, _page: usize) -> Result<Vec<RawTable>, TransformError> {
            Ok(Vec::new())
        }

        fn image_regions(&self, _page: usize) -> Result<Vec<Rect>, TransformError> {
            Ok(vec![Rect::new(50.0, 10.0, 150.0, 200.0)])
        }

        fn rasterize(
            &self,
            page: usize,
            _clip: Option<&Rect>,
            _dpi: u32,
        ) -> Result<DynamicImage, TransformError> {
            Err(TransformError::RasterisationFailed {
                page: page + 1,
                detail: "bitmap allocation failed".into(),
            })
        }
    }

    fn config_with_images() -> TransformConfig {
        TransformConfig::builder()
            .include_images(true)
            .build()
            .unwrap()
    }

    #[test]
    fn gap_computed_within_page_only() {
        let batch = extract_batch(&FailingCropSource, &[0], &TransformConfig::default(), 0).unwrap();
        assert_eq!(batch.lines.len(), 2);
        assert_eq!(batch.lines[0].gap_to_next, Some(8.0));
        assert_eq!(batch.lines[1].gap_to_next, None);
    }

    #[test]
    fn crop_failure_degrades_to_whole_page() {
        let batch = extract_batch(&FailingCropSource, &[0], &config_with_images(), 7).unwrap();

        // The image survives via the fallback and keeps its index.
        assert_eq!(batch.images.len(), 1);
        assert_eq!(batch.images[0].index, 7);
        assert!(batch.images[0].data_uri.starts_with("data:image/png;base64,"));

        // One error string describing the fallback.
        assert_eq!(batch.errors.len(), 1);
        assert!(batch.errors[0].contains("image 7 crop failed"));

        // The counter advanced exactly once.
        assert_eq!(batch.next_image_index, 8);
    }

    #[test]
    fn whole_page_raster_failure_drops_image_but_keeps_index() {
        let batch = extract_batch(&DeadRasterSource, &[0], &config_with_images(), 3).unwrap();

        // Nothing encoded, but both failures are recorded.
        assert!(batch.images.is_empty());
        assert_eq!(batch.errors.len(), 2);
        assert!(batch.errors[0].contains("image 3 crop failed"));
        assert!(batch.errors[1].contains("image 3 dropped: whole-page raster failed"));

        // The index stays consumed and text extraction is unaffected.
        assert_eq!(batch.next_image_index, 4);
        assert_eq!(batch.lines.len(), 2);
    }

    #[test]
    fn images_skipped_entirely_when_flag_off() {
        let batch = extract_batch(&FailingCropSource, &[0], &TransformConfig::default(), 0).unwrap();
        assert!(batch.images.is_empty());
        assert!(batch.errors.is_empty());
        assert_eq!(batch.next_image_index, 0);
    }
}
