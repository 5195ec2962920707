//! Whole-document transformation entry points.
//!
//! ## Why batches?
//!
//! Pages are processed in fixed-size batches so that rasterised image
//! crops for at most one batch are alive at a time. Batches are
//! independent of each other except for the image sequence counter,
//! which is passed into each batch call and threaded out of it; their
//! Markdown outputs and image lists are concatenated in page order. A
//! batch that fails to extract is skipped with one entry in the error
//! list, and processing continues with the next batch.

use crate::backend::pdfium::{bind_pdfium, document_metadata, open_document, PdfiumSource};
use crate::backend::PageSource;
use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::output::{DocumentMetadata, TransformOutput, TransformStats};
use crate::pipeline::{assemble, classify, extract};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Transform a PDF file into Markdown.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(TransformError)` only for fatal errors: missing or
/// unreadable file, not a PDF, corrupt document, wrong password.
/// Per-batch extraction failures do not fail the call; they appear in
/// `output.errors` (check `output.stats.failed_batches`).
pub fn transform(
    path: impl AsRef<Path>,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let path = path.as_ref();
    info!("Starting transformation: {}", path.display());
    validate_pdf_file(path)?;

    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, path, config.password.as_deref())?;
    let source = PdfiumSource::new(&document);
    transform_document(&source, config)
}

/// Transform PDF bytes in memory to Markdown.
///
/// pdfium needs a file-system path, so `bytes` are written to a managed
/// [`tempfile`] that is removed when this function returns.
pub fn transform_from_bytes(
    bytes: &[u8],
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| TransformError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| TransformError::Internal(format!("tempfile write: {e}")))?;
    transform(tmp.path(), config)
}

/// Transform a PDF and write the Markdown directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub fn transform_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TransformConfig,
) -> Result<TransformStats, TransformError> {
    let output = transform(path, config)?;
    let out = output_path.as_ref();

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| TransformError::OutputWriteFailed {
                path: out.to_path_buf(),
                source: e,
            })?;
        }
    }

    let tmp_path = out.with_extension("md.tmp");
    std::fs::write(&tmp_path, &output.markdown).map_err(|e| TransformError::OutputWriteFailed {
        path: out.to_path_buf(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, out).map_err(|e| TransformError::OutputWriteFailed {
        path: out.to_path_buf(),
        source: e,
    })?;

    Ok(output.stats)
}

/// Extract document metadata without transforming any content.
pub fn inspect(path: impl AsRef<Path>) -> Result<DocumentMetadata, TransformError> {
    let path = path.as_ref();
    validate_pdf_file(path)?;
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, path, None)?;
    Ok(document_metadata(&document))
}

/// Run the three pipeline stages over every batch of an opened document.
///
/// Generic over [`PageSource`] so the pipeline can be driven by an
/// in-memory source in tests.
pub fn transform_document<S: PageSource>(
    source: &S,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let start = Instant::now();
    let total_pages = source.page_count();
    info!("Document has {} pages", total_pages);

    let mut markdown = String::new();
    let mut images: Vec<String> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let mut stats = TransformStats {
        total_pages,
        ..Default::default()
    };
    let mut next_image_index: u64 = 0;

    let page_indices: Vec<usize> = (0..total_pages).collect();
    for batch_pages in page_indices.chunks(config.batch_size.max(1)) {
        let first = batch_pages[0] + 1;
        let last = batch_pages[batch_pages.len() - 1] + 1;
        debug!("Processing pages {first}..={last}");

        let geometry = match extract::extract_batch(source, batch_pages, config, next_image_index)
        {
            Ok(g) => g,
            Err(e) => {
                warn!("Pages {first}..={last} skipped: {e}");
                errors.push(format!("pages {first}-{last} skipped: {e}"));
                stats.failed_batches += 1;
                continue;
            }
        };
        next_image_index = geometry.next_image_index;
        errors.extend(geometry.errors);

        let thresholds = classify::compute_thresholds(&geometry.lines, &config.tuning);
        let typed = classify::classify_lines(geometry.lines, &thresholds, &config.tuning);
        let assembled = assemble::assemble_batch(
            &typed,
            &geometry.tables,
            &geometry.images,
            &thresholds,
            &config.tuning,
        );

        stats.lines += typed.len();
        stats.tables += geometry.tables.len();
        stats.images += assembled.images.len();
        stats.processed_batches += 1;
        markdown.push_str(&assembled.markdown);
        images.extend(assembled.images);
    }

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Transformation complete: {} batches ({} failed), {} lines, {} tables, {} images, {}ms",
        stats.processed_batches,
        stats.failed_batches,
        stats.lines,
        stats.tables,
        stats.images,
        stats.total_duration_ms
    );

    Ok(TransformOutput {
        markdown,
        images,
        errors,
        stats,
    })
}

/// Validate existence, readability, and PDF magic bytes before handing
/// the path to pdfium, so callers get a meaningful error rather than a
/// pdfium load failure.
fn validate_pdf_file(path: &Path) -> Result<(), TransformError> {
    if !path.exists() {
        return Err(TransformError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(TransformError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TransformError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(TransformError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_file_not_found() {
        let err = transform("/nonexistent/input.pdf", &TransformConfig::default()).unwrap_err();
        assert!(matches!(err, TransformError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_not_a_pdf() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04not a pdf").unwrap();
        let err = transform(tmp.path(), &TransformConfig::default()).unwrap_err();
        assert!(matches!(err, TransformError::NotAPdf { .. }));
    }
}
