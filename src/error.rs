//! Error types for the pagemd library.
//!
//! Two failure modes exist and they are deliberately kept apart:
//!
//! * [`TransformError`] — **Fatal**: the transformation cannot proceed at
//!   all (bad input file, corrupt/encrypted document, pdfium binding
//!   failure). Returned as `Err(TransformError)` from the top-level
//!   `transform*` functions; no partial Markdown is produced.
//!
//! * Recoverable geometry errors — a single image crop or a single batch
//!   went wrong but the rest of the document is fine. These are recorded
//!   as human-readable strings in
//!   [`crate::output::TransformOutput::errors`] and processing continues
//!   with a degraded fallback (whole-page raster instead of a crop, or a
//!   skipped batch). There are no retries: this is offline text
//!   reconstruction, there is nothing to retry against.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagemd library.
///
/// Recoverable per-image and per-batch failures are accumulated as strings
/// in [`crate::output::TransformOutput::errors`] instead.
#[derive(Debug, Error)]
pub enum TransformError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page index exceeds the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Backend geometry errors ───────────────────────────────────────────
    /// The backend could not extract text from a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The backend's table detection call failed for a page.
    #[error("Table detection failed for page {page}: {detail}")]
    TableDetectionFailed { page: usize, detail: String },

    /// pdfium returned an error while rasterising a page or crop.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium and either place it next to the binary or set\n\
PDFIUM_LIB_PATH to the library file."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = TransformError::PageOutOfRange { page: 12, total: 9 };
        let msg = e.to_string();
        assert!(msg.contains("Page 12"), "got: {msg}");
        assert!(msg.contains("9 pages"), "got: {msg}");
    }

    #[test]
    fn rasterisation_display() {
        let e = TransformError::RasterisationFailed {
            page: 3,
            detail: "bitmap allocation failed".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert!(e.to_string().contains("bitmap allocation failed"));
    }

    #[test]
    fn not_a_pdf_display() {
        let e = TransformError::NotAPdf {
            path: PathBuf::from("notes.txt"),
            magic: *b"hell",
        };
        assert!(e.to_string().contains("notes.txt"));
    }

    #[test]
    fn table_detection_display() {
        let e = TransformError::TableDetectionFailed {
            page: 7,
            detail: "no text page".into(),
        };
        assert!(e.to_string().contains("page 7"));
    }
}
