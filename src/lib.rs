//! # pagemd
//!
//! Reconstruct Markdown from PDF page geometry.
//!
//! ## Why this crate?
//!
//! Plain text extraction flattens a PDF into an undifferentiated stream:
//! headings, paragraphs, tables, and figures all come out as the same
//! runs of text. This crate keeps the geometry — line heights, vertical
//! gaps, left indents, ruled boxes — and uses it to rebuild structure:
//! tall lines become `#`/`##` headings, gap statistics split paragraphs,
//! ruled grids become pipe tables, and embedded images become numbered
//! references backed by base64 PNG crops.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract   per-batch lines, tables, images via pdfium
//!  ├─ 2. Classify  height/gap statistics → title / subtitle / paragraph N
//!  ├─ 3. Assemble  single forward pass → Markdown + image references
//!  └─ 4. Output    concatenated batches + stats + non-fatal errors
//! ```
//!
//! Pages are processed in fixed-size batches (30 by default) to bound
//! the memory held by rasterised image crops; the image sequence counter
//! is the only state carried from one batch to the next.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagemd::{transform, TransformConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransformConfig::builder().include_images(true).build()?;
//!     let output = transform("document.pdf", &config)?;
//!     println!("{}", output.markdown);
//!     eprintln!("{} images, {} recoverable errors",
//!         output.images.len(),
//!         output.errors.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagemd` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pagemd = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::PageSource;
pub use config::{TransformConfig, TransformConfigBuilder, Tuning};
pub use error::TransformError;
pub use geometry::{Line, LineKind, PageImage, Rect, Table, TextLine, TypedLine};
pub use output::{DocumentMetadata, TransformOutput, TransformStats};
pub use transform::{
    inspect, transform, transform_document, transform_from_bytes, transform_to_file,
};
