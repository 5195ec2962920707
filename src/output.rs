//! Output types returned by the transformation entry points.

use serde::{Deserialize, Serialize};

/// The result of a full document transformation.
///
/// Returned by [`crate::transform`] even when some batches failed; check
/// [`errors`](Self::errors) for recoverable problems encountered along
/// the way (image-crop fallbacks, skipped batches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformOutput {
    /// The reconstructed Markdown document.
    pub markdown: String,

    /// Base64 PNG data URIs, one per `![image N](N)` reference, in
    /// reference order. Empty unless
    /// [`include_images`](crate::TransformConfig::include_images) is set.
    pub images: Vec<String>,

    /// Non-fatal error strings accumulated across all batches.
    pub errors: Vec<String>,

    /// Counters for the run.
    pub stats: TransformStats,
}

/// Counters describing one transformation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformStats {
    /// Total pages in the document.
    pub total_pages: usize,
    /// Batches processed to completion.
    pub processed_batches: usize,
    /// Batches skipped because of a batch-level extraction failure.
    pub failed_batches: usize,
    /// Text lines extracted across all batches.
    pub lines: usize,
    /// Tables emitted into the Markdown.
    pub tables: usize,
    /// Images emitted into the Markdown.
    pub images: usize,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}

/// Document metadata extracted without transforming content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_round_trips_through_json() {
        let out = TransformOutput {
            markdown: "# Title\n\nBody\n\n".into(),
            images: vec!["data:image/png;base64,AAAA".into()],
            errors: vec!["image 0 crop failed: out of bounds".into()],
            stats: TransformStats {
                total_pages: 2,
                processed_batches: 1,
                lines: 5,
                images: 1,
                ..Default::default()
            },
        };

        let json = serde_json::to_string(&out).unwrap();
        let back: TransformOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.markdown, out.markdown);
        assert_eq!(back.images.len(), 1);
        assert_eq!(back.stats.total_pages, 2);
    }
}
