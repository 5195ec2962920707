//! Configuration types for PDF-to-Markdown transformation.
//!
//! All behaviour is controlled through [`TransformConfig`], built via its
//! [`TransformConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs, serialise them for logging, and diff two runs
//! to understand why their outputs differ.
//!
//! The layout heuristics carry a handful of magic numbers inherited from
//! the reference heuristics with no documented derivation. They live in
//! [`Tuning`] as plain fields rather than hard-coded constants, so callers
//! who know their corpus can adjust them without forking the crate.

use crate::error::TransformError;
use serde::{Deserialize, Serialize};

/// Configuration for a PDF-to-Markdown transformation.
///
/// Built via [`TransformConfig::builder()`] or using
/// [`TransformConfig::default()`].
///
/// # Example
/// ```rust
/// use pagemd::TransformConfig;
///
/// let config = TransformConfig::builder()
///     .include_images(true)
///     .batch_size(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Emit `![image N](N)` references and base64 PNG payloads for every
    /// image region found on a page. Default: false.
    ///
    /// Rasterising and PNG-encoding image crops dominates both run time
    /// and output size, so it is opt-in. With the flag off no image is
    /// rasterised at all.
    pub include_images: bool,

    /// Pages per batch. Default: 30.
    ///
    /// Batching exists purely to bound peak memory: a batch's lines,
    /// tables, and rasterised images are all held in memory while its
    /// Markdown is assembled. Heading thresholds are also computed per
    /// batch, so very small batch sizes can change classification on
    /// documents with unusual height distributions.
    pub batch_size: usize,

    /// Rasterisation resolution for image crops, in DPI. Default: 500.
    ///
    /// 500 DPI keeps embedded figures legible after cropping; lower it
    /// for documents with full-page photographs where output size matters
    /// more than detail.
    pub image_resolution: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Heuristic constants used by the layout classifier and assembler.
    pub tuning: Tuning,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            include_images: false,
            batch_size: 30,
            image_resolution: 500,
            password: None,
            tuning: Tuning::default(),
        }
    }
}

impl TransformConfig {
    /// Create a new builder for `TransformConfig`.
    pub fn builder() -> TransformConfigBuilder {
        TransformConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TransformConfig`].
#[derive(Debug)]
pub struct TransformConfigBuilder {
    config: TransformConfig,
}

impl TransformConfigBuilder {
    pub fn include_images(mut self, v: bool) -> Self {
        self.config.include_images = v;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    pub fn image_resolution(mut self, dpi: u32) -> Self {
        self.config.image_resolution = dpi.clamp(72, 1200);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.config.tuning = tuning;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TransformConfig, TransformError> {
        let c = &self.config;
        if c.batch_size == 0 {
            return Err(TransformError::InvalidConfig(
                "Batch size must be ≥ 1".into(),
            ));
        }
        if c.tuning.height_tolerance <= 0.0 || c.tuning.height_tolerance > 1.0 {
            return Err(TransformError::InvalidConfig(format!(
                "Height tolerance must be in (0, 1], got {}",
                c.tuning.height_tolerance
            )));
        }
        if c.tuning.gap_rounding_step <= 0.0 {
            return Err(TransformError::InvalidConfig(
                "Gap rounding step must be positive".into(),
            ));
        }
        if c.tuning.indent_step <= 0.0 {
            return Err(TransformError::InvalidConfig(
                "Indent step must be positive".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Heuristic constants for layout classification and assembly.
///
/// The defaults reproduce the reference behaviour. None of these values
/// has a principled derivation; they were tuned on real documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    /// Multiplier applied to the largest/second-largest line height to get
    /// the title/subtitle thresholds. Default: 0.95.
    pub height_tolerance: f64,

    /// If the largest height occurs more than this many times in a batch,
    /// the document is treated as having no distinguishable title size.
    /// Default: 50.
    pub heading_frequency_cap: usize,

    /// Inter-line gaps are rounded up to the nearest multiple of this step
    /// before looking for the most common gap. Default: 3.0.
    pub gap_rounding_step: f64,

    /// Most-common gap to assume when no line has a positive gap.
    /// Default: 10.0.
    pub default_line_gap: f64,

    /// The paragraph-break threshold is the most common gap times this
    /// factor. Default: 1.5.
    pub paragraph_gap_factor: f64,

    /// A paragraph cluster closes when the next line's left edge is within
    /// this many units of the cluster's starting left edge. Default: 10.0.
    pub indent_tolerance: f64,

    /// Units of left-margin offset per emitted indentation space.
    /// Default: 10.0.
    pub indent_step: f64,

    /// A page's last line signals a paragraph break when it is narrower
    /// than this fraction of the widest line in the batch. Default: 0.8.
    pub trailing_width_ratio: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            height_tolerance: 0.95,
            heading_frequency_cap: 50,
            gap_rounding_step: 3.0,
            default_line_gap: 10.0,
            paragraph_gap_factor: 1.5,
            indent_tolerance: 10.0,
            indent_step: 10.0,
            trailing_width_ratio: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TransformConfig::builder().build().unwrap();
        assert!(!config.include_images);
        assert_eq!(config.batch_size, 30);
        assert_eq!(config.image_resolution, 500);
    }

    #[test]
    fn builder_clamps_batch_size() {
        let config = TransformConfig::builder().batch_size(0).build().unwrap();
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn builder_clamps_resolution() {
        let config = TransformConfig::builder()
            .image_resolution(10_000)
            .build()
            .unwrap();
        assert_eq!(config.image_resolution, 1200);
    }

    #[test]
    fn invalid_tuning_rejected() {
        let mut tuning = Tuning::default();
        tuning.height_tolerance = 1.5;
        let err = TransformConfig::builder().tuning(tuning).build();
        assert!(matches!(err, Err(TransformError::InvalidConfig(_))));
    }

    #[test]
    fn tuning_defaults_match_reference() {
        let t = Tuning::default();
        assert_eq!(t.heading_frequency_cap, 50);
        assert_eq!(t.height_tolerance, 0.95);
        assert_eq!(t.trailing_width_ratio, 0.8);
        assert_eq!(t.indent_tolerance, 10.0);
    }
}
