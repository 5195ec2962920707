//! Layout Classifier: turn a batch of geometric lines into typed lines.
//!
//! The classifier is purely statistical. It scans the batch once to
//! derive thresholds (title and subtitle heights, the common inter-line
//! gap, the widest line, the leftmost indent), then walks the lines a
//! second time to assign each one a [`LineKind`]. Body lines are grouped
//! into numbered clusters; the cluster ordinal is what lets the
//! assembler tell "same paragraph, next visual chunk" apart from "new
//! paragraph".

use crate::config::Tuning;
use crate::geometry::{Line, LineKind, TypedLine};
use std::collections::HashMap;

/// Thresholds derived from one batch of lines.
///
/// Heights are compared with `>=`, so `f64::INFINITY` disables a tier:
/// a document where the tallest height occurs too often has no reliable
/// title signal, and everything falls through to body text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum line height for a title.
    pub title_height: f64,
    /// Minimum line height for a subtitle.
    pub subtitle_height: f64,
    /// Vertical gap at which two body lines belong to separate paragraphs.
    pub paragraph_distance: f64,
    /// Width of the widest line in the batch.
    pub paragraph_width: f64,
    /// Leftmost x0 in the batch, the zero-indent reference.
    pub zero_indent_distance: f64,
}

/// Derive classification thresholds for one batch.
pub fn compute_thresholds(lines: &[Line], tuning: &Tuning) -> Thresholds {
    // Height statistics work on truncated integer heights so that
    // sub-point rendering jitter does not split one font size into many
    // buckets.
    let mut height_counts: HashMap<i64, usize> = HashMap::new();
    let mut largest: i64 = 0;
    let mut second_largest: i64 = 0;
    for line in lines {
        let height = line.height as i64;
        *height_counts.entry(height).or_insert(0) += 1;
        if height > largest {
            second_largest = largest;
            largest = height;
        } else if height > second_largest && height < largest {
            second_largest = height;
        }
    }

    // A height that occurs too often is body text, not a heading tier.
    let cap = tuning.heading_frequency_cap;
    let title_height = if height_counts.get(&largest).copied().unwrap_or(0) > cap {
        f64::INFINITY
    } else {
        (largest as f64 * tuning.height_tolerance).round()
    };
    let subtitle_height = if title_height.is_infinite()
        || height_counts.get(&second_largest).copied().unwrap_or(0) > cap
    {
        f64::INFINITY
    } else {
        (second_largest as f64 * tuning.height_tolerance).round()
    };

    // Gap statistics: round each positive gap up to the next multiple of
    // the step and take the most common bucket, smallest bucket winning
    // ties. Buckets are tracked by their integer multiplier.
    let step = tuning.gap_rounding_step;
    let mut gap_counts: HashMap<i64, usize> = HashMap::new();
    let mut paragraph_width: f64 = 0.0;
    let mut zero_indent: Option<f64> = None;
    for line in lines {
        if let Some(gap) = line.gap_to_next {
            if gap > 0.0 {
                let bucket = gap.div_euclid(step) as i64 + 1;
                *gap_counts.entry(bucket).or_insert(0) += 1;
            }
        }
        if line.width > paragraph_width {
            paragraph_width = line.width;
        }
        zero_indent = Some(match zero_indent {
            Some(min) if min <= line.x0 => min,
            _ => line.x0,
        });
    }

    let common_gap = most_common_bucket(&gap_counts)
        .map(|bucket| bucket as f64 * step)
        .unwrap_or(tuning.default_line_gap);

    Thresholds {
        title_height,
        subtitle_height,
        paragraph_distance: common_gap * tuning.paragraph_gap_factor,
        paragraph_width,
        zero_indent_distance: zero_indent.unwrap_or(0.0),
    }
}

/// Bucket with the highest count; ties go to the smaller bucket.
fn most_common_bucket(counts: &HashMap<i64, usize>) -> Option<i64> {
    let mut best: Option<(i64, usize)> = None;
    for (&bucket, &count) in counts {
        best = Some(match best {
            None => (bucket, count),
            Some((b, c)) if count > c || (count == c && bucket < b) => (bucket, count),
            Some(keep) => keep,
        });
    }
    best.map(|(bucket, _)| bucket)
}

/// Assign a [`LineKind`] to every line of a batch.
///
/// First pass: height against the tiers. Second pass: group runs of body
/// lines into clusters, closing a cluster when the line is the last of
/// the batch, when the next line is a heading, or when the next line
/// re-aligns with the indent that opened the cluster. Cluster ordinals
/// are 1-based and increase through the batch.
pub fn classify_lines(lines: Vec<Line>, thresholds: &Thresholds, tuning: &Tuning) -> Vec<TypedLine> {
    #[derive(Clone, Copy, PartialEq)]
    enum Tier {
        Title,
        Subtitle,
        Body,
    }

    let tiers: Vec<Tier> = lines
        .iter()
        .map(|line| {
            if line.height >= thresholds.title_height {
                Tier::Title
            } else if line.height >= thresholds.subtitle_height {
                Tier::Subtitle
            } else {
                Tier::Body
            }
        })
        .collect();

    let mut kinds: Vec<LineKind> = Vec::with_capacity(lines.len());
    let mut cluster_start_x0: Option<f64> = None;
    let mut next_ordinal: usize = 1;

    for (i, line) in lines.iter().enumerate() {
        match tiers[i] {
            Tier::Title => {
                kinds.push(LineKind::Title);
                cluster_start_x0 = None;
            }
            Tier::Subtitle => {
                kinds.push(LineKind::Subtitle);
                cluster_start_x0 = None;
            }
            Tier::Body => {
                let start_x0 = *cluster_start_x0.get_or_insert(line.x0);
                kinds.push(LineKind::Paragraph(next_ordinal));

                let close = match lines.get(i + 1) {
                    None => true,
                    Some(next) => {
                        tiers[i + 1] != Tier::Body
                            || (next.x0 - start_x0).abs() < tuning.indent_tolerance
                    }
                };
                if close {
                    next_ordinal += 1;
                    cluster_start_x0 = None;
                }
            }
        }
    }

    lines
        .into_iter()
        .zip(kinds)
        .map(|(line, kind)| TypedLine { line, kind })
        .collect()
}
