//! The PDF backend boundary.
//!
//! The pipeline never talks to a PDF library directly. Everything it
//! needs from a document is expressed by the [`PageSource`] trait: raw
//! text lines, detected tables, image regions, and a crop/rasterise
//! primitive. The production implementation is
//! [`pdfium::PdfiumSource`]; tests drive the pipeline with an in-memory
//! fixture instead, which is why the trait exists at all.
//!
//! The pure geometry routines that turn backend primitives into lines and
//! table grids live in this module rather than in the pdfium glue, so
//! they can be unit-tested without a pdfium library on the machine.

pub mod pdfium;

use crate::error::TransformError;
use crate::geometry::{RawTable, Rect, TextLine};
use image::DynamicImage;

/// Read access to one opened PDF document, page by page.
///
/// Page indices are 0-based; all geometry is in top-down page coordinates
/// (see [`crate::geometry`]). Within a page, lines and image regions are
/// reported in top-to-bottom document order.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Raw text lines of a page, top to bottom.
    fn text_lines(&self, page_index: usize) -> Result<Vec<TextLine>, TransformError>;

    /// Tables detected on a page using ruled-line boundaries for both
    /// rows and columns, top to bottom.
    fn tables(&self, page_index: usize) -> Result<Vec<RawTable>, TransformError>;

    /// Bounding boxes of the page's raster images, top to bottom.
    fn image_regions(&self, page_index: usize) -> Result<Vec<Rect>, TransformError>;

    /// Rasterise a page at `dpi`, optionally cropped to `clip`.
    ///
    /// Implementations must fail (rather than silently clamp to nothing)
    /// when `clip` lies outside the page, so the extractor can fall back
    /// to a whole-page raster and record the error.
    fn rasterize(
        &self,
        page_index: usize,
        clip: Option<&Rect>,
        dpi: u32,
    ) -> Result<DynamicImage, TransformError>;
}

// ── Line grouping ────────────────────────────────────────────────────────

/// Fraction of the shorter segment's height that two segments must
/// vertically overlap by to be considered part of the same line.
const LINE_OVERLAP_RATIO: f64 = 0.5;

/// Horizontal gap (points) above which joined segments get a space.
const SEGMENT_JOIN_GAP: f64 = 1.0;

/// Group raw text segments into full horizontal lines.
///
/// Backends report text in runs that usually cover less than a visual
/// line (one run per styling change, or per word). Segments whose
/// vertical extents overlap by at least half the shorter segment's height
/// are merged; each merged line's text is its segments ordered by `x0`,
/// separated by a space wherever there is a visible horizontal gap.
pub fn group_segments_into_lines(mut segments: Vec<TextLine>) -> Vec<TextLine> {
    segments.retain(|s| !s.text.trim().is_empty());
    segments.sort_by(|a, b| {
        a.top
            .partial_cmp(&b.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut groups: Vec<Vec<TextLine>> = Vec::new();
    for seg in segments {
        let found = groups.iter_mut().find(|group| {
            group
                .iter()
                .any(|member| vertical_overlap_ratio(member, &seg) >= LINE_OVERLAP_RATIO)
        });
        match found {
            Some(group) => group.push(seg),
            None => groups.push(vec![seg]),
        }
    }

    let mut lines: Vec<TextLine> = groups.into_iter().map(merge_group).collect();
    lines.sort_by(|a, b| {
        a.top
            .partial_cmp(&b.top)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    lines
}

fn vertical_overlap_ratio(a: &TextLine, b: &TextLine) -> f64 {
    let overlap = a.bottom.min(b.bottom) - a.top.max(b.top);
    let shorter = (a.bottom - a.top).min(b.bottom - b.top);
    if shorter <= 0.0 {
        return 0.0;
    }
    overlap / shorter
}

fn merge_group(mut group: Vec<TextLine>) -> TextLine {
    group.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

    let mut text = String::new();
    let mut top = f64::MAX;
    let mut bottom = f64::MIN;
    let mut x0 = f64::MAX;
    let mut x1 = f64::MIN;
    let mut prev_right: Option<f64> = None;

    for seg in &group {
        if let Some(right) = prev_right {
            if seg.x0 - right > SEGMENT_JOIN_GAP && !text.ends_with(' ') {
                text.push(' ');
            }
        }
        text.push_str(seg.text.trim_end());
        prev_right = Some(seg.x1);
        top = top.min(seg.top);
        bottom = bottom.max(seg.bottom);
        x0 = x0.min(seg.x0);
        x1 = x1.max(seg.x1);
    }

    TextLine {
        text,
        top,
        bottom,
        x0,
        x1,
    }
}

// ── Ruled-grid detection ─────────────────────────────────────────────────

/// Maximum thickness (points) for a path box to count as a ruling line.
const RULING_THICKNESS: f64 = 2.0;

/// Minimum length (points) for a path box to count as a ruling line.
const RULING_MIN_LENGTH: f64 = 8.0;

/// Slack (points) when testing rulings for connectivity.
const RULING_JOIN_SLACK: f64 = 3.0;

/// Tolerance (points) when merging nearby ruling positions into one
/// row/column boundary.
const BOUNDARY_MERGE_TOLERANCE: f64 = 2.0;

/// A table skeleton recovered from ruling lines: sorted row and column
/// boundary positions plus the covering box.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub bbox: Rect,
    /// Sorted y positions of horizontal rulings (row boundaries).
    pub row_bounds: Vec<f64>,
    /// Sorted x positions of vertical rulings (column boundaries).
    pub col_bounds: Vec<f64>,
}

impl TableGrid {
    pub fn row_count(&self) -> usize {
        self.row_bounds.len().saturating_sub(1)
    }

    pub fn col_count(&self) -> usize {
        self.col_bounds.len().saturating_sub(1)
    }

    /// The cell box at row `i`, column `j`.
    pub fn cell(&self, i: usize, j: usize) -> Rect {
        Rect::new(
            self.row_bounds[i],
            self.col_bounds[j],
            self.row_bounds[i + 1],
            self.col_bounds[j + 1],
        )
    }
}

/// Detect ruled table grids from the bounding boxes of a page's path
/// objects.
///
/// This is the "lines"/"lines" strategy: thin horizontal boxes are row
/// rulings, thin vertical boxes are column rulings. Rulings that touch
/// (within a small slack) form a connected component; a component with at
/// least two rulings in each direction yields one grid. Grids are
/// returned top to bottom.
pub fn detect_grids(path_boxes: &[Rect]) -> Vec<TableGrid> {
    let rulings: Vec<Ruling> = path_boxes.iter().filter_map(Ruling::from_box).collect();
    if rulings.is_empty() {
        return Vec::new();
    }

    let mut grids: Vec<TableGrid> = connected_components(&rulings)
        .into_iter()
        .filter_map(|component| grid_from_component(&component))
        .collect();

    grids.sort_by(|a, b| {
        a.bbox
            .top
            .partial_cmp(&b.bbox.top)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    grids
}

#[derive(Debug, Clone, Copy)]
struct Ruling {
    rect: Rect,
    horizontal: bool,
}

impl Ruling {
    fn from_box(rect: &Rect) -> Option<Self> {
        let w = rect.width();
        let h = rect.height();
        if h <= RULING_THICKNESS && w >= RULING_MIN_LENGTH {
            Some(Self {
                rect: *rect,
                horizontal: true,
            })
        } else if w <= RULING_THICKNESS && h >= RULING_MIN_LENGTH {
            Some(Self {
                rect: *rect,
                horizontal: false,
            })
        } else {
            None
        }
    }

    fn touches(&self, other: &Ruling) -> bool {
        self.rect.left - RULING_JOIN_SLACK <= other.rect.right
            && other.rect.left - RULING_JOIN_SLACK <= self.rect.right
            && self.rect.top - RULING_JOIN_SLACK <= other.rect.bottom
            && other.rect.top - RULING_JOIN_SLACK <= self.rect.bottom
    }
}

/// Partition rulings into transitively-touching groups.
fn connected_components(rulings: &[Ruling]) -> Vec<Vec<Ruling>> {
    let mut component = vec![usize::MAX; rulings.len()];
    let mut next = 0usize;

    for i in 0..rulings.len() {
        if component[i] != usize::MAX {
            continue;
        }
        // Flood-fill from i.
        component[i] = next;
        let mut frontier = vec![i];
        while let Some(a) = frontier.pop() {
            for b in 0..rulings.len() {
                if component[b] == usize::MAX && rulings[a].touches(&rulings[b]) {
                    component[b] = next;
                    frontier.push(b);
                }
            }
        }
        next += 1;
    }

    let mut groups = vec![Vec::new(); next];
    for (idx, ruling) in rulings.iter().enumerate() {
        groups[component[idx]].push(*ruling);
    }
    groups
}

fn grid_from_component(component: &[Ruling]) -> Option<TableGrid> {
    let row_bounds = merge_positions(
        component
            .iter()
            .filter(|r| r.horizontal)
            .map(|r| (r.rect.top + r.rect.bottom) / 2.0),
    );
    let col_bounds = merge_positions(
        component
            .iter()
            .filter(|r| !r.horizontal)
            .map(|r| (r.rect.left + r.rect.right) / 2.0),
    );

    if row_bounds.len() < 2 || col_bounds.len() < 2 {
        return None;
    }

    let bbox = Rect::new(
        row_bounds[0],
        col_bounds[0],
        *row_bounds.last()?,
        *col_bounds.last()?,
    );
    Some(TableGrid {
        bbox,
        row_bounds,
        col_bounds,
    })
}

/// Sort positions and merge values closer than the boundary tolerance.
fn merge_positions(positions: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = positions.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut merged: Vec<f64> = Vec::with_capacity(sorted.len());
    for p in sorted {
        match merged.last() {
            Some(&last) if p - last < BOUNDARY_MERGE_TOLERANCE => {}
            _ => merged.push(p),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, top: f64, bottom: f64, x0: f64, x1: f64) -> TextLine {
        TextLine {
            text: text.into(),
            top,
            bottom,
            x0,
            x1,
        }
    }

    #[test]
    fn segments_on_one_baseline_merge_into_one_line() {
        let lines = group_segments_into_lines(vec![
            seg("world", 10.0, 22.0, 60.0, 110.0),
            seg("Hello", 10.2, 21.8, 10.0, 55.0),
        ]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello world");
        assert_eq!(lines[0].x0, 10.0);
        assert_eq!(lines[0].x1, 110.0);
    }

    #[test]
    fn vertically_separate_segments_stay_separate_lines() {
        let lines = group_segments_into_lines(vec![
            seg("second", 30.0, 42.0, 10.0, 80.0),
            seg("first", 10.0, 22.0, 10.0, 70.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].text, "second");
    }

    #[test]
    fn adjacent_segments_join_without_double_space() {
        let lines = group_segments_into_lines(vec![
            seg("Hel", 10.0, 22.0, 10.0, 30.0),
            seg("lo", 10.0, 22.0, 30.2, 45.0),
        ]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn blank_segments_are_dropped() {
        let lines = group_segments_into_lines(vec![seg("   ", 10.0, 22.0, 10.0, 30.0)]);
        assert!(lines.is_empty());
    }

    /// A 2×2 ruled grid: three horizontal and three vertical rulings.
    fn grid_rulings() -> Vec<Rect> {
        vec![
            // Horizontal rulings at y = 100, 120, 140.
            Rect::new(99.5, 50.0, 100.5, 250.0),
            Rect::new(119.5, 50.0, 120.5, 250.0),
            Rect::new(139.5, 50.0, 140.5, 250.0),
            // Vertical rulings at x = 50, 150, 250.
            Rect::new(100.0, 49.5, 140.0, 50.5),
            Rect::new(100.0, 149.5, 140.0, 150.5),
            Rect::new(100.0, 249.5, 140.0, 250.5),
        ]
    }

    #[test]
    fn ruled_grid_is_detected() {
        let grids = detect_grids(&grid_rulings());
        assert_eq!(grids.len(), 1);
        let grid = &grids[0];
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.col_count(), 2);
        assert!((grid.bbox.top - 100.0).abs() < 1.0);
        assert!((grid.bbox.right - 250.0).abs() < 1.0);
    }

    #[test]
    fn cell_lookup_returns_expected_box() {
        let grids = detect_grids(&grid_rulings());
        let cell = grids[0].cell(0, 1);
        assert!(cell.left > 149.0 && cell.left < 151.0);
        assert!(cell.top > 99.0 && cell.top < 101.0);
    }

    #[test]
    fn isolated_rulings_do_not_form_a_grid() {
        // Two horizontal rulings but no verticals: underlines, not a table.
        let grids = detect_grids(&[
            Rect::new(99.5, 50.0, 100.5, 250.0),
            Rect::new(199.5, 50.0, 200.5, 250.0),
        ]);
        assert!(grids.is_empty());
    }

    #[test]
    fn distant_grids_are_separate_components() {
        let mut rulings = grid_rulings();
        // Second grid far below the first.
        rulings.extend(grid_rulings().iter().map(|r| {
            Rect::new(r.top + 400.0, r.left, r.bottom + 400.0, r.right)
        }));
        let grids = detect_grids(&rulings);
        assert_eq!(grids.len(), 2);
        assert!(grids[0].bbox.top < grids[1].bbox.top);
    }

    #[test]
    fn thick_boxes_are_not_rulings() {
        // A filled rectangle (e.g. a figure) must not register as rulings.
        let grids = detect_grids(&[Rect::new(100.0, 50.0, 200.0, 250.0)]);
        assert!(grids.is_empty());
    }
}
