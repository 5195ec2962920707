//! Geometric records flowing through the pipeline.
//!
//! All coordinates are in PDF points with a **top-down** origin: `top` is
//! smaller than `bottom`, and `top == 0.0` is the top edge of the page.
//! The pdfium backend flips pdfium's native bottom-up coordinates before
//! anything else sees them, so every later stage can reason in reading
//! order without caring which backend produced the data.

/// An axis-aligned bounding box in top-down page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// True when the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.right > self.left && self.bottom > self.top
    }

    /// True when `other`'s centre point lies inside this box.
    pub fn contains_center_of(&self, other: &Rect) -> bool {
        let cx = (other.left + other.right) / 2.0;
        let cy = (other.top + other.bottom) / 2.0;
        cx >= self.left && cx < self.right && cy >= self.top && cy < self.bottom
    }
}

/// One raw horizontal text run as reported by the backend, before any
/// derived metrics are attached. Produced by [`crate::backend::PageSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub top: f64,
    pub bottom: f64,
    pub x0: f64,
    pub x1: f64,
}

/// A normalised text line with the derived metrics the classifier and
/// assembler need. Created by the Geometry Extractor; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// 1-indexed page number.
    pub page_number: usize,
    pub top: f64,
    pub bottom: f64,
    pub x0: f64,
    pub x1: f64,
    pub height: f64,
    pub width: f64,
    pub middle_x: f64,
    /// Vertical gap to the next line **on the same page**; `None` for the
    /// last line of each page.
    pub gap_to_next: Option<f64>,
}

impl Line {
    /// Build a `Line` from a raw backend line plus its successor on the
    /// same page (if any).
    pub fn from_raw(raw: TextLine, page_number: usize, next_on_page: Option<&TextLine>) -> Self {
        let height = raw.bottom - raw.top;
        let width = raw.x1 - raw.x0;
        let middle_x = (raw.x0 + raw.x1) / 2.0;
        let gap_to_next = next_on_page.map(|n| n.top - raw.bottom);
        Self {
            text: raw.text,
            page_number,
            top: raw.top,
            bottom: raw.bottom,
            x0: raw.x0,
            x1: raw.x1,
            height,
            width,
            middle_x,
            gap_to_next,
        }
    }
}

/// Layout classification of a line, assigned by the Layout Classifier.
///
/// Paragraph clusters carry a 1-based ordinal so the assembler can detect
/// transitions into a later (nested) cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Title,
    Subtitle,
    Paragraph(usize),
}

impl LineKind {
    pub fn is_heading(&self) -> bool {
        matches!(self, LineKind::Title | LineKind::Subtitle)
    }
}

/// A line together with its final classification. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedLine {
    pub line: Line,
    pub kind: LineKind,
}

/// A table detected by the backend, positioned on one page.
///
/// Consumed exactly once by the assembler (mark-and-sweep via a bitset,
/// never by removing entries mid-iteration).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub bbox: Rect,
    /// 1-indexed page number.
    pub page_number: usize,
    /// Ordered rows of ordered cells; missing cells are empty strings.
    pub rows: Vec<Vec<String>>,
}

/// A raw table straight from the backend, before the page number is known
/// to the pipeline record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub bbox: Rect,
    pub rows: Vec<Vec<String>>,
}

/// An encoded page image awaiting placement in the Markdown stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub bbox: Rect,
    /// 1-indexed page number.
    pub page_number: usize,
    /// Global sequence index, unique across every batch of the document.
    pub index: u64,
    /// `data:image/png;base64,…` data URI.
    pub data_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, top: f64, bottom: f64, x0: f64, x1: f64) -> TextLine {
        TextLine {
            text: text.into(),
            top,
            bottom,
            x0,
            x1,
        }
    }

    #[test]
    fn line_metrics_derived_from_raw() {
        let next = raw("next", 30.0, 40.0, 10.0, 90.0);
        let line = Line::from_raw(raw("first", 10.0, 22.0, 10.0, 110.0), 1, Some(&next));

        assert_eq!(line.height, 12.0);
        assert_eq!(line.width, 100.0);
        assert_eq!(line.middle_x, 60.0);
        assert_eq!(line.gap_to_next, Some(8.0));
        assert_eq!(line.page_number, 1);
    }

    #[test]
    fn last_line_on_page_has_no_gap() {
        let line = Line::from_raw(raw("tail", 700.0, 712.0, 10.0, 50.0), 3, None);
        assert_eq!(line.gap_to_next, None);
    }

    #[test]
    fn rect_validity_and_center() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(outer.is_valid());
        assert!(outer.contains_center_of(&inner));
        assert!(!Rect::new(10.0, 10.0, 10.0, 50.0).is_valid());
    }
}
