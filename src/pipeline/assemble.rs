//! Document Assembler: render typed lines, tables, and images into
//! Markdown in a single forward pass.
//!
//! Tables and images are consumed exactly once. Consumption is tracked
//! with per-batch bitsets rather than by removing items from the lists,
//! so iteration order stays stable while the pass runs. A line that
//! falls inside a table's bounding box emits no text of its own; the
//! table is queued and flushed as one pipe-table block when the first
//! line past it is reached.

use crate::config::Tuning;
use crate::geometry::{Line, LineKind, PageImage, Table, TypedLine};
use crate::pipeline::classify::Thresholds;

/// Markdown for one batch plus the encoded images in reference order.
#[derive(Debug, Default)]
pub struct AssembledBatch {
    pub markdown: String,
    /// Base64 data URIs, in the order their references appear.
    pub images: Vec<String>,
}

/// Accumulates Markdown with normalised blank-line separation.
///
/// `blank` collapses any run of trailing newlines to exactly one empty
/// line, so callers can request separation freely without producing
/// stacked blank lines.
struct MarkdownWriter {
    buf: String,
}

impl MarkdownWriter {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn push_line(&mut self, s: &str) {
        self.buf.push_str(s);
        self.buf.push('\n');
    }

    /// Separate what follows from what came before by one empty line.
    /// No-op on an empty buffer.
    fn blank(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        while self.buf.ends_with('\n') {
            self.buf.pop();
        }
        self.buf.push_str("\n\n");
    }

    fn into_string(self) -> String {
        self.buf
    }
}

/// Render one batch.
///
/// `typed`, `tables`, and `images` all come from the same batch; the
/// thresholds are the ones the classifier derived for it.
pub fn assemble_batch(
    typed: &[TypedLine],
    tables: &[Table],
    images: &[PageImage],
    thresholds: &Thresholds,
    tuning: &Tuning,
) -> AssembledBatch {
    let mut w = MarkdownWriter::new();
    let mut out_images: Vec<String> = Vec::new();

    let mut table_consumed = vec![false; tables.len()];
    let mut image_consumed = vec![false; images.len()];
    let mut pending_tables: Vec<usize> = Vec::new();

    for (i, current) in typed.iter().enumerate() {
        let line = &current.line;
        let next = typed.get(i + 1);

        // Lines inside a table emit no text; the table renders instead.
        // Image insertion waits too, so an image overlapping the table's
        // span appears after the table block rather than inside it.
        if let Some(t) = overlapping_table(line, tables, &table_consumed) {
            if !pending_tables.contains(&t) {
                pending_tables.push(t);
            }
            continue;
        }

        for &t in &pending_tables {
            w.blank();
            w.push_str(&render_table(&tables[t]));
            w.blank();
            table_consumed[t] = true;
        }
        pending_tables.clear();

        match current.kind {
            LineKind::Title | LineKind::Subtitle => {
                let merged = i > 0 && typed[i - 1].kind == current.kind;
                if merged {
                    w.push_str(" ");
                    w.push_str(&line.text);
                } else {
                    w.blank();
                    let marker = if current.kind == LineKind::Title {
                        "# "
                    } else {
                        "## "
                    };
                    w.push_str(marker);
                    w.push_str(&line.text);
                }
                let continues = next.is_some_and(|n| n.kind == current.kind);
                if !continues {
                    w.blank();
                    maybe_separate(&mut w, line, thresholds, tuning);
                }
            }
            LineKind::Paragraph(ordinal) => {
                let indent =
                    ((line.x0 - thresholds.zero_indent_distance) / tuning.indent_step).round();
                if indent > 0.0 {
                    w.push_str(&" ".repeat(indent as usize));
                }
                w.push_line(&line.text);

                if let Some(TypedLine {
                    kind: LineKind::Paragraph(next_ordinal),
                    ..
                }) = next
                {
                    if *next_ordinal > ordinal {
                        w.blank();
                    }
                }
                maybe_separate(&mut w, line, thresholds, tuning);
            }
        }

        insert_images(&mut w, &mut out_images, images, &mut image_consumed, line, next);
    }

    // Tables never followed by a line past them, and images in a batch
    // with no lines at all, still belong to the output.
    for (t, consumed) in table_consumed.iter().enumerate() {
        if !consumed {
            w.blank();
            w.push_str(&render_table(&tables[t]));
            w.blank();
        }
    }
    for (idx, img) in images.iter().enumerate() {
        if !image_consumed[idx] {
            reference_image(&mut w, &mut out_images, img);
        }
    }

    w.blank();
    AssembledBatch {
        markdown: w.into_string(),
        images: out_images,
    }
}

/// First unconsumed table whose vertical span contains the line, on the
/// line's page.
fn overlapping_table(line: &Line, tables: &[Table], consumed: &[bool]) -> Option<usize> {
    tables.iter().enumerate().position(|(t, table)| {
        !consumed[t]
            && table.page_number == line.page_number
            && line.top > table.bbox.top
            && line.bottom < table.bbox.bottom
    })
}

/// Blank-line separator after a line: a large gap to the next line, or a
/// short line closing out its page.
fn maybe_separate(w: &mut MarkdownWriter, line: &Line, thresholds: &Thresholds, tuning: &Tuning) {
    match line.gap_to_next {
        Some(gap) if gap >= thresholds.paragraph_distance => w.blank(),
        None if line.width < thresholds.paragraph_width * tuning.trailing_width_ratio => w.blank(),
        _ => {}
    }
}

/// Emit references for every unconsumed image that belongs between
/// `line` and `next`.
fn insert_images(
    w: &mut MarkdownWriter,
    out_images: &mut Vec<String>,
    images: &[PageImage],
    consumed: &mut [bool],
    line: &Line,
    next: Option<&TypedLine>,
) {
    for (idx, img) in images.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        let belongs = match next.map(|n| &n.line) {
            Some(n) if n.page_number == line.page_number => {
                img.page_number == line.page_number
                    && img.bbox.top > line.bottom
                    && img.bbox.bottom < n.top
            }
            Some(n) if n.page_number > line.page_number => {
                img.page_number >= line.page_number && img.page_number < n.page_number
            }
            Some(_) => false,
            None => true,
        };
        if belongs {
            reference_image(w, out_images, img);
            consumed[idx] = true;
        }
    }
}

fn reference_image(w: &mut MarkdownWriter, out_images: &mut Vec<String>, img: &PageImage) {
    w.blank();
    w.push_str(&format!("![image {0}]({0})", img.index));
    w.blank();
    out_images.push(img.data_uri.clone());
}

/// Pipe table: cells joined with `" | "`, a `---` divider after the
/// header row, in-cell newlines replaced with `<br>`.
fn render_table(table: &Table) -> String {
    let mut out = String::new();
    for (i, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell.replace('\n', "<br>"))
            .collect();
        out.push_str(&cells.join(" | "));
        if i == 0 {
            out.push('\n');
            out.push_str(&vec!["---"; row.len()].join(" | "));
        }
        if i < table.rows.len() - 1 {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn plain_thresholds() -> Thresholds {
        Thresholds {
            title_height: 19.0,
            subtitle_height: f64::INFINITY,
            paragraph_distance: 15.0,
            paragraph_width: 200.0,
            zero_indent_distance: 10.0,
        }
    }

    fn line(text: &str, page: usize, top: f64, bottom: f64, x0: f64, width: f64) -> Line {
        Line {
            text: text.into(),
            page_number: page,
            top,
            bottom,
            x0,
            x1: x0 + width,
            height: bottom - top,
            width,
            middle_x: x0 + width / 2.0,
            gap_to_next: None,
        }
    }

    fn typed(kind: LineKind, l: Line) -> TypedLine {
        TypedLine { line: l, kind }
    }

    #[test]
    fn title_then_paragraph_exact_output() {
        let lines = vec![
            typed(LineKind::Title, line("Intro", 1, 10.0, 30.0, 10.0, 180.0)),
            typed(
                LineKind::Paragraph(1),
                line("Some text", 1, 35.0, 45.0, 10.0, 180.0),
            ),
        ];
        let batch = assemble_batch(&lines, &[], &[], &plain_thresholds(), &Tuning::default());
        assert_eq!(batch.markdown, "# Intro\n\nSome text\n\n");
    }

    #[test]
    fn consecutive_titles_merge_into_one_heading() {
        let lines = vec![
            typed(LineKind::Title, line("Annual", 1, 10.0, 30.0, 10.0, 100.0)),
            typed(LineKind::Title, line("Report", 1, 32.0, 52.0, 10.0, 100.0)),
        ];
        let batch = assemble_batch(&lines, &[], &[], &plain_thresholds(), &Tuning::default());
        assert_eq!(batch.markdown, "# Annual Report\n\n");
    }

    #[test]
    fn indentation_monotonic_in_x0() {
        let lines = vec![
            typed(
                LineKind::Paragraph(1),
                line("outer", 1, 10.0, 20.0, 10.0, 200.0),
            ),
            typed(
                LineKind::Paragraph(1),
                line("inner", 1, 22.0, 32.0, 30.0, 200.0),
            ),
        ];
        let batch = assemble_batch(&lines, &[], &[], &plain_thresholds(), &Tuning::default());
        assert!(batch.markdown.contains("outer\n"));
        assert!(batch.markdown.contains("  inner\n"));
    }

    #[test]
    fn higher_cluster_ordinal_gets_blank_line() {
        let lines = vec![
            typed(
                LineKind::Paragraph(1),
                line("first", 1, 10.0, 20.0, 10.0, 200.0),
            ),
            typed(
                LineKind::Paragraph(2),
                line("second", 1, 22.0, 32.0, 10.0, 200.0),
            ),
        ];
        let batch = assemble_batch(&lines, &[], &[], &plain_thresholds(), &Tuning::default());
        assert_eq!(batch.markdown, "first\n\nsecond\n\n");
    }

    #[test]
    fn two_by_two_table_renders_three_rows() {
        let table = Table {
            bbox: Rect::new(100.0, 10.0, 200.0, 300.0),
            page_number: 1,
            rows: vec![
                vec!["A".into(), "B".into()],
                vec!["C".into(), "D".into()],
            ],
        };
        assert_eq!(render_table(&table), "A | B\n--- | ---\nC | D");
    }

    #[test]
    fn lines_inside_table_defer_until_past_it() {
        let table = Table {
            bbox: Rect::new(30.0, 10.0, 80.0, 300.0),
            page_number: 1,
            rows: vec![vec!["H".into()], vec!["V".into()]],
        };
        let lines = vec![
            typed(
                LineKind::Paragraph(1),
                line("cell text", 1, 40.0, 50.0, 20.0, 80.0),
            ),
            typed(
                LineKind::Paragraph(2),
                line("after", 1, 90.0, 100.0, 10.0, 200.0),
            ),
        ];
        let batch = assemble_batch(
            &lines,
            std::slice::from_ref(&table),
            &[],
            &plain_thresholds(),
            &Tuning::default(),
        );
        assert!(!batch.markdown.contains("cell text"));
        assert_eq!(batch.markdown, "H\n---\nV\n\nafter\n\n");
    }

    #[test]
    fn image_inside_table_span_appears_after_the_table() {
        let table = Table {
            bbox: Rect::new(30.0, 10.0, 100.0, 300.0),
            page_number: 1,
            rows: vec![vec!["H".into()], vec!["V".into()]],
        };
        let img = PageImage {
            bbox: Rect::new(55.0, 10.0, 75.0, 200.0),
            page_number: 1,
            index: 0,
            data_uri: "data:image/png;base64,BBBB".into(),
        };
        // Two lines sit inside the table's span, on either side of the
        // image; one line follows past the table.
        let lines = vec![
            typed(
                LineKind::Paragraph(1),
                line("row one", 1, 40.0, 50.0, 20.0, 80.0),
            ),
            typed(
                LineKind::Paragraph(1),
                line("row two", 1, 80.0, 90.0, 20.0, 80.0),
            ),
            typed(
                LineKind::Paragraph(2),
                line("after", 1, 110.0, 122.0, 10.0, 200.0),
            ),
        ];
        let batch = assemble_batch(
            &lines,
            std::slice::from_ref(&table),
            std::slice::from_ref(&img),
            &plain_thresholds(),
            &Tuning::default(),
        );
        let table_at = batch.markdown.find("H\n---\nV").unwrap();
        let image_at = batch.markdown.find("![image 0](0)").unwrap();
        assert!(table_at < image_at);
        assert_eq!(batch.markdown.matches("![image 0](0)").count(), 1);
    }

    #[test]
    fn image_between_two_lines_referenced_once() {
        let img = PageImage {
            bbox: Rect::new(25.0, 10.0, 55.0, 200.0),
            page_number: 1,
            index: 3,
            data_uri: "data:image/png;base64,AAAA".into(),
        };
        let lines = vec![
            typed(
                LineKind::Paragraph(1),
                line("above", 1, 10.0, 20.0, 10.0, 200.0),
            ),
            typed(
                LineKind::Paragraph(2),
                line("below", 1, 60.0, 70.0, 10.0, 200.0),
            ),
        ];
        let batch = assemble_batch(
            &lines,
            &[],
            std::slice::from_ref(&img),
            &plain_thresholds(),
            &Tuning::default(),
        );
        assert_eq!(batch.markdown.matches("![image 3](3)").count(), 1);
        assert_eq!(batch.markdown, "above\n\n![image 3](3)\n\nbelow\n\n");
        assert_eq!(batch.images, vec!["data:image/png;base64,AAAA".to_string()]);
    }

    #[test]
    fn batch_without_lines_still_flushes_tables_and_images() {
        let table = Table {
            bbox: Rect::new(10.0, 10.0, 50.0, 200.0),
            page_number: 1,
            rows: vec![vec!["only".into()]],
        };
        let img = PageImage {
            bbox: Rect::new(60.0, 10.0, 90.0, 200.0),
            page_number: 1,
            index: 0,
            data_uri: "data:image/png;base64,BBBB".into(),
        };
        let batch = assemble_batch(
            &[],
            std::slice::from_ref(&table),
            std::slice::from_ref(&img),
            &plain_thresholds(),
            &Tuning::default(),
        );
        assert!(batch.markdown.contains("only"));
        assert!(batch.markdown.contains("![image 0](0)"));
        assert_eq!(batch.images.len(), 1);
    }

    #[test]
    fn trailing_narrow_page_final_line_separates() {
        let mut l = line("short", 1, 10.0, 20.0, 10.0, 50.0);
        l.gap_to_next = None;
        let lines = vec![
            typed(LineKind::Paragraph(1), l),
            typed(
                LineKind::Paragraph(1),
                line("next page", 2, 10.0, 20.0, 10.0, 200.0),
            ),
        ];
        let batch = assemble_batch(&lines, &[], &[], &plain_thresholds(), &Tuning::default());
        assert_eq!(batch.markdown, "short\n\nnext page\n\n");
    }
}
