//! Line rendering: highlight match spans and fit long lines to a width.

use std::ops::Range;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";
pub const ELLIPSIS: &str = "…";

/// Byte offset of the `n`th character, or the string length.
fn byte_at_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Visible byte window of `line` for a width of `width` characters.
///
/// Lines with a match keep up to `margin` characters on each side of the
/// first span, shrunk evenly to fit; others are cut at `width`.
fn visible_window(line: &str, spans: &[Range<usize>], width: usize, margin: usize) -> Range<usize> {
    let total = line.chars().count();
    if width == 0 || total <= width {
        return 0..line.len();
    }
    let Some(first) = spans.first() else {
        return 0..byte_at_char(line, width);
    };
    let start_c = line[..first.start].chars().count();
    let span_c = line[first.clone()].chars().count();
    let (lo_c, hi_c) = if span_c >= width {
        (start_c, start_c + width)
    } else {
        let m = margin.min((width - span_c) / 2);
        (start_c.saturating_sub(m), (start_c + span_c + m).min(total))
    };
    byte_at_char(line, lo_c)..byte_at_char(line, hi_c)
}

/// Render one line: wrap spans in highlight marks and, when the line is
/// wider than `width` characters, trim it with ellipses at cut ends.
pub fn render_line(line: &str, spans: &[Range<usize>], width: usize, margin: usize) -> String {
    let window = visible_window(line, spans, width, margin);
    let marks = spans.len() * (MARK_OPEN.len() + MARK_CLOSE.len());
    let mut out = String::with_capacity(window.len() + marks + 2 * ELLIPSIS.len());
    if window.start > 0 {
        out.push_str(ELLIPSIS);
    }
    let mut cursor = window.start;
    for span in spans {
        let start = span.start.max(window.start);
        let end = span.end.min(window.end);
        if start >= end {
            continue;
        }
        out.push_str(&line[cursor..start]);
        out.push_str(MARK_OPEN);
        out.push_str(&line[start..end]);
        out.push_str(MARK_CLOSE);
        cursor = end;
    }
    if cursor < window.end {
        out.push_str(&line[cursor..window.end]);
    }
    if window.end < line.len() {
        out.push_str(ELLIPSIS);
    }
    out
}
