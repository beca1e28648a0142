//! Turning interpreted page content into positioned words and ruling lines.
//!
//! Output coordinates are top-left based: y grows down the page, matching
//! what the header pipeline expects.

use tabhead_core::{DrawnLine, PageLayout, PositionedWord};
use unicode_normalization::UnicodeNormalization;

use crate::parser::content::{PageContent, Segment, TextSpan};

/// Normalise extracted glyph text.
///
/// NFKC folds ligatures and compatibility forms; replacement and control
/// characters are dropped.
pub fn clean_text(text: &str) -> String {
    text.nfkc()
        .filter(|c| *c != '\u{FFFD}' && (!c.is_control() || c.is_whitespace()))
        .collect()
}

/// Split a span on whitespace, sharing its width out by character count.
pub fn span_words(span: &TextSpan, page_height: f32, page: usize) -> Vec<PositionedWord> {
    let text = clean_text(&span.text);
    let total = text.chars().count();
    if total == 0 {
        return Vec::new();
    }
    let per_char = span.width / total as f32;
    let y0 = page_height - span.baseline - span.font_size;
    let y1 = y0 + span.font_size;

    let mut words = Vec::new();
    let mut offset = 0usize;
    let mut current = String::new();
    let mut start = 0usize;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push(make_word(&current, span.x, per_char, start, y0, y1, span, page));
                current.clear();
            }
        } else {
            if current.is_empty() {
                start = offset;
            }
            current.push(ch);
        }
        offset += 1;
    }
    if !current.is_empty() {
        words.push(make_word(&current, span.x, per_char, start, y0, y1, span, page));
    }
    words
}

#[allow(clippy::too_many_arguments)]
fn make_word(
    text: &str,
    origin: f32,
    per_char: f32,
    start: usize,
    y0: f32,
    y1: f32,
    span: &TextSpan,
    page: usize,
) -> PositionedWord {
    let x0 = origin + per_char * start as f32;
    let x1 = x0 + per_char * text.chars().count() as f32;
    PositionedWord::new(text, x0, y0, x1, y1)
        .with_font_size(span.font_size)
        .on_page(page)
}

/// Flip a user-space segment into top-left coordinates.
pub fn segment_line(segment: &Segment, page_height: f32) -> DrawnLine {
    DrawnLine::new(
        segment.x0,
        page_height - segment.y0,
        segment.x1,
        page_height - segment.y1,
    )
}

/// Assemble one page of layout from interpreted content.
pub fn page_layout(index: usize, width: f32, height: f32, content: &PageContent) -> PageLayout {
    let words = content
        .spans
        .iter()
        .flat_map(|span| span_words(span, height, index))
        .collect();
    let lines = content
        .segments
        .iter()
        .map(|segment| segment_line(segment, height))
        .collect();
    PageLayout {
        index,
        width,
        height,
        words,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, baseline: f32, width: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            x,
            baseline,
            width,
            font_size: 10.0,
        }
    }

    #[test]
    fn test_clean_text_folds_ligatures() {
        assert_eq!(clean_text("\u{FB01}nal"), "final");
        assert_eq!(clean_text("Qty\u{FFFD}"), "Qty");
        assert_eq!(clean_text("Ra\u{0007}te"), "Rate");
    }

    #[test]
    fn test_span_words_split_and_flip() {
        let words = span_words(&span("Batch No", 100.0, 700.0, 80.0), 842.0, 2);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Batch");
        assert!((words[0].x0 - 100.0).abs() < 0.01);
        assert!((words[0].x1 - 150.0).abs() < 0.01);
        assert_eq!(words[1].text, "No");
        assert!((words[1].x0 - 160.0).abs() < 0.01);
        assert!((words[1].x1 - 180.0).abs() < 0.01);
        assert!((words[0].y0 - 132.0).abs() < 0.01);
        assert!((words[0].y1 - 142.0).abs() < 0.01);
        assert_eq!(words[0].page, 2);
        assert_eq!(words[0].font_size, 10.0);
    }

    #[test]
    fn test_span_words_collapse_repeated_spaces() {
        let words = span_words(&span("Qty   Rate", 0.0, 700.0, 100.0), 842.0, 0);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Qty", "Rate"]);
        assert!((words[1].x0 - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_span_has_no_words() {
        assert!(span_words(&span("\u{FFFD}", 0.0, 0.0, 5.0), 842.0, 0).is_empty());
    }

    #[test]
    fn test_segment_is_flipped() {
        let line = segment_line(
            &Segment {
                x0: 30.0,
                y0: 700.0,
                x1: 560.0,
                y1: 700.0,
            },
            842.0,
        );
        assert_eq!(line, DrawnLine::new(30.0, 142.0, 560.0, 142.0));
        assert!(line.is_horizontal());
    }

    #[test]
    fn test_page_layout_collects_words_and_lines() {
        let content = PageContent {
            spans: vec![span("Product Pack", 30.0, 760.0, 120.0)],
            segments: vec![Segment {
                x0: 30.0,
                y0: 748.0,
                x1: 560.0,
                y1: 748.0,
            }],
        };
        let layout = page_layout(0, 595.0, 842.0, &content);
        assert_eq!(layout.words.len(), 2);
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.height, 842.0);
    }
}
