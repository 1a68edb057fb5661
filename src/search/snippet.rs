//! Excerpts of highlighted page text.
//!
//! SQLite's `highlight()` returns the whole page with matched tokens wrapped
//! in delimiters. Pages run to thousands of characters, so the result is cut
//! to a window centred on the first match before it reaches the caller.
//!
//! `highlight()` is given private-use code points, which page text never
//! carries, so a literal `>>>` in a page cannot open a phantom highlight.
//! The excerpt re-emits highlights as [`MATCH_START`]/[`MATCH_END`].

/// Delimiters handed to `highlight()`.
pub const HIGHLIGHT_OPEN: &str = "\u{E000}";
pub const HIGHLIGHT_CLOSE: &str = "\u{E001}";

/// Delimiters of highlights in rendered excerpts.
pub const MATCH_START: &str = ">>>";
pub const MATCH_END: &str = "<<<";
pub const ELLIPSIS: &str = "...";

/// Characters of page text kept around the first match.
pub const DEFAULT_WINDOW: usize = 400;

/// Cut `marked` (text containing [`HIGHLIGHT_OPEN`]/[`HIGHLIGHT_CLOSE`]
/// pairs) to at most `window` characters of text, centred on the first
/// match. Highlights come out as [`MATCH_START`]/[`MATCH_END`].
///
/// Whitespace is collapsed first. Highlights that straddle a cut are closed
/// or reopened at the edge so the delimiters stay balanced. Cuts land on
/// char boundaries.
#[must_use]
pub fn excerpt(marked: &str, window: usize) -> String {
    let normalized = marked.split_whitespace().collect::<Vec<_>>().join(" ");
    let (chars, spans) = strip_markers(&normalized);

    if chars.len() <= window {
        return render(&chars, &spans, 0, chars.len());
    }

    let anchor = spans.first().map_or(0, |&(start, _)| start);
    let mut start = anchor.saturating_sub(window / 2);
    let end = (start + window).min(chars.len());
    start = end.saturating_sub(window);

    let mut out = String::with_capacity(window + 2 * ELLIPSIS.len());
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&render(&chars, &spans, start, end));
    if end < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Split marked text into plain characters plus highlighted `[start, end)`
/// char ranges. An unterminated highlight runs to the end of the text.
fn strip_markers(marked: &str) -> (Vec<char>, Vec<(usize, usize)>) {
    let mut chars = Vec::with_capacity(marked.len());
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut rest = marked;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(HIGHLIGHT_OPEN) {
            if open.is_none() {
                open = Some(chars.len());
            }
            rest = after;
        } else if let Some(after) = rest.strip_prefix(HIGHLIGHT_CLOSE) {
            if let Some(start) = open.take() {
                spans.push((start, chars.len()));
            }
            rest = after;
        } else {
            let mut iter = rest.chars();
            if let Some(ch) = iter.next() {
                chars.push(ch);
            }
            rest = iter.as_str();
        }
    }
    if let Some(start) = open {
        spans.push((start, chars.len()));
    }
    spans.retain(|(start, end)| start < end);
    (chars, spans)
}

fn render(chars: &[char], spans: &[(usize, usize)], start: usize, end: usize) -> String {
    let mut out = String::new();
    let mut cursor = start;
    for &(span_start, span_end) in spans {
        if span_end <= start || span_start >= end {
            continue;
        }
        let open_at = span_start.max(start);
        let close_at = span_end.min(end);
        out.extend(&chars[cursor..open_at]);
        out.push_str(MATCH_START);
        out.extend(&chars[open_at..close_at]);
        out.push_str(MATCH_END);
        cursor = close_at;
    }
    out.extend(&chars[cursor..end]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(word: &str) -> String {
        format!("{HIGHLIGHT_OPEN}{word}{HIGHLIGHT_CLOSE}")
    }

    fn plain_len(s: &str) -> usize {
        s.replace(MATCH_START, "")
            .replace(MATCH_END, "")
            .chars()
            .count()
    }

    #[test]
    fn test_short_text_kept_whole() {
        let marked = format!("the   {} of\nclass", mark("habitus"));
        assert_eq!(excerpt(&marked, 400), "the >>>habitus<<< of class");
    }

    #[test]
    fn test_window_centres_on_first_match() {
        let before = "a ".repeat(300);
        let after = " b".repeat(300);
        let marked = format!("{before}{}{after}", mark("field"));
        let out = excerpt(&marked, 100);

        assert!(out.starts_with(ELLIPSIS));
        assert!(out.ends_with(ELLIPSIS));
        assert!(out.contains(">>>field<<<"));
        assert_eq!(plain_len(&out), 100 + 2 * ELLIPSIS.len());
    }

    #[test]
    fn test_match_at_start_has_no_leading_ellipsis() {
        let marked = format!("{} {}", mark("capital"), "x ".repeat(500));
        let out = excerpt(&marked, 50);
        assert!(out.starts_with(">>>capital<<<"));
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_no_match_takes_leading_window() {
        let marked = "word ".repeat(200);
        let out = excerpt(&marked, 20);
        assert!(!out.starts_with(ELLIPSIS));
        assert_eq!(plain_len(&out), 20 + ELLIPSIS.len());
    }

    #[test]
    fn test_straddling_highlight_stays_balanced() {
        let marked = format!("{}{}", "a".repeat(10), mark(&"b".repeat(100)));
        let out = excerpt(&marked, 20);
        assert_eq!(out.matches(MATCH_START).count(), out.matches(MATCH_END).count());
    }

    #[test]
    fn test_multibyte_text_is_char_safe() {
        let marked = format!("{}{}{}", "é ".repeat(300), mark("Ökonomie"), " ß".repeat(300));
        let out = excerpt(&marked, 61);
        assert!(out.contains(">>>Ökonomie<<<"));
        assert!(plain_len(&out) <= 61 + 2 * ELLIPSIS.len());
    }

    #[test]
    fn test_literal_arrows_in_page_text_are_plain() {
        let marked = format!("see >>> the arrow, then {} <<< done", mark("target"));
        let out = excerpt(&marked, 400);
        assert_eq!(out, "see >>> the arrow, then >>>target<<< <<< done");

        let (chars, spans) = strip_markers(&marked);
        assert_eq!(spans.len(), 1);
        let (start, end) = spans[0];
        assert_eq!(chars[start..end].iter().collect::<String>(), "target");
    }
}
