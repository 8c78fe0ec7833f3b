//! Column and page breaking for flowing text.
//!
//! Widths are estimated, not measured: a glyph is taken to be `0.55` of the
//! font size wide.

use crate::template::{FlowTextElement, Repeat, Style};

const DEFAULT_FONT_SIZE: f64 = 11.0;
const DEFAULT_GAP: f64 = 12.0;
const CHAR_WIDTH_RATIO: f64 = 0.55;

/// Wrapped text split into pages of column strings.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowPages {
    /// `pages[p][c]` is the newline-joined text of column `c` on flow page `p`.
    pub pages: Vec<Vec<String>>,
    pub line_height: f64,
    pub column_width: f64,
    pub flow_height: f64,
    pub gap: f64,
    pub columns: usize,
    pub repeat: Repeat,
}

impl FlowPages {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Document pages needed to show every flow page under the repeat policy.
    pub fn document_pages(&self) -> usize {
        let n = self.pages.len();
        match self.repeat {
            Repeat::All => n,
            Repeat::First | Repeat::Unknown => 1,
            Repeat::AfterFirst | Repeat::Last => n + 1,
            Repeat::Middle => n + 2,
        }
    }

    /// Flow page shown on document page `page` of `page_count`, if any.
    ///
    /// Under `all`, a single flow page repeats on every document page.
    pub fn index_for(&self, page: usize, page_count: usize) -> Option<usize> {
        let n = self.pages.len();
        let index = match self.repeat {
            Repeat::All if n == 1 => Some(0),
            Repeat::All => Some(page),
            Repeat::First | Repeat::Unknown => (page == 0).then_some(0),
            Repeat::AfterFirst => page.checked_sub(1),
            Repeat::Middle => (page > 0 && page + 1 < page_count).then(|| page - 1),
            Repeat::Last => (page + 1 == page_count).then(|| n.saturating_sub(1)),
        };
        index.filter(|i| *i < n)
    }

    /// Columns for document page `page`, or `None` when nothing flows there.
    pub fn columns_on(&self, page: usize, page_count: usize) -> Option<&[String]> {
        self.index_for(page, page_count)
            .map(|i| self.pages[i].as_slice())
            .filter(|cols| !cols.is_empty())
    }

    /// Left edge of column `idx`, relative to the element.
    pub fn column_offset(&self, idx: usize) -> f64 {
        idx as f64 * (self.column_width + self.gap)
    }
}

/// Byte ranges of paragraphs separated by a blank line (`\n`, optional
/// whitespace, `\n`).
fn paragraphs(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        let (pos, c) = chars[i];
        if c == '\n' {
            let mut j = i + 1;
            let mut last_newline = None;
            while j < chars.len() && chars[j].1.is_whitespace() {
                if chars[j].1 == '\n' {
                    last_newline = Some(j);
                }
                j += 1;
            }
            if let Some(end) = last_newline {
                out.push(&text[start..pos]);
                let (end_pos, _) = chars[end];
                start = end_pos + 1;
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    out.push(&text[start..]);
    out
}

/// Greedy word wrap to `max_chars` per line.
///
/// Blank lines separate paragraphs in the output; a word longer than the
/// budget that starts a line is hard-split.
pub fn wrap_text(text: &str, max_chars: f64) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let limit = if max_chars.is_finite() && max_chars >= 1.0 {
        max_chars.floor() as usize
    } else {
        1
    };

    let paras = paragraphs(text);
    let mut lines = Vec::new();
    for (p_index, para) in paras.iter().enumerate() {
        let mut line = String::new();
        let mut line_len = 0usize;
        for word in para.split_whitespace() {
            let word_len = word.chars().count();
            if line.is_empty() {
                if word_len > limit {
                    let chars: Vec<char> = word.chars().collect();
                    for chunk in chars.chunks(limit) {
                        lines.push(chunk.iter().collect());
                    }
                } else {
                    line.push_str(word);
                    line_len = word_len;
                }
                continue;
            }
            if line_len + word_len + 1 <= limit {
                line.push(' ');
                line.push_str(word);
                line_len += word_len + 1;
            } else {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
                line_len = word_len;
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        if p_index + 1 < paras.len() {
            lines.push(String::new());
        }
    }
    lines
}

/// Break a flow element's resolved text into pages.
///
/// `text` is the element text after substitution; `default_text` is the
/// template's base text style.
pub fn paginate_flow(
    el: &FlowTextElement,
    text: &str,
    default_text: Option<&Style>,
    body_width: f64,
    body_height: f64,
) -> FlowPages {
    let style = Style::layered(default_text, el.base.style.as_ref());
    let font_size = style.size.filter(|s| *s > 0.0).unwrap_or(DEFAULT_FONT_SIZE);
    let line_height = style
        .line_height
        .filter(|h| *h > 0.0)
        .unwrap_or_else(|| (font_size * 1.2).round());
    let columns = el.columns.filter(|c| *c > 0).unwrap_or(1) as usize;
    let gap = el.gap.filter(|g| *g > 0.0).unwrap_or(DEFAULT_GAP);
    let flow_width = if el.base.w > 0.0 { el.base.w } else { body_width - el.base.x };
    let flow_height = if el.base.h > 0.0 { el.base.h } else { body_height - el.base.y };
    let column_width = if columns > 1 {
        (flow_width - gap * (columns - 1) as f64) / columns as f64
    } else {
        flow_width
    };

    let lines = wrap_text(text, column_width / (font_size * CHAR_WIDTH_RATIO));
    let per_column = ((flow_height / line_height).floor().max(1.0)) as usize;
    let per_page = per_column * columns;

    let mut pages: Vec<Vec<String>> = lines
        .chunks(per_page)
        .map(|chunk| {
            (0..columns)
                .map(|c| {
                    let start = (c * per_column).min(chunk.len());
                    let end = (start + per_column).min(chunk.len());
                    chunk[start..end].join("\n")
                })
                .collect()
        })
        .collect();
    if pages.is_empty() {
        pages.push(vec![String::new()]);
    }

    tracing::debug!(
        flow = %el.base.id,
        lines = lines.len(),
        pages = pages.len(),
        per_column,
        "flow text paginated"
    );

    FlowPages {
        pages,
        line_height,
        column_width,
        flow_height,
        gap,
        columns,
        repeat: el.base.repeat.unwrap_or(Repeat::All),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ElementBase;
    use pretty_assertions::assert_eq;

    fn flow(w: f64, h: f64, repeat: Option<Repeat>) -> FlowTextElement {
        FlowTextElement {
            base: ElementBase {
                id: "story".into(),
                w,
                h,
                repeat,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_wrap_words() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10.0),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert!(wrap_text("", 10.0).is_empty());
    }

    #[test]
    fn test_wrap_paragraphs_and_whitespace() {
        assert_eq!(
            wrap_text("one   two\nthree\n\n  \n four", 20.0),
            vec!["one two three", "", "four"]
        );
    }

    #[test]
    fn test_wrap_hard_splits_long_first_word() {
        assert_eq!(wrap_text("abcdefghij xy", 4.0), vec!["abcd", "efgh", "ij", "xy"]);
        // a long word after other words moves to its own line first
        assert_eq!(wrap_text("ab abcdefgh", 4.0), vec!["ab", "abcdefgh"]);
    }

    #[test]
    fn test_line_metrics_from_style() {
        let el = flow(110.0, 100.0, None);
        let pages = paginate_flow(&el, "a", None, 500.0, 700.0);
        assert_eq!(pages.line_height, 13.0);
        assert_eq!(pages.columns, 1);
        assert_eq!(pages.repeat, Repeat::All);

        let base = Style { size: Some(10.0), line_height: Some(20.0), ..Default::default() };
        let pages = paginate_flow(&el, "a", Some(&base), 500.0, 700.0);
        assert_eq!(pages.line_height, 20.0);
    }

    #[test]
    fn test_columns_fill_in_order() {
        let mut el = flow(212.0, 26.0, None);
        el.columns = Some(2);
        el.gap = Some(12.0);
        // column width 100, 11pt font: 16 chars per line, 2 lines per column
        let text = (1..=6).map(|i| format!("word{:02}", i)).collect::<Vec<_>>().join(" ");
        let pages = paginate_flow(&el, &text, None, 500.0, 700.0);
        assert_eq!(pages.column_width, 100.0);
        assert_eq!(
            pages.pages,
            vec![vec!["word01 word02\nword03 word04".to_string(), "word05 word06".to_string()]]
        );
        assert_eq!(pages.column_offset(1), 112.0);
    }

    #[test]
    fn test_empty_text_gives_one_page() {
        let pages = paginate_flow(&flow(100.0, 100.0, None), "", None, 500.0, 700.0);
        assert_eq!(pages.pages, vec![vec![String::new()]]);
        assert_eq!(pages.document_pages(), 1);
    }

    #[test]
    fn test_after_first_shifts_by_one_page() {
        // one line per page, three lines of text
        let el = flow(1000.0, 13.0, Some(Repeat::AfterFirst));
        let pages = paginate_flow(&el, "a\n\nb", None, 1000.0, 700.0);
        assert_eq!(pages.page_count(), 3);
        assert_eq!(pages.document_pages(), 4);
        assert_eq!(pages.index_for(0, 4), None);
        assert_eq!(pages.index_for(1, 4), Some(0));
        assert_eq!(pages.index_for(3, 4), Some(2));
    }

    #[test]
    fn test_repeat_mappings() {
        let mut pages = paginate_flow(&flow(1000.0, 13.0, None), "a\n\nb", None, 1000.0, 700.0);
        assert_eq!(pages.index_for(2, 3), Some(2));
        assert_eq!(pages.index_for(3, 4), None);

        pages.repeat = Repeat::First;
        assert_eq!(pages.document_pages(), 1);
        assert_eq!(pages.index_for(0, 3), Some(0));
        assert_eq!(pages.index_for(1, 3), None);

        pages.repeat = Repeat::Middle;
        assert_eq!(pages.document_pages(), 5);
        assert_eq!(pages.index_for(0, 5), None);
        assert_eq!(pages.index_for(1, 5), Some(0));
        assert_eq!(pages.index_for(4, 5), None);

        pages.repeat = Repeat::Last;
        assert_eq!(pages.document_pages(), 4);
        assert_eq!(pages.index_for(3, 4), Some(2));
        assert_eq!(pages.index_for(2, 4), None);

        pages.repeat = Repeat::Unknown;
        assert_eq!(pages.document_pages(), 1);
        assert_eq!(pages.index_for(1, 3), None);
    }

    #[test]
    fn test_all_repeats_single_page_everywhere() {
        let pages = paginate_flow(&flow(1000.0, 100.0, None), "short paragraph", None, 1000.0, 700.0);
        assert_eq!(pages.page_count(), 1);
        assert_eq!(pages.document_pages(), 1);
        for page in 0..3 {
            assert_eq!(pages.index_for(page, 3), Some(0));
        }
        assert_eq!(pages.columns_on(2, 3), Some(&["short paragraph".to_string()][..]));
    }
}
