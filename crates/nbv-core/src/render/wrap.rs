//! Width-aware wrapping of styled spans.
//!
//! Prose wraps at word boundaries; code spans preserve whitespace and
//! break by character. Hanging indents carry list bullets on the first
//! line and alignment spaces on continuations. Styles and hyperlink
//! targets survive line breaks.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::block::{Style, StyledLine, StyledSpan};

/// Options for wrapping styled spans with hanging indents.
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    /// Maximum display width for lines.
    pub width: usize,
    /// Prefix spans for the first line (e.g., "• " for a list bullet).
    pub first_prefix: Vec<StyledSpan>,
    /// Prefix spans for continuation lines.
    pub rest_prefix: Vec<StyledSpan>,
}

impl WrapOptions {
    pub fn new(width: usize) -> Self {
        WrapOptions {
            width,
            first_prefix: vec![],
            rest_prefix: vec![],
        }
    }
}

fn spans_width(spans: &[StyledSpan]) -> usize {
    spans.iter().map(StyledSpan::width).sum()
}

struct Wrapper<'a> {
    lines: Vec<StyledLine>,
    current: Vec<StyledSpan>,
    current_width: usize,
    first_line: bool,
    first_width: usize,
    rest_width: usize,
    first_prefix: &'a [StyledSpan],
    rest_prefix: &'a [StyledSpan],
}

impl<'a> Wrapper<'a> {
    fn new(opts: &'a WrapOptions) -> Self {
        let first_width = opts.width.saturating_sub(spans_width(&opts.first_prefix));
        let rest_width = opts.width.saturating_sub(spans_width(&opts.rest_prefix));
        Wrapper {
            lines: Vec::new(),
            current: Vec::new(),
            current_width: 0,
            first_line: true,
            first_width,
            rest_width,
            first_prefix: &opts.first_prefix,
            rest_prefix: &opts.rest_prefix,
        }
    }

    fn available(&self) -> usize {
        if self.first_line {
            self.first_width
        } else {
            self.rest_width
        }
    }

    fn flush(&mut self) {
        let prefix = if self.first_line {
            self.first_prefix.to_vec()
        } else {
            self.rest_prefix.to_vec()
        };
        let mut spans = prefix;
        spans.append(&mut self.current);
        self.lines.push(StyledLine { spans });
        self.first_line = false;
        self.current_width = 0;
    }

    fn push(&mut self, span: StyledSpan) {
        self.current_width += span.width();
        self.current.push(span);
    }

    fn push_space(&mut self, style: Style) {
        if !self.current.is_empty() && self.current_width < self.available() {
            self.push(StyledSpan::new(" ", style));
        }
    }

    /// A word or code fragment that may itself exceed the line width.
    fn push_breakable(&mut self, span: &StyledSpan) {
        let span_width = span.width();
        if self.current_width + span_width <= self.available() {
            self.push(span.clone());
            return;
        }
        if span_width <= self.rest_width && self.current_width > 0 {
            self.flush();
            self.push(span.clone());
            return;
        }
        // Too wide for any line on its own; break by character.
        if self.current_width > 0 && self.current_width >= self.available() {
            self.flush();
        }
        let mut fragment = String::new();
        let mut fragment_width = 0;
        for ch in span.text.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if fragment_width + ch_width > self.available().saturating_sub(self.current_width)
                && !(fragment.is_empty() && self.current_width == 0)
            {
                if !fragment.is_empty() {
                    let piece = StyledSpan {
                        text: std::mem::take(&mut fragment),
                        style: span.style,
                        link: span.link.clone(),
                    };
                    self.push(piece);
                    fragment_width = 0;
                }
                self.flush();
            }
            fragment.push(ch);
            fragment_width += ch_width;
        }
        if !fragment.is_empty() {
            let piece = StyledSpan {
                text: fragment,
                style: span.style,
                link: span.link.clone(),
            };
            self.push(piece);
        }
    }

    fn process_text(&mut self, span: &StyledSpan) {
        let leading_space = span.text.starts_with(char::is_whitespace);
        let trailing_space = span.text.ends_with(char::is_whitespace);
        let words: Vec<&str> = span.text.split_whitespace().collect();

        if words.is_empty() {
            self.push_space(span.style);
            return;
        }
        if leading_space {
            self.push_space(span.style);
        }
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                if self.current_width + 1 + word.width() <= self.available() {
                    self.push(StyledSpan::new(" ", span.style));
                } else {
                    self.flush();
                }
            }
            let word_span = StyledSpan {
                text: (*word).to_string(),
                style: span.style,
                link: span.link.clone(),
            };
            self.push_breakable(&word_span);
        }
        if trailing_space {
            self.push_space(span.style);
        }
    }

    fn process(&mut self, span: &StyledSpan) {
        // Hard breaks embedded in the span text.
        if span.text.contains('\n') {
            for (i, part) in span.text.split('\n').enumerate() {
                if i > 0 {
                    self.flush();
                }
                if !part.is_empty() {
                    let part_span = StyledSpan {
                        text: part.to_string(),
                        style: span.style,
                        link: span.link.clone(),
                    };
                    self.process(&part_span);
                }
            }
            return;
        }
        if matches!(span.style, Style::CodeInline | Style::CodeBlock) {
            // Code preserves whitespace exactly.
            self.push_breakable(span);
        } else {
            self.process_text(span);
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if !self.current.is_empty() {
            self.flush();
        }
        if self.lines.is_empty() {
            self.lines.push(StyledLine {
                spans: self.first_prefix.to_vec(),
            });
        }
        self.lines
    }
}

/// Wraps styled spans into lines of at most `opts.width` columns.
pub fn wrap_styled_spans(spans: &[StyledSpan], opts: &WrapOptions) -> Vec<StyledLine> {
    if opts.width == 0 || spans.is_empty() {
        let mut all = opts.first_prefix.clone();
        all.extend(spans.iter().cloned());
        return vec![StyledLine { spans: all }];
    }
    let mut wrapper = Wrapper::new(opts);
    for span in spans {
        wrapper.process(span);
    }
    wrapper.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &StyledLine) -> String {
        line.spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_short_text_stays_on_one_line() {
        let spans = vec![StyledSpan::plain("hello world")];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(lines.len(), 1);
        assert_eq!(text_of(&lines[0]), "hello world");
    }

    #[test]
    fn test_wraps_at_word_boundary() {
        let spans = vec![StyledSpan::plain("hello world")];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(8));
        assert_eq!(lines.len(), 2);
        assert_eq!(text_of(&lines[0]), "hello");
        assert_eq!(text_of(&lines[1]), "world");
    }

    #[test]
    fn test_style_preserved_across_break() {
        let spans = vec![
            StyledSpan::plain("hello "),
            StyledSpan::new("world", Style::Strong),
        ];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(8));
        assert_eq!(lines.len(), 2);
        assert!(lines[1].spans.iter().any(|s| s.style == Style::Strong));
    }

    #[test]
    fn test_link_survives_character_break() {
        let spans = vec![StyledSpan::new("averylongword", Style::Link)
            .with_link("https://example.com")];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(5));
        assert!(lines.len() > 1);
        for line in &lines {
            for span in &line.spans {
                assert_eq!(span.link.as_deref(), Some("https://example.com"));
            }
        }
    }

    #[test]
    fn test_inline_code_preserves_double_space() {
        let spans = vec![StyledSpan::new("foo  bar", Style::CodeInline)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(text_of(&lines[0]), "foo  bar");
    }

    #[test]
    fn test_hanging_indent() {
        let opts = WrapOptions {
            width: 12,
            first_prefix: vec![StyledSpan::new("• ", Style::ListBullet)],
            rest_prefix: vec![StyledSpan::plain("  ")],
        };
        let spans = vec![StyledSpan::plain("one two three four")];
        let lines = wrap_styled_spans(&spans, &opts);
        assert!(lines.len() > 1);
        assert_eq!(lines[0].spans[0].text, "• ");
        assert_eq!(lines[1].spans[0].text, "  ");
    }

    #[test]
    fn test_hard_break() {
        let spans = vec![StyledSpan::plain("line1\nline2")];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_zero_width_degenerates_to_single_line() {
        let spans = vec![StyledSpan::plain("anything")];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(0));
        assert_eq!(lines.len(), 1);
    }
}
