//! Styled block model.
//!
//! Terminal-agnostic spans and lines; semantic styles are translated to
//! concrete colors by the writer, so the renderers stay free of terminal
//! dependencies.

use unicode_width::UnicodeWidthStr;

/// A 24-bit color carried by highlighter and image spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// Semantic style identifiers, plus a direct-color escape hatch for
/// syntax highlighting and image glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// No styling.
    Plain,
    /// Execution-count gutter labels ("[3]:").
    Execution,
    /// Cell box borders.
    CellBorder,
    /// Emphasized text (*italic*).
    Emphasis,
    /// Strong text (**bold**).
    Strong,
    /// Inline code (`code`).
    CodeInline,
    /// Fenced code block content.
    CodeBlock,
    /// Code fence markers.
    CodeFence,
    /// Heading level 1.
    H1,
    /// Heading level 2.
    H2,
    /// Heading level 3+.
    H3,
    /// Link text.
    Link,
    /// Blockquote content.
    BlockQuote,
    /// List bullet marker.
    ListBullet,
    /// List number marker.
    ListNumber,
    /// stderr stream content.
    Stderr,
    /// Fallback text standing in for an image.
    Fallback,
    /// Dim hint text ("Click to view ...", printed paths).
    Hint,
    /// Direct colors from the highlighter or the image drawer.
    Colored { fg: Option<Rgb>, bg: Option<Rgb> },
}

/// A styled span of text with an optional hyperlink target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
    pub link: Option<String>,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        StyledSpan {
            text: text.into(),
            style,
            link: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::Plain)
    }

    pub fn with_link(mut self, target: impl Into<String>) -> Self {
        self.link = Some(target.into());
        self
    }

    pub fn width(&self) -> usize {
        self.text.width()
    }
}

/// A line of styled spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn empty() -> Self {
        StyledLine { spans: vec![] }
    }

    pub fn from_span(span: StyledSpan) -> Self {
        StyledLine { spans: vec![span] }
    }

    pub fn width(&self) -> usize {
        self.spans.iter().map(StyledSpan::width).sum()
    }
}

/// An opaque styled unit of terminal output; the final artifact is an
/// ordered sequence of these, streamed in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBlock {
    pub lines: Vec<StyledLine>,
}

impl RenderedBlock {
    /// The explicit empty block standing in for "no renderable output".
    pub fn empty() -> Self {
        RenderedBlock { lines: vec![] }
    }

    pub fn from_lines(lines: Vec<StyledLine>) -> Self {
        RenderedBlock { lines }
    }

    /// One line per newline-separated segment, all in the given style.
    pub fn from_text(text: &str, style: Style) -> Self {
        let lines = text
            .lines()
            .map(|line| StyledLine::from_span(StyledSpan::new(line, style)))
            .collect();
        RenderedBlock { lines }
    }

    /// Height in terminal rows.
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Wraps lines in a rounded box spanning `width` columns. Content wider
/// than the interior is truncated by the caller; here it is padded so the
/// right border stays aligned.
pub fn boxed(lines: Vec<StyledLine>, width: usize) -> Vec<StyledLine> {
    let width = width.max(4);
    let interior = width - 4;
    let horizontal = "─".repeat(width - 2);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(StyledLine::from_span(StyledSpan::new(
        format!("╭{horizontal}╮"),
        Style::CellBorder,
    )));
    for line in lines {
        let pad = interior.saturating_sub(line.width());
        let mut spans = vec![StyledSpan::new("│ ", Style::CellBorder)];
        spans.extend(line.spans);
        spans.push(StyledSpan::plain(" ".repeat(pad)));
        spans.push(StyledSpan::new(" │", Style::CellBorder));
        out.push(StyledLine { spans });
    }
    out.push(StyledLine::from_span(StyledSpan::new(
        format!("╰{horizontal}╯"),
        Style::CellBorder,
    )));
    out
}

/// Prefixes every line of a block with `prefix` (gutter spacing / output
/// padding). Empty lines stay empty so plain output carries no trailing
/// whitespace.
pub fn indent(block: RenderedBlock, prefix: &str) -> RenderedBlock {
    if prefix.is_empty() {
        return block;
    }
    let lines = block
        .lines
        .into_iter()
        .map(|line| {
            if line.spans.is_empty() {
                line
            } else {
                let mut spans = vec![StyledSpan::plain(prefix)];
                spans.extend(line.spans);
                StyledLine { spans }
            }
        })
        .collect();
    RenderedBlock { lines }
}

/// Truncates a line to `width` display columns, span structure preserved.
pub fn truncate_line(line: StyledLine, width: usize) -> StyledLine {
    if line.width() <= width {
        return line;
    }
    let mut remaining = width;
    let mut spans = Vec::new();
    for span in line.spans {
        if remaining == 0 {
            break;
        }
        let span_width = span.width();
        if span_width <= remaining {
            remaining -= span_width;
            spans.push(span);
        } else {
            let mut taken = String::new();
            let mut used = 0;
            for ch in span.text.chars() {
                let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
                if used + w > remaining {
                    break;
                }
                taken.push(ch);
                used += w;
            }
            spans.push(StyledSpan {
                text: taken,
                style: span.style,
                link: span.link,
            });
            remaining = 0;
        }
    }
    StyledLine { spans }
}
