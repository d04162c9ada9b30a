//! Markdown rendering.
//!
//! Parses with pulldown-cmark and converts events to styled lines:
//! headings, emphasis, inline and fenced code (fenced blocks are
//! re-highlighted), lists with hanging indents, blockquotes, rules, and
//! tables. Link targets respect the hyperlink capability: enabled, the
//! span carries an OSC 8 target; disabled, the target is appended as
//! visible bracketed text.

use comfy_table::{ContentArrangement, Table};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use unicode_width::UnicodeWidthStr;

use super::block::{Style, StyledLine, StyledSpan};
use super::code::Highlighter;
use super::wrap::{WrapOptions, wrap_styled_spans};
use crate::capability::CapabilityDecision;

/// Renders markdown text into styled lines at the given width.
pub fn render_markdown(
    text: &str,
    width: usize,
    decision: &CapabilityDecision,
    highlighter: &Highlighter,
) -> Vec<StyledLine> {
    if text.is_empty() {
        return vec![StyledLine::empty()];
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_MATH);
    let parser = Parser::new_ext(text, options);

    let mut renderer = MarkdownRenderer::new(width, decision, highlighter);
    for event in parser {
        renderer.process_event(event);
    }
    renderer.finish()
}

/// Buffered table content rendered through comfy-table.
#[derive(Debug, Clone, Default)]
struct TableBuffer {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
}

impl TableBuffer {
    fn push_text(&mut self, text: &str) {
        self.current_cell.push_str(text);
    }

    fn finish_cell(&mut self) {
        self.current_row.push(std::mem::take(&mut self.current_cell));
    }

    fn finish_row(&mut self, is_header: bool) {
        let row = std::mem::take(&mut self.current_row);
        if is_header {
            self.header = row;
        } else {
            self.rows.push(row);
        }
    }

    fn render(&self, max_width: usize) -> Vec<String> {
        let mut table = Table::new();
        table.set_width(max_width as u16);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if !self.header.is_empty() {
            table.set_header(&self.header);
        }
        for row in &self.rows {
            table.add_row(row);
        }
        table.to_string().lines().map(String::from).collect()
    }
}

struct ListState {
    /// None for unordered, Some(n) for ordered starting at n.
    ordered: Option<u64>,
    current_item: u64,
}

struct MarkdownRenderer<'a> {
    width: usize,
    decision: &'a CapabilityDecision,
    highlighter: &'a Highlighter,
    lines: Vec<StyledLine>,
    current_spans: Vec<StyledSpan>,
    style_stack: Vec<Style>,
    /// Destination of the innermost open link or image.
    link_stack: Vec<String>,
    in_code_block: bool,
    code_block_lang: Option<String>,
    list_stack: Vec<ListState>,
    in_table: bool,
    table_buffer: TableBuffer,
}

impl<'a> MarkdownRenderer<'a> {
    fn new(width: usize, decision: &'a CapabilityDecision, highlighter: &'a Highlighter) -> Self {
        MarkdownRenderer {
            width,
            decision,
            highlighter,
            lines: Vec::new(),
            current_spans: Vec::new(),
            style_stack: vec![Style::Plain],
            link_stack: Vec::new(),
            in_code_block: false,
            code_block_lang: None,
            list_stack: Vec::new(),
            in_table: false,
            table_buffer: TableBuffer::default(),
        }
    }

    fn current_style(&self) -> Style {
        *self.style_stack.last().unwrap_or(&Style::Plain)
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.add_text(&text),
            Event::Code(code) => {
                if self.in_table {
                    self.table_buffer.push_text(&code);
                } else {
                    self.current_spans
                        .push(StyledSpan::new(code.to_string(), Style::CodeInline));
                }
            }
            Event::SoftBreak => self.add_text(" "),
            Event::HardBreak => self.add_text("\n"),
            Event::Rule => {
                self.flush_paragraph();
                self.lines.push(StyledLine::from_span(StyledSpan::plain(
                    "─".repeat(self.width.min(40)),
                )));
                self.lines.push(StyledLine::empty());
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.current_spans
                    .push(StyledSpan::new(marker, Style::ListBullet));
            }
            // Raw HTML is not interpreted; dropping it avoids leaking
            // markup (or escape sequences) into the terminal.
            Event::Html(_) | Event::InlineHtml(_) => {}
            Event::FootnoteReference(_) => {}
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                let unicode = super::latex::latex_to_unicode(&math);
                self.current_spans
                    .push(StyledSpan::new(unicode, Style::Emphasis));
            }
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                let style = match level {
                    HeadingLevel::H1 => Style::H1,
                    HeadingLevel::H2 => Style::H2,
                    _ => Style::H3,
                };
                self.style_stack.push(style);
                if level >= HeadingLevel::H2 {
                    let hashes = "#".repeat(level as usize);
                    self.current_spans
                        .push(StyledSpan::new(format!("{hashes} "), style));
                }
            }
            Tag::CodeBlock(kind) => {
                self.flush_paragraph();
                self.in_code_block = true;
                self.code_block_lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.style_stack.push(Style::CodeBlock);
            }
            Tag::List(start) => {
                self.flush_paragraph();
                self.list_stack.push(ListState {
                    ordered: start,
                    current_item: start.unwrap_or(1),
                });
            }
            Tag::Item => self.flush_paragraph(),
            Tag::BlockQuote(_) => {
                self.flush_paragraph();
                self.style_stack.push(Style::BlockQuote);
            }
            Tag::Emphasis => self.style_stack.push(Style::Emphasis),
            Tag::Strong => self.style_stack.push(Style::Strong),
            Tag::Strikethrough => self.style_stack.push(Style::Plain),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.link_stack.push(dest_url.to_string());
                self.style_stack.push(Style::Link);
            }
            Tag::Table(_) => {
                self.flush_paragraph();
                self.in_table = true;
                self.table_buffer = TableBuffer::default();
            }
            Tag::TableHead | Tag::TableRow | Tag::TableCell => {}
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_paragraph();
                if self.list_stack.is_empty() {
                    self.lines.push(StyledLine::empty());
                }
            }
            TagEnd::Heading(_) => {
                self.flush_paragraph();
                self.pop_style();
                self.lines.push(StyledLine::empty());
            }
            TagEnd::CodeBlock => {
                self.flush_code_block();
                self.in_code_block = false;
                self.pop_style();
                self.lines.push(StyledLine::empty());
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.lines.push(StyledLine::empty());
                }
            }
            TagEnd::Item => {
                self.flush_list_item();
                if let Some(list) = self.list_stack.last_mut() {
                    list.current_item += 1;
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_paragraph();
                self.pop_style();
                self.lines.push(StyledLine::empty());
            }
            TagEnd::Link | TagEnd::Image => {
                self.pop_style();
                if let Some(target) = self.link_stack.pop() {
                    if !self.decision.hyperlinks_enabled && !target.is_empty() {
                        self.current_spans
                            .push(StyledSpan::new(format!(" ({target})"), Style::Hint));
                    }
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Table => {
                self.flush_table();
                self.in_table = false;
                self.lines.push(StyledLine::empty());
            }
            TagEnd::TableHead => self.table_buffer.finish_row(true),
            TagEnd::TableRow => self.table_buffer.finish_row(false),
            TagEnd::TableCell => self.table_buffer.finish_cell(),
            _ => {}
        }
    }

    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.in_table {
            self.table_buffer.push_text(text);
            return;
        }
        let style = self.current_style();
        let mut span = StyledSpan::new(text.to_string(), style);
        if style == Style::Link && self.decision.hyperlinks_enabled {
            if let Some(target) = self.link_stack.last() {
                span.link = Some(target.clone());
            }
        }
        self.current_spans.push(span);
    }

    fn flush_paragraph(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);
        let wrapped = wrap_styled_spans(&spans, &WrapOptions::new(self.width));
        self.lines.extend(wrapped);
    }

    fn flush_code_block(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let full_text: String = std::mem::take(&mut self.current_spans)
            .iter()
            .map(|s| s.text.as_str())
            .collect();

        let fence = match &self.code_block_lang {
            Some(lang) => format!("```{lang}"),
            None => "```".to_string(),
        };
        self.lines
            .push(StyledLine::from_span(StyledSpan::new(fence, Style::CodeFence)));

        let grammar = self.code_block_lang.as_deref().unwrap_or("text");
        let highlighted = self
            .highlighter
            .highlight(full_text.trim_end_matches('\n'), grammar);
        for line in highlighted {
            let mut spans = vec![StyledSpan::plain("  ")];
            spans.extend(line.spans);
            self.lines.push(StyledLine { spans });
        }

        self.lines
            .push(StyledLine::from_span(StyledSpan::new("```", Style::CodeFence)));
        self.code_block_lang = None;
    }

    fn flush_list_item(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);

        let (marker, marker_style) = match self.list_stack.last() {
            Some(list) if list.ordered.is_some() => {
                (format!("{}. ", list.current_item), Style::ListNumber)
            }
            _ => ("• ".to_string(), Style::ListBullet),
        };
        let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
        let marker_width = marker.width();

        let opts = WrapOptions {
            width: self.width,
            first_prefix: vec![
                StyledSpan::plain(indent.clone()),
                StyledSpan::new(marker, marker_style),
            ],
            rest_prefix: vec![StyledSpan::plain(format!(
                "{indent}{}",
                " ".repeat(marker_width)
            ))],
        };
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    fn flush_table(&mut self) {
        for line in self.table_buffer.render(self.width) {
            self.lines.push(StyledLine::from_span(StyledSpan::plain(line)));
        }
        self.table_buffer = TableBuffer::default();
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if !self.current_spans.is_empty() {
            if self.in_code_block {
                self.flush_code_block();
            } else {
                self.flush_paragraph();
            }
        }
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(StyledLine::empty());
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ColorSystem, ImageAlgorithm, SpacePolarity};

    fn decision(hyperlinks: bool) -> CapabilityDecision {
        CapabilityDecision {
            decorated: true,
            images_enabled: false,
            image_algorithm: ImageAlgorithm::Block,
            space_polarity: SpacePolarity::Negative,
            hyperlinks_enabled: hyperlinks,
            hint_hyperlinks: true,
            color_system: ColorSystem::Truecolor,
            terminal_width: 80,
            terminal_height: 24,
            nerd_font_icons: false,
            write_files_allowed: false,
        }
    }

    fn render(text: &str, hyperlinks: bool) -> Vec<StyledLine> {
        let highlighter = Highlighter::new("dark");
        render_markdown(text, 80, &decision(hyperlinks), &highlighter)
    }

    fn full_text(lines: &[StyledLine]) -> String {
        lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.text.as_str()))
            .collect()
    }

    #[test]
    fn test_emphasis_and_strong() {
        let lines = render("**bold** and *italic*", true);
        let has = |style| {
            lines
                .iter()
                .any(|l| l.spans.iter().any(|s| s.style == style))
        };
        assert!(has(Style::Strong));
        assert!(has(Style::Emphasis));
    }

    /// Hyperlinks enabled: the span carries the target, no visible URL.
    #[test]
    fn test_link_with_hyperlinks() {
        let lines = render("see [docs](https://example.com)", true);
        let link_span = lines
            .iter()
            .flat_map(|l| &l.spans)
            .find(|s| s.style == Style::Link)
            .unwrap();
        assert_eq!(link_span.link.as_deref(), Some("https://example.com"));
        assert!(!full_text(&lines).contains("(https://example.com)"));
    }

    /// Hyperlinks disabled: the target is appended as visible text.
    #[test]
    fn test_link_without_hyperlinks() {
        let lines = render("see [docs](https://example.com)", false);
        assert!(full_text(&lines).contains("(https://example.com)"));
        let link_span = lines
            .iter()
            .flat_map(|l| &l.spans)
            .find(|s| s.style == Style::Link)
            .unwrap();
        assert!(link_span.link.is_none());
    }

    #[test]
    fn test_headings_prefixed_from_h2() {
        let lines = render("# Top\n\n## Section", true);
        let text = full_text(&lines);
        assert!(text.contains("Top"));
        assert!(text.contains("## Section"));
        assert!(!text.contains("# Top"));
    }

    #[test]
    fn test_code_block_keeps_indentation() {
        let lines = render("```\nfn main() {\n    body();\n}\n```", true);
        assert!(full_text(&lines).contains("    body();"));
        let fences = lines
            .iter()
            .filter(|l| l.spans.iter().any(|s| s.style == Style::CodeFence))
            .count();
        assert_eq!(fences, 2);
    }

    #[test]
    fn test_lists() {
        let lines = render("- one\n- two\n\n1. first\n2. second", true);
        let has = |style| {
            lines
                .iter()
                .any(|l| l.spans.iter().any(|s| s.style == style))
        };
        assert!(has(Style::ListBullet));
        assert!(has(Style::ListNumber));
        assert!(full_text(&lines).contains("2. second"));
    }

    #[test]
    fn test_table_renders_grid() {
        let lines = render("| a | b |\n| - | - |\n| 1 | 2 |", true);
        let text = full_text(&lines);
        assert!(text.contains('a'));
        assert!(text.contains('1'));
        // comfy-table draws a border of some kind.
        assert!(lines.len() >= 3);
    }

    #[test]
    fn test_empty_input() {
        let lines = render("", true);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_raw_html_dropped() {
        let lines = render("before\n\n<div>markup</div>\n\nafter", true);
        let text = full_text(&lines);
        assert!(!text.contains("<div>"));
        assert!(text.contains("before"));
        assert!(text.contains("after"));
    }
}
