//! The rendering pipeline.
//!
//! The document renderer walks cells in order, selects one representation
//! per output, and hands each to its content renderer. Decoration
//! (execution-count gutter, boxes, inter-cell spacing) applies only when
//! the capability decision says so; plain mode concatenates the same
//! blocks bare. A failure on one output degrades to that output's
//! plain-text alternative and never aborts the walk.

pub mod block;
pub mod code;
pub mod drawing;
pub mod html;
pub mod latex;
pub mod link;
pub mod markdown;
pub mod select;
pub mod stream;
pub mod table;
pub mod wrap;
pub mod writer;

use anyhow::Result;

pub use block::{RenderedBlock, Style, StyledLine, StyledSpan};
pub use writer::BlockWriter;

use self::code::{CodeOptions, Highlighter};
use self::link::{LinkSubject, Materializer};
use self::select::{ContentKind, LinkKind, Selection};
use crate::capability::CapabilityDecision;
use crate::notebook::{Cell, CellKind, Data, Notebook, Output};

/// Rendering options outside the capability set.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Syntax highlighting theme name ("light", "dark", or a bundled
    /// theme name).
    pub theme: String,
    /// Prefix code lines with their number.
    pub line_numbers: bool,
    /// Wrap long code lines instead of truncating.
    pub code_wrap: bool,
    /// Skip output rendering entirely.
    pub hide_output: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            theme: "dark".to_string(),
            line_numbers: false,
            code_wrap: false,
            hide_output: false,
        }
    }
}

/// Renders one notebook to an ordered block sequence.
pub struct DocumentRenderer<'a> {
    decision: &'a CapabilityDecision,
    options: RenderOptions,
    highlighter: Highlighter,
    materializer: Materializer,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(decision: &'a CapabilityDecision, options: RenderOptions) -> Self {
        let highlighter = Highlighter::new(&options.theme);
        // Side-files are written only when decoration and file-writing
        // are both enabled.
        let materializer =
            Materializer::new(decision.write_files_allowed && decision.decorated);
        DocumentRenderer {
            decision,
            options,
            highlighter,
            materializer,
        }
    }

    /// Walks the cells in document order and returns the block sequence.
    pub fn render(&self, notebook: &Notebook) -> Vec<RenderedBlock> {
        let gutter = self.gutter_width(notebook);
        let language = notebook.language();

        let mut blocks = Vec::new();
        for cell in &notebook.cells {
            for block in self.render_cell(cell, language, gutter) {
                if self.decision.decorated && !blocks.is_empty() && !block.is_empty() {
                    blocks.push(RenderedBlock::from_lines(vec![StyledLine::empty()]));
                }
                blocks.push(block);
            }
        }
        blocks
    }

    /// Gutter column width: the widest execution label in the document
    /// plus one space, so the cells line up. Zero in plain mode and for
    /// documents without code cells.
    fn gutter_width(&self, notebook: &Notebook) -> usize {
        if !self.decision.decorated {
            return 0;
        }
        notebook
            .cells
            .iter()
            .filter(|cell| cell.cell_type == CellKind::Code)
            .map(|cell| execution_label(cell.execution_count).len() + 1)
            .max()
            .unwrap_or(0)
    }

    fn render_cell(&self, cell: &Cell, language: &str, gutter: usize) -> Vec<RenderedBlock> {
        let width = usize::from(self.decision.terminal_width);
        let content_width = width.saturating_sub(gutter).max(8);

        let mut blocks = vec![self.render_source(cell, language, gutter, content_width)];

        if cell.cell_type == CellKind::Code && !self.options.hide_output {
            let output_width = content_width.saturating_sub(1).max(8);
            for output in &cell.outputs {
                let rendered = self
                    .render_output(output, language, output_width)
                    .unwrap_or_else(|error| {
                        tracing::warn!(%error, "output rendering failed, degrading");
                        vec![fallback_block(output)]
                    });
                let prefix = if self.decision.decorated {
                    format!("{} ", " ".repeat(gutter))
                } else {
                    String::new()
                };
                for rendered_block in rendered {
                    blocks.push(block::indent(rendered_block, &prefix));
                }
            }
        }
        blocks
    }

    fn render_source(
        &self,
        cell: &Cell,
        language: &str,
        gutter: usize,
        content_width: usize,
    ) -> RenderedBlock {
        match cell.cell_type {
            CellKind::Code => {
                let interior = if self.decision.decorated {
                    content_width.saturating_sub(4).max(4)
                } else {
                    content_width
                };
                let code = code::render_code(
                    &cell.source,
                    language,
                    &self.highlighter,
                    &CodeOptions {
                        width: interior,
                        wrap: self.options.code_wrap,
                        line_numbers: self.options.line_numbers,
                    },
                );
                if self.decision.decorated {
                    let boxed = block::boxed(code.lines, content_width);
                    with_gutter(
                        RenderedBlock::from_lines(boxed),
                        gutter,
                        Some(&execution_label(cell.execution_count)),
                    )
                } else {
                    code
                }
            }
            CellKind::Markdown => {
                let lines = markdown::render_markdown(
                    &cell.source,
                    content_width,
                    self.decision,
                    &self.highlighter,
                );
                with_gutter(RenderedBlock::from_lines(lines), gutter, None)
            }
            CellKind::Raw => {
                let raw = RenderedBlock::from_text(&cell.source, Style::Plain);
                if self.decision.decorated {
                    let truncated = raw
                        .lines
                        .into_iter()
                        .map(|line| block::truncate_line(line, content_width.saturating_sub(4)))
                        .collect();
                    let boxed = block::boxed(truncated, content_width);
                    with_gutter(RenderedBlock::from_lines(boxed), gutter, None)
                } else {
                    raw
                }
            }
        }
    }

    fn render_output(
        &self,
        output: &Output,
        language: &str,
        width: usize,
    ) -> Result<Vec<RenderedBlock>> {
        match output {
            Output::Stream { name, text } => Ok(vec![stream::render_stream(name, text)]),
            Output::Error {
                ename,
                evalue,
                traceback,
            } => Ok(vec![stream::render_error(
                ename,
                evalue,
                traceback,
                language,
                &self.highlighter,
            )]),
            Output::ExecuteResult { data } | Output::DisplayData { data } => {
                self.render_data(data, width)
            }
        }
    }

    fn render_data(&self, data: &Data, width: usize) -> Result<Vec<RenderedBlock>> {
        let mut blocks = Vec::new();

        match select::select_link(data, self.decision) {
            Some((LinkKind::Image, mime)) => {
                blocks.push(link::render_image_link(
                    data,
                    mime,
                    &self.materializer,
                    self.decision,
                ));
            }
            Some((LinkKind::Html, _)) => {
                blocks.push(link::render_html_link(
                    data,
                    &self.materializer,
                    self.decision,
                ));
            }
            None => {}
        }

        match select::select(data, self.decision) {
            Some(selection) => blocks.push(self.render_selection(selection, data, width)?),
            // No renderable representation: an explicit empty block,
            // never an error.
            None if blocks.is_empty() => blocks.push(RenderedBlock::empty()),
            None => {}
        }
        Ok(blocks)
    }

    fn render_selection(
        &self,
        selection: Selection,
        data: &Data,
        width: usize,
    ) -> Result<RenderedBlock> {
        match selection.kind {
            ContentKind::Image => Ok(drawing::render_image(
                data,
                selection.mime,
                width as u32,
                self.decision,
            )),
            ContentKind::Vega => Ok(link::render_vega_link(
                data,
                selection.mime,
                &self.materializer,
                self.decision,
            )),
            ContentKind::Html => {
                let payload = data.text(selection.mime).unwrap_or_default();
                html::render_html(&payload, width, self.decision, &self.highlighter)
            }
            ContentKind::Latex => Ok(self.render_latex(data, selection.mime)),
            ContentKind::Markdown => {
                let payload = data.text(selection.mime).unwrap_or_default();
                let lines = markdown::render_markdown(
                    &payload,
                    width,
                    self.decision,
                    &self.highlighter,
                );
                Ok(RenderedBlock::from_lines(lines))
            }
            ContentKind::Json => {
                let payload = data
                    .raw(selection.mime)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                Ok(RenderedBlock::from_lines(
                    self.highlighter.highlight(&payload, "json"),
                ))
            }
            ContentKind::Plain => {
                let payload = data.text(selection.mime).unwrap_or_default();
                Ok(RenderedBlock::from_text(
                    payload.strip_suffix('\n').unwrap_or(&payload),
                    Style::Plain,
                ))
            }
        }
    }

    /// LaTeX converts to unicode text; a multi-line result additionally
    /// materializes the original markup with an attached link.
    fn render_latex(&self, data: &Data, mime: &str) -> RenderedBlock {
        let payload = data.text(mime).unwrap_or_default();
        let converted = latex::latex_to_unicode(&payload);
        let mut rendered = RenderedBlock::from_text(converted.trim(), Style::Plain);

        if converted.trim().lines().count() > 1 {
            if let Some(path) = self.materializer.materialize(payload.as_bytes(), "tex") {
                rendered.lines.push(StyledLine::empty());
                rendered
                    .lines
                    .extend(link::link_block(LinkSubject::Latex, Some(&path), self.decision).lines);
            }
        }
        rendered
    }
}

/// The execution-count gutter label: `[n]:` when executed, blank
/// brackets otherwise.
fn execution_label(execution_count: Option<i64>) -> String {
    match execution_count {
        Some(count) => format!("[{count}]:"),
        None => "[ ]:".to_string(),
    }
}

/// Prefixes block lines with the gutter column. The label, when present,
/// sits on the first content row of the box (row 1), aligned with the
/// code inside.
fn with_gutter(block: RenderedBlock, gutter: usize, label: Option<&str>) -> RenderedBlock {
    if gutter == 0 {
        return block;
    }
    let lines = block
        .lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            if line.spans.is_empty() {
                return line;
            }
            let prefix = match label {
                Some(label) if index == 1 => StyledSpan::new(
                    format!("{label:>width$} ", width = gutter - 1),
                    Style::Execution,
                ),
                _ => StyledSpan::plain(" ".repeat(gutter)),
            };
            let mut spans = vec![prefix];
            spans.extend(line.spans);
            StyledLine { spans }
        })
        .collect();
    RenderedBlock::from_lines(lines)
}

/// The local degradation for a failed output: its plain-text alternative
/// when present, the explicit empty block otherwise.
fn fallback_block(output: &Output) -> RenderedBlock {
    match output {
        Output::ExecuteResult { data } | Output::DisplayData { data } => data
            .text("text/plain")
            .map_or_else(RenderedBlock::empty, |text| {
                RenderedBlock::from_text(&text, Style::Plain)
            }),
        _ => RenderedBlock::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ColorSystem, ImageAlgorithm, SpacePolarity};

    fn decision(decorated: bool) -> CapabilityDecision {
        CapabilityDecision {
            decorated,
            images_enabled: false,
            image_algorithm: ImageAlgorithm::Block,
            space_polarity: SpacePolarity::Negative,
            hyperlinks_enabled: false,
            hint_hyperlinks: true,
            color_system: ColorSystem::None,
            terminal_width: 80,
            terminal_height: 24,
            nerd_font_icons: false,
            write_files_allowed: false,
        }
    }

    fn notebook(json: &str) -> Notebook {
        Notebook::from_str(json).unwrap()
    }

    fn rendered_text(blocks: &[RenderedBlock]) -> String {
        blocks
            .iter()
            .flat_map(|b| &b.lines)
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    const MIXED: &str = r##"{"cells": [
        {"cell_type": "markdown", "source": "# Title"},
        {"cell_type": "code", "execution_count": 2, "source": "print('hi')", "outputs": [
            {"output_type": "stream", "name": "stdout", "text": "hi\n"}
        ]}
    ], "metadata": {"kernelspec": {"language": "python"}}}"##;

    /// Decorated cells carry boxes and the execution gutter.
    #[test]
    fn test_decorated_has_gutter_and_box() {
        let nb = notebook(MIXED);
        let d = decision(true);
        let renderer = DocumentRenderer::new(&d, RenderOptions::default());
        let text = rendered_text(&renderer.render(&nb));
        assert!(text.contains("[2]:"));
        assert!(text.contains('╭'));
        assert!(text.contains('╰'));
    }

    /// Plain mode: the same content, no boxes, no gutter, no spacing.
    #[test]
    fn test_plain_has_no_decoration() {
        let nb = notebook(MIXED);
        let d = decision(false);
        let renderer = DocumentRenderer::new(&d, RenderOptions::default());
        let text = rendered_text(&renderer.render(&nb));
        assert!(!text.contains("[2]:"));
        assert!(!text.contains('╭'));
        assert!(text.contains("print"));
        assert!(text.contains("hi"));
    }

    /// Rendering twice in plain mode is byte-identical: no hidden state.
    #[test]
    fn test_plain_render_idempotent() {
        let nb = notebook(MIXED);
        let d = decision(false);
        let renderer = DocumentRenderer::new(&d, RenderOptions::default());
        assert_eq!(renderer.render(&nb), renderer.render(&nb));
    }

    /// A corrupt image payload degrades to its text alternative and the
    /// remaining outputs still render.
    #[test]
    fn test_bad_output_degrades_locally() {
        let nb = notebook(
            r#"{"cells": [{"cell_type": "code", "execution_count": 1, "source": "plot()", "outputs": [
                {"output_type": "display_data", "data": {"image/png": "!!notbase64!!", "text/plain": "Figure"}},
                {"output_type": "stream", "name": "stdout", "text": "done\n"}
            ]}]}"#,
        );
        let mut d = decision(false);
        d.images_enabled = true;
        let renderer = DocumentRenderer::new(&d, RenderOptions::default());
        let text = rendered_text(&renderer.render(&nb));
        assert!(text.contains("Figure"));
        assert!(text.contains("done"));
    }

    /// Output with no qualifying representation yields an explicit empty
    /// block, not an error.
    #[test]
    fn test_unsupported_output_is_empty_block() {
        let nb = notebook(
            r#"{"cells": [{"cell_type": "code", "execution_count": 1, "source": "x", "outputs": [
                {"output_type": "display_data", "data": {"application/octet-stream": "AAAA"}}
            ]}]}"#,
        );
        let d = decision(false);
        let renderer = DocumentRenderer::new(&d, RenderOptions::default());
        let blocks = renderer.render(&nb);
        assert!(blocks.iter().any(RenderedBlock::is_empty));
    }

    /// hide_output suppresses outputs but keeps sources.
    #[test]
    fn test_hide_output() {
        let nb = notebook(MIXED);
        let options = RenderOptions {
            hide_output: true,
            ..RenderOptions::default()
        };
        let d = decision(false);
        let renderer = DocumentRenderer::new(&d, options);
        let text = rendered_text(&renderer.render(&nb));
        assert!(text.contains("print"));
        assert!(!text.contains("\nhi"));
    }

    /// Unexecuted code cells get blank-bracket labels sized with the rest.
    #[test]
    fn test_execution_labels() {
        assert_eq!(execution_label(Some(12)), "[12]:");
        assert_eq!(execution_label(None), "[ ]:");
    }

    /// html + plain alternatives in plain mode: the text alternative is
    /// used and no side-file is written.
    #[test]
    fn test_html_plain_mode_uses_text_alternative() {
        let nb = notebook(
            r#"{"cells": [{"cell_type": "code", "execution_count": 1, "source": "df", "outputs": [
                {"output_type": "execute_result", "data": {
                    "text/html": "<div>\n<p>rich</p>\n</div>",
                    "text/plain": "plain repr"
                }}
            ]}]}"#,
        );
        let d = decision(false);
        let renderer = DocumentRenderer::new(&d, RenderOptions::default());
        let text = rendered_text(&renderer.render(&nb));
        assert!(text.contains("plain repr"));
        assert!(!text.contains("rich"));
        assert!(!text.contains("Click to view"));
    }
}
