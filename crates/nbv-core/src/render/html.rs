//! HTML rendering.
//!
//! Rendered dataframe tables get real grid layout; any other fragment is
//! converted to markdown-shaped text with html2text and rendered through
//! the markdown pipeline, so emphasis, lists, and links carry over.

use anyhow::Result;

use super::block::RenderedBlock;
use super::code::Highlighter;
use super::{markdown, table};
use crate::capability::CapabilityDecision;

/// Converts an HTML fragment to plain text at the given width.
pub fn html_to_text(html: &str, width: usize) -> Result<String> {
    Ok(html2text::from_read(html.as_bytes(), width.max(1)))
}

/// Renders an HTML payload: table layout for dataframe fragments,
/// converted text for everything else.
pub fn render_html(
    html: &str,
    width: usize,
    decision: &CapabilityDecision,
    highlighter: &Highlighter,
) -> Result<RenderedBlock> {
    if table::is_dataframe(html) {
        if let Some(block) = table::render_table(html, width) {
            return Ok(block);
        }
    }
    let converted = html_to_text(html, width)?;
    let lines = markdown::render_markdown(converted.trim_end(), width, decision, highlighter);
    Ok(RenderedBlock::from_lines(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ColorSystem, ImageAlgorithm, SpacePolarity};

    fn decision() -> CapabilityDecision {
        CapabilityDecision {
            decorated: true,
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

    fn block_text(block: &RenderedBlock) -> String {
        block
            .lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.text.as_str()))
            .collect()
    }

    #[test]
    fn test_plain_fragment_converts() {
        let highlighter = Highlighter::new("dark");
        let block = render_html("<p>hello <b>world</b></p>", 80, &decision(), &highlighter)
            .unwrap();
        let text = block_text(&block);
        assert!(text.contains("hello"));
        assert!(text.contains("world"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_dataframe_takes_table_path() {
        let highlighter = Highlighter::new("dark");
        let html = "<table class=\"dataframe\"><thead><tr><th>x</th></tr></thead>\
                    <tbody><tr><td>1</td></tr></tbody></table>";
        let block = render_html(html, 40, &decision(), &highlighter).unwrap();
        let text = block_text(&block);
        assert!(text.contains('x'));
        assert!(text.contains('1'));
    }
}
