//! Side-file materialization and link blocks.
//!
//! Representations too complex to print directly (HTML previews, vega
//! charts, the original image bytes) are written to uniquely named
//! persistent temporary files. The link block then points at the file:
//! an OSC 8 hyperlink when the terminal supports them, the visible path
//! otherwise. With file-writing disabled the block is the subject text
//! alone. The core renderers stay side-effect-free by going through this
//! one seam.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::block::{RenderedBlock, Style, StyledLine, StyledSpan};
use crate::capability::CapabilityDecision;
use crate::notebook::Data;

/// What a link block points at, with its icon pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSubject {
    Image,
    Html,
    Latex,
    VegaChart,
}

impl LinkSubject {
    fn label(self) -> &'static str {
        match self {
            LinkSubject::Image => "Image",
            LinkSubject::Html => "HTML",
            LinkSubject::Latex => "LaTeX",
            LinkSubject::VegaChart => "Vega chart",
        }
    }

    fn icon(self, decision: &CapabilityDecision) -> &'static str {
        if decision.nerd_font_icons {
            match self {
                LinkSubject::Image => "\u{f03e} ",
                LinkSubject::Html => "\u{f484} ",
                LinkSubject::Latex => "\u{f034} ",
                LinkSubject::VegaChart => "\u{f080} ",
            }
        } else {
            match self {
                LinkSubject::Image => "🖼 ",
                LinkSubject::Html => "🌐 ",
                LinkSubject::Latex => "📄 ",
                LinkSubject::VegaChart => "📊 ",
            }
        }
    }
}

/// The file sink behind link rendering. Disabled, it is a no-op that
/// returns `None`, which keeps every renderer testable without touching
/// the filesystem.
#[derive(Debug, Clone, Copy)]
pub struct Materializer {
    enabled: bool,
}

impl Materializer {
    pub fn new(enabled: bool) -> Self {
        Materializer { enabled }
    }

    /// Writes content to a uniquely named temporary file and returns its
    /// path. `None` when disabled or when the write fails; a failed
    /// write never aborts rendering.
    pub fn materialize(&self, content: &[u8], extension: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        match self.write_file(content, extension) {
            Ok(path) => Some(path),
            Err(error) => {
                tracing::warn!(%error, "failed to write preview file");
                None
            }
        }
    }

    fn write_file(&self, content: &[u8], extension: &str) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("nbv-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .context("failed to create preview file")?;
        file.write_all(content)
            .context("failed to write preview file")?;
        let (_, path) = file.keep().context("failed to keep preview file")?;
        Ok(path)
    }
}

/// Assembles the link block for a materialized (or skipped) side-file.
pub fn link_block(
    subject: LinkSubject,
    path: Option<&Path>,
    decision: &CapabilityDecision,
) -> RenderedBlock {
    let icon = subject.icon(decision);
    let span = match path {
        Some(path) if decision.hyperlinks_enabled => {
            let message = if decision.hint_hyperlinks {
                format!("Click to view {}", subject.label())
            } else {
                subject.label().to_string()
            };
            StyledSpan::new(format!("{icon}{message}"), Style::Link)
                .with_link(format!("file://{}", path.display()))
        }
        Some(path) => StyledSpan::new(format!("{icon}{}", path.display()), Style::Hint),
        None => StyledSpan::new(format!("{icon}{}", subject.label()), Style::Plain),
    };
    RenderedBlock::from_lines(vec![StyledLine::from_span(span)])
}

/// Materializes an image payload (decoded from base64, except SVG which
/// is already text) and renders its link block.
pub fn render_image_link(
    data: &Data,
    mime: &str,
    materializer: &Materializer,
    decision: &CapabilityDecision,
) -> RenderedBlock {
    let extension = mime.rsplit('/').next().unwrap_or("bin");
    let (content, extension) = if mime == "image/svg+xml" {
        (data.text(mime).map(String::into_bytes), "svg")
    } else {
        let decoded = data.text(mime).and_then(|encoded| {
            let stripped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64.decode(stripped).ok()
        });
        (decoded, extension)
    };
    let path = content.and_then(|bytes| materializer.materialize(&bytes, extension));
    link_block(LinkSubject::Image, path.as_deref(), decision)
}

/// Materializes an HTML payload and renders its link block.
pub fn render_html_link(
    data: &Data,
    materializer: &Materializer,
    decision: &CapabilityDecision,
) -> RenderedBlock {
    let path = data
        .text("text/html")
        .and_then(|html| materializer.materialize(html.as_bytes(), "html"));
    link_block(LinkSubject::Html, path.as_deref(), decision)
}

/// Embeds a vega spec into a self-contained preview page and renders its
/// link block.
pub fn render_vega_link(
    data: &Data,
    mime: &str,
    materializer: &Materializer,
    decision: &CapabilityDecision,
) -> RenderedBlock {
    let page = data
        .raw(mime)
        .and_then(|spec| serde_json::to_string(spec).ok())
        .and_then(|spec_json| vega_page(&spec_json).ok());
    let path = page.and_then(|html| materializer.materialize(html.as_bytes(), "html"));
    link_block(LinkSubject::VegaChart, path.as_deref(), decision)
}

/// Renders the vega preview page from the bundled template.
fn vega_page(spec_json: &str) -> Result<String> {
    let mut env = minijinja::Environment::new();
    env.add_template("vega", include_str!("../../templates/vega.html"))
        .context("invalid vega template")?;
    let template = env.get_template("vega").context("missing vega template")?;
    template
        .render(minijinja::context! { title => "Vega chart", spec => spec_json })
        .context("failed to render vega template")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::capability::{ColorSystem, ImageAlgorithm, SpacePolarity};

    fn decision(hyperlinks: bool, hints: bool) -> CapabilityDecision {
        CapabilityDecision {
            decorated: true,
            images_enabled: true,
            image_algorithm: ImageAlgorithm::Block,
            space_polarity: SpacePolarity::Negative,
            hyperlinks_enabled: hyperlinks,
            hint_hyperlinks: hints,
            color_system: ColorSystem::Truecolor,
            terminal_width: 80,
            terminal_height: 24,
            nerd_font_icons: false,
            write_files_allowed: true,
        }
    }

    fn block_text(block: &RenderedBlock) -> String {
        block
            .lines
            .iter()
            .flat_map(|l| l.spans.iter().map(|s| s.text.as_str()))
            .collect()
    }

    /// Disabled materializer is a strict no-op.
    #[test]
    fn test_disabled_materializer_returns_none() {
        let materializer = Materializer::new(false);
        assert!(materializer.materialize(b"content", "html").is_none());
    }

    /// Enabled materializer writes unique files per call.
    #[test]
    fn test_materialize_writes_unique_files() {
        let materializer = Materializer::new(true);
        let first = materializer.materialize(b"one", "html").unwrap();
        let second = materializer.materialize(b"two", "html").unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(first.extension().unwrap(), "html");
        std::fs::remove_file(first).ok();
        std::fs::remove_file(second).ok();
    }

    /// Hyperlinks on: the span carries a file:// target and the hint.
    #[test]
    fn test_link_block_with_hyperlinks() {
        let path = PathBuf::from("/tmp/nbv-x.html");
        let block = link_block(LinkSubject::Html, Some(&path), &decision(true, true));
        let span = &block.lines[0].spans[0];
        assert!(span.text.contains("Click to view HTML"));
        assert_eq!(span.link.as_deref(), Some("file:///tmp/nbv-x.html"));
    }

    /// Hints suppressed: the subject stands alone.
    #[test]
    fn test_link_block_hint_suppressed() {
        let path = PathBuf::from("/tmp/nbv-x.html");
        let block = link_block(LinkSubject::Html, Some(&path), &decision(true, false));
        let text = block_text(&block);
        assert!(!text.contains("Click to view"));
        assert!(text.contains("HTML"));
    }

    /// Hyperlinks off: the path is printed as visible text.
    #[test]
    fn test_link_block_prints_path() {
        let path = PathBuf::from("/tmp/nbv-x.html");
        let block = link_block(LinkSubject::Html, Some(&path), &decision(false, true));
        let span = &block.lines[0].spans[0];
        assert!(span.text.contains("/tmp/nbv-x.html"));
        assert!(span.link.is_none());
    }

    /// No file: the block is the subject text alone.
    #[test]
    fn test_link_block_without_file() {
        let block = link_block(LinkSubject::VegaChart, None, &decision(true, true));
        assert!(block_text(&block).contains("Vega chart"));
    }

    /// The vega page embeds the spec and is materialized as html.
    #[test]
    fn test_vega_link_materializes_page() {
        let mut data = Data::default();
        data.insert(
            "application/vnd.vegalite.v4+json",
            json!({"mark": "bar", "data": {"values": []}}),
        );
        let materializer = Materializer::new(true);
        let block = render_vega_link(
            &data,
            "application/vnd.vegalite.v4+json",
            &materializer,
            &decision(false, true),
        );
        let text = block_text(&block);
        assert!(text.contains(".html"));
        let path = text.trim().trim_start_matches("📊 ").to_string();
        let page = std::fs::read_to_string(&path).unwrap();
        assert!(page.contains("vegaEmbed"));
        assert!(page.contains("\"mark\""));
        std::fs::remove_file(path).ok();
    }
}
