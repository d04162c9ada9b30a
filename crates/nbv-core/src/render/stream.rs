//! Stream and error output rendering.
//!
//! stdout streams print as plain text; stderr gets a visually distinct
//! tinted block. Tracebacks are code, not stream text: the ANSI escapes
//! kernels embed are stripped and the lines re-highlighted with the
//! document grammar.

use std::sync::OnceLock;

use regex::Regex;

use super::block::{RenderedBlock, Style, StyledLine, StyledSpan};
use super::code::Highlighter;

/// Renders a stream output by name.
pub fn render_stream(name: &str, text: &str) -> RenderedBlock {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    if name == "stderr" {
        render_stderr(trimmed)
    } else {
        RenderedBlock::from_text(trimmed, Style::Plain)
    }
}

fn render_stderr(text: &str) -> RenderedBlock {
    let mut lines = Vec::new();
    // A padding row above the content keeps the tinted band readable.
    lines.push(StyledLine::from_span(StyledSpan::new(" ", Style::Stderr)));
    for line in text.lines() {
        lines.push(StyledLine::from_span(StyledSpan::new(
            format!(" {line} "),
            Style::Stderr,
        )));
    }
    RenderedBlock::from_lines(lines)
}

/// Strips CSI escape sequences from kernel-embedded ANSI text.
pub fn strip_ansi(text: &str) -> String {
    static CSI: OnceLock<Regex> = OnceLock::new();
    let pattern = CSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap());
    pattern.replace_all(text, "").into_owned()
}

/// Renders an error output's traceback as highlighted code. Falls back
/// to the `ename: evalue` summary when the traceback is empty.
pub fn render_error(
    ename: &str,
    evalue: &str,
    traceback: &[String],
    grammar: &str,
    highlighter: &Highlighter,
) -> RenderedBlock {
    if traceback.is_empty() {
        let summary = if evalue.is_empty() {
            ename.to_string()
        } else {
            format!("{ename}: {evalue}")
        };
        return RenderedBlock::from_text(&summary, Style::Stderr);
    }

    let cleaned: String = traceback
        .iter()
        .map(|line| strip_ansi(line))
        .collect::<Vec<_>>()
        .join("\n");
    RenderedBlock::from_lines(highlighter.highlight(&cleaned, grammar))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_text(block: &RenderedBlock) -> String {
        block
            .lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// stdout is plain; the trailing newline does not become a blank row.
    #[test]
    fn test_stdout_plain() {
        let block = render_stream("stdout", "hello\nworld\n");
        assert_eq!(block.height(), 2);
        assert!(block
            .lines
            .iter()
            .all(|l| l.spans.iter().all(|s| s.style == Style::Plain)));
    }

    /// stderr is styled distinctly from stdout.
    #[test]
    fn test_stderr_styled() {
        let block = render_stream("stderr", "warning\n");
        assert!(block
            .lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.style == Style::Stderr)));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(
            strip_ansi("\u{1b}[0;31mValueError\u{1b}[0m: bad"),
            "ValueError: bad"
        );
        assert_eq!(strip_ansi("plain"), "plain");
    }

    /// Tracebacks render as code lines with escapes removed.
    #[test]
    fn test_traceback_highlighted() {
        let highlighter = Highlighter::new("dark");
        let traceback = vec![
            "Traceback (most recent call last):".to_string(),
            "\u{1b}[0;31mValueError\u{1b}[0m: bad value".to_string(),
        ];
        let block = render_error("ValueError", "bad value", &traceback, "python", &highlighter);
        let text = block_text(&block);
        assert!(text.contains("ValueError: bad value"));
        assert!(!text.contains('\u{1b}'));
    }

    /// An empty traceback still reports the error summary.
    #[test]
    fn test_empty_traceback_summary() {
        let highlighter = Highlighter::new("dark");
        let block = render_error("KeyboardInterrupt", "", &[], "python", &highlighter);
        assert_eq!(block_text(&block), "KeyboardInterrupt");
    }
}
