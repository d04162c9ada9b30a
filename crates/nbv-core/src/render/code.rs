//! Syntax-highlighted source rendering.
//!
//! Grammar selection starts from the document-declared language and is
//! overridden per-cell by recognized cell-magic markers. Highlighting goes
//! through syntect; colors are carried as direct RGB spans and mapped to
//! the terminal's color system by the writer.

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use unicode_width::UnicodeWidthChar;

use super::block::{self, RenderedBlock, Rgb, Style, StyledLine, StyledSpan};

/// Cell-magic marker to highlighting grammar. Prefix match on the first
/// source line; unmatched magics keep the document grammar.
const MAGIC_GRAMMARS: &[(&str, &str)] = &[
    ("bash", "bash"),
    ("html", "html"),
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("latex", "latex"),
    ("markdown", "markdown"),
    ("perl", "perl"),
    ("python", "python"),
    ("python3", "python"),
    ("ruby", "ruby"),
    ("script", "bash"),
    ("sh", "bash"),
];

/// Options shaping code layout.
#[derive(Debug, Clone, Copy)]
pub struct CodeOptions {
    /// Available display width.
    pub width: usize,
    /// Wrap long lines instead of truncating them.
    pub wrap: bool,
    /// Prefix lines with their number.
    pub line_numbers: bool,
}

/// A loaded grammar set plus the chosen highlighting theme.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    /// Loads the bundled grammars and resolves `theme_name`. "light" and
    /// "dark" (and their "ansi_" aliases) map to bundled themes; unknown
    /// names fall back to the dark default.
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let lowered = theme_name.to_lowercase();
        let resolved = match lowered.as_str() {
            "light" | "ansi_light" => "InspiredGitHub",
            "dark" | "ansi_dark" => "base16-ocean.dark",
            other => {
                if themes.contains_key(other) {
                    other
                } else {
                    tracing::debug!(theme = other, "unknown theme, using dark default");
                    "base16-ocean.dark"
                }
            }
        };
        let theme = themes
            .remove(resolved)
            .unwrap_or_else(|| ThemeSet::load_defaults().themes["base16-ocean.dark"].clone());
        Highlighter {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Highlights source text under the grammar named by `token`, one
    /// styled line per source line. Unknown tokens highlight as plain
    /// text rather than failing.
    pub fn highlight(&self, source: &str, token: &str) -> Vec<StyledLine> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(token)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut lines = Vec::new();
        for line in source.lines() {
            match highlighter.highlight_line(line, &self.syntaxes) {
                Ok(ranges) => {
                    let spans = ranges
                        .into_iter()
                        .filter(|(_, text)| !text.is_empty())
                        .map(|(style, text)| {
                            let fg = style.foreground;
                            StyledSpan::new(
                                text,
                                Style::Colored {
                                    fg: Some(Rgb::new(fg.r, fg.g, fg.b)),
                                    bg: None,
                                },
                            )
                        })
                        .collect();
                    lines.push(StyledLine { spans });
                }
                Err(_) => lines.push(StyledLine::from_span(StyledSpan::plain(line))),
            }
        }
        if lines.is_empty() {
            lines.push(StyledLine::empty());
        }
        lines
    }
}

/// The grammar override for a cell-magic source, if the first line names
/// a recognized magic.
pub fn magic_grammar(source: &str) -> Option<&'static str> {
    let first_line = source.lines().next()?;
    let magic = first_line.strip_prefix("%%")?.trim();
    let word = magic.split_whitespace().next()?;
    MAGIC_GRAMMARS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, grammar)| *grammar)
}

/// Renders cell source with highlighting, magic override, and width
/// handling. The magic line itself keeps the document grammar; only the
/// body switches.
pub fn render_code(
    source: &str,
    document_grammar: &str,
    highlighter: &Highlighter,
    opts: &CodeOptions,
) -> RenderedBlock {
    let highlighted = match (magic_grammar(source), source.split_once('\n')) {
        (Some(body_grammar), Some((magic_line, body))) => {
            let mut lines = highlighter.highlight(magic_line, document_grammar);
            lines.extend(highlighter.highlight(body, body_grammar));
            lines
        }
        _ => highlighter.highlight(source, document_grammar),
    };

    RenderedBlock::from_lines(layout_lines(highlighted, opts))
}

/// Applies line numbers and truncation or wrapping to highlighted lines.
fn layout_lines(lines: Vec<StyledLine>, opts: &CodeOptions) -> Vec<StyledLine> {
    let number_width = if opts.line_numbers {
        lines.len().to_string().len() + 1
    } else {
        0
    };
    let budget = opts.width.saturating_sub(number_width).max(1);

    let mut out = Vec::with_capacity(lines.len());
    for (index, line) in lines.into_iter().enumerate() {
        let pieces = if opts.wrap {
            split_by_width(line, budget)
        } else {
            vec![block::truncate_line(line, budget)]
        };
        for (piece_index, piece) in pieces.into_iter().enumerate() {
            let mut spans = Vec::with_capacity(piece.spans.len() + 1);
            if number_width > 0 {
                let label = if piece_index == 0 {
                    format!("{:>width$} ", index + 1, width = number_width - 1)
                } else {
                    " ".repeat(number_width)
                };
                spans.push(StyledSpan::new(label, Style::Hint));
            }
            spans.extend(piece.spans);
            out.push(StyledLine { spans });
        }
    }
    out
}

/// Splits a line into display-width chunks, preserving all characters and
/// span styling. Used for code wrap mode, where whitespace is
/// significant.
fn split_by_width(line: StyledLine, width: usize) -> Vec<StyledLine> {
    if line.width() <= width {
        return vec![line];
    }
    let mut pieces = Vec::new();
    let mut current: Vec<StyledSpan> = Vec::new();
    let mut used = 0;
    for span in line.spans {
        let mut fragment = String::new();
        for ch in span.text.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if used + ch_width > width && used > 0 {
                if !fragment.is_empty() {
                    current.push(StyledSpan {
                        text: std::mem::take(&mut fragment),
                        style: span.style,
                        link: span.link.clone(),
                    });
                }
                pieces.push(StyledLine {
                    spans: std::mem::take(&mut current),
                });
                used = 0;
            }
            fragment.push(ch);
            used += ch_width;
        }
        if !fragment.is_empty() {
            current.push(StyledSpan {
                text: fragment,
                style: span.style,
                link: span.link.clone(),
            });
        }
    }
    if !current.is_empty() {
        pieces.push(StyledLine { spans: current });
    }
    if pieces.is_empty() {
        pieces.push(StyledLine::empty());
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &StyledLine) -> String {
        line.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn opts(width: usize) -> CodeOptions {
        CodeOptions {
            width,
            wrap: false,
            line_numbers: false,
        }
    }

    /// A %%bash cell under a python document selects the shell grammar.
    #[test]
    fn test_bash_magic_overrides_python() {
        assert_eq!(magic_grammar("%%bash\necho hi"), Some("bash"));
        assert_eq!(magic_grammar("x = 1"), None);
        assert_eq!(magic_grammar("%%unknownmagic\nbody"), None);
    }

    /// Magic rendering keeps the magic line and highlights the body.
    #[test]
    fn test_magic_cell_renders_all_lines() {
        let highlighter = Highlighter::new("dark");
        let block = render_code("%%bash\necho hi", "python", &highlighter, &opts(80));
        assert_eq!(block.height(), 2);
        assert_eq!(text_of(&block.lines[0]), "%%bash");
        assert_eq!(text_of(&block.lines[1]), "echo hi");
    }

    /// Long lines truncate to the width unless wrap is requested.
    #[test]
    fn test_truncate_vs_wrap() {
        let highlighter = Highlighter::new("dark");
        let source = "x = 'aaaaaaaaaaaaaaaaaaaa'";

        let truncated = render_code(source, "python", &highlighter, &opts(10));
        assert_eq!(truncated.height(), 1);
        assert!(truncated.lines[0].width() <= 10);

        let wrapped = render_code(
            source,
            "python",
            &highlighter,
            &CodeOptions {
                width: 10,
                wrap: true,
                line_numbers: false,
            },
        );
        assert!(wrapped.height() > 1);
        for line in &wrapped.lines {
            assert!(line.width() <= 10);
        }
        let rejoined: String = wrapped.lines.iter().map(|l| text_of(l)).collect();
        assert_eq!(rejoined, source);
    }

    /// Line numbers prefix each source line, continuations get spaces.
    #[test]
    fn test_line_numbers() {
        let highlighter = Highlighter::new("dark");
        let block = render_code(
            "a = 1\nb = 2",
            "python",
            &highlighter,
            &CodeOptions {
                width: 80,
                wrap: false,
                line_numbers: true,
            },
        );
        assert!(text_of(&block.lines[0]).starts_with("1 "));
        assert!(text_of(&block.lines[1]).starts_with("2 "));
    }

    /// Unknown grammars degrade to plain text without failing.
    #[test]
    fn test_unknown_grammar_is_plain() {
        let highlighter = Highlighter::new("dark");
        let block = render_code("whatever", "no-such-language", &highlighter, &opts(80));
        assert_eq!(text_of(&block.lines[0]), "whatever");
    }
}
