//! LaTeX to unicode conversion.
//!
//! A pure substitution pass over a fixed command table: math delimiters
//! are stripped, known commands become their unicode counterpart, grouping
//! braces disappear, and unknown commands keep their name so nothing is
//! silently lost.

/// Known commands, longest names first within each starting letter so the
/// greedy match below picks `\leftarrow` over `\left`.
const COMMANDS: &[(&str, &str)] = &[
    ("alpha", "α"),
    ("approx", "≈"),
    ("beta", "β"),
    ("cdot", "·"),
    ("chi", "χ"),
    ("delta", "δ"),
    ("Delta", "Δ"),
    ("div", "÷"),
    ("epsilon", "ε"),
    ("equiv", "≡"),
    ("eta", "η"),
    ("gamma", "γ"),
    ("Gamma", "Γ"),
    ("geq", "≥"),
    ("ge", "≥"),
    ("infty", "∞"),
    ("int", "∫"),
    ("kappa", "κ"),
    ("lambda", "λ"),
    ("Lambda", "Λ"),
    ("leftarrow", "←"),
    ("leq", "≤"),
    ("le", "≤"),
    ("mu", "μ"),
    ("nabla", "∇"),
    ("neq", "≠"),
    ("ne", "≠"),
    ("nu", "ν"),
    ("omega", "ω"),
    ("Omega", "Ω"),
    ("partial", "∂"),
    ("phi", "φ"),
    ("Phi", "Φ"),
    ("pi", "π"),
    ("Pi", "Π"),
    ("pm", "±"),
    ("prod", "∏"),
    ("propto", "∝"),
    ("psi", "ψ"),
    ("Psi", "Ψ"),
    ("rho", "ρ"),
    ("rightarrow", "→"),
    ("sigma", "σ"),
    ("Sigma", "Σ"),
    ("sqrt", "√"),
    ("sum", "∑"),
    ("tau", "τ"),
    ("theta", "θ"),
    ("Theta", "Θ"),
    ("times", "×"),
    ("to", "→"),
    ("upsilon", "υ"),
    ("xi", "ξ"),
    ("zeta", "ζ"),
];

/// Spacing and structural commands that simply disappear.
const DROPPED: &[&str] = &[
    "left", "right", "big", "Big", "bigg", "Bigg", "displaystyle", "mathrm", "mathbf", "mathit",
    "text", "textrm", "textbf", "textit", "quad", "qquad",
];

fn lookup(word: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, glyph)| *glyph)
}

/// Converts LaTeX markup to plain unicode text.
pub fn latex_to_unicode(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '$' | '{' | '}' => {}
            '~' => out.push(' '),
            '\\' => {
                // Single-character commands (\, \; \!) drop as spacing.
                if let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphabetic() {
                        chars.next();
                        if next == '\\' {
                            out.push('\n');
                        }
                        continue;
                    }
                }
                let mut word = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphabetic() {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(glyph) = lookup(&word) {
                    out.push_str(glyph);
                } else if word == "frac" {
                    // \frac{a}{b} flattens to a/b via the brace handling
                    // below; mark the boundary with a slash placeholder.
                    out.push_str(&convert_frac(&mut chars));
                } else if !DROPPED.contains(&word.as_str()) {
                    out.push_str(&word);
                }
            }
            '^' | '_' => {
                // Keep the operator but drop the grouping braces.
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Consumes `{numerator}{denominator}` after `\frac` and renders `a/b`.
fn convert_frac(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let numerator = take_group(chars);
    let denominator = take_group(chars);
    match (numerator, denominator) {
        (Some(n), Some(d)) => format!("{}/{}", latex_to_unicode(&n), latex_to_unicode(&d)),
        _ => String::new(),
    }
}

fn take_group(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<String> {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
    if chars.peek() != Some(&'{') {
        return None;
    }
    chars.next();
    let mut depth = 1;
    let mut group = String::new();
    for ch in chars.by_ref() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(group);
                }
            }
            _ => {}
        }
        group.push(ch);
    }
    Some(group)
}
