//! Output representation selection.
//!
//! An output may carry several alternative renderings of the same logical
//! result. Selection walks a fixed richest-first priority order and skips
//! any kind whose required capability is disabled. Pure functions of
//! (data, decision): deterministic and idempotent.

use std::sync::OnceLock;

use regex::Regex;

use crate::capability::CapabilityDecision;
use crate::notebook::Data;

/// Image tags probed in fixed order. SVG is listed last: it cannot be
/// rasterized by the drawer and only participates in the link pass.
pub const IMAGE_MIMES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/svg+xml",
];

pub const VEGA_MIMES: &[&str] = &[
    "application/vnd.vega.v5+json",
    "application/vnd.vegalite.v4+json",
];

/// The closed set of renderable content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Vega,
    Html,
    Latex,
    Markdown,
    Json,
    Plain,
}

/// A selected representation: the kind plus the tag it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub kind: ContentKind,
    pub mime: &'a str,
}

/// The side-file link kinds that may accompany a main rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Image,
    Html,
}

fn first_image_mime(data: &Data) -> Option<&'static str> {
    IMAGE_MIMES.iter().copied().find(|mime| data.contains(mime))
}

/// Whether the plain-text alternative is a meaningful repr rather than a
/// generic `<Object at 0x...>` placeholder. When it is, the plain text is
/// preferred over dumping converted HTML.
fn has_custom_repr(data: &Data) -> bool {
    static OBJECT_REPR: OnceLock<Regex> = OnceLock::new();
    let pattern = OBJECT_REPR.get_or_init(|| Regex::new(r"^<[^\s<>]+( [^<>]*)?>$").unwrap());
    match data.text("text/plain") {
        Some(plain) => !pattern.is_match(plain.trim()),
        None => false,
    }
}

/// Whether an HTML fragment is the rendered-table shape the table
/// renderer understands.
fn is_dataframe_html(data: &Data) -> bool {
    data.text("text/html")
        .is_some_and(|html| super::table::is_dataframe(&html))
}

/// Picks exactly one representation for the main rendering of an output.
///
/// Priority: image > vega > html > latex > markdown > json > plain.
/// Returns `None` when nothing qualifies; the caller emits the explicit
/// empty block, never an error.
pub fn select<'a>(data: &'a Data, decision: &CapabilityDecision) -> Option<Selection<'a>> {
    if decision.images_enabled {
        if let Some(mime) = first_image_mime(data) {
            if mime != "image/svg+xml" {
                return Some(Selection {
                    kind: ContentKind::Image,
                    mime,
                });
            }
        }
    }
    if decision.decorated {
        if let Some(mime) = VEGA_MIMES.iter().copied().find(|mime| data.contains(mime)) {
            return Some(Selection {
                kind: ContentKind::Vega,
                mime,
            });
        }
        // HTML needs decoration to be legible, and loses to a meaningful
        // plain-text repr unless it is a rendered table.
        if data.contains("text/html") && (is_dataframe_html(data) || !has_custom_repr(data)) {
            return Some(Selection {
                kind: ContentKind::Html,
                mime: "text/html",
            });
        }
        if data.contains("text/latex") {
            return Some(Selection {
                kind: ContentKind::Latex,
                mime: "text/latex",
            });
        }
    }
    if data.contains("text/markdown") {
        return Some(Selection {
            kind: ContentKind::Markdown,
            mime: "text/markdown",
        });
    }
    if data.contains("application/json") {
        return Some(Selection {
            kind: ContentKind::Json,
            mime: "application/json",
        });
    }
    if data.contains("text/plain") {
        return Some(Selection {
            kind: ContentKind::Plain,
            mime: "text/plain",
        });
    }
    None
}

/// Picks the side-file link, if any, that accompanies the main rendering.
/// Links are decoration; plain mode never emits them.
pub fn select_link(data: &Data, decision: &CapabilityDecision) -> Option<(LinkKind, &'static str)> {
    if !decision.decorated {
        return None;
    }
    if let Some(mime) = first_image_mime(data) {
        return Some((LinkKind::Image, mime));
    }
    if data.contains("text/html") && html_is_nontrivial(data) {
        return Some((LinkKind::Html, "text/html"));
    }
    None
}

/// A one-line HTML snippet is not worth a preview file; anything
/// multi-line or carrying markup the converter cannot resolve is.
fn html_is_nontrivial(data: &Data) -> bool {
    data.text("text/html").is_some_and(|html| {
        let trimmed = html.trim();
        trimmed.lines().count() > 1 || trimmed.contains("<script") || trimmed.contains("<style")
    })
}
