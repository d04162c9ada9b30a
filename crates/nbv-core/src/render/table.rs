//! Tabular HTML rendering.
//!
//! Handles the narrow table shape notebooks actually emit for rendered
//! dataframes: a `<table class="dataframe">` of thead/tbody rows with
//! th/td cells. The cells are extracted with a small tag scanner and laid
//! out through comfy-table; everything outside this shape goes through the
//! generic HTML path instead.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use super::block::{RenderedBlock, Style, StyledLine, StyledSpan};

/// Whether an HTML fragment is a rendered dataframe table.
pub fn is_dataframe(html: &str) -> bool {
    html.contains("<table") && html.contains("dataframe")
}

/// An extracted table: header rows plus data rows of plain-text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlTable {
    pub header: Vec<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Extracts rows and cells from a table fragment. Returns `None` when no
/// `<table>` is present; cell markup is flattened to its text content.
pub fn extract_table(html: &str) -> Option<HtmlTable> {
    let table_start = html.find("<table")?;
    let table_end = html[table_start..]
        .find("</table>")
        .map_or(html.len(), |end| table_start + end);
    let body = &html[table_start..table_end];

    let mut table = HtmlTable::default();
    let mut in_head = false;
    let mut current_row: Option<Vec<String>> = None;
    let mut current_cell: Option<String> = None;

    let mut rest = body;
    while let Some(open) = rest.find('<') {
        let text = &rest[..open];
        if let Some(cell) = current_cell.as_mut() {
            cell.push_str(&decode_entities(text));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = rest[open + 1..open + close].trim();
        let name = tag
            .trim_start_matches('/')
            .split([' ', '\t', '\n'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        let closing = tag.starts_with('/');

        match (name.as_str(), closing) {
            ("thead", false) => in_head = true,
            ("thead", true) => in_head = false,
            ("tr", false) => current_row = Some(Vec::new()),
            ("tr", true) => {
                if let Some(row) = current_row.take() {
                    if in_head {
                        table.header.push(row);
                    } else {
                        table.rows.push(row);
                    }
                }
            }
            ("th" | "td", false) => current_cell = Some(String::new()),
            ("th" | "td", true) => {
                if let (Some(cell), Some(row)) = (current_cell.take(), current_row.as_mut()) {
                    row.push(cell.trim().to_string());
                }
            }
            _ => {}
        }
        rest = &rest[open + close + 1..];
    }

    Some(table)
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Renders a table fragment as an aligned grid, truncated to `width`.
/// Returns `None` when the fragment holds no table.
pub fn render_table(html: &str, width: usize) -> Option<RenderedBlock> {
    let extracted = extract_table(html)?;
    if extracted.header.is_empty() && extracted.rows.is_empty() {
        return None;
    }

    let mut table = Table::new();
    table.set_width(width as u16);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    // Dataframes emit one header row in thead; extra header rows (column
    // multi-indexes) are folded into the data so nothing is dropped.
    let mut header_rows = extracted.header.into_iter();
    if let Some(first) = header_rows.next() {
        table.set_header(
            first
                .iter()
                .map(|cell| Cell::new(cell).set_alignment(CellAlignment::Right)),
        );
    }
    for row in header_rows.chain(extracted.rows) {
        table.add_row(
            row.iter()
                .map(|cell| Cell::new(cell).set_alignment(CellAlignment::Right)),
        );
    }

    let lines = table
        .to_string()
        .lines()
        .map(|line| StyledLine::from_span(StyledSpan::new(line, Style::Plain)))
        .collect();
    Some(RenderedBlock::from_lines(lines))
}
