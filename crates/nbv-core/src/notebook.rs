//! Notebook document model.
//!
//! Loads Jupyter-style `.ipynb` JSON into an immutable cell/output model.
//! Cells keep their source order; nothing is reordered or deduplicated
//! after load.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/// Fallback grammar when the document declares no kernel language.
const DEFAULT_LANGUAGE: &str = "python";

/// A parsed notebook: ordered cells plus document metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    kernelspec: Option<KernelSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct KernelSpec {
    #[serde(default)]
    language: Option<String>,
}

impl Notebook {
    /// Loads a notebook from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read notebook {}", path.display()))?;
        Self::from_str(&contents)
            .with_context(|| format!("failed to parse notebook {}", path.display()))
    }

    /// Loads a notebook from any reader (used for standard input).
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .context("failed to read notebook from input")?;
        Self::from_str(&contents).context("failed to parse notebook from input")
    }

    /// Parses a notebook from JSON text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self> {
        let notebook = serde_json::from_str(contents)?;
        Ok(notebook)
    }

    /// The document-declared language, used as the default highlighting
    /// grammar for code cells. Falls back to python when the metadata
    /// carries no kernelspec.
    pub fn language(&self) -> &str {
        self.metadata
            .kernelspec
            .as_ref()
            .and_then(|spec| spec.language.as_deref())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// The kind of a notebook cell. Unknown kinds are treated as raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CellKind {
    Code,
    Markdown,
    Raw,
}

impl From<String> for CellKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "code" => CellKind::Code,
            "markdown" => CellKind::Markdown,
            _ => CellKind::Raw,
        }
    }
}

/// One notebook cell. Owned by the notebook, immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    pub cell_type: CellKind,
    #[serde(default)]
    pub execution_count: Option<i64>,
    #[serde(default, deserialize_with = "multiline")]
    pub source: String,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

/// One output of a code cell, tagged by its role.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    ExecuteResult {
        #[serde(default)]
        data: Data,
    },
    // update_display_data replays the same payload shape.
    #[serde(alias = "update_display_data")]
    DisplayData {
        #[serde(default)]
        data: Data,
    },
    Stream {
        #[serde(default)]
        name: String,
        #[serde(default, deserialize_with = "multiline")]
        text: String,
    },
    Error {
        #[serde(default)]
        ename: String,
        #[serde(default)]
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

/// Alternative representations of one logical result, keyed by content-kind
/// tag. At most one payload per tag. `BTreeMap` keeps iteration order
/// deterministic so repeated renders are byte-identical.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Data(BTreeMap<String, serde_json::Value>);

impl Data {
    pub fn contains(&self, mime: &str) -> bool {
        self.0.contains_key(mime)
    }

    /// The payload under `mime` as text. ipynb stores multiline values
    /// either as one string or as a list of line strings; both are
    /// joined verbatim. Structured JSON payloads return `None`.
    pub fn text(&self, mime: &str) -> Option<String> {
        match self.0.get(mime)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(lines) => Some(
                lines
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .collect::<String>(),
            ),
            _ => None,
        }
    }

    /// The raw JSON payload under `mime` (vega specs, application/json).
    pub fn raw(&self, mime: &str) -> Option<&serde_json::Value> {
        self.0.get(mime)
    }

    #[cfg(test)]
    pub fn insert(&mut self, mime: &str, value: serde_json::Value) {
        self.0.insert(mime.to_string(), value);
    }
}

/// Deserializes ipynb multiline text: either a single string or a list of
/// line strings, joined verbatim.
fn multiline<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MultilineText {
        Single(String),
        Lines(Vec<String>),
    }

    Ok(match MultilineText::deserialize(deserializer)? {
        MultilineText::Single(text) => text,
        MultilineText::Lines(lines) => lines.concat(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Notebook {
        Notebook::from_str(json).unwrap()
    }

    /// Source stored as a list of lines is joined verbatim.
    #[test]
    fn test_source_list_is_joined() {
        let notebook = parse(
            r#"{"cells": [{"cell_type": "code", "source": ["a = 1\n", "b = 2"], "outputs": []}]}"#,
        );
        assert_eq!(notebook.cells[0].source, "a = 1\nb = 2");
    }

    /// Source stored as a single string passes through unchanged.
    #[test]
    fn test_source_string_passthrough() {
        let notebook =
            parse(r##"{"cells": [{"cell_type": "markdown", "source": "# Title"}]}"##);
        assert_eq!(notebook.cells[0].source, "# Title");
        assert_eq!(notebook.cells[0].cell_type, CellKind::Markdown);
    }

    /// Cell order is preserved verbatim from the document.
    #[test]
    fn test_cell_order_preserved() {
        let notebook = parse(
            r#"{"cells": [
                {"cell_type": "markdown", "source": "first"},
                {"cell_type": "code", "source": "second", "outputs": []},
                {"cell_type": "raw", "source": "third"}
            ]}"#,
        );
        let sources: Vec<_> = notebook.cells.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["first", "second", "third"]);
    }

    /// Unknown cell kinds degrade to raw instead of failing the load.
    #[test]
    fn test_unknown_cell_kind_is_raw() {
        let notebook = parse(r#"{"cells": [{"cell_type": "heading", "source": "x"}]}"#);
        assert_eq!(notebook.cells[0].cell_type, CellKind::Raw);
    }

    /// Kernel language comes from metadata, defaulting to python.
    #[test]
    fn test_language_from_kernelspec() {
        let notebook = parse(
            r#"{"cells": [], "metadata": {"kernelspec": {"language": "julia"}}}"#,
        );
        assert_eq!(notebook.language(), "julia");

        let bare = parse(r#"{"cells": []}"#);
        assert_eq!(bare.language(), "python");
    }

    /// Outputs parse by role, with multiline stream text joined.
    #[test]
    fn test_output_roles() {
        let notebook = parse(
            r#"{"cells": [{"cell_type": "code", "source": "", "outputs": [
                {"output_type": "stream", "name": "stdout", "text": ["a\n", "b\n"]},
                {"output_type": "execute_result", "data": {"text/plain": "3"}},
                {"output_type": "error", "ename": "ValueError", "evalue": "bad", "traceback": ["line"]}
            ]}]}"#,
        );
        let outputs = &notebook.cells[0].outputs;
        assert_eq!(outputs.len(), 3);
        match &outputs[0] {
            Output::Stream { name, text } => {
                assert_eq!(name, "stdout");
                assert_eq!(text, "a\nb\n");
            }
            other => panic!("expected stream, got {other:?}"),
        }
        match &outputs[1] {
            Output::ExecuteResult { data } => {
                assert_eq!(data.text("text/plain").as_deref(), Some("3"));
            }
            other => panic!("expected execute_result, got {other:?}"),
        }
        match &outputs[2] {
            Output::Error { ename, .. } => assert_eq!(ename, "ValueError"),
            other => panic!("expected error, got {other:?}"),
        }
    }
}
