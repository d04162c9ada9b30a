//! CLI entry and dispatch.

use std::io::{self, IsTerminal, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nbv_core::capability::{self, ColorSystem, ImageAlgorithm, Overrides};
use nbv_core::notebook::Notebook;
use nbv_core::render::{BlockWriter, DocumentRenderer, RenderOptions};

use crate::env::EnvLayer;
use crate::probe;

#[derive(Parser)]
#[command(name = "nbv")]
#[command(version)]
#[command(about = "Render notebooks in the terminal")]
#[command(after_help = "Every option has an NBV_* environment variable default; \
explicit flags always win. Pass - as FILE to read standard input.")]
struct Cli {
    /// Notebook files to render ("-" reads standard input)
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Syntax highlighting theme: light, dark, or a bundled theme name
    #[arg(long, short = 't', value_name = "THEME")]
    theme: Option<String>,

    /// Force the plain style: no boxes, execution counts, or spacing
    #[arg(long, short = 'p', overrides_with = "decorated")]
    plain: bool,

    /// Force decoration even when stdout is not a terminal
    #[arg(long, short = 'd', overrides_with = "plain")]
    decorated: bool,

    /// Force image rendering on
    #[arg(long, short = 'i', overrides_with = "no_images")]
    images: bool,

    /// Force image rendering off
    #[arg(long, overrides_with = "images")]
    no_images: bool,

    /// Image drawing algorithm
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    image_drawing: Option<ImageDrawingArg>,

    /// Draw character images in positive space (suits dark-background
    /// figures; character drawings only)
    #[arg(long)]
    positive_space: bool,

    /// Force terminal hyperlinks on
    #[arg(long, overrides_with = "no_hyperlinks")]
    hyperlinks: bool,

    /// Force terminal hyperlinks off; paths print as visible text
    #[arg(long, overrides_with = "hyperlinks")]
    no_hyperlinks: bool,

    /// Hide the "Click to view" hints on hyperlinks
    #[arg(long, short = 'y')]
    hide_hyperlink_hints: bool,

    /// Do not write temporary preview files
    #[arg(long, short = 'l')]
    no_files: bool,

    /// Force color output on
    #[arg(long, overrides_with = "no_color")]
    color: bool,

    /// Force color output off
    #[arg(long, overrides_with = "color")]
    no_color: bool,

    /// Color range to emit
    #[arg(long, value_enum, value_name = "SYSTEM")]
    color_system: Option<ColorSystemArg>,

    /// Render width instead of the detected terminal width
    #[arg(long, short = 'w', value_name = "COLUMNS")]
    width: Option<u16>,

    /// Use Nerd Font icons for link subjects
    #[arg(long, short = 'n')]
    nerd_font: bool,

    /// Do not render cell outputs
    #[arg(long)]
    hide_output: bool,

    /// Show line numbers for code cells
    #[arg(long, short = 'm')]
    line_numbers: bool,

    /// Wrap long code lines instead of truncating them
    #[arg(long, short = 'q')]
    code_wrap: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageDrawingArg {
    Block,
    Character,
    Braille,
}

impl From<ImageDrawingArg> for ImageAlgorithm {
    fn from(arg: ImageDrawingArg) -> Self {
        match arg {
            ImageDrawingArg::Block => ImageAlgorithm::Block,
            ImageDrawingArg::Character => ImageAlgorithm::Character,
            ImageDrawingArg::Braille => ImageAlgorithm::Braille,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorSystemArg {
    None,
    Standard,
    #[value(name = "256")]
    EightBit,
    Truecolor,
}

impl From<ColorSystemArg> for ColorSystem {
    fn from(arg: ColorSystemArg) -> Self {
        match arg {
            ColorSystemArg::None => ColorSystem::None,
            ColorSystemArg::Standard => ColorSystem::Standard,
            ColorSystemArg::EightBit => ColorSystem::EightBit,
            ColorSystemArg::Truecolor => ColorSystem::Truecolor,
        }
    }
}

impl Cli {
    /// Explicit overrides from the flags actually given. Paired on/off
    /// flags collapse to one optional boolean; untouched flags stay
    /// `None` so environment defaults and probes can fill them.
    fn overrides(&self) -> Overrides {
        Overrides {
            decorated: flag_pair(self.decorated, self.plain),
            images: flag_pair(self.images, self.no_images),
            image_algorithm: self.image_drawing.map(ImageAlgorithm::from),
            positive_space: self.positive_space.then_some(true),
            hyperlinks: flag_pair(self.hyperlinks, self.no_hyperlinks),
            hide_hyperlink_hints: self.hide_hyperlink_hints.then_some(true),
            color: flag_pair(self.color, self.no_color),
            color_system: self.color_system.map(ColorSystem::from),
            width: self.width,
            nerd_font: self.nerd_font.then_some(true),
            files: self.no_files.then_some(false),
        }
    }
}

fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let env = EnvLayer::read();
    let probed = probe::probe();
    let decision = capability::resolve(&cli.overrides(), &env.capabilities, &probed)?;
    tracing::debug!(?decision, "resolved capabilities");

    let options = RenderOptions {
        theme: cli
            .theme
            .clone()
            .or(env.theme)
            .unwrap_or_else(|| "dark".to_string()),
        line_numbers: cli.line_numbers || env.line_numbers,
        code_wrap: cli.code_wrap || env.code_wrap,
        hide_output: cli.hide_output || env.hide_output,
    };
    let renderer = DocumentRenderer::new(&decision, options);

    let stdout = io::stdout();
    for path in &cli.files {
        let notebook = if path.as_os_str() == "-" {
            Notebook::from_reader(io::stdin().lock())?
        } else {
            Notebook::from_file(path)?
        };

        let blocks = renderer.render(&notebook);
        let mut writer = BlockWriter::new(stdout.lock(), &decision);
        match writer.write_blocks(&blocks) {
            // A closed pipe downstream ends rendering cleanly.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            result => result.with_context(|| format!("failed to write {}", path.display()))?,
        }
    }
    io::stdout().flush().ok();
    Ok(())
}

/// Logs to stderr, filtered by NBV_LOG (default: warnings only).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("NBV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}
