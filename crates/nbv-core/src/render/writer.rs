//! Block emission.
//!
//! Streams rendered blocks to any writer, translating semantic styles and
//! direct RGB through the negotiated color system. Hyperlinked spans are
//! wrapped in OSC 8 escapes. A broken pipe is a clean stop for the
//! caller, not an error to report.

use std::io::{self, Write};

use crossterm::QueueableCommand;
use crossterm::style::{Attribute, Color, SetAttribute, SetBackgroundColor, SetForegroundColor};

use super::block::{RenderedBlock, Rgb, Style, StyledSpan};
use crate::capability::{CapabilityDecision, ColorSystem};

/// Streams blocks in order, one text line per styled line.
pub struct BlockWriter<'a, W: Write> {
    out: W,
    decision: &'a CapabilityDecision,
}

impl<'a, W: Write> BlockWriter<'a, W> {
    pub fn new(out: W, decision: &'a CapabilityDecision) -> Self {
        BlockWriter { out, decision }
    }

    /// Writes the block sequence and flushes. Emission order is the
    /// block order; nothing is buffered across blocks.
    pub fn write_blocks(&mut self, blocks: &[RenderedBlock]) -> io::Result<()> {
        for block in blocks {
            self.write_block(block)?;
        }
        self.out.flush()
    }

    pub fn write_block(&mut self, block: &RenderedBlock) -> io::Result<()> {
        for line in &block.lines {
            for span in &line.spans {
                self.write_span(span)?;
            }
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_span(&mut self, span: &StyledSpan) -> io::Result<()> {
        if span.text.is_empty() {
            return Ok(());
        }
        let color = self.decision.color_system != ColorSystem::None;
        let hyperlink = color.then_some(span.link.as_deref()).flatten();

        if let Some(target) = hyperlink {
            // OSC 8 open: ESC ] 8 ; ; target ESC \
            write!(self.out, "\x1b]8;;{target}\x1b\\")?;
        }
        let mut styled = false;
        if color {
            let (fg, bg, attributes) = appearance(span.style);
            for attribute in attributes {
                self.out.queue(SetAttribute(*attribute))?;
                styled = true;
            }
            if let Some(fg) = fg {
                self.out
                    .queue(SetForegroundColor(map_color(fg, self.decision.color_system)))?;
                styled = true;
            }
            if let Some(bg) = bg {
                self.out
                    .queue(SetBackgroundColor(map_color(bg, self.decision.color_system)))?;
                styled = true;
            }
        }
        self.out.write_all(span.text.as_bytes())?;
        if styled {
            self.out.queue(SetAttribute(Attribute::Reset))?;
        }
        if hyperlink.is_some() {
            write!(self.out, "\x1b]8;;\x1b\\")?;
        }
        Ok(())
    }
}

/// The fg/bg colors and attributes of a semantic style.
fn appearance(style: Style) -> (Option<Rgb>, Option<Rgb>, &'static [Attribute]) {
    const NONE: &[Attribute] = &[];
    const BOLD: &[Attribute] = &[Attribute::Bold];
    const ITALIC: &[Attribute] = &[Attribute::Italic];
    const DIM: &[Attribute] = &[Attribute::Dim];
    const UNDERLINE: &[Attribute] = &[Attribute::Underlined];

    match style {
        Style::Plain => (None, None, NONE),
        Style::Execution => (Some(Rgb::new(0xb2, 0xb2, 0xb2)), None, NONE),
        Style::CellBorder => (None, None, DIM),
        Style::Emphasis => (None, None, ITALIC),
        Style::Strong => (None, None, BOLD),
        Style::CodeInline => (Some(Rgb::new(0xd7, 0xaf, 0x5f)), None, NONE),
        Style::CodeBlock => (None, None, NONE),
        Style::CodeFence => (None, None, DIM),
        Style::H1 => (Some(Rgb::new(0xff, 0xff, 0xff)), Some(Rgb::new(0x60, 0x02, 0xee)), BOLD),
        Style::H2 => (Some(Rgb::new(0x03, 0xda, 0xc5)), None, BOLD),
        Style::H3 => (None, None, BOLD),
        Style::Link => (Some(Rgb::new(0x5f, 0x87, 0xd7)), None, UNDERLINE),
        Style::BlockQuote => (None, None, DIM),
        Style::ListBullet | Style::ListNumber => (Some(Rgb::new(0x03, 0xda, 0xc5)), None, NONE),
        Style::Stderr => (Some(Rgb::new(0x3a, 0x3a, 0x3a)), Some(Rgb::new(0xd7, 0x87, 0xaf)), NONE),
        Style::Fallback => (Some(Rgb::new(0xbb, 0x86, 0xfc)), None, NONE),
        Style::Hint => (None, None, DIM),
        Style::Colored { fg, bg } => (fg, bg, NONE),
    }
}

/// Maps RGB into the negotiated color range.
fn map_color(rgb: Rgb, system: ColorSystem) -> Color {
    match system {
        ColorSystem::Truecolor | ColorSystem::None => Color::Rgb {
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
        },
        ColorSystem::EightBit => Color::AnsiValue(to_ansi_256(rgb)),
        ColorSystem::Standard => Color::AnsiValue(to_ansi_16(rgb)),
    }
}

/// Nearest entry in the 256-color palette: the 6x6x6 cube, or the gray
/// ramp for near-neutral colors.
fn to_ansi_256(rgb: Rgb) -> u8 {
    let Rgb { r, g, b } = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max - min < 12 {
        // Gray ramp: 232..=255 covers 8..=238.
        let gray = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
        if gray < 8 {
            return 16;
        }
        if gray > 238 {
            return 231;
        }
        return 232 + ((gray - 8) / 10) as u8;
    }
    let scale = |channel: u8| {
        if channel < 48 {
            0
        } else if channel < 115 {
            1
        } else {
            u16::from((channel - 35) / 40).min(5) as u8
        }
    };
    16 + 36 * scale(r) + 6 * scale(g) + scale(b)
}

/// Nearest of the 16 basic ANSI colors.
fn to_ansi_16(rgb: Rgb) -> u8 {
    let bright = u8::from(u16::from(rgb.r) + u16::from(rgb.g) + u16::from(rgb.b) > 3 * 160);
    let bit = |channel: u8| u8::from(channel > 96);
    let base = bit(rgb.r) | (bit(rgb.g) << 1) | (bit(rgb.b) << 2);
    base + 8 * bright
}
