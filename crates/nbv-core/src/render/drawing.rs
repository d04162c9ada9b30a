//! Raster images as terminal glyph grids.
//!
//! Three interchangeable algorithms: half-height block glyphs (one color
//! pair per cell), a density ramp of ASCII characters in positive or
//! negative space, and 2x4 braille dot matrices. All three share the same
//! outer grid math: aspect-preserving, bounded by the terminal, never
//! upsampled. The image is downsampled to the sampling grid once up
//! front, and the per-cell loops index the raw RGBA buffer directly.

use std::io::Cursor;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::block::{RenderedBlock, Rgb, Style, StyledLine, StyledSpan};
use crate::capability::{CapabilityDecision, ImageAlgorithm, SpacePolarity};
use crate::notebook::Data;

/// A terminal cell is roughly twice as tall as wide.
const GLYPH_ASPECT_CORRECTION: f64 = 0.5;

/// Characters ordered by visual density, sparse to dense.
const DENSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Braille dot thresholds stay inside this band so flat regions do not
/// dissolve into all dots or none.
const BRAILLE_CUTOFF_MIN: f64 = 40.0;
const BRAILLE_CUTOFF_MAX: f64 = 215.0;

/// Unicode braille dot bits by (row, column) inside one cell.
const BRAILLE_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// One drawn terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCell {
    pub glyph: char,
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
}

/// A row-major grid of drawn cells, bounded by the requested dimensions.
#[derive(Debug, Clone)]
pub struct GlyphGrid {
    width: usize,
    height: usize,
    cells: Vec<GlyphCell>,
}

impl GlyphGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> impl Iterator<Item = &[GlyphCell]> {
        self.cells.chunks(self.width)
    }
}

/// Draws raster bytes as a glyph grid.
///
/// The polarity only applies to the character algorithm; the resolver
/// rejects braille + positive space before anything reaches here.
pub fn draw(
    raster: &[u8],
    max_width: u32,
    max_height: u32,
    algorithm: ImageAlgorithm,
    polarity: SpacePolarity,
) -> Result<GlyphGrid> {
    let decoded = image::ImageReader::new(Cursor::new(raster))
        .with_guessed_format()
        .context("failed to sniff image format")?
        .decode()
        .context("failed to decode image")?;

    let (cols, rows) = grid_size(
        decoded.width(),
        decoded.height(),
        max_width.max(1),
        max_height.max(1),
    );

    // Sampling resolution per glyph cell: block reads two pixel rows,
    // braille a 2x4 dot matrix, character one pixel.
    let (sample_w, sample_h) = match algorithm {
        ImageAlgorithm::Block => (cols, rows * 2),
        ImageAlgorithm::Character => (cols, rows),
        ImageAlgorithm::Braille => (cols * 2, rows * 4),
    };
    let pixels = resample_rgba(&decoded, sample_w, sample_h)?;
    let sampled = Sampled {
        pixels: &pixels,
        width: sample_w as usize,
    };

    let cells = match algorithm {
        ImageAlgorithm::Block => draw_block(&sampled, cols as usize, rows as usize),
        ImageAlgorithm::Character => {
            draw_character(&sampled, cols as usize, rows as usize, polarity)
        }
        ImageAlgorithm::Braille => draw_braille(&sampled, cols as usize, rows as usize),
    };

    Ok(GlyphGrid {
        width: cols as usize,
        height: rows as usize,
        cells,
    })
}

/// Aspect-preserving grid dimensions: width-constrained first, then
/// re-fit against the height bound; never wider than the source image.
fn grid_size(image_width: u32, image_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let image_ratio = f64::from(image_height) / f64::from(image_width);
    let mut cols = max_width.min(image_width).max(1);
    let mut rows = (image_ratio * f64::from(cols) * GLYPH_ASPECT_CORRECTION).round() as u32;
    if rows > max_height {
        rows = max_height;
        cols = (f64::from(rows) / GLYPH_ASPECT_CORRECTION / image_ratio).round() as u32;
        cols = cols.clamp(1, max_width);
    }
    (cols.max(1), rows.max(1))
}

/// Downsamples to the sampling grid as raw RGBA bytes.
fn resample_rgba(src: &image::DynamicImage, width: u32, height: u32) -> Result<Vec<u8>> {
    use fast_image_resize as fir;

    let rgba = src.to_rgba8();
    if rgba.width() == width && rgba.height() == height {
        return Ok(rgba.into_raw());
    }

    let src_image = fir::images::Image::from_vec_u8(
        rgba.width(),
        rgba.height(),
        rgba.into_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to wrap image buffer")?;
    let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let options = fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Nearest);
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .context("failed to resample image")?;
    Ok(dst_image.into_vec())
}

/// A borrowed RGBA sampling buffer.
struct Sampled<'a> {
    pixels: &'a [u8],
    width: usize,
}

impl Sampled<'_> {
    /// The pixel at (x, y), alpha-composited onto black.
    fn pixel(&self, x: usize, y: usize) -> Rgb {
        let offset = (y * self.width + x) * 4;
        let alpha = u16::from(self.pixels[offset + 3]);
        let blend = |channel: u8| ((u16::from(channel) * alpha) / 255) as u8;
        Rgb::new(
            blend(self.pixels[offset]),
            blend(self.pixels[offset + 1]),
            blend(self.pixels[offset + 2]),
        )
    }

    fn luminance(&self, x: usize, y: usize) -> f64 {
        let Rgb { r, g, b } = self.pixel(x, y);
        0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
    }
}

fn draw_block(sampled: &Sampled, cols: usize, rows: usize) -> Vec<GlyphCell> {
    let mut cells = Vec::with_capacity(cols * rows);
    for y in 0..rows {
        for x in 0..cols {
            let top = sampled.pixel(x, y * 2);
            let bottom = sampled.pixel(x, y * 2 + 1);
            cells.push(GlyphCell {
                glyph: '▀',
                fg: Some(top),
                bg: Some(bottom),
            });
        }
    }
    cells
}

fn draw_character(
    sampled: &Sampled,
    cols: usize,
    rows: usize,
    polarity: SpacePolarity,
) -> Vec<GlyphCell> {
    let top_index = (DENSITY_RAMP.len() - 1) as f64;
    let mut cells = Vec::with_capacity(cols * rows);
    for y in 0..rows {
        for x in 0..cols {
            let level = sampled.luminance(x, y) / 255.0;
            let index = match polarity {
                // Dark regions map to dense glyphs: light backgrounds.
                SpacePolarity::Negative => ((1.0 - level) * top_index).round() as usize,
                SpacePolarity::Positive => (level * top_index).round() as usize,
            };
            let glyph = DENSITY_RAMP[index.min(DENSITY_RAMP.len() - 1)];
            cells.push(GlyphCell {
                glyph,
                fg: (glyph != ' ').then(|| sampled.pixel(x, y)),
                bg: None,
            });
        }
    }
    cells
}

fn draw_braille(sampled: &Sampled, cols: usize, rows: usize) -> Vec<GlyphCell> {
    let mut cells = Vec::with_capacity(cols * rows);
    for y in 0..rows {
        for x in 0..cols {
            // Per-cell brightness cutoff from the mean of the 8 dots.
            let mut total = 0.0;
            for dy in 0..4 {
                for dx in 0..2 {
                    total += sampled.luminance(x * 2 + dx, y * 4 + dy);
                }
            }
            let cutoff = (total / 8.0).clamp(BRAILLE_CUTOFF_MIN, BRAILLE_CUTOFF_MAX);

            let mut bits = 0u8;
            let mut lit = 0u32;
            let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
            for dy in 0..4 {
                for dx in 0..2 {
                    if sampled.luminance(x * 2 + dx, y * 4 + dy) > cutoff {
                        bits |= BRAILLE_BITS[dy][dx];
                        let pixel = sampled.pixel(x * 2 + dx, y * 4 + dy);
                        r += u32::from(pixel.r);
                        g += u32::from(pixel.g);
                        b += u32::from(pixel.b);
                        lit += 1;
                    }
                }
            }
            let glyph = char::from_u32(0x2800 + u32::from(bits)).unwrap_or('⠀');
            let fg = (lit > 0)
                .then(|| Rgb::new((r / lit) as u8, (g / lit) as u8, (b / lit) as u8));
            cells.push(GlyphCell {
                glyph,
                fg,
                bg: None,
            });
        }
    }
    cells
}

/// Converts a grid to a block, merging adjacent cells with identical
/// colors into single spans.
pub fn grid_to_block(grid: &GlyphGrid) -> RenderedBlock {
    let mut lines = Vec::with_capacity(grid.height());
    for row in grid.rows() {
        let mut spans: Vec<StyledSpan> = Vec::new();
        for cell in row {
            let style = Style::Colored {
                fg: cell.fg,
                bg: cell.bg,
            };
            match spans.last_mut() {
                Some(last) if last.style == style => last.text.push(cell.glyph),
                _ => spans.push(StyledSpan::new(cell.glyph.to_string(), style)),
            }
        }
        lines.push(StyledLine { spans });
    }
    RenderedBlock::from_lines(lines)
}

/// Renders an image payload, degrading to the plain-text alternative (or
/// "Image") when the bytes cannot be drawn.
pub fn render_image(
    data: &Data,
    mime: &str,
    width: u32,
    decision: &CapabilityDecision,
) -> RenderedBlock {
    let fallback = data
        .text("text/plain")
        .unwrap_or_else(|| "Image".to_string());

    let Some(encoded) = data.text(mime) else {
        return RenderedBlock::from_text(&fallback, Style::Fallback);
    };
    let stripped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let drawn = BASE64
        .decode(stripped)
        .context("failed to decode image payload")
        .and_then(|bytes| {
            draw(
                &bytes,
                width,
                u32::from(decision.terminal_height),
                decision.image_algorithm,
                decision.space_polarity,
            )
        });
    match drawn {
        Ok(grid) => grid_to_block(&grid),
        Err(error) => {
            tracing::debug!(mime, %error, "image drawing failed, using fallback text");
            RenderedBlock::from_text(&fallback, Style::Fallback)
        }
    }
}
