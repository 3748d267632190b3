//! Text overlay layer (§4.5: "text overlay", back layer of the compositor
//! stack). Fonts come from the session's Media Bank (tagged `fonts` or
//! `both`) and are handed to this module as already-loaded bytes — file
//! I/O itself is the bin crate's `FileReader` collaborator, not this
//! crate's concern.

use fontdue::{Font, FontSettings};

use crate::{RenderError, Result};

/// A rasterized line of text, ready to upload as an RGBA texture.
pub struct RasterizedText {
    /// Tightly-packed RGBA8 pixel data, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
}

/// Loads a font and rasterizes single lines of text into RGBA bitmaps for
/// the compositor's text overlay layer.
pub struct TextRenderer {
    font: Font,
}

impl TextRenderer {
    /// Parse font bytes (TTF/OTF) already read from the Media Bank.
    pub fn load(font_bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|e| RenderError::Device(format!("font load failed: {e}")))?;
        Ok(Self { font })
    }

    /// Rasterize a single line of `text` at `px` font size, tinted `color`
    /// (straight RGBA, no premultiplication) via glyph coverage alpha.
    pub fn rasterize_line(&self, text: &str, px: f32, color: [u8; 4]) -> RasterizedText {
        if text.is_empty() {
            return RasterizedText {
                pixels: Vec::new(),
                width: 0,
                height: 0,
            };
        }

        let glyphs: Vec<_> = text
            .chars()
            .map(|c| (c, self.font.rasterize(c, px)))
            .collect();

        let ascent = self
            .font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent)
            .unwrap_or(px);

        let total_width: i32 = glyphs
            .iter()
            .map(|(_, (metrics, _))| metrics.advance_width.ceil() as i32)
            .sum();
        let height = px.ceil() as u32 + 2;
        let width = total_width.max(1) as u32;

        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        let mut cursor_x = 0i32;

        for (_, (metrics, bitmap)) in &glyphs {
            let glyph_top = ascent as i32 - metrics.ymin - metrics.height as i32;
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let px_x = cursor_x + metrics.xmin + gx as i32;
                    let px_y = glyph_top + gy as i32;
                    if px_x < 0 || px_y < 0 || px_x as u32 >= width || px_y as u32 >= height {
                        continue;
                    }
                    let idx = (px_y as u32 * width + px_x as u32) as usize * 4;
                    let alpha = (coverage as u32 * color[3] as u32 / 255) as u8;
                    pixels[idx] = color[0];
                    pixels[idx + 1] = color[1];
                    pixels[idx + 2] = color[2];
                    pixels[idx + 3] = pixels[idx + 3].max(alpha);
                }
            }
            cursor_x += metrics.advance_width.ceil() as i32;
        }

        RasterizedText {
            pixels,
            width,
            height,
        }
    }
}

// Rasterization itself isn't unit-tested here: exercising it needs a real
// embedded TTF, which this crate doesn't bundle — the same reasoning the
// FFmpeg decoder documents for skipping decode-path tests.
