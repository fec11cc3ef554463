//! Deterministic glyphs for tests, so no font file is needed.

use std::sync::Mutex;

use image::{Rgba, RgbaImage};

use crate::text::{GlyphRasterizer, LineRaster};

/// Draws every visible character as a solid box.
#[derive(Debug, Default)]
pub struct BlockGlyphs {
    seen: Mutex<Vec<String>>,
}

impl BlockGlyphs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(size: u32) -> u32 {
        size * 3 / 5
    }

    fn ink_width(size: u32) -> u32 {
        Self::advance(size) - size / 10
    }

    fn ink_top(size: u32) -> u32 {
        size / 5
    }

    fn ink_height(size: u32) -> u32 {
        size * 3 / 4
    }

    /// Ink extents of `text` as a single line.
    pub fn line_size(&self, text: &str, size: u32) -> (u32, u32) {
        let inked: Vec<u32> = text
            .chars()
            .enumerate()
            .filter(|(_, ch)| !ch.is_whitespace())
            .map(|(index, _)| index as u32)
            .collect();
        match (inked.first(), inked.last()) {
            (Some(first), Some(last)) => (
                (last - first) * Self::advance(size) + Self::ink_width(size),
                Self::ink_height(size),
            ),
            _ => (0, 0),
        }
    }

    /// Every line passed to the rasterizer so far.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl GlyphRasterizer for BlockGlyphs {
    fn rasterize_line(&self, text: &str, size: u32, color: Rgba<u8>) -> LineRaster {
        self.seen.lock().unwrap().push(text.to_string());
        let (width, height) = self.line_size(text, size);
        if width == 0 {
            return LineRaster::empty();
        }
        let first = text
            .chars()
            .position(|ch| !ch.is_whitespace())
            .unwrap_or(0) as u32;
        let mut block = RgbaImage::new(width, height);
        for (index, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x0 = (index as u32 - first) * Self::advance(size);
            for x in x0..x0 + Self::ink_width(size) {
                for y in 0..height {
                    block.put_pixel(x, y, color);
                }
            }
        }
        LineRaster {
            block,
            top: Self::ink_top(size) as i32,
        }
    }
}
