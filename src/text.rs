//! Text blocks.
//!
//! Every piece of text on a card is rendered into its own tightly cropped
//! transparent block, which composers then position like any other image.

use std::fs;
use std::path::Path;

use ab_glyph::{Font, FontArc, GlyphId, OutlinedGlyph, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

use crate::canvas::CanvasBuilder;
use crate::error::RenderError;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// One rasterized line of text.
#[derive(Clone, Debug)]
pub struct LineRaster {
    /// Pixels cropped to the ink bounding box.
    pub block: RgbaImage,
    /// Distance from the top of the line box to the top of `block`.
    pub top: i32,
}

impl LineRaster {
    pub fn empty() -> Self {
        Self {
            block: RgbaImage::new(0, 0),
            top: 0,
        }
    }
}

pub trait GlyphRasterizer: Send + Sync {
    /// Rasterizes a single line at `size` px. The returned block must be cropped
    /// to the ink, so a string without visible glyphs yields an empty block.
    fn rasterize_line(&self, text: &str, size: u32, color: Rgba<u8>) -> LineRaster;
}

/// `ab_glyph` backed rasterizer for a single typeface.
#[derive(Clone)]
pub struct FontRasterizer {
    font: FontArc,
}

impl FontRasterizer {
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| RenderError::FontLoad {
            path: path.to_path_buf(),
        })?;
        Ok(Self { font })
    }

    pub fn from_font(font: FontArc) -> Self {
        Self { font }
    }

    fn layout(&self, text: &str, scale: PxScale) -> Vec<OutlinedGlyph> {
        let scaled = self.font.as_scaled(scale);
        let mut caret = 0.0_f32;
        let mut previous: Option<GlyphId> = None;
        let mut outlined = Vec::new();
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            let id = scaled.glyph_id(ch);
            if let Some(previous) = previous {
                caret += scaled.kern(previous, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
            caret += scaled.h_advance(id);
            previous = Some(id);
            if let Some(glyph) = self.font.outline_glyph(glyph) {
                outlined.push(glyph);
            }
        }
        outlined
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize_line(&self, text: &str, size: u32, color: Rgba<u8>) -> LineRaster {
        let glyphs = self.layout(text, PxScale::from(size as f32));
        let Some(bounds) = glyphs.iter().map(OutlinedGlyph::px_bounds).reduce(|a, b| {
            ab_glyph::Rect {
                min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
                max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
            }
        }) else {
            return LineRaster::empty();
        };

        let left = bounds.min.x.floor() as i32;
        let top = bounds.min.y.floor() as i32;
        let width = (bounds.max.x.ceil() as i32 - left).max(0) as u32;
        let height = (bounds.max.y.ceil() as i32 - top).max(0) as u32;
        let mut block = RgbaImage::new(width, height);

        for glyph in &glyphs {
            let glyph_bounds = glyph.px_bounds();
            let origin_x = glyph_bounds.min.x as i32 - left;
            let origin_y = glyph_bounds.min.y as i32 - top;
            glyph.draw(|gx, gy, coverage| {
                let x = origin_x + gx as i32;
                let y = origin_y + gy as i32;
                if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * f32::from(color[3])).round() as u8;
                let pixel = block.get_pixel_mut(x as u32, y as u32);
                if alpha > pixel[3] {
                    *pixel = Rgba([color[0], color[1], color[2], alpha]);
                }
            });
        }

        LineRaster { block, top }
    }
}

/// Gap between stacked rows of multi-line text.
pub fn line_gap(size: u32) -> u32 {
    (size + 1) / 3
}

/// Renders `text` into a tightly cropped transparent block.
///
/// Text containing `\n` is stacked one row per segment at a fixed pitch of
/// `size + line_gap(size)`. An empty string gives a 0x0 block.
pub fn render_text(
    rasterizer: &dyn GlyphRasterizer,
    text: &str,
    size: u32,
    color: Rgba<u8>,
) -> RgbaImage {
    if !text.contains('\n') {
        return rasterizer.rasterize_line(text, size, color).block;
    }

    let rows: Vec<LineRaster> = text
        .split('\n')
        .map(|line| rasterizer.rasterize_line(line, size, color))
        .collect();
    let pitch = (size + line_gap(size)) as i64;
    let first_top = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.block.width() > 0)
        .map(|(index, row)| index as i64 * pitch + i64::from(row.top))
        .min();
    let Some(first_top) = first_top else {
        return RgbaImage::new(0, 0);
    };

    let mut canvas = CanvasBuilder::new().background(Rgba([0, 0, 0, 0]));
    for (index, row) in rows.into_iter().enumerate() {
        if row.block.width() == 0 {
            continue;
        }
        let y = index as i64 * pitch + i64::from(row.top) - first_top;
        canvas.composite_alpha(row.block, (0, y as u32));
    }
    canvas.generate()
}

/// Side-label form of `text`: one character per row.
pub fn vertical_label(text: &str) -> String {
    text.chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join("\n")
}

/// White or black, whichever reads better on `background`.
pub fn contrast_text_color(background: Rgba<u8>) -> Rgba<u8> {
    let luminance = f32::from(background[0]) * 0.299
        + f32::from(background[1]) * 0.587
        + f32::from(background[2]) * 0.114;
    if luminance / 255.0 < 0.5 { WHITE } else { BLACK }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BlockGlyphs;

    #[test]
    fn single_line_is_cropped_to_ink() {
        let glyphs = BlockGlyphs::new();
        let block = render_text(&glyphs, "ab", 20, BLACK);
        assert_eq!(block.dimensions(), glyphs.line_size("ab", 20));
        assert_eq!(block.get_pixel(0, 0), &BLACK);
    }

    #[test]
    fn empty_text_gives_empty_block() {
        let glyphs = BlockGlyphs::new();
        assert_eq!(render_text(&glyphs, "", 20, BLACK).dimensions(), (0, 0));
        assert_eq!(render_text(&glyphs, "\n", 20, BLACK).dimensions(), (0, 0));
    }

    #[test]
    fn rows_stack_at_fixed_pitch() {
        let glyphs = BlockGlyphs::new();
        let block = render_text(&glyphs, "预\n约", 24, WHITE);
        let (glyph_width, glyph_height) = glyphs.line_size("预", 24);
        // second row starts one pitch below the first
        assert_eq!(block.width(), glyph_width);
        assert_eq!(block.height(), 24 + line_gap(24) + glyph_height);
        let gap_row = glyph_height + 1;
        assert_eq!(block.get_pixel(0, gap_row)[3], 0);
        assert_eq!(block.get_pixel(0, 24 + line_gap(24)), &WHITE);
    }

    fn bundled_font_path() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/fonts/DejaVuSans.ttf")
    }

    /// Ink presence on the top, bottom, left and right edge.
    fn inked_edges(block: &RgbaImage) -> [bool; 4] {
        let (width, height) = block.dimensions();
        let inked = |x: u32, y: u32| block.get_pixel(x, y)[3] > 0;
        [
            (0..width).any(|x| inked(x, 0)),
            (0..width).any(|x| inked(x, height - 1)),
            (0..height).any(|y| inked(0, y)),
            (0..height).any(|y| inked(width - 1, y)),
        ]
    }

    #[test]
    fn font_line_is_cropped_to_ink() {
        let font = FontRasterizer::from_file(&bundled_font_path()).unwrap();
        let block = render_text(&font, "50 / 100", 20, BLACK);
        assert!(block.width() > 0 && block.height() > 0);
        assert_eq!(inked_edges(&block), [true; 4]);

        let line = font.rasterize_line("50 / 100", 20, BLACK);
        assert!(line.top > 0);
        assert_eq!(line.block, block);
    }

    #[test]
    fn font_rows_keep_their_glyph_offsets() {
        let bytes = std::fs::read(bundled_font_path()).unwrap();
        let font = FontRasterizer::from_font(FontArc::try_from_vec(bytes).unwrap());
        let first = font.rasterize_line("a", 20, BLACK);
        let second = font.rasterize_line("bb", 20, BLACK);

        let stacked = render_text(&font, "a\nbb", 20, BLACK);

        assert_eq!(inked_edges(&stacked), [true; 4]);
        assert_eq!(
            stacked.width(),
            first.block.width().max(second.block.width())
        );
        // "b" rises above the x-height of "a", so the block starts at the
        // top of "a" and the second row is shifted by the difference
        let pitch = (20 + line_gap(20)) as i32;
        assert!(second.top < first.top);
        assert_eq!(
            stacked.height() as i32,
            pitch + second.top + second.block.height() as i32 - first.top
        );
    }

    #[test]
    fn font_whitespace_has_no_ink() {
        let font = FontRasterizer::from_file(&bundled_font_path()).unwrap();
        assert_eq!(render_text(&font, "   ", 20, BLACK).dimensions(), (0, 0));
    }

    #[test]
    fn unusable_font_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.ttf");
        assert!(matches!(
            FontRasterizer::from_file(&missing),
            Err(RenderError::Io { .. })
        ));

        let garbage = dir.path().join("garbage.ttf");
        std::fs::write(&garbage, b"not a font").unwrap();
        assert!(matches!(
            FontRasterizer::from_file(&garbage),
            Err(RenderError::FontLoad { .. })
        ));
    }

    #[test]
    fn vertical_label_puts_each_char_on_its_own_row() {
        assert_eq!(vertical_label("挂树"), "挂\n树");
        assert_eq!(vertical_label(""), "");
    }

    #[test]
    fn contrast_color_follows_luminance() {
        assert_eq!(contrast_text_color(Rgba([189, 189, 189, 255])), BLACK);
        assert_eq!(contrast_text_color(Rgba([3, 20, 60, 255])), WHITE);
    }

    #[test]
    fn line_gap_is_a_third_of_the_size() {
        assert_eq!(line_gap(24), 8);
        assert_eq!(line_gap(20), 7);
        assert_eq!(line_gap(28), 9);
    }
}
