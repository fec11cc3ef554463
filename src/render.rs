//! Panel composers and the render entry points.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{FilterType, crop_imm, overlay, replace, resize};
use image::{ColorType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use log::debug;
use rayon::prelude::*;

use crate::assets::{ImageStore, MissingAvatars};
use crate::canvas::{CanvasBuilder, Padding, centered_offset};
use crate::chips::chip_list;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::mask::round_corner;
use crate::model::{BossStatus, CategorizedChips, ChipEntries, SummaryStat, category_tint};
use crate::text::{BLACK, FontRasterizer, GlyphRasterizer, WHITE, render_text};

pub const PANEL_WIDTH: u32 = 498;
const PANEL_MARGIN: u32 = 10;
const PANEL_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PANEL_TINT: Rgba<u8> = Rgba([249, 251, 231, 255]);

const BOSS_ICON_SIZE: u32 = 128;
const BOSS_ICON_RADIUS: u32 = 10;
const BOSS_NAME_SIZE: u32 = 24;
const HEADER_COLUMN_X: u32 = BOSS_ICON_SIZE + 20;
const HP_BAR_Y: u32 = 44;
const CHIP_LISTS_Y: u32 = 78;

pub const HP_BAR_WIDTH: u32 = 340;
pub const HP_BAR_HEIGHT: u32 = 24;
const HP_BAR_NEUTRAL: Rgba<u8> = Rgba([200, 200, 200, 255]);
const HP_BAR_FILL: Rgba<u8> = Rgba([255, 0, 0, 255]);
const HP_LABEL_SIZE: u32 = 20;

const ROUND_TAG_HEIGHT: u32 = 24;
const ROUND_TAG_MARGIN: u32 = 12;
const ROUND_TAG_COLOR: Rgba<u8> = Rgba([3, 169, 244, 255]);
const ROUND_TAG_TEXT_SIZE: u32 = 20;

const SUMMARY_COLUMN_WIDTH: u32 = 148;
const SUMMARY_TEXT_SIZE: u32 = 24;
const SUMMARY_STAT_TOP: u32 = 15;
const SUMMARY_VALUE_OFFSET: u32 = 34;
const SUMMARY_STAT_PITCH: u32 = 68;
const SUMMARY_VALUE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const SUMMARY_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 0]);

static NEXT_RENDER_ID: AtomicU64 = AtomicU64::new(1);

/// Renders status cards from a font and the local avatar/icon caches.
///
/// Every entry point is a pure function of its arguments and the current
/// contents of the caches, except that missing avatars are recorded in the
/// `missing` accumulator passed by the caller.
pub struct Renderer {
    glyphs: Arc<dyn GlyphRasterizer>,
    avatars: ImageStore,
    icons: ImageStore,
    panels_per_column: Option<usize>,
}

impl Renderer {
    pub fn new(glyphs: Arc<dyn GlyphRasterizer>, avatars: ImageStore, icons: ImageStore) -> Self {
        Self {
            glyphs,
            avatars,
            icons,
            panels_per_column: None,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Result<Self, RenderError> {
        let glyphs = FontRasterizer::from_file(&config.font_path)?;
        Ok(Self::new(
            Arc::new(glyphs),
            ImageStore::avatars(&config.avatar_dir),
            ImageStore::icons(&config.icon_dir),
        )
        .with_panels_per_column(config.panels_per_column))
    }

    /// Wraps combined reports into a new column after `count` segments.
    pub fn with_panels_per_column(mut self, count: Option<usize>) -> Self {
        self.panels_per_column = count.filter(|count| *count > 0);
        self
    }

    fn glyphs(&self) -> &dyn GlyphRasterizer {
        self.glyphs.as_ref()
    }

    /// HP bar with the `current / max` label split in colour at the fill edge.
    ///
    /// # Panics
    ///
    /// Panics if `max_hp` is zero.
    pub fn render_hp_bar(&self, current_hp: i64, max_hp: i64) -> RgbaImage {
        let fill = hp_fill_width(current_hp, max_hp, HP_BAR_WIDTH);
        let mut bar = RgbaImage::from_pixel(HP_BAR_WIDTH, HP_BAR_HEIGHT, HP_BAR_NEUTRAL);
        if fill > 0 {
            draw_filled_rect_mut(
                &mut bar,
                Rect::at(0, 0).of_size(fill, HP_BAR_HEIGHT),
                HP_BAR_FILL,
            );
        }

        let label = format!("{current_hp} / {max_hp}");
        let on_fill = render_text(self.glyphs(), &label, HP_LABEL_SIZE, WHITE);
        let on_neutral = render_text(self.glyphs(), &label, HP_LABEL_SIZE, BLACK);
        let x = centered_offset(HP_BAR_WIDTH, on_fill.width());
        let y = centered_offset(HP_BAR_HEIGHT, on_fill.height());
        let split = i64::from(fill) - i64::from(x);
        let label = split_label(&on_fill, &on_neutral, split);
        overlay(&mut bar, &label, i64::from(x), i64::from(y));

        round_corner(&bar, None)
    }

    pub fn render_round_tag(&self, stage: Option<u32>, round: u32) -> RgbaImage {
        let text = match stage {
            Some(stage) => format!("{stage} 阶段， {round} 周目"),
            None => format!("{round} 周目"),
        };
        let text = render_text(self.glyphs(), &text, ROUND_TAG_TEXT_SIZE, WHITE);
        let mut tag = RgbaImage::from_pixel(
            text.width() + ROUND_TAG_MARGIN * 2,
            ROUND_TAG_HEIGHT,
            ROUND_TAG_COLOR,
        );
        let x = centered_offset(tag.width(), text.width());
        let y = centered_offset(tag.height(), text.height());
        overlay(&mut tag, &text, i64::from(x), i64::from(y));
        round_corner(&tag, None)
    }

    pub fn render_chip_list(
        &self,
        entries: &ChipEntries,
        category: &str,
        background: Rgba<u8>,
        missing: &MissingAvatars,
    ) -> Result<RgbaImage, RenderError> {
        chip_list(
            self.glyphs(),
            &self.avatars,
            missing,
            entries,
            category,
            background,
        )
    }

    fn boss_icon(&self, icon_id: &str) -> Result<RgbaImage, RenderError> {
        let (icon, _) = self
            .icons
            .load_or_placeholder(icon_id, (BOSS_ICON_SIZE, BOSS_ICON_SIZE))?;
        let icon = if icon.dimensions() == (BOSS_ICON_SIZE, BOSS_ICON_SIZE) {
            icon
        } else {
            resize(&icon, BOSS_ICON_SIZE, BOSS_ICON_SIZE, FilterType::CatmullRom)
        };
        Ok(round_corner(&icon, Some(BOSS_ICON_RADIUS)))
    }

    /// Icon, name, round tag and HP bar, followed by one chip list per
    /// category.
    ///
    /// # Panics
    ///
    /// Panics if `boss.max_hp` is zero.
    pub fn render_boss_panel(
        &self,
        boss: &BossStatus,
        background: Rgba<u8>,
        missing: &MissingAvatars,
    ) -> Result<RgbaImage, RenderError> {
        let started_at = Instant::now();
        let mut canvas = CanvasBuilder::new()
            .background(background)
            .override_size(Some(PANEL_WIDTH), None)
            .padding(Padding::new(0, 0, 0, PANEL_MARGIN));

        canvas.composite_alpha(self.boss_icon(&boss.icon_id)?, (PANEL_MARGIN, PANEL_MARGIN));

        let name = render_text(self.glyphs(), &boss.name, BOSS_NAME_SIZE, BLACK);
        let tag_x = HEADER_COLUMN_X + name.width() + PANEL_MARGIN;
        canvas.composite_alpha(name, (HEADER_COLUMN_X, PANEL_MARGIN));
        canvas.composite_alpha(
            self.render_round_tag(boss.stage, boss.round),
            (tag_x, PANEL_MARGIN),
        );
        canvas.composite_alpha(
            self.render_hp_bar(boss.current_hp, boss.max_hp),
            (HEADER_COLUMN_X, HP_BAR_Y),
        );

        let mut y = CHIP_LISTS_Y;
        for (category, entries) in &boss.categorized_chips {
            let list = self.render_chip_list(entries, category, category_tint(category), missing)?;
            let height = list.height();
            canvas.composite_alpha(list, (HEADER_COLUMN_X, y));
            y += height + PANEL_MARGIN;
        }

        let panel = canvas.generate();
        debug!(
            "render boss panel '{}': lists={} size={}x{} total={}ms",
            boss.name,
            boss.categorized_chips.len(),
            panel.width(),
            panel.height(),
            started_at.elapsed().as_millis()
        );
        Ok(panel)
    }

    /// Stat blocks in a narrow left column, chip lists on the right.
    pub fn render_progress_summary(
        &self,
        stats: &[SummaryStat],
        categorized_chips: &CategorizedChips,
        missing: &MissingAvatars,
    ) -> Result<RgbaImage, RenderError> {
        let mut canvas = CanvasBuilder::new()
            .background(SUMMARY_BACKGROUND)
            .override_size(Some(PANEL_WIDTH), None)
            .padding(Padding::new(0, 0, 0, PANEL_MARGIN));

        for (index, stat) in stats.iter().enumerate() {
            let top = SUMMARY_STAT_TOP + index as u32 * SUMMARY_STAT_PITCH;
            let label = render_text(self.glyphs(), &stat.label, SUMMARY_TEXT_SIZE, BLACK);
            let value = render_text(
                self.glyphs(),
                &stat.value,
                SUMMARY_TEXT_SIZE,
                SUMMARY_VALUE_COLOR,
            );
            let label_x = centered_offset(SUMMARY_COLUMN_WIDTH, label.width());
            let value_x = centered_offset(SUMMARY_COLUMN_WIDTH, value.width());
            canvas.composite_alpha(label, (label_x, top));
            canvas.composite_alpha(value, (value_x, top + SUMMARY_VALUE_OFFSET));
        }

        let mut y = PANEL_MARGIN;
        for (category, entries) in categorized_chips {
            let list = self.render_chip_list(entries, category, category_tint(category), missing)?;
            let height = list.height();
            canvas.composite_alpha(list, (SUMMARY_COLUMN_WIDTH, y));
            y += height + PANEL_MARGIN;
        }

        Ok(canvas.generate())
    }

    /// `before`, one panel per boss with alternating tint, then `after`,
    /// stacked top to bottom.
    ///
    /// # Panics
    ///
    /// Panics if any boss has `max_hp` of zero.
    pub fn render_combined_report(
        &self,
        bosses: &[BossStatus],
        before: Option<&RgbaImage>,
        after: Option<&RgbaImage>,
        missing: &MissingAvatars,
    ) -> Result<RgbaImage, RenderError> {
        let render_id = NEXT_RENDER_ID.fetch_add(1, Ordering::Relaxed);
        let started_at = Instant::now();

        let panels = bosses
            .par_iter()
            .enumerate()
            .map(|(index, boss)| {
                let tinted = (index % 2 == 0) == before.is_some();
                let background = if tinted { PANEL_TINT } else { PANEL_BACKGROUND };
                self.render_boss_panel(boss, background, missing)
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        let panels_ms = started_at.elapsed().as_millis();

        let segments = before
            .into_iter()
            .cloned()
            .chain(panels)
            .chain(after.into_iter().cloned());
        let mut canvas = CanvasBuilder::new().background(PANEL_BACKGROUND);
        let positions = stack_in_columns(
            segments,
            self.panels_per_column,
            |segment: &RgbaImage| segment.dimensions(),
        );
        for (segment, position) in positions {
            canvas.paste(segment, position, None);
        }
        let report = canvas.generate();

        log_render_timings(
            render_id,
            &RenderTimings {
                panel_count: bosses.len(),
                panels_ms,
                total_ms: started_at.elapsed().as_millis(),
            },
        );
        Ok(report)
    }
}

#[derive(Debug)]
struct RenderTimings {
    panel_count: usize,
    panels_ms: u128,
    total_ms: u128,
}

fn log_render_timings(render_id: u64, timings: &RenderTimings) {
    debug!(
        "render report #{render_id}: bosses={} total={}ms panels={}ms",
        timings.panel_count, timings.total_ms, timings.panels_ms
    );
}

/// `current / max * width` rounded half to even, clamped to the bar.
///
/// `max_hp` is expected to be positive.
///
/// # Panics
///
/// Panics if `max_hp` is zero.
pub fn hp_fill_width(current_hp: i64, max_hp: i64, width: u32) -> u32 {
    let max_hp = i128::from(max_hp);
    let scaled = i128::from(current_hp) * i128::from(width);
    let mut fill = scaled.div_euclid(max_hp);
    let twice_remainder = scaled.rem_euclid(max_hp) * 2;
    if twice_remainder > max_hp || (twice_remainder == max_hp && fill % 2 != 0) {
        fill += 1;
    }
    fill.clamp(0, i128::from(width)) as u32
}

/// Joins the left `split` columns of `left` with the rest of `right`.
fn split_label(left: &RgbaImage, right: &RgbaImage, split: i64) -> RgbaImage {
    let width = left.width();
    if split >= i64::from(width) {
        return left.clone();
    }
    if split <= 0 {
        return right.clone();
    }
    let split = split as u32;
    let mut label = RgbaImage::new(width, left.height());
    replace(
        &mut label,
        &crop_imm(left, 0, 0, split, left.height()).to_image(),
        0,
        0,
    );
    replace(
        &mut label,
        &crop_imm(right, split, 0, width - split, right.height()).to_image(),
        i64::from(split),
        0,
    );
    label
}

/// Assigns each item a position, top to bottom, starting a new column after
/// `per_column` items.
fn stack_in_columns<T>(
    items: impl IntoIterator<Item = T>,
    per_column: Option<usize>,
    size: impl Fn(&T) -> (u32, u32),
) -> Vec<(T, (u32, u32))> {
    let mut placed = Vec::new();
    let (mut x, mut y) = (0, 0);
    let mut column_width = 0;
    let mut in_column = 0;
    for item in items {
        if per_column.is_some_and(|limit| in_column == limit) {
            x += column_width;
            y = 0;
            column_width = 0;
            in_column = 0;
        }
        let (width, height) = size(&item);
        placed.push((item, (x, y)));
        column_width = column_width.max(width);
        y += height;
        in_column += 1;
    }
    placed
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// JPEG has no alpha; transparent areas come out black.
pub fn encode_jpeg(image: &RgbaImage, jpeg_quality: u8) -> Result<Vec<u8>, RenderError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality);
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8.into(),
    )?;
    Ok(jpeg)
}
