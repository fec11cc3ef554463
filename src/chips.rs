//! User chips and the chip list panel.

use image::imageops::{FilterType, overlay, resize};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::assets::{ImageStore, MissingAvatars};
use crate::canvas::{CanvasBuilder, Padding, centered_offset};
use crate::error::RenderError;
use crate::mask::round_corner;
use crate::model::{ChipEntries, UserChipInput};
use crate::packing::{Chip, pack_chips, paint_rows};
use crate::text::{GlyphRasterizer, contrast_text_color, render_text, vertical_label};

pub const CHIP_HEIGHT: u32 = 24;
pub const AVATAR_SIZE: u32 = 20;
const CHIP_BACKGROUND: Rgba<u8> = Rgba([189, 189, 189, 255]);
const CHIP_TEXT_SIZE: u32 = 20;
const AVATAR_OFFSET: (u32, u32) = (5, 2);
const NAME_OFFSET_X: u32 = 30;
const NAME_TRAILING_MARGIN: u32 = 15;

/// Content width of a chip list panel, before padding.
pub const CHIP_LIST_WIDTH: u32 = 320;
const CHIP_LIST_MIN_HEIGHT: u32 = 64;
const CHIP_LIST_PADDING: u32 = 10;
const CHIP_ROW_START_X: u32 = 29;
const CHIP_INTERVAL: u32 = 5;
const SIDE_LABEL_SIZE: u32 = 24;
const SIDE_LABEL_X: u32 = 5;
const EMPTY_TEXT_SIZE: u32 = 28;
const PANEL_RADIUS: u32 = 5;

/// Builds one pill-shaped badge: avatar on the left, name on the right.
pub fn user_chip(glyphs: &dyn GlyphRasterizer, avatar: &RgbaImage, display_name: &str) -> Chip {
    let avatar = if avatar.dimensions() == (AVATAR_SIZE, AVATAR_SIZE) {
        avatar.clone()
    } else {
        resize(avatar, AVATAR_SIZE, AVATAR_SIZE, FilterType::CatmullRom)
    };
    let avatar = round_corner(&avatar, None);
    let name = render_text(
        glyphs,
        display_name,
        CHIP_TEXT_SIZE,
        contrast_text_color(CHIP_BACKGROUND),
    );

    let width = NAME_TRAILING_MARGIN + AVATAR_SIZE + name.width();
    let mut chip = RgbaImage::from_pixel(width, CHIP_HEIGHT, CHIP_BACKGROUND);
    overlay(
        &mut chip,
        &avatar,
        i64::from(AVATAR_OFFSET.0),
        i64::from(AVATAR_OFFSET.1),
    );
    overlay(
        &mut chip,
        &name,
        i64::from(NAME_OFFSET_X),
        i64::from(centered_offset(CHIP_HEIGHT, name.height())),
    );
    Chip::new(round_corner(&chip, None))
}

/// Avatar of `user_id`, or a placeholder that gets the id queued for fetching.
pub fn resolve_avatar(
    avatars: &ImageStore,
    missing: &MissingAvatars,
    user_id: &str,
) -> Result<RgbaImage, RenderError> {
    let (avatar, present) = avatars.load_or_placeholder(user_id, (AVATAR_SIZE, AVATAR_SIZE))?;
    if !present {
        missing.record(user_id)?;
    }
    Ok(avatar)
}

/// Chip for one member, recording the id when the avatar is missing.
pub fn chip_for_user(
    glyphs: &dyn GlyphRasterizer,
    avatars: &ImageStore,
    missing: &MissingAvatars,
    input: &UserChipInput,
) -> Result<Chip, RenderError> {
    let avatar = resolve_avatar(avatars, missing, &input.user_id)?;
    Ok(user_chip(glyphs, &avatar, &input.display_name))
}

/// One chip per entry, packed into rows next to a vertical category label.
///
/// An empty `entries` map renders the fixed-size "暂无{category}" panel.
pub fn chip_list(
    glyphs: &dyn GlyphRasterizer,
    avatars: &ImageStore,
    missing: &MissingAvatars,
    entries: &ChipEntries,
    category: &str,
    background: Rgba<u8>,
) -> Result<RgbaImage, RenderError> {
    let text_color = contrast_text_color(background);
    let side_label = render_text(glyphs, &vertical_label(category), SIDE_LABEL_SIZE, text_color);

    if entries.is_empty() {
        return Ok(empty_chip_list(glyphs, &side_label, category, background));
    }

    let chips = UserChipInput::from_entries(entries)
        .par_iter()
        .map(|input| chip_for_user(glyphs, avatars, missing, input))
        .collect::<Result<Vec<_>, RenderError>>()?;

    let rows = pack_chips(chips, CHIP_LIST_WIDTH - CHIP_ROW_START_X, CHIP_INTERVAL);
    let mut canvas = CanvasBuilder::new()
        .background(background)
        .padding(Padding::uniform(CHIP_LIST_PADDING))
        .override_size(Some(CHIP_LIST_WIDTH), Some(CHIP_LIST_MIN_HEIGHT));
    paint_rows(&mut canvas, rows, (CHIP_ROW_START_X, 0));

    // the label is centred on the final height, which only exists once
    // generated
    let mut panel = canvas.generate();
    let label_y = centered_offset(panel.height(), side_label.height());
    overlay(
        &mut panel,
        &side_label,
        i64::from(SIDE_LABEL_X),
        i64::from(label_y),
    );
    Ok(round_corner(&panel, Some(PANEL_RADIUS)))
}

fn empty_chip_list(
    glyphs: &dyn GlyphRasterizer,
    side_label: &RgbaImage,
    category: &str,
    background: Rgba<u8>,
) -> RgbaImage {
    let mut panel = RgbaImage::from_pixel(CHIP_LIST_WIDTH, CHIP_LIST_MIN_HEIGHT, background);
    overlay(
        &mut panel,
        side_label,
        i64::from(SIDE_LABEL_X),
        i64::from(centered_offset(CHIP_LIST_MIN_HEIGHT, side_label.height())),
    );
    let notice = render_text(
        glyphs,
        &format!("暂无{category}"),
        EMPTY_TEXT_SIZE,
        contrast_text_color(background),
    );
    overlay(
        &mut panel,
        &notice,
        i64::from(centered_offset(CHIP_LIST_WIDTH, notice.width())),
        i64::from(centered_offset(CHIP_LIST_MIN_HEIGHT, notice.height())),
    );
    round_corner(&panel, Some(PANEL_RADIUS))
}
