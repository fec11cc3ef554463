//! Rounded corners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use image::imageops::{crop_imm, replace, thumbnail};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;

use crate::canvas::blend_channel;

const CIRCLE_OVERSAMPLE: u32 = 5;
const MASK_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 0]);

static CIRCLE_MASK_CACHE: OnceLock<Mutex<HashMap<u32, Arc<GrayImage>>>> = OnceLock::new();

/// Rounds the corners of `block`.
///
/// With `radius == None` the ends become semicircles whose diameter is the
/// block height (a pill). Otherwise each corner is cut with a quarter circle of
/// `radius`. The output has the same size as the input.
pub fn round_corner(block: &RgbaImage, radius: Option<u32>) -> RgbaImage {
    let (width, height) = block.dimensions();
    if width == 0 || height == 0 {
        return block.clone();
    }
    let mask = corner_mask(width, height, radius);

    let mut rounded = RgbaImage::from_pixel(width, height, MASK_BACKGROUND);
    for (x, y, pixel) in rounded.enumerate_pixels_mut() {
        let weight = u32::from(mask.get_pixel(x, y)[0]);
        let source = block.get_pixel(x, y);
        for channel in 0..4 {
            pixel[channel] = blend_channel(source[channel], pixel[channel], weight);
        }
    }
    rounded
}

fn corner_mask(width: u32, height: u32, radius: Option<u32>) -> GrayImage {
    let mut mask = GrayImage::from_pixel(width, height, Luma([255]));
    match radius {
        None => {
            let circle = circle_mask(height);
            let split = (height + 1) / 2;
            let left = crop_imm(&*circle, 0, 0, split, height).to_image();
            let right = crop_imm(&*circle, split, 0, height - split, height).to_image();
            replace(&mut mask, &left, 0, 0);
            replace(
                &mut mask,
                &right,
                i64::from(width) - i64::from(right.width()),
                0,
            );
        }
        Some(0) => {}
        Some(radius) => {
            let circle = circle_mask(radius * 2);
            let quadrant = |x: u32, y: u32| crop_imm(&*circle, x, y, radius, radius).to_image();
            let far_x = i64::from(width) - i64::from(radius);
            let far_y = i64::from(height) - i64::from(radius);
            replace(&mut mask, &quadrant(0, 0), 0, 0);
            replace(&mut mask, &quadrant(radius, 0), far_x, 0);
            replace(&mut mask, &quadrant(0, radius), 0, far_y);
            replace(&mut mask, &quadrant(radius, radius), far_x, far_y);
        }
    }
    mask
}

/// Anti-aliased filled circle of `diameter` px, drawn oversampled and box
/// filtered down.
fn circle_mask(diameter: u32) -> Arc<GrayImage> {
    let cache = CIRCLE_MASK_CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    if let Some(existing) = cache
        .lock()
        .expect("circle mask cache poisoned")
        .get(&diameter)
    {
        return existing.clone();
    }

    let large = diameter * CIRCLE_OVERSAMPLE;
    let mut oversampled = GrayImage::new(large, large);
    let center = (large / 2) as i32;
    let radius = (large / 2) as i32;
    draw_filled_ellipse_mut(&mut oversampled, (center, center), radius, radius, Luma([255]));
    let circle = Arc::new(thumbnail(&oversampled, diameter, diameter));

    let mut guard = cache.lock().expect("circle mask cache poisoned");
    let entry = guard.entry(diameter).or_insert_with(|| circle.clone());
    entry.clone()
}
