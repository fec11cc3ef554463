//! Deferred-size canvas.
//!
//! [`CanvasBuilder`] records composite and paste operations against relative
//! coordinates and only allocates the real surface in
//! [`CanvasBuilder::generate`]. The canvas size is therefore a function of
//! everything that was queued, which is what row-based panels with an unknown
//! number of rows need.

use image::imageops::{overlay, replace};
use image::{GrayImage, Rgba, RgbaImage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpKind {
    CompositeAlpha,
    Paste,
}

#[derive(Clone, Debug)]
struct CanvasOp {
    kind: OpKind,
    block: RgbaImage,
    position: (u32, u32),
    mask: Option<GrayImage>,
}

/// Extra space around the content, applied at generate time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Padding {
    pub const fn uniform(value: u32) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }

    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CanvasBuilder {
    ops: Vec<CanvasOp>,
    used_width: u32,
    used_height: u32,
    background: Rgba<u8>,
    padding: Padding,
    override_size: (Option<u32>, Option<u32>),
}

impl Default for CanvasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasBuilder {
    /// An empty builder with an opaque white background.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            used_width: 0,
            used_height: 0,
            background: Rgba([255, 255, 255, 255]),
            padding: Padding::default(),
            override_size: (None, None),
        }
    }

    pub fn background(mut self, color: Rgba<u8>) -> Self {
        self.background = color;
        self
    }

    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Minimum content size per axis, not counting padding. `None` leaves that
    /// axis driven by the queued content alone.
    pub fn override_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.override_size = (width, height);
        self
    }

    /// Queues `block` to be blended source-over onto the canvas.
    pub fn composite_alpha(&mut self, block: RgbaImage, position: (u32, u32)) {
        self.push(CanvasOp {
            kind: OpKind::CompositeAlpha,
            block,
            position,
            mask: None,
        });
    }

    /// Queues `block` to replace the destination pixels. With a mask the
    /// replacement is weighted by the mask value per pixel.
    ///
    /// # Panics
    ///
    /// Panics if `mask` is not the same size as `block`.
    pub fn paste(&mut self, block: RgbaImage, position: (u32, u32), mask: Option<GrayImage>) {
        if let Some(mask) = &mask {
            assert_eq!(
                mask.dimensions(),
                block.dimensions(),
                "paste mask must match the block size"
            );
        }
        self.push(CanvasOp {
            kind: OpKind::Paste,
            block,
            position,
            mask,
        });
    }

    fn push(&mut self, op: CanvasOp) {
        self.used_width = self
            .used_width
            .max(op.position.0.saturating_add(op.block.width()));
        self.used_height = self
            .used_height
            .max(op.position.1.saturating_add(op.block.height()));
        self.ops.push(op);
    }

    /// Offset that centers `block` inside the extent used so far. Padding and
    /// override size are not taken into account.
    pub fn center(&self, block: &RgbaImage) -> (u32, u32) {
        (
            centered_offset(self.used_width, block.width()),
            centered_offset(self.used_height, block.height()),
        )
    }

    pub fn used_width(&self) -> u32 {
        self.used_width
    }

    pub fn used_height(&self) -> u32 {
        self.used_height
    }

    /// Size of the surface `generate` will allocate.
    pub fn size(&self) -> (u32, u32) {
        let (override_width, override_height) = self.override_size;
        let content_width = override_width.map_or(self.used_width, |w| w.max(self.used_width));
        let content_height = override_height.map_or(self.used_height, |h| h.max(self.used_height));
        (
            content_width + self.padding.left + self.padding.right,
            content_height + self.padding.top + self.padding.bottom,
        )
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Allocates the canvas and replays every queued operation in insertion
    /// order. Operations are not consumed, so repeated calls give the same
    /// image.
    pub fn generate(&self) -> RgbaImage {
        let (width, height) = self.size();
        let mut canvas = RgbaImage::from_pixel(width, height, self.background);
        for op in &self.ops {
            let x = i64::from(op.position.0) + i64::from(self.padding.left);
            let y = i64::from(op.position.1) + i64::from(self.padding.top);
            match (op.kind, &op.mask) {
                (OpKind::CompositeAlpha, _) => overlay(&mut canvas, &op.block, x, y),
                (OpKind::Paste, None) => replace(&mut canvas, &op.block, x, y),
                (OpKind::Paste, Some(mask)) => paste_with_mask(&mut canvas, &op.block, mask, x, y),
            }
        }
        canvas
    }
}

/// Rounded offset that centers a span of `inner` inside `outer`, clamped to 0.
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    let diff = i64::from(outer) - i64::from(inner);
    if diff <= 0 {
        0
    } else {
        // halves round up
        ((diff + 1) / 2) as u32
    }
}

/// Per-channel `src * m + dst * (1 - m)` for every pixel of `block` that lands
/// on the canvas.
pub(crate) fn paste_with_mask(
    canvas: &mut RgbaImage,
    block: &RgbaImage,
    mask: &GrayImage,
    x: i64,
    y: i64,
) {
    let canvas_width = i64::from(canvas.width());
    let canvas_height = i64::from(canvas.height());
    for (bx, by, src) in block.enumerate_pixels() {
        let cx = x + i64::from(bx);
        let cy = y + i64::from(by);
        if cx < 0 || cy < 0 || cx >= canvas_width || cy >= canvas_height {
            continue;
        }
        let weight = u32::from(mask.get_pixel(bx, by)[0]);
        let dst = canvas.get_pixel_mut(cx as u32, cy as u32);
        for channel in 0..4 {
            dst[channel] = blend_channel(src[channel], dst[channel], weight);
        }
    }
}

pub(crate) fn blend_channel(src: u8, dst: u8, weight: u32) -> u8 {
    let value = u32::from(src) * weight + u32::from(dst) * (255 - weight);
    ((value + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn extents_track_the_furthest_operation() {
        let mut canvas = CanvasBuilder::new();
        assert!(canvas.is_empty());
        let steps = [
            ((0, 0), (10, 4)),
            ((5, 20), (3, 3)),
            ((2, 1), (4, 4)),
            ((40, 0), (1, 1)),
        ];
        let mut expected = (0, 0);
        for (position, (w, h)) in steps {
            canvas.composite_alpha(solid(w, h, [0, 0, 0, 255]), position);
            expected.0 = u32::max(expected.0, position.0 + w);
            expected.1 = u32::max(expected.1, position.1 + h);
            assert_eq!((canvas.used_width(), canvas.used_height()), expected);
        }
        canvas.paste(solid(2, 50, [0, 0, 0, 255]), (0, 0), None);
        assert_eq!((canvas.used_width(), canvas.used_height()), (41, 50));
        assert_eq!(canvas.len(), 5);
        assert!(!canvas.is_empty());
    }

    #[test]
    #[should_panic(expected = "paste mask must match the block size")]
    fn mismatched_paste_mask_panics() {
        let mut canvas = CanvasBuilder::new();
        canvas.paste(solid(4, 4, [0, 0, 0, 255]), (0, 0), Some(GrayImage::new(3, 4)));
    }

    #[test]
    fn padding_and_override_compose_per_axis() {
        let mut canvas = CanvasBuilder::new()
            .padding(Padding::new(1, 2, 3, 4))
            .override_size(Some(100), None);
        canvas.composite_alpha(solid(30, 20, [0, 0, 0, 255]), (5, 5));
        assert_eq!(canvas.size(), (104, 31));
        assert_eq!(canvas.generate().dimensions(), (104, 31));

        let canvas = canvas.override_size(Some(10), Some(60));
        assert_eq!(canvas.size(), (39, 66));
    }

    #[test]
    fn operations_are_shifted_by_padding() {
        let mut canvas = CanvasBuilder::new()
            .background(Rgba([0, 0, 0, 0]))
            .padding(Padding::new(3, 2, 0, 0));
        canvas.composite_alpha(solid(1, 1, [9, 9, 9, 255]), (0, 0));
        let image = canvas.generate();
        assert_eq!(image.get_pixel(3, 2), &Rgba([9, 9, 9, 255]));
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn generate_is_repeatable() {
        let mut canvas = CanvasBuilder::new().padding(Padding::uniform(2));
        canvas.composite_alpha(solid(6, 6, [255, 0, 0, 128]), (0, 0));
        canvas.paste(solid(4, 4, [0, 0, 255, 255]), (3, 3), None);
        canvas.composite_alpha(solid(5, 2, [0, 255, 0, 60]), (1, 4));
        assert_eq!(canvas.generate(), canvas.generate());
    }

    #[test]
    fn composite_blends_and_paste_replaces() {
        let mut canvas = CanvasBuilder::new().background(Rgba([255, 255, 255, 255]));
        canvas.composite_alpha(solid(1, 1, [0, 0, 0, 0]), (0, 0));
        canvas.paste(solid(1, 1, [0, 0, 0, 0]), (1, 0), None);
        let image = canvas.generate();
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn paste_order_follows_insertion_order() {
        let mut canvas = CanvasBuilder::new();
        canvas.paste(solid(2, 2, [10, 10, 10, 255]), (0, 0), None);
        canvas.composite_alpha(solid(2, 2, [20, 20, 20, 255]), (0, 0));
        assert_eq!(canvas.generate().get_pixel(1, 1), &Rgba([20, 20, 20, 255]));
    }

    #[test]
    fn masked_paste_weights_by_mask() {
        let mut canvas = CanvasBuilder::new().background(Rgba([0, 0, 0, 255]));
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(0, 0, image::Luma([0]));
        mask.put_pixel(1, 0, image::Luma([255]));
        mask.put_pixel(2, 0, image::Luma([128]));
        canvas.paste(solid(3, 1, [200, 200, 200, 255]), (0, 0), Some(mask));
        let image = canvas.generate();
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([200, 200, 200, 255]));
        assert_eq!(image.get_pixel(2, 0), &Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn center_uses_current_extent() {
        let mut canvas = CanvasBuilder::new().padding(Padding::uniform(50));
        canvas.composite_alpha(solid(20, 10, [0, 0, 0, 255]), (0, 0));
        assert_eq!(canvas.center(&solid(10, 5, [0, 0, 0, 0])), (5, 3));
        assert_eq!(canvas.center(&solid(30, 30, [0, 0, 0, 0])), (0, 0));
    }
}
