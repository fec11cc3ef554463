//! Chip packing.
//!
//! Chips of different widths are arranged into as few rows as a greedy
//! long/short heuristic manages: every row opens with the widest chip left and
//! is then topped up with the widest chips that still fit. This is a
//! heuristic, not an optimal bin packer.

use image::RgbaImage;

use crate::canvas::CanvasBuilder;

/// A rendered badge. Only its width matters for packing.
#[derive(Clone, Debug)]
pub struct Chip {
    pub block: RgbaImage,
}

impl Chip {
    pub fn new(block: RgbaImage) -> Self {
        Self { block }
    }

    pub fn width(&self) -> u32 {
        self.block.width()
    }

    pub fn height(&self) -> u32 {
        self.block.height()
    }
}

#[derive(Clone, Debug)]
pub struct Row {
    pub chips: Vec<Chip>,
    interval: u32,
}

impl Row {
    pub fn width(&self) -> u32 {
        row_width(self.chips.iter().map(Chip::width), self.interval)
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }
}

/// `sum(widths) + (count - 1) * interval`.
pub fn row_width(widths: impl IntoIterator<Item = u32>, interval: u32) -> u32 {
    let (total, count) = widths
        .into_iter()
        .fold((0_u32, 0_u32), |(total, count), width| (total + width, count + 1));
    total + count.saturating_sub(1) * interval
}

pub fn pack_chips(chips: Vec<Chip>, max_row_width: u32, interval: u32) -> Vec<Row> {
    pack_by_width(chips, max_row_width, interval, Chip::width)
        .into_iter()
        .map(|chips| Row { chips, interval })
        .collect()
}

/// Packs `items` into rows no wider than `max_row_width`.
///
/// A single item wider than the limit gets a row of its own. Among items of
/// equal width the earlier one in `items` is treated as the wider.
pub fn pack_by_width<T>(
    mut items: Vec<T>,
    max_row_width: u32,
    interval: u32,
    width: impl Fn(&T) -> u32,
) -> Vec<Vec<T>> {
    // Ascending, so `pop` yields the widest and index 0 the narrowest. Reversing
    // after a stable sort keeps equal widths in input order when popped.
    items.reverse();
    items.sort_by_key(|item| width(item));

    let mut rows = Vec::new();
    while let Some(widest) = items.pop() {
        let mut current = width(&widest) + interval;
        let mut row = vec![widest];

        while let Some(narrowest) = items.first() {
            if current + width(narrowest) > max_row_width {
                break;
            }
            // the widest pending item opens the next row, so it only joins
            // this one when it is the last item left
            let candidates = if items.len() > 1 {
                items.len() - 1
            } else {
                1
            };
            let fitting = items[..candidates]
                .partition_point(|item| current + width(item) < max_row_width);
            if fitting == 0 {
                break;
            }
            let picked = items.remove(fitting - 1);
            current += width(&picked) + interval;
            row.push(picked);
        }

        rows.push(row);
    }
    rows
}

/// Paints packed rows left to right, one row every `chip_height + interval`
/// px, starting at `origin`.
pub fn paint_rows(canvas: &mut CanvasBuilder, rows: Vec<Row>, origin: (u32, u32)) {
    let chip_height = rows
        .iter()
        .flat_map(|row| row.chips.iter().map(Chip::height))
        .max()
        .unwrap_or(0);
    for (index, row) in rows.into_iter().enumerate() {
        let pitch = chip_height + row.interval;
        let y = origin.1 + index as u32 * pitch;
        let mut x = origin.0;
        for chip in row.chips {
            let width = chip.width();
            canvas.composite_alpha(chip.block, (x, y));
            x += width + row.interval;
        }
    }
}
