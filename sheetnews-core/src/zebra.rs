//! Alternating background blocks, one per run of equal week numbers

use serde::Serialize;

/// First sheet row holding data (row 1 is the header)
pub const FIRST_DATA_ROW: u32 = 2;

/// Contiguous rows sharing one week, in 1-based sheet coordinates (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZebraBlock {
    pub start_row: u32,
    pub end_row: u32,
    /// Index into the palette
    pub color: usize,
}

impl ZebraBlock {
    pub fn row_count(&self) -> u32 {
        self.end_row - self.start_row + 1
    }
}

/// Compute zebra blocks over an already sorted week column.
///
/// A new block starts whenever the value differs from the previous row, and
/// the colour advances once per block. Blocks cover rows 2..=N+1 without gaps.
pub fn zebra_blocks<T: PartialEq>(weeks: &[T], palette_len: usize) -> Vec<ZebraBlock> {
    if weeks.is_empty() || palette_len == 0 {
        return Vec::new();
    }

    let mut blocks = Vec::new();
    let mut block_start = FIRST_DATA_ROW;
    let mut color = 0usize;

    for (offset, pair) in weeks.windows(2).enumerate() {
        if pair[0] != pair[1] {
            // pair[1] sits at sheet row FIRST_DATA_ROW + offset + 1
            let end_row = FIRST_DATA_ROW + offset as u32;
            blocks.push(ZebraBlock {
                start_row: block_start,
                end_row,
                color,
            });
            block_start = end_row + 1;
            color = (color + 1) % palette_len;
        }
    }

    blocks.push(ZebraBlock {
        start_row: block_start,
        end_row: FIRST_DATA_ROW + weeks.len() as u32 - 1,
        color,
    });

    blocks
}
