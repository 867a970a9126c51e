use bytemuck::{Pod, Zeroable};
use glam::UVec2;

use crate::CheckerboardMode;

/// Reservoirs are stored in square tiles so that one compute workgroup
/// touches one contiguous range of the buffer.
pub const RESERVOIR_BLOCK_SIZE: u32 = 16;

/// Pitches of a tiled reservoir buffer; computed once by the host and shared
/// with every pass touching the buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ReservoirBufferParams {
    pub block_row_pitch: u32,
    pub array_pitch: u32,
}

impl ReservoirBufferParams {
    pub fn new(
        render_width: u32,
        render_height: u32,
        checkerboard: CheckerboardMode,
    ) -> Self {
        let width = if checkerboard == CheckerboardMode::Off {
            render_width
        } else {
            render_width.div_ceil(2)
        };

        let width_blocks = width.div_ceil(RESERVOIR_BLOCK_SIZE);
        let height_blocks = render_height.div_ceil(RESERVOIR_BLOCK_SIZE);

        let block_row_pitch =
            width_blocks * RESERVOIR_BLOCK_SIZE * RESERVOIR_BLOCK_SIZE;

        Self {
            block_row_pitch,
            array_pitch: block_row_pitch * height_blocks,
        }
    }

    /// Linear element offset of the given reservoir coordinate within the
    /// given array slice.
    pub fn offset(&self, pos: UVec2, slice: u32) -> usize {
        let block = pos / RESERVOIR_BLOCK_SIZE;
        let within = pos % RESERVOIR_BLOCK_SIZE;

        (slice * self.array_pitch
            + block.y * self.block_row_pitch
            + block.x * RESERVOIR_BLOCK_SIZE * RESERVOIR_BLOCK_SIZE
            + within.y * RESERVOIR_BLOCK_SIZE
            + within.x) as usize
    }
}
