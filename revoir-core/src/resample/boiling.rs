use crate::{
    DiReservoir, GiReservoir, PackedDiReservoir, PackedGiReservoir,
    ReservoirBufferParams, Vec3Ext, RESERVOIR_BLOCK_SIZE,
};

const TILE_LEN: usize =
    (RESERVOIR_BLOCK_SIZE * RESERVOIR_BLOCK_SIZE) as usize;

/// Tile-local firefly rejection.
///
/// A reservoir that stumbled onto a rare, huge-weight sample "boils": the
/// weight survives resampling for many frames and flickers across the
/// screen. Comparing each weight against its tile's total separates those
/// outliers from legitimately bright regions, where the whole tile carries
/// weight.
///
/// `tile` is one workgroup's worth of reservoirs; `filter_strength` in
/// `(0, 1]` is the fraction of the tile total a single reservoir may carry
/// before it gets reset.
pub fn boiling_filter_di(tile: &mut [DiReservoir], filter_strength: f32) {
    boiling_filter(tile, filter_strength, |r| r.weight_sum, |r| {
        *r = DiReservoir::default();
    });
}

/// See: [`boiling_filter_di()`].
pub fn boiling_filter_gi(tile: &mut [GiReservoir], filter_strength: f32) {
    boiling_filter(
        tile,
        filter_strength,
        |r| r.radiance.luminance() * r.weight_sum,
        |r| *r = GiReservoir::default(),
    );
}

fn boiling_filter<R>(
    tile: &mut [R],
    filter_strength: f32,
    weight: impl Fn(&R) -> f32,
    reset: impl Fn(&mut R),
) {
    if tile.is_empty() {
        return;
    }

    let group_size = tile.len() as f32;

    let total: f32 = tile
        .iter()
        .map(&weight)
        .filter(|weight| *weight > 0.0)
        .sum();

    let average = total / group_size;

    for reservoir in tile.iter_mut() {
        if weight(reservoir) > filter_strength * average * group_size {
            reset(reservoir);
        }
    }
}

/// Runs the boiling filter in place over a whole buffer slice, one 16×16
/// block per tile; blocks are contiguous, so a tile is just a subslice.
pub fn boiling_filter_di_pass(
    buffer: &mut [PackedDiReservoir],
    params: ReservoirBufferParams,
    slice: u32,
    filter_strength: f32,
) {
    let start = (slice * params.array_pitch) as usize;
    let end = start + params.array_pitch as usize;

    let Some(packed) = buffer.get_mut(start..end.min(buffer.len())) else {
        return;
    };

    let mut tile = [DiReservoir::default(); TILE_LEN];

    for packed_tile in packed.chunks_mut(TILE_LEN) {
        for (slot, packed) in tile.iter_mut().zip(packed_tile.iter()) {
            *slot = DiReservoir::unpack(*packed);
        }

        boiling_filter_di(&mut tile[..packed_tile.len()], filter_strength);

        for (slot, reservoir) in packed_tile.iter_mut().zip(&tile) {
            *slot = reservoir.pack();
        }
    }
}

/// See: [`boiling_filter_di_pass()`].
pub fn boiling_filter_gi_pass(
    buffer: &mut [PackedGiReservoir],
    params: ReservoirBufferParams,
    slice: u32,
    filter_strength: f32,
) {
    let start = (slice * params.array_pitch) as usize;
    let end = start + params.array_pitch as usize;

    let Some(packed) = buffer.get_mut(start..end.min(buffer.len())) else {
        return;
    };

    let mut tile = [GiReservoir::default(); TILE_LEN];

    for packed_tile in packed.chunks_mut(TILE_LEN) {
        for (slot, packed) in tile.iter_mut().zip(packed_tile.iter()) {
            *slot = GiReservoir::unpack(*packed);
        }

        boiling_filter_gi(&mut tile[..packed_tile.len()], filter_strength);

        for (slot, reservoir) in packed_tile.iter_mut().zip(&tile) {
            *slot = reservoir.pack();
        }
    }
}
