//! The resampling passes: temporal, spatial and fused spatio-temporal, for
//! direct and indirect illumination, plus the boiling filter.
//!
//! Each pass handles a single pixel and returns the reservoir the caller
//! stores into the destination slice; nothing in here writes memory, which
//! keeps source and destination disjoint by construction.

mod boiling;
mod di_spatial;
mod di_spatiotemporal;
mod di_temporal;
mod gi_spatial;
mod gi_spatiotemporal;
mod gi_temporal;

use glam::{ivec2, IVec2, Vec2};

pub use self::boiling::*;
pub use self::di_spatial::*;
pub use self::di_spatiotemporal::*;
pub use self::di_temporal::*;
pub use self::gi_spatial::*;
pub use self::gi_spatiotemporal::*;
pub use self::gi_temporal::*;
use crate::{activate_checkerboard_pixel, Sampler, SceneBridge};

/// Cap on the neighbor count of a single pass; contributions are tracked in
/// one 32-bit mask for the bias-correction walk.
pub const MAX_SPATIAL_SAMPLES: u32 = 32;

/// Neighbors at or below this M carry nothing beyond their own initial
/// samples; passes skip them when `discount_naive_samples` is set.
pub const NAIVE_SAMPLING_M_THRESHOLD: u32 = 3;

/// Deterministic search pattern used by the indirect-illumination temporal
/// passes after the reprojected pixel itself fails.
pub(crate) const GI_TEMPORAL_RING: [IVec2; 4] = [
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(1, 1),
];

/// Whether a neighbor surface is close enough to the current one for its
/// reservoir to be worth merging.
pub(crate) fn surfaces_similar<B: SceneBridge>(
    bridge: &B,
    current: &B::Surface,
    neighbor: &B::Surface,
    normal_threshold: f32,
    depth_threshold: f32,
) -> bool {
    let normals = bridge
        .surface_normal(current)
        .dot(bridge.surface_normal(neighbor));

    if normals < normal_threshold {
        return false;
    }

    let current_depth = bridge.surface_linear_depth(current);
    let neighbor_depth = bridge.surface_linear_depth(neighbor);

    if (neighbor_depth - current_depth).abs()
        > depth_threshold * current_depth.abs()
    {
        return false;
    }

    bridge.are_materials_similar(current, neighbor)
}

/// Random offset used while hunting for a reprojected surface.
pub(crate) fn temporal_search_offset<S: Sampler>(
    sampler: &mut S,
    radius: i32,
) -> IVec2 {
    ivec2(
        ((sampler.sample() * 2.0 - 1.0) * radius as f32).round() as i32,
        ((sampler.sample() * 2.0 - 1.0) * radius as f32).round() as i32,
    )
}

/// Position of the `idx`-th disk sample around `center`, snapped into view
/// and onto the active checkerboard field.
///
/// Pure in `idx`, so the bias-correction walk recomputes the exact positions
/// the streaming loop visited.
#[allow(clippy::too_many_arguments)]
pub(crate) fn spatial_candidate_pos<B: SceneBridge>(
    bridge: &B,
    center: IVec2,
    neighbor_offsets: &[Vec2],
    neighbor_offset_mask: u32,
    idx: u32,
    radius: f32,
    previous_frame: bool,
    field: u32,
) -> IVec2 {
    let offset = neighbor_offsets
        .get((idx & neighbor_offset_mask) as usize)
        .copied()
        .unwrap_or(Vec2::ZERO)
        * radius;

    let pos = center + offset.round().as_ivec2();
    let pos = bridge.clamp_into_view(pos, previous_frame);

    activate_checkerboard_pixel(pos, previous_frame, field)
}
