use glam::{UVec2, Vec2};

use super::{
    spatial_candidate_pos, surfaces_similar, MAX_SPATIAL_SAMPLES,
    NAIVE_SAMPLING_M_THRESHOLD,
};
use crate::{
    pixel_to_reservoir_pos, stream_canonical_with_pairwise_mis,
    stream_neighbor_with_pairwise_mis, BiasCorrectionMode, DiReservoir,
    DiReservoirsView, DiSceneBridge, DiSpatialResamplingParams, RuntimeParams,
    Sampler,
};

/// Spatial resampling for one pixel: merges reservoirs of screen-space
/// neighbors picked from the precomputed disk-offset table.
#[allow(clippy::too_many_arguments)]
pub fn di_spatial_resampling<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: DiReservoir,
    reservoirs: DiReservoirsView<'_>,
    neighbor_offsets: &[Vec2],
    runtime: RuntimeParams,
    params: &DiSpatialResamplingParams,
) -> DiReservoir
where
    B: DiSceneBridge,
    S: Sampler,
{
    // Young reservoirs (disocclusions, scene edits) get extra neighbors to
    // catch up with the surrounding history.
    let num_samples = if input.m < params.target_history_length as f32 {
        params.num_samples.max(params.num_disocclusion_boost_samples)
    } else {
        params.num_samples
    }
    .min(MAX_SPATIAL_SAMPLES);

    let start_idx =
        (sampler.sample() * (runtime.neighbor_offset_mask + 1) as f32) as u32;

    if params.bias_correction == BiasCorrectionMode::Pairwise {
        resample_pairwise(
            bridge,
            sampler,
            pixel,
            surface,
            input,
            reservoirs,
            neighbor_offsets,
            runtime,
            params,
            num_samples,
            start_idx,
        )
    } else {
        resample(
            bridge,
            sampler,
            pixel,
            surface,
            input,
            reservoirs,
            neighbor_offsets,
            runtime,
            params,
            num_samples,
            start_idx,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn resample<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: DiReservoir,
    reservoirs: DiReservoirsView<'_>,
    neighbor_offsets: &[Vec2],
    runtime: RuntimeParams,
    params: &DiSpatialResamplingParams,
    num_samples: u32,
    start_idx: u32,
) -> DiReservoir
where
    B: DiSceneBridge,
    S: Sampler,
{
    let candidate_pos = |i: u32| {
        spatial_candidate_pos(
            bridge,
            pixel.as_ivec2(),
            neighbor_offsets,
            runtime.neighbor_offset_mask,
            start_idx + i,
            params.sampling_radius,
            false,
            runtime.active_checkerboard_field,
        )
    };

    let mut reservoir = DiReservoir::default();

    reservoir.combine(&input, 0.5, input.target_pdf);

    let mut selected = -1;
    let mut visited = 0u32;

    for i in 0..num_samples {
        let pos = candidate_pos(i);
        let neighbor_surface = bridge.surface_at(pos, false);

        if !bridge.is_surface_valid(&neighbor_surface) {
            continue;
        }

        if !surfaces_similar(
            bridge,
            surface,
            &neighbor_surface,
            params.normal_threshold,
            params.depth_threshold,
        ) {
            continue;
        }

        let mut neighbor = reservoirs.get(pixel_to_reservoir_pos(
            pos.as_uvec2(),
            runtime.active_checkerboard_field,
        ));

        if !neighbor.is_valid() {
            continue;
        }

        if params.discount_naive_samples
            && neighbor.m <= NAIVE_SAMPLING_M_THRESHOLD as f32
        {
            continue;
        }

        neighbor.spatial_distance += pos - pixel.as_ivec2();
        visited |= 1 << i;

        let weight = if neighbor.is_light_valid() {
            bridge
                .light_info(neighbor.light_index(), false)
                .map(|light| {
                    let sample =
                        bridge.sample_light(&light, surface, neighbor.uv());

                    bridge.light_sample_target_pdf(&sample, surface)
                })
                .unwrap_or(0.0)
        } else {
            0.0
        };

        if reservoir.combine(&neighbor, sampler.sample(), weight) {
            selected = i as i32;
        }
    }

    match params.bias_correction {
        BiasCorrectionMode::Off => {
            reservoir.finalize(1.0, reservoir.target_pdf * reservoir.m);
        }

        mode => {
            let selected_light = if reservoir.is_light_valid() {
                bridge.light_info(reservoir.light_index(), false)
            } else {
                None
            };

            let mut pi = reservoir.target_pdf;
            let mut pi_sum = reservoir.target_pdf * input.m;

            if let Some(light) = selected_light {
                // Walk the very same neighbors again, this time evaluating
                // the *selected* sample on their surfaces.
                for i in 0..num_samples {
                    if visited & (1 << i) == 0 {
                        continue;
                    }

                    let pos = candidate_pos(i);
                    let neighbor_surface = bridge.surface_at(pos, false);

                    let sample = bridge.sample_light(
                        &light,
                        &neighbor_surface,
                        reservoir.uv(),
                    );

                    let mut ps = bridge
                        .light_sample_target_pdf(&sample, &neighbor_surface);

                    if mode == BiasCorrectionMode::RayTraced
                        && ps > 0.0
                        && !bridge
                            .conservative_visibility(&neighbor_surface, &sample)
                    {
                        ps = 0.0;
                    }

                    let neighbor = reservoirs.get(pixel_to_reservoir_pos(
                        pos.as_uvec2(),
                        runtime.active_checkerboard_field,
                    ));

                    if selected == i as i32 {
                        pi = ps;
                    }

                    pi_sum += ps * neighbor.m;
                }
            }

            reservoir.finalize(pi, pi_sum * reservoir.target_pdf);
        }
    }

    reservoir
}

#[allow(clippy::too_many_arguments)]
fn resample_pairwise<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: DiReservoir,
    reservoirs: DiReservoirsView<'_>,
    neighbor_offsets: &[Vec2],
    runtime: RuntimeParams,
    params: &DiSpatialResamplingParams,
    num_samples: u32,
    start_idx: u32,
) -> DiReservoir
where
    B: DiSceneBridge,
    S: Sampler,
{
    let mut reservoir = DiReservoir::default();
    let mut valid_samples = 0u32;

    let canonical_light = if input.is_valid() && input.is_light_valid() {
        bridge.light_info(input.light_index(), false)
    } else {
        None
    };

    for i in 0..num_samples {
        let pos = spatial_candidate_pos(
            bridge,
            pixel.as_ivec2(),
            neighbor_offsets,
            runtime.neighbor_offset_mask,
            start_idx + i,
            params.sampling_radius,
            false,
            runtime.active_checkerboard_field,
        );

        let neighbor_surface = bridge.surface_at(pos, false);

        if !bridge.is_surface_valid(&neighbor_surface) {
            continue;
        }

        if !surfaces_similar(
            bridge,
            surface,
            &neighbor_surface,
            params.normal_threshold,
            params.depth_threshold,
        ) {
            continue;
        }

        let mut neighbor = reservoirs.get(pixel_to_reservoir_pos(
            pos.as_uvec2(),
            runtime.active_checkerboard_field,
        ));

        if !neighbor.is_valid() {
            continue;
        }

        if params.discount_naive_samples
            && neighbor.m <= NAIVE_SAMPLING_M_THRESHOLD as f32
        {
            continue;
        }

        neighbor.spatial_distance += pos - pixel.as_ivec2();

        let neighbor_at_canonical = if neighbor.is_light_valid() {
            bridge
                .light_info(neighbor.light_index(), false)
                .map(|light| {
                    let sample =
                        bridge.sample_light(&light, surface, neighbor.uv());

                    bridge.light_sample_target_pdf(&sample, surface)
                })
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let canonical_at_neighbor = canonical_light
            .map(|light| {
                let sample =
                    bridge.sample_light(&light, &neighbor_surface, input.uv());

                bridge.light_sample_target_pdf(&sample, &neighbor_surface)
            })
            .unwrap_or(0.0);

        valid_samples += 1;

        stream_neighbor_with_pairwise_mis(
            &mut reservoir,
            sampler.sample(),
            &neighbor,
            neighbor_at_canonical,
            &input,
            canonical_at_neighbor,
            num_samples,
        );
    }

    // With no usable neighbors the canonical sample keeps its full weight.
    if valid_samples == 0 {
        reservoir.canonical_weight = 1.0;
    }

    stream_canonical_with_pairwise_mis(&mut reservoir, sampler.sample(), &input);

    reservoir
        .finalize(1.0, valid_samples.max(1) as f32 * reservoir.target_pdf);

    reservoir.canonical_weight = 0.0;
    reservoir
}
