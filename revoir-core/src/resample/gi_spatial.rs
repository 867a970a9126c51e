use glam::{UVec2, Vec2};

use super::{spatial_candidate_pos, surfaces_similar, MAX_SPATIAL_SAMPLES};
use crate::{
    pixel_to_reservoir_pos, BiasCorrectionMode, GiReservoir, GiReservoirsView,
    GiSceneBridge, GiSpatialResamplingParams, RuntimeParams, Sampler,
};

/// Spatial resampling of bounce samples; neighbors hand their reservoirs
/// over through the solid-angle Jacobian of the receiver change, and
/// implausible Jacobians reject the neighbor outright.
#[allow(clippy::too_many_arguments)]
pub fn gi_spatial_resampling<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: GiReservoir,
    reservoirs: GiReservoirsView<'_>,
    neighbor_offsets: &[Vec2],
    runtime: RuntimeParams,
    params: &GiSpatialResamplingParams,
) -> GiReservoir
where
    B: GiSceneBridge,
    S: Sampler,
{
    let num_samples = params.num_samples.min(MAX_SPATIAL_SAMPLES);

    let start_idx =
        (sampler.sample() * (runtime.neighbor_offset_mask + 1) as f32) as u32;

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

    let input_pdf = if input.is_valid() {
        bridge.gi_target_pdf(input.position, input.radiance, surface)
    } else {
        0.0
    };

    let mut reservoir = GiReservoir::default();
    let mut selected_pdf = 0.0;

    if reservoir.combine(&input, 0.5, input_pdf) {
        selected_pdf = input_pdf;
    }

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

        let neighbor = reservoirs.get(pixel_to_reservoir_pos(
            pos.as_uvec2(),
            runtime.active_checkerboard_field,
        ));

        if !neighbor.is_valid() {
            continue;
        }

        let jacobian = neighbor.jacobian(
            bridge.surface_world_pos(surface),
            bridge.surface_world_pos(&neighbor_surface),
        );

        if !bridge.validate_gi_sample_with_jacobian(jacobian) {
            continue;
        }

        visited |= 1 << i;

        let pdf = bridge.gi_target_pdf(
            neighbor.position,
            neighbor.radiance,
            surface,
        ) * jacobian;

        if reservoir.combine(&neighbor, sampler.sample(), pdf) {
            selected = i as i32;
            selected_pdf = pdf;
        }
    }

    match params.bias_correction {
        BiasCorrectionMode::Off => {
            reservoir.finalize(1.0, selected_pdf * reservoir.m);
        }

        mode => {
            let mut pi = selected_pdf;
            let mut pi_sum = selected_pdf * input.m;

            if reservoir.is_valid() {
                for i in 0..num_samples {
                    if visited & (1 << i) == 0 {
                        continue;
                    }

                    let pos = candidate_pos(i);
                    let neighbor_surface = bridge.surface_at(pos, false);

                    let mut ps = bridge.gi_target_pdf(
                        reservoir.position,
                        reservoir.radiance,
                        &neighbor_surface,
                    );

                    if mode == BiasCorrectionMode::RayTraced
                        && ps > 0.0
                        && !bridge.gi_conservative_visibility(
                            &neighbor_surface,
                            reservoir.position,
                        )
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

            reservoir.finalize(pi, pi_sum * selected_pdf);
        }
    }

    reservoir
}
