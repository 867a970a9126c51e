use glam::{IVec2, UVec2, Vec2, Vec3};

use super::{
    spatial_candidate_pos, surfaces_similar, GI_TEMPORAL_RING,
    MAX_SPATIAL_SAMPLES,
};
use crate::{
    activate_checkerboard_pixel, apply_permutation_sampling,
    pixel_to_reservoir_pos, BiasCorrectionMode, GiReservoir, GiReservoirsView,
    GiSceneBridge, GiSpatioTemporalResamplingParams, RuntimeParams, Sampler,
};

pub struct GiSpatioTemporalOutput {
    pub reservoir: GiReservoir,
    pub temporal_sample_pixel: Option<IVec2>,
}

/// Fused spatio-temporal resampling of bounce samples; one pass over the
/// previous-frame buffer covering the reprojected reservoir and a disk of
/// neighbors around it.
#[allow(clippy::too_many_arguments)]
pub fn gi_spatiotemporal_resampling<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: GiReservoir,
    motion: Vec3,
    prev_reservoirs: GiReservoirsView<'_>,
    neighbor_offsets: &[Vec2],
    runtime: RuntimeParams,
    params: &GiSpatioTemporalResamplingParams,
) -> GiSpatioTemporalOutput
where
    B: GiSceneBridge,
    S: Sampler,
{
    let prev_pos = (pixel.as_vec2() + motion.truncate()).round().as_ivec2();

    // Phase one: reprojection search over the deterministic ring.
    let mut temporal = None;

    for i in 0..=GI_TEMPORAL_RING.len() {
        let mut candidate = prev_pos;

        if i == 0 {
            if params.enable_permutation_sampling {
                candidate = apply_permutation_sampling(
                    candidate,
                    params.uniform_random_number,
                );
            }
        } else {
            candidate += GI_TEMPORAL_RING[i - 1];
        }

        let candidate = activate_checkerboard_pixel(
            candidate,
            true,
            runtime.active_checkerboard_field,
        );

        let candidate_surface = bridge.surface_at(candidate, true);

        if !bridge.is_surface_valid(&candidate_surface) {
            continue;
        }

        if !surfaces_similar(
            bridge,
            surface,
            &candidate_surface,
            params.normal_threshold,
            params.depth_threshold,
        ) {
            continue;
        }

        temporal = Some((candidate, candidate_surface));
        break;
    }

    // Phase two: disocclusion fallback at the current pixel, similarity
    // tests waived.
    if temporal.is_none() && params.enable_fallback_sampling {
        let candidate = activate_checkerboard_pixel(
            pixel.as_ivec2(),
            true,
            runtime.active_checkerboard_field,
        );

        let candidate_surface = bridge.surface_at(candidate, true);

        if bridge.is_surface_valid(&candidate_surface) {
            temporal = Some((candidate, candidate_surface));
        }
    }

    let center = temporal.as_ref().map(|(pos, _)| *pos).unwrap_or(prev_pos);
    let num_spatial = params.num_spatial_samples.min(MAX_SPATIAL_SAMPLES);

    let start_idx =
        (sampler.sample() * (runtime.neighbor_offset_mask + 1) as f32) as u32;

    let candidate_pos = |i: u32| {
        spatial_candidate_pos(
            bridge,
            center,
            neighbor_offsets,
            runtime.neighbor_offset_mask,
            start_idx + i,
            params.sampling_radius,
            true,
            runtime.active_checkerboard_field,
        )
    };

    // Pulls a previous-frame reservoir through history clamping and aging.
    let load_previous = |pos: IVec2| {
        let mut previous = prev_reservoirs.get(pixel_to_reservoir_pos(
            pos.as_uvec2(),
            runtime.active_checkerboard_field,
        ));

        previous.clamp_m(params.max_history_length as f32);
        previous.age += 1;

        if previous.age > params.max_reservoir_age {
            previous = GiReservoir::default();
        }

        previous
    };

    // ---

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

    let mut selected_temporal = false;
    let mut temporal_m = 0.0;

    if let Some((temporal_pos, temporal_surface)) = &temporal {
        let mut previous = load_previous(*temporal_pos);

        if previous.is_valid() {
            let jacobian = previous.jacobian(
                bridge.surface_world_pos(surface),
                bridge.surface_world_pos(temporal_surface),
            );

            previous.weight_sum *= jacobian;

            let pdf = bridge.gi_target_pdf(
                previous.position,
                previous.radiance,
                surface,
            );

            temporal_m = previous.m;

            if reservoir.combine(&previous, sampler.sample(), pdf) {
                selected_pdf = pdf;
                selected_temporal = true;
            }
        }
    }

    let mut selected_spatial = -1;
    let mut visited = 0u32;
    let mut neighbor_ms = [0.0f32; MAX_SPATIAL_SAMPLES as usize];

    for i in 0..num_spatial {
        let pos = candidate_pos(i);
        let neighbor_surface = bridge.surface_at(pos, true);

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

        let neighbor = load_previous(pos);

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
        neighbor_ms[i as usize] = neighbor.m;

        let pdf = bridge.gi_target_pdf(
            neighbor.position,
            neighbor.radiance,
            surface,
        ) * jacobian;

        if reservoir.combine(&neighbor, sampler.sample(), pdf) {
            selected_pdf = pdf;
            selected_spatial = i as i32;
            selected_temporal = false;
        }
    }

    // ---

    match params.bias_correction {
        BiasCorrectionMode::Off => {
            reservoir.finalize(1.0, selected_pdf * reservoir.m);
        }

        // Pairwise MIS is a direct-illumination affair; basic covers it
        // here.
        mode => {
            let mut pi = selected_pdf;
            let mut pi_sum = selected_pdf * input.m;

            if reservoir.is_valid() {
                let contribution = |candidate_surface: &B::Surface| {
                    let ps = bridge.gi_target_pdf(
                        reservoir.position,
                        reservoir.radiance,
                        candidate_surface,
                    );

                    if mode == BiasCorrectionMode::RayTraced
                        && ps > 0.0
                        && !bridge.gi_temporal_conservative_visibility(
                            candidate_surface,
                            reservoir.position,
                        )
                    {
                        0.0
                    } else {
                        ps
                    }
                };

                if let Some((_, temporal_surface)) = &temporal {
                    if temporal_m > 0.0 {
                        let ps = contribution(temporal_surface);

                        if selected_temporal {
                            pi = ps;
                        }

                        pi_sum += ps * temporal_m;
                    }
                }

                for i in 0..num_spatial {
                    if visited & (1 << i) == 0 {
                        continue;
                    }

                    let pos = candidate_pos(i);
                    let neighbor_surface = bridge.surface_at(pos, true);
                    let ps = contribution(&neighbor_surface);

                    if selected_spatial == i as i32 {
                        pi = ps;
                    }

                    pi_sum += ps * neighbor_ms[i as usize];
                }
            }

            reservoir.finalize(pi, pi_sum * selected_pdf);
        }
    }

    GiSpatioTemporalOutput {
        reservoir,
        temporal_sample_pixel: temporal.map(|(pos, _)| pos),
    }
}
