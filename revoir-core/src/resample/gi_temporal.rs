use glam::{IVec2, UVec2, Vec3};

use super::{surfaces_similar, GI_TEMPORAL_RING};
use crate::{
    activate_checkerboard_pixel, apply_permutation_sampling,
    pixel_to_reservoir_pos, BiasCorrectionMode, GiReservoir, GiReservoirsView,
    GiSceneBridge, GiTemporalResamplingParams, RuntimeParams, Sampler,
};

pub struct GiTemporalOutput {
    pub reservoir: GiReservoir,
    pub temporal_sample_pixel: Option<IVec2>,
}

/// Temporal resampling of bounce samples: reprojects along the motion
/// vector, probes a small deterministic ring for a compatible previous-frame
/// surface and merges its reservoir, reweighted by the solid-angle Jacobian
/// of the receiver change.
pub fn gi_temporal_resampling<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: GiReservoir,
    motion: Vec3,
    prev_reservoirs: GiReservoirsView<'_>,
    runtime: RuntimeParams,
    params: &GiTemporalResamplingParams,
) -> GiTemporalOutput
where
    B: GiSceneBridge,
    S: Sampler,
{
    let prev_pos = (pixel.as_vec2() + motion.truncate()).round().as_ivec2();

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

    // Disoccluded pixels may still reuse whatever sat under them last frame;
    // better a slightly-off reservoir than a cold start.
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

    let mut selected_previous = false;
    let mut temporal_m = 0.0;

    if let Some((temporal_pos, temporal_surface)) = &temporal {
        let mut previous = prev_reservoirs.get(pixel_to_reservoir_pos(
            temporal_pos.as_uvec2(),
            runtime.active_checkerboard_field,
        ));

        previous.clamp_m(params.max_history_length as f32);
        previous.age += 1;

        if previous.age > params.max_reservoir_age {
            previous = GiReservoir::default();
        }

        if previous.is_valid() {
            // The sample was weighted for last frame's receiver; moving it
            // under this pixel changes the subtended solid angle.
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
                selected_previous = true;
            }
        }
    }

    // ---

    match params.bias_correction {
        BiasCorrectionMode::Off => {
            reservoir.finalize(1.0, selected_pdf * reservoir.m);
        }

        // A single temporal neighbor makes pairwise MIS equal to basic.
        mode => {
            let mut pi = selected_pdf;
            let mut pi_sum = selected_pdf * input.m;

            if let Some((_, temporal_surface)) = &temporal {
                if temporal_m > 0.0 && reservoir.is_valid() {
                    let mut ps = bridge.gi_target_pdf(
                        reservoir.position,
                        reservoir.radiance,
                        temporal_surface,
                    );

                    let needs_ray = mode == BiasCorrectionMode::RayTraced
                        && ps > 0.0;

                    if needs_ray
                        && !bridge.gi_temporal_conservative_visibility(
                            temporal_surface,
                            reservoir.position,
                        )
                    {
                        ps = 0.0;
                    }

                    if selected_previous {
                        pi = ps;
                    }

                    pi_sum += ps * temporal_m;
                }
            }

            reservoir.finalize(pi, pi_sum * selected_pdf);
        }
    }

    GiTemporalOutput {
        reservoir,
        temporal_sample_pixel: temporal.map(|(pos, _)| pos),
    }
}
