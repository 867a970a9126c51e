use glam::{vec2, IVec2, UVec2, Vec3};

use super::{surfaces_similar, temporal_search_offset};
use crate::{
    activate_checkerboard_pixel, apply_permutation_sampling,
    pixel_to_reservoir_pos, BiasCorrectionMode, DiReservoir, DiReservoirsView,
    DiSceneBridge, DiTemporalResamplingParams, RuntimeParams, Sampler,
};

/// How many previous-frame pixels are probed before the temporal history is
/// given up on.
const NUM_SEARCH_ATTEMPTS: u32 = 9;

pub struct DiTemporalOutput {
    pub reservoir: DiReservoir,
    /// Previous-frame pixel the temporal sample came from, when one was
    /// accepted; hosts feed this into shading-time visibility reuse.
    pub temporal_sample_pixel: Option<IVec2>,
}

/// Temporal resampling for one pixel: reprojects along the motion vector,
/// hunts for a compatible previous-frame surface nearby and merges its
/// reservoir into the current one.
pub fn di_temporal_resampling<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: DiReservoir,
    motion: Vec3,
    prev_reservoirs: DiReservoirsView<'_>,
    runtime: RuntimeParams,
    params: &DiTemporalResamplingParams,
) -> DiTemporalOutput
where
    B: DiSceneBridge,
    S: Sampler,
{
    let history_limit = params.max_history_length as f32 * input.m.max(1.0);

    // Previous-frame identity of the input's light, for when the bias
    // correction evaluates the selected sample on last frame's surface.
    let mut selected_prev_light = if input.is_valid() && input.is_light_valid()
    {
        bridge.translate_light_index(input.light_index(), true)
    } else {
        None
    };

    let mut reprojected = pixel.as_vec2() + motion.truncate();

    if !params.enable_permutation_sampling {
        reprojected += vec2(sampler.sample() - 0.5, sampler.sample() - 0.5);
    }

    let prev_pos = reprojected.round().as_ivec2();

    let radius = if runtime.active_checkerboard_field == 0 {
        4
    } else {
        8
    };

    let mut temporal = None;

    for i in 0..NUM_SEARCH_ATTEMPTS {
        let mut candidate = prev_pos;

        if i == 0 {
            if params.enable_permutation_sampling {
                candidate = apply_permutation_sampling(
                    candidate,
                    params.uniform_random_number,
                );
            }
        } else {
            candidate += temporal_search_offset(sampler, radius);
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

    // ---

    let mut reservoir = DiReservoir::default();

    reservoir.combine(&input, 0.5, input.target_pdf);

    let mut selected_previous = false;
    let mut temporal_m = 0.0;

    if let Some((temporal_pos, _)) = &temporal {
        let mut previous = prev_reservoirs.get(pixel_to_reservoir_pos(
            temporal_pos.as_uvec2(),
            runtime.active_checkerboard_field,
        ));

        previous.clamp_m(history_limit);
        previous.age += 1;

        let temporal_prev_light = if previous.is_light_valid() {
            Some(previous.light_index())
        } else {
            None
        };

        // The light list can change between frames; a sample whose light is
        // gone keeps occupying the reservoir but contributes nothing.
        if previous.is_valid() && previous.is_light_valid() {
            match bridge.translate_light_index(previous.light_index(), false) {
                Some(index) => previous.set_light_index(index),
                None => previous.kill_light(),
            }
        }

        let weight_at_current = if previous.is_light_valid() {
            bridge
                .light_info(previous.light_index(), false)
                .map(|light| {
                    let sample =
                        bridge.sample_light(&light, surface, previous.uv());

                    bridge.light_sample_target_pdf(&sample, surface)
                })
                .unwrap_or(0.0)
        } else {
            0.0
        };

        temporal_m = previous.m;

        if reservoir.combine(&previous, sampler.sample(), weight_at_current) {
            selected_previous = true;
            selected_prev_light = temporal_prev_light;
        }
    }

    // ---

    match params.bias_correction {
        BiasCorrectionMode::Off => {
            reservoir.finalize(1.0, reservoir.target_pdf * reservoir.m);
        }

        // With a single temporal neighbor, pairwise MIS coincides with the
        // basic normalization.
        mode => {
            let mut pi = reservoir.target_pdf;
            let mut pi_sum = reservoir.target_pdf * input.m;

            if let Some((_, temporal_surface)) = &temporal {
                if temporal_m > 0.0 {
                    let temporal_pdf = selected_prev_light
                        .and_then(|index| bridge.light_info(index, true))
                        .map(|light| {
                            let sample = bridge.sample_light(
                                &light,
                                temporal_surface,
                                reservoir.uv(),
                            );

                            let pdf = bridge
                                .light_sample_target_pdf(&sample, temporal_surface);

                            let needs_ray = mode == BiasCorrectionMode::RayTraced
                                && pdf > 0.0
                                && (!selected_previous
                                    || !params.enable_visibility_shortcut);

                            if needs_ray
                                && !bridge.temporal_conservative_visibility(
                                    temporal_surface,
                                    &sample,
                                )
                            {
                                0.0
                            } else {
                                pdf
                            }
                        })
                        .unwrap_or(0.0);

                    if selected_previous {
                        pi = temporal_pdf;
                    }

                    pi_sum += temporal_pdf * temporal_m;
                }
            }

            reservoir.finalize(pi, pi_sum * reservoir.target_pdf);
        }
    }

    DiTemporalOutput {
        reservoir,
        temporal_sample_pixel: temporal.map(|(pos, _)| pos),
    }
}
