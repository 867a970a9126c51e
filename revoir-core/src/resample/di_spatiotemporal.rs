use glam::{vec2, IVec2, UVec2, Vec2, Vec3};

use super::{
    spatial_candidate_pos, surfaces_similar, temporal_search_offset,
    MAX_SPATIAL_SAMPLES, NAIVE_SAMPLING_M_THRESHOLD,
};
use crate::{
    activate_checkerboard_pixel, apply_permutation_sampling,
    pixel_to_reservoir_pos, BiasCorrectionMode, DiReservoir, DiReservoirsView,
    DiSceneBridge, DiSpatioTemporalResamplingParams, RuntimeParams, Sampler,
};

/// Previous-frame pixels probed around the reprojected position before the
/// pass falls back (or gives up) on temporal history.
const NUM_SEARCH_ATTEMPTS: u32 = 5;

pub struct DiSpatioTemporalOutput {
    pub reservoir: DiReservoir,
    pub temporal_sample_pixel: Option<IVec2>,
}

/// Fused spatio-temporal resampling for one pixel: a single pass over the
/// previous-frame buffer that merges the reprojected reservoir and a ring of
/// its neighbors, replacing the separate temporal and spatial dispatches.
#[allow(clippy::too_many_arguments)]
pub fn di_spatiotemporal_resampling<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: DiReservoir,
    motion: Vec3,
    prev_reservoirs: DiReservoirsView<'_>,
    neighbor_offsets: &[Vec2],
    runtime: RuntimeParams,
    params: &DiSpatioTemporalResamplingParams,
) -> DiSpatioTemporalOutput
where
    B: DiSceneBridge,
    S: Sampler,
{
    let history_limit = params.max_history_length as f32 * input.m.max(1.0);

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

    // Phase one: hunt for a temporally-stable surface near the reprojected
    // position.
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

    // Phase two: disocclusion fallback around the current pixel, skipping
    // the similarity tests.
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

    let num_spatial = if temporal.is_none() {
        params
            .num_spatial_samples
            .max(params.num_disocclusion_boost_samples)
    } else {
        params.num_spatial_samples
    }
    .min(MAX_SPATIAL_SAMPLES);

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

    let reservoir = if params.bias_correction == BiasCorrectionMode::Pairwise {
        resample_pairwise(
            bridge,
            sampler,
            pixel,
            surface,
            &input,
            &temporal,
            prev_reservoirs,
            runtime,
            params,
            history_limit,
            num_spatial,
            &candidate_pos,
        )
    } else {
        resample(
            bridge,
            sampler,
            pixel,
            surface,
            &input,
            &temporal,
            prev_reservoirs,
            runtime,
            params,
            history_limit,
            num_spatial,
            &candidate_pos,
        )
    };

    DiSpatioTemporalOutput {
        reservoir,
        temporal_sample_pixel: temporal.map(|(pos, _)| pos),
    }
}

/// Loads a previous-frame reservoir and ages it into the current frame;
/// reservoirs whose light is gone keep their M but lose their payload.
fn load_previous<B>(
    bridge: &B,
    prev_reservoirs: DiReservoirsView<'_>,
    pos: IVec2,
    field: u32,
    history_limit: f32,
) -> (DiReservoir, Option<u32>)
where
    B: DiSceneBridge,
{
    let mut previous =
        prev_reservoirs.get(pixel_to_reservoir_pos(pos.as_uvec2(), field));

    previous.clamp_m(history_limit);
    previous.age += 1;

    let prev_light = if previous.is_light_valid() {
        Some(previous.light_index())
    } else {
        None
    };

    if previous.is_valid() && previous.is_light_valid() {
        match bridge.translate_light_index(previous.light_index(), false) {
            Some(index) => previous.set_light_index(index),
            None => previous.kill_light(),
        }
    }

    (previous, prev_light)
}

fn target_pdf_at<B>(
    bridge: &B,
    reservoir: &DiReservoir,
    surface: &B::Surface,
) -> f32
where
    B: DiSceneBridge,
{
    if !reservoir.is_light_valid() {
        return 0.0;
    }

    bridge
        .light_info(reservoir.light_index(), false)
        .map(|light| {
            let sample = bridge.sample_light(&light, surface, reservoir.uv());

            bridge.light_sample_target_pdf(&sample, surface)
        })
        .unwrap_or(0.0)
}

#[allow(clippy::too_many_arguments)]
fn resample<B, S>(
    bridge: &B,
    sampler: &mut S,
    pixel: UVec2,
    surface: &B::Surface,
    input: &DiReservoir,
    temporal: &Option<(IVec2, B::Surface)>,
    prev_reservoirs: DiReservoirsView<'_>,
    runtime: RuntimeParams,
    params: &DiSpatioTemporalResamplingParams,
    history_limit: f32,
    num_spatial: u32,
    candidate_pos: &dyn Fn(u32) -> IVec2,
) -> DiReservoir
where
    B: DiSceneBridge,
    S: Sampler,
{
    let mut selected_prev_light = if input.is_valid() && input.is_light_valid()
    {
        bridge.translate_light_index(input.light_index(), true)
    } else {
        None
    };

    let mut reservoir = DiReservoir::default();

    reservoir.combine(input, 0.5, input.target_pdf);

    let mut selected_temporal = false;
    let mut selected_spatial = -1;
    let mut temporal_m = 0.0;

    if let Some((temporal_pos, _)) = temporal {
        let (previous, prev_light) = load_previous(
            bridge,
            prev_reservoirs,
            *temporal_pos,
            runtime.active_checkerboard_field,
            history_limit,
        );

        let weight_at_current = target_pdf_at(bridge, &previous, surface);

        temporal_m = previous.m;

        if reservoir.combine(&previous, sampler.sample(), weight_at_current) {
            selected_temporal = true;
            selected_prev_light = prev_light;
        }
    }

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

        let (mut neighbor, prev_light) = load_previous(
            bridge,
            prev_reservoirs,
            pos,
            runtime.active_checkerboard_field,
            history_limit,
        );

        if !neighbor.is_valid() || !neighbor.is_light_valid() {
            continue;
        }

        if params.discount_naive_samples
            && neighbor.m <= NAIVE_SAMPLING_M_THRESHOLD as f32
        {
            continue;
        }

        neighbor.spatial_distance += pos - pixel.as_ivec2();

        let weight = target_pdf_at(bridge, &neighbor, surface);

        visited |= 1 << i;
        neighbor_ms[i as usize] = neighbor.m;

        if reservoir.combine(&neighbor, sampler.sample(), weight) {
            selected_spatial = i as i32;
            selected_temporal = false;
            selected_prev_light = prev_light;
        }
    }

    match params.bias_correction {
        BiasCorrectionMode::Off => {
            reservoir.finalize(1.0, reservoir.target_pdf * reservoir.m);
        }

        mode => {
            let mut pi = reservoir.target_pdf;
            let mut pi_sum = reservoir.target_pdf * input.m;

            // Every candidate came out of the previous frame, so the walk
            // evaluates the selected sample with last frame's light data on
            // last frame's surfaces.
            let selected_light = selected_prev_light
                .and_then(|index| bridge.light_info(index, true));

            if let Some(light) = selected_light {
                let selected_uv = reservoir.uv();

                let contribution =
                    |candidate_surface: &B::Surface, may_trace: bool| {
                        let sample = bridge.sample_light(
                            &light,
                            candidate_surface,
                            selected_uv,
                        );

                        let pdf = bridge
                            .light_sample_target_pdf(&sample, candidate_surface);

                        if mode == BiasCorrectionMode::RayTraced
                            && pdf > 0.0
                            && may_trace
                            && !bridge.temporal_conservative_visibility(
                                candidate_surface,
                                &sample,
                            )
                        {
                            0.0
                        } else {
                            pdf
                        }
                    };

                if let Some((_, temporal_surface)) = temporal {
                    if temporal_m > 0.0 {
                        let needs_ray = !selected_temporal
                            || !params.enable_visibility_shortcut;

                        let ps = contribution(temporal_surface, needs_ray);

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
                    let ps = contribution(&neighbor_surface, true);

                    if selected_spatial == i as i32 {
                        pi = ps;
                    }

                    pi_sum += ps * neighbor_ms[i as usize];
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
    input: &DiReservoir,
    temporal: &Option<(IVec2, B::Surface)>,
    prev_reservoirs: DiReservoirsView<'_>,
    runtime: RuntimeParams,
    params: &DiSpatioTemporalResamplingParams,
    history_limit: f32,
    num_spatial: u32,
    candidate_pos: &dyn Fn(u32) -> IVec2,
) -> DiReservoir
where
    B: DiSceneBridge,
    S: Sampler,
{
    use crate::{
        stream_canonical_with_pairwise_mis, stream_neighbor_with_pairwise_mis,
    };

    let num_strategies = num_spatial + temporal.is_some() as u32;

    let canonical_light = if input.is_valid() && input.is_light_valid() {
        bridge.light_info(input.light_index(), false)
    } else {
        None
    };

    let canonical_at = |candidate_surface: &B::Surface| {
        canonical_light
            .map(|light| {
                let sample =
                    bridge.sample_light(&light, candidate_surface, input.uv());

                bridge.light_sample_target_pdf(&sample, candidate_surface)
            })
            .unwrap_or(0.0)
    };

    let mut reservoir = DiReservoir::default();
    let mut valid_samples = 0u32;

    if let Some((temporal_pos, temporal_surface)) = temporal {
        let (previous, _) = load_previous(
            bridge,
            prev_reservoirs,
            *temporal_pos,
            runtime.active_checkerboard_field,
            history_limit,
        );

        if previous.is_valid() {
            let neighbor_at_canonical = target_pdf_at(bridge, &previous, surface);

            valid_samples += 1;

            stream_neighbor_with_pairwise_mis(
                &mut reservoir,
                sampler.sample(),
                &previous,
                neighbor_at_canonical,
                input,
                canonical_at(temporal_surface),
                num_strategies,
            );
        }
    }

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

        let (mut neighbor, _) = load_previous(
            bridge,
            prev_reservoirs,
            pos,
            runtime.active_checkerboard_field,
            history_limit,
        );

        if !neighbor.is_valid() || !neighbor.is_light_valid() {
            continue;
        }

        if params.discount_naive_samples
            && neighbor.m <= NAIVE_SAMPLING_M_THRESHOLD as f32
        {
            continue;
        }

        neighbor.spatial_distance += pos - pixel.as_ivec2();

        let neighbor_at_canonical = target_pdf_at(bridge, &neighbor, surface);

        valid_samples += 1;

        stream_neighbor_with_pairwise_mis(
            &mut reservoir,
            sampler.sample(),
            &neighbor,
            neighbor_at_canonical,
            input,
            canonical_at(&neighbor_surface),
            num_strategies,
        );
    }

    if valid_samples == 0 {
        reservoir.canonical_weight = 1.0;
    }

    stream_canonical_with_pairwise_mis(&mut reservoir, sampler.sample(), input);

    reservoir
        .finalize(1.0, valid_samples.max(1) as f32 * reservoir.target_pdf);

    reservoir.canonical_weight = 0.0;
    reservoir
}
