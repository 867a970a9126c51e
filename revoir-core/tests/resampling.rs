//! Pass-level tests against a mock scene: a flat plane lit by a grid of
//! point lights, with every bridge query answered analytically.

use glam::{uvec2, vec2, vec3, IVec2, UVec2, Vec2, Vec3};
use revoir_core::prelude::*;

#[derive(Clone, Copy)]
struct MockSurface {
    position: Vec3,
    normal: Vec3,
    depth: f32,
    valid: bool,
}

#[derive(Clone, Copy)]
struct MockLight {
    position: Vec3,
    intensity: f32,
}

struct MockScene {
    size: IVec2,
    lights: Vec<MockLight>,
    kill_translations: bool,
}

impl MockScene {
    fn new(size: u32) -> Self {
        let lights = (0..16)
            .map(|idx| MockLight {
                position: vec3(
                    (idx % 4) as f32 * 8.0,
                    4.0,
                    (idx / 4) as f32 * 8.0,
                ),
                intensity: 10.0 + idx as f32,
            })
            .collect();

        Self {
            size: IVec2::splat(size as i32),
            lights,
            kill_translations: false,
        }
    }
}

impl SceneBridge for MockScene {
    type Surface = MockSurface;

    fn surface_at(&self, pixel: IVec2, _previous_frame: bool) -> MockSurface {
        let valid = pixel.cmpge(IVec2::ZERO).all() && pixel.cmplt(self.size).all();

        MockSurface {
            position: vec3(pixel.x as f32, 0.0, pixel.y as f32),
            normal: Vec3::Y,
            depth: 1.0,
            valid,
        }
    }

    fn is_surface_valid(&self, surface: &MockSurface) -> bool {
        surface.valid
    }

    fn surface_world_pos(&self, surface: &MockSurface) -> Vec3 {
        surface.position
    }

    fn surface_normal(&self, surface: &MockSurface) -> Vec3 {
        surface.normal
    }

    fn surface_linear_depth(&self, surface: &MockSurface) -> f32 {
        surface.depth
    }

    fn clamp_into_view(&self, pixel: IVec2, _previous_frame: bool) -> IVec2 {
        pixel.clamp(IVec2::ZERO, self.size - 1)
    }
}

impl DiSceneBridge for MockScene {
    type LightInfo = MockLight;
    type LightSample = MockLight;

    fn light_info(&self, index: u32, _previous_frame: bool) -> Option<MockLight> {
        self.lights.get(index as usize).copied()
    }

    fn translate_light_index(
        &self,
        index: u32,
        _current_to_previous: bool,
    ) -> Option<u32> {
        if self.kill_translations {
            None
        } else {
            Some(index)
        }
    }

    fn sample_light(
        &self,
        light: &MockLight,
        _surface: &MockSurface,
        _uv: Vec2,
    ) -> MockLight {
        *light
    }

    fn light_sample_target_pdf(
        &self,
        sample: &MockLight,
        surface: &MockSurface,
    ) -> f32 {
        let to_light = sample.position - surface.position;
        let distance = to_light.length();

        if distance == 0.0 {
            return 0.0;
        }

        let cosine = surface.normal.dot(to_light / distance).max(0.0);

        sample.intensity * cosine / (distance * distance)
    }
}

impl GiSceneBridge for MockScene {
    fn gi_target_pdf(
        &self,
        _position: Vec3,
        radiance: Vec3,
        _surface: &MockSurface,
    ) -> f32 {
        radiance.luminance()
    }
}

fn runtime(neighbor_offsets: &[Vec2]) -> RuntimeParams {
    RuntimeParams {
        active_checkerboard_field: 0,
        neighbor_offset_mask: (neighbor_offsets.len() as u32).wrapping_sub(1),
    }
}

fn di_buffer(params: ReservoirBufferParams, slices: u32) -> Vec<PackedDiReservoir> {
    vec![PackedDiReservoir::default(); (slices * params.array_pitch) as usize]
}

fn gi_buffer(params: ReservoirBufferParams, slices: u32) -> Vec<PackedGiReservoir> {
    vec![PackedGiReservoir::default(); (slices * params.array_pitch) as usize]
}

fn di_target_pdf(scene: &MockScene, light_index: u32, pixel: UVec2) -> f32 {
    let surface = scene.surface_at(pixel.as_ivec2(), false);
    let light = scene.light_info(light_index, false).unwrap();
    let sample = scene.sample_light(&light, &surface, vec2(0.5, 0.5));

    scene.light_sample_target_pdf(&sample, &surface)
}

// -----------------------------------------------------------------------------

#[test]
fn streaming_selects_candidates_proportionally_to_weight() {
    let weights = [1.0f32, 2.0, 4.0, 0.5];
    let total: f32 = weights.iter().sum();

    let mut wnoise = WhiteNoise::new(0x5eed, uvec2(0, 0));
    let mut hits = [0u32; 4];

    const TRIALS: u32 = 1_000_000;

    for _ in 0..TRIALS {
        let mut reservoir = DiReservoir::default();

        for (idx, weight) in weights.iter().enumerate() {
            let candidate =
                DiReservoir::new(idx as u32, vec2(0.5, 0.5), 1.0, *weight);

            reservoir.combine(&candidate, wnoise.sample(), 1.0);
        }

        hits[reservoir.light_index() as usize] += 1;
    }

    for (idx, weight) in weights.iter().enumerate() {
        let expected = weight / total;
        let actual = hits[idx] as f32 / TRIALS as f32;

        assert!(
            (actual - expected).abs() < 0.01,
            "candidate {idx}: expected {expected}, got {actual}"
        );
    }
}

#[test]
fn streamed_m_and_weight_ignore_candidate_order() {
    let forward = [0.5f32, 1.0, 2.0, 4.0];
    let backward = [4.0f32, 2.0, 1.0, 0.5];

    let stream = |weights: &[f32]| {
        let mut wnoise = WhiteNoise::new(99, uvec2(1, 1));
        let mut reservoir = DiReservoir::default();

        for (idx, weight) in weights.iter().enumerate() {
            let candidate =
                DiReservoir::new(idx as u32, vec2(0.5, 0.5), 1.0, *weight);

            reservoir.combine(&candidate, wnoise.sample(), 1.0);
        }

        (reservoir.m, reservoir.weight_sum)
    };

    assert_eq!(stream(&forward), stream(&backward));
}

#[test]
fn finalize_yields_the_inverse_pdf() {
    let pdf = 4.0;

    // A single already-finalized candidate streamed back in: the 1/M
    // estimator must reproduce its inverse pdf.
    let candidate = DiReservoir::new(0, vec2(0.5, 0.5), pdf, 1.0 / pdf);
    let mut reservoir = DiReservoir::default();

    reservoir.combine(&candidate, 0.5, pdf);
    reservoir.finalize(1.0, reservoir.target_pdf * reservoir.m);

    assert!((reservoir.weight_sum - 1.0 / pdf).abs() < 1e-6);

    // A zero denominator zeroes the weight instead of dividing by it.
    let mut reservoir = DiReservoir::new(0, vec2(0.5, 0.5), 0.0, 0.0);

    reservoir.weight_sum = 8.0;
    reservoir.m = 2.0;
    reservoir.finalize(1.0, reservoir.target_pdf * reservoir.m);

    assert_eq!(reservoir.weight_sum, 0.0);
}

// -----------------------------------------------------------------------------

#[test]
fn temporal_pass_with_nothing_to_merge_returns_an_invalid_reservoir() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let buffer = di_buffer(params, 1);
    let mut wnoise = WhiteNoise::new(1, uvec2(8, 8));

    let pixel = uvec2(8, 8);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = di_temporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        DiReservoir::default(),
        Vec3::ZERO,
        DiReservoirsView::new(&buffer, params, 0),
        RuntimeParams::default(),
        &DiTemporalResamplingParams {
            enable_permutation_sampling: false,
            ..Default::default()
        },
    );

    assert!(!output.reservoir.is_valid());
    assert_eq!(output.reservoir.weight_sum, 0.0);
}

#[test]
fn temporal_pass_kills_reservoirs_whose_light_is_gone() {
    let mut scene = MockScene::new(16);
    scene.kill_translations = true;

    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(5, 5);
    let pdf = di_target_pdf(&scene, 3, pixel);

    DiReservoir::new(3, vec2(0.5, 0.5), pdf, 1.0 / pdf).store(
        &mut buffer,
        params,
        pixel,
        0,
    );

    let mut wnoise = WhiteNoise::new(2, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = di_temporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        DiReservoir::default(),
        Vec3::ZERO,
        DiReservoirsView::new(&buffer, params, 0),
        RuntimeParams::default(),
        &DiTemporalResamplingParams {
            enable_permutation_sampling: false,
            ..Default::default()
        },
    );

    assert!(!output.reservoir.is_light_valid());
    assert_eq!(output.reservoir.weight_sum, 0.0);
}

#[test]
fn temporal_pass_reuses_history() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(5, 5);
    let pdf = di_target_pdf(&scene, 3, pixel);

    DiReservoir::new(3, vec2(0.5, 0.5), pdf, 1.0 / pdf).store(
        &mut buffer,
        params,
        pixel,
        0,
    );

    let mut wnoise = WhiteNoise::new(3, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = di_temporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        DiReservoir::default(),
        Vec3::ZERO,
        DiReservoirsView::new(&buffer, params, 0),
        RuntimeParams::default(),
        &DiTemporalResamplingParams {
            enable_permutation_sampling: false,
            ..Default::default()
        },
    );

    let reservoir = output.reservoir;

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.light_index(), 3);
    assert_eq!(reservoir.age, 1);
    assert_eq!(output.temporal_sample_pixel, Some(pixel.as_ivec2()));

    // One perfect temporal sample: the estimator collapses to 1/pdf.
    assert!((reservoir.weight_sum - 1.0 / pdf).abs() < 1e-5 * (1.0 / pdf));
}

#[test]
fn spatial_pass_with_a_single_perfect_neighbor_matches_the_inverse_pdf() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(7, 7);
    let pdf = di_target_pdf(&scene, 1, pixel);

    let mut neighbor = DiReservoir::new(1, vec2(0.5, 0.5), pdf, 1.0 / pdf);
    neighbor.m = 4.0;
    neighbor.store(&mut buffer, params, pixel, 0);

    let neighbor_offsets = vec![Vec2::ZERO; 4];
    let mut wnoise = WhiteNoise::new(4, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    for bias_correction in [
        BiasCorrectionMode::Off,
        BiasCorrectionMode::Basic,
        BiasCorrectionMode::RayTraced,
    ] {
        let reservoir = di_spatial_resampling(
            &scene,
            &mut wnoise,
            pixel,
            &surface,
            DiReservoir::default(),
            DiReservoirsView::new(&buffer, params, 0),
            &neighbor_offsets,
            runtime(&neighbor_offsets),
            &DiSpatialResamplingParams {
                num_samples: 1,
                num_disocclusion_boost_samples: 1,
                bias_correction,
                ..Default::default()
            },
        );

        assert!(reservoir.is_valid());
        assert_eq!(reservoir.light_index(), 1);

        assert!(
            (reservoir.weight_sum - 1.0 / pdf).abs() < 1e-5,
            "{bias_correction:?}: {} != {}",
            reservoir.weight_sum,
            1.0 / pdf,
        );
    }
}

#[test]
fn spatial_pass_stays_unbiased_with_many_perfect_neighbors() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(7, 7);
    let pdf = di_target_pdf(&scene, 1, pixel);

    // All neighbors resolve to the pixel itself, so every candidate shares
    // one surface and one pdf and the normalization must collapse cleanly.
    DiReservoir::new(1, vec2(0.5, 0.5), pdf, 1.0 / pdf).store(
        &mut buffer,
        params,
        pixel,
        0,
    );

    let neighbor_offsets = vec![Vec2::ZERO; 4];
    let mut wnoise = WhiteNoise::new(5, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);
    let input = DiReservoir::new(1, vec2(0.5, 0.5), pdf, 1.0 / pdf);

    let reservoir = di_spatial_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        input,
        DiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &DiSpatialResamplingParams {
            num_samples: 3,
            num_disocclusion_boost_samples: 3,
            ..Default::default()
        },
    );

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.m, 4.0);
    assert!((reservoir.weight_sum - 1.0 / pdf).abs() < 1e-5);
}

#[test]
fn pairwise_spatial_pass_handles_the_symmetric_case() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(7, 7);
    let pdf = di_target_pdf(&scene, 1, pixel);

    DiReservoir::new(1, vec2(0.5, 0.5), pdf, 1.0 / pdf).store(
        &mut buffer,
        params,
        pixel,
        0,
    );

    let neighbor_offsets = vec![Vec2::ZERO; 4];
    let mut wnoise = WhiteNoise::new(6, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);
    let input = DiReservoir::new(1, vec2(0.5, 0.5), pdf, 1.0 / pdf);

    let reservoir = di_spatial_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        input,
        DiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &DiSpatialResamplingParams {
            num_samples: 1,
            num_disocclusion_boost_samples: 1,
            bias_correction: BiasCorrectionMode::Pairwise,
            ..Default::default()
        },
    );

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.m, 2.0);
    assert_eq!(reservoir.canonical_weight, 0.0);
    assert!((reservoir.weight_sum - 1.0 / pdf).abs() < 1e-5);
}

#[test]
fn pairwise_spatial_pass_with_no_neighbors_keeps_the_canonical_sample() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let buffer = di_buffer(params, 1);

    let pixel = uvec2(7, 7);
    let pdf = di_target_pdf(&scene, 1, pixel);

    let neighbor_offsets = vec![Vec2::ZERO; 4];
    let mut wnoise = WhiteNoise::new(7, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);
    let input = DiReservoir::new(1, vec2(0.5, 0.5), pdf, 1.0 / pdf);

    let reservoir = di_spatial_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        input,
        DiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &DiSpatialResamplingParams {
            num_samples: 1,
            num_disocclusion_boost_samples: 1,
            bias_correction: BiasCorrectionMode::Pairwise,
            ..Default::default()
        },
    );

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.light_index(), 1);
    assert!((reservoir.weight_sum - 1.0 / pdf).abs() < 1e-5);
}

#[test]
fn fused_pass_reduces_to_temporal_reuse_without_spatial_samples() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(9, 9);
    let pdf = di_target_pdf(&scene, 2, pixel);

    DiReservoir::new(2, vec2(0.5, 0.5), pdf, 1.0 / pdf).store(
        &mut buffer,
        params,
        pixel,
        0,
    );

    let neighbor_offsets = vec![Vec2::ZERO; 4];
    let mut wnoise = WhiteNoise::new(8, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = di_spatiotemporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        DiReservoir::default(),
        Vec3::ZERO,
        DiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &DiSpatioTemporalResamplingParams {
            num_spatial_samples: 0,
            num_disocclusion_boost_samples: 0,
            enable_permutation_sampling: false,
            ..Default::default()
        },
    );

    let reservoir = output.reservoir;

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.light_index(), 2);
    assert!(output.temporal_sample_pixel.is_some());
    assert!((reservoir.weight_sum - 1.0 / pdf).abs() < 1e-5);
}

#[test]
fn fused_pass_merges_temporal_and_spatial_candidates() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = di_buffer(params, 1);

    let pixel = uvec2(9, 9);
    let pdf = di_target_pdf(&scene, 2, pixel);

    // The whole previous frame carries the same perfect sample, so however
    // many candidates the pass merges, the answer must stay 1/pdf.
    for y in 0..16 {
        for x in 0..16 {
            let here = uvec2(x, y);
            let here_pdf = di_target_pdf(&scene, 2, here);

            DiReservoir::new(2, vec2(0.5, 0.5), here_pdf, 1.0 / here_pdf)
                .store(&mut buffer, params, here, 0);
        }
    }

    let neighbor_offsets = revoir_test_offsets();
    let mut wnoise = WhiteNoise::new(9, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = di_spatiotemporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        DiReservoir::default(),
        Vec3::ZERO,
        DiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &DiSpatioTemporalResamplingParams {
            num_spatial_samples: 4,
            sampling_radius: 4.0,
            enable_permutation_sampling: false,
            ..Default::default()
        },
    );

    let reservoir = output.reservoir;

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.light_index(), 2);

    // One temporal candidate plus four spatial ones.
    assert_eq!(reservoir.m, 5.0);

    // Neighboring pixels see slightly different pdfs, so a single run lands
    // near 1/pdf rather than exactly on it; unbiasedness holds only in
    // expectation.
    assert!(reservoir.weight_sum > 0.5 / pdf);
    assert!(reservoir.weight_sum < 2.0 / pdf);
}

// A handful of fixed disk offsets; enough spread for the fused pass to pick
// distinct neighbors.
fn revoir_test_offsets() -> Vec<Vec2> {
    vec![
        vec2(0.25, 0.0),
        vec2(-0.25, 0.25),
        vec2(0.0, -0.5),
        vec2(0.5, 0.5),
        vec2(-0.5, -0.25),
        vec2(0.75, -0.25),
        vec2(-0.75, 0.0),
        vec2(0.0, 0.75),
    ]
}

// -----------------------------------------------------------------------------

fn gi_sample_reservoir(radiance: Vec3) -> GiReservoir {
    let pdf = radiance.luminance();

    GiReservoir::new(
        vec3(5.0, 3.0, 5.0),
        vec3(0.0, -1.0, 0.0),
        radiance,
        1.0 / pdf,
    )
}

#[test]
fn gi_temporal_pass_reuses_history() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = gi_buffer(params, 1);

    let pixel = uvec2(5, 5);
    let radiance = vec3(2.0, 1.0, 0.5);
    let pdf = radiance.luminance();

    gi_sample_reservoir(radiance).store(&mut buffer, params, pixel, 0);

    let mut wnoise = WhiteNoise::new(10, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = gi_temporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        GiReservoir::default(),
        Vec3::ZERO,
        GiReservoirsView::new(&buffer, params, 0),
        RuntimeParams::default(),
        &GiTemporalResamplingParams::default(),
    );

    let reservoir = output.reservoir;

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.age, 1);

    // LogLuv quantizes the stored radiance, which shifts the pdf slightly.
    let stored_pdf = reservoir.radiance.luminance();

    assert!((stored_pdf - pdf).abs() < 0.05 * pdf);
    assert!((reservoir.weight_sum - 1.0 / stored_pdf).abs() < 0.05 / pdf);
}

#[test]
fn gi_temporal_pass_ages_reservoirs_until_they_expire() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = gi_buffer(params, 1);

    let pixel = uvec2(5, 5);
    let radiance = vec3(2.0, 1.0, 0.5);

    gi_sample_reservoir(radiance).store(&mut buffer, params, pixel, 0);

    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let params_with_short_history = GiTemporalResamplingParams {
        max_reservoir_age: 5,
        ..Default::default()
    };

    let mut last_age = 0;

    for frame in 0..5 {
        let mut wnoise = WhiteNoise::new(frame, pixel);

        let output = gi_temporal_resampling(
            &scene,
            &mut wnoise,
            pixel,
            &surface,
            GiReservoir::default(),
            Vec3::ZERO,
            GiReservoirsView::new(&buffer, params, 0),
            RuntimeParams::default(),
            &params_with_short_history,
        );

        let reservoir = output.reservoir;

        assert!(reservoir.is_valid());
        assert!(reservoir.age > last_age, "age must strictly increase");

        last_age = reservoir.age;
        reservoir.store(&mut buffer, params, pixel, 0);
    }

    assert_eq!(last_age, 5);

    // One more pass pushes the reservoir past its age limit.
    let mut wnoise = WhiteNoise::new(99, pixel);

    let output = gi_temporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        GiReservoir::default(),
        Vec3::ZERO,
        GiReservoirsView::new(&buffer, params, 0),
        RuntimeParams::default(),
        &params_with_short_history,
    );

    assert!(!output.reservoir.is_valid());
}

#[test]
fn gi_spatial_pass_reprojects_neighbors_through_the_jacobian() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = gi_buffer(params, 1);

    let pixel = uvec2(5, 5);
    let neighbor_pixel = uvec2(6, 5);
    let radiance = vec3(2.0, 1.0, 0.5);

    gi_sample_reservoir(radiance).store(&mut buffer, params, neighbor_pixel, 0);

    // A single offset pointing one pixel to the right.
    let neighbor_offsets = vec![vec2(1.0, 0.0)];

    let mut wnoise = WhiteNoise::new(11, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = gi_spatial_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        GiReservoir::default(),
        GiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &GiSpatialResamplingParams {
            num_samples: 1,
            sampling_radius: 1.0,
            ..Default::default()
        },
    );

    let reservoir = output;

    assert!(reservoir.is_valid());

    // The receivers sit a pixel apart, so the Jacobian is near, but not
    // exactly, one; the weight must land in its neighborhood.
    let stored_pdf = reservoir.radiance.luminance();

    assert!(reservoir.weight_sum > 0.5 / stored_pdf);
    assert!(reservoir.weight_sum < 2.0 / stored_pdf);
}

#[test]
fn gi_fused_pass_reduces_to_temporal_reuse_without_spatial_samples() {
    let scene = MockScene::new(16);
    let params = ReservoirBufferParams::new(16, 16, CheckerboardMode::Off);
    let mut buffer = gi_buffer(params, 1);

    let pixel = uvec2(9, 9);
    let radiance = vec3(1.0, 1.0, 1.0);

    gi_sample_reservoir(radiance).store(&mut buffer, params, pixel, 0);

    let neighbor_offsets = vec![Vec2::ZERO; 4];
    let mut wnoise = WhiteNoise::new(12, pixel);
    let surface = scene.surface_at(pixel.as_ivec2(), false);

    let output = gi_spatiotemporal_resampling(
        &scene,
        &mut wnoise,
        pixel,
        &surface,
        GiReservoir::default(),
        Vec3::ZERO,
        GiReservoirsView::new(&buffer, params, 0),
        &neighbor_offsets,
        runtime(&neighbor_offsets),
        &GiSpatioTemporalResamplingParams {
            num_spatial_samples: 0,
            ..Default::default()
        },
    );

    let reservoir = output.reservoir;

    assert!(reservoir.is_valid());
    assert_eq!(reservoir.age, 1);

    let stored_pdf = reservoir.radiance.luminance();

    assert!((reservoir.weight_sum - 1.0 / stored_pdf).abs() < 0.05);
}
