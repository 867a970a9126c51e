use glam::{IVec2, Vec2, Vec3};

/// Scene access shared by the direct- and indirect-illumination passes.
///
/// The resampling core never owns G-buffers, lights or rays; it reaches
/// through these traits instead, and the host decides how each query is
/// answered. Every method must be pure with respect to the current frame
/// (the `previous_frame` flags select last frame's view where history is
/// involved).
pub trait SceneBridge {
    type Surface: Copy;

    /// G-buffer lookup; out-of-view pixels yield an invalid surface.
    fn surface_at(&self, pixel: IVec2, previous_frame: bool) -> Self::Surface;

    fn is_surface_valid(&self, surface: &Self::Surface) -> bool;

    fn surface_world_pos(&self, surface: &Self::Surface) -> Vec3;

    fn surface_normal(&self, surface: &Self::Surface) -> Vec3;

    fn surface_linear_depth(&self, surface: &Self::Surface) -> f32;

    /// Whether two surfaces are close enough, material-wise, for their
    /// samples to be exchangeable.
    fn are_materials_similar(
        &self,
        _a: &Self::Surface,
        _b: &Self::Surface,
    ) -> bool {
        true
    }

    fn clamp_into_view(&self, pixel: IVec2, previous_frame: bool) -> IVec2;
}

/// Light access for the direct-illumination passes.
pub trait DiSceneBridge: SceneBridge {
    type LightInfo: Copy;
    type LightSample: Copy;

    /// Returns `None` for indices that don't name a light in the requested
    /// frame.
    fn light_info(
        &self,
        index: u32,
        previous_frame: bool,
    ) -> Option<Self::LightInfo>;

    /// Maps a light index across the frame boundary; `None` when the light
    /// has no counterpart (spawned or despawned).
    fn translate_light_index(
        &self,
        index: u32,
        current_to_previous: bool,
    ) -> Option<u32>;

    fn sample_light(
        &self,
        light: &Self::LightInfo,
        surface: &Self::Surface,
        uv: Vec2,
    ) -> Self::LightSample;

    /// Unnormalized target-function value of the sample at the surface.
    fn light_sample_target_pdf(
        &self,
        sample: &Self::LightSample,
        surface: &Self::Surface,
    ) -> f32;

    /// Shadow ray in the current frame's scene; conservatively visible by
    /// default.
    fn conservative_visibility(
        &self,
        _surface: &Self::Surface,
        _sample: &Self::LightSample,
    ) -> bool {
        true
    }

    /// Shadow ray in the previous frame's scene.
    fn temporal_conservative_visibility(
        &self,
        surface: &Self::Surface,
        sample: &Self::LightSample,
    ) -> bool {
        self.conservative_visibility(surface, sample)
    }
}

/// Secondary-bounce access for the indirect-illumination passes.
pub trait GiSceneBridge: SceneBridge {
    /// Unnormalized target-function value of a bounce sample at the surface.
    fn gi_target_pdf(
        &self,
        position: Vec3,
        radiance: Vec3,
        surface: &Self::Surface,
    ) -> f32;

    fn gi_conservative_visibility(
        &self,
        _surface: &Self::Surface,
        _position: Vec3,
    ) -> bool {
        true
    }

    fn gi_temporal_conservative_visibility(
        &self,
        surface: &Self::Surface,
        position: Vec3,
    ) -> bool {
        self.gi_conservative_visibility(surface, position)
    }

    /// Gate for reprojected samples; hosts reject Jacobians extreme enough
    /// to blow up the contribution.
    fn validate_gi_sample_with_jacobian(&self, jacobian: f32) -> bool {
        (0.1..=10.0).contains(&jacobian)
    }
}
