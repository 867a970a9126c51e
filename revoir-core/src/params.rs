//! Parameter blocks for the resampling passes.
//!
//! Defaults follow what the host contexts hand out before the application
//! overrides anything; hosts own these structs and re-upload them whenever
//! they change.

/// How the MIS denominator of a resampling pass is normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BiasCorrectionMode {
    /// Plain `1/M` normalization; cheapest, darkens edges.
    Off,
    /// MIS-like normalization using the target pdf at each contributing
    /// surface.
    #[default]
    Basic,
    /// As `Basic`, plus a shadow ray per contributing surface to zero out
    /// occluded contributions.
    RayTraced,
    /// Pairwise MIS against the canonical sample; direct illumination only.
    Pairwise,
}

/// Per-frame values shared by every pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeParams {
    /// 0 when checkerboarding is off, otherwise the field (1 or 2) active
    /// this frame.
    pub active_checkerboard_field: u32,
    /// `neighbor_offset_count - 1`; the offset buffer length is a power of
    /// two so indices wrap with a mask.
    pub neighbor_offset_mask: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiTemporalResamplingParams {
    pub normal_threshold: f32,
    pub depth_threshold: f32,
    /// Cap on the temporal M, expressed as a multiple of the input
    /// reservoir's M.
    pub max_history_length: u32,
    pub enable_permutation_sampling: bool,
    /// Host-side policy knob: fraction of frames on which hosts typically
    /// keep permutation sampling enabled. Not consumed by the pass itself.
    pub permutation_sampling_threshold: f32,
    pub enable_boiling_filter: bool,
    pub boiling_filter_strength: f32,
    /// Skip the bias-correction shadow ray for samples that were already
    /// resident in the previous frame.
    pub enable_visibility_shortcut: bool,
    pub bias_correction: BiasCorrectionMode,
    /// Per-frame permutation key; refreshed by the host on every
    /// `set_frame_index`.
    pub uniform_random_number: u32,
}

impl Default for DiTemporalResamplingParams {
    fn default() -> Self {
        Self {
            normal_threshold: 0.5,
            depth_threshold: 0.1,
            max_history_length: 20,
            enable_permutation_sampling: true,
            permutation_sampling_threshold: 0.9,
            enable_boiling_filter: true,
            boiling_filter_strength: 0.2,
            enable_visibility_shortcut: false,
            bias_correction: BiasCorrectionMode::Basic,
            uniform_random_number: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiSpatialResamplingParams {
    pub normal_threshold: f32,
    pub depth_threshold: f32,
    pub num_samples: u32,
    /// Sample count used instead of `num_samples` for pixels whose input
    /// reservoir is younger than `target_history_length`.
    pub num_disocclusion_boost_samples: u32,
    pub target_history_length: u32,
    pub sampling_radius: f32,
    /// Skip neighbors that carry nothing but their own initial samples.
    pub discount_naive_samples: bool,
    pub bias_correction: BiasCorrectionMode,
}

impl Default for DiSpatialResamplingParams {
    fn default() -> Self {
        Self {
            normal_threshold: 0.5,
            depth_threshold: 0.1,
            num_samples: 1,
            num_disocclusion_boost_samples: 8,
            target_history_length: 20,
            sampling_radius: 32.0,
            discount_naive_samples: false,
            bias_correction: BiasCorrectionMode::Basic,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiSpatioTemporalResamplingParams {
    pub normal_threshold: f32,
    pub depth_threshold: f32,
    pub max_history_length: u32,
    pub num_spatial_samples: u32,
    pub num_disocclusion_boost_samples: u32,
    pub sampling_radius: f32,
    pub enable_permutation_sampling: bool,
    /// When the temporal search fails, retry around the current pixel with
    /// the surface-similarity tests disabled.
    pub enable_fallback_sampling: bool,
    pub enable_visibility_shortcut: bool,
    pub enable_boiling_filter: bool,
    pub boiling_filter_strength: f32,
    pub discount_naive_samples: bool,
    pub bias_correction: BiasCorrectionMode,
    pub uniform_random_number: u32,
}

impl Default for DiSpatioTemporalResamplingParams {
    fn default() -> Self {
        Self {
            normal_threshold: 0.5,
            depth_threshold: 0.1,
            max_history_length: 20,
            num_spatial_samples: 2,
            num_disocclusion_boost_samples: 8,
            sampling_radius: 32.0,
            enable_permutation_sampling: true,
            enable_fallback_sampling: true,
            enable_visibility_shortcut: false,
            enable_boiling_filter: true,
            boiling_filter_strength: 0.2,
            discount_naive_samples: false,
            bias_correction: BiasCorrectionMode::Basic,
            uniform_random_number: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GiTemporalResamplingParams {
    pub normal_threshold: f32,
    pub depth_threshold: f32,
    pub max_history_length: u32,
    /// Reservoirs older than this many frames are discarded wholesale.
    pub max_reservoir_age: u32,
    pub enable_permutation_sampling: bool,
    /// When reprojection finds no usable surface, reuse the reservoir under
    /// the current pixel without similarity tests.
    pub enable_fallback_sampling: bool,
    pub enable_boiling_filter: bool,
    pub boiling_filter_strength: f32,
    pub bias_correction: BiasCorrectionMode,
    pub uniform_random_number: u32,
}

impl Default for GiTemporalResamplingParams {
    fn default() -> Self {
        Self {
            normal_threshold: 0.6,
            depth_threshold: 0.1,
            max_history_length: 8,
            max_reservoir_age: 30,
            enable_permutation_sampling: false,
            enable_fallback_sampling: true,
            enable_boiling_filter: true,
            boiling_filter_strength: 0.2,
            bias_correction: BiasCorrectionMode::Basic,
            uniform_random_number: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GiSpatialResamplingParams {
    pub normal_threshold: f32,
    pub depth_threshold: f32,
    pub num_samples: u32,
    pub sampling_radius: f32,
    pub bias_correction: BiasCorrectionMode,
}

impl Default for GiSpatialResamplingParams {
    fn default() -> Self {
        Self {
            normal_threshold: 0.6,
            depth_threshold: 0.1,
            num_samples: 2,
            sampling_radius: 32.0,
            bias_correction: BiasCorrectionMode::Basic,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GiSpatioTemporalResamplingParams {
    pub normal_threshold: f32,
    pub depth_threshold: f32,
    pub max_history_length: u32,
    pub max_reservoir_age: u32,
    pub num_spatial_samples: u32,
    pub sampling_radius: f32,
    pub enable_permutation_sampling: bool,
    pub enable_fallback_sampling: bool,
    pub enable_boiling_filter: bool,
    pub boiling_filter_strength: f32,
    pub bias_correction: BiasCorrectionMode,
    pub uniform_random_number: u32,
}

impl Default for GiSpatioTemporalResamplingParams {
    fn default() -> Self {
        Self {
            normal_threshold: 0.6,
            depth_threshold: 0.1,
            max_history_length: 8,
            max_reservoir_age: 30,
            num_spatial_samples: 2,
            sampling_radius: 32.0,
            enable_permutation_sampling: false,
            enable_fallback_sampling: true,
            enable_boiling_filter: true,
            boiling_filter_strength: 0.2,
            bias_correction: BiasCorrectionMode::Basic,
            uniform_random_number: 0,
        }
    }
}
