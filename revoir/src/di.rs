use log::debug;
use revoir_core::{
    jenkins_hash, CheckerboardMode, DiSpatialResamplingParams,
    DiSpatioTemporalResamplingParams, DiTemporalResamplingParams,
    ReservoirBufferParams, RuntimeParams,
};

use crate::{ensure_pow2, ContextResult, ResamplingMode};

/// Direct illumination rotates through three reservoir slices so that the
/// initial-sampling, temporal and spatial passes each get a private
/// destination within one frame.
pub const NUM_DI_RESERVOIR_BUFFERS: u32 = 3;

/// Which reservoir slice each pass of the current frame reads and writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiBufferIndices {
    pub initial_sampling_output: u32,
    pub temporal_input: u32,
    pub temporal_output: u32,
    pub spatial_input: u32,
    pub spatial_output: u32,
    pub shading_input: u32,
}

/// Options fixed at context construction; changing any of them means
/// recreating the context (and the buffers sized from them).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiStaticParams {
    pub render_width: u32,
    pub render_height: u32,
    pub checkerboard_mode: CheckerboardMode,
    pub neighbor_offset_count: u32,
}

impl Default for DiStaticParams {
    fn default() -> Self {
        Self {
            render_width: 0,
            render_height: 0,
            checkerboard_mode: CheckerboardMode::Off,
            neighbor_offset_count: 8192,
        }
    }
}

/// Per-frame state machine for the direct-illumination resampling chain.
///
/// The context tracks which reservoir slice last frame's chain ended on and
/// dishes out source/destination slices for the current frame so that no
/// pass ever reads the slice it writes.
pub struct DiContext {
    static_params: DiStaticParams,
    frame_index: u32,
    last_frame_output_reservoir: u32,
    current_frame_output_reservoir: u32,
    resampling_mode: ResamplingMode,
    reservoir_buffer_params: ReservoirBufferParams,
    runtime_params: RuntimeParams,
    buffer_indices: DiBufferIndices,
    temporal_params: DiTemporalResamplingParams,
    spatial_params: DiSpatialResamplingParams,
    spatiotemporal_params: DiSpatioTemporalResamplingParams,
}

impl DiContext {
    pub fn new(static_params: DiStaticParams) -> ContextResult<Self> {
        if static_params.render_width == 0 || static_params.render_height == 0 {
            return Err(crate::ContextError::InvalidRenderExtents {
                width: static_params.render_width,
                height: static_params.render_height,
            });
        }

        ensure_pow2(
            "neighbor_offset_count",
            static_params.neighbor_offset_count,
        )?;

        let mut this = Self {
            static_params,
            frame_index: 0,
            last_frame_output_reservoir: 0,
            current_frame_output_reservoir: 0,
            resampling_mode: ResamplingMode::TemporalAndSpatial,
            reservoir_buffer_params: ReservoirBufferParams::new(
                static_params.render_width,
                static_params.render_height,
                static_params.checkerboard_mode,
            ),
            runtime_params: RuntimeParams {
                active_checkerboard_field: 0,
                neighbor_offset_mask: static_params.neighbor_offset_count - 1,
            },
            buffer_indices: DiBufferIndices::default(),
            temporal_params: DiTemporalResamplingParams::default(),
            spatial_params: DiSpatialResamplingParams::default(),
            spatiotemporal_params: DiSpatioTemporalResamplingParams::default(),
        };

        this.update_checkerboard_field();
        this.update_buffer_indices();

        debug!(
            "di context: {}x{}, checkerboard {:?}",
            static_params.render_width,
            static_params.render_height,
            static_params.checkerboard_mode,
        );

        Ok(this)
    }

    pub fn static_params(&self) -> &DiStaticParams {
        &self.static_params
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn resampling_mode(&self) -> ResamplingMode {
        self.resampling_mode
    }

    pub fn runtime_params(&self) -> RuntimeParams {
        self.runtime_params
    }

    pub fn reservoir_buffer_params(&self) -> ReservoirBufferParams {
        self.reservoir_buffer_params
    }

    pub fn buffer_indices(&self) -> DiBufferIndices {
        self.buffer_indices
    }

    pub fn temporal_params(&self) -> &DiTemporalResamplingParams {
        &self.temporal_params
    }

    pub fn spatial_params(&self) -> &DiSpatialResamplingParams {
        &self.spatial_params
    }

    pub fn spatiotemporal_params(&self) -> &DiSpatioTemporalResamplingParams {
        &self.spatiotemporal_params
    }

    /// Advances the context to the given frame, rotating the buffer indices
    /// and refreshing the per-frame permutation key.
    pub fn set_frame_index(&mut self, frame_index: u32) {
        self.frame_index = frame_index;
        self.temporal_params.uniform_random_number = jenkins_hash(frame_index);
        self.spatiotemporal_params.uniform_random_number =
            jenkins_hash(frame_index);
        self.last_frame_output_reservoir = self.current_frame_output_reservoir;
        self.update_buffer_indices();
        self.update_checkerboard_field();
    }

    pub fn set_resampling_mode(&mut self, resampling_mode: ResamplingMode) {
        debug!("di resampling mode: {resampling_mode:?}");

        self.resampling_mode = resampling_mode;
        self.update_buffer_indices();
    }

    pub fn set_temporal_params(&mut self, params: DiTemporalResamplingParams) {
        self.temporal_params = params;
        self.temporal_params.uniform_random_number =
            jenkins_hash(self.frame_index);
    }

    pub fn set_spatial_params(&mut self, params: DiSpatialResamplingParams) {
        self.spatial_params = params;
    }

    pub fn set_spatiotemporal_params(
        &mut self,
        params: DiSpatioTemporalResamplingParams,
    ) {
        self.spatiotemporal_params = params;
        self.spatiotemporal_params.uniform_random_number =
            jenkins_hash(self.frame_index);
    }

    fn update_buffer_indices(&mut self) {
        let num = NUM_DI_RESERVOIR_BUFFERS;
        let indices = &mut self.buffer_indices;

        if self.resampling_mode == ResamplingMode::FusedSpatiotemporal {
            indices.initial_sampling_output =
                (self.last_frame_output_reservoir + 1) % num;
            indices.temporal_input = self.last_frame_output_reservoir;
            indices.shading_input = indices.initial_sampling_output;
        } else {
            let use_temporal = matches!(
                self.resampling_mode,
                ResamplingMode::Temporal | ResamplingMode::TemporalAndSpatial
            );

            let use_spatial = matches!(
                self.resampling_mode,
                ResamplingMode::Spatial | ResamplingMode::TemporalAndSpatial
            );

            indices.initial_sampling_output =
                (self.last_frame_output_reservoir + 1) % num;
            indices.temporal_input = self.last_frame_output_reservoir;
            indices.temporal_output = (indices.temporal_input + 1) % num;

            indices.spatial_input = if use_temporal {
                indices.temporal_output
            } else {
                indices.initial_sampling_output
            };

            indices.spatial_output = (indices.spatial_input + 1) % num;

            indices.shading_input = if use_spatial {
                indices.spatial_output
            } else {
                indices.temporal_output
            };
        }

        self.current_frame_output_reservoir = indices.shading_input;
    }

    fn update_checkerboard_field(&mut self) {
        self.runtime_params.active_checkerboard_field = self
            .static_params
            .checkerboard_mode
            .active_field(self.frame_index);
    }
}
