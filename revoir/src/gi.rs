use log::debug;
use revoir_core::{
    jenkins_hash, CheckerboardMode, GiSpatialResamplingParams,
    GiSpatioTemporalResamplingParams, GiTemporalResamplingParams,
    ReservoirBufferParams, RuntimeParams,
};

use crate::{ContextResult, ResamplingMode};

/// Indirect illumination ping-pongs between two reservoir slices.
pub const NUM_GI_RESERVOIR_BUFFERS: u32 = 2;

/// Which reservoir slice each pass of the current frame reads and writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GiBufferIndices {
    /// Slice receiving the fresh bounce samples at the start of the frame.
    pub secondary_surface_output: u32,
    pub temporal_input: u32,
    pub temporal_output: u32,
    pub spatial_input: u32,
    pub spatial_output: u32,
    pub shading_input: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GiStaticParams {
    pub render_width: u32,
    pub render_height: u32,
    pub checkerboard_mode: CheckerboardMode,
}

impl Default for GiStaticParams {
    fn default() -> Self {
        Self {
            render_width: 0,
            render_height: 0,
            checkerboard_mode: CheckerboardMode::Off,
        }
    }
}

/// Per-frame state machine for the indirect-illumination resampling chain.
pub struct GiContext {
    static_params: GiStaticParams,
    frame_index: u32,
    resampling_mode: ResamplingMode,
    reservoir_buffer_params: ReservoirBufferParams,
    buffer_indices: GiBufferIndices,
    temporal_params: GiTemporalResamplingParams,
    spatial_params: GiSpatialResamplingParams,
    spatiotemporal_params: GiSpatioTemporalResamplingParams,
}

impl GiContext {
    pub fn new(static_params: GiStaticParams) -> ContextResult<Self> {
        if static_params.render_width == 0 || static_params.render_height == 0 {
            return Err(crate::ContextError::InvalidRenderExtents {
                width: static_params.render_width,
                height: static_params.render_height,
            });
        }

        let mut this = Self {
            static_params,
            frame_index: 0,
            resampling_mode: ResamplingMode::None,
            reservoir_buffer_params: ReservoirBufferParams::new(
                static_params.render_width,
                static_params.render_height,
                static_params.checkerboard_mode,
            ),
            buffer_indices: GiBufferIndices::default(),
            temporal_params: GiTemporalResamplingParams::default(),
            spatial_params: GiSpatialResamplingParams::default(),
            spatiotemporal_params: GiSpatioTemporalResamplingParams::default(),
        };

        this.update_buffer_indices();

        debug!(
            "gi context: {}x{}, checkerboard {:?}",
            static_params.render_width,
            static_params.render_height,
            static_params.checkerboard_mode,
        );

        Ok(this)
    }

    pub fn static_params(&self) -> &GiStaticParams {
        &self.static_params
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn resampling_mode(&self) -> ResamplingMode {
        self.resampling_mode
    }

    pub fn reservoir_buffer_params(&self) -> ReservoirBufferParams {
        self.reservoir_buffer_params
    }

    pub fn buffer_indices(&self) -> GiBufferIndices {
        self.buffer_indices
    }

    /// Per-frame values for the passes; the checkerboard field tracks the
    /// frame parity the same way the direct-illumination chain does.
    pub fn runtime_params(&self, neighbor_offset_count: u32) -> RuntimeParams {
        RuntimeParams {
            active_checkerboard_field: self
                .static_params
                .checkerboard_mode
                .active_field(self.frame_index),
            neighbor_offset_mask: neighbor_offset_count.wrapping_sub(1),
        }
    }

    pub fn temporal_params(&self) -> &GiTemporalResamplingParams {
        &self.temporal_params
    }

    pub fn spatial_params(&self) -> &GiSpatialResamplingParams {
        &self.spatial_params
    }

    pub fn spatiotemporal_params(&self) -> &GiSpatioTemporalResamplingParams {
        &self.spatiotemporal_params
    }

    pub fn set_frame_index(&mut self, frame_index: u32) {
        self.frame_index = frame_index;
        self.temporal_params.uniform_random_number = jenkins_hash(frame_index);
        self.spatiotemporal_params.uniform_random_number =
            jenkins_hash(frame_index);
        self.update_buffer_indices();
    }

    pub fn set_resampling_mode(&mut self, resampling_mode: ResamplingMode) {
        debug!("gi resampling mode: {resampling_mode:?}");

        self.resampling_mode = resampling_mode;
        self.update_buffer_indices();
    }

    pub fn set_temporal_params(&mut self, params: GiTemporalResamplingParams) {
        self.temporal_params = params;
        self.temporal_params.uniform_random_number =
            jenkins_hash(self.frame_index);
    }

    pub fn set_spatial_params(&mut self, params: GiSpatialResamplingParams) {
        self.spatial_params = params;
    }

    pub fn set_spatiotemporal_params(
        &mut self,
        params: GiSpatioTemporalResamplingParams,
    ) {
        self.spatiotemporal_params = params;
        self.spatiotemporal_params.uniform_random_number =
            jenkins_hash(self.frame_index);
    }

    fn update_buffer_indices(&mut self) {
        let indices = &mut self.buffer_indices;

        match self.resampling_mode {
            ResamplingMode::None => {
                indices.secondary_surface_output = 0;
                indices.shading_input = 0;
            }

            ResamplingMode::Temporal => {
                indices.secondary_surface_output = self.frame_index & 1;
                indices.temporal_input =
                    1 - indices.secondary_surface_output;
                indices.temporal_output = indices.secondary_surface_output;
                indices.shading_input = indices.temporal_output;
            }

            ResamplingMode::Spatial => {
                indices.secondary_surface_output = 0;
                indices.spatial_input = 0;
                indices.spatial_output = 1;
                indices.shading_input = 1;
            }

            ResamplingMode::TemporalAndSpatial => {
                indices.secondary_surface_output = 0;
                indices.temporal_input = 1;
                indices.temporal_output = 0;
                indices.spatial_input = 0;
                indices.spatial_output = 1;
                indices.shading_input = 1;
            }

            ResamplingMode::FusedSpatiotemporal => {
                indices.secondary_surface_output = self.frame_index & 1;
                indices.temporal_input =
                    1 - indices.secondary_surface_output;
                indices.spatial_output = indices.secondary_surface_output;
                indices.shading_input = indices.spatial_output;
            }
        }
    }
}
