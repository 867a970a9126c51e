use log::info;
use revoir_core::CheckerboardMode;

use crate::{
    ensure_pow2, ContextResult, DiContext, DiStaticParams, GiContext,
    GiStaticParams,
};

/// One segment of the presampling buffer: `tile_count` tiles of `tile_size`
/// slots each, filled by the host's light-presampling passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RisBufferSegmentParams {
    pub tile_size: u32,
    pub tile_count: u32,
}

impl Default for RisBufferSegmentParams {
    fn default() -> Self {
        Self {
            tile_size: 1024,
            tile_count: 128,
        }
    }
}

impl RisBufferSegmentParams {
    pub fn len(&self) -> u32 {
        self.tile_size * self.tile_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A segment placed within the shared presampling buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RisBufferSegment {
    pub offset: u32,
    pub params: RisBufferSegmentParams,
}

/// Contiguous region of the host's light buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightBufferRegion {
    pub first_light_index: u32,
    pub num_lights: u32,
}

/// Layout of the host's light buffer, refreshed whenever the scene's light
/// list changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightBufferParams {
    pub local_lights: LightBufferRegion,
    pub infinite_lights: LightBufferRegion,
    pub environment_light_present: bool,
    pub environment_light_index: u32,
}

/// Shared options for the whole importance-sampling stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportanceSamplingParams {
    pub render_width: u32,
    pub render_height: u32,
    pub checkerboard_mode: CheckerboardMode,
    /// Power of two; indices into the neighbor-offset buffer wrap with
    /// `count - 1`.
    pub neighbor_offset_count: u32,
    pub local_light_ris_buffer: RisBufferSegmentParams,
    pub environment_light_ris_buffer: RisBufferSegmentParams,
}

impl Default for ImportanceSamplingParams {
    fn default() -> Self {
        Self {
            render_width: 0,
            render_height: 0,
            checkerboard_mode: CheckerboardMode::Off,
            neighbor_offset_count: 8192,
            local_light_ris_buffer: RisBufferSegmentParams::default(),
            environment_light_ris_buffer: RisBufferSegmentParams::default(),
        }
    }
}

/// Umbrella context owning the direct- and indirect-illumination state
/// machines plus the buffer parameters they share.
///
/// A world-space presampling grid would slot in next to the two contexts;
/// this build runs on screen-space reuse alone.
pub struct ImportanceSamplingContext {
    di: DiContext,
    gi: GiContext,
    neighbor_offset_count: u32,
    local_light_ris_segment: RisBufferSegment,
    environment_light_ris_segment: RisBufferSegment,
    light_buffer_params: LightBufferParams,
}

impl ImportanceSamplingContext {
    pub fn new(params: ImportanceSamplingParams) -> ContextResult<Self> {
        ensure_pow2(
            "local_light_ris_buffer.tile_size",
            params.local_light_ris_buffer.tile_size,
        )?;
        ensure_pow2(
            "local_light_ris_buffer.tile_count",
            params.local_light_ris_buffer.tile_count,
        )?;
        ensure_pow2(
            "environment_light_ris_buffer.tile_size",
            params.environment_light_ris_buffer.tile_size,
        )?;
        ensure_pow2(
            "environment_light_ris_buffer.tile_count",
            params.environment_light_ris_buffer.tile_count,
        )?;

        let di = DiContext::new(DiStaticParams {
            render_width: params.render_width,
            render_height: params.render_height,
            checkerboard_mode: params.checkerboard_mode,
            neighbor_offset_count: params.neighbor_offset_count,
        })?;

        let gi = GiContext::new(GiStaticParams {
            render_width: params.render_width,
            render_height: params.render_height,
            checkerboard_mode: params.checkerboard_mode,
        })?;

        let local_light_ris_segment = RisBufferSegment {
            offset: 0,
            params: params.local_light_ris_buffer,
        };

        let environment_light_ris_segment = RisBufferSegment {
            offset: params.local_light_ris_buffer.len(),
            params: params.environment_light_ris_buffer,
        };

        info!(
            "importance sampling context: {}x{}, ris buffer {} slots",
            params.render_width,
            params.render_height,
            local_light_ris_segment.params.len()
                + environment_light_ris_segment.params.len(),
        );

        Ok(Self {
            di,
            gi,
            neighbor_offset_count: params.neighbor_offset_count,
            local_light_ris_segment,
            environment_light_ris_segment,
            light_buffer_params: LightBufferParams::default(),
        })
    }

    pub fn di(&self) -> &DiContext {
        &self.di
    }

    pub fn di_mut(&mut self) -> &mut DiContext {
        &mut self.di
    }

    pub fn gi(&self) -> &GiContext {
        &self.gi
    }

    pub fn gi_mut(&mut self) -> &mut GiContext {
        &mut self.gi
    }

    pub fn neighbor_offset_count(&self) -> u32 {
        self.neighbor_offset_count
    }

    pub fn local_light_ris_segment(&self) -> RisBufferSegment {
        self.local_light_ris_segment
    }

    pub fn environment_light_ris_segment(&self) -> RisBufferSegment {
        self.environment_light_ris_segment
    }

    /// Total slot count of the presampling buffer the host must allocate.
    pub fn ris_buffer_len(&self) -> u32 {
        self.environment_light_ris_segment.offset
            + self.environment_light_ris_segment.params.len()
    }

    pub fn light_buffer_params(&self) -> LightBufferParams {
        self.light_buffer_params
    }

    pub fn set_light_buffer_params(&mut self, params: LightBufferParams) {
        self.light_buffer_params = params;
    }

    /// Advances both chains to the given frame.
    pub fn set_frame_index(&mut self, frame_index: u32) {
        self.di.set_frame_index(frame_index);
        self.gi.set_frame_index(frame_index);
    }
}
