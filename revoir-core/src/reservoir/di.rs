use bytemuck::{Pod, Zeroable};
use glam::{ivec2, vec2, IVec2, UVec2, Vec2};

use crate::ReservoirBufferParams;

/// Reservoir holding one direct-illumination light sample.
///
/// `light_data` keeps the light index in its low bits and a validity flag in
/// the top bit; `uv_data` keeps the sample point on that light as two 16-bit
/// fixed-point coordinates. Both stay packed even on the unpacked struct so
/// that resampling never loses precision over what the buffers can hold.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiReservoir {
    pub light_data: u32,
    pub uv_data: u32,
    /// Target-function value of the resident sample at the surface the
    /// reservoir currently belongs to.
    pub target_pdf: f32,
    /// Running RIS weight sum while streaming; the inverse-pdf weight after
    /// [`Self::finalize()`].
    pub weight_sum: f32,
    /// Effective sample count; zero means the reservoir is empty.
    pub m: f32,
    /// Frames since the resident sample was selected.
    pub age: u32,
    /// Accumulated screen-space travel of the resident sample.
    pub spatial_distance: IVec2,
    /// Pairwise-MIS scratch; zero outside of pairwise streaming.
    pub canonical_weight: f32,
}

impl DiReservoir {
    pub const MAX_M: u32 = 8191;
    pub const MAX_AGE: u32 = 255;
    pub const MAX_SPATIAL_DISTANCE: i32 = 127;

    const LIGHT_VALID: u32 = 0x8000_0000;
    const LIGHT_INDEX_MASK: u32 = 0x7fff_ffff;

    pub fn new(light_index: u32, uv: Vec2, target_pdf: f32, weight: f32) -> Self {
        Self {
            light_data: (light_index & Self::LIGHT_INDEX_MASK)
                | Self::LIGHT_VALID,
            uv_data: Self::pack_uv(uv),
            target_pdf,
            weight_sum: weight,
            m: 1.0,
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.m > 0.0
    }

    pub fn is_light_valid(&self) -> bool {
        self.light_data & Self::LIGHT_VALID != 0
    }

    pub fn light_index(&self) -> u32 {
        self.light_data & Self::LIGHT_INDEX_MASK
    }

    /// Swaps the resident light index, e.g. after translating it across the
    /// frame boundary; the validity bit is kept.
    pub fn set_light_index(&mut self, index: u32) {
        self.light_data =
            (index & Self::LIGHT_INDEX_MASK) | (self.light_data & Self::LIGHT_VALID);
    }

    /// Drops the resident light, leaving an inert sample that contributes
    /// nothing but still occupies the reservoir.
    pub fn kill_light(&mut self) {
        self.light_data = 0;
        self.weight_sum = 0.0;
    }

    pub fn uv(&self) -> Vec2 {
        vec2(
            (self.uv_data & 0xffff) as f32 / 65535.0,
            (self.uv_data >> 16) as f32 / 65535.0,
        )
    }

    pub fn pack_uv(uv: Vec2) -> u32 {
        let x = (uv.x.clamp(0.0, 1.0) * 65535.0 + 0.5) as u32;
        let y = (uv.y.clamp(0.0, 1.0) * 65535.0 + 0.5) as u32;

        x | (y << 16)
    }

    /// Streams another reservoir into this one; `target_pdf` is the value
    /// of the candidate's sample at *this* reservoir's surface.
    ///
    /// Returns whether the candidate became the resident sample.
    pub fn combine(
        &mut self,
        rhs: &DiReservoir,
        random: f32,
        target_pdf: f32,
    ) -> bool {
        let weight = target_pdf * rhs.weight_sum * rhs.m;

        self.m += rhs.m;
        self.weight_sum += weight;

        // `<=` keeps the comparison total when both sides are zero, so even
        // a stream of worthless candidates leaves a payload behind instead
        // of an undefined one.
        let select = random * self.weight_sum <= weight;

        if select {
            self.copy_sample(rhs, target_pdf);
        }

        select
    }

    /// Streaming step with externally-supplied weight and M, used by the
    /// pairwise-MIS path where both already carry the MIS factors.
    pub fn combine_weighted(
        &mut self,
        rhs: &DiReservoir,
        random: f32,
        target_pdf: f32,
        normalization: f32,
        m: f32,
    ) -> bool {
        let weight = target_pdf * normalization;

        self.m += m;
        self.weight_sum += weight;

        let select = random * self.weight_sum <= weight;

        if select {
            self.copy_sample(rhs, target_pdf);
        }

        select
    }

    fn copy_sample(&mut self, rhs: &DiReservoir, target_pdf: f32) {
        self.light_data = rhs.light_data;
        self.uv_data = rhs.uv_data;
        self.target_pdf = target_pdf;
        self.age = rhs.age;
        self.spatial_distance = rhs.spatial_distance;
    }

    /// Turns the streamed weight sum into the unbiased contribution weight;
    /// a zero denominator yields a zero weight instead of a NaN.
    pub fn finalize(&mut self, num: f32, den: f32) {
        self.weight_sum = if den == 0.0 {
            0.0
        } else {
            (self.weight_sum * num) / den
        };
    }

    pub fn clamp_m(&mut self, max: f32) {
        self.m = self.m.min(max);
    }

    pub fn load(
        buffer: &[PackedDiReservoir],
        params: ReservoirBufferParams,
        pos: UVec2,
        slice: u32,
    ) -> Self {
        buffer
            .get(params.offset(pos, slice))
            .copied()
            .map(Self::unpack)
            .unwrap_or_default()
    }

    pub fn store(
        &self,
        buffer: &mut [PackedDiReservoir],
        params: ReservoirBufferParams,
        pos: UVec2,
        slice: u32,
    ) {
        if let Some(slot) = buffer.get_mut(params.offset(pos, slice)) {
            *slot = self.pack();
        }
    }

    pub fn pack(&self) -> PackedDiReservoir {
        let m = (self.m as u32).min(Self::MAX_M);
        let age = self.age.min(Self::MAX_AGE);

        let dx = self
            .spatial_distance
            .x
            .clamp(-Self::MAX_SPATIAL_DISTANCE, Self::MAX_SPATIAL_DISTANCE);

        let dy = self
            .spatial_distance
            .y
            .clamp(-Self::MAX_SPATIAL_DISTANCE, Self::MAX_SPATIAL_DISTANCE);

        PackedDiReservoir {
            light_data: self.light_data,
            uv_data: self.uv_data,
            target_pdf: self.target_pdf,
            weight_sum: self.weight_sum,
            m_age: m | (age << 13),
            distance: (dx as i8 as u8 as u32) | ((dy as i8 as u8 as u32) << 8),
        }
    }

    /// See: [`Self::pack()`].
    pub fn unpack(data: PackedDiReservoir) -> Self {
        Self {
            light_data: data.light_data,
            uv_data: data.uv_data,
            target_pdf: data.target_pdf,
            weight_sum: data.weight_sum,
            m: (data.m_age & 0x1fff) as f32,
            age: (data.m_age >> 13) & 0xff,
            spatial_distance: ivec2(
                (data.distance & 0xff) as u8 as i8 as i32,
                ((data.distance >> 8) & 0xff) as u8 as i8 as i32,
            ),
            canonical_weight: 0.0,
        }
    }
}

/// Wire format of a direct-illumination reservoir; six words so that the
/// same buffer can be mapped by GPU passes without repacking.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PackedDiReservoir {
    pub light_data: u32,
    pub uv_data: u32,
    pub target_pdf: f32,
    pub weight_sum: f32,
    /// Bits 0..13 hold M, bits 13..21 hold the age.
    pub m_age: u32,
    /// Two signed bytes of screen-space travel.
    pub distance: u32,
}

/// Read-only window over one slice of a tiled reservoir buffer.
#[derive(Clone, Copy)]
pub struct DiReservoirsView<'a> {
    buffer: &'a [PackedDiReservoir],
    params: ReservoirBufferParams,
    slice: u32,
}

impl<'a> DiReservoirsView<'a> {
    pub fn new(
        buffer: &'a [PackedDiReservoir],
        params: ReservoirBufferParams,
        slice: u32,
    ) -> Self {
        Self {
            buffer,
            params,
            slice,
        }
    }

    /// Loads the reservoir at the given *reservoir* coordinate; anything
    /// outside the buffer reads as empty.
    pub fn get(&self, pos: UVec2) -> DiReservoir {
        DiReservoir::load(self.buffer, self.params, pos, self.slice)
    }
}
