use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec3};

use crate::{F32Ext, LogLuv, Normal, ReservoirBufferParams};

/// Reservoir holding one indirect-illumination bounce sample: the secondary
/// hit point, its normal and the radiance arriving from it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GiReservoir {
    pub position: Vec3,
    pub normal: Vec3,
    pub radiance: Vec3,
    /// Running RIS weight sum while streaming; the inverse-pdf weight after
    /// [`Self::finalize()`].
    pub weight_sum: f32,
    /// Effective sample count; zero means the reservoir is empty.
    pub m: f32,
    /// Frames since the resident sample was selected.
    pub age: u32,
    /// Application-owned tag; carried verbatim, never inspected.
    pub misc_data: u32,
}

impl GiReservoir {
    pub const MAX_M: u32 = 255;
    pub const MAX_AGE: u32 = 255;

    pub fn new(position: Vec3, normal: Vec3, radiance: Vec3, weight: f32) -> Self {
        Self {
            position,
            normal,
            radiance,
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

    /// Streams another reservoir into this one; `target_pdf` is the value
    /// of the candidate's sample at *this* reservoir's surface.
    pub fn combine(
        &mut self,
        rhs: &GiReservoir,
        random: f32,
        target_pdf: f32,
    ) -> bool {
        let weight = target_pdf * rhs.weight_sum * rhs.m;

        self.m += rhs.m;
        self.weight_sum += weight;

        let select = random * self.weight_sum <= weight;

        if select {
            self.position = rhs.position;
            self.normal = rhs.normal;
            self.radiance = rhs.radiance;
            self.age = rhs.age;
            self.misc_data = rhs.misc_data;
        }

        select
    }

    /// See: [`crate::DiReservoir::finalize()`].
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

    /// Solid-angle reprojection factor for handing this sample from the
    /// receiver it was created on to a new one.
    ///
    /// Degenerate geometry (receiver on the hit point, back-facing hits)
    /// yields zero rather than a non-finite factor.
    pub fn jacobian(&self, new_receiver: Vec3, orig_receiver: Vec3) -> f32 {
        let (new_distance, new_cosine) = self.partial_jacobian(new_receiver);
        let (orig_distance, orig_cosine) = self.partial_jacobian(orig_receiver);

        let x = new_cosine * orig_distance * orig_distance;
        let y = orig_cosine * new_distance * new_distance;

        if y == 0.0 {
            return 0.0;
        }

        let jacobian = x / y;

        if jacobian.is_finite() {
            jacobian
        } else {
            0.0
        }
    }

    fn partial_jacobian(&self, receiver: Vec3) -> (f32, f32) {
        let vec = receiver - self.position;
        let distance = vec.length();

        if distance == 0.0 {
            return (0.0, 0.0);
        }

        let cosine = self.normal.dot(vec / distance).saturate();

        (distance, cosine)
    }

    pub fn load(
        buffer: &[PackedGiReservoir],
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
        buffer: &mut [PackedGiReservoir],
        params: ReservoirBufferParams,
        pos: UVec2,
        slice: u32,
    ) {
        if let Some(slot) = buffer.get_mut(params.offset(pos, slice)) {
            *slot = self.pack();
        }
    }

    pub fn pack(&self) -> PackedGiReservoir {
        let m = (self.m as u32).min(Self::MAX_M);
        let age = self.age.min(Self::MAX_AGE);

        PackedGiReservoir {
            position: self.position.to_array(),
            packed_normal: Normal::pack(self.normal),
            packed_radiance: LogLuv::encode(self.radiance),
            weight_sum: self.weight_sum,
            misc_age_m: ((self.misc_data & 0xffff) << 16) | (age << 8) | m,
            reserved: 0,
        }
    }

    /// See: [`Self::pack()`].
    pub fn unpack(data: PackedGiReservoir) -> Self {
        Self {
            position: Vec3::from_array(data.position),
            normal: Normal::unpack(data.packed_normal),
            radiance: LogLuv::decode(data.packed_radiance),
            weight_sum: data.weight_sum,
            m: (data.misc_age_m & 0xff) as f32,
            age: (data.misc_age_m >> 8) & 0xff,
            misc_data: data.misc_age_m >> 16,
        }
    }
}

/// Wire format of an indirect-illumination reservoir; eight words.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PackedGiReservoir {
    pub position: [f32; 3],
    pub packed_normal: u32,
    pub packed_radiance: u32,
    pub weight_sum: f32,
    /// Application tag in the high half, then the age byte and the M byte.
    pub misc_age_m: u32,
    pub reserved: u32,
}

/// Read-only window over one slice of a tiled reservoir buffer.
#[derive(Clone, Copy)]
pub struct GiReservoirsView<'a> {
    buffer: &'a [PackedGiReservoir],
    params: ReservoirBufferParams,
    slice: u32,
}

impl<'a> GiReservoirsView<'a> {
    pub fn new(
        buffer: &'a [PackedGiReservoir],
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
    pub fn get(&self, pos: UVec2) -> GiReservoir {
        GiReservoir::load(self.buffer, self.params, pos, self.slice)
    }
}
