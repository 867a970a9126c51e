use glam::{vec3, Mat3, Vec3};

/// 32-bit shared-exponent HDR encoding used for reservoir radiance.
///
/// Layout: log-luminance in the high 16 bits, chromaticity `v` and `u` in
/// the low two bytes. Compact enough to keep the packed reservoir at eight
/// words while surviving the multi-frame round-trips that temporal reuse
/// subjects it to.
pub struct LogLuv;

impl LogLuv {
    pub fn encode(c: Vec3) -> u32 {
        if c.cmple(Vec3::ZERO).all() {
            return 0;
        }

        let xyz = (Self::rgb_to_xyz() * c).max(Vec3::splat(1e-6));

        let le = (2.0 * xyz.y.log2() + 127.0).clamp(0.0, 255.0);
        let le = ((le * 256.0) as u32).min(0xffff);

        let u = ((xyz.x / xyz.z) * 255.0 + 0.5).clamp(0.0, 255.0) as u32;
        let v = ((xyz.y / xyz.z) * 255.0 + 0.5).clamp(0.0, 255.0) as u32;

        (le << 16) | (v << 8) | u
    }

    /// See: [`Self::encode()`].
    pub fn decode(d: u32) -> Vec3 {
        if d == 0 {
            return Vec3::ZERO;
        }

        let le = (d >> 16) as f32 / 256.0;
        let u = (d & 0xff) as f32 / 255.0;
        let v = ((d >> 8) & 0xff) as f32 / 255.0;

        if v == 0.0 {
            return Vec3::ZERO;
        }

        let y = ((le - 127.0) / 2.0).exp2();
        let xyzp = y / v;
        let xp = u * xyzp;

        (Self::xyz_to_rgb() * vec3(xp, y, xyzp)).max(Vec3::ZERO)
    }

    fn rgb_to_xyz() -> Mat3 {
        Mat3::from_cols(
            vec3(0.2209, 0.3390, 0.4184),
            vec3(0.1138, 0.6780, 0.7319),
            vec3(0.0102, 0.1130, 0.2969),
        )
    }

    fn xyz_to_rgb() -> Mat3 {
        Mat3::from_cols(
            vec3(6.0014, -2.7008, -1.7996),
            vec3(-1.3320, 3.1029, -5.7721),
            vec3(0.3008, -1.0882, 5.6268),
        )
    }
}
