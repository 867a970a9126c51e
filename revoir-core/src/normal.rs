use glam::{vec2, vec3, Vec3};

/// Normals travel through the reservoir buffers as a single word: an
/// octahedral projection of the unit sphere, quantized to two 16-bit unorm
/// halves.
pub struct Normal;

impl Normal {
    pub fn pack(n: Vec3) -> u32 {
        let n = n.normalize_or_zero();

        if n == Vec3::ZERO {
            return 0;
        }

        let flat = n.truncate() / (n.x.abs() + n.y.abs() + n.z.abs());

        // The lower hemisphere folds onto the outer corners of the square.
        let oct = if n.z < 0.0 {
            vec2(
                (1.0 - flat.y.abs()) * flat.x.signum(),
                (1.0 - flat.x.abs()) * flat.y.signum(),
            )
        } else {
            flat
        };

        let quantized = ((oct * 0.5 + 0.5) * 65535.0 + 0.5).as_uvec2();

        quantized.x | (quantized.y << 16)
    }

    /// See: [`Self::pack()`].
    pub fn unpack(d: u32) -> Vec3 {
        if d == 0 {
            return Vec3::ZERO;
        }

        let oct =
            vec2((d & 0xffff) as f32, (d >> 16) as f32) / 65535.0 * 2.0 - 1.0;

        let z = 1.0 - oct.x.abs() - oct.y.abs();

        let n = if z < 0.0 {
            vec3(
                (1.0 - oct.y.abs()) * oct.x.signum(),
                (1.0 - oct.x.abs()) * oct.y.signum(),
                z,
            )
        } else {
            oct.extend(z)
        };

        n.normalize()
    }
}
