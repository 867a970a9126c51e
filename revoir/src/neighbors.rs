use glam::{vec2, Vec2};

/// Fills the neighbor-offset table the spatial passes index into: unit-disk
/// points from the R2 low-discrepancy sequence, rejected to the disk.
///
/// `count` must be a power of two so that pass code can wrap indices with
/// `count - 1`; the contexts validate that at construction.
pub fn fill_neighbor_offsets(count: u32) -> Vec<Vec2> {
    // Inverse of the plastic number, the 2D analogue of the golden ratio.
    const PHI2: f32 = 1.0 / 1.324_717_9;

    let mut offsets = Vec::with_capacity(count as usize);
    let mut u = 0.5f32;
    let mut v = 0.5f32;

    while offsets.len() < count as usize {
        u += PHI2;
        v += PHI2 * PHI2;

        if u >= 1.0 {
            u -= 1.0;
        }

        if v >= 1.0 {
            v -= 1.0;
        }

        let point = vec2(u - 0.5, v - 0.5);

        if point.length_squared() > 0.25 {
            continue;
        }

        offsets.push(point * 2.0);
    }

    offsets
}
