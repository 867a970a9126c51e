use glam::{ivec2, IVec2};

/// Deterministic pixel shuffle applied when fetching previous-frame
/// reservoirs; trades reprojection accuracy for decorrelation of the error.
///
/// `uniform_random` is one value per frame (see [`crate::jenkins_hash`]),
/// identical across pixels, which keeps the shuffle an involution: applying
/// it twice with the same value yields the original pixel.
pub fn apply_permutation_sampling(prev_pos: IVec2, uniform_random: u32) -> IVec2 {
    let offset = ivec2(
        (uniform_random & 3) as i32,
        ((uniform_random >> 2) & 3) as i32,
    );

    let mut pos = prev_pos + offset;

    pos.x ^= 3;
    pos.y ^= 3;

    pos - offset
}
