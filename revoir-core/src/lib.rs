//! Common structs and per-pixel algorithms for revoir's reservoir
//! resampling.
//!
//! Everything in here is a pure function of its arguments: one logical task
//! per pixel, reading a previous reservoir view and returning the reservoir
//! the caller stores into the current one. Scene access goes through the
//! bridge traits, so the same code runs against a real renderer or against
//! the mock scenes used by the test-suite.

mod bridge;
mod checkerboard;
mod color;
mod layout;
mod noise;
mod normal;
mod params;
mod permutation;
mod resample;
mod reservoir;
mod utils;

pub use self::bridge::*;
pub use self::checkerboard::*;
pub use self::color::*;
pub use self::layout::*;
pub use self::noise::*;
pub use self::normal::*;
pub use self::params::*;
pub use self::permutation::*;
pub use self::resample::*;
pub use self::reservoir::*;
pub use self::utils::*;

pub mod prelude {
    pub use glam::{ivec2, uvec2, vec2, vec3, IVec2, UVec2, Vec2, Vec3};

    pub use crate::*;
}
