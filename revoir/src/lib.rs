//! Host-side state for reservoir-based spatio-temporal importance
//! resampling.
//!
//! The per-pixel machinery lives in [`revoir_core`]; this crate owns what
//! changes between frames and what must be validated up front: the
//! source/destination rotation of the reservoir buffer slices, the pass
//! parameter blocks with their defaults, buffer sizing and the
//! neighbor-offset table.
//!
//! ```
//! use revoir::{ImportanceSamplingContext, ImportanceSamplingParams};
//!
//! let mut context =
//!     ImportanceSamplingContext::new(ImportanceSamplingParams {
//!         render_width: 1920,
//!         render_height: 1080,
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! // Once per frame, before recording any resampling work:
//! context.set_frame_index(1);
//!
//! let indices = context.di().buffer_indices();
//! assert_ne!(indices.temporal_input, indices.temporal_output);
//! ```

mod context;
mod di;
mod error;
mod gi;
mod neighbors;

pub use revoir_core;

pub use self::context::*;
pub use self::di::*;
pub use self::error::*;
pub use self::gi::*;
pub use self::neighbors::*;

/// Which resampling passes run this frame, and therefore how the reservoir
/// buffer slices rotate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResamplingMode {
    None,
    Temporal,
    Spatial,
    #[default]
    TemporalAndSpatial,
    FusedSpatiotemporal,
}
