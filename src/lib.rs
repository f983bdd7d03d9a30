#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Weighted triangle-mesh deformation.
//!
//! [`geom::MeshGeometry`] holds one shared vertex buffer and its sections and
//! carries the operator library (translate, rotate, scale, spherize, inflate,
//! jitter, lerp, conform, fit-to-spline, ...). Every operator can be scoped by
//! a [`geom::SelectionSet`], a per-vertex weight mask built by the selection
//! generators. [`component::MeshDeformationComponent`] is the host-facing
//! facade that guards every call on a loaded mesh.
//!
//! World collision, splines and textures are consumed through the
//! [`geom::CollisionQuery`], [`geom::SplineEvaluator`] and
//! [`geom::TextureSampler`] traits.

macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            println!("{}", format!($($t)*));
        }
        #[cfg(not(feature = "debug_logs"))]
        {
            log::debug!($($t)*);
        }
    }};
}

pub mod component;
pub mod geom;

pub use component::MeshDeformationComponent;
pub use geom::{DeformError, DeformResult, MeshBuffers, MeshGeometry, SelectionSet};

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        /// Whether per-vertex work is spread over the rayon thread pool.
        pub const PARALLEL: bool = true;
    } else {
        /// Whether per-vertex work is spread over the rayon thread pool.
        pub const PARALLEL: bool = false;
    }
}
