mod buffers;
mod collision;
mod conform;
mod core;
mod deformation;
mod error;
mod fit_spline;
mod mesh;
mod metrics;
mod noise;
mod select;
mod selection;
mod spline;
mod texture;

pub use buffers::{ImportError, MeshBuffers, SectionBuffers};
pub use collision::{
    ActorId, CollisionChannel, CollisionQuery, RayHit, RayRequest, TriangleCollider,
};
pub use conform::{ConformOptions, ConformReport};
pub use core::{BBox, NormalMatrix, Point3, Rotator, Tolerance, Transform, Vec3};
pub use error::{DeformError, DeformResult};
pub use fit_spline::FitToSplineOptions;
pub use mesh::{MeshGeometry, Section, Vertex};
pub use metrics::{BucketTiming, DeformMetrics, DeformTimingReport, TimingBucket};
pub use noise::{
    CellularDistance, CellularReturn, FractalType, NoiseInterpolation, NoiseOptions, NoiseType,
};
pub use select::{SPLINE_DISTANCE_SEGMENTS, SelectionGenerator};
pub use selection::SelectionSet;
pub use spline::{FloatCurve, LinearFloatCurve, PolylineSpline, SplineEvaluator, SplineSample};
pub use texture::{GridTexture, TextureChannel, TextureSampler};

#[cfg(test)]
mod tests;
