//! Ground projection: drop vertices onto whatever the world's collision
//! service reports beneath (or along any projection direction from) them.

use super::collision::{ActorId, CollisionChannel, CollisionQuery, RayRequest};
use super::core::{Point3, Transform, Vec3};
use super::error::{DeformError, DeformResult};
use super::mesh::MeshGeometry;
use super::selection::{SelectionSet, effective_weight};

/// Parameters of a conform pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformOptions {
    /// Mesh-local to world transform of the owning object.
    pub transform: Transform,
    pub ignored_actors: Vec<ActorId>,
    /// World-space ray direction and length.
    pub projection: Vec3,
    /// Added to the hit height, in mesh-local units.
    pub height_adjust: f64,
    pub trace_complex: bool,
    pub channel: CollisionChannel,
}

impl Default for ConformOptions {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            ignored_actors: Vec::new(),
            projection: Vec3::new(0.0, 0.0, -100.0),
            height_adjust: 0.0,
            trace_complex: true,
            channel: CollisionChannel::WorldStatic,
        }
    }
}

impl ConformOptions {
    #[must_use]
    pub fn new(transform: Transform, projection: Vec3) -> Self {
        Self {
            transform,
            projection,
            ..Self::default()
        }
    }

    /// Straight down by `length`.
    #[must_use]
    pub fn down(length: f64) -> Self {
        Self {
            projection: Vec3::new(0.0, 0.0, -length),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_ignored_actors(mut self, actors: impl IntoIterator<Item = ActorId>) -> Self {
        self.ignored_actors = actors.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_height_adjust(mut self, height_adjust: f64) -> Self {
        self.height_adjust = height_adjust;
        self
    }

    #[must_use]
    pub const fn with_trace_complex(mut self, trace_complex: bool) -> Self {
        self.trace_complex = trace_complex;
        self
    }

    #[must_use]
    pub const fn with_channel(mut self, channel: CollisionChannel) -> Self {
        self.channel = channel;
        self
    }
}

/// Per-call outcome counts. Misses are expected, not failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConformReport {
    /// Rays cast (one per vertex with a weight above zero).
    pub traced: usize,
    pub hits: usize,
    pub misses: usize,
    /// Vertices with zero weight.
    pub skipped: usize,
}

impl MeshGeometry {
    /// Casts a ray from every selected vertex (in world space) along the
    /// projection and moves hit vertices so their local height equals the hit
    /// height plus `height_adjust`, blended by weight. Missed vertices keep
    /// their position.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for a zero or non-finite projection, a
    /// non-finite height adjust or a non-invertible transform;
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn conform(
        &mut self,
        world: &dyn CollisionQuery,
        options: &ConformOptions,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<ConformReport> {
        self.check_selection(selection)?;
        if !options.projection.is_finite() {
            return Err(DeformError::invalid("projection must be finite"));
        }
        let length = options.projection.length();
        let direction = options
            .projection
            .normalized()
            .ok_or_else(|| DeformError::invalid("projection has zero length"))?;
        if !options.height_adjust.is_finite() {
            return Err(DeformError::invalid("height adjust must be finite"));
        }
        let world_to_local = options
            .transform
            .inverse()
            .filter(Transform::is_finite)
            .ok_or_else(|| DeformError::invalid("conform transform is not invertible"))?;

        let mut report = ConformReport::default();
        let mut moved: Vec<(usize, Point3)> = Vec::new();

        for (i, &p) in self.positions.iter().enumerate() {
            let w = effective_weight(selection, i);
            if w <= 0.0 {
                report.skipped += 1;
                continue;
            }
            report.traced += 1;

            let request = RayRequest {
                origin: options.transform.apply_point(p),
                direction,
                max_distance: length,
                ignored_actors: &options.ignored_actors,
                trace_complex: options.trace_complex,
                channel: options.channel,
            };
            match world.raycast(&request) {
                Some(hit) => {
                    report.hits += 1;
                    let local_hit = world_to_local.apply_point(hit.point);
                    let target = Point3::new(p.x, p.y, local_hit.z + options.height_adjust);
                    moved.push((i, p.lerp(target, w)));
                }
                None => report.misses += 1,
            }
        }

        for (i, p) in moved {
            self.positions[i] = p;
        }

        log::debug!(
            "conform: {} traced, {} hits, {} misses, {} skipped",
            report.traced,
            report.hits,
            report.misses,
            report.skipped
        );
        Ok(report)
    }

    /// [`conform`](Self::conform) straight down by `length`, with every other
    /// option taken from `options`.
    ///
    /// # Errors
    /// As [`conform`](Self::conform).
    pub fn conform_down(
        &mut self,
        world: &dyn CollisionQuery,
        length: f64,
        options: &ConformOptions,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<ConformReport> {
        let down = ConformOptions {
            projection: Vec3::new(0.0, 0.0, -length),
            ..options.clone()
        };
        self.conform(world, &down, selection)
    }
}
