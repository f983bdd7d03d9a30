//! Selection generators: build a [`SelectionSet`] for a mesh from distance
//! fields, gradients, normal cones, noise, sections, textures or volumes.
//!
//! Each generator is a method on [`MeshGeometry`] and is also reachable
//! through the tagged [`SelectionGenerator`] value, which carries only the
//! fields its kind needs.

use super::core::{BBox, Point3, Tolerance, Transform, Vec3};
use super::error::{DeformError, DeformResult};
use super::mesh::MeshGeometry;
use super::noise::NoiseOptions;
use super::selection::SelectionSet;
use super::spline::SplineEvaluator;
use super::texture::{TextureChannel, TextureSampler};

/// Segments a spline is sampled into for distance queries.
pub const SPLINE_DISTANCE_SEGMENTS: usize = 64;

/// One selection generator with its parameters.
#[derive(Clone, Copy)]
pub enum SelectionGenerator<'a> {
    All,
    Near {
        center: Point3,
        inner_radius: f64,
        outer_radius: f64,
    },
    NearLine {
        start: Point3,
        end: Point3,
        inner_radius: f64,
        outer_radius: f64,
        line_is_infinite: bool,
    },
    NearSpline {
        spline: &'a dyn SplineEvaluator,
        /// Places mesh-local vertices in the spline's (world) space.
        local_to_world: Transform,
        inner_radius: f64,
        outer_radius: f64,
    },
    Linear {
        start: Point3,
        end: Point3,
        reverse: bool,
        limit_to_line: bool,
    },
    ByNormal {
        facing: Vec3,
        inner_angle_deg: f64,
        outer_angle_deg: f64,
    },
    ByNoise {
        transform: Transform,
        options: NoiseOptions,
    },
    BySection {
        index: usize,
    },
    ByTexture {
        texture: &'a dyn TextureSampler,
        channel: TextureChannel,
    },
    InVolume {
        corner_a: Point3,
        corner_b: Point3,
    },
}

impl SelectionGenerator<'_> {
    /// `Near` with inner radius 0 and outer radius 100.
    #[must_use]
    pub const fn near(center: Point3) -> Self {
        Self::Near {
            center,
            inner_radius: 0.0,
            outer_radius: 100.0,
        }
    }

    /// `ByNormal` facing +Z with a 0 to 30 degree falloff.
    #[must_use]
    pub const fn facing_up() -> Self {
        Self::ByNormal {
            facing: Vec3::Z,
            inner_angle_deg: 0.0,
            outer_angle_deg: 30.0,
        }
    }

    /// Name used in log messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::All => "SelectAll",
            Self::Near { .. } => "SelectNear",
            Self::NearLine { .. } => "SelectNearLine",
            Self::NearSpline { .. } => "SelectNearSpline",
            Self::Linear { .. } => "SelectLinear",
            Self::ByNormal { .. } => "SelectByNormal",
            Self::ByNoise { .. } => "SelectByNoise",
            Self::BySection { .. } => "SelectBySection",
            Self::ByTexture { .. } => "SelectByTexture",
            Self::InVolume { .. } => "SelectInVolume",
        }
    }
}

impl MeshGeometry {
    /// Evaluates `generator` against this mesh.
    ///
    /// # Errors
    /// Whatever the underlying generator reports.
    pub fn select(&self, generator: &SelectionGenerator<'_>) -> DeformResult<SelectionSet> {
        match *generator {
            SelectionGenerator::All => Ok(self.select_all()),
            SelectionGenerator::Near {
                center,
                inner_radius,
                outer_radius,
            } => self.select_near(center, inner_radius, outer_radius),
            SelectionGenerator::NearLine {
                start,
                end,
                inner_radius,
                outer_radius,
                line_is_infinite,
            } => self.select_near_line(start, end, inner_radius, outer_radius, line_is_infinite),
            SelectionGenerator::NearSpline {
                spline,
                local_to_world,
                inner_radius,
                outer_radius,
            } => self.select_near_spline(spline, local_to_world, inner_radius, outer_radius),
            SelectionGenerator::Linear {
                start,
                end,
                reverse,
                limit_to_line,
            } => self.select_linear(start, end, reverse, limit_to_line),
            SelectionGenerator::ByNormal {
                facing,
                inner_angle_deg,
                outer_angle_deg,
            } => self.select_by_normal(facing, inner_angle_deg, outer_angle_deg),
            SelectionGenerator::ByNoise { transform, ref options } => {
                self.select_by_noise(transform, options)
            }
            SelectionGenerator::BySection { index } => self.select_by_section(index),
            SelectionGenerator::ByTexture { texture, channel } => {
                Ok(self.select_by_texture(texture, channel))
            }
            SelectionGenerator::InVolume { corner_a, corner_b } => {
                self.select_in_volume(corner_a, corner_b)
            }
        }
    }

    /// Radial falloff around `center`: 1 inside `inner_radius`, 0 beyond
    /// `outer_radius`, linear between.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for negative, non-finite or inverted radii.
    pub fn select_near(&self, center: Point3, inner_radius: f64, outer_radius: f64) -> DeformResult<SelectionSet> {
        validate_radii(inner_radius, outer_radius)?;
        require_finite_point("center", center)?;
        Ok(self.weigh(|_, p| falloff(p.distance_to(center), inner_radius, outer_radius)))
    }

    /// Falloff by distance to the segment `start..end`, or to the whole line
    /// through both points when `line_is_infinite`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for bad radii, or an infinite line
    /// through coincident points.
    pub fn select_near_line(
        &self,
        start: Point3,
        end: Point3,
        inner_radius: f64,
        outer_radius: f64,
        line_is_infinite: bool,
    ) -> DeformResult<SelectionSet> {
        validate_radii(inner_radius, outer_radius)?;
        require_finite_point("line start", start)?;
        require_finite_point("line end", end)?;
        if line_is_infinite && start.distance_squared_to(end) <= Tolerance::ZERO_LENGTH.eps_squared() {
            return Err(DeformError::invalid("infinite line needs two distinct points"));
        }

        Ok(self.weigh(|_, p| {
            let closest = closest_on_line(p, start, end, !line_is_infinite);
            falloff(p.distance_to(closest), inner_radius, outer_radius)
        }))
    }

    /// Falloff by distance to `spline`, sampled into
    /// [`SPLINE_DISTANCE_SEGMENTS`] segments. Vertices are moved into world
    /// space by `local_to_world` before measuring.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for bad radii or a non-finite transform.
    pub fn select_near_spline(
        &self,
        spline: &dyn SplineEvaluator,
        local_to_world: Transform,
        inner_radius: f64,
        outer_radius: f64,
    ) -> DeformResult<SelectionSet> {
        validate_radii(inner_radius, outer_radius)?;
        if !local_to_world.is_finite() {
            return Err(DeformError::invalid("local-to-world transform must be finite"));
        }

        let samples: Vec<Point3> = (0..=SPLINE_DISTANCE_SEGMENTS)
            .map(|i| spline.evaluate(i as f64 / SPLINE_DISTANCE_SEGMENTS as f64).location)
            .collect();

        Ok(self.weigh(|_, p| {
            let world = local_to_world.apply_point(p);
            let distance = samples
                .windows(2)
                .map(|seg| world.distance_to(closest_on_line(world, seg[0], seg[1], true)))
                .fold(f64::INFINITY, f64::min);
            falloff(distance, inner_radius, outer_radius)
        }))
    }

    /// Gradient along `start -> end`: 0 at `start`, 1 at `end` (swapped when
    /// `reverse`). Without `limit_to_line`, weights continue past both ends.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] when `start` and `end` coincide.
    pub fn select_linear(&self, start: Point3, end: Point3, reverse: bool, limit_to_line: bool) -> DeformResult<SelectionSet> {
        require_finite_point("start", start)?;
        require_finite_point("end", end)?;
        let axis = end - start;
        let len2 = axis.length_squared();
        if len2 <= Tolerance::ZERO_LENGTH.eps_squared() {
            return Err(DeformError::invalid("linear selection needs distinct start and end"));
        }

        let gradient = |p: Point3| {
            let t = (p - start).dot(axis) / len2;
            let t = if limit_to_line { t.clamp(0.0, 1.0) } else { t };
            if reverse { 1.0 - t } else { t }
        };

        if limit_to_line {
            Ok(self.weigh(|_, p| gradient(p)))
        } else {
            Ok(SelectionSet::from_raw_weights(
                self.positions.iter().map(|&p| gradient(p)),
            ))
        }
    }

    /// Normal-cone selection: 1 within `inner_angle_deg` of `facing`, 0 past
    /// `outer_angle_deg`, linear in angle between.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for a zero facing vector or inverted angles.
    pub fn select_by_normal(&self, facing: Vec3, inner_angle_deg: f64, outer_angle_deg: f64) -> DeformResult<SelectionSet> {
        let facing = facing
            .normalized()
            .ok_or_else(|| DeformError::invalid("facing direction has zero length"))?;
        if !inner_angle_deg.is_finite() || !outer_angle_deg.is_finite() {
            return Err(DeformError::invalid("normal cone angles must be finite"));
        }
        if inner_angle_deg > outer_angle_deg {
            return Err(DeformError::invalid(format!(
                "inner angle {inner_angle_deg} exceeds outer angle {outer_angle_deg}"
            )));
        }

        let inner = inner_angle_deg.clamp(0.0, 180.0).to_radians();
        let outer = outer_angle_deg.clamp(0.0, 180.0).to_radians();
        let (cos_inner, cos_outer) = (inner.cos(), outer.cos());
        let normals = &self.normals;

        Ok(self.weigh(|i, _| {
            let Some(n) = normals[i].normalized() else {
                return 0.0;
            };
            let c = n.dot(facing);
            if c >= cos_inner {
                1.0
            } else if c <= cos_outer {
                0.0
            } else {
                // Only the band needs the actual angle.
                (outer - c.clamp(-1.0, 1.0).acos()) / (outer - inner)
            }
        }))
    }

    /// Coherent noise sampled at each vertex moved by `transform`, mapped
    /// from `[-1, 1]` to `[0, 1]`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for invalid noise options or a
    /// non-finite transform.
    pub fn select_by_noise(&self, transform: Transform, options: &NoiseOptions) -> DeformResult<SelectionSet> {
        options.validate()?;
        if !transform.is_finite() {
            return Err(DeformError::invalid("noise transform must be finite"));
        }
        Ok(self.weigh(|_, p| (options.sample(transform.apply_point(p)) + 1.0) * 0.5))
    }

    /// Every vertex referenced by section `index`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] when the section does not exist.
    pub fn select_by_section(&self, index: usize) -> DeformResult<SelectionSet> {
        let section = self.sections.get(index).ok_or_else(|| {
            DeformError::invalid(format!(
                "section {index} outside {} sections",
                self.sections.len()
            ))
        })?;

        let mut weights = vec![0.0; self.vertex_count()];
        for v in section.vertex_indices() {
            weights[v] = 1.0;
        }
        Ok(SelectionSet::from_weights(weights))
    }

    /// Texture channel sampled at each vertex's first UV channel, clamped.
    #[must_use]
    pub fn select_by_texture(&self, texture: &dyn TextureSampler, channel: TextureChannel) -> SelectionSet {
        SelectionSet::from_weights(
            self.uv_channels
                .first()
                .into_iter()
                .flatten()
                .map(|&uv| texture.sample(uv, channel)),
        )
    }

    /// Binary selection of vertices inside the box spanned by two corners,
    /// in any order.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite corners.
    pub fn select_in_volume(&self, corner_a: Point3, corner_b: Point3) -> DeformResult<SelectionSet> {
        require_finite_point("volume corner", corner_a)?;
        require_finite_point("volume corner", corner_b)?;
        let volume = BBox::from_corners(corner_a, corner_b);
        Ok(self.weigh(|_, p| if volume.contains_point(p) { 1.0 } else { 0.0 }))
    }

    fn weigh<F>(&self, weight: F) -> SelectionSet
    where
        F: Fn(usize, Point3) -> f64 + Sync,
    {
        SelectionSet::from_weights(weigh_positions(&self.positions, weight))
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        fn weigh_positions<F>(positions: &[Point3], weight: F) -> Vec<f64>
        where
            F: Fn(usize, Point3) -> f64 + Sync,
        {
            use rayon::prelude::*;
            positions.par_iter().enumerate().map(|(i, &p)| weight(i, p)).collect()
        }
    } else {
        fn weigh_positions<F>(positions: &[Point3], weight: F) -> Vec<f64>
        where
            F: Fn(usize, Point3) -> f64 + Sync,
        {
            positions.iter().enumerate().map(|(i, &p)| weight(i, p)).collect()
        }
    }
}

/// 1 up to `inner`, 0 from `outer`, linear between. Equal radii give a step.
pub(crate) fn falloff(distance: f64, inner: f64, outer: f64) -> f64 {
    if distance <= inner {
        1.0
    } else if distance >= outer {
        0.0
    } else {
        (outer - distance) / (outer - inner)
    }
}

fn validate_radii(inner: f64, outer: f64) -> DeformResult<()> {
    if !inner.is_finite() || !outer.is_finite() || inner < 0.0 {
        return Err(DeformError::invalid(format!(
            "radii must be finite and non-negative, got {inner} and {outer}"
        )));
    }
    if inner > outer {
        return Err(DeformError::invalid(format!(
            "inner radius {inner} exceeds outer radius {outer}"
        )));
    }
    Ok(())
}

fn require_finite_point(name: &str, p: Point3) -> DeformResult<()> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(DeformError::invalid(format!("{name} must be finite")))
    }
}

/// Closest point to `p` on the line through `a` and `b`, limited to the
/// segment when `clamp` is set. A degenerate segment yields `a`.
fn closest_on_line(p: Point3, a: Point3, b: Point3, clamp: bool) -> Point3 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= Tolerance::ZERO_LENGTH.eps_squared() {
        return a;
    }
    let t = (p - a).dot(ab) / len2;
    let t = if clamp { t.clamp(0.0, 1.0) } else { t };
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falloff_band() {
        assert_eq!(falloff(0.5, 1.0, 3.0), 1.0);
        assert_eq!(falloff(2.0, 1.0, 3.0), 0.5);
        assert_eq!(falloff(3.0, 1.0, 3.0), 0.0);
        assert_eq!(falloff(2.0, 2.0, 2.0), 1.0);
        assert_eq!(falloff(2.0001, 2.0, 2.0), 0.0);
    }

    #[test]
    fn test_radii_validation() {
        assert!(validate_radii(0.0, 0.0).is_ok());
        assert!(validate_radii(2.0, 1.0).is_err());
        assert!(validate_radii(-1.0, 1.0).is_err());
        assert!(validate_radii(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_closest_on_line_clamps_to_segment() {
        let a = Point3::ORIGIN;
        let b = Point3::new(10.0, 0.0, 0.0);
        let p = Point3::new(-5.0, 3.0, 0.0);
        assert_eq!(closest_on_line(p, a, b, true), a);
        assert_eq!(closest_on_line(p, a, b, false), Point3::new(-5.0, 0.0, 0.0));
    }
}
