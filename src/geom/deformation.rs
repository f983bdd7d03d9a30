//! Weighted deformation operators on [`MeshGeometry`].
//!
//! Every operator computes a target per vertex and blends toward it by the
//! vertex's selection weight (`new = lerp(old, target, w)`), which is the same
//! as `old + w * delta` for the offset-style operators. Without a selection
//! every vertex gets full effect.
//!
//! Operators validate all inputs before touching the mesh and write the new
//! buffer in one swap, so a failed call leaves the mesh unchanged.
//!
//! # Example
//!
//! ```ignore
//! use deform_engine::geom::{Point3, Rotator, Vec3};
//!
//! mesh.translate(Vec3::new(0.0, 0.0, 10.0), None)?
//!     .rotate(Rotator::new(0.0, 90.0, 0.0), Point3::ORIGIN, Some(&selection))?
//!     .inflate(2.5, None)?;
//! ```

use rand::Rng;

use super::core::{Point3, Rotator, Transform, Vec3};
use super::error::{DeformError, DeformResult};
use super::mesh::MeshGeometry;
use super::selection::{SelectionSet, effective_weight};

impl MeshGeometry {
    /// Moves vertices by `delta`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for a non-finite delta,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn translate(&mut self, delta: Vec3, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_vec("translation", delta)?;
        self.blend_positions(selection, |_, p| p + delta);
        Ok(self)
    }

    /// Rotates vertices and normals by `rotation` (degrees) about `center`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn rotate(
        &mut self,
        rotation: Rotator,
        center: Point3,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        if !rotation.is_finite() {
            return Err(DeformError::invalid("rotation must be finite"));
        }
        validate_point("center", center)?;
        self.apply_linear(rotation.to_transform(), center, selection);
        Ok(self)
    }

    /// Rotates vertices and normals by `angle_deg` about the line through
    /// `center` along `axis`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for a zero axis or non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn rotate_around_axis(
        &mut self,
        center: Point3,
        axis: Vec3,
        angle_deg: f64,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_point("center", center)?;
        validate_vec("axis", axis)?;
        validate_scalar("angle", angle_deg)?;
        let rotation = Transform::rotate_axis(axis, angle_deg.to_radians())
            .ok_or_else(|| DeformError::invalid("rotation axis has zero length"))?;
        self.apply_linear(rotation, center, selection);
        Ok(self)
    }

    /// Non-uniform scale about `center`. Normals follow the inverse-transpose.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn scale(&mut self, scale: Vec3, center: Point3, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_vec("scale", scale)?;
        validate_point("center", center)?;
        self.apply_linear(Transform::scale(scale.x, scale.y, scale.z), center, selection);
        Ok(self)
    }

    /// Scales only the component of `(position - center)` parallel to `axis`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for a zero axis or non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn scale_along_axis(
        &mut self,
        center: Point3,
        axis: Vec3,
        scale: f64,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_point("center", center)?;
        validate_vec("axis", axis)?;
        validate_scalar("scale", scale)?;
        let a = axis
            .normalized()
            .ok_or_else(|| DeformError::invalid("scale axis has zero length"))?;

        // I + (s - 1) a aᵀ, column by column.
        let k = scale - 1.0;
        let linear = Transform::from_axes(
            Point3::ORIGIN,
            Vec3::X + a * (k * a.x),
            Vec3::Y + a * (k * a.y),
            Vec3::Z + a * (k * a.z),
        );
        self.apply_linear(linear, center, selection);
        Ok(self)
    }

    /// Applies `transform` (including its translation) relative to `center`:
    /// `center + transform(position - center)`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn transform(
        &mut self,
        transform: Transform,
        center: Point3,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        if !transform.is_finite() {
            return Err(DeformError::invalid("transform must be finite"));
        }
        validate_point("center", center)?;
        self.apply_linear(transform, center, selection);
        Ok(self)
    }

    /// Pulls vertices toward the sphere of `radius` around `center`.
    ///
    /// `strength` and the selection weight multiply. A vertex sitting exactly
    /// on `center` has no direction and is left in place.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn spherize(
        &mut self,
        radius: f64,
        strength: f64,
        center: Point3,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_scalar("radius", radius)?;
        validate_scalar("strength", strength)?;
        validate_point("center", center)?;
        self.blend_positions(selection, |_, p| match (p - center).normalized() {
            Some(dir) => p.lerp(center + dir * radius, strength),
            None => p,
        });
        Ok(self)
    }

    /// Moves each vertex `offset` units along its own normal.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for a non-finite offset,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn inflate(&mut self, offset: f64, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_scalar("offset", offset)?;
        let normals = &self.normals;
        let targets = blend(&self.positions, selection, |i, p| p + normals[i] * offset);
        self.positions = targets;
        Ok(self)
    }

    /// Offsets every vertex by a random vector with components drawn
    /// uniformly from `[min, max]` (per-component bounds may come in either
    /// order).
    ///
    /// Three values are drawn for every vertex whether selected or not, so the
    /// stream advances identically for any selection.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite bounds or a span too wide
    /// to represent, [`DeformError::SizeMismatch`] for a selection of the
    /// wrong size.
    pub fn jitter<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        min: Vec3,
        max: Vec3,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_vec("jitter min", min)?;
        validate_vec("jitter max", max)?;
        let (lo, hi) = (min.min(max), min.max(max));
        if !(hi - lo).is_finite() {
            return Err(DeformError::invalid("jitter span must be finite"));
        }

        let offsets: Vec<Vec3> = (0..self.vertex_count())
            .map(|_| {
                Vec3::new(
                    rng.random_range(lo.x..=hi.x),
                    rng.random_range(lo.y..=hi.y),
                    rng.random_range(lo.z..=hi.z),
                )
            })
            .collect();
        self.blend_positions(selection, |i, p| p + offsets[i]);
        Ok(self)
    }

    /// Interpolates positions toward `target`'s positions by `alpha`; the
    /// selection weight multiplies `alpha` per vertex.
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] when `target` has a different vertex
    /// count or the selection is the wrong size, [`DeformError::InvalidRange`]
    /// for a non-finite alpha.
    pub fn lerp(&mut self, target: &MeshGeometry, alpha: f64, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        if target.vertex_count() != self.vertex_count() {
            return Err(DeformError::SizeMismatch {
                expected: self.vertex_count(),
                actual: target.vertex_count(),
            });
        }
        validate_scalar("alpha", alpha)?;
        let goal = &target.positions;
        let targets = blend(&self.positions, selection, |i, p| p.lerp(goal[i], alpha));
        self.positions = targets;
        Ok(self)
    }

    /// Interpolates every position toward the single point `target`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite inputs,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn lerp_vector(&mut self, target: Point3, alpha: f64, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        validate_point("target", target)?;
        validate_scalar("alpha", alpha)?;
        self.blend_positions(selection, |_, p| p.lerp(target, alpha));
        Ok(self)
    }

    /// Negates the normal of every vertex with a weight above zero.
    ///
    /// A flip has no partial state, so the weight acts as a threshold rather
    /// than a blend factor.
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn flip_normals(&mut self, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        for (i, n) in self.normals.iter_mut().enumerate() {
            if effective_weight(selection, i) > 0.0 {
                *n = -*n;
            }
        }
        Ok(self)
    }

    /// Mirrors UVs (`u = 1 - u`, `v = 1 - v`) in every channel for vertices
    /// with a weight above zero. Threshold semantics as in
    /// [`flip_normals`](Self::flip_normals).
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn flip_texture_uv(
        &mut self,
        flip_u: bool,
        flip_v: bool,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        for channel in &mut self.uv_channels {
            for (i, uv) in channel.iter_mut().enumerate() {
                if effective_weight(selection, i) <= 0.0 {
                    continue;
                }
                if flip_u {
                    uv[0] = 1.0 - uv[0];
                }
                if flip_v {
                    uv[1] = 1.0 - uv[1];
                }
            }
        }
        Ok(self)
    }

    pub(crate) fn blend_positions<F>(&mut self, selection: Option<&SelectionSet>, target: F)
    where
        F: Fn(usize, Point3) -> Point3 + Sync,
    {
        self.positions = blend(&self.positions, selection, target);
    }

    /// `center + transform(p - center)` for positions; inverse-transpose for
    /// normals, blended and renormalized.
    fn apply_linear(&mut self, transform: Transform, center: Point3, selection: Option<&SelectionSet>) {
        let offset = center.to_vec3();
        self.blend_positions(selection, |_, p| {
            transform.apply_point(Point3::from(p - center)) + offset
        });

        let Some(normal_matrix) = transform.normal_matrix() else {
            return;
        };
        let normals = blend_vectors(&self.normals, selection, |_, n| normal_matrix.apply(n));
        self.normals = normals;
    }
}

#[inline]
fn blend_one(p: Point3, w: f64, target: impl FnOnce() -> Point3) -> Point3 {
    if w == 0.0 {
        p
    } else if w == 1.0 {
        target()
    } else {
        p.lerp(target(), w)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallel")] {
        fn blend<F>(positions: &[Point3], selection: Option<&SelectionSet>, target: F) -> Vec<Point3>
        where
            F: Fn(usize, Point3) -> Point3 + Sync,
        {
            use rayon::prelude::*;
            positions
                .par_iter()
                .enumerate()
                .map(|(i, &p)| blend_one(p, effective_weight(selection, i), || target(i, p)))
                .collect()
        }
    } else {
        fn blend<F>(positions: &[Point3], selection: Option<&SelectionSet>, target: F) -> Vec<Point3>
        where
            F: Fn(usize, Point3) -> Point3 + Sync,
        {
            positions
                .iter()
                .enumerate()
                .map(|(i, &p)| blend_one(p, effective_weight(selection, i), || target(i, p)))
                .collect()
        }
    }
}

fn blend_vectors<F>(vectors: &[Vec3], selection: Option<&SelectionSet>, target: F) -> Vec<Vec3>
where
    F: Fn(usize, Vec3) -> Vec3,
{
    vectors
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let w = effective_weight(selection, i);
            if w == 0.0 {
                return n;
            }
            let t = target(i, n);
            if w == 1.0 {
                t
            } else {
                n.lerp(t, w).normalized().unwrap_or(t)
            }
        })
        .collect()
}

fn validate_scalar(name: &str, value: f64) -> DeformResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DeformError::invalid(format!("{name} must be finite, got {value}")))
    }
}

fn validate_vec(name: &str, v: Vec3) -> DeformResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(DeformError::invalid(format!("{name} must be finite")))
    }
}

fn validate_point(name: &str, p: Point3) -> DeformResult<()> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(DeformError::invalid(format!("{name} must be finite")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::buffers::MeshBuffers;

    fn triangle() -> MeshGeometry {
        MeshBuffers::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![vec![0, 1, 2]],
        )
        .with_uv_channel(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])
        .into_geometry()
        .unwrap()
    }

    #[test]
    fn test_failed_call_leaves_mesh_untouched() {
        let mut mesh = triangle();
        let before = mesh.clone();
        let wrong = SelectionSet::all_selected(2);
        assert!(mesh.translate(Vec3::X, Some(&wrong)).is_err());
        assert!(mesh.translate(Vec3::new(f64::NAN, 0.0, 0.0), None).is_err());
        assert!(mesh.rotate_around_axis(Point3::ORIGIN, Vec3::ZERO, 45.0, None).is_err());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_rotate_about_center() {
        let mut mesh = triangle();
        mesh.rotate(Rotator::new(0.0, 90.0, 0.0), Point3::new(1.0, 0.0, 0.0), None)
            .unwrap();
        let p = mesh.positions()[0];
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y + 1.0).abs() < 1e-12);
        assert!((mesh.normals()[0].z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_along_axis_keeps_orthogonal_component() {
        let mut mesh = triangle();
        mesh.scale_along_axis(Point3::ORIGIN, Vec3::new(0.0, 2.0, 0.0), 3.0, None)
            .unwrap();
        assert_eq!(mesh.positions()[1], Point3::new(1.0, 0.0, 0.0));
        assert!((mesh.positions()[2].y - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_flip_normals_uses_threshold() {
        let mut mesh = triangle();
        let sel = SelectionSet::from_weights([0.0, 0.01, 1.0]);
        mesh.flip_normals(Some(&sel)).unwrap();
        assert_eq!(mesh.normals()[0].z, 1.0);
        assert_eq!(mesh.normals()[1].z, -1.0);
        assert_eq!(mesh.normals()[2].z, -1.0);
    }
}
