//! Bending a mesh along a spline.
//!
//! The mesh's local X axis is treated as its length. Each vertex's X is
//! remapped to a position along the spline between `start` and `end`; its Y
//! and Z become lateral offsets in the spline frame at that position.
//! Vertices sharing a lengthwise coordinate are grouped into one slice so the
//! whole cross-section moves rigidly with a single frame.

use std::collections::HashMap;

use super::core::{Point3, Tolerance, Vec3};
use super::error::{DeformError, DeformResult};
use super::mesh::MeshGeometry;
use super::selection::{SelectionSet, effective_weight};
use super::spline::{FloatCurve, SplineEvaluator, orthogonal_unit_vector};

/// Parameters of a fit-to-spline pass.
#[derive(Clone, Copy)]
pub struct FitToSplineOptions<'a> {
    /// Normalized spline position the mesh's minimum X maps to.
    pub start: f64,
    /// Normalized spline position the mesh's maximum X maps to.
    pub end: f64,
    /// Uniform lateral scale.
    pub mesh_scale: f64,
    /// Lateral scale keyed by spline position.
    pub profile: Option<&'a dyn FloatCurve>,
    /// Lateral scale keyed by normalized position along the mesh.
    pub section_profile: Option<&'a dyn FloatCurve>,
}

impl Default for FitToSplineOptions<'_> {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            mesh_scale: 1.0,
            profile: None,
            section_profile: None,
        }
    }
}

impl<'a> FitToSplineOptions<'a> {
    #[must_use]
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_mesh_scale(mut self, mesh_scale: f64) -> Self {
        self.mesh_scale = mesh_scale;
        self
    }

    #[must_use]
    pub const fn with_profile(mut self, profile: &'a dyn FloatCurve) -> Self {
        self.profile = Some(profile);
        self
    }

    #[must_use]
    pub const fn with_section_profile(mut self, section_profile: &'a dyn FloatCurve) -> Self {
        self.section_profile = Some(section_profile);
        self
    }

    fn validate(&self) -> DeformResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() || !self.mesh_scale.is_finite() {
            return Err(DeformError::invalid(
                "fit-to-spline start, end and scale must be finite",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SliceFrame {
    location: Point3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    scale: f64,
}

impl SliceFrame {
    fn at(spline: &dyn SplineEvaluator, options: &FitToSplineOptions<'_>, alongness: f64) -> Self {
        let position = options.start + alongness * (options.end - options.start);
        let sample = spline.evaluate(position);

        let forward = sample.tangent.normalized().unwrap_or(Vec3::X);
        let right = sample
            .up
            .cross(forward)
            .normalized()
            .unwrap_or_else(|| orthogonal_unit_vector(forward));
        let up = forward.cross(right);

        let mut scale = options.mesh_scale;
        if let Some(profile) = options.profile {
            scale *= profile.value_at(position);
        }
        if let Some(section_profile) = options.section_profile {
            scale *= section_profile.value_at(alongness);
        }

        Self {
            location: sample.location,
            forward,
            right,
            up,
            scale,
        }
    }
}

impl MeshGeometry {
    /// Reprojects the mesh along `spline`. Normals are rotated into each
    /// slice's frame.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] for non-finite options,
    /// [`DeformError::SizeMismatch`] for a selection of the wrong size.
    pub fn fit_to_spline(
        &mut self,
        spline: &dyn SplineEvaluator,
        options: &FitToSplineOptions<'_>,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.check_selection(selection)?;
        options.validate()?;

        let bounds = self.bounding_box();
        let (min_x, extent) = (bounds.min.x, bounds.max.x - bounds.min.x);
        let slice_eps = Tolerance::SLICE.eps;
        let mut frames: HashMap<i64, SliceFrame> = HashMap::new();

        let mut positions = self.positions.clone();
        let mut normals = self.normals.clone();

        for (i, (p, n)) in positions.iter_mut().zip(normals.iter_mut()).enumerate() {
            let w = effective_weight(selection, i);
            if w == 0.0 {
                continue;
            }

            let alongness = if extent > Tolerance::ZERO_LENGTH.eps {
                (p.x - min_x) / extent
            } else {
                0.0
            };
            let key = (alongness / slice_eps).round() as i64;
            let frame = *frames
                .entry(key)
                .or_insert_with(|| SliceFrame::at(spline, options, key as f64 * slice_eps));

            let fitted = frame.location + frame.right * (p.y * frame.scale) + frame.up * (p.z * frame.scale);
            let turned = frame.forward * n.x + frame.right * n.y + frame.up * n.z;

            *p = p.lerp(fitted, w);
            *n = if w == 1.0 {
                turned
            } else {
                n.lerp(turned, w).normalized().unwrap_or(turned)
            };
        }

        log::debug!(
            "fit_to_spline: {} slices over spline length {:.3}",
            frames.len(),
            spline.length()
        );
        self.positions = positions;
        self.normals = normals;
        Ok(self)
    }
}
