//! Host-facing facade around an optional [`MeshGeometry`].
//!
//! The component owns at most one mesh. Every operation first checks that a
//! mesh is loaded; when it is not, the call is skipped, a warning is logged
//! and [`DeformError::NotLoaded`] is returned. Operator failures are logged
//! and returned the same way and never leave the mesh half-modified.

use rand::Rng;

use crate::geom::{
    BBox, CollisionQuery, ConformOptions, ConformReport, DeformError, DeformMetrics, DeformResult,
    DeformTimingReport, FitToSplineOptions, MeshBuffers, MeshGeometry, NoiseOptions, Point3,
    Rotator, SectionBuffers, SelectionGenerator, SelectionSet, SplineEvaluator, TextureChannel,
    TextureSampler, TimingBucket, Transform, Vec3,
};

/// Deformable mesh component.
#[derive(Debug, Clone, Default)]
pub struct MeshDeformationComponent {
    geometry: Option<MeshGeometry>,
    metrics: DeformMetrics,
}

impl MeshDeformationComponent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_geometry(geometry: MeshGeometry) -> Self {
        Self {
            geometry: Some(geometry),
            metrics: DeformMetrics::default(),
        }
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&MeshGeometry> {
        self.geometry.as_ref()
    }

    /// Releases the mesh, leaving the component unloaded.
    pub fn take_geometry(&mut self) -> Option<MeshGeometry> {
        self.geometry.take()
    }

    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    /// Vertex count, or 0 when nothing is loaded.
    #[must_use]
    pub fn total_vertex_count(&self) -> usize {
        self.geometry.as_ref().map_or(0, MeshGeometry::vertex_count)
    }

    /// Triangle count over all sections, or 0 when nothing is loaded.
    #[must_use]
    pub fn total_triangle_count(&self) -> usize {
        self.geometry.as_ref().map_or(0, MeshGeometry::triangle_count)
    }

    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh.
    pub fn bounding_box(&self) -> DeformResult<BBox> {
        self.loaded("GetBoundingBox").map(MeshGeometry::bounding_box)
    }

    #[must_use]
    pub fn summary(&self) -> String {
        self.geometry
            .as_ref()
            .map_or_else(|| "No mesh geometry loaded".to_string(), MeshGeometry::summary)
    }

    /// Accumulated timings; `None` unless built with `deform_metrics`.
    #[must_use]
    pub fn timing_report(&self) -> Option<DeformTimingReport> {
        self.metrics.report()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    // ── import / export ─────────────────────────────────────────────────────

    /// Replaces the mesh with one built from `buffers`. On failure the
    /// component is left unloaded.
    ///
    /// # Errors
    /// [`DeformError::ImportFailure`] for malformed buffers.
    pub fn load_from_buffers(&mut self, buffers: MeshBuffers) -> DeformResult<&mut Self> {
        match self
            .metrics
            .time(TimingBucket::Import, || MeshGeometry::load_from_buffers(buffers))
        {
            Ok(geometry) => {
                debug_log!("LoadFromBuffers: {}", geometry.summary());
                self.geometry = Some(geometry);
                Ok(self)
            }
            Err(err) => {
                log::error!("LoadFromBuffers: {err}");
                self.geometry = None;
                Err(err)
            }
        }
    }

    /// Exports the shared-buffer layout, tagging whether the consumer should
    /// build collision.
    ///
    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh.
    pub fn save_to_buffers(&mut self, create_collision: bool) -> DeformResult<MeshBuffers> {
        let geometry = self.geometry.as_ref().ok_or_else(|| not_loaded("SaveToBuffers"))?;
        let buffers = self.metrics.time(TimingBucket::Export, || {
            geometry.save_to_buffers().with_collision(create_collision)
        });
        log::debug!(
            "SaveToBuffers: {} vertices, {} sections",
            buffers.positions.len(),
            buffers.sections.len()
        );
        Ok(buffers)
    }

    /// Exports one compacted buffer set per section.
    ///
    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh.
    pub fn save_sections(&mut self) -> DeformResult<Vec<SectionBuffers>> {
        let geometry = self.geometry.as_ref().ok_or_else(|| not_loaded("SaveSections"))?;
        Ok(self.metrics.time(TimingBucket::Export, || geometry.save_sections()))
    }

    // ── selection ───────────────────────────────────────────────────────────

    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh, or the generator's error.
    pub fn select(&mut self, generator: &SelectionGenerator<'_>) -> DeformResult<SelectionSet> {
        let operation = generator.name();
        let geometry = self.geometry.as_ref().ok_or_else(|| not_loaded(operation))?;
        self.metrics
            .time(TimingBucket::Selection, || geometry.select(generator))
            .inspect_err(|err| log::warn!("{operation}: {err}"))
    }

    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh.
    pub fn select_all(&mut self) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::All)
    }

    /// # Errors
    /// See [`MeshGeometry::select_near`].
    pub fn select_near(&mut self, center: Point3, inner_radius: f64, outer_radius: f64) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::Near {
            center,
            inner_radius,
            outer_radius,
        })
    }

    /// # Errors
    /// See [`MeshGeometry::select_near_line`].
    pub fn select_near_line(
        &mut self,
        start: Point3,
        end: Point3,
        inner_radius: f64,
        outer_radius: f64,
        line_is_infinite: bool,
    ) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::NearLine {
            start,
            end,
            inner_radius,
            outer_radius,
            line_is_infinite,
        })
    }

    /// # Errors
    /// See [`MeshGeometry::select_near_spline`].
    pub fn select_near_spline(
        &mut self,
        spline: &dyn SplineEvaluator,
        local_to_world: Transform,
        inner_radius: f64,
        outer_radius: f64,
    ) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::NearSpline {
            spline,
            local_to_world,
            inner_radius,
            outer_radius,
        })
    }

    /// # Errors
    /// See [`MeshGeometry::select_linear`].
    pub fn select_linear(&mut self, start: Point3, end: Point3, reverse: bool, limit_to_line: bool) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::Linear {
            start,
            end,
            reverse,
            limit_to_line,
        })
    }

    /// # Errors
    /// See [`MeshGeometry::select_by_normal`].
    pub fn select_by_normal(&mut self, facing: Vec3, inner_angle_deg: f64, outer_angle_deg: f64) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::ByNormal {
            facing,
            inner_angle_deg,
            outer_angle_deg,
        })
    }

    /// # Errors
    /// See [`MeshGeometry::select_by_noise`].
    pub fn select_by_noise(&mut self, transform: Transform, options: NoiseOptions) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::ByNoise { transform, options })
    }

    /// # Errors
    /// See [`MeshGeometry::select_by_section`].
    pub fn select_by_section(&mut self, index: usize) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::BySection { index })
    }

    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh.
    pub fn select_by_texture(&mut self, texture: &dyn TextureSampler, channel: TextureChannel) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::ByTexture { texture, channel })
    }

    /// # Errors
    /// See [`MeshGeometry::select_in_volume`].
    pub fn select_in_volume(&mut self, corner_a: Point3, corner_b: Point3) -> DeformResult<SelectionSet> {
        self.select(&SelectionGenerator::InVolume { corner_a, corner_b })
    }

    // ── deformation ─────────────────────────────────────────────────────────

    /// # Errors
    /// See [`MeshGeometry::translate`].
    pub fn translate(&mut self, delta: Vec3, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("Translate", |g| g.translate(delta, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::rotate`].
    pub fn rotate(&mut self, rotation: Rotator, center: Point3, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("Rotate", |g| g.rotate(rotation, center, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::rotate_around_axis`].
    pub fn rotate_around_axis(
        &mut self,
        center: Point3,
        axis: Vec3,
        angle_deg: f64,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.deform("RotateAroundAxis", |g| {
            g.rotate_around_axis(center, axis, angle_deg, selection)
        })
    }

    /// # Errors
    /// See [`MeshGeometry::scale`].
    pub fn scale(&mut self, scale: Vec3, center: Point3, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("Scale", |g| g.scale(scale, center, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::scale_along_axis`].
    pub fn scale_along_axis(
        &mut self,
        center: Point3,
        axis: Vec3,
        scale: f64,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.deform("ScaleAlongAxis", |g| {
            g.scale_along_axis(center, axis, scale, selection)
        })
    }

    /// # Errors
    /// See [`MeshGeometry::transform`].
    pub fn transform(&mut self, transform: Transform, center: Point3, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("Transform", |g| g.transform(transform, center, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::spherize`].
    pub fn spherize(
        &mut self,
        radius: f64,
        strength: f64,
        center: Point3,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.deform("Spherize", |g| g.spherize(radius, strength, center, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::inflate`].
    pub fn inflate(&mut self, offset: f64, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("Inflate", |g| g.inflate(offset, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::jitter`].
    pub fn jitter<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        min: Vec3,
        max: Vec3,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.deform("Jitter", |g| g.jitter(rng, min, max, selection))
    }

    /// Interpolates toward the mesh held by `target`.
    ///
    /// # Errors
    /// [`DeformError::NotLoaded`] when either component has no mesh, otherwise
    /// see [`MeshGeometry::lerp`].
    pub fn lerp(
        &mut self,
        target: &MeshDeformationComponent,
        alpha: f64,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        let Some(goal) = target.geometry.as_ref() else {
            log::warn!("Lerp: target component has no mesh geometry loaded");
            return Err(DeformError::NotLoaded { operation: "Lerp" });
        };
        self.deform("Lerp", |g| g.lerp(goal, alpha, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::lerp_vector`].
    pub fn lerp_vector(&mut self, target: Point3, alpha: f64, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("LerpVector", |g| g.lerp_vector(target, alpha, selection))
    }

    /// # Errors
    /// See [`MeshGeometry::flip_normals`].
    pub fn flip_normals(&mut self, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("FlipNormals", |g| g.flip_normals(selection))
    }

    /// # Errors
    /// See [`MeshGeometry::flip_texture_uv`].
    pub fn flip_texture_uv(&mut self, flip_u: bool, flip_v: bool, selection: Option<&SelectionSet>) -> DeformResult<&mut Self> {
        self.deform("FlipTextureUV", |g| g.flip_texture_uv(flip_u, flip_v, selection))
    }

    /// # Errors
    /// [`DeformError::NotLoaded`] without a mesh.
    pub fn recompute_normals(&mut self) -> DeformResult<&mut Self> {
        self.deform("RecomputeNormals", |g| Ok(g.recompute_normals()))
    }

    /// # Errors
    /// See [`MeshGeometry::conform`].
    pub fn conform(
        &mut self,
        world: &dyn CollisionQuery,
        options: &ConformOptions,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<ConformReport> {
        self.run("Conform", TimingBucket::Conform, |g| {
            g.conform(world, options, selection)
        })
    }

    /// # Errors
    /// See [`MeshGeometry::conform_down`].
    pub fn conform_down(
        &mut self,
        world: &dyn CollisionQuery,
        length: f64,
        options: &ConformOptions,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<ConformReport> {
        self.run("ConformDown", TimingBucket::Conform, |g| {
            g.conform_down(world, length, options, selection)
        })
    }

    /// # Errors
    /// See [`MeshGeometry::fit_to_spline`].
    pub fn fit_to_spline(
        &mut self,
        spline: &dyn SplineEvaluator,
        options: &FitToSplineOptions<'_>,
        selection: Option<&SelectionSet>,
    ) -> DeformResult<&mut Self> {
        self.run("FitToSpline", TimingBucket::Spline, |g| {
            g.fit_to_spline(spline, options, selection).map(|_| ())
        })?;
        Ok(self)
    }

    // ── plumbing ────────────────────────────────────────────────────────────

    fn loaded(&self, operation: &'static str) -> DeformResult<&MeshGeometry> {
        self.geometry.as_ref().ok_or_else(|| not_loaded(operation))
    }

    fn deform<F>(&mut self, operation: &'static str, f: F) -> DeformResult<&mut Self>
    where
        F: FnOnce(&mut MeshGeometry) -> DeformResult<&mut MeshGeometry>,
    {
        self.run(operation, TimingBucket::Deformation, |g| f(g).map(|_| ()))?;
        Ok(self)
    }

    fn run<R>(
        &mut self,
        operation: &'static str,
        bucket: TimingBucket,
        f: impl FnOnce(&mut MeshGeometry) -> DeformResult<R>,
    ) -> DeformResult<R> {
        let geometry = self.geometry.as_mut().ok_or_else(|| not_loaded(operation))?;
        self.metrics
            .time(bucket, || f(geometry))
            .inspect_err(|err| log::warn!("{operation}: {err}"))
    }
}

fn not_loaded(operation: &'static str) -> DeformError {
    let err = DeformError::NotLoaded { operation };
    log::warn!("{err}");
    err
}
