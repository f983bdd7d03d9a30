use super::core::{BBox, Point3, Vec3};
use super::error::DeformResult;
use super::selection::SelectionSet;

/// An independently indexed triangle group, typically one material slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    triangles: Vec<[u32; 3]>,
}

impl Section {
    #[must_use]
    pub(crate) fn new(triangles: Vec<[u32; 3]>) -> Self {
        Self { triangles }
    }

    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Vertex indices referenced by this section, in triangle order (may repeat).
    pub fn vertex_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.triangles.iter().flatten().map(|&i| i as usize)
    }
}

/// Snapshot of one vertex's attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Point3,
    pub normal: Vec3,
    /// One UV per channel.
    pub uvs: Vec<[f64; 2]>,
}

/// Editable triangle mesh: one shared vertex buffer plus one or more sections.
///
/// The vertex count is fixed for the lifetime of the value; operators only
/// rewrite positions, normals and UVs. A `MeshGeometry` only exists after a
/// successful import (see [`MeshGeometry::load_from_buffers`]).
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    pub(crate) positions: Vec<Point3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) uv_channels: Vec<Vec<[f64; 2]>>,
    pub(crate) sections: Vec<Section>,
}

impl MeshGeometry {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.sections.iter().map(Section::triangle_count).sum()
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    #[must_use]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[must_use]
    pub fn uv_channel_count(&self) -> usize {
        self.uv_channels.len()
    }

    #[must_use]
    pub fn uv_channel(&self, channel: usize) -> Option<&[[f64; 2]]> {
        self.uv_channels.get(channel).map(Vec::as_slice)
    }

    #[must_use]
    pub fn vertex(&self, index: usize) -> Option<Vertex> {
        Some(Vertex {
            position: *self.positions.get(index)?,
            normal: *self.normals.get(index)?,
            uvs: self.uv_channels.iter().map(|uvs| uvs[index]).collect(),
        })
    }

    /// Axis-aligned bounds of the current vertex positions.
    #[must_use]
    pub fn bounding_box(&self) -> BBox {
        // Import guarantees at least one vertex.
        BBox::from_points(&self.positions).unwrap_or_default()
    }

    /// Short human-readable description of the mesh layout.
    #[must_use]
    pub fn summary(&self) -> String {
        let per_section: Vec<String> = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| format!("section {i}: {} triangles", s.triangle_count()))
            .collect();
        format!(
            "{} vertices, {} triangles, {} sections, {} UV channels [{}]",
            self.vertex_count(),
            self.triangle_count(),
            self.section_count(),
            self.uv_channel_count(),
            per_section.join(", ")
        )
    }

    /// Rebuilds area-weighted vertex normals from the current positions.
    ///
    /// Vertices not referenced by any triangle (or only by degenerate ones)
    /// get +Z.
    pub fn recompute_normals(&mut self) -> &mut Self {
        self.normals = compute_smooth_normals(&self.positions, &self.sections);
        self
    }

    /// Full selection sized to this mesh.
    #[must_use]
    pub fn select_all(&self) -> SelectionSet {
        SelectionSet::all_selected(self.vertex_count())
    }

    /// Fails when `selection` was built for a different vertex count.
    pub(crate) fn check_selection(&self, selection: Option<&SelectionSet>) -> DeformResult<()> {
        match selection {
            Some(s) => s.ensure_len(self.vertex_count()),
            None => Ok(()),
        }
    }
}

pub(crate) fn compute_smooth_normals(positions: &[Point3], sections: &[Section]) -> Vec<Vec3> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    for tri in sections.iter().flat_map(Section::triangles) {
        let [i0, i1, i2] = tri.map(|i| i as usize);
        let (Some(&a), Some(&b), Some(&c)) = (positions.get(i0), positions.get(i1), positions.get(i2))
        else {
            continue;
        };
        // Cross product magnitude weights by twice the triangle area.
        let face_normal = b.sub_point(a).cross(c.sub_point(a));
        accum[i0] += face_normal;
        accum[i1] += face_normal;
        accum[i2] += face_normal;
    }

    accum
        .into_iter()
        .map(|n| n.normalized().unwrap_or(Vec3::Z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::buffers::MeshBuffers;

    fn two_section_quad() -> MeshGeometry {
        MeshBuffers::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![vec![0, 1, 2], vec![0, 2, 3]],
        )
        .with_uv_channel(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
        .into_geometry()
        .unwrap()
    }

    #[test]
    fn test_counts_and_summary() {
        let mesh = two_section_quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.section_count(), 2);
        let summary = mesh.summary();
        assert!(summary.starts_with("4 vertices, 2 triangles, 2 sections"));
        assert!(summary.contains("section 1: 1 triangles"));
    }

    #[test]
    fn test_missing_normals_are_computed_on_import() {
        let mesh = two_section_quad();
        for n in mesh.normals() {
            assert!((n.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_vertex_snapshot() {
        let mesh = two_section_quad();
        let v = mesh.vertex(2).unwrap();
        assert_eq!(v.position, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(v.uvs, vec![[1.0, 1.0]]);
        assert!(mesh.vertex(4).is_none());
    }

    #[test]
    fn test_bounding_box() {
        let mesh = two_section_quad();
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(1.0, 1.0, 0.0));
    }
}
