//! Import/export boundary between [`MeshGeometry`] and raw host buffers.
//!
//! Hosts hand over flat vertex attribute arrays plus one index list per
//! section. Import either produces a fully valid mesh or fails with an
//! [`ImportError`]; nothing is partially constructed.
//!
//! # Example
//!
//! ```ignore
//! use deform_engine::geom::MeshBuffers;
//!
//! let mesh = MeshBuffers::new(positions, vec![indices])
//!     .with_normals(normals)
//!     .with_uv_channel(uvs)
//!     .into_geometry()?;
//! let exported = mesh.save_to_buffers();
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::core::{Point3, Vec3};
use super::error::DeformResult;
use super::mesh::{MeshGeometry, Section, compute_smooth_normals};

/// Reasons a set of source buffers cannot become a mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("vertex buffer is empty")]
    EmptyVertices,

    #[error("mesh has no sections")]
    EmptySections,

    #[error("section {section} has no triangles")]
    EmptySection { section: usize },

    #[error("section {section} index count {len} is not a multiple of 3")]
    NotTriangleList { section: usize, len: usize },

    #[error("section {section} references vertex {index} but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        section: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("{attribute} buffer has {actual} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("at least one UV channel is required")]
    NoUvChannels,

    #[error("vertex {index} has a non-finite attribute")]
    NonFiniteVertex { index: usize },
}

/// Raw mesh data in the host's buffer layout (shared vertex buffer).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub positions: Vec<[f64; 3]>,
    /// Same length as `positions`, or empty to have normals computed on import.
    pub normals: Vec<[f64; 3]>,
    /// One or more channels, each the same length as `positions`.
    pub uv_channels: Vec<Vec<[f64; 2]>>,
    /// Flat triangle index lists, one per section.
    pub sections: Vec<Vec<u32>>,
    /// Whether the consumer should build a collision hull. Carried through
    /// untouched; hull generation belongs to the exporter.
    pub create_collision: bool,
}

impl MeshBuffers {
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, sections: Vec<Vec<u32>>) -> Self {
        Self {
            positions,
            sections,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<[f64; 3]>) -> Self {
        self.normals = normals;
        self
    }

    #[must_use]
    pub fn with_uv_channel(mut self, uvs: Vec<[f64; 2]>) -> Self {
        self.uv_channels.push(uvs);
        self
    }

    #[must_use]
    pub const fn with_collision(mut self, create_collision: bool) -> Self {
        self.create_collision = create_collision;
        self
    }

    /// Shorthand for [`MeshGeometry::load_from_buffers`].
    ///
    /// # Errors
    /// See [`MeshGeometry::load_from_buffers`].
    pub fn into_geometry(self) -> DeformResult<MeshGeometry> {
        MeshGeometry::load_from_buffers(self)
    }

    fn validate(&self) -> Result<(), ImportError> {
        let n = self.positions.len();
        if n == 0 {
            return Err(ImportError::EmptyVertices);
        }
        if self.sections.is_empty() {
            return Err(ImportError::EmptySections);
        }

        for (section, indices) in self.sections.iter().enumerate() {
            if indices.is_empty() {
                return Err(ImportError::EmptySection { section });
            }
            if indices.len() % 3 != 0 {
                return Err(ImportError::NotTriangleList {
                    section,
                    len: indices.len(),
                });
            }
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= n) {
                return Err(ImportError::IndexOutOfRange {
                    section,
                    index,
                    vertex_count: n,
                });
            }
        }

        if !self.normals.is_empty() && self.normals.len() != n {
            return Err(ImportError::AttributeLength {
                attribute: "normal",
                expected: n,
                actual: self.normals.len(),
            });
        }
        if self.uv_channels.is_empty() {
            return Err(ImportError::NoUvChannels);
        }
        for uvs in &self.uv_channels {
            if uvs.len() != n {
                return Err(ImportError::AttributeLength {
                    attribute: "uv",
                    expected: n,
                    actual: uvs.len(),
                });
            }
        }

        for index in 0..n {
            let finite = self.positions[index].iter().all(|v| v.is_finite())
                && self.normals.get(index).is_none_or(|nrm| nrm.iter().all(|v| v.is_finite()))
                && self
                    .uv_channels
                    .iter()
                    .all(|uvs| uvs[index].iter().all(|v| v.is_finite()));
            if !finite {
                return Err(ImportError::NonFiniteVertex { index });
            }
        }

        Ok(())
    }
}

/// One section's data with its own compacted vertex buffer, as consumed by
/// procedural-mesh style hosts that store vertices per section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionBuffers {
    pub positions: Vec<[f64; 3]>,
    pub normals: Vec<[f64; 3]>,
    pub uv_channels: Vec<Vec<[f64; 2]>>,
    /// Indices into this section's own vertex arrays.
    pub indices: Vec<u32>,
    /// Shared-buffer index of each local vertex.
    pub source_vertices: Vec<u32>,
}

impl MeshGeometry {
    /// Builds a mesh from host buffers.
    ///
    /// Empty `normals` are recomputed from the triangles; everything else must
    /// be complete and consistent.
    ///
    /// # Errors
    /// [`DeformError::ImportFailure`](super::DeformError::ImportFailure) with the
    /// specific [`ImportError`] when the buffers are malformed.
    pub fn load_from_buffers(buffers: MeshBuffers) -> DeformResult<Self> {
        buffers.validate()?;

        let MeshBuffers {
            positions,
            normals,
            uv_channels,
            sections,
            create_collision: _,
        } = buffers;

        let positions: Vec<Point3> = positions.into_iter().map(Point3::from).collect();
        let sections: Vec<Section> = sections
            .into_iter()
            .map(|indices| {
                Section::new(
                    indices
                        .chunks_exact(3)
                        .map(|tri| [tri[0], tri[1], tri[2]])
                        .collect(),
                )
            })
            .collect();
        let normals = if normals.is_empty() {
            log::debug!("import: no normals supplied, computing smooth normals");
            compute_smooth_normals(&positions, &sections)
        } else {
            normals.into_iter().map(Vec3::from).collect()
        };

        let mesh = Self {
            positions,
            normals,
            uv_channels,
            sections,
        };
        log::debug!("import: {}", mesh.summary());
        Ok(mesh)
    }

    /// Exports the shared-buffer layout. Lossless inverse of
    /// [`load_from_buffers`](Self::load_from_buffers).
    #[must_use]
    pub fn save_to_buffers(&self) -> MeshBuffers {
        MeshBuffers {
            positions: self.positions.iter().map(|p| p.to_array()).collect(),
            normals: self.normals.iter().map(|n| n.to_array()).collect(),
            uv_channels: self.uv_channels.clone(),
            sections: self
                .sections
                .iter()
                .map(|s| s.triangles().iter().flatten().copied().collect())
                .collect(),
            create_collision: false,
        }
    }

    /// Exports every section with its own compacted vertex arrays.
    #[must_use]
    pub fn save_sections(&self) -> Vec<SectionBuffers> {
        self.sections
            .iter()
            .map(|section| {
                let mut remap: HashMap<u32, u32> = HashMap::new();
                let mut out = SectionBuffers {
                    uv_channels: vec![Vec::new(); self.uv_channels.len()],
                    ..SectionBuffers::default()
                };

                for &shared in section.triangles().iter().flatten() {
                    let local = *remap.entry(shared).or_insert_with(|| {
                        let i = shared as usize;
                        out.positions.push(self.positions[i].to_array());
                        out.normals.push(self.normals[i].to_array());
                        for (channel, uvs) in out.uv_channels.iter_mut().enumerate() {
                            uvs.push(self.uv_channels[channel][i]);
                        }
                        out.source_vertices.push(shared);
                        (out.source_vertices.len() - 1) as u32
                    });
                    out.indices.push(local);
                }
                out
            })
            .collect()
    }
}
