//! Tests for importing and exporting host mesh buffers.

use crate::geom::{DeformError, ImportError, MeshBuffers, MeshGeometry, Vec3};

// ============================================================================
// Test mesh factories
// ============================================================================

fn two_triangle_buffers() -> MeshBuffers {
    MeshBuffers::new(
        vec![
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 2.0, 0.5],
            [0.0, 2.0, 0.5],
        ],
        vec![vec![0, 1, 2], vec![2, 3, 0]],
    )
    .with_normals(vec![
        [0.0, 0.0, 1.0],
        [0.0, 0.0, 1.0],
        [0.0, -0.24253562503633297, 0.9701425001453319],
        [0.0, -0.24253562503633297, 0.9701425001453319],
    ])
    .with_uv_channel(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
    .with_uv_channel(vec![[0.5; 2]; 4])
}

fn import_error(buffers: MeshBuffers) -> ImportError {
    match MeshGeometry::load_from_buffers(buffers) {
        Err(DeformError::ImportFailure(err)) => err,
        other => panic!("expected an import failure, got {other:?}"),
    }
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_save_reproduces_loaded_buffers() {
    let buffers = two_triangle_buffers();
    let mesh = buffers.clone().into_geometry().unwrap();
    assert_eq!(mesh.uv_channel_count(), 2);
    assert_eq!(mesh.save_to_buffers(), buffers);
}

#[test]
fn test_save_after_deform_keeps_topology() {
    let mut mesh = two_triangle_buffers().into_geometry().unwrap();
    mesh.translate(Vec3::new(0.0, 0.0, 1.0), None).unwrap();
    let saved = mesh.save_to_buffers();
    assert_eq!(saved.sections, vec![vec![0, 1, 2], vec![2, 3, 0]]);
    assert_eq!(saved.positions[3], [0.0, 2.0, 1.5]);
}

#[test]
fn test_collision_flag_is_not_geometry() {
    let with = two_triangle_buffers().with_collision(true).into_geometry().unwrap();
    let without = two_triangle_buffers().into_geometry().unwrap();
    assert_eq!(with, without);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_rejects_partial_triangles() {
    let mut buffers = two_triangle_buffers();
    buffers.sections[0].push(3);
    assert_eq!(
        import_error(buffers),
        ImportError::NotTriangleList { section: 0, len: 4 }
    );
}

#[test]
fn test_rejects_mismatched_uv_channel() {
    let mut buffers = two_triangle_buffers();
    buffers.uv_channels[1].pop();
    assert_eq!(
        import_error(buffers),
        ImportError::AttributeLength {
            attribute: "uv",
            expected: 4,
            actual: 3
        }
    );
}

#[test]
fn test_rejects_missing_uvs_and_empty_input() {
    let mut buffers = two_triangle_buffers();
    buffers.uv_channels.clear();
    assert_eq!(import_error(buffers), ImportError::NoUvChannels);

    assert_eq!(
        import_error(MeshBuffers::new(Vec::new(), vec![vec![0, 1, 2]])),
        ImportError::EmptyVertices
    );

    let mut empty_section = two_triangle_buffers();
    empty_section.sections.push(Vec::new());
    assert_eq!(
        import_error(empty_section),
        ImportError::EmptySection { section: 2 }
    );
}

#[test]
fn test_rejects_non_finite_normal() {
    let mut buffers = two_triangle_buffers();
    buffers.normals[1][0] = f64::INFINITY;
    assert_eq!(import_error(buffers), ImportError::NonFiniteVertex { index: 1 });
}

#[test]
fn test_section_export_covers_every_triangle() {
    let mesh = two_triangle_buffers().into_geometry().unwrap();
    let sections = mesh.save_sections();
    let total: usize = sections.iter().map(|s| s.indices.len() / 3).sum();
    assert_eq!(total, mesh.triangle_count());
    assert_eq!(sections[1].source_vertices, vec![2, 3, 0]);
    assert_eq!(sections[1].uv_channels.len(), 2);
}
