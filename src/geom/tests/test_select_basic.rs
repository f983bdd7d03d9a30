//! Tests for the selection generators.

use crate::geom::{
    DeformError, GridTexture, MeshBuffers, MeshGeometry, NoiseOptions, NoiseType, Point3,
    PolylineSpline, SelectionGenerator, TextureChannel, Transform, Vec3,
};

// ============================================================================
// Test mesh factories
// ============================================================================

/// `n x n` vertices on the XY plane with unit spacing. The first row of
/// quads is section 0, the rest section 1.
fn grid_mesh(n: u32) -> MeshGeometry {
    let step = 1.0 / f64::from(n - 1);
    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    for y in 0..n {
        for x in 0..n {
            positions.push([f64::from(x), f64::from(y), 0.0]);
            uvs.push([f64::from(x) * step, f64::from(y) * step]);
        }
    }

    let mut first = Vec::new();
    let mut rest = Vec::new();
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            let i = y * n + x;
            let quad = [i, i + 1, i + n + 1, i, i + n + 1, i + n];
            if y == 0 {
                first.extend_from_slice(&quad);
            } else {
                rest.extend_from_slice(&quad);
            }
        }
    }

    MeshBuffers::new(positions, vec![first, rest])
        .with_uv_channel(uvs)
        .into_geometry()
        .unwrap()
}

// ============================================================================
// Distance falloffs
// ============================================================================

#[test]
fn test_select_near_equal_radii_is_binary() {
    let mesh = grid_mesh(5);
    let selection = mesh.select_near(Point3::ORIGIN, 2.0, 2.0).unwrap();
    for (i, p) in mesh.positions().iter().enumerate() {
        let expected = if p.distance_to(Point3::ORIGIN) <= 2.0 { 1.0 } else { 0.0 };
        assert_eq!(selection.weight(i), expected, "vertex {i}");
    }
    // (2, 0) sits exactly on the radius.
    assert_eq!(selection.weight(2), 1.0);
}

#[test]
fn test_select_near_falloff_band() {
    let mesh = grid_mesh(5);
    let selection = mesh.select_near(Point3::ORIGIN, 1.0, 3.0).unwrap();
    assert_eq!(selection.weight(0), 1.0);
    assert!((selection.weight(2) - 0.5).abs() < 1e-12);
    assert_eq!(selection.weight(4), 0.0);
}

#[test]
fn test_select_near_rejects_inverted_radii() {
    let mesh = grid_mesh(3);
    assert!(matches!(
        mesh.select_near(Point3::ORIGIN, 5.0, 1.0),
        Err(DeformError::InvalidRange(_))
    ));
}

#[test]
fn test_select_near_line_segment_and_infinite() {
    let mesh = grid_mesh(5);
    let start = Point3::new(0.0, 0.0, 0.0);
    let end = Point3::new(1.0, 0.0, 0.0);

    let segment = mesh.select_near_line(start, end, 0.5, 0.5, false).unwrap();
    let line = mesh.select_near_line(start, end, 0.5, 0.5, true).unwrap();

    // (4, 0) is on the infinite line but 3 units past the segment end.
    assert_eq!(segment.weight(4), 0.0);
    assert_eq!(line.weight(4), 1.0);
    assert_eq!(line.selected_count(), 5);
}

#[test]
fn test_select_near_spline_uses_local_to_world() {
    let mesh = grid_mesh(3);
    let spline = PolylineSpline::new([Point3::new(0.0, 10.0, 0.0), Point3::new(2.0, 10.0, 0.0)]).unwrap();

    let untouched = mesh
        .select_near_spline(&spline, Transform::identity(), 0.5, 0.5)
        .unwrap();
    assert_eq!(untouched.selected_count(), 0);

    let lifted = mesh
        .select_near_spline(&spline, Transform::translate(Vec3::new(0.0, 10.0, 0.0)), 0.5, 0.5)
        .unwrap();
    assert_eq!(lifted.weights()[..3], [1.0, 1.0, 1.0]);
    assert_eq!(lifted.selected_count(), 3);
}

// ============================================================================
// Gradients
// ============================================================================

#[test]
fn test_select_linear_limited_stays_in_unit_range() {
    let mesh = grid_mesh(5);
    let selection = mesh
        .select_linear(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0), false, true)
        .unwrap();
    assert!(selection.iter().all(|w| (0.0..=1.0).contains(&w)));
    assert_eq!(selection.weight(0), 0.0);
    assert!((selection.weight(2) - 0.5).abs() < 1e-12);
    assert_eq!(selection.weight(4), 1.0);
}

#[test]
fn test_select_linear_unlimited_extrapolates() {
    let mesh = grid_mesh(5);
    let selection = mesh
        .select_linear(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0), false, false)
        .unwrap();
    assert!((selection.weight(0) + 0.5).abs() < 1e-12);
    assert!((selection.weight(4) - 1.5).abs() < 1e-12);
}

#[test]
fn test_select_linear_reverse() {
    let mesh = grid_mesh(3);
    let selection = mesh
        .select_linear(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0), true, true)
        .unwrap();
    assert_eq!(selection.weight(0), 1.0);
    assert_eq!(selection.weight(2), 0.0);
}

#[test]
fn test_select_linear_needs_distinct_points() {
    let mesh = grid_mesh(3);
    assert!(mesh.select_linear(Point3::ORIGIN, Point3::ORIGIN, false, true).is_err());
}

// ============================================================================
// Attribute-driven generators
// ============================================================================

#[test]
fn test_select_by_normal_cone() {
    let mut mesh = grid_mesh(3);
    assert_eq!(mesh.select(&SelectionGenerator::facing_up()).unwrap().selected_count(), 9);

    mesh.flip_normals(None).unwrap();
    let flipped = mesh.select_by_normal(Vec3::Z, 0.0, 30.0).unwrap();
    assert_eq!(flipped.selected_count(), 0);

    let side = mesh.select_by_normal(Vec3::X, 45.0, 135.0).unwrap();
    // 90 degrees sits halfway through the band.
    assert!((side.weight(0) - 0.5).abs() < 1e-9);
}

#[test]
fn test_select_by_noise_stays_in_unit_range() {
    let mesh = grid_mesh(8);
    for noise in [NoiseType::Perlin, NoiseType::SimplexFractal, NoiseType::Cellular] {
        let options = NoiseOptions::new(noise, 42, 0.3);
        let selection = mesh.select_by_noise(Transform::identity(), &options).unwrap();
        assert_eq!(selection.len(), mesh.vertex_count());
        assert!(selection.iter().all(|w| (0.0..=1.0).contains(&w)), "{noise:?}");
    }
}

#[test]
fn test_select_by_section() {
    let mesh = grid_mesh(3);
    let first = mesh.select_by_section(0).unwrap();
    assert_eq!(first.selected_count(), 6);
    assert_eq!(first.weight(8), 0.0);
    assert!(mesh.select_by_section(2).is_err());
}

#[test]
fn test_select_by_texture_follows_uvs() {
    let mesh = grid_mesh(3);
    let texture = GridTexture::from_luminance(2, 1, &[0.0, 1.0]).unwrap();
    let selection = mesh.select_by_texture(&texture, TextureChannel::Red);
    assert_eq!(selection.weight(0), 0.0);
    assert!((selection.weight(1) - 0.5).abs() < 1e-12);
    assert_eq!(selection.weight(2), 1.0);
}

#[test]
fn test_select_in_volume_corner_order() {
    let mesh = grid_mesh(5);
    let a = mesh
        .select_in_volume(Point3::new(1.0, 1.0, -1.0), Point3::new(2.0, 2.0, 1.0))
        .unwrap();
    let b = mesh
        .select_in_volume(Point3::new(2.0, 2.0, 1.0), Point3::new(1.0, 1.0, -1.0))
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.selected_count(), 4);
}

#[test]
fn test_generator_dispatch_matches_direct_call() {
    let mesh = grid_mesh(4);
    let generator = SelectionGenerator::Near {
        center: Point3::new(1.0, 1.0, 0.0),
        inner_radius: 0.5,
        outer_radius: 2.0,
    };
    assert_eq!(generator.name(), "SelectNear");
    assert_eq!(
        mesh.select(&generator).unwrap(),
        mesh.select_near(Point3::new(1.0, 1.0, 0.0), 0.5, 2.0).unwrap()
    );
    assert_eq!(mesh.select(&SelectionGenerator::All).unwrap().selected_count(), 16);
}
