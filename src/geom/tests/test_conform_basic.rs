//! Tests for ray-cast conform.

use std::cell::RefCell;

use crate::geom::{
    ActorId, CollisionChannel, CollisionQuery, ConformOptions, ConformReport, DeformError,
    MeshBuffers, MeshGeometry, Point3, RayHit, RayRequest, SelectionSet, Transform,
    TriangleCollider, Vec3,
};

// ============================================================================
// Test mesh factories
// ============================================================================

/// 3x3 vertex grid on z = 0 spanning [0, 2] in X and Y.
fn grid() -> MeshGeometry {
    let mut positions = Vec::new();
    for y in 0..3 {
        for x in 0..3 {
            positions.push([f64::from(x), f64::from(y), 0.0]);
        }
    }
    let mut indices = Vec::new();
    for y in 0..2u32 {
        for x in 0..2u32 {
            let i = y * 3 + x;
            indices.extend_from_slice(&[i, i + 1, i + 4, i, i + 4, i + 3]);
        }
    }
    MeshBuffers::new(positions, vec![indices])
        .with_uv_channel(vec![[0.0, 0.0]; 9])
        .into_geometry()
        .unwrap()
}

/// Square of half-size 50 at height `z`, owned by `actor`.
fn add_ground(collider: &mut TriangleCollider, actor: u64, z: f64) {
    let corners = [
        Point3::new(-50.0, -50.0, z),
        Point3::new(50.0, -50.0, z),
        Point3::new(50.0, 50.0, z),
        Point3::new(-50.0, 50.0, z),
    ];
    collider
        .add_triangles(
            ActorId(actor),
            &[CollisionChannel::WorldStatic],
            &corners,
            &[[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();
}

/// Records every request and answers with a fixed-height plane.
struct RecordingGround {
    height: f64,
    requests: RefCell<Vec<(Point3, Vec3, f64, Vec<ActorId>)>>,
}

impl CollisionQuery for RecordingGround {
    fn raycast(&self, request: &RayRequest<'_>) -> Option<RayHit> {
        self.requests.borrow_mut().push((
            request.origin,
            request.direction,
            request.max_distance,
            request.ignored_actors.to_vec(),
        ));
        let distance = request.origin.z - self.height;
        (distance >= 0.0 && distance <= request.max_distance).then(|| RayHit {
            point: Point3::new(request.origin.x, request.origin.y, self.height),
            normal: Vec3::Z,
            distance,
            actor: ActorId(0),
        })
    }
}

// ============================================================================
// Hits and misses
// ============================================================================

#[test]
fn test_conform_without_collision_leaves_mesh_unchanged() {
    let mut mesh = grid();
    let original = mesh.positions().to_vec();
    let report = mesh
        .conform(&TriangleCollider::new(), &ConformOptions::default(), None)
        .unwrap();
    assert_eq!(mesh.positions(), original.as_slice());
    assert_eq!(
        report,
        ConformReport {
            traced: 9,
            hits: 0,
            misses: 9,
            skipped: 0
        }
    );
}

#[test]
fn test_conform_sets_height_plus_adjust() {
    let mut collider = TriangleCollider::new();
    add_ground(&mut collider, 1, -5.0);

    let mut mesh = grid();
    let options = ConformOptions::down(100.0).with_height_adjust(1.0);
    let report = mesh.conform(&collider, &options, None).unwrap();

    assert_eq!(report.hits, 9);
    for (p, x) in mesh.positions().iter().zip([0.0, 1.0, 2.0].iter().cycle()) {
        assert!((p.z + 4.0).abs() < 1e-12);
        assert_eq!(p.x, *x);
    }
}

#[test]
fn test_conform_partial_weight_blends_height() {
    let mut collider = TriangleCollider::new();
    add_ground(&mut collider, 1, -4.0);

    let mut mesh = grid();
    let mut selection = SelectionSet::all_deselected(9);
    selection.set_weight(4, 0.5).unwrap();
    selection.set_weight(8, 1.0).unwrap();

    let report = mesh
        .conform(&collider, &ConformOptions::default(), Some(&selection))
        .unwrap();
    assert_eq!(report.traced, 2);
    assert_eq!(report.skipped, 7);
    assert!((mesh.positions()[4].z + 2.0).abs() < 1e-12);
    assert!((mesh.positions()[8].z + 4.0).abs() < 1e-12);
    assert_eq!(mesh.positions()[0].z, 0.0);
}

#[test]
fn test_conform_respects_ray_length() {
    let mut collider = TriangleCollider::new();
    add_ground(&mut collider, 1, -20.0);

    let mut mesh = grid();
    let report = mesh.conform_down(&collider, 10.0, &ConformOptions::default(), None).unwrap();
    assert_eq!(report.misses, 9);
    assert!(mesh.positions().iter().all(|p| p.z == 0.0));
}

#[test]
fn test_conform_skips_ignored_actors() {
    let mut collider = TriangleCollider::new();
    add_ground(&mut collider, 1, -3.0);
    add_ground(&mut collider, 2, -8.0);

    let mut mesh = grid();
    let options = ConformOptions::default().with_ignored_actors([ActorId(1)]);
    mesh.conform(&collider, &options, None).unwrap();
    assert!(mesh.positions().iter().all(|p| (p.z + 8.0).abs() < 1e-12));
}

// ============================================================================
// Spaces and request plumbing
// ============================================================================

#[test]
fn test_conform_maps_hits_back_to_local_space() {
    let ground = RecordingGround {
        height: 2.0,
        requests: RefCell::new(Vec::new()),
    };
    let mut mesh = grid();
    let options = ConformOptions::down(50.0)
        .with_transform(Transform::translate(Vec3::new(100.0, 0.0, 10.0)))
        .with_ignored_actors([ActorId(42)]);

    mesh.conform(&ground, &options, None).unwrap();

    // World hit at z = 2 is z = -8 in mesh space.
    assert!(mesh.positions().iter().all(|p| (p.z + 8.0).abs() < 1e-12));

    let requests = ground.requests.borrow();
    assert_eq!(requests.len(), 9);
    let (origin, direction, length, ignored) = &requests[1];
    assert_eq!(*origin, Point3::new(101.0, 0.0, 10.0));
    assert_eq!(*direction, Vec3::new(0.0, 0.0, -1.0));
    assert_eq!(*length, 50.0);
    assert_eq!(ignored, &vec![ActorId(42)]);
}

#[test]
fn test_conform_rejects_degenerate_options() {
    let mut mesh = grid();
    let collider = TriangleCollider::new();

    let zero = ConformOptions::new(Transform::identity(), Vec3::ZERO);
    assert!(matches!(
        mesh.conform(&collider, &zero, None),
        Err(DeformError::InvalidRange(_))
    ));

    let singular = ConformOptions::default().with_transform(Transform::scale(1.0, 0.0, 1.0));
    assert!(mesh.conform(&collider, &singular, None).is_err());

    let wrong_size = SelectionSet::all_selected(2);
    assert_eq!(
        mesh.conform(&collider, &ConformOptions::default(), Some(&wrong_size))
            .unwrap_err(),
        DeformError::SizeMismatch {
            expected: 9,
            actual: 2
        }
    );
}
