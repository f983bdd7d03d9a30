//! Ray-cast collision service and a BVH-backed triangle implementation.

use serde::{Deserialize, Serialize};

use super::core::{BBox, Point3, Transform, Vec3};
use super::error::{DeformError, DeformResult};
use super::mesh::MeshGeometry;

/// Opaque handle of a scene object owning collision geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// Trace channel a ray is cast on. Collision shapes list the channels they block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollisionChannel {
    #[default]
    WorldStatic,
    WorldDynamic,
    Pawn,
    Visibility,
    Camera,
    PhysicsBody,
    Vehicle,
    Destructible,
    Custom(u8),
}

/// One ray query against the world.
#[derive(Debug, Clone, Copy)]
pub struct RayRequest<'a> {
    pub origin: Point3,
    /// Unit direction.
    pub direction: Vec3,
    pub max_distance: f64,
    pub ignored_actors: &'a [ActorId],
    /// Trace against per-triangle geometry rather than simplified bounds.
    pub trace_complex: bool,
    pub channel: CollisionChannel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point3,
    /// Surface normal facing the incoming ray.
    pub normal: Vec3,
    pub distance: f64,
    pub actor: ActorId,
}

/// World ray-cast service. `None` is an ordinary miss, not an error.
pub trait CollisionQuery {
    fn raycast(&self, request: &RayRequest<'_>) -> Option<RayHit>;
}

#[derive(Debug, Clone)]
struct Shape {
    actor: ActorId,
    blocks: Vec<CollisionChannel>,
    bounds: BBox,
}

/// Triangle soup grouped into per-actor shapes.
///
/// Complex traces walk a BVH over all triangles; simple traces test each
/// shape's bounding box.
#[derive(Debug, Clone, Default)]
pub struct TriangleCollider {
    triangles: Vec<[Point3; 3]>,
    owner: Vec<usize>,
    shapes: Vec<Shape>,
    bvh: Option<TriangleBvh>,
}

impl TriangleCollider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Adds one shape made of `triangles` indexing into world-space `positions`.
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] when there are no triangles, an index is
    /// out of range, or a position is not finite.
    pub fn add_triangles(
        &mut self,
        actor: ActorId,
        blocks: &[CollisionChannel],
        positions: &[Point3],
        triangles: &[[u32; 3]],
    ) -> DeformResult<&mut Self> {
        if triangles.is_empty() {
            return Err(DeformError::invalid("collision shape has no triangles"));
        }
        if let Some(i) = positions.iter().position(|p| !p.is_finite()) {
            return Err(DeformError::invalid(format!(
                "collision vertex {i} is not finite"
            )));
        }

        let mut resolved = Vec::with_capacity(triangles.len());
        for tri in triangles {
            let corner = |i: u32| {
                positions.get(i as usize).copied().ok_or_else(|| {
                    DeformError::invalid(format!(
                        "collision index {i} outside {} vertices",
                        positions.len()
                    ))
                })
            };
            resolved.push([corner(tri[0])?, corner(tri[1])?, corner(tri[2])?]);
        }

        let bounds = resolved
            .iter()
            .flatten()
            .fold(BBox::new(resolved[0][0], resolved[0][0]), |b, &p| b.expand_point(p));

        let shape_index = self.shapes.len();
        self.shapes.push(Shape {
            actor,
            blocks: blocks.to_vec(),
            bounds,
        });
        self.owner.extend(std::iter::repeat_n(shape_index, resolved.len()));
        self.triangles.extend(resolved);
        self.rebuild();

        log::debug!(
            "collider: added actor {} ({} triangles, {} total)",
            actor.0,
            triangles.len(),
            self.triangles.len()
        );
        Ok(self)
    }

    /// Adds every section of `mesh`, placed in the world by `local_to_world`.
    ///
    /// # Errors
    /// See [`TriangleCollider::add_triangles`].
    pub fn add_mesh(
        &mut self,
        actor: ActorId,
        blocks: &[CollisionChannel],
        mesh: &MeshGeometry,
        local_to_world: Transform,
    ) -> DeformResult<&mut Self> {
        let positions: Vec<Point3> = mesh
            .positions()
            .iter()
            .map(|&p| local_to_world.apply_point(p))
            .collect();
        let triangles: Vec<[u32; 3]> = mesh
            .sections()
            .iter()
            .flat_map(|s| s.triangles().iter().copied())
            .collect();
        self.add_triangles(actor, blocks, &positions, &triangles)
    }

    fn rebuild(&mut self) {
        let bounds: Vec<BBox> = self
            .triangles
            .iter()
            .map(|[a, b, c]| BBox::new(*a, *a).expand_point(*b).expand_point(*c))
            .collect();
        self.bvh = TriangleBvh::build(&bounds);
    }

    fn accepts(&self, shape: &Shape, request: &RayRequest<'_>) -> bool {
        shape.blocks.contains(&request.channel) && !request.ignored_actors.contains(&shape.actor)
    }

    fn trace_complex(&self, origin: Point3, dir: Vec3, request: &RayRequest<'_>) -> Option<RayHit> {
        let bvh = self.bvh.as_ref()?;
        let (prim, t) = bvh.closest_hit(origin, dir, request.max_distance, |prim, best| {
            let shape = &self.shapes[self.owner[prim]];
            if !self.accepts(shape, request) {
                return None;
            }
            intersect_triangle(origin, dir, &self.triangles[prim]).filter(|&t| t <= best)
        })?;

        let [a, b, c] = self.triangles[prim];
        let face = (b - a).cross(c - a).normalized().unwrap_or(-dir);
        let normal = if face.dot(dir) > 0.0 { -face } else { face };

        Some(RayHit {
            point: origin + dir * t,
            normal,
            distance: t,
            actor: self.shapes[self.owner[prim]].actor,
        })
    }

    fn trace_simple(&self, origin: Point3, dir: Vec3, request: &RayRequest<'_>) -> Option<RayHit> {
        self.shapes
            .iter()
            .filter(|shape| self.accepts(shape, request))
            .filter_map(|shape| {
                ray_box_entry(origin, dir, shape.bounds, request.max_distance)
                    .map(|(t, normal)| (t, normal, shape.actor))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, normal, actor)| RayHit {
                point: origin + dir * t,
                normal,
                distance: t,
                actor,
            })
    }
}

impl CollisionQuery for TriangleCollider {
    fn raycast(&self, request: &RayRequest<'_>) -> Option<RayHit> {
        let dir = request.direction.normalized()?;
        if !request.origin.is_finite() || !(request.max_distance >= 0.0) {
            return None;
        }
        if request.trace_complex {
            self.trace_complex(request.origin, dir, request)
        } else {
            self.trace_simple(request.origin, dir, request)
        }
    }
}

/// Two-sided ray/triangle test. Returns the hit distance along `dir`.
fn intersect_triangle(origin: Point3, dir: Vec3, [a, b, c]: &[Point3; 3]) -> Option<f64> {
    const EPS: f64 = 1e-12;

    let e1 = *b - *a;
    let e2 = *c - *a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = origin - *a;
    let u = s.dot(p) * inv_det;
    if !(-EPS..=1.0 + EPS).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < -EPS || u + v > 1.0 + EPS {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t >= -EPS).then(|| t.max(0.0))
}

/// Slab test. Returns the entry distance and the normal of the entered face;
/// an origin inside the box hits at distance 0 facing back along the ray.
fn ray_box_entry(origin: Point3, dir: Vec3, bbox: BBox, t_max: f64) -> Option<(f64, Vec3)> {
    let mut t_enter = 0.0_f64;
    let mut t_exit = t_max;
    let mut normal = -dir;

    for (o, d, min, max, axis) in [
        (origin.x, dir.x, bbox.min.x, bbox.max.x, Vec3::X),
        (origin.y, dir.y, bbox.min.y, bbox.max.y, Vec3::Y),
        (origin.z, dir.z, bbox.min.z, bbox.max.z, Vec3::Z),
    ] {
        if d.abs() <= 1e-15 {
            if o < min || o > max {
                return None;
            }
            continue;
        }

        let inv_d = 1.0 / d;
        let t0 = (min - o) * inv_d;
        let t1 = (max - o) * inv_d;
        let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };

        if near > t_enter {
            t_enter = near;
            normal = if d > 0.0 { -axis } else { axis };
        }
        t_exit = t_exit.min(far);
        if t_exit < t_enter {
            return None;
        }
    }

    Some((t_enter, normal))
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: BBox,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

impl BvhNode {
    const fn is_leaf(self) -> bool {
        self.count != 0
    }
}

/// Median-split bounding volume hierarchy over primitive bounds.
#[derive(Debug, Clone)]
struct TriangleBvh {
    nodes: Vec<BvhNode>,
    order: Vec<u32>,
}

impl TriangleBvh {
    const LEAF_SIZE: usize = 4;

    fn build(bounds: &[BBox]) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }
        let mut bvh = Self {
            nodes: Vec::with_capacity(bounds.len() * 2),
            order: (0..bounds.len() as u32).collect(),
        };
        bvh.build_node(bounds, 0, bounds.len());
        Some(bvh)
    }

    fn build_node(&mut self, bounds: &[BBox], start: usize, end: usize) -> u32 {
        let node_index = self.nodes.len() as u32;
        let range = &self.order[start..end];
        let node_bounds = range
            .iter()
            .skip(1)
            .fold(bounds[range[0] as usize], |acc, &i| acc.union(bounds[i as usize]));
        let count = end - start;

        self.nodes.push(BvhNode {
            bounds: node_bounds,
            left: u32::MAX,
            right: u32::MAX,
            start: start as u32,
            count: count as u32,
        });
        if count <= Self::LEAF_SIZE {
            return node_index;
        }

        // Split on the longest extent of the node bounds.
        let size = node_bounds.size();
        let key: fn(Point3) -> f64 = if size.x >= size.y && size.x >= size.z {
            |p| p.x
        } else if size.y >= size.z {
            |p| p.y
        } else {
            |p| p.z
        };
        let mid = start + count / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |a, b| {
            key(bounds[*a as usize].center()).total_cmp(&key(bounds[*b as usize].center()))
        });

        let left = self.build_node(bounds, start, mid);
        let right = self.build_node(bounds, mid, end);
        let node = &mut self.nodes[node_index as usize];
        node.left = left;
        node.right = right;
        node.count = 0;
        node_index
    }

    /// Closest primitive along the ray. `hit` returns the primitive's distance
    /// when it is hit no farther than the current best.
    fn closest_hit(
        &self,
        origin: Point3,
        dir: Vec3,
        t_max: f64,
        mut hit: impl FnMut(usize, f64) -> Option<f64>,
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        let mut stack = vec![0u32];

        while let Some(index) = stack.pop() {
            let node = self.nodes[index as usize];
            let limit = best.map_or(t_max, |(_, t)| t);
            if ray_box_entry(origin, dir, node.bounds, limit).is_none() {
                continue;
            }

            if node.is_leaf() {
                let start = node.start as usize;
                for &prim in &self.order[start..start + node.count as usize] {
                    let limit = best.map_or(t_max, |(_, t)| t);
                    if let Some(t) = hit(prim as usize, limit) {
                        if best.is_none_or(|(_, b)| t < b) {
                            best = Some((prim as usize, t));
                        }
                    }
                }
                continue;
            }

            stack.push(node.left);
            stack.push(node.right);
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground(collider: &mut TriangleCollider, actor: u64, z: f64) {
        let positions = [
            Point3::new(-50.0, -50.0, z),
            Point3::new(50.0, -50.0, z),
            Point3::new(50.0, 50.0, z),
            Point3::new(-50.0, 50.0, z),
        ];
        collider
            .add_triangles(
                ActorId(actor),
                &[CollisionChannel::WorldStatic],
                &positions,
                &[[0, 1, 2], [0, 2, 3]],
            )
            .unwrap();
    }

    fn down(origin: Point3, ignored: &[ActorId]) -> RayRequest<'_> {
        RayRequest {
            origin,
            direction: -Vec3::Z,
            max_distance: 100.0,
            ignored_actors: ignored,
            trace_complex: true,
            channel: CollisionChannel::WorldStatic,
        }
    }

    #[test]
    fn test_closest_hit_wins() {
        let mut collider = TriangleCollider::new();
        ground(&mut collider, 1, -10.0);
        ground(&mut collider, 2, -3.0);

        let hit = collider.raycast(&down(Point3::new(1.0, 2.0, 0.0), &[])).unwrap();
        assert_eq!(hit.actor, ActorId(2));
        assert!((hit.point.z + 3.0).abs() < 1e-12);
        assert!((hit.normal.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ignored_actor_is_skipped() {
        let mut collider = TriangleCollider::new();
        ground(&mut collider, 1, -10.0);
        ground(&mut collider, 2, -3.0);

        let ignored = [ActorId(2)];
        let hit = collider.raycast(&down(Point3::new(1.0, 2.0, 0.0), &ignored)).unwrap();
        assert_eq!(hit.actor, ActorId(1));
        assert!((hit.distance - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_channel_and_range_filtering() {
        let mut collider = TriangleCollider::new();
        ground(&mut collider, 1, -10.0);

        let mut request = down(Point3::ORIGIN, &[]);
        request.channel = CollisionChannel::Pawn;
        assert!(collider.raycast(&request).is_none());

        let mut short = down(Point3::ORIGIN, &[]);
        short.max_distance = 5.0;
        assert!(collider.raycast(&short).is_none());

        assert!(collider.raycast(&down(Point3::new(80.0, 0.0, 0.0), &[])).is_none());
    }

    #[test]
    fn test_simple_trace_uses_bounds() {
        let mut collider = TriangleCollider::new();
        let slope = [
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(10.0, -1.0, 10.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        collider
            .add_triangles(ActorId(7), &[CollisionChannel::WorldStatic], &slope, &[[0, 1, 2]])
            .unwrap();

        let mut request = down(Point3::new(2.0, 0.0, 20.0), &[]);
        request.trace_complex = false;
        let simple = collider.raycast(&request).unwrap();
        assert!((simple.point.z - 10.0).abs() < 1e-12);

        request.trace_complex = true;
        let complex = collider.raycast(&request).unwrap();
        assert!((complex.point.z - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_many_triangles_match_brute_force() {
        let mut collider = TriangleCollider::new();
        for i in 0..40 {
            ground(&mut collider, i, -(i as f64) - 1.0);
        }
        assert_eq!(collider.triangle_count(), 80);
        let hit = collider.raycast(&down(Point3::new(0.3, -0.7, 0.0), &[])).unwrap();
        assert_eq!(hit.actor, ActorId(0));
    }
}
