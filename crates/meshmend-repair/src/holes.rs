//! Hole detection and filling.
//!
//! A hole is a closed loop of boundary edges (edges with exactly one
//! incident face). Loops are traced from the adjacency, projected onto
//! their dominant plane, and triangulated by ear clipping with a fan
//! fallback.

use hashbrown::{HashMap, HashSet};
use meshmend_types::{Point3, TriMesh, Vector3};
use tracing::{debug, info, warn};

use crate::adjacency::MeshAdjacency;

/// A closed ring of boundary vertices bounding a missing face region.
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    /// Ordered vertex indices around the loop.
    pub vertices: Vec<u32>,
}

impl BoundaryLoop {
    /// Number of edges (equal to the number of vertices) in the loop.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }

    /// A loop needs at least three edges to bound a region.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3
    }
}

/// Trace all closed boundary loops in the mesh.
///
/// Chains of boundary edges that do not close (non-manifold boundary
/// junctions) are logged and discarded; they are handled by the deletion
/// step of the repair loop, not by filling.
///
/// # Example
///
/// ```
/// use meshmend_types::{TriMesh, Vertex};
/// use meshmend_repair::{MeshAdjacency, holes::boundary_loops};
///
/// let mut mesh = TriMesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
///
/// let adjacency = MeshAdjacency::build(&mesh.faces);
/// let loops = boundary_loops(&adjacency);
/// assert_eq!(loops.len(), 1);
/// assert_eq!(loops[0].edge_count(), 3);
/// ```
#[must_use]
pub fn boundary_loops(adjacency: &MeshAdjacency) -> Vec<BoundaryLoop> {
    let mut boundary: Vec<(u32, u32)> = adjacency.boundary_edges().collect();
    if boundary.is_empty() {
        return Vec::new();
    }
    // Hash iteration order is arbitrary; sort for reproducible loops.
    boundary.sort_unstable();

    debug!(edges = boundary.len(), "tracing boundary loops");

    let mut neighbors: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(a, b) in &boundary {
        neighbors.entry(a).or_default().push(b);
        neighbors.entry(b).or_default().push(a);
    }
    for list in neighbors.values_mut() {
        list.sort_unstable();
    }

    let mut visited: HashSet<u32> = HashSet::new();
    let mut loops = Vec::new();

    for &(start, _) in &boundary {
        if visited.contains(&start) {
            continue;
        }

        let mut ring = Vec::new();
        let mut current = start;
        let mut prev: Option<u32> = None;
        let mut closed = false;

        loop {
            visited.insert(current);
            ring.push(current);

            let candidates = neighbors.get(&current).map_or(&[][..], Vec::as_slice);
            let next = candidates
                .iter()
                .find(|&&nb| Some(nb) != prev && !visited.contains(&nb))
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|&&nb| nb == start && ring.len() > 2)
                });

            match next {
                Some(&nb) if nb == start => {
                    closed = true;
                    break;
                }
                Some(&nb) => {
                    prev = Some(current);
                    current = nb;
                }
                None => {
                    warn!(start, "boundary chain does not close, skipping");
                    break;
                }
            }
        }

        if closed && ring.len() >= 3 {
            loops.push(BoundaryLoop { vertices: ring });
        }
    }

    info!(
        count = loops.len(),
        sizes = ?loops.iter().map(BoundaryLoop::edge_count).collect::<Vec<_>>(),
        "detected boundary loops"
    );

    loops
}

/// Fill every hole with at most `max_sides` edges.
///
/// `max_sides == 0` disables the size limit. Larger holes are skipped with
/// a warning; the repair loop closes them through the selection-boundary
/// fill instead.
///
/// Returns the number of holes filled.
pub fn fill_holes(mesh: &mut TriMesh, max_sides: usize) -> usize {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let loops = boundary_loops(&adjacency);

    let mut filled = 0;
    for ring in &loops {
        if max_sides != 0 && ring.edge_count() > max_sides {
            warn!(
                edges = ring.edge_count(),
                max_sides, "skipping hole above size limit"
            );
            continue;
        }
        let triangles = triangulate_ring(mesh, &ring.vertices);
        if triangles.is_empty() {
            continue;
        }
        mesh.faces.extend(triangles);
        filled += 1;
    }

    if filled > 0 {
        info!(filled, "filled holes");
    }
    filled
}

/// Fill boundary loops whose vertices all lie in `selection`.
///
/// The secondary fill pass: where the primary hole filler leaves
/// non-manifold boundary behind (size limit, pathological rings), this
/// closes any loop fully covered by the selected vertices, regardless of
/// size.
///
/// Returns the number of loops filled.
pub fn fill_selection_boundary(mesh: &mut TriMesh, selection: &[u32]) -> usize {
    if selection.is_empty() {
        return 0;
    }
    let selected: HashSet<u32> = selection.iter().copied().collect();

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let loops = boundary_loops(&adjacency);

    let mut filled = 0;
    for ring in &loops {
        if !ring.vertices.iter().all(|v| selected.contains(v)) {
            continue;
        }
        let triangles = triangulate_ring(mesh, &ring.vertices);
        if triangles.is_empty() {
            continue;
        }
        mesh.faces.extend(triangles);
        filled += 1;
    }

    if filled > 0 {
        info!(filled, "filled selected boundaries");
    }
    filled
}

/// Triangulate a vertex ring by ear clipping in its dominant plane.
///
/// The ring is projected along its Newell normal; ears are clipped while
/// convex corners without enclosed points exist, then any stubborn
/// remainder is fan-triangulated. Always produces `len - 2` triangles for
/// a valid ring. Winding relative to the surrounding surface is left to
/// the orientation pass.
fn triangulate_ring(mesh: &TriMesh, ring: &[u32]) -> Vec<[u32; 3]> {
    let n = ring.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[ring[0], ring[1], ring[2]]];
    }

    let points: Vec<Point3<f64>> = ring
        .iter()
        .map(|&v| mesh.vertices[v as usize].position)
        .collect();

    let normal = newell_normal(&points);
    let (u, v) = plane_basis(&normal);
    let flat: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.coords.dot(&u), p.coords.dot(&v)))
        .collect();

    let mut order: Vec<usize> = (0..n).collect();
    if signed_area(&flat, &order) < 0.0 {
        order.reverse();
    }

    let mut triangles = Vec::with_capacity(n - 2);

    'clip: while order.len() > 3 {
        for i in 0..order.len() {
            let prev = order[(i + order.len() - 1) % order.len()];
            let curr = order[i];
            let next = order[(i + 1) % order.len()];

            if cross2(flat[prev], flat[curr], flat[next]) <= 0.0 {
                continue; // reflex corner
            }
            let blocked = order.iter().any(|&j| {
                j != prev
                    && j != curr
                    && j != next
                    && point_in_triangle(flat[j], flat[prev], flat[curr], flat[next])
            });
            if blocked {
                continue;
            }

            triangles.push([ring[prev], ring[curr], ring[next]]);
            order.remove(i);
            continue 'clip;
        }

        warn!(
            remaining = order.len(),
            "ear clipping stalled, fan-filling remainder"
        );
        break;
    }

    if order.len() == 3 {
        triangles.push([ring[order[0]], ring[order[1]], ring[order[2]]]);
    } else {
        for i in 1..order.len() - 1 {
            triangles.push([ring[order[0]], ring[order[i]], ring[order[i + 1]]]);
        }
    }

    triangles
}

/// Newell's method for the average plane normal of a ring.
fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::<f64>::zeros();
    for i in 0..points.len() {
        let p = &points[i];
        let q = &points[(i + 1) % points.len()];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }

    let len = normal.norm();
    if len > f64::EPSILON {
        normal / len
    } else {
        Vector3::z()
    }
}

/// Orthonormal basis of the plane perpendicular to `normal`.
fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&helper).normalize();
    let v = normal.cross(&u);
    (u, v)
}

/// Twice the signed area of the projected polygon in `order`.
fn signed_area(flat: &[(f64, f64)], order: &[usize]) -> f64 {
    let mut area = 0.0;
    for i in 0..order.len() {
        let (x0, y0) = flat[order[i]];
        let (x1, y1) = flat[order[(i + 1) % order.len()]];
        area += x0 * y1 - x1 * y0;
    }
    area
}

/// 2D cross product of (b - a) × (c - a).
fn cross2(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)
}

/// Point-in-triangle test including the boundary.
fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let d1 = cross2(p, a, b);
    let d2 = cross2(p, b, c);
    let d3 = cross2(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmend_types::{unit_cube, Vertex};

    fn open_cube() -> TriMesh {
        let mut mesh = unit_cube();
        mesh.faces.retain(|f| *f != [4, 5, 6] && *f != [4, 6, 7]);
        mesh
    }

    #[test]
    fn open_cube_has_one_square_hole() {
        let mesh = open_cube();
        let adjacency = MeshAdjacency::build(&mesh.faces);
        let loops = boundary_loops(&adjacency);

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].edge_count(), 4);
        assert!(loops[0].is_valid());
    }

    #[test]
    fn closed_cube_has_no_holes() {
        let mesh = unit_cube();
        let adjacency = MeshAdjacency::build(&mesh.faces);
        assert!(boundary_loops(&adjacency).is_empty());
    }

    #[test]
    fn fill_open_cube_makes_watertight() {
        let mut mesh = open_cube();
        let filled = fill_holes(&mut mesh, 4);

        assert_eq!(filled, 1);
        assert_eq!(mesh.face_count(), 12); // quad hole becomes two triangles

        let adjacency = MeshAdjacency::build(&mesh.faces);
        assert!(adjacency.is_watertight());
    }

    #[test]
    fn fill_respects_size_limit() {
        let mut mesh = open_cube();
        // The hole has 4 edges; a limit of 3 skips it
        assert_eq!(fill_holes(&mut mesh, 3), 0);
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn fill_with_zero_limit_fills_all() {
        let mut mesh = open_cube();
        assert_eq!(fill_holes(&mut mesh, 0), 1);
    }

    #[test]
    fn fill_selection_boundary_needs_full_cover() {
        let mut mesh = open_cube();

        // Selection missing a rim vertex leaves the hole open
        assert_eq!(fill_selection_boundary(&mut mesh, &[4, 5, 6]), 0);

        // Full rim selection closes it
        assert_eq!(fill_selection_boundary(&mut mesh, &[4, 5, 6, 7]), 1);
        let adjacency = MeshAdjacency::build(&mesh.faces);
        assert!(adjacency.is_watertight());
    }

    #[test]
    fn fill_pentagon_hole() {
        // An open pentagonal cone: 5 rim vertices, apex missing cap
        let mut mesh = TriMesh::new();
        for i in 0..5 {
            let angle = f64::from(i) * std::f64::consts::TAU / 5.0;
            mesh.vertices
                .push(Vertex::from_coords(angle.cos(), angle.sin(), 0.0));
        }
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, -1.0)); // apex
        for i in 0..5u32 {
            mesh.faces.push([i, (i + 1) % 5, 5]);
        }

        let filled = fill_holes(&mut mesh, 5);
        assert_eq!(filled, 1);
        assert_eq!(mesh.face_count(), 8); // 5 sides + 3 cap triangles

        let adjacency = MeshAdjacency::build(&mesh.faces);
        assert!(adjacency.is_watertight());
    }

    #[test]
    fn triangulate_produces_ring_minus_two() {
        let mut mesh = TriMesh::new();
        for i in 0..8 {
            let angle = f64::from(i) * std::f64::consts::TAU / 8.0;
            mesh.vertices
                .push(Vertex::from_coords(angle.cos(), angle.sin(), 0.0));
        }
        let ring: Vec<u32> = (0..8).collect();
        let triangles = triangulate_ring(&mesh, &ring);
        assert_eq!(triangles.len(), 6);
    }
}
