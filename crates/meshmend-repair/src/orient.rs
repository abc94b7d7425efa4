//! Outward normal orientation.
//!
//! Propagates a consistent winding across each edge-connected face
//! component, then flips whole components whose enclosed signed volume is
//! negative so every normal points outward. Reapplying to an already
//! consistent mesh is a no-op.

use hashbrown::HashMap;
use std::collections::VecDeque;
use tracing::{debug, info};

use meshmend_types::TriMesh;

/// Make all face normals consistently outward.
///
/// Seeds one face per edge-connected component, propagates its orientation
/// across edges shared by exactly two faces (a shared edge must be
/// traversed in opposite directions by its two faces), and finally flips
/// any component whose signed enclosed volume is negative.
///
/// Orientation cannot propagate across non-manifold edges (more than two
/// faces); such fins keep their own winding until the repair loop removes
/// them.
///
/// Returns the number of faces flipped.
///
/// # Example
///
/// ```
/// use meshmend_types::unit_cube;
/// use meshmend_repair::make_normals_consistent;
///
/// let mut cube = unit_cube();
/// cube.flip_normals(); // inside-out
/// let flipped = make_normals_consistent(&mut cube);
/// assert_eq!(flipped, 12);
/// assert!(cube.signed_volume() > 0.0);
/// ```
pub fn make_normals_consistent(mesh: &mut TriMesh) -> usize {
    let face_count = mesh.faces.len();
    if face_count == 0 {
        return 0;
    }

    // Undirected edge incidence; topology is unaffected by winding flips,
    // so this stays valid while faces are flipped below.
    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (face_idx, face) in mesh.faces.iter().enumerate() {
        for i in 0..3 {
            let (a, b) = (face[i], face[(i + 1) % 3]);
            let key = if a < b { (a, b) } else { (b, a) };
            edge_faces.entry(key).or_default().push(face_idx);
        }
    }

    let mut visited = vec![false; face_count];
    let mut flipped = 0usize;

    for seed in 0..face_count {
        if visited[seed] {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(f) = queue.pop_front() {
            component.push(f);
            let face = mesh.faces[f];
            for i in 0..3 {
                let (a, b) = (face[i], face[(i + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                let Some(incident) = edge_faces.get(&key) else {
                    continue;
                };
                if incident.len() != 2 {
                    continue;
                }
                for &g in incident {
                    if g == f || visited[g] {
                        continue;
                    }
                    // The neighbor must traverse the shared edge as (b, a);
                    // if it also runs (a, b), its winding is opposed.
                    if has_directed_edge(&mesh.faces[g], a, b) {
                        mesh.faces[g].swap(1, 2);
                        flipped += 1;
                    }
                    visited[g] = true;
                    queue.push_back(g);
                }
            }
        }

        let volume = component_signed_volume(mesh, &component);
        if volume < 0.0 {
            debug!(
                faces = component.len(),
                volume, "flipping inward-facing component"
            );
            for &f in &component {
                mesh.faces[f].swap(1, 2);
            }
            flipped += component.len();
        }
    }

    if flipped > 0 {
        info!(flipped, "made normals consistent");
    }
    flipped
}

/// Count edges whose two incident faces traverse them in the same
/// direction, i.e. edges with inconsistent winding.
///
/// Zero for a consistently oriented mesh.
#[must_use]
pub fn count_inconsistent_edges(mesh: &TriMesh) -> usize {
    let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
    for face in &mesh.faces {
        for i in 0..3 {
            let edge = (face[i], face[(i + 1) % 3]);
            *directed.entry(edge).or_insert(0) += 1;
        }
    }

    directed.values().filter(|&&count| count >= 2).count()
}

/// Whether `face` traverses the directed edge (a, b).
fn has_directed_edge(face: &[u32; 3], a: u32, b: u32) -> bool {
    (face[0] == a && face[1] == b)
        || (face[1] == a && face[2] == b)
        || (face[2] == a && face[0] == b)
}

/// Signed volume contributed by a subset of faces.
fn component_signed_volume(mesh: &TriMesh, component: &[usize]) -> f64 {
    let mut volume = 0.0;
    for &f in component {
        let [i0, i1, i2] = mesh.faces[f];
        let v0 = &mesh.vertices[i0 as usize].position;
        let v1 = &mesh.vertices[i1 as usize].position;
        let v2 = &mesh.vertices[i2 as usize].position;

        let cx = v1.y.mul_add(v2.z, -(v1.z * v2.y));
        let cy = v1.z.mul_add(v2.x, -(v1.x * v2.z));
        let cz = v1.x.mul_add(v2.y, -(v1.y * v2.x));
        volume += v0.z.mul_add(cz, v0.x.mul_add(cx, v0.y * cy));
    }
    volume / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmend_types::unit_cube;

    #[test]
    fn consistent_cube_is_untouched() {
        let mut cube = unit_cube();
        assert_eq!(make_normals_consistent(&mut cube), 0);
        assert!(cube.signed_volume() > 0.0);
        assert_eq!(count_inconsistent_edges(&cube), 0);
    }

    #[test]
    fn single_flipped_face_is_repaired() {
        let mut cube = unit_cube();
        cube.faces[3].swap(1, 2);
        assert!(count_inconsistent_edges(&cube) > 0);

        let flipped = make_normals_consistent(&mut cube);
        assert!(flipped >= 1);
        assert_eq!(count_inconsistent_edges(&cube), 0);
        assert!((cube.signed_volume() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn inside_out_cube_is_flipped_outward() {
        let mut cube = unit_cube();
        cube.flip_normals();
        assert!(cube.is_inside_out());

        let flipped = make_normals_consistent(&mut cube);
        assert_eq!(flipped, 12);
        assert!(cube.signed_volume() > 0.0);
    }

    #[test]
    fn orientation_is_idempotent() {
        let mut cube = unit_cube();
        cube.faces[0].swap(1, 2);
        cube.faces[7].swap(1, 2);

        make_normals_consistent(&mut cube);
        let after_first = cube.faces.clone();

        assert_eq!(make_normals_consistent(&mut cube), 0);
        assert_eq!(cube.faces, after_first);
    }

    #[test]
    fn two_components_both_oriented() {
        let mut mesh = unit_cube();
        let mut second = unit_cube();
        for v in &mut second.vertices {
            v.position.x += 5.0;
        }
        second.flip_normals();
        mesh.merge(&second);

        let flipped = make_normals_consistent(&mut mesh);
        assert_eq!(flipped, 12); // only the inverted copy
        assert!((mesh.signed_volume() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn empty_mesh_is_noop() {
        let mut mesh = TriMesh::new();
        assert_eq!(make_normals_consistent(&mut mesh), 0);
        assert_eq!(count_inconsistent_edges(&mesh), 0);
    }
}
