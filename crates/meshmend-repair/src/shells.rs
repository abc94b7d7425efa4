//! Shell discovery and unification.
//!
//! A shell is a maximal connected component of faces under shared-vertex
//! connectivity (a "loose part"). Multi-shell meshes are folded into a
//! single body by boolean union; unions that fail are recoverable and the
//! offending shells are carried along unmerged.

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use meshmend_types::TriMesh;

use crate::toolkit::MeshToolkit;

/// Outcome of a shell unification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellSummary {
    /// Shells discovered in the input mesh.
    pub shells_found: usize,
    /// Shells successfully folded into the accumulator.
    pub shells_merged: usize,
    /// Pairs `(accumulator seed, shell index)` whose union failed; those
    /// shells remain in the output as separate bodies.
    pub union_failures: Vec<(usize, usize)>,
}

impl ShellSummary {
    /// True when every shell ended up in one body.
    #[must_use]
    pub fn is_unified(&self) -> bool {
        self.union_failures.is_empty()
    }
}

/// Count connected shells without splitting the mesh.
#[must_use]
pub fn shell_count(mesh: &TriMesh) -> usize {
    shell_assignment(mesh).1
}

/// Split a mesh into its shells.
///
/// Shells are returned in discovery order: ordered by the lowest face
/// index they contain. Vertices referenced by no face belong to no shell
/// and are not carried into the output.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn split_shells(mesh: &TriMesh) -> Vec<TriMesh> {
    let (face_shell, count) = shell_assignment(mesh);
    if count <= 1 {
        return vec![mesh.clone()];
    }

    let mut shells: Vec<TriMesh> = vec![TriMesh::new(); count];
    // Per-shell map from source vertex index to local index.
    let mut local: Vec<HashMap<u32, u32>> = vec![HashMap::new(); count];

    for (face_idx, face) in mesh.faces.iter().enumerate() {
        let s = face_shell[face_idx];
        let shell = &mut shells[s];
        let map = &mut local[s];

        let mut mapped = [0u32; 3];
        for (slot, &v) in mapped.iter_mut().zip(face.iter()) {
            *slot = *map.entry(v).or_insert_with(|| {
                let idx = shell.vertices.len() as u32;
                shell.vertices.push(mesh.vertices[v as usize].clone());
                idx
            });
        }
        shell.faces.push(mapped);
    }

    shells
}

/// Combine all shells of the mesh into one body.
///
/// The first-discovered shell seeds an accumulator; every following shell
/// is folded in with `toolkit.boolean_union` in the same discovery order.
/// A union that fails is logged as a warning, recorded in the summary, and
/// its shell is appended to the output unmerged; the caller distinguishes
/// this best-effort result through [`ShellSummary::is_unified`].
pub fn unify_shells<K: MeshToolkit + ?Sized>(mesh: &mut TriMesh, toolkit: &K) -> ShellSummary {
    let shells = split_shells(mesh);
    let shells_found = shells.len();
    if shells_found <= 1 {
        return ShellSummary {
            shells_found,
            ..ShellSummary::default()
        };
    }

    debug!(shells_found, "unifying shells");

    let mut iter = shells.into_iter();
    let Some(mut accumulator) = iter.next() else {
        return ShellSummary::default();
    };
    let mut shells_merged = 0;
    let mut union_failures = Vec::new();
    let mut leftovers: Vec<TriMesh> = Vec::new();

    for (index, shell) in iter.enumerate() {
        match toolkit.boolean_union(&accumulator, &shell) {
            Ok(unioned) => {
                accumulator = unioned;
                shells_merged += 1;
            }
            Err(err) => {
                warn!(shell = index + 1, %err, "boolean union failed, keeping shell separate");
                union_failures.push((0, index + 1));
                leftovers.push(shell);
            }
        }
    }

    for leftover in &leftovers {
        accumulator.merge(leftover);
    }
    *mesh = accumulator;

    info!(
        shells_found,
        shells_merged,
        failed = union_failures.len(),
        "shell unification done"
    );

    ShellSummary {
        shells_found,
        shells_merged,
        union_failures,
    }
}

/// Assign each face to a shell; returns the per-face shell id and the
/// shell count.
///
/// Shell ids are numbered in order of the lowest face index they contain,
/// so discovery order is stable for a given face array.
fn shell_assignment(mesh: &TriMesh) -> (Vec<usize>, usize) {
    let n = mesh.vertices.len();
    if mesh.faces.is_empty() {
        return (Vec::new(), 0);
    }

    // Union-find over vertices; faces connect their three corners.
    let mut parent: Vec<u32> = (0..n as u32).collect();

    fn find(parent: &mut [u32], mut x: u32) -> u32 {
        while parent[x as usize] != x {
            let grandparent = parent[parent[x as usize] as usize];
            parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    for face in &mesh.faces {
        let r0 = find(&mut parent, face[0]);
        let r1 = find(&mut parent, face[1]);
        if r0 != r1 {
            let (lo, hi) = if r0 < r1 { (r0, r1) } else { (r1, r0) };
            parent[hi as usize] = lo;
        }
        let r0 = find(&mut parent, face[0]);
        let r2 = find(&mut parent, face[2]);
        if r0 != r2 {
            let (lo, hi) = if r0 < r2 { (r0, r2) } else { (r2, r0) };
            parent[hi as usize] = lo;
        }
    }

    let mut shell_of_root: HashMap<u32, usize> = HashMap::new();
    let mut face_shell = Vec::with_capacity(mesh.faces.len());
    for face in &mesh.faces {
        let root = find(&mut parent, face[0]);
        let next_id = shell_of_root.len();
        let id = *shell_of_root.entry(root).or_insert(next_id);
        face_shell.push(id);
    }

    let count = shell_of_root.len();
    (face_shell, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::NativeToolkit;
    use meshmend_types::unit_cube;

    fn two_cubes(offset: f64) -> TriMesh {
        let mut mesh = unit_cube();
        let mut second = unit_cube();
        for v in &mut second.vertices {
            v.position.x += offset;
        }
        mesh.merge(&second);
        mesh
    }

    #[test]
    fn single_shell_count() {
        let cube = unit_cube();
        assert_eq!(shell_count(&cube), 1);
    }

    #[test]
    fn two_disjoint_cubes_are_two_shells() {
        let mesh = two_cubes(5.0);
        assert_eq!(shell_count(&mesh), 2);

        let shells = split_shells(&mesh);
        assert_eq!(shells.len(), 2);
        assert_eq!(shells[0].face_count(), 12);
        assert_eq!(shells[1].face_count(), 12);
        assert_eq!(shells[0].vertex_count(), 8);
    }

    #[test]
    fn split_single_shell_returns_clone() {
        let cube = unit_cube();
        let shells = split_shells(&cube);
        assert_eq!(shells.len(), 1);
        assert_eq!(shells[0].face_count(), 12);
    }

    #[test]
    fn unify_disjoint_cubes() {
        let mut mesh = two_cubes(5.0);
        let summary = unify_shells(&mut mesh, &NativeToolkit);

        assert_eq!(summary.shells_found, 2);
        assert_eq!(summary.shells_merged, 1);
        assert!(summary.is_unified());
        assert_eq!(mesh.face_count(), 24);
        assert!((mesh.volume() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn unify_overlapping_cubes_reports_failure() {
        let mut mesh = two_cubes(0.5);
        let summary = unify_shells(&mut mesh, &NativeToolkit);

        assert_eq!(summary.shells_found, 2);
        assert_eq!(summary.shells_merged, 0);
        assert_eq!(summary.union_failures, vec![(0, 1)]);
        // Both shells survive unmerged
        assert_eq!(mesh.face_count(), 24);
    }

    #[test]
    fn unify_single_shell_is_noop() {
        let mut cube = unit_cube();
        let before = cube.faces.clone();
        let summary = unify_shells(&mut cube, &NativeToolkit);

        assert_eq!(summary.shells_found, 1);
        assert_eq!(cube.faces, before);
    }
}
