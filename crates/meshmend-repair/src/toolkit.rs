//! The mesh-editing capability interface.
//!
//! The repair pipeline is written against [`MeshToolkit`] rather than a
//! concrete geometry kernel: every select-then-operate idiom of an
//! interactive editor becomes an explicit `operate(mesh, &selection)`
//! call. [`NativeToolkit`] implements the whole surface with this crate's
//! own algorithms; tests substitute mocks to drive the repair loop's
//! failure paths, and a production CSG kernel can replace the union
//! without touching the pipeline.

use hashbrown::HashSet;
use meshmend_types::{TriMesh, Vertex};

use crate::adjacency::MeshAdjacency;
use crate::cleanup;
use crate::error::UnionError;
use crate::holes;
use crate::orient;

/// Primitive mesh-editing operations the repair pipeline consumes.
///
/// Selections are explicit slices of vertex indices; implementations must
/// uphold the mesh invariant that no face references a removed vertex.
pub trait MeshToolkit {
    /// Merge vertices within `tolerance` of each other; returns merges.
    fn weld(&self, mesh: &mut TriMesh, tolerance: f64) -> usize;

    /// Collapse edges of length ≤ `tolerance` and drop faces of area ≤
    /// `tolerance²`; returns elements dissolved.
    fn dissolve_degenerate(&self, mesh: &mut TriMesh, tolerance: f64) -> usize;

    /// Remove vertices referenced by no face; returns removals.
    fn delete_loose(&self, mesh: &mut TriMesh) -> usize;

    /// Fill holes with at most `max_sides` edges (`0` = unlimited);
    /// returns holes filled.
    fn fill_holes(&self, mesh: &mut TriMesh, max_sides: usize) -> usize;

    /// Fill boundary loops fully covered by `selection`; returns fills.
    fn fill_boundary(&self, mesh: &mut TriMesh, selection: &[u32]) -> usize;

    /// Delete the selected vertices along with their incident faces;
    /// returns vertices removed.
    fn delete_vertices(&self, mesh: &mut TriMesh, selection: &[u32]) -> usize;

    /// Enumerate non-manifold vertices in ascending index order.
    fn select_non_manifold(&self, mesh: &TriMesh) -> Vec<u32>;

    /// Orient all face normals consistently outward; returns flips.
    fn recompute_outward_normals(&self, mesh: &mut TriMesh) -> usize;

    /// Combine two shells into one solid.
    ///
    /// # Errors
    ///
    /// Allowed to fail on inputs the implementation cannot union (empty,
    /// self-intersecting, or overlapping shells); the caller recovers by
    /// keeping the operands separate.
    fn boolean_union(&self, a: &TriMesh, b: &TriMesh) -> Result<TriMesh, UnionError>;
}

/// [`MeshToolkit`] backed by this crate's own algorithms.
///
/// The boolean union handles the common case of disjoint shells by
/// concatenation and refuses overlapping shells: resolving actual surface
/// intersections needs a full CSG kernel, and reporting the failure keeps
/// the pipeline honest about it instead of producing self-intersecting
/// output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeToolkit;

impl MeshToolkit for NativeToolkit {
    fn weld(&self, mesh: &mut TriMesh, tolerance: f64) -> usize {
        cleanup::weld_vertices(mesh, tolerance)
    }

    fn dissolve_degenerate(&self, mesh: &mut TriMesh, tolerance: f64) -> usize {
        cleanup::dissolve_degenerate(mesh, tolerance).total()
    }

    fn delete_loose(&self, mesh: &mut TriMesh) -> usize {
        cleanup::delete_loose(mesh)
    }

    fn fill_holes(&self, mesh: &mut TriMesh, max_sides: usize) -> usize {
        holes::fill_holes(mesh, max_sides)
    }

    fn fill_boundary(&self, mesh: &mut TriMesh, selection: &[u32]) -> usize {
        holes::fill_selection_boundary(mesh, selection)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn delete_vertices(&self, mesh: &mut TriMesh, selection: &[u32]) -> usize {
        if selection.is_empty() {
            return 0;
        }
        let doomed: HashSet<u32> = selection.iter().copied().collect();

        mesh.faces.retain(|face| !face.iter().any(|v| doomed.contains(v)));

        let mut remap = vec![u32::MAX; mesh.vertices.len()];
        let mut kept: Vec<Vertex> = Vec::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            if doomed.contains(&(i as u32)) {
                continue;
            }
            remap[i] = kept.len() as u32;
            kept.push(vertex.clone());
        }

        for face in &mut mesh.faces {
            for v in face {
                *v = remap[*v as usize];
            }
        }

        let removed = mesh.vertices.len() - kept.len();
        mesh.vertices = kept;
        removed
    }

    fn select_non_manifold(&self, mesh: &TriMesh) -> Vec<u32> {
        let adjacency = MeshAdjacency::build(&mesh.faces);
        adjacency.non_manifold_vertices(&mesh.faces, mesh.vertex_count())
    }

    fn recompute_outward_normals(&self, mesh: &mut TriMesh) -> usize {
        orient::make_normals_consistent(mesh)
    }

    fn boolean_union(&self, a: &TriMesh, b: &TriMesh) -> Result<TriMesh, UnionError> {
        if a.is_empty() || b.is_empty() {
            return Err(UnionError::EmptyInput);
        }
        if a.bounds().intersects(&b.bounds()) {
            return Err(UnionError::OverlappingShells);
        }

        let mut unioned = a.clone();
        unioned.merge(b);
        Ok(unioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmend_types::unit_cube;

    #[test]
    fn delete_vertices_removes_incident_faces() {
        let mut cube = unit_cube();
        let removed = NativeToolkit.delete_vertices(&mut cube, &[0]);

        assert_eq!(removed, 1);
        assert_eq!(cube.vertex_count(), 7);
        // Vertex 0 touched 6 of the 12 faces
        assert_eq!(cube.face_count(), 6);

        let count = cube.vertex_count() as u32;
        for face in &cube.faces {
            assert!(face.iter().all(|&v| v < count));
        }
    }

    #[test]
    fn delete_vertices_empty_selection() {
        let mut cube = unit_cube();
        assert_eq!(NativeToolkit.delete_vertices(&mut cube, &[]), 0);
        assert_eq!(cube.face_count(), 12);
    }

    #[test]
    fn select_non_manifold_on_closed_mesh() {
        let cube = unit_cube();
        assert!(NativeToolkit.select_non_manifold(&cube).is_empty());
    }

    #[test]
    fn select_non_manifold_on_open_mesh() {
        let mut cube = unit_cube();
        cube.faces.retain(|f| *f != [4, 5, 6] && *f != [4, 6, 7]);
        assert_eq!(NativeToolkit.select_non_manifold(&cube), vec![4, 5, 6, 7]);
    }

    #[test]
    fn union_of_disjoint_shells() {
        let a = unit_cube();
        let mut b = unit_cube();
        for v in &mut b.vertices {
            v.position.x += 3.0;
        }

        let unioned = NativeToolkit.boolean_union(&a, &b);
        assert!(unioned.is_ok());
        assert_eq!(unioned.map(|m| m.face_count()), Ok(24));
    }

    #[test]
    fn union_of_overlapping_shells_fails() {
        let a = unit_cube();
        let mut b = unit_cube();
        for v in &mut b.vertices {
            v.position.x += 0.5;
        }

        assert!(matches!(
            NativeToolkit.boolean_union(&a, &b),
            Err(UnionError::OverlappingShells)
        ));
    }

    #[test]
    fn union_of_empty_shell_fails() {
        let a = unit_cube();
        assert!(matches!(
            NativeToolkit.boolean_union(&a, &TriMesh::new()),
            Err(UnionError::EmptyInput)
        ));
    }
}
