//! Property-based tests for the repair operations.
//!
//! Random meshes (including garbage topology) must never panic the
//! pipeline, and welding must uphold its survivor-distance guarantee.

use meshmend_repair::{
    repair, validate_mesh, weld_vertices, RepairConfig, RepairOutcome,
};
use meshmend_types::{TriMesh, Vertex};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_vertex() -> impl Strategy<Value = Vertex> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Vertex::from_coords(x, y, z))
}

/// A mesh with valid face indices but otherwise arbitrary topology.
fn arb_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = TriMesh> {
    (3..=max_vertices).prop_flat_map(move |num_vertices| {
        prop::collection::vec(arb_vertex(), num_vertices).prop_flat_map(move |verts| {
            let n = verts.len() as u32;
            let face = prop::array::uniform3(0..n);
            prop::collection::vec(face, 0..=max_faces).prop_map(move |faces| TriMesh {
                vertices: verts.clone(),
                faces,
            })
        })
    })
}

// =============================================================================
// Validation
// =============================================================================

proptest! {
    #[test]
    fn validation_never_panics(mesh in arb_mesh(50, 100)) {
        let _ = validate_mesh(&mesh);
    }

    #[test]
    fn validation_is_stable(mesh in arb_mesh(30, 50)) {
        let report1 = validate_mesh(&mesh);
        let report2 = validate_mesh(&mesh);

        prop_assert_eq!(report1.vertex_count, report2.vertex_count);
        prop_assert_eq!(report1.boundary_edge_count, report2.boundary_edge_count);
        prop_assert_eq!(report1.is_manifold, report2.is_manifold);
        prop_assert_eq!(report1.is_watertight, report2.is_watertight);
    }
}

// =============================================================================
// Welding
// =============================================================================

proptest! {
    #[test]
    fn weld_never_increases_vertices(mesh in arb_mesh(30, 50)) {
        let original = mesh.vertex_count();
        let mut welded = mesh.clone();

        weld_vertices(&mut welded, 0.001);

        prop_assert!(welded.vertex_count() <= original);
    }

    #[test]
    fn weld_produces_valid_indices(mesh in arb_mesh(30, 50)) {
        let mut welded = mesh.clone();
        weld_vertices(&mut welded, 0.01);

        let count = welded.vertex_count() as u32;
        for face in &welded.faces {
            prop_assert!(face.iter().all(|&v| v < count));
        }
    }

    /// After welding, no two surviving vertices lie within the tolerance.
    #[test]
    fn weld_survivors_are_separated(mesh in arb_mesh(20, 30), tolerance in 1e-6..1.0f64) {
        let mut welded = mesh.clone();
        weld_vertices(&mut welded, tolerance);

        for i in 0..welded.vertices.len() {
            for j in (i + 1)..welded.vertices.len() {
                let dist = (welded.vertices[i].position - welded.vertices[j].position).norm();
                prop_assert!(
                    dist > tolerance,
                    "survivors {} and {} are {} apart (tolerance {})",
                    i, j, dist, tolerance
                );
            }
        }
    }
}

// =============================================================================
// Full repair
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The pipeline must terminate with a typed outcome on any input.
    #[test]
    fn repair_never_panics(mesh in arb_mesh(20, 30)) {
        let mut repaired = mesh.clone();
        let report = repair(&mut repaired, &RepairConfig::default());

        match report.outcome {
            RepairOutcome::Repaired | RepairOutcome::Failed(_) => {}
        }
    }

    /// Whatever the outcome, face indices stay valid.
    #[test]
    fn repair_preserves_index_validity(mesh in arb_mesh(20, 30)) {
        let mut repaired = mesh.clone();
        let _ = repair(&mut repaired, &RepairConfig::default());

        let count = repaired.vertex_count() as u32;
        for face in &repaired.faces {
            prop_assert!(face.iter().all(|&v| v < count));
        }
    }

    /// A successful repair leaves no non-manifold vertices.
    #[test]
    fn repaired_meshes_are_manifold(mesh in arb_mesh(15, 20)) {
        let mut repaired = mesh.clone();
        let report = repair(&mut repaired, &RepairConfig::default());

        if report.outcome == RepairOutcome::Repaired {
            let health = validate_mesh(&repaired);
            prop_assert_eq!(health.non_manifold_vertex_count, 0);
        }
    }
}
