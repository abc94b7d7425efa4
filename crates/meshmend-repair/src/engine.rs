//! The non-manifold repair engine and the full pipeline entry point.
//!
//! The engine is a fixed-point loop: find non-manifold vertices, fill the
//! holes they border, re-orient, delete whatever stayed non-manifold, and
//! scan again. The fill and delete primitives come from an opaque
//! [`MeshToolkit`], so termination cannot be proven analytically. Instead
//! the loop detects two concrete non-termination witnesses (an iteration
//! that reproduces the exact non-manifold position fingerprint, and an
//! iteration budget) and fails safely, leaving the mesh in its
//! last-iterated state.

use hashbrown::HashSet;
use tracing::{debug, info, warn};

use meshmend_types::{Point3, TriMesh};

use crate::config::RepairConfig;
use crate::error::RepairFailure;
use crate::shells::{unify_shells, ShellSummary};
use crate::toolkit::{MeshToolkit, NativeToolkit};

/// The set of 3D positions of currently non-manifold vertices.
///
/// Positions, not indices, are the loop's progress signal: indices are
/// invalidated by repeated deletion and insertion, while coordinates stay
/// a stable fingerprint across iterations until a repair actually moves or
/// removes that point.
///
/// Coordinates are compared by exact bit pattern (negative zero normalized
/// to zero). A repair that perturbs a coordinate by less than representable
/// precision therefore does not register as progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSet(HashSet<[u64; 3]>);

impl PositionSet {
    /// Capture the positions of the given vertex indices.
    #[must_use]
    pub fn capture(mesh: &TriMesh, indices: &[u32]) -> Self {
        Self(
            indices
                .iter()
                .filter_map(|&i| mesh.vertices.get(i as usize))
                .map(|v| position_key(&v.position))
                .collect(),
        )
    }

    /// Number of distinct positions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bit-exact coordinate key; `-0.0` collapses onto `0.0` so the comparison
/// matches float equality.
fn position_key(p: &Point3<f64>) -> [u64; 3] {
    let bits = |x: f64| if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}

/// How a repair attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// No non-manifold vertices remain; the mesh is watertight and
    /// outward-oriented.
    Repaired,
    /// The repair loop declared a terminal failure; the mesh is left in
    /// its last-iterated state with no final orientation pass applied.
    Failed(RepairFailure),
}

/// Summary of a full repair run.
///
/// # Example
///
/// ```
/// use meshmend_types::unit_cube;
/// use meshmend_repair::{repair, RepairConfig};
///
/// let mut mesh = unit_cube();
/// let report = repair(&mut mesh, &RepairConfig::default());
/// assert!(report.is_repaired());
/// println!("{report}");
/// ```
#[derive(Debug, Clone)]
pub struct RepairReport {
    /// How the repair ended.
    pub outcome: RepairOutcome,
    /// Shell discovery and union results.
    pub shells: ShellSummary,
    /// Vertices merged by welding.
    pub vertices_welded: usize,
    /// Degenerate elements dissolved.
    pub degenerates_dissolved: usize,
    /// Loose vertices garbage-collected.
    pub loose_removed: usize,
    /// Iterations the repair loop ran.
    pub iterations: u32,
    /// Faces flipped by the final orientation pass (zero on failure).
    pub faces_flipped: usize,
    /// Vertex count before repair.
    pub initial_vertices: usize,
    /// Face count before repair.
    pub initial_faces: usize,
    /// Vertex count after repair.
    pub final_vertices: usize,
    /// Face count after repair.
    pub final_faces: usize,
}

impl RepairReport {
    /// True when the repair converged with every shell unified.
    #[must_use]
    pub fn is_repaired(&self) -> bool {
        self.outcome == RepairOutcome::Repaired && self.shells.is_unified()
    }

    /// True when the repair converged but some shells could not be
    /// unioned and remain separate bodies.
    #[must_use]
    pub fn is_best_effort(&self) -> bool {
        self.outcome == RepairOutcome::Repaired && !self.shells.is_unified()
    }
}

impl std::fmt::Display for RepairReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            RepairOutcome::Repaired => write!(f, "repaired")?,
            RepairOutcome::Failed(failure) => write!(f, "failed ({failure})")?,
        }
        write!(
            f,
            ": {} -> {} verts, {} -> {} faces, {} welded, {} dissolved, {} loose, {} shells ({} union failures), {} iterations",
            self.initial_vertices,
            self.final_vertices,
            self.initial_faces,
            self.final_faces,
            self.vertices_welded,
            self.degenerates_dissolved,
            self.loose_removed,
            self.shells.shells_found,
            self.shells.union_failures.len(),
            self.iterations,
        )
    }
}

/// Repair a mesh with the built-in toolkit.
///
/// Pipeline order: shell unification → duplicate weld → degenerate
/// dissolution → loose-vertex deletion → non-manifold repair loop → final
/// outward orientation. The mesh is mutated in place; on failure it holds
/// the last-iterated state and the final orientation pass is skipped.
pub fn repair(mesh: &mut TriMesh, config: &RepairConfig) -> RepairReport {
    repair_with(mesh, config, &NativeToolkit)
}

/// Repair a mesh with a caller-supplied toolkit.
pub fn repair_with<K: MeshToolkit + ?Sized>(
    mesh: &mut TriMesh,
    config: &RepairConfig,
    toolkit: &K,
) -> RepairReport {
    let initial_vertices = mesh.vertex_count();
    let initial_faces = mesh.face_count();

    let shells = unify_shells(mesh, toolkit);

    let vertices_welded = toolkit.weld(mesh, config.tolerance);
    let degenerates_dissolved = toolkit.dissolve_degenerate(mesh, config.tolerance);
    let loose_removed = toolkit.delete_loose(mesh);

    let (iterations, outcome) = match run_repair_loop(mesh, config, toolkit) {
        (iterations, None) => (iterations, RepairOutcome::Repaired),
        (iterations, Some(failure)) => {
            warn!(%failure, "repair loop failed");
            (iterations, RepairOutcome::Failed(failure))
        }
    };

    // The final orientation runs only on success so a failed mesh shows
    // the exact state that failed validation.
    let faces_flipped = if outcome == RepairOutcome::Repaired {
        toolkit.recompute_outward_normals(mesh)
    } else {
        0
    };

    let report = RepairReport {
        outcome,
        shells,
        vertices_welded,
        degenerates_dissolved,
        loose_removed,
        iterations,
        faces_flipped,
        initial_vertices,
        initial_faces,
        final_vertices: mesh.vertex_count(),
        final_faces: mesh.face_count(),
    };

    info!(%report, "repair finished");
    report
}

/// Drive the mesh to a non-manifold-free fixed point.
///
/// Each iteration fills detected holes, fills any boundary still flagged
/// non-manifold, re-orients normals (manifold classification is
/// orientation-sensitive for self-intersecting geometry), and deletes the
/// vertices that remain flagged, sacrificing local geometry to guarantee
/// progress.
///
/// Returns the number of iterations run.
///
/// # Errors
///
/// [`RepairFailure::NoProgress`] when an iteration reproduces the exact
/// non-manifold position fingerprint of the previous one;
/// [`RepairFailure::IterationBudgetExceeded`] past
/// [`RepairConfig::max_iterations`].
pub fn fix_non_manifold<K: MeshToolkit + ?Sized>(
    mesh: &mut TriMesh,
    config: &RepairConfig,
    toolkit: &K,
) -> Result<u32, RepairFailure> {
    match run_repair_loop(mesh, config, toolkit) {
        (iterations, None) => Ok(iterations),
        (_, Some(failure)) => Err(failure),
    }
}

/// The loop body shared by [`fix_non_manifold`] and [`repair_with`];
/// returns the iterations run alongside any terminal failure.
fn run_repair_loop<K: MeshToolkit + ?Sized>(
    mesh: &mut TriMesh,
    config: &RepairConfig,
    toolkit: &K,
) -> (u32, Option<RepairFailure>) {
    let mut current = scan(mesh, toolkit);
    let mut iterations: u32 = 0;

    while !current.is_empty() {
        debug!(
            remaining = current.len(),
            iteration = iterations,
            "repair pass"
        );

        toolkit.fill_holes(mesh, config.hole_sides);

        let flagged = toolkit.select_non_manifold(mesh);
        toolkit.fill_boundary(mesh, &flagged);

        toolkit.recompute_outward_normals(mesh);

        let flagged = toolkit.select_non_manifold(mesh);
        toolkit.delete_vertices(mesh, &flagged);

        let next = scan(mesh, toolkit);
        iterations += 1;

        if next == current {
            debug!(fingerprint = ?current, "fingerprint unchanged");
            return (
                iterations,
                Some(RepairFailure::NoProgress {
                    remaining: next.len(),
                }),
            );
        }
        if iterations > config.max_iterations {
            return (
                iterations,
                Some(RepairFailure::IterationBudgetExceeded {
                    iterations,
                    remaining: next.len(),
                }),
            );
        }
        current = next;
    }

    info!(iterations, "non-manifold repair converged");
    (iterations, None)
}

/// Capture the current non-manifold position fingerprint.
fn scan<K: MeshToolkit + ?Sized>(mesh: &TriMesh, toolkit: &K) -> PositionSet {
    let selected = toolkit.select_non_manifold(mesh);
    PositionSet::capture(mesh, &selected)
}
