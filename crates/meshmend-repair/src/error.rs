//! Error types for the repair pipeline.

use thiserror::Error;

/// Terminal failures of the non-manifold repair loop.
///
/// Both variants leave the mesh in its last-iterated, partially repaired
/// state; the caller may still inspect or discard it. The final outward
/// orientation pass is not applied after a failure, so the mesh shows the
/// exact state that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepairFailure {
    /// Filling and deleting reproduced an identical non-manifold position
    /// fingerprint: the topology is oscillating or the deletion recreated
    /// the same hole, so the loop cannot converge.
    #[error("repair made no progress, {remaining} non-manifold vertices remain")]
    NoProgress {
        /// Size of the unchanged non-manifold fingerprint.
        remaining: usize,
    },

    /// The loop ran past its iteration budget without converging.
    #[error("exceeded {iterations} repair iterations, {remaining} non-manifold vertices remain")]
    IterationBudgetExceeded {
        /// Iterations completed when the budget was exhausted.
        iterations: u32,
        /// Non-manifold vertices remaining at that point.
        remaining: usize,
    },
}

/// Recoverable failure of a boolean union between two shells.
///
/// Union against self-intersecting or overlapping shells is allowed to
/// fail; the caller keeps the shells unmerged and proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnionError {
    /// One of the operands has no faces.
    #[error("cannot union an empty shell")]
    EmptyInput,

    /// The shells' bounds overlap; resolving their intersection needs a
    /// full CSG kernel, which this toolkit does not provide.
    #[error("cannot union overlapping shells without a CSG kernel")]
    OverlappingShells,
}
