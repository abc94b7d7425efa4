//! Repair pipeline configuration.

/// Configuration for the repair pipeline.
///
/// All distances are in the same units as the mesh coordinates. Values are
/// read once when [`repair`](crate::repair) starts and never mutated.
///
/// # Example
///
/// ```
/// use meshmend_repair::RepairConfig;
///
/// let config = RepairConfig::default()
///     .with_tolerance(1e-3)
///     .with_max_iterations(50);
/// ```
#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Distance threshold for vertex welding and degenerate dissolution.
    ///
    /// Vertices within this distance are merged; edges at most this long
    /// are collapsed; faces with area at most `tolerance²` are removed.
    /// Default: `1e-4`
    pub tolerance: f64,

    /// Maximum edge count of holes the primary hole filler closes.
    ///
    /// Holes with more edges are left for the secondary boundary fill over
    /// non-manifold selections. `0` disables the limit. A boundary loop
    /// always has at least 3 edges, so values below 3 fill nothing.
    /// Default: `4`
    pub hole_sides: usize,

    /// Iteration budget for the non-manifold repair loop.
    ///
    /// Exceeding it fails the repair with
    /// [`RepairFailure::IterationBudgetExceeded`](crate::RepairFailure::IterationBudgetExceeded).
    /// Default: `200`
    pub max_iterations: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            hole_sides: 4,
            max_iterations: 200,
        }
    }
}

impl RepairConfig {
    /// Set the weld/dissolve distance threshold.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum hole size for the primary filler (`0` = unlimited).
    #[must_use]
    pub fn with_hole_sides(mut self, hole_sides: usize) -> Self {
        self.hole_sides = hole_sides;
        self
    }

    /// Set the repair loop iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}
