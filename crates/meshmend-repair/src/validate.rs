//! Mesh validation and health reporting.
//!
//! Summarizes the conditions the repair pipeline exists to fix, so
//! callers can check a mesh before and after without reading logs.

use meshmend_types::TriMesh;

use crate::adjacency::MeshAdjacency;

/// Area below which a face counts as degenerate in a report.
const DEGENERATE_AREA: f64 = 1e-12;

/// Report of mesh validation results.
#[derive(Debug, Clone, Default)]
pub struct MeshReport {
    /// Total number of vertices.
    pub vertex_count: usize,
    /// Total number of faces.
    pub face_count: usize,
    /// Total number of distinct edges.
    pub edge_count: usize,

    /// Edges with exactly one incident face.
    pub boundary_edge_count: usize,
    /// Edges with more than two incident faces.
    pub non_manifold_edge_count: usize,
    /// Vertices whose faces do not form a single closed fan.
    pub non_manifold_vertex_count: usize,
    /// Faces with near-zero area.
    pub degenerate_face_count: usize,

    /// No boundary edges.
    pub is_watertight: bool,
    /// Every vertex has a single closed face fan.
    pub is_manifold: bool,
    /// Signed volume is negative (normals point inward).
    pub is_inside_out: bool,
}

impl MeshReport {
    /// Check if the mesh is ready for 3D printing: watertight, manifold,
    /// and oriented outward.
    #[must_use]
    pub const fn is_printable(&self) -> bool {
        self.is_watertight && self.is_manifold && !self.is_inside_out
    }

    /// Check if the mesh has any issues worth repairing.
    #[must_use]
    pub const fn has_issues(&self) -> bool {
        self.boundary_edge_count > 0
            || self.non_manifold_edge_count > 0
            || self.non_manifold_vertex_count > 0
            || self.degenerate_face_count > 0
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;
        writeln!(f, "  Edges: {}", self.edge_count)?;
        writeln!(
            f,
            "  Watertight: {}",
            if self.is_watertight { "yes" } else { "no" }
        )?;
        writeln!(
            f,
            "  Manifold: {}",
            if self.is_manifold { "yes" } else { "no" }
        )?;
        writeln!(
            f,
            "  Orientation: {}",
            if self.is_inside_out {
                "inside-out"
            } else {
                "outward"
            }
        )?;

        if self.has_issues() {
            writeln!(f, "  Issues:")?;
            if self.boundary_edge_count > 0 {
                writeln!(f, "    Boundary edges: {}", self.boundary_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(f, "    Non-manifold edges: {}", self.non_manifold_edge_count)?;
            }
            if self.non_manifold_vertex_count > 0 {
                writeln!(
                    f,
                    "    Non-manifold vertices: {}",
                    self.non_manifold_vertex_count
                )?;
            }
            if self.degenerate_face_count > 0 {
                writeln!(f, "    Degenerate faces: {}", self.degenerate_face_count)?;
            }
        }

        Ok(())
    }
}

/// Validate a mesh and report its health.
///
/// # Example
///
/// ```
/// use meshmend_types::unit_cube;
/// use meshmend_repair::validate_mesh;
///
/// let report = validate_mesh(&unit_cube());
/// assert!(report.is_printable());
/// ```
#[must_use]
pub fn validate_mesh(mesh: &TriMesh) -> MeshReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let non_manifold_vertex_count = adjacency
        .non_manifold_vertices(&mesh.faces, mesh.vertex_count())
        .len();

    let degenerate_face_count = mesh
        .triangles()
        .filter(|tri| tri.is_degenerate(DEGENERATE_AREA))
        .count();

    MeshReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        edge_count: adjacency.edge_count(),
        boundary_edge_count: adjacency.boundary_edge_count(),
        non_manifold_edge_count: adjacency.non_manifold_edge_count(),
        non_manifold_vertex_count,
        degenerate_face_count,
        is_watertight: adjacency.is_watertight(),
        is_manifold: non_manifold_vertex_count == 0,
        is_inside_out: !mesh.faces.is_empty() && mesh.is_inside_out(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmend_types::{unit_cube, Vertex};

    #[test]
    fn cube_is_printable() {
        let report = validate_mesh(&unit_cube());

        assert_eq!(report.vertex_count, 8);
        assert_eq!(report.face_count, 12);
        assert_eq!(report.edge_count, 18);
        assert!(report.is_watertight);
        assert!(report.is_manifold);
        assert!(!report.is_inside_out);
        assert!(report.is_printable());
        assert!(!report.has_issues());
    }

    #[test]
    fn open_cube_has_issues() {
        let mut mesh = unit_cube();
        mesh.faces.retain(|f| *f != [4, 5, 6] && *f != [4, 6, 7]);

        let report = validate_mesh(&mesh);
        assert_eq!(report.boundary_edge_count, 4);
        assert_eq!(report.non_manifold_vertex_count, 4);
        assert!(!report.is_watertight);
        assert!(!report.is_manifold);
        assert!(!report.is_printable());
        assert!(report.has_issues());
    }

    #[test]
    fn inside_out_cube_is_not_printable() {
        let mut mesh = unit_cube();
        mesh.flip_normals();

        let report = validate_mesh(&mesh);
        assert!(report.is_watertight);
        assert!(report.is_inside_out);
        assert!(!report.is_printable());
    }

    #[test]
    fn degenerate_face_is_counted() {
        let mut mesh = TriMesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(2.0, 0.0, 0.0)); // collinear
        mesh.faces.push([0, 1, 2]);

        let report = validate_mesh(&mesh);
        assert_eq!(report.degenerate_face_count, 1);
    }

    #[test]
    fn empty_mesh_report() {
        let report = validate_mesh(&TriMesh::new());
        assert_eq!(report.vertex_count, 0);
        assert!(!report.is_inside_out);
        assert!(!report.has_issues());
    }

    #[test]
    fn report_display_lists_issues() {
        let mut mesh = unit_cube();
        mesh.faces.retain(|f| *f != [4, 5, 6] && *f != [4, 6, 7]);

        let text = format!("{}", validate_mesh(&mesh));
        assert!(text.contains("Watertight: no"));
        assert!(text.contains("Boundary edges: 4"));
    }
}
