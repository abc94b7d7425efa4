//! Mesh adjacency queries.
//!
//! Edge-to-face and vertex-to-face lookups, boundary and non-manifold edge
//! enumeration, and the per-vertex manifold test the repair loop is built
//! on.

use hashbrown::{HashMap, HashSet};

/// Adjacency information for a triangle mesh.
///
/// Built once from the face array; all queries are pure.
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    /// Maps edge (v0, v1), v0 < v1, to incident face indices.
    edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
    /// Maps vertex index to incident face indices.
    vertex_to_faces: HashMap<u32, Vec<usize>>,
}

impl MeshAdjacency {
    /// Build adjacency information from a list of faces.
    ///
    /// # Example
    ///
    /// ```
    /// use meshmend_repair::MeshAdjacency;
    ///
    /// let faces = vec![[0, 1, 2], [1, 3, 2]];
    /// let adj = MeshAdjacency::build(&faces);
    ///
    /// assert_eq!(adj.boundary_edge_count(), 4);
    /// ```
    #[must_use]
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        let mut vertex_to_faces: HashMap<u32, Vec<usize>> = HashMap::new();

        for (face_idx, face) in faces.iter().enumerate() {
            for &v in face {
                vertex_to_faces.entry(v).or_default().push(face_idx);
            }

            for i in 0..3 {
                let edge = ordered_edge(face[i], face[(i + 1) % 3]);
                edge_to_faces.entry(edge).or_default().push(face_idx);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Get faces incident to an edge, in either vertex order.
    #[must_use]
    pub fn faces_for_edge(&self, v0: u32, v1: u32) -> Option<&[usize]> {
        self.edge_to_faces
            .get(&ordered_edge(v0, v1))
            .map(Vec::as_slice)
    }

    /// Get faces incident to a vertex.
    #[must_use]
    pub fn faces_for_vertex(&self, v: u32) -> &[usize] {
        self.vertex_to_faces.get(&v).map_or(&[], Vec::as_slice)
    }

    /// Iterate over boundary edges (exactly one incident face).
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&edge, _)| edge)
    }

    /// Count boundary edges.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() == 1)
            .count()
    }

    /// Count non-manifold edges (more than two incident faces).
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_to_faces
            .values()
            .filter(|faces| faces.len() > 2)
            .count()
    }

    /// Check that no edge has more than two incident faces.
    #[must_use]
    pub fn is_edge_manifold(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() <= 2)
    }

    /// Check if the mesh is watertight (no boundary edges).
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|faces| faces.len() >= 2)
    }

    /// Total number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_to_faces.len()
    }

    /// Test whether the faces around a vertex form a single closed fan.
    ///
    /// A vertex fails this test when it:
    /// - has no incident face at all,
    /// - lies on a boundary edge (an edge at the vertex with one face),
    /// - lies on a fin (an edge at the vertex with more than two faces), or
    /// - joins two face fans that only touch at the vertex (bowtie).
    ///
    /// `faces` must be the same slice the adjacency was built from.
    #[must_use]
    pub fn is_vertex_manifold(&self, v: u32, faces: &[[u32; 3]]) -> bool {
        let incident = self.faces_for_vertex(v);
        if incident.is_empty() {
            return false;
        }

        // Each incident face contributes two spokes (edges at v). In a
        // closed fan every spoke is shared by exactly two incident faces.
        let mut spoke_faces: HashMap<u32, Vec<usize>> = HashMap::new();
        for &f in incident {
            let [a, b, c] = faces[f];
            let (s0, s1) = if a == v {
                (b, c)
            } else if b == v {
                (c, a)
            } else {
                (a, b)
            };
            spoke_faces.entry(s0).or_default().push(f);
            spoke_faces.entry(s1).or_default().push(f);
        }

        if spoke_faces.values().any(|fs| fs.len() != 2) {
            return false;
        }

        // The fan must be one connected component through its spokes.
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack = vec![incident[0]];
        while let Some(f) = stack.pop() {
            if !visited.insert(f) {
                continue;
            }
            for fs in spoke_faces.values() {
                if fs.contains(&f) {
                    for &g in fs {
                        if !visited.contains(&g) {
                            stack.push(g);
                        }
                    }
                }
            }
        }

        visited.len() == incident.len()
    }

    /// Enumerate non-manifold vertices in ascending index order.
    ///
    /// Considers every index below `vertex_count`, so vertices referenced
    /// by no face are reported too.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn non_manifold_vertices(&self, faces: &[[u32; 3]], vertex_count: usize) -> Vec<u32> {
        (0..vertex_count as u32)
            .filter(|&v| !self.is_vertex_manifold(v, faces))
            .collect()
    }
}

/// Order an edge so the smaller index comes first.
#[inline]
fn ordered_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmend_types::unit_cube;

    fn single_triangle() -> Vec<[u32; 3]> {
        vec![[0, 1, 2]]
    }

    fn two_triangles_sharing_edge() -> Vec<[u32; 3]> {
        vec![[0, 1, 2], [1, 3, 2]]
    }

    #[test]
    fn build_single_triangle() {
        let faces = single_triangle();
        let adj = MeshAdjacency::build(&faces);

        assert_eq!(adj.edge_count(), 3);
        assert_eq!(adj.boundary_edge_count(), 3);
        assert!(!adj.is_watertight());
    }

    #[test]
    fn faces_for_edge_either_direction() {
        let faces = two_triangles_sharing_edge();
        let adj = MeshAdjacency::build(&faces);

        let shared = adj.faces_for_edge(1, 2);
        assert_eq!(shared.map(<[usize]>::len), Some(2));
        assert_eq!(adj.faces_for_edge(2, 1), shared);
        assert!(adj.faces_for_edge(0, 3).is_none());
    }

    #[test]
    fn faces_for_vertex_counts() {
        let faces = two_triangles_sharing_edge();
        let adj = MeshAdjacency::build(&faces);

        assert_eq!(adj.faces_for_vertex(2).len(), 2);
        assert_eq!(adj.faces_for_vertex(0).len(), 1);
        assert_eq!(adj.faces_for_vertex(99).len(), 0);
    }

    #[test]
    fn fin_edge_is_non_manifold() {
        // Three triangles sharing edge (0, 1)
        let faces = vec![[0, 1, 2], [0, 1, 3], [0, 1, 4]];
        let adj = MeshAdjacency::build(&faces);

        assert_eq!(adj.non_manifold_edge_count(), 1);
        assert!(!adj.is_edge_manifold());
    }

    #[test]
    fn cube_is_watertight_and_manifold() {
        let cube = unit_cube();
        let adj = MeshAdjacency::build(&cube.faces);

        assert!(adj.is_watertight());
        assert!(adj.is_edge_manifold());
        assert!(adj
            .non_manifold_vertices(&cube.faces, cube.vertex_count())
            .is_empty());
    }

    #[test]
    fn boundary_vertex_is_non_manifold() {
        let faces = single_triangle();
        let adj = MeshAdjacency::build(&faces);

        assert!(!adj.is_vertex_manifold(0, &faces));
        assert_eq!(adj.non_manifold_vertices(&faces, 3), vec![0, 1, 2]);
    }

    #[test]
    fn open_cube_rim_is_non_manifold() {
        let mut cube = unit_cube();
        // Drop the top face (vertices 4..8 form the rim)
        cube.faces.retain(|f| *f != [4, 5, 6] && *f != [4, 6, 7]);

        let adj = MeshAdjacency::build(&cube.faces);
        let nm = adj.non_manifold_vertices(&cube.faces, cube.vertex_count());
        assert_eq!(nm, vec![4, 5, 6, 7]);
    }

    #[test]
    fn bowtie_vertex_is_non_manifold() {
        // Two tetrahedra sharing only their apex vertex 0
        let faces: Vec<[u32; 3]> = vec![
            // Tetrahedron A: vertices 0,1,2,3
            [0, 2, 1],
            [0, 1, 3],
            [1, 2, 3],
            [2, 0, 3],
            // Tetrahedron B: vertices 0,4,5,6 (shares only vertex 0)
            [0, 5, 4],
            [0, 4, 6],
            [4, 5, 6],
            [5, 0, 6],
        ];
        let adj = MeshAdjacency::build(&faces);

        // Every edge is 2-manifold, but vertex 0 joins two disjoint fans.
        assert!(adj.is_edge_manifold());
        assert!(!adj.is_vertex_manifold(0, &faces));
        assert!(adj.is_vertex_manifold(1, &faces));
        assert!(adj.is_vertex_manifold(4, &faces));
    }

    #[test]
    fn unreferenced_vertex_is_non_manifold() {
        let faces = single_triangle();
        let adj = MeshAdjacency::build(&faces);

        // Vertex 3 exists in the mesh but no face references it.
        let nm = adj.non_manifold_vertices(&faces, 4);
        assert!(nm.contains(&3));
    }
}
