//! Topology cleanup passes.
//!
//! Duplicate-vertex welding, degenerate-element dissolution, and loose
//! vertex garbage collection. Every pass is total over any mesh state,
//! including the empty mesh, and preserves the no-dangling-indices
//! invariant of [`TriMesh`].

use hashbrown::HashMap;
use meshmend_types::{Point3, TriMesh, Triangle, Vertex};
use tracing::debug;

/// Merge vertices whose pairwise distance is at most `tolerance`.
///
/// Uses a uniform spatial hash (cell edge = 2·tolerance, 3×3×3 neighborhood
/// scan). Vertices are visited in ascending index order and merged into the
/// lowest surviving index, so the result is deterministic regardless of
/// input order. Faces collapsed by the merge are dropped and merged-away
/// vertices are removed, with face indices compacted accordingly.
///
/// Returns the number of vertices merged away.
///
/// # Example
///
/// ```
/// use meshmend_types::{TriMesh, Vertex};
/// use meshmend_repair::weld_vertices;
///
/// let mut mesh = TriMesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.00001, 0.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
/// mesh.faces.push([0, 3, 2]);
///
/// let merged = weld_vertices(&mut mesh, 1e-4);
/// assert_eq!(merged, 1);
/// assert_eq!(mesh.vertex_count(), 3);
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn weld_vertices(mesh: &mut TriMesh, tolerance: f64) -> usize {
    let n = mesh.vertices.len();
    if n == 0 {
        return 0;
    }

    let cell_size = tolerance.max(1e-12) * 2.0;

    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        grid.entry(grid_cell(&vertex.position, cell_size))
            .or_default()
            .push(idx as u32);
    }

    let mut remap: Vec<u32> = (0..n as u32).collect();
    let mut merged = 0usize;

    for (idx, vertex) in mesh.vertices.iter().enumerate() {
        let idx = idx as u32;
        if remap[idx as usize] != idx {
            continue;
        }

        let cell = grid_cell(&vertex.position, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz))
                    else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= idx || remap[other as usize] != other {
                            continue;
                        }
                        let dist =
                            (vertex.position - mesh.vertices[other as usize].position).norm();
                        if dist <= tolerance {
                            remap[other as usize] = idx;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    for i in 0..n {
        remap[i] = find_root(&remap, i as u32);
    }

    compact_remapped(mesh, &remap);
    mesh.faces
        .retain(|&[a, b, c]| a != b && b != c && a != c);

    debug!(merged, survivors = mesh.vertices.len(), "welded vertices");
    merged
}

/// Counts reported by [`dissolve_degenerate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DissolveSummary {
    /// Edges of length ≤ tolerance collapsed to a point.
    pub edges_collapsed: usize,
    /// Faces of area ≤ tolerance² removed.
    pub faces_removed: usize,
}

impl DissolveSummary {
    /// Total elements dissolved.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.edges_collapsed + self.faces_removed
    }
}

/// Dissolve zero-area faces and zero-length edges.
///
/// Edges of length at most `tolerance` are collapsed (endpoints welded into
/// the lower surviving index), then faces with area at most `tolerance²`
/// are removed. Independent of [`weld_vertices`]; welding can itself create
/// new degeneracies, so this runs after it in the pipeline.
pub fn dissolve_degenerate(mesh: &mut TriMesh, tolerance: f64) -> DissolveSummary {
    let edges_collapsed = collapse_short_edges(mesh, tolerance);

    let area_threshold = tolerance * tolerance;
    let before = mesh.faces.len();
    let vertices = std::mem::take(&mut mesh.vertices);
    mesh.faces.retain(|&[i0, i1, i2]| {
        let tri = Triangle::new(
            vertices[i0 as usize].position,
            vertices[i1 as usize].position,
            vertices[i2 as usize].position,
        );
        tri.area() > area_threshold
    });
    mesh.vertices = vertices;
    let faces_removed = before - mesh.faces.len();

    if edges_collapsed > 0 || faces_removed > 0 {
        debug!(edges_collapsed, faces_removed, "dissolved degenerate geometry");
    }

    DissolveSummary {
        edges_collapsed,
        faces_removed,
    }
}

/// Collapse every edge of length ≤ `tolerance` by welding its endpoints.
#[allow(clippy::cast_possible_truncation)]
fn collapse_short_edges(mesh: &mut TriMesh, tolerance: f64) -> usize {
    let n = mesh.vertices.len();
    if n == 0 || mesh.faces.is_empty() {
        return 0;
    }

    let mut remap: Vec<u32> = (0..n as u32).collect();
    let mut collapsed = 0usize;

    for face in &mesh.faces {
        for k in 0..3 {
            let a = face[k];
            let b = face[(k + 1) % 3];
            let ra = find_root(&remap, a);
            let rb = find_root(&remap, b);
            if ra == rb {
                continue;
            }
            let len = (mesh.vertices[a as usize].position - mesh.vertices[b as usize].position)
                .norm();
            if len <= tolerance {
                let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
                remap[hi as usize] = lo;
                collapsed += 1;
            }
        }
    }

    if collapsed == 0 {
        return 0;
    }

    for i in 0..n {
        remap[i] = find_root(&remap, i as u32);
    }

    compact_remapped(mesh, &remap);
    mesh.faces
        .retain(|&[a, b, c]| a != b && b != c && a != c);

    collapsed
}

/// Remove vertices referenced by no face and compact the vertex array.
///
/// Pure garbage collection after the destructive passes; no repair
/// semantics of its own.
///
/// Returns the number of vertices removed.
#[allow(clippy::cast_possible_truncation)]
pub fn delete_loose(mesh: &mut TriMesh) -> usize {
    let original_count = mesh.vertices.len();

    let mut referenced = vec![false; original_count];
    for face in &mesh.faces {
        for &v in face {
            referenced[v as usize] = true;
        }
    }

    if referenced.iter().all(|&r| r) {
        return 0;
    }

    let mut remap = vec![u32::MAX; original_count];
    let mut kept: Vec<Vertex> = Vec::with_capacity(original_count);
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        if referenced[i] {
            remap[i] = kept.len() as u32;
            kept.push(vertex.clone());
        }
    }

    for face in &mut mesh.faces {
        for v in face {
            *v = remap[*v as usize];
        }
    }

    let removed = original_count - kept.len();
    mesh.vertices = kept;

    debug!(removed, "deleted loose vertices");
    removed
}

/// Follow a remap chain to its root.
fn find_root(remap: &[u32], mut x: u32) -> u32 {
    while remap[x as usize] != x {
        x = remap[x as usize];
    }
    x
}

/// Apply a fully resolved vertex remap: rewrite face indices and drop the
/// merged-away vertices, compacting the survivors.
#[allow(clippy::cast_possible_truncation)]
fn compact_remapped(mesh: &mut TriMesh, remap: &[u32]) {
    let n = mesh.vertices.len();
    let mut compact = vec![u32::MAX; n];
    let mut kept: Vec<Vertex> = Vec::with_capacity(n);
    for (i, vertex) in mesh.vertices.iter().enumerate() {
        if remap[i] == i as u32 {
            compact[i] = kept.len() as u32;
            kept.push(vertex.clone());
        }
    }

    for face in &mut mesh.faces {
        for v in face {
            *v = compact[remap[*v as usize] as usize];
        }
    }

    mesh.vertices = kept;
}

/// Grid cell for a position at the given cell size.
#[allow(clippy::cast_possible_truncation)]
fn grid_cell(pos: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}
