//! Core mesh types for meshmend.
//!
//! This crate provides the foundational types for the repair pipeline:
//!
//! - [`Vertex`] - A point in 3D space
//! - [`TriMesh`] - A triangle mesh with indexed vertices
//! - [`Triangle`] - A concrete triangle with vertex positions
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Units
//!
//! This library is unit-agnostic. All coordinates are `f64`. The repair
//! crate's default tolerances assume model units in the millimeter range.
//!
//! # Coordinate System
//!
//! Right-handed coordinate system. Face winding is **counter-clockwise
//! (CCW) when viewed from outside**; normals point outward by the
//! right-hand rule.
//!
//! # Example
//!
//! ```
//! use meshmend_types::{TriMesh, Vertex, Point3};
//!
//! let mut mesh = TriMesh::new();
//! mesh.vertices.push(Vertex::new(Point3::new(0.0, 0.0, 0.0)));
//! mesh.vertices.push(Vertex::new(Point3::new(1.0, 0.0, 0.0)));
//! mesh.vertices.push(Vertex::new(Point3::new(0.5, 1.0, 0.0)));
//! mesh.faces.push([0, 1, 2]);
//!
//! assert_eq!(mesh.face_count(), 1);
//! assert!(!mesh.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod bounds;
mod mesh;
mod triangle;
mod vertex;

pub use bounds::Aabb;
pub use mesh::{unit_cube, TriMesh};
pub use triangle::Triangle;
pub use vertex::Vertex;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
