#![warn(missing_docs)]

//! Heightmap stock simulation for carve.
//!
//! Stock is modelled as a regular height field: one surface Z per grid point.
//! Cutting a toolpath lowers heights under the tool profile, and the result can
//! be rebuilt into a closed, outward-facing solid mesh for display or export.
//!
//! # Example
//!
//! ```
//! use carve_kernel_cam::{Tool, Toolpath, ToolpathPoint};
//! use carve_kernel_stocksim::{build_solid_mesh, simulate_material_removal, HeightmapGrid};
//!
//! // 10 x 10 mm block, 11 x 11 samples, 5 mm tall
//! let mut stock = HeightmapGrid::new(10.0, 10.0, 11, 11, 5.0).unwrap();
//!
//! let profile = Tool::ball(4.0).profile().unwrap();
//! let toolpath = Toolpath::from(vec![vec![ToolpathPoint::new(5.0, 5.0, 3.0)]]);
//! simulate_material_removal(&mut stock, &profile, &toolpath).unwrap();
//! assert_eq!(stock.get_height(5.0, 5.0), Some(3.0));
//!
//! let mesh = build_solid_mesh(&stock, 0.0).unwrap();
//! assert!(mesh.is_closed_manifold());
//! ```

mod backend;
mod dropcutter;
mod grid;
mod mesh;
mod subtract;

pub use backend::{BackendKind, KernelBackend, ParallelBackend, ReferenceBackend};
pub use dropcutter::{lift_toolpath, safe_z_at};
pub use grid::{HeightmapGrid, MAX_GRID_POINTS};
pub use mesh::{
    build_solid_mesh, SolidMesh, SolidMeshBuilder, DEFAULT_MAX_TRIANGLES, DEFAULT_MAX_VERTICES,
};
pub use subtract::{simulate_material_removal, SimulationStats};

use carve_kernel_cam::CamError;
use thiserror::Error;

/// Errors from stock simulation operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StockSimError {
    /// Invalid grid dimensions or resolution.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Grid has more sample points than allowed.
    #[error("grid of {points} points exceeds the limit of {limit}")]
    GridTooLarge {
        /// Requested number of points.
        points: usize,
        /// Maximum number of points.
        limit: usize,
    },

    /// Solid mesh would exceed the vertex or triangle cap.
    #[error(
        "solid mesh needs {vertices} vertices and {triangles} triangles, limits are {max_vertices} and {max_triangles}"
    )]
    MeshTooLarge {
        /// Required vertex count.
        vertices: usize,
        /// Required triangle count.
        triangles: usize,
        /// Vertex cap.
        max_vertices: usize,
        /// Triangle cap.
        max_triangles: usize,
    },

    /// A toolpath point cannot be simulated.
    #[error("invalid toolpath point {index}: {reason}")]
    InvalidToolpath {
        /// Position of the point in machining order.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Height buffer does not match the grid dimensions.
    #[error("expected {expected} heights, got {actual}")]
    InvalidHeights {
        /// Number of grid points.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Backend name is not recognised.
    #[error("unknown backend '{0}', expected 'reference' or 'parallel'")]
    UnknownBackend(String),

    /// Tool, raster or planning error.
    #[error(transparent)]
    Cam(#[from] CamError),
}

/// Result type for stock simulation.
pub type Result<T> = std::result::Result<T, StockSimError>;
