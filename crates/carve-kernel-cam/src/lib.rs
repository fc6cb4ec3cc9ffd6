#![warn(missing_docs)]

//! 2.5D CAM kernel for carve.
//!
//! This crate holds the geometry that does not depend on simulated stock:
//! tool definitions and their radial cutting profiles, mesh rasterization into
//! a height raster, and the toolpath planners that sample such a raster.
//!
//! # Example
//!
//! ```
//! use carve_kernel_cam::{
//!     mesh_z_bounds, plan_raster_toolpath, rasterize_mesh, GridSpec, RasterSettings, Tool,
//!     Triangle,
//! };
//!
//! // A sloped quad made of two triangles.
//! let triangles = [
//!     Triangle::new([0.0, 0.0, 0.0], [20.0, 0.0, 2.0], [20.0, 20.0, 4.0]),
//!     Triangle::new([0.0, 0.0, 0.0], [20.0, 20.0, 4.0], [0.0, 20.0, 2.0]),
//! ];
//!
//! let spec = GridSpec::around_triangles(&triangles, 100, 100).unwrap();
//! let raster = rasterize_mesh(&triangles, &spec).unwrap();
//! let (min_z, _) = mesh_z_bounds(&triangles).unwrap();
//!
//! let tool = Tool::ball(3.0);
//! let toolpath =
//!     plan_raster_toolpath(&raster, &tool, &RasterSettings::default(), min_z).unwrap();
//! assert!(toolpath.pass_count() > 1);
//! ```

mod error;
mod operation;
mod raster;
mod tool;
mod toolpath;

// Re-exports
pub use error::{CamError, Result};
pub use operation::{check_tool_resolution, plan_raster_toolpath, Face};
pub use raster::{
    cell_index, mesh_z_bounds, rasterize_mesh, triangles_from_buffers, Coverage, GridSpec,
    HeightRaster, Triangle, MAX_RASTER_CELLS, UNSET_HEIGHT,
};
pub use tool::{Tool, ToolKind, ToolProfile, ToolShape, ToolStencil, RADIUS_TOLERANCE};
pub use toolpath::{Toolpath, ToolpathPoint};

use serde::{Deserialize, Serialize};

/// Direction of the scan lines of a raster toolpath.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanAxis {
    /// Lines run along X and step in Y.
    #[default]
    AlongX,
    /// Lines run along Y and step in X.
    AlongY,
}

/// Settings for raster toolpath generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Distance between scan lines as a fraction of the cutter diameter.
    pub step_over_fraction: f64,
    /// Height kept above the sampled surface (mm).
    pub clearance: f64,
    /// Upper bound on samples per scan line.
    pub points_per_line: usize,
    /// Scan line direction.
    pub axis: ScanAxis,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            step_over_fraction: 0.7,
            clearance: 0.001,
            points_per_line: 200,
            axis: ScanAxis::AlongX,
        }
    }
}

impl RasterSettings {
    /// Set the step-over fraction.
    pub fn with_step_over_fraction(mut self, fraction: f64) -> Self {
        self.step_over_fraction = fraction;
        self
    }

    /// Set the surface clearance.
    pub fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Set the maximum number of samples per line.
    pub fn with_points_per_line(mut self, points: usize) -> Self {
        self.points_per_line = points;
        self
    }

    /// Set the scan direction.
    pub fn with_axis(mut self, axis: ScanAxis) -> Self {
        self.axis = axis;
        self
    }

    /// Check that the settings describe a usable raster.
    pub fn validate(&self) -> Result<()> {
        let f = self.step_over_fraction;
        if !(f.is_finite() && f > 0.0 && f <= 1.0) {
            return Err(CamError::InvalidSettings(format!(
                "step_over_fraction must be in (0, 1], got {f}"
            )));
        }
        if !(self.clearance.is_finite() && self.clearance >= 0.0) {
            return Err(CamError::InvalidSettings(format!(
                "clearance must be a non-negative number, got {}",
                self.clearance
            )));
        }
        if self.points_per_line < 2 {
            return Err(CamError::InvalidSettings(format!(
                "points_per_line must be at least 2, got {}",
                self.points_per_line
            )));
        }
        Ok(())
    }
}
