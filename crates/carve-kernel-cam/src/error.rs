//! Error types for CAM operations.

use thiserror::Error;

/// Errors that can occur while defining tools or planning toolpaths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CamError {
    /// Tool dimensions are out of range.
    #[error("invalid tool: {0}")]
    InvalidTool(String),

    /// Tool kind string is not one of the supported shapes.
    #[error("unsupported tool type: {0}")]
    UnsupportedTool(String),

    /// Raster grid extent or resolution is unusable.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Operation settings are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Tool is too small to be sampled reliably at the raster resolution.
    #[error(
        "tool diameter {diameter:.4} mm is not larger than the minimum grid cell size with margin ({required:.4} mm); increase the tool size or the grid resolution"
    )]
    ToolTooSmall {
        /// Cutter diameter (mm).
        diameter: f64,
        /// Smallest diameter the raster can sample (mm).
        required: f64,
    },

    /// Triangle position/index buffers are malformed.
    #[error("invalid mesh buffer: {0}")]
    InvalidMeshBuffer(String),
}

/// Result type for CAM operations.
pub type Result<T> = std::result::Result<T, CamError>;
