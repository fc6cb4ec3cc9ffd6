//! Toolpath representation shared by planners and the simulator.

use serde::{Deserialize, Serialize};

/// A point on a toolpath: the position of the tool tip in world mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolpathPoint {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate of the tool tip.
    pub z: f64,
}

impl ToolpathPoint {
    /// Create a new point.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when all three coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for ToolpathPoint {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// An ordered list of polylines (passes), each an ordered list of points.
///
/// Serializes as a bare array of arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Toolpath {
    /// Cutting passes in machining order.
    pub passes: Vec<Vec<ToolpathPoint>>,
}

impl Toolpath {
    /// Create an empty toolpath.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass. Empty passes are dropped.
    pub fn push_pass(&mut self, pass: Vec<ToolpathPoint>) {
        if !pass.is_empty() {
            self.passes.push(pass);
        }
    }

    /// Number of passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Total number of points over all passes.
    pub fn point_count(&self) -> usize {
        self.passes.iter().map(Vec::len).sum()
    }

    /// True if there are no points.
    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// All points in machining order.
    pub fn points(&self) -> impl Iterator<Item = &ToolpathPoint> {
        self.passes.iter().flatten()
    }

    /// First point that has a non-finite coordinate, as `(pass, point)`.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.passes.iter().enumerate().find_map(|(pi, pass)| {
            pass.iter()
                .position(|p| !p.is_finite())
                .map(|i| (pi, i))
        })
    }

    /// Lowest Z over all points.
    pub fn min_z(&self) -> Option<f64> {
        self.points().map(|p| p.z).reduce(f64::min)
    }
}

impl From<Vec<Vec<ToolpathPoint>>> for Toolpath {
    fn from(passes: Vec<Vec<ToolpathPoint>>) -> Self {
        Self { passes }
    }
}
