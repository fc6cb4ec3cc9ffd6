//! Toolpath generating operations.

use crate::{ScanAxis, Toolpath, ToolpathPoint};

mod face;
mod raster;

pub use face::Face;
pub use raster::{check_tool_resolution, plan_raster_toolpath};

/// Evenly spaced indices `0, step, 2*step, ..` below `count`, always ending at `count - 1`.
pub(crate) fn stepped_indices(count: usize, step: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let mut indices: Vec<usize> = (0..count).step_by(step.max(1)).collect();
    if indices.last() != Some(&(count - 1)) {
        indices.push(count - 1);
    }
    indices
}

/// Build a boustrophedon path: one pass per line index, reversing every other pass.
///
/// `point_at(along, across)` receives the index along the pass and the index of
/// the pass; `axis` decides which of them maps to X.
pub(crate) fn zigzag<F>(
    lines: &[usize],
    samples: &[usize],
    axis: ScanAxis,
    mut point_at: F,
) -> Toolpath
where
    F: FnMut(usize, usize) -> ToolpathPoint,
{
    let mut toolpath = Toolpath::new();
    for (n, &line) in lines.iter().enumerate() {
        let mut pass: Vec<ToolpathPoint> = samples
            .iter()
            .map(|&sample| match axis {
                ScanAxis::AlongX => point_at(sample, line),
                ScanAxis::AlongY => point_at(line, sample),
            })
            .collect();
        if n % 2 == 1 {
            pass.reverse();
        }
        toolpath.push_pass(pass);
    }
    toolpath
}
