//! Material removal: sweeping a tool profile along a toolpath.
//!
//! Every toolpath point lowers each cell under the tool to at most
//! `point.z + dz`, where `dz` is the profile elevation at that cell. The update
//! is a pointwise minimum, so the result does not depend on point order and
//! repeating a toolpath changes nothing.

use carve_kernel_cam::{cell_index, ToolProfile, ToolStencil, Toolpath};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{HeightmapGrid, Result, StockSimError};

/// Counters reported by a material removal run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Toolpath points processed.
    pub points: usize,
    /// Cell writes that lowered a height.
    pub cell_updates: usize,
    /// Points whose tool footprint lies entirely outside the grid.
    pub off_grid: usize,
}

/// Cut `toolpath` into `grid` with the given tool profile.
///
/// The toolpath is checked before any cell is touched; on error the grid is
/// unchanged.
pub fn simulate_material_removal(
    grid: &mut HeightmapGrid,
    profile: &ToolProfile,
    toolpath: &Toolpath,
) -> Result<SimulationStats> {
    validate_toolpath(toolpath)?;
    let stencil = ToolStencil::new(profile, grid.step_x(), grid.step_y())?;
    let (nx, ny) = (grid.nx(), grid.ny());
    let (half_x, _) = stencil.half_extent();

    let mut stats = SimulationStats::default();
    for p in toolpath.points() {
        stats.points += 1;
        let (cx, cy) = grid.nearest_index(p.x, p.y);
        if !footprint_reaches_grid(&stencil, cx, cy, nx, ny) {
            stats.off_grid += 1;
            continue;
        }
        let heights = grid.heights_mut();
        for dx in -(half_x as isize)..=half_x as isize {
            let ix = cx + dx;
            if ix < 0 || ix as usize >= nx {
                continue;
            }
            let Some(column) = stencil.column(dx) else {
                continue;
            };
            let start = cell_index(ix as usize, 0, ny);
            stats.cell_updates += cut_column(&mut heights[start..start + ny], column, cy, p.z);
        }
    }

    log_stats(&stats);
    Ok(stats)
}

/// Reject toolpaths with non-finite coordinates.
pub(crate) fn validate_toolpath(toolpath: &Toolpath) -> Result<()> {
    match toolpath.first_non_finite() {
        Some((pass, point)) => Err(StockSimError::InvalidToolpath {
            index: toolpath.passes[..pass].iter().map(Vec::len).sum::<usize>() + point,
            reason: format!("pass {pass}, point {point}: coordinates must be finite"),
        }),
        None => Ok(()),
    }
}

/// True when the stencil bounding box centered at `(cx, cy)` overlaps the grid.
pub(crate) fn footprint_reaches_grid(
    stencil: &ToolStencil,
    cx: isize,
    cy: isize,
    nx: usize,
    ny: usize,
) -> bool {
    let (hx, hy) = stencil.half_extent();
    let (hx, hy) = (hx as isize, hy as isize);
    cx.saturating_add(hx) >= 0
        && cx.saturating_sub(hx) < nx as isize
        && cy.saturating_add(hy) >= 0
        && cy.saturating_sub(hy) < ny as isize
}

/// Lower one grid row (fixed `ix`) under a stencil column centered at `cy`.
///
/// Returns the number of cells lowered.
pub(crate) fn cut_column(row: &mut [f64], column: &[Option<f64>], cy: isize, z: f64) -> usize {
    let half = (column.len() / 2) as isize;
    let last = row.len() as isize - 1;
    let mut updates = 0;
    for dy in (-half).max(-cy)..=half.min(last - cy) {
        if let Some(dz) = column[(dy + half) as usize] {
            let candidate = z + dz;
            let cell = &mut row[(cy + dy) as usize];
            if *cell > candidate {
                *cell = candidate;
                updates += 1;
            }
        }
    }
    updates
}

pub(crate) fn log_stats(stats: &SimulationStats) {
    if stats.off_grid > 0 {
        warn!(
            off_grid = stats.off_grid,
            points = stats.points,
            "toolpath points outside the stock grid were ignored"
        );
    }
    debug!(
        points = stats.points,
        cell_updates = stats.cell_updates,
        "simulated material removal"
    );
}
