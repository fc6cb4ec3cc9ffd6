//! Drop-cutter lift: raise toolpath points until the tool rests on the surface.

use carve_kernel_cam::{ToolProfile, ToolStencil, Toolpath, ToolpathPoint};
use tracing::debug;

use crate::subtract::validate_toolpath;
use crate::{HeightmapGrid, Result};

/// Lowest tip Z at `(x, y)` at which the tool touches but does not cut `grid`.
///
/// `None` when the tool footprint covers no grid point.
pub fn safe_z_at(grid: &HeightmapGrid, profile: &ToolProfile, x: f64, y: f64) -> Result<Option<f64>> {
    let stencil = ToolStencil::new(profile, grid.step_x(), grid.step_y())?;
    Ok(contact_z(grid, &stencil, x, y))
}

/// Move every point of `toolpath` to the drop-cutter contact height over `grid`.
///
/// Points whose footprint misses the grid keep their Z. Cutting the lifted
/// toolpath into `grid` leaves it unchanged.
pub fn lift_toolpath(grid: &HeightmapGrid, profile: &ToolProfile, toolpath: &Toolpath) -> Result<Toolpath> {
    validate_toolpath(toolpath)?;
    let stencil = ToolStencil::new(profile, grid.step_x(), grid.step_y())?;

    let mut lifted = 0usize;
    let passes = toolpath
        .passes
        .iter()
        .map(|pass| {
            pass.iter()
                .map(|p| match contact_z(grid, &stencil, p.x, p.y) {
                    Some(z) => {
                        if z > p.z {
                            lifted += 1;
                        }
                        ToolpathPoint::new(p.x, p.y, z)
                    }
                    None => *p,
                })
                .collect()
        })
        .collect::<Vec<_>>();

    debug!(points = toolpath.point_count(), lifted, "lifted toolpath");
    Ok(Toolpath::from(passes))
}

fn contact_z(grid: &HeightmapGrid, stencil: &ToolStencil, x: f64, y: f64) -> Option<f64> {
    let (cx, cy) = grid.nearest_index(x, y);
    let (nx, ny) = (grid.nx() as isize, grid.ny() as isize);
    let (hx, hy) = stencil.half_extent();
    let (hx, hy) = (hx as isize, hy as isize);

    let mut best: Option<f64> = None;
    for ix in cx.saturating_sub(hx).max(0)..=cx.saturating_add(hx).min(nx - 1) {
        for iy in cy.saturating_sub(hy).max(0)..=cy.saturating_add(hy).min(ny - 1) {
            let Some(dz) = stencil.get(ix - cx, iy - cy) else {
                continue;
            };
            let Some(h) = grid.get(ix as usize, iy as usize) else {
                continue;
            };
            let z = h - dz;
            best = Some(best.map_or(z, |b| b.max(z)));
        }
    }
    best
}
