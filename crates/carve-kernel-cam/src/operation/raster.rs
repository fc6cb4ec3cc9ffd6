//! Raster finishing toolpath following a rasterized surface.
//!
//! Scan lines are spaced by the tool step-over and sample the raster at cell
//! centers; each point sits a small clearance above the surface.

use tracing::debug;

use super::{stepped_indices, zigzag};
use crate::{
    CamError, GridSpec, HeightRaster, RasterSettings, Result, ScanAxis, Tool, Toolpath,
    ToolpathPoint,
};

/// Minimum ratio between tool diameter and the larger raster cell dimension.
const RESOLUTION_MARGIN: f64 = 1.2;

/// Check that `tool` is wide enough to be simulated faithfully on `spec`.
///
/// A tool no wider than about one cell falls between samples and produces
/// geometry that looks plausible but is wrong.
pub fn check_tool_resolution(tool: &Tool, spec: &GridSpec) -> Result<()> {
    let required = RESOLUTION_MARGIN * spec.cell_w().max(spec.cell_h());
    if tool.cutter_diameter > required {
        Ok(())
    } else {
        Err(CamError::ToolTooSmall {
            diameter: tool.cutter_diameter,
            required,
        })
    }
}

/// Plan a boustrophedon raster over `raster`.
///
/// Cells with no surface use `fallback_z`, typically the lowest Z of the
/// source mesh.
pub fn plan_raster_toolpath(
    raster: &HeightRaster,
    tool: &Tool,
    settings: &RasterSettings,
    fallback_z: f64,
) -> Result<Toolpath> {
    tool.validate()?;
    settings.validate()?;
    raster.spec.validate()?;
    if !fallback_z.is_finite() {
        return Err(CamError::InvalidSettings(format!(
            "fallback_z must be finite, got {fallback_z}"
        )));
    }
    check_tool_resolution(tool, &raster.spec)?;

    let spec = &raster.spec;
    let step_over = tool.cutter_diameter * settings.step_over_fraction;
    let (line_count, line_cell, sample_count) = match settings.axis {
        ScanAxis::AlongX => (spec.res_y, spec.cell_h(), spec.res_x),
        ScanAxis::AlongY => (spec.res_x, spec.cell_w(), spec.res_y),
    };
    let line_step = ((step_over / line_cell).round() as usize).max(1);
    let sample_step = (sample_count / settings.points_per_line).max(1);

    let lines = stepped_indices(line_count, line_step);
    let samples = stepped_indices(sample_count, sample_step);

    let toolpath = zigzag(&lines, &samples, settings.axis, |ix, iy| {
        let (x, y) = spec.cell_center(ix, iy);
        let z = raster
            .height(ix, iy)
            .map_or(fallback_z, |h| h + settings.clearance);
        ToolpathPoint::new(x, y, z)
    });

    debug!(
        passes = toolpath.pass_count(),
        points = toolpath.point_count(),
        line_step,
        sample_step,
        "planned raster toolpath"
    );
    Ok(toolpath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rasterize_mesh, Triangle};
    use approx::assert_relative_eq;

    fn plateau(res: usize) -> HeightRaster {
        let spec = GridSpec::new(0.0, 10.0, 0.0, 10.0, res, res).unwrap();
        let tri_a = Triangle::new([0.0, 0.0, 4.0], [10.0, 0.0, 4.0], [10.0, 10.0, 4.0]);
        let tri_b = Triangle::new([0.0, 0.0, 4.0], [10.0, 10.0, 4.0], [0.0, 10.0, 4.0]);
        rasterize_mesh(&[tri_a, tri_b], &spec).unwrap()
    }

    #[test]
    fn test_resolution_check() {
        let spec = GridSpec::new(0.0, 10.0, 0.0, 10.0, 10, 5).unwrap();
        // Cells are 1 x 2 mm, so the tool must exceed 2.4 mm.
        assert!(matches!(
            check_tool_resolution(&Tool::flat(2.4), &spec),
            Err(CamError::ToolTooSmall { .. })
        ));
        assert!(check_tool_resolution(&Tool::flat(2.5), &spec).is_ok());
    }

    #[test]
    fn test_plan_over_plateau() {
        let raster = plateau(10);
        let settings = RasterSettings::default().with_points_per_line(10);
        let path = plan_raster_toolpath(&raster, &Tool::flat(3.0), &settings, 0.0).unwrap();

        // Step-over 2.1 mm rounds to 2 rows: 0, 2, 4, 6, 8 plus the last row.
        assert_eq!(path.pass_count(), 6);
        assert!(path.passes.iter().all(|pass| pass.len() == 10));
        for p in path.points() {
            assert_relative_eq!(p.z, 4.0 + settings.clearance, epsilon = 1e-12);
        }
        assert_relative_eq!(path.passes[0][0].x, 0.5);
        assert_relative_eq!(path.passes[0][0].y, 0.5);
        assert_relative_eq!(path.passes[1][0].x, 9.5);
        assert_relative_eq!(path.passes[5][0].y, 9.5);
    }

    #[test]
    fn test_unset_cells_use_fallback() {
        let spec = GridSpec::new(0.0, 10.0, 0.0, 10.0, 10, 10).unwrap();
        let raster = HeightRaster::new(spec).unwrap();
        let path =
            plan_raster_toolpath(&raster, &Tool::ball(3.0), &RasterSettings::default(), -7.0)
                .unwrap();
        assert!(path.points().all(|p| p.z == -7.0));
    }

    #[test]
    fn test_along_y_swaps_axes() {
        let raster = plateau(10);
        let settings = RasterSettings::default().with_axis(ScanAxis::AlongY);
        let path = plan_raster_toolpath(&raster, &Tool::flat(3.0), &settings, 0.0).unwrap();
        for pass in &path.passes {
            assert!(pass.iter().all(|p| p.x == pass[0].x));
        }
        assert_relative_eq!(path.passes[1][0].y, 9.5);
    }

    #[test]
    fn test_dense_grid_limits_points_per_line() {
        let raster = plateau(100);
        let settings = RasterSettings::default().with_points_per_line(20);
        let path = plan_raster_toolpath(&raster, &Tool::flat(1.0), &settings, 0.0).unwrap();
        // 100 / 20 = every 5th cell, plus the last one.
        assert_eq!(path.passes[0].len(), 21);
    }

    #[test]
    fn test_rejects_small_tool_and_bad_fallback() {
        let raster = plateau(10);
        let settings = RasterSettings::default();
        assert!(matches!(
            plan_raster_toolpath(&raster, &Tool::flat(1.0), &settings, 0.0),
            Err(CamError::ToolTooSmall { .. })
        ));
        assert!(plan_raster_toolpath(&raster, &Tool::flat(3.0), &settings, f64::NAN).is_err());
        assert!(plan_raster_toolpath(&raster, &Tool::flat(-3.0), &settings, 0.0).is_err());
    }
}
