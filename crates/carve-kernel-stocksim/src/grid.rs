//! Regular height field over a rectangular region.

use carve_kernel_cam::{cell_index, HeightRaster};

use crate::{Result, StockSimError};

/// Largest number of sample points a grid may have.
pub const MAX_GRID_POINTS: usize = 25_000_000;

/// A `width × height` region sampled on `nx × ny` points.
///
/// Point `(ix, iy)` sits at `origin + (ix * step_x, iy * step_y)`; heights are
/// stored in `cell_index` layout. World coordinates map to the nearest point.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightmapGrid {
    width: f64,
    height: f64,
    nx: usize,
    ny: usize,
    origin_x: f64,
    origin_y: f64,
    step_x: f64,
    step_y: f64,
    heights: Vec<f64>,
}

impl HeightmapGrid {
    /// Create a grid with its first point at the world origin.
    pub fn new(width: f64, height: f64, nx: usize, ny: usize, initial_height: f64) -> Result<Self> {
        Self::with_origin(width, height, nx, ny, initial_height, 0.0, 0.0)
    }

    /// Create a grid with every point at `initial_height`.
    pub fn with_origin(
        width: f64,
        height: f64,
        nx: usize,
        ny: usize,
        initial_height: f64,
        origin_x: f64,
        origin_y: f64,
    ) -> Result<Self> {
        if !initial_height.is_finite() {
            return Err(StockSimError::InvalidGrid(format!(
                "initial height must be finite, got {initial_height}"
            )));
        }
        check_dimensions(width, height, nx, ny, origin_x, origin_y)?;
        Ok(Self::assemble(
            width,
            height,
            nx,
            ny,
            origin_x,
            origin_y,
            vec![initial_height; nx * ny],
        ))
    }

    /// Wrap an existing height buffer in `cell_index` layout.
    pub fn from_heights(
        width: f64,
        height: f64,
        nx: usize,
        ny: usize,
        origin_x: f64,
        origin_y: f64,
        heights: Vec<f64>,
    ) -> Result<Self> {
        check_dimensions(width, height, nx, ny, origin_x, origin_y)?;
        if heights.len() != nx * ny {
            return Err(StockSimError::InvalidHeights {
                expected: nx * ny,
                actual: heights.len(),
            });
        }
        Ok(Self::assemble(width, height, nx, ny, origin_x, origin_y, heights))
    }

    /// Grid whose points are the raster's cell centers, unset cells set to `fill`.
    pub fn from_raster(raster: &HeightRaster, fill: f64) -> Result<Self> {
        let spec = &raster.spec;
        if spec.res_x < 2 || spec.res_y < 2 {
            return Err(StockSimError::InvalidGrid(format!(
                "raster of {}x{} cells is too small for a grid",
                spec.res_x, spec.res_y
            )));
        }
        if !fill.is_finite() {
            return Err(StockSimError::InvalidGrid(format!(
                "fill height must be finite, got {fill}"
            )));
        }
        let (origin_x, origin_y) = spec.cell_center(0, 0);
        let (far_x, far_y) = spec.cell_center(spec.res_x - 1, spec.res_y - 1);
        let heights = raster
            .values
            .iter()
            .map(|&z| if z.is_finite() { z } else { fill })
            .collect();
        Self::from_heights(
            far_x - origin_x,
            far_y - origin_y,
            spec.res_x,
            spec.res_y,
            origin_x,
            origin_y,
            heights,
        )
    }

    fn assemble(
        width: f64,
        height: f64,
        nx: usize,
        ny: usize,
        origin_x: f64,
        origin_y: f64,
        heights: Vec<f64>,
    ) -> Self {
        Self {
            width,
            height,
            nx,
            ny,
            origin_x,
            origin_y,
            step_x: width / (nx - 1) as f64,
            step_y: height / (ny - 1) as f64,
            heights,
        }
    }

    /// Number of points along X.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of points along Y.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Extent along X.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Extent along Y.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// World position of point `(0, 0)`.
    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    /// Point spacing along X.
    pub fn step_x(&self) -> f64 {
        self.step_x
    }

    /// Point spacing along Y.
    pub fn step_y(&self) -> f64 {
        self.step_y
    }

    /// Heights in `cell_index` layout.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub(crate) fn heights_mut(&mut self) -> &mut [f64] {
        &mut self.heights
    }

    /// World position of point `(ix, iy)`.
    pub fn point(&self, ix: usize, iy: usize) -> (f64, f64) {
        (
            self.origin_x + ix as f64 * self.step_x,
            self.origin_y + iy as f64 * self.step_y,
        )
    }

    /// Nearest grid index to `(x, y)`, which may lie outside the grid.
    pub fn nearest_index(&self, x: f64, y: f64) -> (isize, isize) {
        (
            ((x - self.origin_x) / self.step_x).round() as isize,
            ((y - self.origin_y) / self.step_y).round() as isize,
        )
    }

    /// Nearest grid point to `(x, y)`, `None` outside the grid.
    pub fn index_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        let (ix, iy) = self.nearest_index(x, y);
        if ix < 0 || iy < 0 || ix as usize >= self.nx || iy as usize >= self.ny {
            return None;
        }
        Some((ix as usize, iy as usize))
    }

    /// Height at point `(ix, iy)`.
    pub fn get(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.nx || iy >= self.ny {
            return None;
        }
        Some(self.heights[cell_index(ix, iy, self.ny)])
    }

    /// Set the height at point `(ix, iy)`. Returns false when out of range.
    pub fn set(&mut self, ix: usize, iy: usize, z: f64) -> bool {
        if ix >= self.nx || iy >= self.ny {
            return false;
        }
        self.heights[cell_index(ix, iy, self.ny)] = z;
        true
    }

    /// Height at the grid point nearest `(x, y)`; `None` outside the grid.
    pub fn get_height(&self, x: f64, y: f64) -> Option<f64> {
        self.index_of(x, y).and_then(|(ix, iy)| self.get(ix, iy))
    }

    /// Set the height at the grid point nearest `(x, y)`.
    ///
    /// Returns false, leaving the grid unchanged, when `(x, y)` is outside it.
    pub fn set_height(&mut self, x: f64, y: f64, z: f64) -> bool {
        match self.index_of(x, y) {
            Some((ix, iy)) => self.set(ix, iy, z),
            None => false,
        }
    }

    /// Lowest height.
    pub fn min_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Highest height.
    pub fn max_height(&self) -> f64 {
        self.heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Volume removed relative to `before`, counting each point as one
    /// `step_x × step_y` cell.
    pub fn removed_volume(&self, before: &HeightmapGrid) -> Result<f64> {
        if before.nx != self.nx || before.ny != self.ny {
            return Err(StockSimError::InvalidGrid(format!(
                "cannot compare a {}x{} grid with a {}x{} grid",
                self.nx, self.ny, before.nx, before.ny
            )));
        }
        let depth: f64 = before
            .heights
            .iter()
            .zip(&self.heights)
            .map(|(b, a)| b - a)
            .sum();
        Ok(depth * self.step_x * self.step_y)
    }
}

fn check_dimensions(
    width: f64,
    height: f64,
    nx: usize,
    ny: usize,
    origin_x: f64,
    origin_y: f64,
) -> Result<()> {
    if nx < 2 || ny < 2 {
        return Err(StockSimError::InvalidGrid(format!(
            "grid needs at least 2x2 points, got {nx}x{ny}"
        )));
    }
    if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
        return Err(StockSimError::InvalidGrid(format!(
            "grid extent must be positive, got {width} x {height}"
        )));
    }
    if !(origin_x.is_finite() && origin_y.is_finite()) {
        return Err(StockSimError::InvalidGrid("grid origin must be finite".into()));
    }
    let points = nx.saturating_mul(ny);
    if points > MAX_GRID_POINTS {
        return Err(StockSimError::GridTooLarge {
            points,
            limit: MAX_GRID_POINTS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use carve_kernel_cam::GridSpec;

    #[test]
    fn test_construction_guards() {
        assert!(HeightmapGrid::new(10.0, 10.0, 1, 11, 0.0).is_err());
        assert!(HeightmapGrid::new(0.0, 10.0, 11, 11, 0.0).is_err());
        assert!(HeightmapGrid::new(10.0, -1.0, 11, 11, 0.0).is_err());
        assert!(HeightmapGrid::new(10.0, 10.0, 11, 11, f64::NAN).is_err());
        assert_eq!(
            HeightmapGrid::new(10.0, 10.0, 10_000, 10_000, 0.0),
            Err(StockSimError::GridTooLarge {
                points: 100_000_000,
                limit: MAX_GRID_POINTS
            })
        );
    }

    #[test]
    fn test_non_square_spacing() {
        let grid = HeightmapGrid::with_origin(10.0, 4.0, 11, 5, 2.0, -5.0, 1.0).unwrap();
        assert_relative_eq!(grid.step_x(), 1.0);
        assert_relative_eq!(grid.step_y(), 1.0);
        let grid = HeightmapGrid::new(10.0, 4.0, 6, 9, 2.0).unwrap();
        assert_relative_eq!(grid.step_x(), 2.0);
        assert_relative_eq!(grid.step_y(), 0.5);
        assert_eq!(grid.point(5, 8), (10.0, 4.0));
    }

    #[test]
    fn test_nearest_point_rounding() {
        let mut grid = HeightmapGrid::with_origin(10.0, 10.0, 11, 11, 5.0, 100.0, 200.0).unwrap();
        assert_eq!(grid.index_of(100.4, 200.6), Some((0, 1)));
        assert_eq!(grid.index_of(109.6, 209.5), Some((10, 10)));
        assert_eq!(grid.index_of(110.6, 205.0), None);
        assert_eq!(grid.index_of(99.4, 205.0), None);

        assert!(grid.set_height(103.2, 204.9, 1.25));
        assert_eq!(grid.get(3, 5), Some(1.25));
        assert_eq!(grid.get_height(103.0, 205.0), Some(1.25));
    }

    #[test]
    fn test_out_of_range_is_none_not_zero() {
        let mut grid = HeightmapGrid::new(10.0, 10.0, 11, 11, 5.0).unwrap();
        assert_eq!(grid.get_height(-3.0, 5.0), None);
        assert_eq!(grid.get_height(5.0, f64::NAN), None);
        assert!(!grid.set_height(50.0, 5.0, 0.0));
        assert_eq!(grid.min_height(), 5.0);
        assert_eq!(grid.get(11, 0), None);
    }

    #[test]
    fn test_from_heights_checks_length() {
        let err = HeightmapGrid::from_heights(1.0, 1.0, 2, 2, 0.0, 0.0, vec![0.0; 3]);
        assert_eq!(
            err,
            Err(StockSimError::InvalidHeights {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_from_raster_uses_cell_centers() {
        let spec = GridSpec::new(0.0, 4.0, 0.0, 2.0, 4, 2).unwrap();
        let mut raster = HeightRaster::new(spec).unwrap();
        raster.values[cell_index(2, 1, 2)] = 7.0;
        let grid = HeightmapGrid::from_raster(&raster, -1.0).unwrap();
        assert_eq!((grid.nx(), grid.ny()), (4, 2));
        assert_eq!(grid.origin(), (0.5, 0.5));
        assert_relative_eq!(grid.step_x(), 1.0);
        assert_eq!(grid.get_height(2.5, 1.5), Some(7.0));
        assert_eq!(grid.get_height(0.5, 0.5), Some(-1.0));

        let thin = HeightRaster::new(GridSpec::new(0.0, 1.0, 0.0, 1.0, 1, 4).unwrap()).unwrap();
        assert!(HeightmapGrid::from_raster(&thin, 0.0).is_err());
    }

    #[test]
    fn test_removed_volume() {
        let before = HeightmapGrid::new(4.0, 4.0, 5, 5, 3.0).unwrap();
        let mut after = before.clone();
        after.set(2, 2, 1.0);
        after.set(0, 0, 2.5);
        assert_relative_eq!(after.removed_volume(&before).unwrap(), 2.5);
        assert_eq!(after.max_height(), 3.0);
        assert_eq!(after.min_height(), 1.0);

        let other = HeightmapGrid::new(4.0, 4.0, 5, 6, 3.0).unwrap();
        assert!(after.removed_volume(&other).is_err());
    }
}
