//! Mesh rasterization onto a regular grid of cell centers.
//!
//! Every flattened buffer in the workspace uses the layout produced by
//! [`cell_index`]: `ix * ny + iy`, X-major. The rasterizer, the stock grid, the
//! tool stencil and both kernel backends go through this one helper.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CamError, Result};

/// Value of a raster cell no triangle projects onto.
pub const UNSET_HEIGHT: f64 = f64::NEG_INFINITY;

/// Largest number of cells a raster may have.
pub const MAX_RASTER_CELLS: usize = 25_000_000;

/// Barycentric slack so points on shared edges and vertices count as inside.
const BARYCENTRIC_EPS: f64 = -1e-9;

/// Relative area below which a triangle is treated as collapsed.
const DEGENERATE_AREA: f64 = 1e-12;

/// Flattened index of `(ix, iy)` in a buffer with `ny` entries per X column.
#[inline]
pub fn cell_index(ix: usize, iy: usize, ny: usize) -> usize {
    ix * ny + iy
}

/// A mesh triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex positions.
    pub v: [[f64; 3]; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Self {
        Self { v: [a, b, c] }
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.v.iter().flatten().all(|c| c.is_finite())
    }

    /// Twice the signed area of the XY projection.
    pub fn signed_area_xy(&self) -> f64 {
        let [a, b, c] = self.v;
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }

    /// True when the XY projection has (numerically) zero area.
    pub fn is_degenerate_xy(&self) -> bool {
        let [a, b, c] = self.v;
        let len2 = |p: [f64; 3], q: [f64; 3]| (q[0] - p[0]).powi(2) + (q[1] - p[1]).powi(2);
        let scale = len2(a, b).max(len2(b, c)).max(len2(c, a));
        scale == 0.0 || self.signed_area_xy().abs() <= DEGENERATE_AREA * scale
    }

    /// XY bounding box `[min_x, min_y, max_x, max_y]`.
    pub fn bbox_xy(&self) -> [f64; 4] {
        let [a, b, c] = self.v;
        [
            a[0].min(b[0]).min(c[0]),
            a[1].min(b[1]).min(c[1]),
            a[0].max(b[0]).max(c[0]),
            a[1].max(b[1]).max(c[1]),
        ]
    }

    /// Centroid of the vertices.
    pub fn centroid(&self) -> [f64; 3] {
        let [a, b, c] = self.v;
        [
            (a[0] + b[0] + c[0]) / 3.0,
            (a[1] + b[1] + c[1]) / 3.0,
            (a[2] + b[2] + c[2]) / 3.0,
        ]
    }

    /// Highest vertex Z.
    pub fn max_z(&self) -> f64 {
        self.v[0][2].max(self.v[1][2]).max(self.v[2][2])
    }

    /// Interpolated Z at `(x, y)` if the point projects into the triangle.
    ///
    /// Points on edges and vertices count as inside. Always `None` for a
    /// degenerate triangle.
    pub fn z_at_xy(&self, x: f64, y: f64) -> Option<f64> {
        let area = self.signed_area_xy();
        if self.is_degenerate_xy() {
            return None;
        }
        let [a, b, c] = self.v;
        let wa = ((b[0] - x) * (c[1] - y) - (c[0] - x) * (b[1] - y)) / area;
        let wb = ((c[0] - x) * (a[1] - y) - (a[0] - x) * (c[1] - y)) / area;
        let wc = 1.0 - wa - wb;
        if wa >= BARYCENTRIC_EPS && wb >= BARYCENTRIC_EPS && wc >= BARYCENTRIC_EPS {
            Some(wa * a[2] + wb * b[2] + wc * c[2])
        } else {
            None
        }
    }

    /// Raise cells of one raster row (fixed `ix`) where this triangle lies above them.
    ///
    /// Returns the number of cell centers that fell inside the triangle.
    pub fn sample_row(
        &self,
        spec: &GridSpec,
        ix: usize,
        iy_range: RangeInclusive<usize>,
        row: &mut [f64],
    ) -> usize {
        let x = spec.center_x(ix);
        let mut hits = 0;
        for iy in iy_range {
            if let Some(z) = self.z_at_xy(x, spec.center_y(iy)) {
                hits += 1;
                if z > row[iy] {
                    row[iy] = z;
                }
            }
        }
        hits
    }
}

/// How a triangle maps onto the cells of a [`GridSpec`].
#[derive(Debug, Clone, PartialEq)]
pub enum Coverage {
    /// No cell can be touched.
    Outside,
    /// A collapsed triangle, touching only the cell that holds its centroid.
    Point {
        /// Cell X index.
        ix: usize,
        /// Cell Y index.
        iy: usize,
        /// Height to raise the cell to.
        z: f64,
    },
    /// Candidate cells whose centers must be tested individually.
    Cells {
        /// Candidate X indices.
        ix: RangeInclusive<usize>,
        /// Candidate Y indices.
        iy: RangeInclusive<usize>,
    },
}

/// Extent and resolution of a raster: `res_x × res_y` cells over
/// `[min_x, max_x] × [min_y, max_y]`, sampled at cell centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Lower X bound.
    pub min_x: f64,
    /// Upper X bound.
    pub max_x: f64,
    /// Lower Y bound.
    pub min_y: f64,
    /// Upper Y bound.
    pub max_y: f64,
    /// Number of cells along X.
    pub res_x: usize,
    /// Number of cells along Y.
    pub res_y: usize,
}

impl GridSpec {
    /// Create and validate a spec.
    pub fn new(
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        res_x: usize,
        res_y: usize,
    ) -> Result<Self> {
        let spec = Self {
            min_x,
            max_x,
            min_y,
            max_y,
            res_x,
            res_y,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Spec covering the XY bounds of `triangles`.
    pub fn around_triangles(triangles: &[Triangle], res_x: usize, res_y: usize) -> Result<Self> {
        let mut bounds = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
        for tri in triangles.iter().filter(|t| t.is_finite()) {
            let b = tri.bbox_xy();
            bounds[0] = bounds[0].min(b[0]);
            bounds[1] = bounds[1].min(b[1]);
            bounds[2] = bounds[2].max(b[2]);
            bounds[3] = bounds[3].max(b[3]);
        }
        if !bounds.iter().all(|b| b.is_finite()) {
            return Err(CamError::InvalidGrid(
                "cannot fit a grid around an empty mesh".into(),
            ));
        }
        Self::new(bounds[0], bounds[2], bounds[1], bounds[3], res_x, res_y)
    }

    /// Check extents and resolution.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CamError::InvalidGrid("grid bounds must be finite".into()));
        }
        if self.max_x <= self.min_x || self.max_y <= self.min_y {
            return Err(CamError::InvalidGrid(format!(
                "grid bounds are empty: x [{}, {}], y [{}, {}]",
                self.min_x, self.max_x, self.min_y, self.max_y
            )));
        }
        if self.res_x == 0 || self.res_y == 0 {
            return Err(CamError::InvalidGrid(format!(
                "grid resolution must be at least 1x1, got {}x{}",
                self.res_x, self.res_y
            )));
        }
        let cells = self.res_x.saturating_mul(self.res_y);
        if cells > MAX_RASTER_CELLS {
            return Err(CamError::InvalidGrid(format!(
                "grid of {cells} cells exceeds the limit of {MAX_RASTER_CELLS}"
            )));
        }
        Ok(())
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.res_x * self.res_y
    }

    /// True if the spec has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell width along X.
    pub fn cell_w(&self) -> f64 {
        (self.max_x - self.min_x) / self.res_x as f64
    }

    /// Cell height along Y.
    pub fn cell_h(&self) -> f64 {
        (self.max_y - self.min_y) / self.res_y as f64
    }

    /// X coordinate of the center of column `ix`.
    pub fn center_x(&self, ix: usize) -> f64 {
        self.min_x + (ix as f64 + 0.5) * self.cell_w()
    }

    /// Y coordinate of the center of row `iy`.
    pub fn center_y(&self, iy: usize) -> f64 {
        self.min_y + (iy as f64 + 0.5) * self.cell_h()
    }

    /// Center of cell `(ix, iy)`.
    pub fn cell_center(&self, ix: usize, iy: usize) -> (f64, f64) {
        (self.center_x(ix), self.center_y(iy))
    }

    /// Cell containing the point `(x, y)`, if inside the bounds.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !(x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y) {
            return None;
        }
        let ix = ((x - self.min_x) / self.cell_w()).floor() as usize;
        let iy = ((y - self.min_y) / self.cell_h()).floor() as usize;
        Some((ix.min(self.res_x - 1), iy.min(self.res_y - 1)))
    }

    /// Classify which cells `tri` may touch.
    pub fn coverage(&self, tri: &Triangle) -> Coverage {
        if !tri.is_finite() {
            return Coverage::Outside;
        }
        if tri.is_degenerate_xy() {
            let [cx, cy, _] = tri.centroid();
            return match self.cell_of(cx, cy) {
                Some((ix, iy)) => Coverage::Point {
                    ix,
                    iy,
                    z: tri.max_z(),
                },
                None => Coverage::Outside,
            };
        }

        let [bx0, by0, bx1, by1] = tri.bbox_xy();
        match (
            center_range(bx0, bx1, self.min_x, self.cell_w(), self.res_x),
            center_range(by0, by1, self.min_y, self.cell_h(), self.res_y),
        ) {
            (Some(ix), Some(iy)) => Coverage::Cells { ix, iy },
            _ => Coverage::Outside,
        }
    }
}

/// Indices whose cell centers may fall in `[lo, hi]`, clamped to `0..res`.
fn center_range(
    lo: f64,
    hi: f64,
    min: f64,
    cell: f64,
    res: usize,
) -> Option<RangeInclusive<usize>> {
    let first = ((lo - min) / cell - 0.5).floor();
    let last = ((hi - min) / cell - 0.5).ceil();
    let top = (res - 1) as f64;
    if last < 0.0 || first > top {
        return None;
    }
    Some(first.max(0.0) as usize..=last.min(top) as usize)
}

/// Output of [`rasterize_mesh`]: one top-surface height per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightRaster {
    /// Extent and resolution.
    pub spec: GridSpec,
    /// Heights in `cell_index` layout; [`UNSET_HEIGHT`] where no triangle projects.
    #[serde(with = "unset_as_null")]
    pub values: Vec<f64>,
}

impl HeightRaster {
    /// A raster with every cell unset.
    pub fn new(spec: GridSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            values: vec![UNSET_HEIGHT; spec.len()],
        })
    }

    /// Wrap existing values, checking their count.
    pub fn from_values(spec: GridSpec, values: Vec<f64>) -> Result<Self> {
        spec.validate()?;
        if values.len() != spec.len() {
            return Err(CamError::InvalidGrid(format!(
                "expected {} raster values, got {}",
                spec.len(),
                values.len()
            )));
        }
        Ok(Self { spec, values })
    }

    /// Raw cell value, `None` when out of range.
    pub fn get(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.spec.res_x || iy >= self.spec.res_y {
            return None;
        }
        Some(self.values[cell_index(ix, iy, self.spec.res_y)])
    }

    /// Cell height, `None` when out of range or unset.
    pub fn height(&self, ix: usize, iy: usize) -> Option<f64> {
        self.get(ix, iy).filter(|z| z.is_finite())
    }

    /// True when some triangle projected onto the cell.
    pub fn is_set(&self, ix: usize, iy: usize) -> bool {
        self.height(ix, iy).is_some()
    }

    /// Center of cell `(ix, iy)`.
    pub fn cell_center(&self, ix: usize, iy: usize) -> (f64, f64) {
        self.spec.cell_center(ix, iy)
    }

    /// Number of set cells.
    pub fn set_count(&self) -> usize {
        self.values.iter().filter(|z| z.is_finite()).count()
    }

    /// Lowest and highest set value.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|z| z.is_finite())
            .fold(None, |acc, &z| match acc {
                None => Some((z, z)),
                Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
            })
    }
}

mod unset_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::UNSET_HEIGHT;

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|z| z.is_finite().then_some(*z))
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .map(|z| z.unwrap_or(UNSET_HEIGHT))
            .collect())
    }
}

/// Rasterize `triangles` onto `spec`, keeping the uppermost surface per cell.
pub fn rasterize_mesh(triangles: &[Triangle], spec: &GridSpec) -> Result<HeightRaster> {
    let mut raster = HeightRaster::new(*spec)?;
    let ny = spec.res_y;
    let mut hits = 0usize;
    let mut degenerate = 0usize;

    for tri in triangles {
        match spec.coverage(tri) {
            Coverage::Outside => {}
            Coverage::Point { ix, iy, z } => {
                degenerate += 1;
                let cell = &mut raster.values[cell_index(ix, iy, ny)];
                if z > *cell {
                    *cell = z;
                }
            }
            Coverage::Cells { ix, iy } => {
                for col in ix {
                    let start = cell_index(col, 0, ny);
                    let row = &mut raster.values[start..start + ny];
                    hits += tri.sample_row(spec, col, iy.clone(), row);
                }
            }
        }
    }

    debug!(
        triangles = triangles.len(),
        hits,
        degenerate,
        set = raster.set_count(),
        "rasterized mesh"
    );
    Ok(raster)
}

/// Build triangles from a flat position buffer, optionally indexed.
///
/// Without indices every nine floats form one triangle.
pub fn triangles_from_buffers(positions: &[f64], indices: Option<&[u32]>) -> Result<Vec<Triangle>> {
    if positions.len() % 3 != 0 {
        return Err(CamError::InvalidMeshBuffer(format!(
            "position buffer length {} is not a multiple of 3",
            positions.len()
        )));
    }
    if let Some(i) = positions.iter().position(|c| !c.is_finite()) {
        return Err(CamError::InvalidMeshBuffer(format!(
            "non-finite coordinate at position {i}"
        )));
    }
    let vertex_count = positions.len() / 3;
    let vertex = |i: usize| [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]];

    match indices {
        Some(indices) => {
            if indices.len() % 3 != 0 {
                return Err(CamError::InvalidMeshBuffer(format!(
                    "index buffer length {} is not a multiple of 3",
                    indices.len()
                )));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(CamError::InvalidMeshBuffer(format!(
                    "index {bad} out of range for {vertex_count} vertices"
                )));
            }
            Ok(indices
                .chunks_exact(3)
                .map(|t| {
                    Triangle::new(
                        vertex(t[0] as usize),
                        vertex(t[1] as usize),
                        vertex(t[2] as usize),
                    )
                })
                .collect())
        }
        None => {
            if vertex_count % 3 != 0 {
                return Err(CamError::InvalidMeshBuffer(format!(
                    "{vertex_count} vertices do not form whole triangles"
                )));
            }
            Ok((0..vertex_count / 3)
                .map(|t| Triangle::new(vertex(t * 3), vertex(t * 3 + 1), vertex(t * 3 + 2)))
                .collect())
        }
    }
}

/// Lowest and highest vertex Z over all triangles.
pub fn mesh_z_bounds(triangles: &[Triangle]) -> Option<(f64, f64)> {
    triangles
        .iter()
        .flat_map(|t| t.v.iter().map(|v| v[2]))
        .filter(|z| z.is_finite())
        .fold(None, |acc, z| match acc {
            None => Some((z, z)),
            Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_spec(res: usize) -> GridSpec {
        GridSpec::new(0.0, 1.0, 0.0, 1.0, res, res).unwrap()
    }

    #[test]
    fn test_cell_index_layout() {
        assert_eq!(cell_index(0, 0, 7), 0);
        assert_eq!(cell_index(0, 6, 7), 6);
        assert_eq!(cell_index(1, 0, 7), 7);
        assert_eq!(cell_index(3, 2, 7), 23);
    }

    #[test]
    fn test_spec_validation() {
        assert!(GridSpec::new(0.0, 0.0, 0.0, 1.0, 2, 2).is_err());
        assert!(GridSpec::new(0.0, 1.0, 0.0, 1.0, 0, 2).is_err());
        assert!(GridSpec::new(0.0, f64::NAN, 0.0, 1.0, 2, 2).is_err());
        assert!(GridSpec::new(0.0, 1.0, 0.0, 1.0, 10_000, 10_000).is_err());
    }

    #[test]
    fn test_cell_centers() {
        let spec = GridSpec::new(0.0, 4.0, 10.0, 12.0, 4, 2).unwrap();
        assert_relative_eq!(spec.cell_w(), 1.0);
        assert_eq!(spec.cell_center(0, 0), (0.5, 10.5));
        assert_eq!(spec.cell_center(3, 1), (3.5, 11.5));
        assert_eq!(spec.cell_of(4.0, 12.0), Some((3, 1)));
        assert_eq!(spec.cell_of(-0.1, 11.0), None);
    }

    #[test]
    fn test_sloped_triangle() {
        let tri = Triangle::new([0.0, 0.0, 1.0], [1.0, 0.0, 2.0], [0.0, 1.0, 3.0]);
        let raster = rasterize_mesh(&[tri], &unit_spec(2)).unwrap();
        assert!(raster.set_count() >= 1);
        for z in raster.values.iter().filter(|z| z.is_finite()) {
            assert!((1.0..=3.0).contains(z));
        }
        // Center (0.25, 0.25) interpolates to 1 + 0.25 + 0.5.
        assert_relative_eq!(raster.height(0, 0).unwrap(), 1.75, epsilon = 1e-12);
        // Center (0.75, 0.75) is outside the hypotenuse.
        assert!(!raster.is_set(1, 1));
    }

    #[test]
    fn test_edge_points_count_as_inside() {
        // (0.25, 0.75) lies exactly on the hypotenuse x + y = 1.
        let tri = Triangle::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let raster = rasterize_mesh(&[tri], &unit_spec(2)).unwrap();
        assert!(raster.is_set(0, 1));
        assert!(raster.is_set(1, 0));
    }

    #[test]
    fn test_shared_edge_leaves_no_gap() {
        let a = Triangle::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = Triangle::new([0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        let raster = rasterize_mesh(&[a, b], &unit_spec(8)).unwrap();
        assert_eq!(raster.set_count(), 64);
    }

    #[test]
    fn test_uppermost_surface_wins() {
        let low = Triangle::new([-1.0, -1.0, 1.0], [3.0, -1.0, 1.0], [-1.0, 3.0, 1.0]);
        let high = Triangle::new([-1.0, -1.0, 2.0], [3.0, -1.0, 2.0], [-1.0, 3.0, 2.0]);
        let raster = rasterize_mesh(&[high, low], &unit_spec(4)).unwrap();
        assert!(raster.values.iter().all(|&z| z == 2.0));
    }

    #[test]
    fn test_degenerate_triangle_touches_one_cell() {
        let tri = Triangle::new([0.2, 0.2, 1.0], [0.4, 0.4, 5.0], [0.6, 0.6, 2.0]);
        assert!(tri.is_degenerate_xy());
        let raster = rasterize_mesh(&[tri], &unit_spec(4)).unwrap();
        assert_eq!(raster.set_count(), 1);
        assert_eq!(raster.height(1, 1), Some(5.0));

        let outside = Triangle::new([5.0, 5.0, 1.0], [5.0, 5.0, 2.0], [5.0, 5.0, 3.0]);
        let raster = rasterize_mesh(&[outside], &unit_spec(4)).unwrap();
        assert_eq!(raster.set_count(), 0);
    }

    #[test]
    fn test_outside_triangle_touches_nothing() {
        let tri = Triangle::new([2.0, 2.0, 1.0], [3.0, 2.0, 1.0], [2.0, 3.0, 1.0]);
        assert_eq!(unit_spec(4).coverage(&tri), Coverage::Outside);
        let raster = rasterize_mesh(&[tri], &unit_spec(4)).unwrap();
        assert!(raster.values.iter().all(|&z| z == UNSET_HEIGHT));
    }

    #[test]
    fn test_triangles_from_buffers() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let tris = triangles_from_buffers(&positions, Some(&[0, 1, 2, 0, 2, 3])).unwrap();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1].v[2], [0.0, 1.0, 0.0]);

        assert!(matches!(
            triangles_from_buffers(&positions, Some(&[0, 1, 4])),
            Err(CamError::InvalidMeshBuffer(_))
        ));
        assert!(triangles_from_buffers(&positions[..11], None).is_err());
        assert!(triangles_from_buffers(&positions, None).is_err());
        assert_eq!(triangles_from_buffers(&positions[..9], None).unwrap().len(), 1);
    }

    #[test]
    fn test_mesh_bounds_and_fitted_spec() {
        let tris = [
            Triangle::new([0.0, 0.0, -2.0], [4.0, 0.0, 1.0], [0.0, 2.0, 0.5]),
            Triangle::new([1.0, 1.0, 3.0], [5.0, 1.0, 0.0], [1.0, 6.0, 0.0]),
        ];
        assert_eq!(mesh_z_bounds(&tris), Some((-2.0, 3.0)));
        assert_eq!(mesh_z_bounds(&[]), None);
        let spec = GridSpec::around_triangles(&tris, 10, 12).unwrap();
        assert_eq!((spec.min_x, spec.max_x, spec.min_y, spec.max_y), (0.0, 5.0, 0.0, 6.0));
        assert!(GridSpec::around_triangles(&[], 10, 10).is_err());
    }

    #[test]
    fn test_raster_json_uses_null_for_unset() {
        let mut raster = HeightRaster::new(unit_spec(1)).unwrap();
        let json = serde_json::to_string(&raster).unwrap();
        assert!(json.contains("\"values\":[null]"));
        raster.values[0] = 1.5;
        let parsed: HeightRaster =
            serde_json::from_str(&serde_json::to_string(&raster).unwrap()).unwrap();
        assert_eq!(parsed, raster);
    }
}
