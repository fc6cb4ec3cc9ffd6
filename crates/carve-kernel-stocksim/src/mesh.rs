//! Solid mesh reconstruction from a height grid.
//!
//! The solid is the grid surface extruded down to a flat base. Vertex buffer
//! layout, in order:
//!
//! 1. `nx * ny` top vertices in `cell_index` order
//! 2. `nx * ny` bottom vertices in `cell_index` order
//! 3. four side walls (left `ix = 0`, right `ix = nx - 1`, front `iy = 0`,
//!    back `iy = ny - 1`), each with its own copy of its top and bottom
//!    boundary vertices
//!
//! Walls never share vertices with the top, the bottom or each other, so
//! normals stay sharp along every outer edge.

use std::collections::HashMap;

use carve_kernel_cam::cell_index;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{HeightmapGrid, Result, StockSimError};

/// Default vertex cap for [`SolidMeshBuilder`].
pub const DEFAULT_MAX_VERTICES: usize = 40_000_000;

/// Default triangle cap for [`SolidMeshBuilder`].
pub const DEFAULT_MAX_TRIANGLES: usize = 80_000_000;

/// Closed triangle mesh of the stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolidMesh {
    /// Flat vertex positions `[x0, y0, z0, x1, ...]`.
    pub positions: Vec<f32>,
    /// Flat vertex normals, same length as `positions`.
    pub normals: Vec<f32>,
    /// Triangle indices, counter-clockwise seen from outside.
    pub indices: Vec<u32>,
    /// For each vertex, the top or bottom vertex it duplicates (itself if none).
    pub weld_map: Vec<u32>,
}

impl SolidMesh {
    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    fn welded_triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.weld_map[t[0] as usize],
                self.weld_map[t[1] as usize],
                self.weld_map[t[2] as usize],
            ]
        })
    }

    /// True when every undirected edge, after welding duplicates, borders exactly two triangles.
    pub fn is_closed_manifold(&self) -> bool {
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for tri in self.welded_triangles() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                *edges.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        !edges.is_empty() && edges.values().all(|&n| n == 2)
    }

    /// True when every welded directed edge is matched by exactly one opposite edge.
    pub fn is_consistently_oriented(&self) -> bool {
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for tri in self.welded_triangles() {
            for k in 0..3 {
                *edges.entry((tri[k], tri[(k + 1) % 3])).or_default() += 1;
            }
        }
        edges
            .iter()
            .all(|(&(a, b), &n)| n == 1 && edges.get(&(b, a)) == Some(&1))
    }

    /// Normal of vertex `v`.
    pub fn normal(&self, v: usize) -> [f32; 3] {
        [self.normals[v * 3], self.normals[v * 3 + 1], self.normals[v * 3 + 2]]
    }
}

/// Builds a [`SolidMesh`] from a [`HeightmapGrid`] with output size caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidMeshBuilder {
    max_vertices: usize,
    max_triangles: usize,
    parallel: bool,
}

impl Default for SolidMeshBuilder {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_MAX_VERTICES,
            max_triangles: DEFAULT_MAX_TRIANGLES,
            parallel: false,
        }
    }
}

/// Wall description: boundary points in order and the triangle winding.
struct Wall {
    points: Vec<(usize, usize)>,
    /// Outward normal used when every wall triangle is degenerate.
    outward: [f64; 3],
    /// `true` for the `(ta, tb, ba), (ba, tb, bb)` winding.
    top_first: bool,
}

impl SolidMeshBuilder {
    /// Builder with the default caps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vertex and triangle caps.
    pub fn with_limits(mut self, max_vertices: usize, max_triangles: usize) -> Self {
        self.max_vertices = max_vertices;
        self.max_triangles = max_triangles;
        self
    }

    /// Fill buffers on the rayon pool. The output is identical either way.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Vertex and triangle counts for an `nx × ny` grid.
    pub fn counts(nx: usize, ny: usize) -> (usize, usize) {
        let points = nx * ny;
        let vertices = 2 * points + 4 * nx + 4 * ny;
        let triangles = 4 * (nx - 1) * (ny - 1) + 4 * (nx - 1) + 4 * (ny - 1);
        (vertices, triangles)
    }

    /// Extrude `grid` down to `min_z`.
    ///
    /// Non-finite heights and heights below `min_z` are placed at `min_z`.
    pub fn build(&self, grid: &HeightmapGrid, min_z: f64) -> Result<SolidMesh> {
        if !min_z.is_finite() {
            return Err(StockSimError::InvalidGrid(format!(
                "base height must be finite, got {min_z}"
            )));
        }
        let (nx, ny) = (grid.nx(), grid.ny());
        let (vertices, triangles) = Self::counts(nx, ny);
        let max_vertices = self.max_vertices.min(u32::MAX as usize);
        if vertices > max_vertices || triangles > self.max_triangles {
            return Err(StockSimError::MeshTooLarge {
                vertices,
                triangles,
                max_vertices,
                max_triangles: self.max_triangles,
            });
        }

        let top_z = |ix: usize, iy: usize| {
            let h = grid.heights()[cell_index(ix, iy, ny)];
            if h.is_finite() {
                h.max(min_z)
            } else {
                min_z
            }
        };
        let points = nx * ny;

        let mut positions = vec![0.0f64; vertices * 3];
        let mut weld_map: Vec<u32> = (0..vertices as u32).collect();

        // Top and bottom layers, one X column per chunk.
        {
            let (top, rest) = positions.split_at_mut(points * 3);
            let bottom = &mut rest[..points * 3];
            let fill_layers = |ix: usize, top_col: &mut [f64], bottom_col: &mut [f64]| {
                for iy in 0..ny {
                    let (x, y) = grid.point(ix, iy);
                    top_col[iy * 3..iy * 3 + 3].copy_from_slice(&[x, y, top_z(ix, iy)]);
                    bottom_col[iy * 3..iy * 3 + 3].copy_from_slice(&[x, y, min_z]);
                }
            };
            if self.parallel {
                top.par_chunks_mut(ny * 3)
                    .zip(bottom.par_chunks_mut(ny * 3))
                    .enumerate()
                    .for_each(|(ix, (t, b))| fill_layers(ix, t, b));
            } else {
                top.chunks_mut(ny * 3)
                    .zip(bottom.chunks_mut(ny * 3))
                    .enumerate()
                    .for_each(|(ix, (t, b))| fill_layers(ix, t, b));
            }
        }

        let mut indices: Vec<u32> = Vec::with_capacity(triangles * 3);
        let top_v = |ix: usize, iy: usize| cell_index(ix, iy, ny) as u32;
        let bottom_v = |ix: usize, iy: usize| (points + cell_index(ix, iy, ny)) as u32;
        for ix in 0..nx - 1 {
            for iy in 0..ny - 1 {
                let (a, b, c, d) = (
                    top_v(ix, iy),
                    top_v(ix + 1, iy),
                    top_v(ix + 1, iy + 1),
                    top_v(ix, iy + 1),
                );
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        for ix in 0..nx - 1 {
            for iy in 0..ny - 1 {
                let (a, b, c, d) = (
                    bottom_v(ix, iy),
                    bottom_v(ix + 1, iy),
                    bottom_v(ix + 1, iy + 1),
                    bottom_v(ix, iy + 1),
                );
                indices.extend_from_slice(&[a, d, b, b, d, c]);
            }
        }

        let walls = [
            Wall {
                points: (0..ny).map(|iy| (0, iy)).collect(),
                outward: [-1.0, 0.0, 0.0],
                top_first: true,
            },
            Wall {
                points: (0..ny).map(|iy| (nx - 1, iy)).collect(),
                outward: [1.0, 0.0, 0.0],
                top_first: false,
            },
            Wall {
                points: (0..nx).map(|ix| (ix, 0)).collect(),
                outward: [0.0, -1.0, 0.0],
                top_first: false,
            },
            Wall {
                points: (0..nx).map(|ix| (ix, ny - 1)).collect(),
                outward: [0.0, 1.0, 0.0],
                top_first: true,
            },
        ];

        let mut next = 2 * points;
        let mut ranges = vec![
            (0, points, [0.0, 0.0, 1.0]),
            (points, 2 * points, [0.0, 0.0, -1.0]),
        ];
        for wall in &walls {
            let k = wall.points.len();
            let base = next;
            for (j, &(ix, iy)) in wall.points.iter().enumerate() {
                let (x, y) = grid.point(ix, iy);
                let t = (base + j) * 3;
                let b = (base + k + j) * 3;
                positions[t..t + 3].copy_from_slice(&[x, y, top_z(ix, iy)]);
                positions[b..b + 3].copy_from_slice(&[x, y, min_z]);
                weld_map[base + j] = top_v(ix, iy);
                weld_map[base + k + j] = bottom_v(ix, iy);
            }
            for j in 0..k - 1 {
                let ta = (base + j) as u32;
                let tb = ta + 1;
                let ba = (base + k + j) as u32;
                let bb = ba + 1;
                if wall.top_first {
                    indices.extend_from_slice(&[ta, tb, ba, ba, tb, bb]);
                } else {
                    indices.extend_from_slice(&[ta, ba, tb, tb, ba, bb]);
                }
            }
            ranges.push((base, base + 2 * k, wall.outward));
            next += 2 * k;
        }

        let normals = vertex_normals(&positions, &indices, &ranges, self.parallel);
        let mesh = SolidMesh {
            positions: positions.iter().map(|&v| v as f32).collect(),
            normals,
            indices,
            weld_map,
        };
        debug!(
            nx,
            ny,
            vertices = mesh.num_vertices(),
            triangles = mesh.num_triangles(),
            "built solid mesh"
        );
        Ok(mesh)
    }
}

/// Extrude `grid` down to `min_z` with the default caps.
pub fn build_solid_mesh(grid: &HeightmapGrid, min_z: f64) -> Result<SolidMesh> {
    SolidMeshBuilder::new().build(grid, min_z)
}

/// Area-weighted vertex normals. Vertices whose faces are all degenerate take
/// the fallback normal of their range.
fn vertex_normals(
    positions: &[f64],
    indices: &[u32],
    ranges: &[(usize, usize, [f64; 3])],
    parallel: bool,
) -> Vec<f32> {
    let mut acc = vec![0.0f64; positions.len()];
    let p = |i: u32| {
        let i = i as usize * 3;
        [positions[i], positions[i + 1], positions[i + 2]]
    };
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &v in tri {
            let v = v as usize * 3;
            acc[v] += n[0];
            acc[v + 1] += n[1];
            acc[v + 2] += n[2];
        }
    }

    let mut fallback = vec![[0.0f64; 3]; positions.len() / 3];
    for &(start, end, normal) in ranges {
        fallback[start..end].fill(normal);
    }

    let normalize = |(n, fb): (&[f64], &[f64; 3])| -> [f32; 3] {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 1e-12 {
            [(n[0] / len) as f32, (n[1] / len) as f32, (n[2] / len) as f32]
        } else {
            [fb[0] as f32, fb[1] as f32, fb[2] as f32]
        }
    };
    let normals: Vec<[f32; 3]> = if parallel {
        acc.par_chunks(3).zip(fallback.par_iter()).map(normalize).collect()
    } else {
        acc.chunks(3).zip(fallback.iter()).map(normalize).collect()
    };
    normals.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_normal(mesh: &SolidMesh, v: usize, expected: [f32; 3]) {
        let n = mesh.normal(v);
        for k in 0..3 {
            assert!((n[k] - expected[k]).abs() < 1e-5, "vertex {v}: {n:?} != {expected:?}");
        }
    }

    #[test]
    fn test_counts() {
        let grid = HeightmapGrid::new(3.0, 2.0, 4, 3, 1.0).unwrap();
        let mesh = build_solid_mesh(&grid, 0.0).unwrap();
        let (v, t) = SolidMeshBuilder::counts(4, 3);
        assert_eq!(mesh.num_vertices(), v);
        assert_eq!(mesh.num_triangles(), t);
        assert_eq!(v, 2 * 12 + 16 + 12);
        assert_eq!(t, 4 * 6 + 12 + 8);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert_eq!(mesh.weld_map.len(), v);
    }

    #[test]
    fn test_flat_block_is_closed_and_oriented() {
        let grid = HeightmapGrid::new(5.0, 3.0, 6, 4, 2.0).unwrap();
        let mesh = build_solid_mesh(&grid, -1.0).unwrap();
        assert!(mesh.is_closed_manifold());
        assert!(mesh.is_consistently_oriented());
    }

    #[test]
    fn test_sharp_normals() {
        let grid = HeightmapGrid::new(4.0, 4.0, 5, 5, 2.0).unwrap();
        let mesh = build_solid_mesh(&grid, 0.0).unwrap();
        let points = 25;
        // Corner top vertex keeps a pure +Z normal despite touching two walls.
        assert_normal(&mesh, 0, [0.0, 0.0, 1.0]);
        assert_normal(&mesh, 12, [0.0, 0.0, 1.0]);
        assert_normal(&mesh, points, [0.0, 0.0, -1.0]);
        // Left wall, right wall, front wall, back wall first vertices.
        let base = 2 * points;
        assert_normal(&mesh, base, [-1.0, 0.0, 0.0]);
        assert_normal(&mesh, base + 10, [1.0, 0.0, 0.0]);
        assert_normal(&mesh, base + 20, [0.0, -1.0, 0.0]);
        assert_normal(&mesh, base + 30 + 5, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_weld_map_points_at_grid_vertices() {
        let grid = HeightmapGrid::new(2.0, 2.0, 3, 3, 1.0).unwrap();
        let mesh = build_solid_mesh(&grid, 0.0).unwrap();
        for (v, &w) in mesh.weld_map.iter().enumerate() {
            let (v, w) = (v * 3, w as usize * 3);
            assert_eq!(mesh.positions[v..v + 3], mesh.positions[w..w + 3]);
        }
    }

    #[test]
    fn test_height_at_base_still_closed() {
        let mut grid = HeightmapGrid::new(4.0, 4.0, 5, 5, 0.0).unwrap();
        grid.set(2, 2, f64::NAN);
        grid.set(1, 1, -5.0);
        let mesh = build_solid_mesh(&grid, 0.0).unwrap();
        assert!(mesh.is_closed_manifold());
        assert!(mesh.positions.iter().all(|v| v.is_finite()));
        assert!(mesh.normals.iter().all(|v| v.is_finite()));
        assert_eq!(mesh.positions[cell_index(1, 1, 5) * 3 + 2], 0.0);
        assert_normal(&mesh, 50, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_caps_fail_fast() {
        let grid = HeightmapGrid::new(10.0, 10.0, 11, 11, 1.0).unwrap();
        let err = SolidMeshBuilder::new().with_limits(100, 1_000).build(&grid, 0.0);
        assert!(matches!(err, Err(StockSimError::MeshTooLarge { vertices: 330, .. })));
        assert!(SolidMeshBuilder::new().build(&grid, f64::NAN).is_err());
    }

    #[test]
    fn test_parallel_matches_serial() {
        let mut grid = HeightmapGrid::new(6.0, 4.0, 13, 9, 3.0).unwrap();
        for ix in 0..13 {
            for iy in 0..9 {
                grid.set(ix, iy, 3.0 + ((ix * 7 + iy * 3) % 5) as f64 * 0.25);
            }
        }
        let serial = build_solid_mesh(&grid, 0.0).unwrap();
        let parallel = SolidMeshBuilder::new().with_parallel(true).build(&grid, 0.0).unwrap();
        assert_eq!(serial, parallel);
    }
}
