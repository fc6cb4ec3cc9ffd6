//! Interchangeable kernel backends.
//!
//! A backend bundles the three heavy kernel operations. Callers pick one when
//! they set up a job and pass it around as `Box<dyn KernelBackend>`; there is
//! no global instance.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use carve_kernel_cam::{
    rasterize_mesh, Coverage, GridSpec, HeightRaster, ToolProfile, ToolStencil, Toolpath, Triangle,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::subtract::{cut_column, footprint_reaches_grid, log_stats, validate_toolpath};
use crate::{
    simulate_material_removal, HeightmapGrid, Result, SimulationStats, SolidMesh,
    SolidMeshBuilder, StockSimError,
};

/// The kernel operations every backend provides.
///
/// All backends produce identical rasters, height grids and meshes for the
/// same input. Only [`SimulationStats::cell_updates`] may differ, since it
/// depends on the order in which points are applied.
pub trait KernelBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Rasterize triangles onto `spec`, keeping the uppermost surface per cell.
    fn rasterize_mesh(&self, triangles: &[Triangle], spec: &GridSpec) -> Result<HeightRaster>;

    /// Cut `toolpath` into `grid`.
    fn simulate_material_removal(
        &self,
        grid: &mut HeightmapGrid,
        profile: &ToolProfile,
        toolpath: &Toolpath,
    ) -> Result<SimulationStats>;

    /// Extrude `grid` down to `min_z` into a closed mesh.
    fn build_solid_mesh(&self, grid: &HeightmapGrid, min_z: f64) -> Result<SolidMesh>;
}

/// Single-threaded backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBackend {
    mesh: SolidMeshBuilder,
}

impl ReferenceBackend {
    /// Backend with default mesh caps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `builder` for solid mesh construction.
    pub fn with_mesh_builder(mut self, builder: SolidMeshBuilder) -> Self {
        self.mesh = builder.with_parallel(false);
        self
    }
}

impl KernelBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn rasterize_mesh(&self, triangles: &[Triangle], spec: &GridSpec) -> Result<HeightRaster> {
        Ok(rasterize_mesh(triangles, spec)?)
    }

    fn simulate_material_removal(
        &self,
        grid: &mut HeightmapGrid,
        profile: &ToolProfile,
        toolpath: &Toolpath,
    ) -> Result<SimulationStats> {
        simulate_material_removal(grid, profile, toolpath)
    }

    fn build_solid_mesh(&self, grid: &HeightmapGrid, min_z: f64) -> Result<SolidMesh> {
        self.mesh.build(grid, min_z)
    }
}

/// Multi-threaded backend on the rayon pool.
///
/// Work is split by grid column (`ix`), so each output cell is written by a
/// single worker and the result matches [`ReferenceBackend`] exactly.
#[derive(Debug, Clone, Copy)]
pub struct ParallelBackend {
    mesh: SolidMeshBuilder,
}

impl Default for ParallelBackend {
    fn default() -> Self {
        Self {
            mesh: SolidMeshBuilder::new().with_parallel(true),
        }
    }
}

impl ParallelBackend {
    /// Backend with default mesh caps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `builder` for solid mesh construction.
    pub fn with_mesh_builder(mut self, builder: SolidMeshBuilder) -> Self {
        self.mesh = builder.with_parallel(true);
        self
    }
}

/// Work for one raster column.
#[derive(Debug, Clone)]
enum ColumnTask {
    Sample { tri: usize, iy: RangeInclusive<usize> },
    Raise { iy: usize, z: f64 },
}

impl KernelBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn rasterize_mesh(&self, triangles: &[Triangle], spec: &GridSpec) -> Result<HeightRaster> {
        let mut raster = HeightRaster::new(*spec)?;
        let ny = spec.res_y;

        let mut columns: Vec<Vec<ColumnTask>> = vec![Vec::new(); spec.res_x];
        for (tri, triangle) in triangles.iter().enumerate() {
            match spec.coverage(triangle) {
                Coverage::Outside => {}
                Coverage::Point { ix, iy, z } => columns[ix].push(ColumnTask::Raise { iy, z }),
                Coverage::Cells { ix, iy } => {
                    for col in ix {
                        columns[col].push(ColumnTask::Sample {
                            tri,
                            iy: iy.clone(),
                        });
                    }
                }
            }
        }

        let hits: usize = raster
            .values
            .par_chunks_mut(ny)
            .zip(columns.par_iter())
            .enumerate()
            .map(|(ix, (row, tasks))| {
                let mut hits = 0;
                for task in tasks {
                    match task {
                        ColumnTask::Sample { tri, iy } => {
                            hits += triangles[*tri].sample_row(spec, ix, iy.clone(), row);
                        }
                        ColumnTask::Raise { iy, z } => {
                            if *z > row[*iy] {
                                row[*iy] = *z;
                            }
                        }
                    }
                }
                hits
            })
            .sum();

        debug!(
            triangles = triangles.len(),
            hits,
            set = raster.set_count(),
            "rasterized mesh in parallel"
        );
        Ok(raster)
    }

    fn simulate_material_removal(
        &self,
        grid: &mut HeightmapGrid,
        profile: &ToolProfile,
        toolpath: &Toolpath,
    ) -> Result<SimulationStats> {
        validate_toolpath(toolpath)?;
        let stencil = ToolStencil::new(profile, grid.step_x(), grid.step_y())?;
        let (nx, ny) = (grid.nx(), grid.ny());
        let half_x = stencil.half_extent().0 as isize;

        let mut stats = SimulationStats::default();
        let mut centers: Vec<(isize, isize, f64)> = Vec::with_capacity(toolpath.point_count());
        for p in toolpath.points() {
            stats.points += 1;
            let (cx, cy) = grid.nearest_index(p.x, p.y);
            if footprint_reaches_grid(&stencil, cx, cy, nx, ny) {
                centers.push((cx, cy, p.z));
            } else {
                stats.off_grid += 1;
            }
        }
        centers.sort_by_key(|c| c.0);

        stats.cell_updates = grid
            .heights_mut()
            .par_chunks_mut(ny)
            .enumerate()
            .map(|(ix, row)| {
                let ix = ix as isize;
                let lo = centers.partition_point(|c| c.0 < ix - half_x);
                let hi = centers.partition_point(|c| c.0 <= ix + half_x);
                centers[lo..hi]
                    .iter()
                    .map(|&(cx, cy, z)| {
                        stencil
                            .column(ix - cx)
                            .map_or(0, |column| cut_column(row, column, cy, z))
                    })
                    .sum::<usize>()
            })
            .sum();

        log_stats(&stats);
        Ok(stats)
    }

    fn build_solid_mesh(&self, grid: &HeightmapGrid, min_z: f64) -> Result<SolidMesh> {
        self.mesh.build(grid, min_z)
    }
}

/// Backend selector for configuration files and the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// [`ReferenceBackend`].
    #[default]
    Reference,
    /// [`ParallelBackend`].
    Parallel,
}

impl BackendKind {
    /// Construct the selected backend with default settings.
    pub fn create(self) -> Box<dyn KernelBackend> {
        self.create_with(SolidMeshBuilder::new())
    }

    /// Construct the selected backend with the given mesh builder.
    pub fn create_with(self, mesh: SolidMeshBuilder) -> Box<dyn KernelBackend> {
        let backend: Box<dyn KernelBackend> = match self {
            BackendKind::Reference => Box::new(ReferenceBackend::new().with_mesh_builder(mesh)),
            BackendKind::Parallel => Box::new(ParallelBackend::new().with_mesh_builder(mesh)),
        };
        debug!(backend = backend.name(), "created kernel backend");
        backend
    }
}

impl FromStr for BackendKind {
    type Err = StockSimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "reference" => Ok(BackendKind::Reference),
            "parallel" => Ok(BackendKind::Parallel),
            other => Err(StockSimError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Reference => "reference",
            BackendKind::Parallel => "parallel",
        })
    }
}
