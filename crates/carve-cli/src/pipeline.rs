//! Job pipelines: surface finishing from a triangle mesh, and facing.

use anyhow::{anyhow, Context, Result};
use carve_kernel_cam::{
    mesh_z_bounds, plan_raster_toolpath, triangles_from_buffers, GridSpec, ToolProfile, Toolpath,
};
use carve_kernel_stocksim::{lift_toolpath, HeightmapGrid, KernelBackend, SolidMesh};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::JobConfig;

/// Triangle buffers as read from a mesh JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshInput {
    pub positions: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
}

/// Counters logged at the end of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub backend: &'static str,
    pub passes: usize,
    pub points: usize,
    pub cell_updates: usize,
    pub off_grid: usize,
    pub removed_volume: f64,
    pub vertices: usize,
    pub triangles: usize,
}

impl JobSummary {
    pub fn log(&self) {
        info!(
            backend = self.backend,
            passes = self.passes,
            points = self.points,
            cell_updates = self.cell_updates,
            off_grid = self.off_grid,
            removed_volume = self.removed_volume,
            vertices = self.vertices,
            triangles = self.triangles,
            "job finished"
        );
    }
}

/// Everything a job produces.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub toolpath: Toolpath,
    pub stock: HeightmapGrid,
    pub mesh: SolidMesh,
    pub summary: JobSummary,
}

/// Finish the surface of `input` with a raster pass and cut it out of a block.
///
/// The block spans the raster extent and starts `top_allowance` above the
/// highest point of the mesh.
pub fn run_job(job: &JobConfig, input: &MeshInput, backend: &dyn KernelBackend) -> Result<JobOutput> {
    let triangles = triangles_from_buffers(&input.positions, input.indices.as_deref())
        .context("invalid mesh buffers")?;
    let (min_z, max_z) =
        mesh_z_bounds(&triangles).ok_or_else(|| anyhow!("mesh has no finite triangles"))?;
    info!(triangles = triangles.len(), min_z, max_z, "loaded mesh");

    let spec = GridSpec::around_triangles(&triangles, job.stock.resolution_x, job.stock.resolution_y)?;
    let raster = backend.rasterize_mesh(&triangles, &spec)?;
    debug!(
        cells = spec.len(),
        set = raster.set_count(),
        "rasterized mesh"
    );

    let mut toolpath = plan_raster_toolpath(&raster, &job.tool, &job.raster, min_z)?;
    let profile = job.tool.profile()?;
    let surface = HeightmapGrid::from_raster(&raster, min_z)?;
    if job.stock.lift {
        toolpath = lift_toolpath(&surface, &profile, &toolpath)?;
        debug!("lifted toolpath clear of the surface");
    }

    let (origin_x, origin_y) = surface.origin();
    let stock = HeightmapGrid::with_origin(
        surface.width(),
        surface.height(),
        surface.nx(),
        surface.ny(),
        max_z + job.stock.top_allowance,
        origin_x,
        origin_y,
    )?;
    cut(backend, stock, &profile, toolpath, min_z - job.stock.base_thickness)
}

/// Face the `[face]` region of a fresh block standing at the face's `top_z`.
pub fn run_face(job: &JobConfig, backend: &dyn KernelBackend) -> Result<JobOutput> {
    let face = job
        .face
        .as_ref()
        .ok_or_else(|| anyhow!("job has no [face] table"))?;
    face.validate()?;
    let profile = job.tool.profile()?;
    let toolpath = face.generate(&job.tool, &job.raster)?;
    let stock = HeightmapGrid::with_origin(
        face.max_x - face.min_x,
        face.max_y - face.min_y,
        job.stock.resolution_x,
        job.stock.resolution_y,
        face.top_z,
        face.min_x,
        face.min_y,
    )?;
    cut(backend, stock, &profile, toolpath, face.floor_z() - job.stock.base_thickness)
}

fn cut(
    backend: &dyn KernelBackend,
    mut stock: HeightmapGrid,
    profile: &ToolProfile,
    toolpath: Toolpath,
    base_z: f64,
) -> Result<JobOutput> {
    let before = stock.clone();
    let stats = backend.simulate_material_removal(&mut stock, profile, &toolpath)?;
    let removed_volume = stock.removed_volume(&before)?;
    let mesh = backend.build_solid_mesh(&stock, base_z)?;

    let summary = JobSummary {
        backend: backend.name(),
        passes: toolpath.pass_count(),
        points: stats.points,
        cell_updates: stats.cell_updates,
        off_grid: stats.off_grid,
        removed_volume,
        vertices: mesh.num_vertices(),
        triangles: mesh.num_triangles(),
    };
    Ok(JobOutput {
        toolpath,
        stock,
        mesh,
        summary,
    })
}
