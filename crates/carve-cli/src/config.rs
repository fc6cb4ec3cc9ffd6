//! TOML job files.

use std::path::Path;

use anyhow::{bail, Context, Result};
use carve_kernel_cam::{Face, RasterSettings, Tool};
use carve_kernel_stocksim::{
    BackendKind, KernelBackend, SolidMeshBuilder, DEFAULT_MAX_TRIANGLES, DEFAULT_MAX_VERTICES,
};
use serde::{Deserialize, Serialize};

/// A machining job: the tool, how to plan with it and what stock to cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub tool: Tool,
    #[serde(default)]
    pub raster: RasterSettings,
    #[serde(default)]
    pub stock: StockConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<Face>,
}

/// Stock block and kernel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StockConfig {
    /// Raster cells along X (also grid points along X for `face`).
    pub resolution_x: usize,
    /// Raster cells along Y.
    pub resolution_y: usize,
    /// Stock left above the top of the model (mm).
    pub top_allowance: f64,
    /// Distance from the lowest cut to the bottom of the solid (mm).
    pub base_thickness: f64,
    /// Lift planned points off the model surface before cutting.
    pub lift: bool,
    /// Kernel implementation: `reference` or `parallel`.
    pub backend: BackendKind,
    /// Vertex cap for the solid mesh.
    pub max_vertices: usize,
    /// Triangle cap for the solid mesh.
    pub max_triangles: usize,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            resolution_x: 200,
            resolution_y: 200,
            top_allowance: 0.0,
            base_thickness: 1.0,
            lift: false,
            backend: BackendKind::default(),
            max_vertices: DEFAULT_MAX_VERTICES,
            max_triangles: DEFAULT_MAX_TRIANGLES,
        }
    }
}

impl StockConfig {
    /// Backend with the configured mesh limits.
    pub fn backend(&self) -> Box<dyn KernelBackend> {
        self.backend
            .create_with(SolidMeshBuilder::new().with_limits(self.max_vertices, self.max_triangles))
    }
}

impl JobConfig {
    /// Parse a job from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let job: JobConfig = toml::from_str(text).context("failed to parse job")?;
        job.validate()?;
        Ok(job)
    }

    /// Read and parse a job file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in job file {}", path.display()))
    }

    /// Check every table for values the kernel would reject.
    pub fn validate(&self) -> Result<()> {
        self.tool.validate().context("invalid [tool]")?;
        self.raster.validate().context("invalid [raster]")?;
        if let Some(face) = &self.face {
            face.validate().context("invalid [face]")?;
        }

        let stock = &self.stock;
        if stock.resolution_x < 2 || stock.resolution_y < 2 {
            bail!(
                "invalid [stock]: resolution must be at least 2 x 2, got {} x {}",
                stock.resolution_x,
                stock.resolution_y
            );
        }
        if !stock.top_allowance.is_finite() || stock.top_allowance < 0.0 {
            bail!("invalid [stock]: top_allowance must be finite and >= 0");
        }
        if !stock.base_thickness.is_finite() || stock.base_thickness <= 0.0 {
            bail!("invalid [stock]: base_thickness must be finite and > 0");
        }
        Ok(())
    }

    /// The job as TOML, with every default filled in.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize job")
    }
}
