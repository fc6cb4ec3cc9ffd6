//! carve CLI - 2.5D machining simulation
//!
//! Plans raster toolpaths over triangle meshes, cuts them into a heightmap
//! stock and writes the resulting solid.

use anyhow::{Context, Result};
use carve_kernel_stocksim::BackendKind;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod pipeline;

use config::JobConfig;
use pipeline::{JobOutput, MeshInput};

#[derive(Parser)]
#[command(name = "carve")]
#[command(about = "2.5D machining kernel: plan, cut and mesh heightmap stock", long_about = None)]
struct Cli {
    /// More log output (-v for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Finish a triangle mesh with a raster toolpath and simulate the cut
    Run {
        /// TOML job file
        #[arg(long)]
        job: PathBuf,
        /// JSON triangle buffers: {"positions": [...], "indices": [...]}
        #[arg(long)]
        mesh: PathBuf,
        /// Write the cut stock as a JSON solid mesh
        #[arg(long)]
        stock_mesh: Option<PathBuf>,
        /// Write the toolpath as JSON
        #[arg(long)]
        toolpath: Option<PathBuf>,
        /// Override the backend from the job file (reference, parallel)
        #[arg(long)]
        backend: Option<BackendKind>,
    },
    /// Validate a job file and print it with defaults filled in
    Check {
        /// TOML job file
        #[arg(long)]
        job: PathBuf,
    },
    /// Face the region in the job's [face] table
    Face {
        /// TOML job file
        #[arg(long)]
        job: PathBuf,
        /// Write the faced stock as a JSON solid mesh
        #[arg(long)]
        stock_mesh: Option<PathBuf>,
        /// Write the toolpath as JSON
        #[arg(long)]
        toolpath: Option<PathBuf>,
        /// Override the backend from the job file (reference, parallel)
        #[arg(long)]
        backend: Option<BackendKind>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            job,
            mesh,
            stock_mesh,
            toolpath,
            backend,
        } => {
            let job = load_job(&job, backend)?;
            let input: MeshInput = read_json(&mesh)?;
            let output = pipeline::run_job(&job, &input, job.stock.backend().as_ref())?;
            write_outputs(&output, stock_mesh.as_deref(), toolpath.as_deref())?;
        }
        Commands::Check { job } => {
            let job = JobConfig::load(&job)?;
            print!("{}", job.to_toml_string()?);
        }
        Commands::Face {
            job,
            stock_mesh,
            toolpath,
            backend,
        } => {
            let job = load_job(&job, backend)?;
            let output = pipeline::run_face(&job, job.stock.backend().as_ref())?;
            write_outputs(&output, stock_mesh.as_deref(), toolpath.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_job(path: &Path, backend: Option<BackendKind>) -> Result<JobConfig> {
    let mut job = JobConfig::load(path)?;
    if let Some(backend) = backend {
        job.stock.backend = backend;
    }
    info!(tool = ?job.tool.shape, diameter = job.tool.cutter_diameter, backend = %job.stock.backend, "loaded job");
    Ok(job)
}

fn write_outputs(output: &JobOutput, stock_mesh: Option<&Path>, toolpath: Option<&Path>) -> Result<()> {
    output.summary.log();
    info!(
        lowest = output.stock.min_height(),
        highest = output.stock.max_height(),
        "stock heights"
    );
    if let Some(path) = stock_mesh {
        write_json(path, &output.mesh)?;
        info!(path = %path.display(), "wrote stock mesh");
    }
    if let Some(path) = toolpath {
        write_json(path, &output.toolpath)?;
        info!(path = %path.display(), "wrote toolpath");
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))
}
