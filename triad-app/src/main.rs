//! Triad Export
//!
//! Command line front end for the export pipeline, driven by an analytic
//! demo scene so every command runs without a trained model.
//!
//! Commands:
//! - `pointcloud`: sample a point cloud and save the raw samples
//! - `render`: render RGB/depth images along the camera orbit
//! - `poses`: write train/eval camera poses as JSON
//! - `mesh`: load and simplify a PLY mesh
//! - `inspect`: list the contents of a `.tcf` container

mod commands;
mod error;
mod progress;
mod synthetic;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

/// Triad Export - point clouds, renders, poses and meshes from radiance fields
#[derive(Parser, Debug)]
#[command(name = "triad-export")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample a point cloud from the demo scene
    Pointcloud(PointCloudArgs),
    /// Render RGB and depth images for every training camera
    Render(RenderArgs),
    /// Write camera poses of the train and eval splits
    Poses(PosesArgs),
    /// Load a PLY mesh and optionally simplify it
    Mesh(MeshArgs),
    /// Print the groups and datasets of a container file
    Inspect(InspectArgs),
}

/// Shared options describing the demo scene.
#[derive(Args, Debug, Clone)]
struct SceneArgs {
    /// Radius of the demo sphere
    #[arg(long, default_value_t = 1.0)]
    radius: f32,

    /// Number of training cameras on the orbit
    #[arg(long, default_value_t = 8)]
    cameras: usize,

    /// Number of evaluation cameras
    #[arg(long, default_value_t = 2)]
    eval_cameras: usize,

    /// Image width of each camera
    #[arg(long, default_value_t = 160)]
    width: u32,

    /// Image height of each camera
    #[arg(long, default_value_t = 120)]
    height: u32,
}

#[derive(Args, Debug)]
struct PointCloudArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// JSON file with point cloud options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of points to sample
    #[arg(short, long)]
    num_points: Option<usize>,

    /// Rays drawn per sampling step
    #[arg(long, default_value_t = 512)]
    batch_size: usize,

    /// Output container path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep statistical outliers
    #[arg(long)]
    keep_outliers: bool,

    /// Estimate normals from the point geometry
    #[arg(long)]
    estimate_normals: bool,

    /// Model output to take normals from
    #[arg(long)]
    normal_output_name: Option<String>,

    /// Outlier threshold in standard deviations
    #[arg(long)]
    std_ratio: Option<f64>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Directory for the rendered images
    #[arg(short, long, default_value = "renders")]
    output_dir: PathBuf,

    /// Scale factor applied to every camera's resolution
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Ignore lens distortion when generating rays
    #[arg(long)]
    disable_distortion: bool,
}

#[derive(Args, Debug)]
struct PosesArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Directory for transforms_train.json and transforms_eval.json
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct MeshArgs {
    /// PLY file to load
    file: PathBuf,

    /// Simplify to at most this many faces
    #[arg(long)]
    target_faces: Option<usize>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Container file to read
    file: PathBuf,
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::Pointcloud(args) => commands::pointcloud(args),
        Command::Render(args) => commands::render(args),
        Command::Poses(args) => commands::poses(args),
        Command::Mesh(args) => commands::mesh(args),
        Command::Inspect(args) => commands::inspect(args),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
