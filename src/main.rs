// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use faceswap_camera::backends::camera::get_backend;
use faceswap_camera::config::Config;
use faceswap_camera::session::SessionController;
use faceswap_camera::storage;
use faceswap_camera::submission::SubmissionClient;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

#[derive(Parser)]
#[command(name = "faceswap-camera")]
#[command(about = "Capture a photo and swap faces with a remote service")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// V4L2 device to use (e.g. /dev/video0), overrides FACESWAP_CAMERA_DEVICE
    #[arg(short, long, global = true, conflicts_with = "source")]
    device: Option<String>,

    /// Use a still image as the camera
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run in terminal mode (renders camera to terminal)
    Terminal {
        /// Folder for saved photos and results (default: ~/Pictures/FaceSwap)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Output file or folder (default: ~/Pictures/FaceSwap/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Take a photo and swap faces
    Swap {
        /// Output folder for the swapped images (default: ~/Pictures/FaceSwap)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the face-swap backend is reachable
    Health,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=faceswap_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if cli.device.is_some() {
        config.camera.device = cli.device.clone();
    }

    let command = cli.command.unwrap_or(Commands::Terminal { output: None });
    match command {
        Commands::List => return cli::list_cameras(),
        Commands::Config => return cli::print_config(&config),
        _ => {}
    }

    let runtime = tokio::runtime::Runtime::new()?;

    if let Commands::Health = command {
        return cli::check_health(&runtime, &config);
    }

    let backend = get_backend(config.camera.device.clone(), cli.source.clone());
    let submitter = SubmissionClient::new(&config.api)?;
    let controller =
        SessionController::new(Arc::from(backend), Arc::new(submitter), &config.camera);

    match command {
        Commands::Photo { output } => cli::take_photo(&runtime, controller, output),
        Commands::Swap { output } => cli::swap_faces(&runtime, controller, output),
        Commands::Terminal { output } => faceswap_camera::terminal::run(
            controller,
            runtime.handle().clone(),
            output.unwrap_or_else(storage::default_save_dir),
        ),
        Commands::List | Commands::Config | Commands::Health => Ok(()),
    }
}
