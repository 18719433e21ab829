// cli.rs - Command-line interface for the headless tracking demo
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "overlay-tracker")]
#[command(about = "Headless overlay tracking simulation", long_about = None)]
pub struct Cli {
    /// JSON overlay configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames to render before exiting
    #[arg(long, default_value_t = 600)]
    pub frames: u64,

    /// Frame rate of the render loop
    #[arg(long, default_value_t = 60.0)]
    pub hz: f32,

    /// Number of simulated tracked objects
    #[arg(long, default_value_t = 16)]
    pub objects: u32,

    /// Threads publishing object updates
    #[arg(long, default_value_t = 2)]
    pub producers: u32,

    #[arg(long, default_value_t = 1280.0)]
    pub width: f32,

    #[arg(long, default_value_t = 720.0)]
    pub height: f32,
}
