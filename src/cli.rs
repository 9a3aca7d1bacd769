use crate::config::load_config;
use crate::geometry::Mbr;
use crate::ir::load_scene;
use crate::layout_dump::write_layout_dump;
use crate::pass::compute_layout;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "mlay",
    version,
    about = "Resolve label overlaps and marker clusters for one screen layout pass"
)]
pub struct Args {
    /// Scene file (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout result. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (viewport, grid sizes, cluster marker)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width, overrides the config file
    #[arg(short = 'W', long = "width")]
    pub width: Option<f32>,

    /// Viewport height, overrides the config file
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Resolution scale for the cluster marker, overrides the config file
    #[arg(short = 's', long = "scale")]
    pub scale: Option<f32>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if args.width.is_some() || args.height.is_some() {
        let ll = config.viewport.ll;
        let width = args.width.unwrap_or_else(|| config.viewport.width());
        let height = args.height.unwrap_or_else(|| config.viewport.height());
        config.viewport = Mbr::new(ll, (ll.0 + width, ll.1 + height));
    }
    if let Some(scale) = args.scale {
        config.cluster.resolution_scale = scale;
    }

    let scene = load_scene(args.input.as_deref())?;
    // The CLI runs one pass to completion, so nothing ever raises this.
    let cancel = AtomicBool::new(false);
    let result = compute_layout(&scene, &config, &cancel)?;
    write_layout_dump(args.output.as_deref(), &result)?;
    Ok(())
}
