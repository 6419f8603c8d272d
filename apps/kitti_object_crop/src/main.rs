use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use objcrop::CropPipelineCfg;

/// Crops annotated KITTI objects into per-category classifier patches.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with a CropPipelineCfg. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of tracklet_labels_<id>.xml files.
    #[arg(long)]
    tracklets: Option<PathBuf>,

    /// Directory holding drive_<id>/ folders.
    #[arg(long)]
    raw_data: Option<PathBuf>,

    /// Output root; patches go to <output>/<category>/.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Square patch size in pixels.
    #[arg(long)]
    size: Option<u32>,

    /// Process sequences one after another.
    #[arg(long)]
    sequential: bool,
}

fn load_config(args: &Args) -> Result<CropPipelineCfg> {
    let mut cfg = match &args.config {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => CropPipelineCfg::default(),
    };

    if let Some(tracklets) = &args.tracklets {
        cfg.tracklets_dir = tracklets.clone();
    }
    if let Some(raw_data) = &args.raw_data {
        cfg.raw_data_dir = raw_data.clone();
    }
    if let Some(output) = &args.output {
        cfg.output_dir = output.clone();
    }
    if let Some(size) = args.size {
        cfg.target_width = size;
        cfg.target_height = size;
    }
    if args.sequential {
        cfg.parallel = false;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let cfg = load_config(&args)?;
    log::debug!("config: {cfg:?}");

    let summary = cfg.finalize()?.run()?;
    log::info!("dataset created: {summary}");
    Ok(())
}
