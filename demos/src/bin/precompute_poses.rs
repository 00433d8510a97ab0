//! Pose Map Precomputation
//!
//! Rasterizes the heat-map of every annotated image into the pose-map cache
//! so training never pays for it.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin precompute_poses -- --config dataset.json
//!
//! # Rebuild every map, e.g. after changing sigma
//! cargo run --bin precompute_poses -- --config dataset.json --overwrite
//! ```

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use pose_ops::cords_to_map;
use posegan::{AnnotationTable, PoseMapCache};
use posegan_demos::{init_logging, PrecomputeConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recompute maps that are already cached
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        serde_json::from_str::<PrecomputeConfig>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
    } else {
        PrecomputeConfig::default()
    };
    config.overwrite |= args.overwrite;

    let dataset = &config.dataset;
    dataset.validate()?;
    let annotations = AnnotationTable::load(&dataset.annotations_file)
        .context("Failed to load annotations")?;
    let cache = PoseMapCache::new(&dataset.pose_cache_dir)?;

    info!(
        "Caching pose maps for {} images into {}",
        annotations.len(),
        cache.dir().display()
    );

    let mut names: Vec<&str> = annotations.names().collect();
    names.sort_unstable();

    let (mut computed, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    for name in names {
        if !config.overwrite && cache.contains(name) {
            skipped += 1;
            continue;
        }

        let keypoints = match annotations.keypoints(name) {
            Ok(keypoints) => keypoints,
            Err(e) => {
                warn!("Skipping {name}: {e}");
                failed += 1;
                continue;
            }
        };

        let map = cords_to_map(&keypoints, dataset.image_size, None, dataset.sigma);
        cache.store(name, &map)?;
        computed += 1;
    }

    info!("Computed {computed} pose maps, skipped {skipped} cached, {failed} failed");
    Ok(())
}
