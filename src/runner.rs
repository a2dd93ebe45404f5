//! Batch driver: discover source images, dispatch one augmentation task per
//! image across a bounded worker pool, and report a single completion.
//!
//! Tasks are independent and unordered. Output names derive from each
//! source stem plus an iteration index, so concurrent tasks never contend
//! for the same path. Each task draws from its own seeded RNG.

use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::augment::process_image;
use crate::config::Args;
use crate::transform::Pipeline;
use crate::types::ProcessingStats;

// Progress bar incremented once per dispatched image task
fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [Augment] [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .progress_chars("#>-"),
    );
    pb
}

/// Create both output roots before dispatch. The output roots may coincide
/// with the source roots, so they are only ever created, never cleared.
pub fn setup_output_directories(args: &Args) -> io::Result<()> {
    fs::create_dir_all(args.output_image_dir())?;
    fs::create_dir_all(args.output_label_dir())?;
    Ok(())
}

/// Discover source images with the configured extension, in stable order.
pub fn discover_images(args: &Args) -> Vec<PathBuf> {
    let pattern = format!("{}/*.{}", args.image_dir, args.image_ext);
    let mut images: Vec<PathBuf> = match glob(&pattern) {
        Ok(entries) => entries.filter_map(|entry| entry.ok()).collect(),
        Err(e) => {
            error!("Invalid image glob pattern {pattern:?}: {e}");
            return Vec::new();
        }
    };
    images.sort();
    images
}

/// Run the augmentation batch.
///
/// Per-item failures are logged and recovered inside the tasks; the only
/// error this returns is the unrecoverable setup kind (output directory
/// creation or worker pool construction).
pub fn run(args: &Args) -> io::Result<()> {
    setup_output_directories(args)?;

    let images = discover_images(args);
    if images.is_empty() {
        warn!("No images found to process.");
        return Ok(());
    }
    info!("Found {} images to process.", images.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.workers)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let pipeline = Pipeline::default();
    let stats = ProcessingStats::new();
    let pb = create_progress_bar(images.len() as u64);

    pool.install(|| {
        images.par_iter().enumerate().for_each(|(index, image_path)| {
            // per-task RNG: deterministic under --seed, never shared
            let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(index as u64));
            process_image(image_path, args, &pipeline, &mut rng, &stats);
            pb.inc(1);
        });
    });
    pb.finish_with_message("Augmentation complete");

    info!("Augmentation completed.");
    stats.log_summary();
    Ok(())
}
