//! Per-image augmentation workflow.
//!
//! For each source image: look up its label file by stem, decode the image,
//! then run the requested number of augmentation iterations. Every failure
//! is logged and isolated — a missing label or unreadable image skips the
//! image, a transform or write failure skips only its iteration.

use log::{error, warn};
use rand::Rng;
use std::path::Path;

use crate::config::Args;
use crate::coords::{flatten_to_keypoints, reslice_keypoints};
use crate::label::{read_polygons, write_polygons};
use crate::transform::Pipeline;
use crate::types::ProcessingStats;

/// Augment one source image. Never propagates an error to the batch driver.
pub fn process_image<R: Rng>(
    image_path: &Path,
    args: &Args,
    pipeline: &Pipeline,
    rng: &mut R,
    stats: &ProcessingStats,
) {
    let stem = match image_path.file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) => stem.to_owned(),
        None => {
            warn!(
                "Skipping image with unusable file name: {}",
                image_path.display()
            );
            stats.increment_missing_label();
            return;
        }
    };
    let extension = image_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or(&args.image_ext)
        .to_owned();

    let label_path = Path::new(&args.label_dir).join(format!("{stem}.txt"));
    if !label_path.exists() {
        warn!("Label not found for image: {stem}");
        stats.increment_missing_label();
        return;
    }

    let image = match image::open(image_path) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            error!("Could not read image {}: {}", image_path.display(), e);
            stats.increment_unreadable_image();
            return;
        }
    };

    let polygons = read_polygons(&label_path, stats);
    let (width, height) = image.dimensions();

    for i in 0..args.num_augmentations {
        let keypoints = flatten_to_keypoints(&polygons, width, height);

        let (aug_image, aug_keypoints) = match pipeline.apply(rng, image.clone(), keypoints) {
            Ok(out) => out,
            Err(e) => {
                error!("Augmentation failed for {stem}, iteration {i}: {e}");
                stats.increment_failed_iteration();
                continue;
            }
        };

        // pre-transform dimensions: no pipeline op changes the frame size
        let aug_polygons = reslice_keypoints(&polygons, &aug_keypoints, width, height);

        let new_name = format!("{stem}_aug{i}");
        let out_img_path =
            Path::new(args.output_image_dir()).join(format!("{new_name}.{extension}"));
        let out_lbl_path = Path::new(args.output_label_dir()).join(format!("{new_name}.txt"));

        if let Err(e) = aug_image.save(&out_img_path) {
            error!("Failed to save image {}: {}", out_img_path.display(), e);
            stats.increment_failed_write();
            continue;
        }
        if let Err(e) = write_polygons(&aug_polygons, &out_lbl_path) {
            error!("Failed to save label {}: {}", out_lbl_path.display(), e);
            stats.increment_failed_write();
            continue;
        }
        stats.increment_output_written();
    }

    stats.increment_augmented();
}
