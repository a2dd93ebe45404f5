use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

/// One polygon annotation: a class id followed by the boundary walk.
///
/// Point order is significant and is preserved across the whole
/// read/transform/write cycle. Coordinates are normalized to [0, 1] when
/// persisted and continuous pixel values while inside the transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub class_id: u32,
    pub points: Vec<(f64, f64)>,
}

/// All polygons of one image, in label-file order.
///
/// The order matters: the transform stage flattens every polygon's points
/// into one keypoint list and re-slices the output using the per-polygon
/// point counts in this same order.
pub type AnnotationSet = Vec<Polygon>;

// Struct to hold processing statistics, shared across worker tasks
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub images_augmented: AtomicUsize,
    pub skipped_missing_label: AtomicUsize,
    pub skipped_unreadable_image: AtomicUsize,
    pub malformed_label_files: AtomicUsize,
    pub failed_iterations: AtomicUsize,
    pub failed_writes: AtomicUsize,
    pub outputs_written: AtomicUsize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_augmented(&self) {
        self.images_augmented.fetch_add(1, Relaxed);
    }

    pub fn increment_missing_label(&self) {
        self.skipped_missing_label.fetch_add(1, Relaxed);
    }

    pub fn increment_unreadable_image(&self) {
        self.skipped_unreadable_image.fetch_add(1, Relaxed);
    }

    pub fn increment_malformed_label(&self) {
        self.malformed_label_files.fetch_add(1, Relaxed);
    }

    pub fn increment_failed_iteration(&self) {
        self.failed_iterations.fetch_add(1, Relaxed);
    }

    pub fn increment_failed_write(&self) {
        self.failed_writes.fetch_add(1, Relaxed);
    }

    pub fn increment_output_written(&self) {
        self.outputs_written.fetch_add(1, Relaxed);
    }

    pub fn log_summary(&self) {
        log::info!("=== Augmentation Summary ===");
        log::info!("Images augmented: {}", self.images_augmented.load(Relaxed));
        log::info!(
            "Output pairs written: {}",
            self.outputs_written.load(Relaxed)
        );
        log::info!(
            "Skipped (missing label file): {}",
            self.skipped_missing_label.load(Relaxed)
        );
        log::info!(
            "Skipped (unreadable image): {}",
            self.skipped_unreadable_image.load(Relaxed)
        );
        log::info!(
            "Failed iterations: {}",
            self.failed_iterations.load(Relaxed)
        );
        log::info!("Failed writes: {}", self.failed_writes.load(Relaxed));

        let total_skipped = self.skipped_missing_label.load(Relaxed)
            + self.skipped_unreadable_image.load(Relaxed);
        if total_skipped > 0 {
            log::warn!(
                "Total skipped images: {} (missing label: {}, unreadable image: {})",
                total_skipped,
                self.skipped_missing_label.load(Relaxed),
                self.skipped_unreadable_image.load(Relaxed)
            );
        }
        if self.malformed_label_files.load(Relaxed) > 0 {
            log::warn!(
                "{} malformed label file(s) treated as having no annotations",
                self.malformed_label_files.load(Relaxed)
            );
        }
    }
}
