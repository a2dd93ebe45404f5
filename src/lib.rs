//! Polygon-aware dataset augmentation for YOLO segmentation labels
//!
//! This library reads YOLO-style polygon annotations, applies a stochastic
//! image+keypoint transform pipeline so geometric edits hit pixels and
//! annotation points identically, and writes augmented image/label pairs
//! back to disk, one batch of images at a time across a worker pool.

pub mod augment;
pub mod config;
pub mod coords;
pub mod label;
pub mod runner;
pub mod transform;
pub mod types;

// Re-export commonly used types and functions
pub use config::Args;
pub use runner::{discover_images, run, setup_output_directories};
pub use transform::{Pipeline, PipelineError, TransformKind, TransformStep};
pub use types::{AnnotationSet, Polygon, ProcessingStats};
