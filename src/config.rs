use clap::Parser;
use std::str::FromStr;

/// Command-line arguments for the polygon augmentation tool.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory containing the source images
    #[arg(short = 'i', long = "image_dir")]
    pub image_dir: String,

    /// Directory containing the YOLO polygon label files
    #[arg(short = 'l', long = "label_dir")]
    pub label_dir: String,

    /// Output directory for augmented images (defaults to image_dir)
    #[arg(long = "output_image_dir")]
    pub output_image_dir: Option<String>,

    /// Output directory for augmented labels (defaults to label_dir)
    #[arg(long = "output_label_dir")]
    pub output_label_dir: Option<String>,

    /// Number of augmented copies to produce per source image
    #[arg(short = 'n', long = "num_augmentations", default_value_t = 3, value_parser = validate_count)]
    pub num_augmentations: usize,

    /// Seed for the per-image random draws
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Number of worker threads (0 = available parallelism)
    #[arg(long = "workers", default_value_t = 0)]
    pub workers: usize,

    /// File extension of the source images
    #[arg(long = "image_ext", default_value = "jpg")]
    pub image_ext: String,
}

impl Args {
    /// Output image root, falling back to the source image dir.
    pub fn output_image_dir(&self) -> &str {
        self.output_image_dir.as_deref().unwrap_or(&self.image_dir)
    }

    /// Output label root, falling back to the source label dir.
    pub fn output_label_dir(&self) -> &str {
        self.output_label_dir.as_deref().unwrap_or(&self.label_dir)
    }
}

// Validate that at least one augmentation is requested
fn validate_count(s: &str) -> Result<usize, String> {
    match usize::from_str(s) {
        Ok(val) if val >= 1 => Ok(val),
        _ => Err("COUNT must be a positive integer".to_string()),
    }
}
