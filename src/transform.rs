//! Stochastic image+keypoint transform pipeline.
//!
//! The pipeline is a fixed, ordered list of independently-gated operations.
//! Each invocation draws fresh randomness per gate; operations fire in the
//! listed order. Geometric operations reposition keypoints in lockstep with
//! pixel content, photometric ones leave keypoints untouched. Every
//! operation preserves the image dimensions, which the coordinate mapping
//! downstream relies on.

use image::RgbImage;
use imageproc::filter::gaussian_blur_f32;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("keypoint count changed from {before} to {after}")]
    KeypointCountMismatch { before: usize, after: usize },
}

/// One augmentation operation with its parameters.
#[derive(Debug, Clone)]
pub enum TransformKind {
    /// Mirror the image and all keypoints across the vertical midline.
    HorizontalFlip,
    /// Jitter brightness and contrast within the given limits.
    BrightnessContrast {
        brightness_limit: f32,
        contrast_limit: f32,
    },
    /// Gaussian blur with a random odd kernel size in [3, limit].
    Blur { limit: u32 },
    /// Contrast-limited adaptive histogram equalization on luminance.
    Clahe { clip_limit: f32, tile_grid: u32 },
}

/// A gated pipeline step, applied when its probability gate fires.
#[derive(Debug, Clone)]
pub struct TransformStep {
    pub kind: TransformKind,
    pub probability: f64,
}

/// An ordered set of gated transform steps interpreted by [`Pipeline::apply`].
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<TransformStep>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(vec![
            TransformStep {
                kind: TransformKind::HorizontalFlip,
                probability: 0.5,
            },
            TransformStep {
                kind: TransformKind::BrightnessContrast {
                    brightness_limit: 0.2,
                    contrast_limit: 0.2,
                },
                probability: 0.3,
            },
            TransformStep {
                kind: TransformKind::Blur { limit: 3 },
                probability: 0.2,
            },
            TransformStep {
                kind: TransformKind::Clahe {
                    clip_limit: 4.0,
                    tile_grid: 8,
                },
                probability: 0.3,
            },
        ])
    }
}

impl Pipeline {
    pub fn new(steps: Vec<TransformStep>) -> Self {
        Self { steps }
    }

    /// Apply every step whose gate fires, in order.
    ///
    /// Returns the transformed image and a keypoint list with the same
    /// length and order as the input. Keypoints are continuous pixel
    /// coordinates.
    pub fn apply<R: Rng>(
        &self,
        rng: &mut R,
        mut image: RgbImage,
        mut keypoints: Vec<(f64, f64)>,
    ) -> Result<(RgbImage, Vec<(f64, f64)>), PipelineError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyImage { width, height });
        }

        let expected = keypoints.len();
        for step in &self.steps {
            if !rng.gen_bool(step.probability) {
                continue;
            }
            match step.kind {
                TransformKind::HorizontalFlip => {
                    horizontal_flip(&mut image, &mut keypoints);
                }
                TransformKind::BrightnessContrast {
                    brightness_limit,
                    contrast_limit,
                } => {
                    brightness_contrast(rng, &mut image, brightness_limit, contrast_limit);
                }
                TransformKind::Blur { limit } => {
                    image = blur(rng, &image, limit);
                }
                TransformKind::Clahe {
                    clip_limit,
                    tile_grid,
                } => {
                    clahe(&mut image, clip_limit, tile_grid);
                }
            }
            if keypoints.len() != expected {
                return Err(PipelineError::KeypointCountMismatch {
                    before: expected,
                    after: keypoints.len(),
                });
            }
        }
        Ok((image, keypoints))
    }
}

// x' = width - x, y unchanged
fn horizontal_flip(image: &mut RgbImage, keypoints: &mut [(f64, f64)]) {
    image::imageops::flip_horizontal_in_place(image);
    let width = image.width() as f64;
    for point in keypoints.iter_mut() {
        point.0 = width - point.0;
    }
}

fn brightness_contrast<R: Rng>(
    rng: &mut R,
    image: &mut RgbImage,
    brightness_limit: f32,
    contrast_limit: f32,
) {
    let factor = 1.0 + rng.gen_range(-contrast_limit..=contrast_limit);
    let offset = rng.gen_range(-brightness_limit..=brightness_limit);
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let v = *channel as f32 / 255.0;
            let v = (v - 0.5) * factor + 0.5 + offset;
            *channel = (v.clamp(0.0, 1.0) * 255.0) as u8;
        }
    }
}

fn blur<R: Rng>(rng: &mut R, image: &RgbImage, limit: u32) -> RgbImage {
    let ksize = 2 * rng.gen_range(1..=limit.max(3) / 2) + 1;
    // sigma matched to the drawn kernel size
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    gaussian_blur_f32(image, sigma)
}

// ITU-R BT.709 luminance
fn luminance(pixel: [u8; 3]) -> u8 {
    let lum = 0.2126 * pixel[0] as f32 + 0.7152 * pixel[1] as f32 + 0.0722 * pixel[2] as f32;
    lum.round().min(255.0) as u8
}

/// Tile-based adaptive histogram equalization on luminance, with clipped
/// per-tile histograms and bilinear interpolation between neighboring tile
/// mappings. RGB channels are scaled by the luminance ratio.
fn clahe(image: &mut RgbImage, clip_limit: f32, tile_grid: u32) {
    let (width, height) = image.dimensions();
    let tiles_x = tile_grid.clamp(1, width);
    let tiles_y = tile_grid.clamp(1, height);
    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;

    let lum: Vec<u8> = image.pixels().map(|pixel| luminance(pixel.0)).collect();

    // One clipped-histogram equalization LUT per tile
    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = (tx as f32 * tile_w).round() as u32;
            let x1 = if tx + 1 == tiles_x {
                width
            } else {
                ((tx + 1) as f32 * tile_w).round() as u32
            };
            let y0 = (ty as f32 * tile_h).round() as u32;
            let y1 = if ty + 1 == tiles_y {
                height
            } else {
                ((ty + 1) as f32 * tile_h).round() as u32
            };

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[lum[(y * width + x) as usize] as usize] += 1;
                }
            }

            let area = ((x1 - x0) * (y1 - y0)) as f32;
            let clip = (clip_limit * area / 256.0).max(1.0) as u32;
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            // redistribute the clipped excess, keeping the total mass
            let bonus = excess / 256;
            let remainder = (excess % 256) as usize;
            for (index, bin) in hist.iter_mut().enumerate() {
                *bin += bonus + u32::from(index < remainder);
            }

            let total: u32 = hist.iter().sum();
            let lut = &mut luts[(ty * tiles_x + tx) as usize];
            let mut cdf = 0u32;
            for (value, &bin) in hist.iter().enumerate() {
                cdf += bin;
                lut[value] = ((cdf as f32 / total as f32) * 255.0).round() as u8;
            }
        }
    }

    let lut_at = |tx: usize, ty: usize, value: u8| -> f32 {
        luts[ty * tiles_x as usize + tx][value as usize] as f32
    };

    for y in 0..height {
        for x in 0..width {
            let value = lum[(y * width + x) as usize];
            if value == 0 {
                continue;
            }

            // interpolate between the four surrounding tile centers
            let fx = x as f32 / tile_w - 0.5;
            let fy = y as f32 / tile_h - 0.5;
            let wx = fx - fx.floor();
            let wy = fy - fy.floor();
            let txa = fx.floor().clamp(0.0, (tiles_x - 1) as f32) as usize;
            let txb = (fx.floor() + 1.0).clamp(0.0, (tiles_x - 1) as f32) as usize;
            let tya = fy.floor().clamp(0.0, (tiles_y - 1) as f32) as usize;
            let tyb = (fy.floor() + 1.0).clamp(0.0, (tiles_y - 1) as f32) as usize;

            let top = (1.0 - wx) * lut_at(txa, tya, value) + wx * lut_at(txb, tya, value);
            let bottom = (1.0 - wx) * lut_at(txa, tyb, value) + wx * lut_at(txb, tyb, value);
            let mapped = (1.0 - wy) * top + wy * bottom;

            let scale = mapped / value as f32;
            let pixel = image.get_pixel_mut(x, y);
            for channel in pixel.0.iter_mut() {
                *channel = ((*channel as f32) * scale).min(255.0) as u8;
            }
        }
    }
}
