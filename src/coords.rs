//! Mapping between normalized [0, 1] coordinates and pixel space.
//!
//! The transform stage works on continuous pixel coordinates; labels persist
//! normalized ones. Both directions use the source image's pre-transform
//! dimensions: no pipeline operation changes the frame size, and any
//! resize/crop-capable operation would require redesigning this mapping.

use crate::types::{AnnotationSet, Polygon};

/// Scale normalized points into pixel space. No rounding.
pub fn to_pixel(points: &[(f64, f64)], width: u32, height: u32) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|&(x, y)| (x * width as f64, y * height as f64))
        .collect()
}

/// Scale pixel-space points back into normalized space.
pub fn to_normalized(points: &[(f64, f64)], width: u32, height: u32) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|&(x, y)| (x / width as f64, y / height as f64))
        .collect()
}

/// Flatten every polygon's points, in annotation order, into one
/// pixel-space keypoint list for the joint transform. The per-polygon point
/// counts live in `polygons` and drive [`reslice_keypoints`].
pub fn flatten_to_keypoints(
    polygons: &AnnotationSet,
    width: u32,
    height: u32,
) -> Vec<(f64, f64)> {
    let total: usize = polygons.iter().map(|polygon| polygon.points.len()).sum();
    let mut keypoints = Vec::with_capacity(total);
    for polygon in polygons {
        keypoints.extend(to_pixel(&polygon.points, width, height));
    }
    keypoints
}

/// Re-group a transformed keypoint list into per-polygon annotations,
/// normalizing with the pre-transform dimensions.
///
/// Slices `keypoints` with exactly the per-polygon point counts of
/// `original`, in the same order, so class ids and point counts carry over
/// unchanged.
pub fn reslice_keypoints(
    original: &AnnotationSet,
    keypoints: &[(f64, f64)],
    width: u32,
    height: u32,
) -> AnnotationSet {
    debug_assert_eq!(
        keypoints.len(),
        original.iter().map(|polygon| polygon.points.len()).sum::<usize>()
    );
    let mut offset = 0;
    original
        .iter()
        .map(|polygon| {
            let count = polygon.points.len();
            let group = &keypoints[offset..offset + count];
            offset += count;
            Polygon {
                class_id: polygon.class_id,
                points: to_normalized(group, width, height),
            }
        })
        .collect()
}
