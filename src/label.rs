//! YOLO polygon label text codec.
//!
//! One polygon per line: `<class_id> <x1> <y1> <x2> <y2> ...` with
//! coordinates normalized to [0, 1]. A malformed file is reported, counted,
//! and treated as having no annotations so one bad label cannot abort a
//! batch; callers that need to tell the two apart watch the stats counter.

use log::error;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::types::{AnnotationSet, Polygon, ProcessingStats};

// Parse one non-empty label line; None on any malformed token
fn parse_line(line: &str) -> Option<Polygon> {
    let mut tokens = line.split_whitespace();
    let class_id = tokens.next()?.parse::<u32>().ok()?;
    let coords = tokens
        .map(|token| token.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    if coords.is_empty() || coords.len() % 2 != 0 {
        return None;
    }
    let points = coords.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
    Some(Polygon { class_id, points })
}

/// Read all polygon annotations of one label file.
///
/// Any unreadable or malformed line makes the whole file count as malformed:
/// the error is logged and an empty set is returned. Label-file existence is
/// the caller's concern.
pub fn read_polygons(path: &Path, stats: &ProcessingStats) -> AnnotationSet {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Error reading {}: {}", path.display(), e);
            stats.increment_malformed_label();
            return Vec::new();
        }
    };

    let mut polygons = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(polygon) => polygons.push(polygon),
            None => {
                error!("Malformed label line in {}: {:?}", path.display(), line);
                stats.increment_malformed_label();
                return Vec::new();
            }
        }
    }
    polygons
}

/// Write polygon annotations in YOLO polygon format.
///
/// Each coordinate is independently clamped into [0.0, 1.0] and formatted
/// with fixed 6-decimal precision.
pub fn write_polygons(polygons: &AnnotationSet, path: &Path) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for polygon in polygons {
        let mut line = polygon.class_id.to_string();
        for &(x, y) in &polygon.points {
            let x = x.clamp(0.0, 1.0);
            let y = y.clamp(0.0, 1.0);
            line.push_str(&format!(" {:.6} {:.6}", x, y));
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }
    writer.flush()
}
