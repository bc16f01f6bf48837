//! Frame Source (spec §4.B): enumerates input frames and validates a
//! common pixel geometry across the cohort.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::config::CropRect;
use crate::error::{PipelineError, Result};
use crate::time_index;

/// An immutable descriptor for one input frame (spec §3 `Frame`).
#[derive(Debug, Clone)]
pub struct Frame {
    pub path: PathBuf,
    pub index_in_sequence: usize,
    pub pixel_geometry: (u32, u32),
    pub timestamp: Option<DateTime<Utc>>,
}

/// Enumerate `.png` files directly inside `dir`, sorted by filename
/// ascending (spec §4.B step 1).
fn enumerate_png_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn read_geometry(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path)
        .map_err(|e| PipelineError::InvalidInput(format!("could not read {path:?}: {e}")))
}

/// Discover and validate the ordered sequence of input frames (spec §4.B).
///
/// `crop` (if present) must fit within the first frame's native geometry;
/// the cohort's *target* geometry is the crop's `(w, h)` when cropping,
/// otherwise the first frame's native geometry. Every subsequent frame
/// must match the first frame's *native* geometry exactly (the crop is
/// applied later, uniformly, by the pre-processor).
pub fn discover_frames(dir: &Path, crop: Option<CropRect>, require_pairable: bool) -> Result<Vec<Frame>> {
    let paths = enumerate_png_files(dir)?;

    let required = if require_pairable { 2 } else { 1 };
    if paths.len() < required {
        return Err(PipelineError::InsufficientFrames {
            found: paths.len(),
            required,
        });
    }

    let native_geometry = read_geometry(&paths[0])?;
    if let Some(crop) = crop {
        if crop.x + crop.w > native_geometry.0 || crop.y + crop.h > native_geometry.1 {
            return Err(PipelineError::InvalidInput(format!(
                "crop rectangle {crop:?} exceeds first frame dimensions {native_geometry:?}"
            )));
        }
    }

    let mut frames = Vec::with_capacity(paths.len());
    for (index, path) in paths.into_iter().enumerate() {
        let geometry = if index == 0 {
            native_geometry
        } else {
            let geometry = read_geometry(&path)?;
            if geometry != native_geometry {
                return Err(PipelineError::GeometryMismatch {
                    path: path.clone(),
                    got: geometry,
                    expected: native_geometry,
                });
            }
            geometry
        };

        let filename = path.file_name().and_then(|f| f.to_str()).unwrap_or_default();
        let timestamp = time_index::extract_timestamp_from_directory_name(filename);

        frames.push(Frame {
            path,
            index_in_sequence: index,
            pixel_geometry: geometry,
            timestamp,
        });
    }

    Ok(frames)
}

/// Consecutive `(Frame_i, Frame_{i+1})` pairs (spec §3 `Pair`).
pub fn consecutive_pairs(frames: &[Frame]) -> Vec<(&Frame, &Frame)> {
    frames.windows(2).map(|w| (&w[0], &w[1])).collect()
}
