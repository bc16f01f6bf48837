//! Frame Pre-processor (spec §4.C): turns a raw [`Frame`] into a
//! [`ProcessedFrame`] ready for the interpolator or encoder — applying the
//! crop rectangle uniformly and, when requested, delegating false-colour
//! rendering to the external `sanchez` binary.

use std::path::{Path, PathBuf};

use image::GenericImageView;
use tokio::process::Command;

use crate::config::CropRect;
use crate::error::{stderr_tail, PipelineError, Result};
use crate::frame_source::Frame;
use crate::worker_pool::{CancelToken, WorkerPool};

/// A frame that has passed through cropping and (optionally) false-colour
/// rendering, ready to be handed to the interpolator or encoder.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub source: Frame,
    pub path: PathBuf,
    pub geometry: (u32, u32),
}

/// Crop `src` to `crop` and write the result to `dest` as a PNG (spec
/// §4.C step 1, "uniform crop applied to every frame in the cohort").
fn apply_crop(src: &Path, dest: &Path, crop: CropRect) -> Result<(u32, u32)> {
    let img = image::open(src).map_err(|e| PipelineError::InvalidInput(format!("could not open {src:?}: {e}")))?;
    let cropped = img.view(crop.x, crop.y, crop.w, crop.h).to_image();
    cropped
        .save(dest)
        .map_err(|e| PipelineError::InvalidInput(format!("could not write {dest:?}: {e}")))?;
    Ok((crop.w, crop.h))
}

/// Invoke the external false-colour renderer on `src`, writing its output to
/// `dest` (spec §4.C step 2, grounded on `sanchez_enabled` /
/// `sanchez_resolution_km` in the original `WorkerFactory`). A zero exit
/// status with no output file is a contract violation, not a tool failure:
/// the binary claimed success but produced nothing.
async fn colourise(exe: &Path, src: &Path, dest: &Path, res_km: u32) -> Result<()> {
    let output = Command::new(exe)
        .arg("-i")
        .arg(src)
        .arg("-o")
        .arg(dest)
        .arg("-r")
        .arg(res_km.to_string())
        .output()
        .await
        .map_err(|e| PipelineError::ExternalToolFailure {
            stderr_tail: format!("could not start colourise tool {exe:?}: {e}"),
            exit: None,
        })?;

    if !output.status.success() {
        return Err(PipelineError::ExternalToolFailure {
            stderr_tail: stderr_tail(&output.stderr),
            exit: output.status.code(),
        });
    }
    if !dest.exists() {
        return Err(PipelineError::ExternalToolContract {
            reason: format!("sanchez exited 0 but {dest:?} was not produced"),
        });
    }
    Ok(())
}

/// Pre-process one frame in place within `scratch_dir`, returning the
/// resulting [`ProcessedFrame`]. Synchronous (crop) and async (colourise)
/// work are interleaved via a small blocking bridge since the crop runs on
/// the worker pool's rayon threads while colourise spawns a subprocess; the
/// orchestrator calls this from within a `tokio` runtime.
pub async fn process_one(
    frame: &Frame,
    scratch_dir: &Path,
    crop: Option<CropRect>,
    false_colour: bool,
    res_km: u32,
    colourise_exe: &Path,
) -> Result<ProcessedFrame> {
    let mut current_path = frame.path.clone();
    let mut geometry = frame.pixel_geometry;

    if let Some(crop) = crop {
        let cropped_path = scratch_dir.join(format!("crop_{:04}.png", frame.index_in_sequence));
        let (src, dest) = (current_path.clone(), cropped_path.clone());
        let (w, h) = tokio::task::spawn_blocking(move || apply_crop(&src, &dest, crop))
            .await
            .map_err(|e| PipelineError::InvalidInput(format!("crop task panicked: {e}")))??;
        current_path = cropped_path;
        geometry = (w, h);
    }

    if false_colour {
        let coloured_path = scratch_dir.join(format!("colour_{:04}.png", frame.index_in_sequence));
        colourise(colourise_exe, &current_path, &coloured_path, res_km).await?;
        current_path = coloured_path;
    }

    Ok(ProcessedFrame {
        source: frame.clone(),
        path: current_path,
        geometry,
    })
}

/// Crop every frame in `frames` in parallel on the worker pool (spec §4.C
/// "Parallelizable across frames; ordering is preserved on return"). False
/// colour, being subprocess/async work, is applied afterward on the tokio
/// runtime rather than inside the rayon pool.
pub fn crop_all(pool: &WorkerPool, cancel: &CancelToken, frames: &[Frame], scratch_dir: &Path, crop: CropRect) -> Result<Vec<PathBuf>> {
    pool.map_ordered(frames.len(), cancel, |i| {
        let frame = &frames[i];
        let dest = scratch_dir.join(format!("crop_{:04}.png", frame.index_in_sequence));
        apply_crop(&frame.path, &dest, crop)?;
        Ok(dest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    fn write_png(path: &Path, w: u32, h: u32) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(w, h);
        img.save(path).unwrap();
    }

    fn dummy_frame(path: PathBuf, geometry: (u32, u32)) -> Frame {
        Frame {
            path,
            index_in_sequence: 0,
            pixel_geometry: geometry,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn crop_is_applied_and_written() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 64, 64);

        let frame = dummy_frame(src, (64, 64));
        let crop = CropRect { x: 0, y: 0, w: 32, h: 32 };
        let processed = process_one(&frame, dir.path(), Some(crop), false, 4, Path::new("sanchez"))
            .await
            .unwrap();

        assert_eq!(processed.geometry, (32, 32));
        assert_eq!(image::image_dimensions(&processed.path).unwrap(), (32, 32));
    }

    #[tokio::test]
    async fn no_op_passthrough_when_nothing_requested() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 64, 64);

        let frame = dummy_frame(src.clone(), (64, 64));
        let processed = process_one(&frame, dir.path(), None, false, 4, Path::new("sanchez"))
            .await
            .unwrap();

        assert_eq!(processed.path, src);
        assert_eq!(processed.geometry, (64, 64));
    }

    #[test]
    fn crop_all_preserves_order() {
        let dir = tempdir().unwrap();
        let mut frames = Vec::new();
        for i in 0..5 {
            let path = dir.path().join(format!("f{i}.png"));
            write_png(&path, 64, 64);
            frames.push(Frame {
                path,
                index_in_sequence: i,
                pixel_geometry: (64, 64),
                timestamp: None,
            });
        }
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let crop = CropRect { x: 0, y: 0, w: 16, h: 16 };
        let outputs = crop_all(&pool, &cancel, &frames, dir.path(), crop).unwrap();
        for (i, path) in outputs.iter().enumerate() {
            assert!(path.to_string_lossy().contains(&format!("{i:04}")));
        }
    }
}
