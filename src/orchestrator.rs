//! Pipeline Orchestrator (spec §4.F): composes the frame source,
//! pre-processor, interpolator driver, and encoder sink into a single
//! streaming operation, emitting [`Event`]s as it goes.

use std::io::Read;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::encoder::EncoderSink;
use crate::error::{PipelineError, Result};
use crate::frame_source::{self, Frame};
use crate::interpolator::InterpolatorDriver;
use crate::preprocessor::{self, ProcessedFrame};
use crate::progress::{Event, ProgressSink};
use crate::scratch::ScratchDir;
use crate::worker_pool::{CancelToken, WorkerPool};

/// Run the full pipeline against `config`, emitting events on `progress` and
/// returning the final artifact path on success (spec §4.F algorithm steps
/// 1-8). `cancel` is checked cooperatively between pairs/frames.
pub async fn run(config: &PipelineConfig, progress: ProgressSink, cancel: CancelToken) -> Result<std::path::PathBuf> {
    config.validate()?;

    progress.stage("discovering frames");
    let frames = frame_source::discover_frames(&config.input_dir, config.crop_rect, !config.skip_model)?;

    let scratch = ScratchDir::new()?;
    let pool = WorkerPool::new(config.max_workers)?;

    progress.stage("spawning encoder");
    let mut sink = EncoderSink::spawn(
        &config.encoder_exe,
        &config.rate_control,
        config.encoder,
        config.effective_fps(),
        &config.output_path,
    )
    .await?;

    // Pre-process every frame exactly once, up front, on the bounded pool
    // (spec §4.C "parallelised with a bounded worker pool"; §4.H "ordered
    // result return"). Each interior frame is both the `p1` of one pair and
    // the `p0` of the next, so processing here rather than per-pair avoids
    // running crop/colourise on it twice.
    progress.stage("pre-processing frames");
    let scratch_dir_path = scratch.path().to_path_buf();
    let crop_rect = config.crop_rect;
    let false_colour = config.false_colour;
    let res_km = config.res_km;
    let colourise_exe = config.colourise_exe.clone();
    let processed: Vec<ProcessedFrame> = pool
        .map_ordered_async(frames.len(), &cancel, |i| {
            let frame = frames[i].clone();
            let scratch_dir_path = scratch_dir_path.clone();
            let colourise_exe = colourise_exe.clone();
            async move {
                preprocessor::process_one(&frame, &scratch_dir_path, crop_rect, false_colour, res_km, &colourise_exe)
                    .await
            }
        })
        .await?;

    sink.write(sink_index(0), &read_file(&processed[0].path)?).await?;

    let start = Instant::now();
    let mut last_progress_emit = Instant::now();

    if config.skip_model {
        progress.stage("writing original frames");
        for processed_frame in &processed[1..] {
            cancel.check()?;
            let index = processed_frame.source.index_in_sequence;
            sink.write(sink_index(index), &read_file(&processed_frame.path)?).await?;
            maybe_emit_progress(&progress, &mut last_progress_emit, index, frames.len() - 1, start);
        }
    } else {
        progress.stage("interpolating");
        let driver = InterpolatorDriver::discover(&config.interpolator_exe).await?;
        let total_pairs = processed.len() - 1;

        for pair_index in 0..total_pairs {
            cancel.check()?;
            let processed0 = &processed[pair_index];
            let processed1 = &processed[pair_index + 1];

            let flags = &config.interpolator_flags;
            let intermediates = driver
                .interpolate_pair(
                    pair_index,
                    &processed0.path,
                    &processed1.path,
                    scratch.path(),
                    config.num_intermediates,
                    flags.model_key.as_deref(),
                    flags.tile_size,
                    flags.uhd,
                    flags.tta_spatial,
                    flags.tta_temporal,
                    flags.thread_spec.as_deref(),
                )
                .await?;

            for (k, intermediate_path) in intermediates.iter().enumerate() {
                let index = intermediate_sink_index(&processed0.source, k);
                sink.write(index, &read_file(intermediate_path)?).await?;
                let _ = std::fs::remove_file(intermediate_path);
            }
            sink.write(sink_index(processed1.source.index_in_sequence), &read_file(&processed1.path)?)
                .await?;

            maybe_emit_final_or_periodic_progress(&progress, &mut last_progress_emit, pair_index, total_pairs, start);
        }
    }

    progress.stage("finalizing video");
    let raw_path = sink.close().await?;

    let final_path = config.output_path.clone();
    std::fs::rename(&raw_path, &final_path).map_err(PipelineError::IoError)?;

    progress.send(Event::Artifact { path: final_path.clone() });
    Ok(final_path)
}

/// Maps an original frame's sequence index to its sink write index. Indices
/// are doubled so each original frame has an open odd slot after it for
/// intermediates to occupy without ever colliding (spec §4.F step 6
/// "p0, I_0..I_{N-1}, p1" ordering).
fn sink_index(original_index: usize) -> usize {
    original_index * 2
}

/// Intermediate frames are addressed in the open interval between the two
/// original indices; `k` runs `0..N` and is packed densely since only N=1
/// is currently supported alongside the model (spec §4.D non-support rule).
fn intermediate_sink_index(p0: &Frame, k: usize) -> usize {
    sink_index(p0.index_in_sequence) + 1 + k
}

fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
    let mut file = std::fs::File::open(path).map_err(PipelineError::IoError)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(PipelineError::IoError)?;
    Ok(buf)
}

fn maybe_emit_progress(progress: &ProgressSink, last: &mut Instant, current: usize, total: usize, _start: Instant) {
    if last.elapsed().as_secs_f64() >= 1.0 || current == total {
        progress.send(Event::Progress {
            current_pair: current,
            total_pairs: total,
            eta_seconds: 0.0,
        });
        *last = Instant::now();
    }
}

fn maybe_emit_final_or_periodic_progress(
    progress: &ProgressSink,
    last: &mut Instant,
    pair_index: usize,
    total_pairs: usize,
    start: Instant,
) {
    let is_final = pair_index + 1 == total_pairs;
    if last.elapsed().as_secs_f64() >= 1.0 || is_final {
        let done = pair_index + 1;
        let elapsed = start.elapsed().as_secs_f64();
        let rate = if done > 0 { elapsed / done as f64 } else { 0.0 };
        let remaining = total_pairs.saturating_sub(done);
        progress.send(Event::Progress {
            current_pair: done,
            total_pairs,
            eta_seconds: rate * remaining as f64,
        });
        *last = Instant::now();
    }
}
