//! Encoder Sink (spec §4.E): drives an `ffmpeg`-style subprocess fed PNG
//! bytes over an image-pipe demuxer, enforcing strictly increasing frame
//! ordering and surfacing broken-pipe/non-zero-exit failures distinctly.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::config::{EncoderRateControl, VideoEncoder};
use crate::error::{stderr_tail, PipelineError, Result};

/// Continuously drains `reader` into `sink` so the encoder's stdout/stderr
/// pipes never fill up and block it while frames are being written.
fn spawn_log_drain<R>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.lock().unwrap().extend_from_slice(&buf[..n]),
            }
        }
    })
}

/// Build the encoder argv per spec §4.E: image-pipe demuxer + PNG codec in,
/// configured video codec + rate control out, dimensions rounded down to
/// the nearest even number.
fn build_argv(rate_control: &EncoderRateControl, encoder: VideoEncoder, effective_fps: u32, raw_path: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "info".to_string(),
        "-stats".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        "image2pipe".to_string(),
        "-framerate".to_string(),
        effective_fps.to_string(),
        "-vcodec".to_string(),
        "png".to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-an".to_string(),
        "-vcodec".to_string(),
        encoder.codec_arg().to_string(),
        "-preset".to_string(),
        rate_control.preset.clone(),
        "-crf".to_string(),
        rate_control.crf.to_string(),
        "-b:v".to_string(),
        format!("{}k", rate_control.bitrate_kbps),
        "-bufsize".to_string(),
        format!("{}k", rate_control.bufsize_kb),
        "-pix_fmt".to_string(),
        rate_control.pix_fmt.clone(),
        "-vf".to_string(),
        "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
        raw_path.to_string_lossy().into_owned(),
    ]
}

/// Path naming convention for the intermediate artifact before any
/// orchestrator-level rename/post-processing (spec §4.E "Output path is the
/// final artifact path with a `.raw.mp4` intermediate extension").
pub fn raw_path_for(final_path: &Path) -> PathBuf {
    final_path.with_extension("raw.mp4")
}

/// A running encoder subprocess and the bookkeeping needed to enforce the
/// ordering contract and drain its combined log stream.
pub struct EncoderSink {
    child: Child,
    raw_path: PathBuf,
    last_written_index: Option<usize>,
    log_tail: Arc<Mutex<Vec<u8>>>,
    stdout_drain: Option<JoinHandle<()>>,
    stderr_drain: Option<JoinHandle<()>>,
}

impl EncoderSink {
    /// Spawn the encoder (spec §4.E "Spawn"). May fail-fast if the binary
    /// cannot be started at all. Combined stdout/stderr is drained
    /// continuously in the background so the pipe never backs up and
    /// stalls the encoder (spec §7 "retain the last 2 KiB ... as the tail").
    pub async fn spawn(
        exe: &Path,
        rate_control: &EncoderRateControl,
        encoder: VideoEncoder,
        effective_fps: u32,
        final_path: &Path,
    ) -> Result<Self> {
        let raw_path = raw_path_for(final_path);
        let argv = build_argv(rate_control, encoder, effective_fps, &raw_path);
        log::debug!("spawning encoder: {exe:?} {argv:?}");

        let mut child = Command::new(exe)
            .args(&argv)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::ExternalToolFailure {
                stderr_tail: format!("could not start encoder {exe:?}: {e}"),
                exit: None,
            })?;

        let log_tail = Arc::new(Mutex::new(Vec::new()));
        let stdout_drain = child.stdout.take().map(|r| spawn_log_drain(r, log_tail.clone()));
        let stderr_drain = child.stderr.take().map(|r| spawn_log_drain(r, log_tail.clone()));

        Ok(EncoderSink {
            child,
            raw_path,
            last_written_index: None,
            log_tail,
            stdout_drain,
            stderr_drain,
        })
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    fn tail(&self) -> String {
        stderr_tail(&self.log_tail.lock().unwrap())
    }

    /// Write one frame's PNG bytes at `frame_index` (spec §4.E "Ingest
    /// contract"). `frame_index` must be strictly greater than the last
    /// written index; violations are a bug in the orchestrator, not a
    /// recoverable user-facing condition (spec §7).
    pub async fn write(&mut self, frame_index: usize, png_bytes: &[u8]) -> Result<()> {
        if let Some(last) = self.last_written_index {
            if frame_index <= last {
                return Err(PipelineError::OrderingViolation {
                    expected: last + 1,
                    got: frame_index,
                });
            }
        }

        let stdin = self
            .child
            .stdin
            .as_mut()
            .expect("stdin piped at spawn");

        if let Err(io_err) = stdin.write_all(png_bytes).await {
            if io_err.kind() == std::io::ErrorKind::BrokenPipe {
                let _ = self.child.wait().await;
                return Err(PipelineError::EncoderDied {
                    stderr_tail: self.tail(),
                });
            }
            return Err(PipelineError::IoError(io_err));
        }

        self.last_written_index = Some(frame_index);
        Ok(())
    }

    /// Orderly shutdown (spec §4.E "Close"): close stdin, drain the log
    /// pipe to EOF, wait for the process, verify the raw artifact.
    pub async fn close(mut self) -> Result<PathBuf> {
        drop(self.child.stdin.take());

        if let Some(handle) = self.stdout_drain.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.await;
        }

        let status = self.child.wait().await.map_err(PipelineError::IoError)?;
        if !status.success() {
            return Err(PipelineError::EncoderFailure {
                exit: status.code(),
                reason: self.tail(),
            });
        }

        match std::fs::metadata(&self.raw_path) {
            Ok(meta) if meta.len() > 0 => Ok(self.raw_path),
            _ => Err(PipelineError::EncoderFailure {
                exit: status.code(),
                reason: "empty output".to_string(),
            }),
        }
    }
}
