//! Typed error taxonomy for the VFI pipeline (spec §4.G / §7).
//!
//! Every failure mode the pipeline can raise is a distinct variant here;
//! callers pattern-match on `PipelineError` rather than inspecting strings.
//! `Cancelled` and `OrderingViolation` are not user-visible (see §7): the
//! CLI maps `Cancelled` to a silent exit and `OrderingViolation` is only
//! ever expected to fire on an internal invariant breach.

use std::path::PathBuf;

use thiserror::Error;

/// Trailing slice of a subprocess's captured stderr/combined output,
/// bounded to 2 KiB per §7.
pub const STDERR_TAIL_BYTES: usize = 2 * 1024;

/// Truncate `bytes` to the last [`STDERR_TAIL_BYTES`] and lossily decode it.
pub fn stderr_tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient frames: found {found}, need at least {required}")]
    InsufficientFrames { found: usize, required: usize },

    #[error("geometry mismatch at {path}: got {got:?}, expected {expected:?}")]
    GeometryMismatch {
        path: PathBuf,
        got: (u32, u32),
        expected: (u32, u32),
    },

    #[error("interpolator failed for pair {pair_index} (exit {exit:?}): {stderr_tail}")]
    InterpolatorFailure {
        pair_index: usize,
        exit: Option<i32>,
        stderr_tail: String,
    },

    #[error("encoder process died: {stderr_tail}")]
    EncoderDied { stderr_tail: String },

    #[error("encoder failed (exit {exit:?}): {reason}")]
    EncoderFailure { exit: Option<i32>, reason: String },

    #[error("external tool produced no usable output: {reason}")]
    ExternalToolContract { reason: String },

    #[error("external tool failed (exit {exit:?}): {stderr_tail}")]
    ExternalToolFailure {
        stderr_tail: String,
        exit: Option<i32>,
    },

    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// Not user-visible per §7: the caller tore the pipeline down on
    /// request and should not surface this as a failure.
    #[error("pipeline cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not user-visible per §7: indicates a bug in the orchestrator's own
    /// frame-ordering logic, never a condition an external input can
    /// trigger through normal use.
    #[error("ordering violation: wrote frame {got} after {expected}")]
    OrderingViolation { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// CLI exit code mapping (spec §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InvalidInput(_) => 2,
            PipelineError::InsufficientFrames { .. } => 3,
            PipelineError::GeometryMismatch { .. } => 4,
            PipelineError::InterpolatorFailure { .. }
            | PipelineError::EncoderDied { .. }
            | PipelineError::EncoderFailure { .. }
            | PipelineError::ExternalToolContract { .. }
            | PipelineError::ExternalToolFailure { .. } => 5,
            PipelineError::Cancelled => 6,
            PipelineError::Unsupported(_)
            | PipelineError::IoError(_)
            | PipelineError::OrderingViolation { .. } => 1,
        }
    }
}
