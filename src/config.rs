//! Pipeline configuration (spec §6 CLI surface, §10.4).
//!
//! `PipelineConfig` is the single structured configuration type consumed by
//! the orchestrator (§4.F). The CLI (`src/cli.rs`) builds one from argv;
//! library embedders can build one directly and call [`PipelineConfig::validate`].

use std::path::PathBuf;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoder {
    H264,
    Hevc,
}

impl Default for VideoEncoder {
    fn default() -> Self {
        VideoEncoder::H264
    }
}

impl VideoEncoder {
    pub fn codec_arg(self) -> &'static str {
        match self {
            VideoEncoder::H264 => "libx264",
            VideoEncoder::Hevc => "libx265",
        }
    }
}

impl std::str::FromStr for VideoEncoder {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "h264" => Ok(VideoEncoder::H264),
            "hevc" => Ok(VideoEncoder::Hevc),
            other => Err(PipelineError::InvalidInput(format!(
                "unknown encoder {other:?}, expected h264 or hevc"
            ))),
        }
    }
}

/// Rate-control and pixel-format parameters forwarded to the encoder sink
/// (spec §4.E). Defaults mirror the original Python worker's defaults
/// (`crf=18`, `bitrate_kbps=7000`, `bufsize_kb=14000`, `pix_fmt=yuv420p`).
#[derive(Debug, Clone)]
pub struct EncoderRateControl {
    pub crf: u8,
    pub bitrate_kbps: u32,
    pub bufsize_kb: u32,
    pub pix_fmt: String,
    pub preset: String,
}

impl Default for EncoderRateControl {
    fn default() -> Self {
        EncoderRateControl {
            crf: 18,
            bitrate_kbps: 7000,
            bufsize_kb: 14000,
            pix_fmt: "yuv420p".to_string(),
            preset: "veryfast".to_string(),
        }
    }
}

/// Conditional flags forwarded to the interpolator subprocess, subject to
/// capability gating (spec §4.D table).
#[derive(Debug, Clone, Default)]
pub struct InterpolatorFlags {
    pub tile_size: Option<u32>,
    pub uhd: bool,
    pub tta_spatial: bool,
    pub tta_temporal: bool,
    pub thread_spec: Option<String>,
    pub model_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub fps: u32,
    pub num_intermediates: u32,
    pub max_workers: usize,
    pub encoder: VideoEncoder,
    pub crop_rect: Option<CropRect>,
    pub skip_model: bool,
    pub false_colour: bool,
    pub res_km: u32,
    pub rate_control: EncoderRateControl,
    pub interpolator_flags: InterpolatorFlags,
    pub interpolator_exe: PathBuf,
    pub encoder_exe: PathBuf,
    pub colourise_exe: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_dir: PathBuf::new(),
            output_path: PathBuf::from("output.mp4"),
            fps: 30,
            num_intermediates: 1,
            max_workers: num_cpus::get().max(1).min(4),
            encoder: VideoEncoder::default(),
            crop_rect: None,
            skip_model: false,
            false_colour: false,
            res_km: 4,
            rate_control: EncoderRateControl::default(),
            interpolator_flags: InterpolatorFlags::default(),
            interpolator_exe: PathBuf::from("rife-ncnn-vulkan"),
            encoder_exe: PathBuf::from("ffmpeg"),
            colourise_exe: PathBuf::from("sanchez"),
        }
    }
}

impl PipelineConfig {
    /// Validate cross-field configuration invariants (spec §4.F step 1,
    /// §8 boundary behaviors). Does not touch the filesystem; geometry
    /// against the actual first frame is validated later by the frame
    /// source (spec §4.B).
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(PipelineError::InvalidInput("fps must be > 0".into()));
        }
        if self.num_intermediates == 0 {
            return Err(PipelineError::InvalidInput(
                "num_intermediates must be > 0".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(PipelineError::InvalidInput(
                "max_workers must be > 0".into(),
            ));
        }
        if !self.skip_model && self.num_intermediates != 1 {
            // Spec §4.D / §9 open question 3: recursive N>1 support is
            // unimplemented upstream; make it an explicit typed error
            // rather than silently truncating or guessing intent.
            return Err(PipelineError::Unsupported(
                "only num_intermediates=1 is supported with the interpolator model enabled".into(),
            ));
        }
        if let Some(crop) = self.crop_rect {
            if crop.w == 0 || crop.h == 0 {
                return Err(PipelineError::InvalidInput(
                    "crop width and height must be positive".into(),
                ));
            }
        }
        Ok(())
    }

    /// `effective_fps` as defined in spec §4.E / §8 property 6.
    pub fn effective_fps(&self) -> u32 {
        if self.skip_model {
            self.fps
        } else {
            self.fps * (self.num_intermediates + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_fps() {
        let mut cfg = PipelineConfig::default();
        cfg.fps = 0;
        assert!(matches!(cfg.validate(), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn rejects_n3_with_model_enabled() {
        let mut cfg = PipelineConfig::default();
        cfg.num_intermediates = 3;
        cfg.skip_model = false;
        assert!(matches!(cfg.validate(), Err(PipelineError::Unsupported(_))));
    }

    #[test]
    fn n3_allowed_when_skipping_model() {
        let mut cfg = PipelineConfig::default();
        cfg.num_intermediates = 3;
        cfg.skip_model = true;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn effective_fps_doubles_for_one_intermediate() {
        let mut cfg = PipelineConfig::default();
        cfg.fps = 30;
        cfg.num_intermediates = 1;
        cfg.skip_model = false;
        assert_eq!(cfg.effective_fps(), 60);
    }

    #[test]
    fn effective_fps_matches_fps_when_skipping() {
        let mut cfg = PipelineConfig::default();
        cfg.fps = 30;
        cfg.skip_model = true;
        assert_eq!(cfg.effective_fps(), 30);
    }
}
