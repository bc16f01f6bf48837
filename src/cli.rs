//! Command-line surface (spec §6), replacing the teacher's Street View
//! `Cli` with the VFI pipeline's flags.

use std::path::PathBuf;
use std::str::FromStr;

use structopt::StructOpt;

use crate::config::{CropRect, EncoderRateControl, InterpolatorFlags, PipelineConfig, VideoEncoder};
use crate::error::{PipelineError, Result};

#[derive(StructOpt, Debug)]
#[structopt(name = "goesvfi", about = "Interpolate and encode a directory of GOES ABI frames into a video")]
pub struct Cli {
    /// Directory of input PNG frames.
    #[structopt(parse(from_os_str))]
    pub input_dir: PathBuf,

    /// Output video path.
    #[structopt(parse(from_os_str))]
    pub output_path: PathBuf,

    /// Output frame rate of the source frames (before interpolation), default: 10.
    #[structopt(long, default_value = "10")]
    pub fps: u32,

    /// Number of intermediate frames to generate per pair. Only 1 is
    /// supported unless --skip-model is set.
    #[structopt(long, default_value = "1")]
    pub num_intermediates: u32,

    /// Number of worker threads for pre-processing, default: number of cores (max 4).
    #[structopt(long)]
    pub max_workers: Option<usize>,

    /// Output video codec: h264 or hevc. Default: h264.
    #[structopt(long, default_value = "h264")]
    pub encoder: String,

    /// Crop rectangle as "x,y,w,h".
    #[structopt(long)]
    pub crop_rect: Option<String>,

    /// Skip AI interpolation and write original frames directly.
    #[structopt(long)]
    pub skip_model: bool,

    /// Apply false-colour rendering via the external colourise tool.
    #[structopt(long)]
    pub false_colour: bool,

    /// Colourisation resolution in km, default: 4.
    #[structopt(long, default_value = "4")]
    pub res_km: u32,

    /// Encoder constant rate factor, default: 18.
    #[structopt(long, default_value = "18")]
    pub crf: u8,

    /// Encoder target bitrate in kbps, default: 7000.
    #[structopt(long, default_value = "7000")]
    pub bitrate_kbps: u32,

    /// Encoder buffer size in KB, default: 14000.
    #[structopt(long, default_value = "14000")]
    pub bufsize_kb: u32,

    /// Encoder pixel format, default: yuv420p.
    #[structopt(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Interpolator tile size, enables tiling when set.
    #[structopt(long)]
    pub rife_tile_size: Option<u32>,

    /// Enable interpolator UHD mode.
    #[structopt(long)]
    pub rife_uhd: bool,

    /// Enable interpolator spatial test-time augmentation.
    #[structopt(long)]
    pub rife_tta_spatial: bool,

    /// Enable interpolator temporal test-time augmentation.
    #[structopt(long)]
    pub rife_tta_temporal: bool,

    /// Interpolator thread spec, e.g. "0:0:0:0".
    #[structopt(long)]
    pub rife_thread_spec: Option<String>,

    /// Interpolator model key, default: the interpolator's own default.
    #[structopt(long)]
    pub model_key: Option<String>,

    /// Path to the interpolator executable, default: rife-ncnn-vulkan.
    #[structopt(long)]
    pub interpolator_exe: Option<PathBuf>,

    /// Path to the video encoder executable, default: ffmpeg.
    #[structopt(long)]
    pub encoder_exe: Option<PathBuf>,

    /// Path to the colourise executable, default: sanchez.
    #[structopt(long)]
    pub colourise_exe: Option<PathBuf>,

    /// Print progress events as JSON lines to stdout.
    #[structopt(long)]
    pub progress: bool,
}

fn parse_crop_rect(s: &str) -> Result<CropRect> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err(PipelineError::InvalidInput(format!(
            "crop rect must be \"x,y,w,h\", got {s:?}"
        )));
    }
    let parse = |p: &str| {
        p.trim()
            .parse::<u32>()
            .map_err(|_| PipelineError::InvalidInput(format!("invalid crop rect component {p:?}")))
    };
    Ok(CropRect {
        x: parse(parts[0])?,
        y: parse(parts[1])?,
        w: parse(parts[2])?,
        h: parse(parts[3])?,
    })
}

impl Cli {
    /// Map the parsed CLI arguments to a [`PipelineConfig`] (spec §6).
    pub fn into_config(self) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();
        let crop_rect = self.crop_rect.as_deref().map(parse_crop_rect).transpose()?;

        Ok(PipelineConfig {
            input_dir: self.input_dir,
            output_path: self.output_path,
            fps: self.fps,
            num_intermediates: self.num_intermediates,
            max_workers: self.max_workers.unwrap_or(defaults.max_workers),
            encoder: VideoEncoder::from_str(&self.encoder)?,
            crop_rect,
            skip_model: self.skip_model,
            false_colour: self.false_colour,
            res_km: self.res_km,
            rate_control: EncoderRateControl {
                crf: self.crf,
                bitrate_kbps: self.bitrate_kbps,
                bufsize_kb: self.bufsize_kb,
                pix_fmt: self.pix_fmt,
                preset: defaults.rate_control.preset,
            },
            interpolator_flags: InterpolatorFlags {
                tile_size: self.rife_tile_size,
                uhd: self.rife_uhd,
                tta_spatial: self.rife_tta_spatial,
                tta_temporal: self.rife_tta_temporal,
                thread_spec: self.rife_thread_spec,
                model_key: self.model_key,
            },
            interpolator_exe: self.interpolator_exe.unwrap_or(defaults.interpolator_exe),
            encoder_exe: self.encoder_exe.unwrap_or(defaults.encoder_exe),
            colourise_exe: self.colourise_exe.unwrap_or(defaults.colourise_exe),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_crop_rect() {
        let rect = parse_crop_rect("10, 20, 300, 400").unwrap();
        assert_eq!(rect, CropRect { x: 10, y: 20, w: 300, h: 400 });
    }

    #[test]
    fn rejects_malformed_crop_rect() {
        assert!(parse_crop_rect("10,20,300").is_err());
        assert!(parse_crop_rect("a,b,c,d").is_err());
    }
}
