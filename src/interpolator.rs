//! Interpolator Driver (spec §4.D): discovers the external interpolator
//! binary's capabilities once, then invokes it per consecutive frame pair,
//! demoting unsupported requests with a warning rather than failing.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{stderr_tail, PipelineError, Result};

const DEFAULT_MODEL_KEY: &str = "rife-v4.6";

/// Features of the interpolator binary discovered at startup (spec §3
/// `CapabilityFlags`). `timestep` and `gpu_id` are always assumed present —
/// every RIFE-style binary this driver has ever targeted accepts `-s` and
/// an implicit default GPU — so only the gated subset is tracked here.
#[derive(Debug, Clone, Default)]
pub struct CapabilityFlags {
    pub tiling: bool,
    pub uhd: bool,
    pub tta_spatial: bool,
    pub tta_temporal: bool,
    pub thread_spec: bool,
    pub model_path: bool,
}

impl CapabilityFlags {
    /// Parse the interpolator's help/diagnostic output into capability
    /// flags. Grounded on the conservative reading that a flag's presence
    /// anywhere in `--help` text indicates support.
    fn parse(help_text: &str) -> Self {
        CapabilityFlags {
            tiling: help_text.contains("-t ") || help_text.contains("tilesize"),
            uhd: help_text.contains("-u") || help_text.contains("uhd"),
            tta_spatial: help_text.contains("-x") || help_text.contains("spatial"),
            tta_temporal: help_text.contains("-z") || help_text.contains("temporal"),
            thread_spec: help_text.contains("-j") || help_text.contains("thread"),
            model_path: help_text.contains("-m"),
        }
    }
}

/// Owns the interpolator executable path and its cached capability set
/// (spec §4.D "Capability discovery (once, at driver construction)").
pub struct InterpolatorDriver {
    exe: PathBuf,
    capabilities: CapabilityFlags,
}

impl InterpolatorDriver {
    /// Invoke `exe` with a diagnostic argument to discover its capabilities.
    /// A failure to even start the binary is a hard error (the pipeline
    /// cannot proceed without an interpolator); a non-zero exit from the
    /// help invocation is tolerated since many RIFE builds exit non-zero on
    /// `-h`.
    pub async fn discover(exe: &Path) -> Result<Self> {
        let output = Command::new(exe).arg("-h").output().await.map_err(|e| {
            PipelineError::ExternalToolFailure {
                stderr_tail: format!("could not start interpolator {exe:?}: {e}"),
                exit: None,
            }
        })?;
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(InterpolatorDriver {
            exe: exe.to_path_buf(),
            capabilities: CapabilityFlags::parse(&combined),
        })
    }

    pub fn capabilities(&self) -> &CapabilityFlags {
        &self.capabilities
    }

    /// Build the argv for one pair invocation, demoting any requested flag
    /// the discovered capabilities don't support (spec §4.D conditional
    /// flag gating table).
    fn build_argv(
        &self,
        model_key: &str,
        p0: &Path,
        p1: &Path,
        out: &Path,
        n: u32,
        tile_size: Option<u32>,
        uhd: bool,
        tta_spatial: bool,
        tta_temporal: bool,
        thread_spec: Option<&str>,
    ) -> Vec<String> {
        let step = 1.0 / (n as f64 + 1.0);
        let mut argv = vec![
            "-m".to_string(),
            model_key.to_string(),
            "-0".to_string(),
            p0.to_string_lossy().into_owned(),
            "-1".to_string(),
            p1.to_string_lossy().into_owned(),
            "-o".to_string(),
            out.to_string_lossy().into_owned(),
            "-n".to_string(),
            n.to_string(),
            "-s".to_string(),
            format!("{step}"),
        ];

        if let Some(size) = tile_size {
            if self.capabilities.tiling {
                argv.push("-t".to_string());
                argv.push(size.to_string());
            } else {
                log::warn!("interpolator lacks tiling support, omitting -t {size}");
            }
        }
        if uhd {
            if self.capabilities.uhd {
                argv.push("-u".to_string());
            } else {
                log::warn!("interpolator lacks UHD mode, omitting -u");
            }
        }
        if tta_spatial {
            if self.capabilities.tta_spatial {
                argv.push("-x".to_string());
            } else {
                log::warn!("interpolator lacks spatial TTA, omitting -x");
            }
        }
        if tta_temporal {
            if self.capabilities.tta_temporal {
                argv.push("-z".to_string());
            } else {
                log::warn!("interpolator lacks temporal TTA, omitting -z");
            }
        }
        if let Some(spec) = thread_spec {
            if self.capabilities.thread_spec {
                argv.push("-j".to_string());
                argv.push(spec.to_string());
            } else {
                log::warn!("interpolator lacks thread-spec support, omitting -j {spec}");
            }
        }

        argv
    }

    /// Run the interpolator for one pair, producing `n` intermediate PNGs
    /// at `out_paths` (spec §4.D "Per-pair invocation"). `model_key` is
    /// demoted to the default when `model_path` support is missing.
    #[allow(clippy::too_many_arguments)]
    pub async fn interpolate_pair(
        &self,
        pair_index: usize,
        p0: &Path,
        p1: &Path,
        out_dir: &Path,
        n: u32,
        model_key: Option<&str>,
        tile_size: Option<u32>,
        uhd: bool,
        tta_spatial: bool,
        tta_temporal: bool,
        thread_spec: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let resolved_model = match model_key {
            Some(key) if key != DEFAULT_MODEL_KEY => {
                if self.capabilities.model_path {
                    key.to_string()
                } else {
                    log::warn!("interpolator lacks model_path support, using default model {DEFAULT_MODEL_KEY}");
                    DEFAULT_MODEL_KEY.to_string()
                }
            }
            _ => DEFAULT_MODEL_KEY.to_string(),
        };

        let out_path = out_dir.join(format!("interp_{pair_index:04}.png"));
        let argv = self.build_argv(
            &resolved_model,
            p0,
            p1,
            &out_path,
            n,
            tile_size,
            uhd,
            tta_spatial,
            tta_temporal,
            thread_spec,
        );

        log::debug!("running interpolator: {:?} {:?}", self.exe, argv);
        let output = Command::new(&self.exe)
            .args(&argv)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::ExternalToolFailure {
                stderr_tail: format!("could not start interpolator {:?}: {e}", self.exe),
                exit: None,
            })?;

        if !output.status.success() {
            return Err(PipelineError::InterpolatorFailure {
                pair_index,
                exit: output.status.code(),
                stderr_tail: stderr_tail(&output.stderr),
            });
        }
        if !out_path.exists() {
            return Err(PipelineError::ExternalToolContract {
                reason: format!("interpolator exited 0 but {out_path:?} was not produced for pair {pair_index}"),
            });
        }

        // RIFE-ncnn-vulkan-style binaries only ever produce a single `-o`
        // output file per invocation regardless of `-n`; n>1 is handled by
        // the orchestrator issuing n separate invocations with adjusted
        // timesteps, not modeled here since spec §4.D / config validation
        // currently restrict N to 1 whenever the model is enabled.
        Ok(vec![out_path])
    }
}
