//! Scoped scratch directory for intermediate per-pipeline artifacts (spec
//! §4.F step 3, §4.H). Created on pipeline start, recursively removed on
//! every exit path via `Drop`.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{PipelineError, Result};

/// Owns a unique temporary directory for one pipeline run's crop/colourise/
/// interpolation intermediates. Removed automatically when dropped,
/// regardless of success, failure, or cancellation.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("goesvfi_")
            .tempdir()
            .map_err(PipelineError::IoError)?;
        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path-disjoint naming scheme for a role-tagged scratch file, e.g.
    /// `p0_0007.png` or `interp_0007.png` (spec §4.H).
    pub fn named(&self, role: &str, index: usize) -> PathBuf {
        self.dir.path().join(format!("{role}_{index:04}.png"))
    }
}
