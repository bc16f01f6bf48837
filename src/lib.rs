//! Interpolated-frame video pipeline for GOES-16/18 ABI imagery.
//!
//! The public surface mirrors the component lettering used throughout the
//! design: [`time_index`] (A), [`frame_source`] (B), [`preprocessor`] (C),
//! [`interpolator`] (D), [`encoder`] (E), and [`orchestrator`] (F) compose
//! into a single streaming pipeline driven by [`orchestrator::run`].

#[macro_use]
extern crate serde_derive;

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frame_source;
pub mod interpolator;
pub mod orchestrator;
pub mod preprocessor;
pub mod process_pool;
pub mod progress;
pub mod scratch;
pub mod time_index;
pub mod worker_pool;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
