//! Progress event stream for the pipeline orchestrator (spec §4.F, §9).
//!
//! The orchestrator is specified as a producer of an event sequence; this
//! module is the realisation of that "streaming contract" as a `tokio`
//! channel of [`Event`] values, plus the JSON line printer the CLI uses to
//! surface them the way the teacher CLI printed `PROGRESS`/`PROGRESS_STAGE`
//! lines.

use std::path::PathBuf;

use serde::Serialize;

/// One emitted pipeline event. `Progress` is emitted at most once per
/// wall-clock second (always once on the final pair); `Artifact` is
/// emitted exactly once, on success, as the last event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "PROGRESS")]
    Progress {
        current_pair: usize,
        total_pairs: usize,
        eta_seconds: f64,
    },
    #[serde(rename = "PROGRESS_STAGE")]
    Stage { stage: String },
    #[serde(rename = "ARTIFACT")]
    Artifact { path: PathBuf },
}

/// Sink half of the event stream, held by the orchestrator. Cloneable so
/// worker-pool tasks could in principle report too, though today only the
/// orchestrator thread ever sends (§5's locking discipline).
#[derive(Clone)]
pub struct ProgressSink {
    tx: tokio::sync::mpsc::UnboundedSender<Event>,
}

impl ProgressSink {
    pub fn send(&self, event: Event) {
        // A dropped receiver (caller stopped listening) is not a pipeline
        // failure; the orchestrator keeps running to completion either way.
        let _ = self.tx.send(event);
    }

    pub fn stage(&self, stage: &str) {
        self.send(Event::Stage {
            stage: stage.to_string(),
        });
    }
}

/// Create a linked `(ProgressSink, Receiver<Event>)` pair.
pub fn channel() -> (ProgressSink, tokio::sync::mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (ProgressSink { tx }, rx)
}

/// Print an event as a single JSON line, matching the teacher CLI's
/// `progress()`/`progress_stage()` helpers.
pub fn print_json(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => log::error!("failed to serialize progress event: {e}"),
    }
}
