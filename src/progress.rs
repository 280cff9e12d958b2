//! Progress reporting between the pipeline worker and its consumer.
//!
//! The pipeline produces [`ProgressEvent`]s; whoever wants to display them
//! (a progress bar, a log, nothing) consumes them from the other end of a
//! channel. The worker never touches consumer-owned state directly, so the
//! pipeline can run on any thread without the consumer caring.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// The pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    /// Pulling embedded images out of the document.
    Extracting,
    /// Rendering whole pages in the fallback path.
    Flattening,
    /// Running the line-removal filter.
    Restoring,
    /// Building the output document.
    Assembling,
    /// Everything finished.
    Done,
}

impl ProgressPhase {
    /// Human-readable phase label.
    pub fn label(&self) -> &'static str {
        match self {
            ProgressPhase::Extracting => "extracting images",
            ProgressPhase::Flattening => "flattening and processing",
            ProgressPhase::Restoring => "restoring pages",
            ProgressPhase::Assembling => "assembling document",
            ProgressPhase::Done => "completed",
        }
    }
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One unit of completed work, as reported to the consumer.
///
/// Within a phase, `completed` and `total` are monotonically
/// non-decreasing. Events are notifications, never state: dropping them
/// loses nothing but display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Completed units of work in the current phase.
    pub completed: usize,
    /// Total units of work in the current phase.
    pub total: usize,
    /// The current phase.
    pub phase: ProgressPhase,
}

/// Producer end of the progress channel, held by pipeline stages.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sender: Option<Sender<ProgressEvent>>,
}

impl ProgressSink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    /// Create a sink that discards every event.
    pub fn sink_only() -> Self {
        Self { sender: None }
    }

    /// Report one completed unit of work.
    ///
    /// Best-effort: a disconnected receiver is ignored, progress is
    /// advisory and must never fail the pipeline.
    pub fn report(&self, completed: usize, total: usize, phase: ProgressPhase) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressEvent {
                completed,
                total,
                phase,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_labels() {
        assert_eq!(ProgressPhase::Extracting.label(), "extracting images");
        assert_eq!(
            ProgressPhase::Flattening.label(),
            "flattening and processing"
        );
        assert_eq!(ProgressPhase::Done.to_string(), "completed");
    }

    #[test]
    fn test_channel_delivers_events() {
        let (sink, rx) = ProgressSink::channel();
        sink.report(1, 3, ProgressPhase::Restoring);
        sink.report(2, 3, ProgressPhase::Restoring);
        drop(sink);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].completed, 1);
        assert_eq!(events[1].completed, 2);
        assert_eq!(events[1].phase, ProgressPhase::Restoring);
    }

    #[test]
    fn test_sink_only_discards() {
        let sink = ProgressSink::sink_only();
        sink.report(1, 1, ProgressPhase::Done);
    }

    #[test]
    fn test_disconnected_receiver_is_ignored() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.report(1, 1, ProgressPhase::Done);
    }
}
