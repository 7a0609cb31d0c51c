//! Lifecycle events for engine operations.
//!
//! Every operation run gets a v4 UUID. A run emits `started` once and then
//! exactly one of `completed` or `failed`. A failure event carries only the
//! error's display message.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub operation: String,
    pub state: ProgressState,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Set on terminal events.
    pub duration_ms: Option<u64>,
}

/// Receiver of progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: &ProgressEvent) {
        match event.state {
            ProgressState::Failed => warn!(
                run_id = %event.run_id,
                operation = %event.operation,
                duration_ms = ?event.duration_ms,
                message = ?event.message,
                "Operation failed"
            ),
            state => info!(
                run_id = %event.run_id,
                operation = %event.operation,
                ?state,
                duration_ms = ?event.duration_ms,
                "Operation progress"
            ),
        }
    }
}

/// Forwards events over a tokio channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: &ProgressEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event.clone());
    }
}

/// One run of an operation. Consuming `complete`/`fail` makes a second
/// terminal event impossible.
pub struct ProgressRun<'a> {
    sink: &'a dyn ProgressSink,
    run_id: Uuid,
    operation: String,
    started_at: DateTime<Utc>,
}

impl<'a> ProgressRun<'a> {
    pub fn start(sink: &'a dyn ProgressSink, operation: impl Into<String>) -> Self {
        let run = Self {
            sink,
            run_id: Uuid::new_v4(),
            operation: operation.into(),
            started_at: Utc::now(),
        };
        run.emit(ProgressState::Started, None);
        run
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn emit(&self, state: ProgressState, message: Option<String>) {
        let timestamp = Utc::now();
        let duration_ms = match state {
            ProgressState::Started => None,
            _ => Some((timestamp - self.started_at).num_milliseconds().max(0) as u64),
        };
        self.sink.emit(&ProgressEvent {
            run_id: self.run_id,
            operation: self.operation.clone(),
            state,
            message,
            timestamp,
            duration_ms,
        });
    }

    pub fn complete(self, message: Option<String>) {
        self.emit(ProgressState::Completed, message);
    }

    pub fn fail(self, error: &dyn std::fmt::Display) {
        self.emit(ProgressState::Failed, Some(error.to_string()));
    }

    /// Close the run from an operation result, passing the result through.
    pub fn finish<T, E: std::fmt::Display>(self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => self.complete(None),
            Err(e) => self.fail(e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbon_common::{CarbonError, EmptyKind};

    #[test]
    fn test_run_emits_started_then_completed() {
        let sink = RecordingProgress::new();
        let run = ProgressRun::start(&sink, "carbon_stock");
        let id = run.run_id();
        run.complete(Some("done".into()));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.run_id == id));
        assert_eq!(events[0].state, ProgressState::Started);
        assert_eq!(events[1].state, ProgressState::Completed);
        assert!(events[1].duration_ms.is_some());
    }

    #[test]
    fn test_failure_carries_display_message() {
        let sink = RecordingProgress::new();
        let result: Result<(), CarbonError> =
            Err(CarbonError::empty(EmptyKind::NoAnalyzableData, "2 year(s) skipped"));
        let _ = ProgressRun::start(&sink, "compare_years").finish(result);

        let events = sink.events();
        assert_eq!(events[1].state, ProgressState::Failed);
        assert_eq!(
            events[1].message.as_deref(),
            Some("Empty result: no analyzable data: 2 year(s) skipped")
        );
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelProgress::new(tx);
        ProgressRun::start(&sink, "verify").complete(None);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.state, ProgressState::Started);
        assert_eq!(rx.try_recv().unwrap().state, ProgressState::Completed);

        drop(rx);
        ProgressRun::start(&sink, "verify").complete(None);
    }

    #[test]
    fn test_event_serialization() {
        let sink = RecordingProgress::new();
        ProgressRun::start(&sink, "overlap").complete(None);
        let json = serde_json::to_value(&sink.events()[0]).unwrap();
        assert_eq!(json["state"], "started");
        assert_eq!(json["operation"], "overlap");
        assert!(json["runId"].is_string());
    }
}
