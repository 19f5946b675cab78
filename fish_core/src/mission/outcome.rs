//! One record per object that reached a terminal outcome.
//!
//! The logger writes at most once per track id, however many times the same
//! terminal feedback is reported.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_modules::aggregator::TrackedObject;
use crate::core_modules::detection::TrackId;
use crate::core_modules::feedback::{ActionFeedback, ActionStatus};
use crate::core_modules::lifecycle::TrackedState;
use crate::core_modules::planner::ActionIntent;
use crate::error::Result;
use crate::telemetry::{EventBus, FishEvent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    pub track_id: TrackId,
    pub class_name: String,
    pub final_status: ActionStatus,
    /// Lifecycle state after the feedback was applied, when the record is
    /// still in memory.
    pub lifecycle_state: Option<TrackedState>,
    pub priority_score: f64,
    pub age: Option<u32>,
    pub avg_confidence: Option<f64>,
    pub first_seen_frame: Option<u64>,
    pub last_seen_frame: Option<u64>,
    pub selected_at_frame: Option<u64>,
    pub reason: String,
}

pub trait OutcomeSink {
    fn write(&mut self, record: &OutcomeRecord) -> Result<()>;
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutcomeSink for JsonLinesSink<W> {
    fn write(&mut self, record: &OutcomeRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<OutcomeRecord>,
}

impl OutcomeSink for MemorySink {
    fn write(&mut self, record: &OutcomeRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

pub struct OutcomeLogger {
    sink: Box<dyn OutcomeSink>,
    logged_ids: HashSet<TrackId>,
    bus: EventBus,
}

impl OutcomeLogger {
    pub fn new(sink: Box<dyn OutcomeSink>, bus: EventBus) -> Self {
        Self {
            sink,
            logged_ids: HashSet::new(),
            bus,
        }
    }

    /// Writes a record for a terminal outcome. Returns false when the status
    /// is not terminal or the track was already logged.
    pub fn record(
        &mut self,
        intent: &ActionIntent,
        feedback: &ActionFeedback,
        object: Option<&TrackedObject>,
    ) -> Result<bool> {
        if !feedback.status.is_terminal() || self.logged_ids.contains(&intent.track_id) {
            return Ok(false);
        }

        let record = OutcomeRecord {
            timestamp: Utc::now(),
            track_id: intent.track_id,
            class_name: intent.class_name.clone(),
            final_status: feedback.status,
            lifecycle_state: object.map(|o| o.state),
            priority_score: intent.priority_score,
            age: object.map(|o| o.age),
            avg_confidence: object.map(|o| o.avg_confidence),
            first_seen_frame: object.map(|o| o.first_seen_frame),
            last_seen_frame: object.map(|o| o.last_seen_frame),
            selected_at_frame: object.and_then(|o| o.selected_at_frame),
            reason: feedback.reason.clone(),
        };
        self.sink.write(&record)?;
        self.logged_ids.insert(intent.track_id);

        tracing::info!(track_id = intent.track_id, status = %feedback.status, "outcome recorded");
        self.bus.publish(FishEvent::OutcomeRecorded {
            track_id: intent.track_id,
            status: feedback.status,
        });
        Ok(true)
    }

    pub fn logged(&self) -> usize {
        self.logged_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::detection::BoundingBox;

    fn intent(track_id: TrackId) -> ActionIntent {
        ActionIntent {
            track_id,
            class_name: "net".into(),
            priority_score: 1.7,
            bbox: BoundingBox::new(0, 0, 10, 10),
            reason: "locked target".into(),
        }
    }

    #[test]
    fn logs_each_track_once() {
        let mut logger = OutcomeLogger::new(Box::new(MemorySink::default()), EventBus::default());
        let done = ActionFeedback::new(ActionStatus::Success, Some(1), "target collected");
        assert!(logger.record(&intent(1), &done, None).unwrap());
        assert!(!logger.record(&intent(1), &done, None).unwrap());
        let failed = ActionFeedback::new(ActionStatus::Failed, Some(1), "grasp failed");
        assert!(!logger.record(&intent(1), &failed, None).unwrap());
        assert_eq!(logger.logged(), 1);
    }

    #[test]
    fn non_terminal_feedback_is_not_logged() {
        let mut logger = OutcomeLogger::new(Box::new(MemorySink::default()), EventBus::default());
        let moved = ActionFeedback::new(ActionStatus::MovedForward, Some(2), "");
        assert!(!logger.record(&intent(2), &moved, None).unwrap());
        assert_eq!(logger.logged(), 0);
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let record = OutcomeRecord {
            timestamp: Utc::now(),
            track_id: 3,
            class_name: "glass".into(),
            final_status: ActionStatus::Failed,
            lifecycle_state: Some(TrackedState::Lost),
            priority_score: 1.2,
            age: Some(6),
            avg_confidence: Some(0.8),
            first_seen_frame: Some(1),
            last_seen_frame: Some(6),
            selected_at_frame: Some(4),
            reason: "grasp failed".into(),
        };
        sink.write(&record).unwrap();
        sink.write(&record).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: OutcomeRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, record);
    }
}
