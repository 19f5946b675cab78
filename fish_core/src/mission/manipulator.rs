//! Grasp actuator seam and the executor that turns an intent into feedback.

use crate::core_modules::detection::BoundingBox;
use crate::core_modules::feedback::{ActionFeedback, ActionStatus};
use crate::core_modules::planner::ActionIntent;
use crate::telemetry::{EventBus, FishEvent};

pub trait Manipulator {
    /// One grasp attempt at the given box. True when the object was collected.
    fn attempt(&mut self, bbox: &BoundingBox) -> bool;
}

/// Succeeds for any box with a non-zero area.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubManipulator;

impl Manipulator for StubManipulator {
    fn attempt(&mut self, bbox: &BoundingBox) -> bool {
        !bbox.is_degenerate()
    }
}

pub struct ActionExecutor {
    manipulator: Box<dyn Manipulator>,
    bus: EventBus,
}

impl ActionExecutor {
    pub fn new(manipulator: Box<dyn Manipulator>, bus: EventBus) -> Self {
        Self { manipulator, bus }
    }

    /// Runs one grasp attempt. `attempt` is 1 for the first try.
    pub fn execute(&mut self, intent: &ActionIntent, attempt: u32) -> ActionFeedback {
        let success = self.manipulator.attempt(&intent.bbox);
        tracing::info!(track_id = intent.track_id, attempt, success, "grasp attempted");
        self.bus.publish(FishEvent::GraspAttempted {
            track_id: intent.track_id,
            attempt,
            success,
        });

        if success {
            ActionFeedback::new(ActionStatus::Success, Some(intent.track_id), "target collected")
        } else {
            ActionFeedback::new(ActionStatus::Failed, Some(intent.track_id), "grasp failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(bbox: BoundingBox) -> ActionIntent {
        ActionIntent {
            track_id: 12,
            class_name: "plastic".into(),
            priority_score: 1.0,
            bbox,
            reason: "test".into(),
        }
    }

    #[test]
    fn stub_rejects_degenerate_boxes() {
        let mut executor = ActionExecutor::new(Box::new(StubManipulator), EventBus::default());
        let ok = executor.execute(&intent(BoundingBox::new(0, 0, 5, 5)), 1);
        assert_eq!(ok.status, ActionStatus::Success);
        assert_eq!(ok.track_id, Some(12));

        let failed = executor.execute(&intent(BoundingBox::new(5, 5, 5, 5)), 1);
        assert_eq!(failed.status, ActionStatus::Failed);
    }
}
