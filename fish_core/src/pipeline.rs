// THEORY:
// The `pipeline` module is the top-level API of the core. It wires every
// component into the per-frame perceive-decide-act cycle and exposes a single
// call, `process_frame`, that a driver makes once per incoming frame.
//
// One cycle, strictly in this order:
//   1. aggregate the frame's detections into tracked objects,
//   2. decide: rank candidates, lock a target, build an intent,
//   3. apply the SELECT (or stale-lock release) command to the aggregator,
//   4. project the intent's box into robot-relative coordinates,
//   5. tick the mission planner, which grasps, sweeps, unloads or advances,
//   6. turn the feedback into the lifecycle command that closes the lock cycle,
//   7. record terminal outcomes once per track.
//
// The driver stops calling once `mission_is_active` turns false.

use serde::Serialize;

use crate::config::FishConfig;
use crate::core_modules::aggregator::Aggregator;
use crate::core_modules::detection::Detection;
use crate::core_modules::feedback::ActionFeedback;
use crate::core_modules::lifecycle::LifecycleCommand;
use crate::core_modules::planner::ActionIntent;
use crate::core_modules::projection::CameraToWorldProjector;
use crate::decision::DecisionPipeline;
use crate::error::{FishError, Result};
use crate::mission::environment::EnvironmentModel;
use crate::mission::manipulator::{Manipulator, StubManipulator};
use crate::mission::navigator::{Navigator, SweepNavigator};
use crate::mission::outcome::{OutcomeLogger, OutcomeSink};
use crate::mission::planner::MissionPlanner;
use crate::mission::types::MissionPhase;
use crate::telemetry::{EventBus, Notifier};

/// Summary of one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub frame_index: u64,
    /// Tracked objects neither DONE nor LOST after this frame.
    pub live_tracks: usize,
    pub intent: Option<ActionIntent>,
    /// `None` when the planner was not ticked this frame.
    pub feedback: Option<ActionFeedback>,
    /// Mission phase at the end of the cycle.
    pub phase: MissionPhase,
    /// True when there was no intent and the vehicle only navigated.
    pub navigation_only: bool,
}

pub struct FishPipeline {
    aggregator: Aggregator,
    decision: DecisionPipeline,
    projector: CameraToWorldProjector,
    mission: MissionPlanner,
    outcomes: OutcomeLogger,
    bus: EventBus,
}

impl FishPipeline {
    pub fn new(
        config: &FishConfig,
        navigator: Box<dyn Navigator>,
        manipulator: Box<dyn Manipulator>,
        environment: Box<dyn EnvironmentModel>,
        sink: Box<dyn OutcomeSink>,
        bus: EventBus,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(config.aggregator.clone(), bus.clone()),
            decision: DecisionPipeline::new(&config.decision, bus.clone()),
            projector: CameraToWorldProjector::new(&config.projection),
            mission: MissionPlanner::new(
                config,
                navigator,
                manipulator,
                environment,
                Notifier::new(bus.clone()),
            ),
            outcomes: OutcomeLogger::new(sink, bus.clone()),
            bus,
        }
    }

    /// Pipeline with the sweep navigator, the stub manipulator and the
    /// configured environment model.
    pub fn from_config(config: &FishConfig, sink: Box<dyn OutcomeSink>, bus: EventBus) -> Self {
        Self::new(
            config,
            Box::new(SweepNavigator::new(&config.mission)),
            Box::new(StubManipulator),
            config.environment.build(),
            sink,
            bus,
        )
    }

    pub fn process_frame(&mut self, detections: &[Detection]) -> Result<CycleReport> {
        if !self.mission.mission_is_active() {
            return Err(FishError::MissionInactive(self.mission.phase()));
        }

        // --- 1. Aggregate ---
        let live = self.aggregator.update(detections);

        // --- 2. Decide ---
        let outcome = self.decision.run(&live);
        if let Some(release) = outcome.release {
            self.aggregator.apply_lifecycle_change(release);
        }

        // --- 3. Lock ---
        let mut intent = outcome.intent;
        if let Some(select) = outcome.select {
            if !self.aggregator.apply_lifecycle_change(select) {
                self.decision.release_lock("selection refused by aggregator");
                intent = None;
            }
        }
        let navigation_only = intent.is_none();

        // --- 4. Project ---
        let world = intent
            .as_ref()
            .map(|i| self.projector.project(i.track_id, i.bbox));

        let frame_index = self.aggregator.frame_count();
        if !self.mission.action_is_allowed() {
            tracing::debug!(frame_index, phase = %self.mission.phase(), "action not allowed, tick skipped");
            return Ok(CycleReport {
                frame_index,
                live_tracks: live.len(),
                intent,
                feedback: None,
                phase: self.mission.phase(),
                navigation_only,
            });
        }

        // --- 5. Act ---
        let feedback = self.mission.tick(intent.as_ref(), world.as_ref())?;

        // --- 6. Close the lock cycle ---
        if let Some(command) = self.decision.handle_action_feedback(&feedback) {
            self.aggregator.apply_lifecycle_change(command);
        }

        // --- 7. Record ---
        if let Some(intent) = intent.as_ref() {
            if feedback.track_id == Some(intent.track_id) {
                self.outcomes
                    .record(intent, &feedback, self.aggregator.get(intent.track_id))?;
            }
        }

        Ok(CycleReport {
            frame_index,
            live_tracks: live.len(),
            intent,
            feedback: Some(feedback),
            phase: self.mission.phase(),
            navigation_only,
        })
    }

    /// Applies a lifecycle command issued outside the frame cycle, such as an
    /// operator selecting a track by hand. A track selected this way blocks
    /// the decision layer's own SELECT until it is released.
    pub fn apply_lifecycle_change(&mut self, command: LifecycleCommand) -> bool {
        self.aggregator.apply_lifecycle_change(command)
    }

    pub fn mission_is_active(&self) -> bool {
        self.mission.mission_is_active()
    }

    pub fn mission(&self) -> &MissionPlanner {
        &self.mission
    }

    pub fn mission_mut(&mut self) -> &mut MissionPlanner {
        &mut self.mission
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn outcomes(&self) -> &OutcomeLogger {
        &self.outcomes
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::detection::BoundingBox;
    use crate::core_modules::feedback::ActionStatus;
    use crate::core_modules::lifecycle::{LifecycleAction, TrackedState};
    use crate::mission::outcome::MemorySink;
    use crate::telemetry::{drain_pending, FishEvent};

    fn detection(track_id: u64, height: i32) -> Detection {
        scored_detection(track_id, height, 0.9)
    }

    fn scored_detection(track_id: u64, height: i32, confidence: f64) -> Detection {
        Detection {
            class_id: 0,
            class_name: "plastic".into(),
            confidence,
            bbox: BoundingBox::new(900, 0, 1020, height),
            track_id: Some(track_id),
        }
    }

    #[test]
    fn close_target_is_collected_once_stable() {
        let config = FishConfig::default();
        let mut pipeline = FishPipeline::from_config(&config, Box::new(MemorySink::default()), EventBus::default());

        // Tall box: projected distance 2 / 400 = 0.005, within reach.
        let frame = [detection(1, 400)];
        let mut reports = Vec::new();
        for _ in 0..3 {
            reports.push(pipeline.process_frame(&frame).unwrap());
        }

        assert!(reports[0].navigation_only);
        assert!(reports[1].navigation_only);
        let last = &reports[2];
        assert_eq!(last.intent.as_ref().map(|i| i.track_id), Some(1));
        assert_eq!(last.feedback.as_ref().map(|f| f.status), Some(ActionStatus::Success));
        assert_eq!(pipeline.aggregator().get(1).map(|o| o.state), Some(TrackedState::Done));
        assert_eq!(pipeline.outcomes().logged(), 1);
        assert_eq!(pipeline.mission().bin().load(), 1);

        // Collected objects never come back.
        let report = pipeline.process_frame(&frame).unwrap();
        assert!(report.navigation_only);
        assert_eq!(report.live_tracks, 0);
    }

    #[test]
    fn distant_target_is_released_as_unattempted() {
        let config = FishConfig::default();
        let mut pipeline = FishPipeline::from_config(&config, Box::new(MemorySink::default()), EventBus::default());

        let frame = [detection(2, 20)];
        for _ in 0..2 {
            pipeline.process_frame(&frame).unwrap();
        }
        let report = pipeline.process_frame(&frame).unwrap();
        assert_eq!(
            report.feedback.as_ref().map(|f| f.status),
            Some(ActionStatus::MovedForward)
        );
        assert_eq!(
            pipeline.aggregator().get(2).map(|o| o.state),
            Some(TrackedState::Unattempted)
        );
        assert_eq!(pipeline.outcomes().logged(), 0);

        // Seen again, it rejoins the pool and is locked afresh.
        let report = pipeline.process_frame(&frame).unwrap();
        assert_eq!(report.intent.map(|i| i.track_id), Some(2));
    }

    #[test]
    fn refused_selection_drops_the_lock_and_the_intent() {
        let mut config = FishConfig::default();
        config.aggregator.stable_age = 1;
        config.decision.rules.min_age = 1;
        let mut pipeline = FishPipeline::from_config(&config, Box::new(MemorySink::default()), EventBus::default());

        // Both distant. Track 1 ranks higher, is locked, and released as UNATTEMPTED.
        let frame = [scored_detection(1, 20, 0.9), scored_detection(2, 20, 0.6)];
        let report = pipeline.process_frame(&frame).unwrap();
        assert_eq!(report.intent.map(|i| i.track_id), Some(1));
        assert_eq!(pipeline.aggregator().get(1).map(|o| o.state), Some(TrackedState::Unattempted));

        // An operator claims track 2 between frames.
        assert!(pipeline.apply_lifecycle_change(LifecycleCommand::new(LifecycleAction::Select, 2)));

        let mut rx = pipeline.bus().subscribe();
        let report = pipeline.process_frame(&frame).unwrap();
        assert_eq!(report.intent, None);
        assert!(report.navigation_only);
        assert_eq!(pipeline.aggregator().selected_id(), Some(2));
        assert_eq!(pipeline.aggregator().get(1).map(|o| o.state), Some(TrackedState::Stable));

        let events = drain_pending(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            FishEvent::CommandApplied { command, applied: false }
                if *command == LifecycleCommand::new(LifecycleAction::Select, 1)
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            FishEvent::LockReleased { track_id: 1, reason } if reason == "selection refused by aggregator"
        )));
    }
}
