// THEORY:
// The decision pipeline chains the four decision components into the one call
// the per-frame loop makes:
//
//   live objects -> candidate pool -> rule gate -> reasoner -> selection lock -> planner
//
// The candidate pool is every STABLE record plus the record currently held by
// the lock (it is SELECTED, not STABLE, but must stay plannable across cycles).
//
// The pipeline also owns the one recovery the lock cannot do by itself: when a
// lock is held but the locked record has dropped out of the pool (it went
// LOST, or stopped passing the rules), no intent can ever be built for it and
// no feedback will ever release it. The pipeline releases the lock and returns
// an UNATTEMPTED command so the record is not left SELECTED forever.

use crate::config::DecisionConfig;
use crate::core_modules::aggregator::TrackedObject;
use crate::core_modules::detection::TrackId;
use crate::core_modules::feedback::ActionFeedback;
use crate::core_modules::lifecycle::{LifecycleAction, LifecycleCommand, TrackedState};
use crate::core_modules::planner::{ActionIntent, ActionPlanner};
use crate::core_modules::reasoner::{PriorityReasoner, ScoredCandidate};
use crate::core_modules::rules::RuleGate;
use crate::core_modules::selection_lock::SelectionLock;
use crate::telemetry::{EventBus, FishEvent};

/// What one decision pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionOutcome {
    /// Candidates that passed the rule gate, highest score first.
    pub ranked: Vec<ScoredCandidate>,
    pub intent: Option<ActionIntent>,
    /// SELECT command for a freshly locked target.
    pub select: Option<LifecycleCommand>,
    /// UNATTEMPTED command for a lock that had to be dropped.
    pub release: Option<LifecycleCommand>,
}

pub struct DecisionPipeline {
    rules: RuleGate,
    reasoner: PriorityReasoner,
    lock: SelectionLock,
    planner: ActionPlanner,
    bus: EventBus,
}

impl DecisionPipeline {
    pub fn new(config: &DecisionConfig, bus: EventBus) -> Self {
        Self {
            rules: RuleGate::new(&config.rules),
            reasoner: PriorityReasoner::new(&config.reasoner),
            lock: SelectionLock::new(),
            planner: ActionPlanner::new(),
            bus,
        }
    }

    pub fn run(&mut self, live: &[TrackedObject]) -> DecisionOutcome {
        let pool: Vec<TrackedObject> = live
            .iter()
            .filter(|object| matches!(object.state, TrackedState::Stable | TrackedState::Selected))
            .cloned()
            .collect();
        let ranked = self.reasoner.rank(self.rules.apply(pool));

        let select = self.lock.select_target(&ranked);
        if let Some(command) = select {
            let score = ranked
                .iter()
                .find(|c| c.object.track_id == command.track_id)
                .map_or(0.0, |c| c.score);
            self.bus.publish(FishEvent::TargetLocked {
                track_id: command.track_id,
                score,
            });
        }

        let intent = self.planner.build_intent(&ranked, self.lock.locked_target());
        let release = match intent {
            Some(_) => None,
            None => self
                .release_lock("locked target left the candidate pool")
                .map(|track_id| LifecycleCommand::new(LifecycleAction::Unattempted, track_id)),
        };

        DecisionOutcome {
            ranked,
            intent,
            select,
            release,
        }
    }

    /// Closes the current lock cycle with the result of acting on it.
    pub fn handle_action_feedback(&mut self, feedback: &ActionFeedback) -> Option<LifecycleCommand> {
        let command = self.lock.handle_action_feedback(feedback)?;
        self.bus.publish(FishEvent::LockReleased {
            track_id: command.track_id,
            reason: feedback.reason.clone(),
        });
        Some(command)
    }

    /// Drops the lock without feedback, returning the id that was held.
    pub fn release_lock(&mut self, reason: &str) -> Option<TrackId> {
        let track_id = self.lock.release()?;
        tracing::info!(track_id, reason, "lock dropped");
        self.bus.publish(FishEvent::LockReleased {
            track_id,
            reason: reason.to_string(),
        });
        Some(track_id)
    }

    pub fn locked_target(&self) -> Option<TrackId> {
        self.lock.locked_target()
    }
}
