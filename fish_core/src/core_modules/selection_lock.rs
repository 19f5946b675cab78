// THEORY:
// The selection lock is the decision layer's short-term memory: it holds at
// most one `active_track_id`, the object the vehicle is currently committed to.
//
// Key architectural principles:
// 1.  **One target at a time**: `select_target` only fires while unlocked.
// 2.  **One lock cycle = one attempt**: `handle_action_feedback` converts the
//     result of acting on the locked target into exactly one lifecycle command
//     and always releases the lock, success or failure. A failed grasp can
//     never leave the lock stuck.
// 3.  **Stale feedback is ignored**: feedback for any id other than the locked
//     one changes nothing.

use crate::core_modules::detection::TrackId;
use crate::core_modules::feedback::{ActionFeedback, ActionStatus};
use crate::core_modules::lifecycle::{LifecycleAction, LifecycleCommand};
use crate::core_modules::reasoner::ScoredCandidate;

#[derive(Debug, Default)]
pub struct SelectionLock {
    active_track_id: Option<TrackId>,
}

impl SelectionLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked_target(&self) -> Option<TrackId> {
        self.active_track_id
    }

    pub fn is_locked(&self) -> bool {
        self.active_track_id.is_some()
    }

    /// Locks the highest-scored candidate (the first one on ties) and returns
    /// the SELECT command for it. Returns `None` while a lock is held or when
    /// there is nothing to choose from.
    pub fn select_target(&mut self, ranked: &[ScoredCandidate]) -> Option<LifecycleCommand> {
        if let Some(active) = self.active_track_id {
            tracing::trace!(active, "lock held, selection skipped");
            return None;
        }

        let best = ranked
            .iter()
            .fold(None::<&ScoredCandidate>, |best, candidate| match best {
                Some(b) if b.score >= candidate.score => Some(b),
                _ => Some(candidate),
            })?;

        let track_id = best.object.track_id;
        self.active_track_id = Some(track_id);
        tracing::info!(track_id, score = best.score, "target locked");
        Some(LifecycleCommand::new(LifecycleAction::Select, track_id))
    }

    /// Turns feedback about the locked target into the lifecycle command that
    /// closes the lock cycle.
    pub fn handle_action_feedback(&mut self, feedback: &ActionFeedback) -> Option<LifecycleCommand> {
        let active = self.active_track_id?;
        if feedback.track_id != Some(active) {
            tracing::debug!(
                active,
                feedback_track = ?feedback.track_id,
                "feedback does not match locked target"
            );
            return None;
        }

        let action = match feedback.status {
            ActionStatus::Success => LifecycleAction::MarkDone,
            ActionStatus::Failed => LifecycleAction::Failed,
            ActionStatus::MovedForward | ActionStatus::None => LifecycleAction::Unattempted,
        };
        self.release();
        tracing::info!(track_id = active, ?action, status = %feedback.status, "lock released");
        Some(LifecycleCommand::new(action, active))
    }

    /// Drops the lock without producing a command.
    pub fn release(&mut self) -> Option<TrackId> {
        self.active_track_id.take()
    }
}
