//! Lifecycle states and the commands that move a tracked object between them.
//!
//! Decision components never touch aggregator memory directly; they emit a
//! `LifecycleCommand` and the aggregator applies it exactly once.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_modules::detection::TrackId;

/// Where a tracked object is in its journey from first sighting to collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedState {
    /// Seen fewer than `stable_age` frames.
    New,
    /// Seen long enough to be considered for selection.
    Stable,
    /// Locked as the current target.
    Selected,
    /// Collected. Terminal.
    Done,
    /// Gone from view past the idle threshold, or a collection attempt failed.
    Lost,
    /// Was locked but never reached before the lock was released.
    Unattempted,
}

impl TrackedState {
    /// Live objects are the ones decision components may still look at.
    pub fn is_live(self) -> bool {
        !matches!(self, TrackedState::Done | TrackedState::Lost)
    }
}

impl fmt::Display for TrackedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackedState::New => "new",
            TrackedState::Stable => "stable",
            TrackedState::Selected => "selected",
            TrackedState::Done => "done",
            TrackedState::Lost => "lost",
            TrackedState::Unattempted => "unattempted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Select,
    MarkDone,
    /// A collection attempt was made and failed; the object counts as lost.
    Failed,
    Lost,
    Unattempted,
}

impl LifecycleAction {
    /// The state the aggregator moves a record into when applying this action.
    pub fn target_state(self) -> TrackedState {
        match self {
            LifecycleAction::Select => TrackedState::Selected,
            LifecycleAction::MarkDone => TrackedState::Done,
            LifecycleAction::Failed | LifecycleAction::Lost => TrackedState::Lost,
            LifecycleAction::Unattempted => TrackedState::Unattempted,
        }
    }

    /// Actions that consume the object's one and only collection attempt.
    pub fn is_attempt(self) -> bool {
        matches!(self, LifecycleAction::MarkDone | LifecycleAction::Failed)
    }
}

/// A single lifecycle transition request addressed to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCommand {
    pub action: LifecycleAction,
    pub track_id: TrackId,
}

impl LifecycleCommand {
    pub fn new(action: LifecycleAction, track_id: TrackId) -> Self {
        Self { action, track_id }
    }
}
