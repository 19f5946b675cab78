//! Result of attempting (or not attempting) an action intent.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core_modules::detection::TrackId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
    /// The vehicle advanced along its path instead of acting.
    MovedForward,
    /// Nothing happened this cycle.
    None,
}

impl ActionStatus {
    /// Statuses that close out an object for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionStatus::Success | ActionStatus::Failed)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionStatus::Success => "success",
            ActionStatus::Failed => "failed",
            ActionStatus::MovedForward => "moved_forward",
            ActionStatus::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFeedback {
    pub status: ActionStatus,
    pub track_id: Option<TrackId>,
    pub reason: String,
}

impl ActionFeedback {
    pub fn new(status: ActionStatus, track_id: Option<TrackId>, reason: impl Into<String>) -> Self {
        Self {
            status,
            track_id,
            reason: reason.into(),
        }
    }
}
