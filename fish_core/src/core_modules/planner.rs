//! Builds the single outbound directive for the locked target.

use serde::{Deserialize, Serialize};

use crate::core_modules::detection::{BoundingBox, TrackId};
use crate::core_modules::reasoner::ScoredCandidate;

/// What the vehicle should act on this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    pub track_id: TrackId,
    pub class_name: String,
    pub priority_score: f64,
    pub bbox: BoundingBox,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ActionPlanner;

impl ActionPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Looks the locked id up among the ranked candidates. `None` means
    /// skip this cycle: nothing is locked, or the locked object dropped out
    /// of the candidate set since it was selected.
    pub fn build_intent(
        &self,
        ranked: &[ScoredCandidate],
        locked_id: Option<TrackId>,
    ) -> Option<ActionIntent> {
        let locked_id = locked_id?;
        let Some(candidate) = ranked.iter().find(|c| c.object.track_id == locked_id) else {
            tracing::debug!(locked_id, "locked target not among candidates");
            return None;
        };
        Some(ActionIntent {
            track_id: locked_id,
            class_name: candidate.object.class_name.clone(),
            priority_score: candidate.score,
            bbox: candidate.object.bbox,
            reason: "locked target".to_string(),
        })
    }
}
