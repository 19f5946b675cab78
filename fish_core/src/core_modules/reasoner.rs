// THEORY:
// The reasoner is the "soft" half of the decision layer. Where the rule gate
// says yes or no, the reasoner only says "how much": it combines three weighted
// signals (how valuable the class is, how long the object has been tracked and
// how confident the detector is) into a single priority score.
//
// It never drops a candidate. The ranked output is a stable descending sort,
// so two candidates with equal scores keep the order they arrived in.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ReasonerConfig;
use crate::core_modules::aggregator::TrackedObject;

/// A candidate paired with its priority score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub object: TrackedObject,
    pub score: f64,
}

pub struct PriorityReasoner {
    class_weights: BTreeMap<String, f64>,
    default_class_weight: f64,
    age_weight: f64,
    conf_weight: f64,
}

impl PriorityReasoner {
    pub fn new(config: &ReasonerConfig) -> Self {
        Self {
            class_weights: config.class_weights.clone(),
            default_class_weight: config.default_class_weight,
            age_weight: config.age_weight,
            conf_weight: config.conf_weight,
        }
    }

    pub fn score(&self, object: &TrackedObject) -> f64 {
        let class_weight = self
            .class_weights
            .get(&object.class_name)
            .copied()
            .unwrap_or(self.default_class_weight);
        class_weight
            + f64::from(object.age) * self.age_weight
            + object.avg_confidence * self.conf_weight
    }

    /// Scores every candidate, in input order.
    pub fn evaluate(&self, candidates: Vec<TrackedObject>) -> Vec<ScoredCandidate> {
        candidates
            .into_iter()
            .map(|object| {
                let score = self.score(&object);
                ScoredCandidate { object, score }
            })
            .collect()
    }

    /// Scores and sorts highest first. Ties keep input order.
    pub fn rank(&self, candidates: Vec<TrackedObject>) -> Vec<ScoredCandidate> {
        let mut scored = self.evaluate(candidates);
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::detection::BoundingBox;
    use crate::core_modules::lifecycle::TrackedState;

    fn object(track_id: u64, class_name: &str, age: u32, avg_confidence: f64) -> TrackedObject {
        TrackedObject {
            track_id,
            class_id: 0,
            class_name: class_name.to_string(),
            avg_confidence,
            bbox: BoundingBox::new(0, 0, 10, 10),
            age,
            first_seen_frame: 1,
            last_seen_frame: 1,
            state: TrackedState::Stable,
            state_since_frame: 1,
            selected_at_frame: None,
        }
    }

    fn reasoner() -> PriorityReasoner {
        let mut class_weights = BTreeMap::new();
        class_weights.insert("plastic".to_string(), 1.0);
        PriorityReasoner::new(&ReasonerConfig {
            class_weights,
            default_class_weight: 0.5,
            age_weight: 0.1,
            conf_weight: 2.0,
        })
    }

    #[test]
    fn score_combines_weighted_signals() {
        let r = reasoner();
        assert!((r.score(&object(1, "plastic", 3, 0.5)) - 2.3).abs() < 1e-12);
        // Unknown class falls back to the default weight.
        assert!((r.score(&object(2, "tyre", 0, 0.0)) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rank_is_stable_descending() {
        let ranked = reasoner().rank(vec![
            object(1, "tyre", 0, 0.0),
            object(2, "plastic", 0, 0.0),
            object(3, "tyre", 0, 0.0),
        ]);
        let ids: Vec<u64> = ranked.iter().map(|c| c.object.track_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn never_filters() {
        let ranked = reasoner().rank(vec![object(1, "tyre", 0, 0.0); 4]);
        assert_eq!(ranked.len(), 4);
    }
}
