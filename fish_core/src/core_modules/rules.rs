//! Hard gate applied to candidates before any scoring happens.

use std::collections::HashSet;

use crate::config::RulesConfig;
use crate::core_modules::aggregator::TrackedObject;

pub struct RuleGate {
    min_age: u32,
    min_conf: f64,
    allowed_classes: HashSet<String>,
}

impl RuleGate {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            min_age: config.min_age,
            min_conf: config.min_conf,
            allowed_classes: config.allowed_classes.iter().cloned().collect(),
        }
    }

    pub fn passes(&self, object: &TrackedObject) -> bool {
        object.age >= self.min_age
            && object.avg_confidence >= self.min_conf
            && self.allowed_classes.contains(&object.class_name)
    }

    /// Keeps the objects that pass every rule, in their original order.
    pub fn apply(&self, candidates: Vec<TrackedObject>) -> Vec<TrackedObject> {
        let before = candidates.len();
        let kept: Vec<TrackedObject> = candidates
            .into_iter()
            .filter(|object| self.passes(object))
            .collect();
        tracing::trace!(before, after = kept.len(), "rule gate applied");
        kept
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
            last_seen_frame: u64::from(age),
            state: TrackedState::Stable,
            state_since_frame: 1,
            selected_at_frame: None,
        }
    }

    fn gate() -> RuleGate {
        RuleGate::new(&RulesConfig {
            min_age: 3,
            min_conf: 0.5,
            allowed_classes: vec!["plastic".into(), "metal".into()],
        })
    }

    #[test]
    fn each_rule_rejects_independently() {
        let gate = gate();
        assert!(gate.passes(&object(1, "plastic", 3, 0.5)));
        assert!(!gate.passes(&object(2, "plastic", 2, 0.9)));
        assert!(!gate.passes(&object(3, "plastic", 5, 0.49)));
        assert!(!gate.passes(&object(4, "seaweed", 5, 0.9)));
    }

    #[test]
    fn order_is_preserved() {
        let kept = gate().apply(vec![
            object(5, "metal", 4, 0.9),
            object(6, "seaweed", 4, 0.9),
            object(2, "plastic", 4, 0.9),
        ]);
        let ids: Vec<u64> = kept.iter().map(|o| o.track_id).collect();
        assert_eq!(ids, vec![5, 2]);
    }
}
