// THEORY:
// Picking a dump point is a small deterministic minimisation. Every candidate
// is scored by a weighted sum of six terms describing the leg from where the
// vehicle is to where it would unload: travel time, opposing current, energy,
// drag, obstacle risk and localisation uncertainty. The cheapest point wins.
//
// Five of the six terms are normalised into [0, 1] by `normalize`, which clamps
// so a single out-of-range reading cannot dominate the sum. The drag term is
// added raw (`avg_drag_force * distance`). That asymmetry is deliberate and is
// pinned by a test; changing it changes which dump points win.

use serde::Serialize;

use crate::config::{CostModelConfig, CostWeights, NormalizationLimits, VehicleModel};
use crate::mission::environment::EnvironmentModel;
use crate::mission::types::Waypoint;

/// Every term of one docking cost evaluation, before and after weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub distance: f64,
    pub travel_time_n: f64,
    pub current_n: f64,
    pub energy_n: f64,
    /// Not normalised.
    pub drag: f64,
    pub risk_n: f64,
    pub uncertainty_n: f64,
    pub total: f64,
}

pub fn normalize(value: f64, max: f64) -> f64 {
    (value / max).min(1.0)
}

pub struct CostCalculator {
    weights: CostWeights,
    vehicle: VehicleModel,
    limits: NormalizationLimits,
}

impl CostCalculator {
    pub fn new(config: &CostModelConfig) -> Self {
        Self {
            weights: config.weights,
            vehicle: config.vehicle,
            limits: config.normalization,
        }
    }

    pub fn breakdown(&self, target: &Waypoint, current: &Waypoint, env: &dyn EnvironmentModel) -> CostBreakdown {
        let distance = current.planar_distance(target);
        let opposition = env.current_opposition(current, target);
        let relative_speed = self.vehicle.cruise_speed + opposition;
        let energy = self.vehicle.drag_coeff * relative_speed.powi(2) * distance;

        let travel_time_n = normalize(distance, self.limits.max_distance);
        let current_n = normalize(opposition, self.limits.max_current);
        let energy_n = normalize(energy, self.limits.max_energy);
        let drag = self.vehicle.avg_drag_force * distance;
        let risk_n = normalize(env.obstacle_density(target), self.limits.max_risk);
        let uncertainty_n = normalize(env.localization_uncertainty(), self.limits.max_uncertainty);

        let w = &self.weights;
        let total = w.travel_time * travel_time_n
            + w.current * current_n
            + w.energy * energy_n
            + w.drag * drag
            + w.risk * risk_n
            + w.uncertainty * uncertainty_n;

        CostBreakdown {
            distance,
            travel_time_n,
            current_n,
            energy_n,
            drag,
            risk_n,
            uncertainty_n,
            total,
        }
    }

    pub fn cost(&self, target: &Waypoint, current: &Waypoint, env: &dyn EnvironmentModel) -> f64 {
        self.breakdown(target, current, env).total
    }

    /// The cheapest candidate from `current`, the first one on ties.
    pub fn best_docking_point(
        &self,
        candidates: &[Waypoint],
        current: &Waypoint,
        env: &dyn EnvironmentModel,
    ) -> Option<(Waypoint, CostBreakdown)> {
        let mut best: Option<(Waypoint, CostBreakdown)> = None;
        for candidate in candidates {
            let breakdown = self.breakdown(candidate, current, env);
            tracing::debug!(
                point = %candidate,
                total = breakdown.total,
                distance = breakdown.distance,
                drag = breakdown.drag,
                risk = breakdown.risk_n,
                "docking cost"
            );
            match &best {
                Some((_, b)) if b.total <= breakdown.total => {}
                _ => best = Some((*candidate, breakdown)),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::environment::MockEnvironment;

    fn calculator() -> CostCalculator {
        CostCalculator::new(&CostModelConfig::default())
    }

    #[test]
    fn normalize_clamps_at_one() {
        assert_eq!(normalize(50.0, 100.0), 0.5);
        assert_eq!(normalize(500.0, 100.0), 1.0);
    }

    #[test]
    fn cost_matches_weighted_sum() {
        let env = MockEnvironment::new(0.5, 0.2, 0.1);
        let origin = Waypoint::new(0.0, 0.0, 0.0);
        let target = Waypoint::new(30.0, 40.0, 0.0);
        let calc = calculator();
        let b = calc.breakdown(&target, &origin, &env);

        // distance 50, energy 0.5 * 1.5^2 * 50 = 56.25, drag 0.01 * 50 = 0.5
        assert_eq!(b.distance, 50.0);
        let expected = 0.3 * (50.0 / 200.0)
            + 0.15 * (0.5 / 2.0)
            + 0.2 * (56.25 / 500.0)
            + 0.05 * 0.5
            + 0.2 * 0.2
            + 0.1 * 0.1;
        assert!((b.total - expected).abs() < 1e-12, "{} vs {}", b.total, expected);
        assert_eq!(calc.cost(&target, &origin, &env), b.total);
    }

    #[test]
    fn drag_term_is_not_normalized() {
        // Far beyond max_distance every normalised term saturates, the drag term keeps growing.
        let env = MockEnvironment::new(0.0, 0.0, 0.0);
        let origin = Waypoint::default();
        let calc = calculator();
        let far = calc.breakdown(&Waypoint::new(10_000.0, 0.0, 0.0), &origin, &env);
        let farther = calc.breakdown(&Waypoint::new(20_000.0, 0.0, 0.0), &origin, &env);
        assert_eq!(far.travel_time_n, 1.0);
        assert_eq!(far.drag, 100.0);
        assert!(farther.total > far.total);
        assert!(far.total > 1.0);
    }

    #[test]
    fn best_point_is_cheapest_then_first() {
        let env = MockEnvironment::new(0.5, 0.2, 0.1);
        let origin = Waypoint::default();
        let candidates = [
            Waypoint::new(20.0, 0.0, 0.0),
            Waypoint::new(0.0, 5.0, 0.0),
            Waypoint::new(5.0, 0.0, 0.0),
        ];
        let (best, _) = calculator().best_docking_point(&candidates, &origin, &env).unwrap();
        assert_eq!(best, Waypoint::new(0.0, 5.0, 0.0));
        assert!(calculator().best_docking_point(&[], &origin, &env).is_none());
    }
}
