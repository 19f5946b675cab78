// THEORY:
// The environment model is a query-only view of the water the vehicle moves
// through. The cost calculator asks it three questions about a candidate leg:
// how strongly the current pushes against the direction of travel, how
// cluttered the destination is, and how sure the vehicle is of its own
// position. Answers must be deterministic so docking choices are reproducible.
//
// `MockEnvironment` answers with constants. `CurrentFieldEnvironment` models a
// uniform current vector and circular obstacle zones. Which one is used is a
// configuration choice made once at construction.

use crate::config::{EnvironmentConfig, ObstacleZone};
use crate::mission::types::Waypoint;

pub trait EnvironmentModel {
    /// Magnitude of current opposing travel from `from` to `to`. Never negative.
    fn current_opposition(&self, from: &Waypoint, to: &Waypoint) -> f64;

    /// Obstacle density around `point`. Never negative.
    fn obstacle_density(&self, point: &Waypoint) -> f64;

    /// Present localisation uncertainty. Never negative.
    fn localization_uncertainty(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockEnvironment {
    pub current: f64,
    pub risk: f64,
    pub uncertainty: f64,
}

impl MockEnvironment {
    pub fn new(current: f64, risk: f64, uncertainty: f64) -> Self {
        Self {
            current: current.max(0.0),
            risk: risk.max(0.0),
            uncertainty: uncertainty.max(0.0),
        }
    }
}

impl EnvironmentModel for MockEnvironment {
    fn current_opposition(&self, _from: &Waypoint, _to: &Waypoint) -> f64 {
        self.current
    }

    fn obstacle_density(&self, _point: &Waypoint) -> f64 {
        self.risk
    }

    fn localization_uncertainty(&self) -> f64 {
        self.uncertainty
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentFieldEnvironment {
    /// Current velocity in the horizontal plane, m/s.
    current: (f64, f64),
    obstacles: Vec<ObstacleZone>,
    uncertainty: f64,
}

impl CurrentFieldEnvironment {
    pub fn new(current: (f64, f64), obstacles: Vec<ObstacleZone>, uncertainty: f64) -> Self {
        Self {
            current,
            obstacles,
            uncertainty: uncertainty.max(0.0),
        }
    }
}

impl EnvironmentModel for CurrentFieldEnvironment {
    fn current_opposition(&self, from: &Waypoint, to: &Waypoint) -> f64 {
        let (dx, dy) = (to.x - from.x, to.y - from.y);
        let length = dx.hypot(dy);
        if length <= f64::EPSILON {
            return 0.0;
        }
        let along = (self.current.0 * dx + self.current.1 * dy) / length;
        // A current flowing with the leg helps; only the opposing part costs.
        (-along).max(0.0)
    }

    fn obstacle_density(&self, point: &Waypoint) -> f64 {
        self.obstacles
            .iter()
            .filter(|zone| zone.center.planar_distance(point) <= zone.radius)
            .map(|zone| zone.density.max(0.0))
            .sum()
    }

    fn localization_uncertainty(&self) -> f64 {
        self.uncertainty
    }
}

impl EnvironmentConfig {
    pub fn build(&self) -> Box<dyn EnvironmentModel> {
        match self {
            EnvironmentConfig::Mock {
                current,
                risk,
                uncertainty,
            } => Box::new(MockEnvironment::new(*current, *risk, *uncertainty)),
            EnvironmentConfig::CurrentField {
                current,
                obstacles,
                uncertainty,
            } => Box::new(CurrentFieldEnvironment::new(
                (current[0], current[1]),
                obstacles.clone(),
                *uncertainty,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_opposing_current_counts() {
        let env = CurrentFieldEnvironment::new((1.0, 0.0), vec![], 0.0);
        let origin = Waypoint::new(0.0, 0.0, 0.0);
        assert_eq!(env.current_opposition(&origin, &Waypoint::new(-5.0, 0.0, 0.0)), 1.0);
        assert_eq!(env.current_opposition(&origin, &Waypoint::new(5.0, 0.0, 0.0)), 0.0);
        assert!(env.current_opposition(&origin, &Waypoint::new(0.0, 5.0, 0.0)).abs() < 1e-12);
        assert_eq!(env.current_opposition(&origin, &origin), 0.0);
    }

    #[test]
    fn overlapping_zones_add_up() {
        let zone = |x: f64, density: f64| ObstacleZone {
            center: Waypoint::new(x, 0.0, 0.0),
            radius: 2.0,
            density,
        };
        let env = CurrentFieldEnvironment::new((0.0, 0.0), vec![zone(0.0, 0.25), zone(1.0, 0.5)], 0.1);
        assert_eq!(env.obstacle_density(&Waypoint::new(0.5, 0.0, 0.0)), 0.75);
        assert_eq!(env.obstacle_density(&Waypoint::new(10.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn default_config_builds_mock() {
        let env = EnvironmentConfig::default().build();
        let p = Waypoint::default();
        assert_eq!(env.current_opposition(&p, &p), 0.5);
        assert_eq!(env.obstacle_density(&p), 0.2);
        assert_eq!(env.localization_uncertainty(), 0.1);
    }
}
