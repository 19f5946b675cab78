// THEORY:
// The navigator owns where the vehicle is and where it is going next. The
// mission planner drives it in two ways:
// 1.  **Sweeping**: `set_path` lays out a serpentine lawn-mower pattern over
//     the mission area at one depth, and `step` advances along it by at most
//     one speed-worth of metres per cycle. `pause`/`resume` freeze the sweep
//     while a grasp is in progress.
// 2.  **Transits**: `move_to` is a single instantaneous leg (descend, ascend,
//     go to a dump point, go home). It reports failure instead of erroring so
//     the planner can decide between abort and manual help.
//
// Motion is a state update, not physically timed actuation.

use crate::config::{MissionConfig, NavigationConfig};
use crate::core_modules::projection::WorldObject;
use crate::mission::types::{SpeedProfile, Waypoint};

pub trait Navigator {
    /// Lays out a fresh sweep at `depth`, starting from `start`.
    fn set_path(&mut self, depth: f64, start: Waypoint);

    /// Single transit leg. False when the leg could not be completed.
    fn move_to(&mut self, target: Waypoint) -> bool;

    /// Advances along the sweep. False when paused or the sweep is finished.
    fn step(&mut self) -> bool;

    fn pause(&mut self);

    fn resume(&mut self);

    fn target_is_near(&self, target: &WorldObject) -> bool;

    fn path_is_finished(&self) -> bool;

    fn current_position(&self) -> Waypoint;

    fn set_speed_profile(&mut self, profile: SpeedProfile);
}

/// Serpentine sweep between the two configured corners of the mission area.
#[derive(Debug, Clone)]
pub struct SweepNavigator {
    corners: (Waypoint, Waypoint),
    config: NavigationConfig,
    position: Waypoint,
    waypoints: Vec<Waypoint>,
    next: usize,
    speed: f64,
    paused: bool,
}

impl SweepNavigator {
    pub fn new(mission: &MissionConfig) -> Self {
        Self {
            corners: (mission.start_point, mission.end_point),
            config: mission.navigation.clone(),
            position: mission.start_point,
            waypoints: Vec::new(),
            next: 0,
            speed: mission.navigation.speeds.surface,
            paused: false,
        }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn remaining_waypoints(&self) -> usize {
        self.waypoints.len().saturating_sub(self.next)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The configured corner farther from `start` is where the sweep ends.
    fn far_corner(&self, start: &Waypoint) -> Waypoint {
        let (a, b) = self.corners;
        if start.planar_distance(&a) >= start.planar_distance(&b) {
            a
        } else {
            b
        }
    }

    fn build_lanes(&self, depth: f64, start: Waypoint) -> Vec<Waypoint> {
        let far = self.far_corner(&start);
        let step = self.config.sweep_step;
        let span = far.y - start.y;
        let lanes = (span.abs() / step).ceil() as usize;
        let direction = span.signum();

        let mut waypoints = Vec::with_capacity((lanes + 1) * 2);
        let (mut from_x, mut to_x) = (start.x, far.x);
        for lane in 0..=lanes {
            let offset = (lane as f64 * step).min(span.abs());
            let y = start.y + direction * offset;
            waypoints.push(Waypoint::new(from_x, y, depth));
            waypoints.push(Waypoint::new(to_x, y, depth));
            std::mem::swap(&mut from_x, &mut to_x);
        }
        waypoints.dedup();
        waypoints
    }
}

impl Navigator for SweepNavigator {
    fn set_path(&mut self, depth: f64, start: Waypoint) {
        self.waypoints = self.build_lanes(depth, start);
        self.next = 0;
        self.position = start.at_depth(depth);
        self.paused = false;
        tracing::debug!(depth, start = %start, waypoints = self.waypoints.len(), "sweep path set");
    }

    fn move_to(&mut self, target: Waypoint) -> bool {
        let leg = self.position.distance(&target);
        if let Some(max) = self.config.max_leg_distance {
            if leg > max {
                tracing::warn!(from = %self.position, to = %target, leg, max, "leg too long");
                return false;
            }
        }
        tracing::debug!(from = %self.position, to = %target, leg, "moved");
        self.position = target;
        true
    }

    fn step(&mut self) -> bool {
        if self.paused || self.path_is_finished() {
            return false;
        }

        let mut budget = self.speed;
        while budget > 0.0 {
            let Some(waypoint) = self.waypoints.get(self.next).copied() else {
                break;
            };
            let remaining = self.position.distance(&waypoint);
            if remaining <= budget {
                self.position = waypoint;
                self.next += 1;
                budget -= remaining;
                // Stop at each corner so every waypoint is visited on its own step.
                if remaining > 0.0 {
                    break;
                }
            } else {
                let t = budget / remaining;
                self.position = Waypoint::new(
                    self.position.x + (waypoint.x - self.position.x) * t,
                    self.position.y + (waypoint.y - self.position.y) * t,
                    self.position.z + (waypoint.z - self.position.z) * t,
                );
                budget = 0.0;
            }
        }
        true
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn target_is_near(&self, target: &WorldObject) -> bool {
        target.distance <= self.config.reach_threshold
    }

    fn path_is_finished(&self) -> bool {
        self.next >= self.waypoints.len()
    }

    fn current_position(&self) -> Waypoint {
        self.position
    }

    fn set_speed_profile(&mut self, profile: SpeedProfile) {
        self.speed = match profile {
            SpeedProfile::Surface => self.config.speeds.surface,
            SpeedProfile::Underwater => self.config.speeds.underwater,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::detection::BoundingBox;
    use pretty_assertions::assert_eq;

    fn mission() -> MissionConfig {
        let mut mission = MissionConfig {
            start_point: Waypoint::new(0.0, 0.0, 0.0),
            end_point: Waypoint::new(10.0, 10.0, 0.0),
            ..MissionConfig::default()
        };
        mission.navigation.sweep_step = 5.0;
        mission.navigation.speeds.surface = 5.0;
        mission.navigation.speeds.underwater = 2.5;
        mission
    }

    #[test]
    fn lays_out_serpentine_lanes() {
        let mut nav = SweepNavigator::new(&mission());
        nav.set_path(0.0, Waypoint::new(0.0, 0.0, 0.0));
        let expected: Vec<Waypoint> = [
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (0.0, 5.0),
            (0.0, 10.0),
            (10.0, 10.0),
        ]
        .into_iter()
        .map(|(x, y)| Waypoint::new(x, y, 0.0))
        .collect();
        assert_eq!(nav.waypoints(), expected.as_slice());
    }

    #[test]
    fn underwater_sweep_runs_back_from_far_corner() {
        let mut nav = SweepNavigator::new(&mission());
        nav.set_path(-8.0, Waypoint::new(10.0, 10.0, -8.0));
        let last = *nav.waypoints().last().unwrap();
        assert_eq!(last, Waypoint::new(0.0, 0.0, -8.0));
        assert!(nav.waypoints().iter().all(|w| w.is_at_depth(-8.0)));
    }

    #[test]
    fn steps_until_finished() {
        let mut nav = SweepNavigator::new(&mission());
        nav.set_path(0.0, Waypoint::new(0.0, 0.0, 0.0));
        assert_eq!(nav.remaining_waypoints(), 6);
        let mut steps = 0;
        while nav.step() {
            steps += 1;
            assert!(steps < 100, "sweep never finished");
        }
        assert!(nav.path_is_finished());
        assert_eq!(nav.remaining_waypoints(), 0);
        assert_eq!(nav.current_position(), Waypoint::new(10.0, 10.0, 0.0));
        // 10 + 5 + 10 + 5 + 10 metres at 5 m per step, one step per corner.
        assert_eq!(steps, 8);
    }

    #[test]
    fn paused_navigator_does_not_step() {
        let mut nav = SweepNavigator::new(&mission());
        nav.set_path(0.0, Waypoint::new(0.0, 0.0, 0.0));
        nav.pause();
        assert!(nav.is_paused());
        assert!(!nav.step());
        assert_eq!(nav.current_position(), Waypoint::new(0.0, 0.0, 0.0));
        nav.resume();
        assert!(!nav.is_paused());
        assert!(nav.step());
    }

    #[test]
    fn speed_profile_switches_cruise_speed() {
        let mut nav = SweepNavigator::new(&mission());
        assert_eq!(nav.speed(), 5.0);
        nav.set_speed_profile(SpeedProfile::Underwater);
        assert_eq!(nav.speed(), 2.5);
        nav.set_speed_profile(SpeedProfile::Surface);
        assert_eq!(nav.speed(), 5.0);
    }

    #[test]
    fn long_legs_fail_when_limited() {
        let mut config = mission();
        config.navigation.max_leg_distance = Some(5.0);
        let mut nav = SweepNavigator::new(&config);
        assert!(nav.move_to(Waypoint::new(3.0, 4.0, 0.0)));
        assert!(!nav.move_to(Waypoint::new(30.0, 4.0, 0.0)));
        assert_eq!(nav.current_position(), Waypoint::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn reach_uses_distance_proxy() {
        let nav = SweepNavigator::new(&mission());
        let near = WorldObject {
            track_id: 1,
            x: 0.0,
            y: 0.005,
            z: 0.0,
            distance: 0.005,
            bbox: BoundingBox::new(0, 0, 10, 400),
        };
        assert!(nav.target_is_near(&near));
        assert!(!nav.target_is_near(&WorldObject { distance: 0.5, ..near }));
    }
}
