// THEORY:
// One tree of plain data describes the whole vehicle: how long an object must
// be tracked before it counts, which classes are worth collecting, where the
// mission area and headquarters are, how the bin fills, how docking points are
// scored, and which environment model answers the cost queries.
//
// Every section carries `#[serde(default)]`, so a YAML file only needs to name
// what differs from the defaults. `validate` rejects values that would make a
// later computation meaningless (a zero normalisation limit, an empty bin, no
// dump points) at load time instead of mid-mission.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{FishError, Result};
use crate::mission::types::Waypoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FishConfig {
    pub aggregator: AggregatorConfig,
    pub decision: DecisionConfig,
    pub projection: ProjectionConfig,
    pub mission: MissionConfig,
    pub cost_model: CostModelConfig,
    /// Candidate locations where the bin can be emptied.
    pub dump_points: Vec<Waypoint>,
    pub environment: EnvironmentConfig,
}

impl Default for FishConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            decision: DecisionConfig::default(),
            projection: ProjectionConfig::default(),
            mission: MissionConfig::default(),
            cost_model: CostModelConfig::default(),
            dump_points: vec![
                Waypoint::new(-5.0, 10.0, 0.0),
                Waypoint::new(25.0, 10.0, 0.0),
                Waypoint::new(10.0, 25.0, 0.0),
            ],
            environment: EnvironmentConfig::default(),
        }
    }
}

impl FishConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: FishConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| FishError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> FishError {
            FishError::InvalidConfig(msg.into())
        }

        if self.aggregator.stable_age == 0 {
            return Err(invalid("aggregator.stable_age must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.decision.rules.min_conf) {
            return Err(invalid("decision.rules.min_conf must lie in [0, 1]"));
        }
        if self.projection.image_width == 0 || self.projection.image_height == 0 {
            return Err(invalid("projection image dimensions must be non-zero"));
        }

        let nav = &self.mission.navigation;
        if nav.sweep_step <= 0.0 {
            return Err(invalid("mission.navigation.sweep_step must be positive"));
        }
        if nav.speeds.surface <= 0.0 || nav.speeds.underwater <= 0.0 {
            return Err(invalid("mission.navigation.speeds must be positive"));
        }
        if nav.reach_threshold < 0.0 {
            return Err(invalid("mission.navigation.reach_threshold must not be negative"));
        }

        let bin = &self.mission.bin;
        if bin.capacity == 0 {
            return Err(invalid("mission.bin.capacity must be at least 1"));
        }
        if !(bin.alert_threshold > 0.0 && bin.alert_threshold <= 1.0) {
            return Err(invalid("mission.bin.alert_threshold must lie in (0, 1]"));
        }

        let norm = &self.cost_model.normalization;
        let limits = [
            ("max_distance", norm.max_distance),
            ("max_energy", norm.max_energy),
            ("max_current", norm.max_current),
            ("max_risk", norm.max_risk),
            ("max_uncertainty", norm.max_uncertainty),
        ];
        for (name, value) in limits {
            if value <= 0.0 {
                return Err(invalid(format!(
                    "cost_model.normalization.{name} must be positive"
                )));
            }
        }
        if self.cost_model.vehicle.cruise_speed <= 0.0 {
            return Err(invalid("cost_model.vehicle.cruise_speed must be positive"));
        }

        if self.dump_points.is_empty() {
            return Err(invalid("at least one dump point is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Frames an object must be seen before NEW is promoted to STABLE.
    pub stable_age: u32,
    /// Frames an object may go unseen before it is marked LOST.
    pub max_idle_frames: u64,
    /// Frames an UNATTEMPTED object waits before it may be selected again.
    pub unattempted_cooldown_frames: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            stable_age: 3,
            max_idle_frames: 5,
            unattempted_cooldown_frames: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub rules: RulesConfig,
    pub reasoner: ReasonerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub min_age: u32,
    pub min_conf: f64,
    pub allowed_classes: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            min_age: 3,
            min_conf: 0.4,
            allowed_classes: ["plastic", "metal", "glass", "rubber", "fabric", "net"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub class_weights: BTreeMap<String, f64>,
    /// Weight for classes missing from `class_weights`.
    pub default_class_weight: f64,
    pub age_weight: f64,
    pub conf_weight: f64,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        let class_weights = [
            ("plastic", 1.0),
            ("net", 0.9),
            ("metal", 0.8),
            ("glass", 0.7),
            ("rubber", 0.6),
            ("fabric", 0.5),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();
        Self {
            class_weights,
            default_class_weight: 0.5,
            age_weight: 0.01,
            conf_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Dimensions of the original camera frame the boxes are expressed in.
    pub image_width: u32,
    pub image_height: u32,
    pub lateral_scale: f64,
    pub forward_scale: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            image_width: 1920,
            image_height: 1080,
            lateral_scale: 1.0,
            forward_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Corner of the sweep area where the mission starts, at surface depth.
    pub start_point: Waypoint,
    /// Opposite corner of the sweep area.
    pub end_point: Waypoint,
    pub hq_point: Waypoint,
    pub depths: Depths,
    pub navigation: NavigationConfig,
    pub limits: Limits,
    pub bin: BinConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            start_point: Waypoint::new(0.0, 0.0, 0.0),
            end_point: Waypoint::new(20.0, 20.0, 0.0),
            hq_point: Waypoint::new(-5.0, -5.0, 0.0),
            depths: Depths::default(),
            navigation: NavigationConfig::default(),
            limits: Limits::default(),
            bin: BinConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Depths {
    pub surface: f64,
    pub underwater: f64,
}

impl Default for Depths {
    fn default() -> Self {
        Self {
            surface: 0.0,
            underwater: -8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Spacing between sweep lanes, in metres.
    pub sweep_step: f64,
    /// Projected distance under which a target counts as within reach.
    pub reach_threshold: f64,
    pub speeds: Speeds,
    /// Longest single `move_to` leg the navigator accepts. Unlimited when absent.
    pub max_leg_distance: Option<f64>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            sweep_step: 5.0,
            reach_threshold: 0.01,
            speeds: Speeds::default(),
            max_leg_distance: None,
        }
    }
}

/// Metres advanced per navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Speeds {
    pub surface: f64,
    pub underwater: f64,
}

impl Default for Speeds {
    fn default() -> Self {
        Self {
            surface: 1.0,
            underwater: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Extra grasp attempts after the first one fails.
    pub max_operation_retries: u32,
    /// Lost targets tolerated before the mission is aborted.
    pub max_target_loss_ignore: u32,
    pub max_mission_time_sec: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_operation_retries: 2,
            max_target_loss_ignore: 3,
            max_mission_time_sec: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinConfig {
    /// Number of items the bin holds.
    pub capacity: u32,
    /// Usage ratio at which the bin must be unloaded.
    pub alert_threshold: f64,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            alert_threshold: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
    pub weights: CostWeights,
    pub vehicle: VehicleModel,
    pub normalization: NormalizationLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub travel_time: f64,
    pub energy: f64,
    pub current: f64,
    pub drag: f64,
    pub risk: f64,
    pub uncertainty: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            travel_time: 0.3,
            energy: 0.2,
            current: 0.15,
            drag: 0.05,
            risk: 0.2,
            uncertainty: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleModel {
    pub cruise_speed: f64,
    pub drag_coeff: f64,
    pub avg_drag_force: f64,
}

impl Default for VehicleModel {
    fn default() -> Self {
        Self {
            cruise_speed: 1.0,
            drag_coeff: 0.5,
            avg_drag_force: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationLimits {
    pub max_distance: f64,
    pub max_energy: f64,
    pub max_current: f64,
    pub max_risk: f64,
    pub max_uncertainty: f64,
}

impl Default for NormalizationLimits {
    fn default() -> Self {
        Self {
            max_distance: 200.0,
            max_energy: 500.0,
            max_current: 2.0,
            max_risk: 1.0,
            max_uncertainty: 1.0,
        }
    }
}

/// Circular region with a fixed obstacle density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleZone {
    pub center: Waypoint,
    pub radius: f64,
    pub density: f64,
}

/// Which environment model answers docking cost queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentConfig {
    /// Constant answers, for testing and replay.
    Mock {
        current: f64,
        risk: f64,
        uncertainty: f64,
    },
    /// Uniform current vector and a list of obstacle zones.
    CurrentField {
        /// Current velocity (x, y) in m/s.
        current: [f64; 2],
        #[serde(default)]
        obstacles: Vec<ObstacleZone>,
        #[serde(default)]
        uncertainty: f64,
    },
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig::Mock {
            current: 0.5,
            risk: 0.2,
            uncertainty: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        FishConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = r#"
aggregator:
  stable_age: 5
mission:
  bin:
    capacity: 4
environment:
  kind: current_field
  current: [0.3, -0.1]
"#;
        let config = FishConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.aggregator.stable_age, 5);
        assert_eq!(config.aggregator.max_idle_frames, 5);
        assert_eq!(config.mission.bin.capacity, 4);
        assert_eq!(config.mission.bin.alert_threshold, 0.9);
        assert_eq!(
            config.environment,
            EnvironmentConfig::CurrentField {
                current: [0.3, -0.1],
                obstacles: vec![],
                uncertainty: 0.0,
            }
        );
    }

    #[test]
    fn zero_normalisation_limit_is_rejected() {
        let mut config = FishConfig::default();
        config.cost_model.normalization.max_energy = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_energy"), "{err}");
    }

    #[test]
    fn empty_dump_points_are_rejected() {
        let yaml = "dump_points: []\n";
        assert!(matches!(
            FishConfig::from_yaml_str(yaml),
            Err(FishError::InvalidConfig(_))
        ));
    }
}
