//! Shared mission data types: positions, phases, checkpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Depths closer than this are treated as equal.
pub const DEPTH_TOLERANCE: f64 = 1e-6;

/// A point in the mission frame, in metres. `z` is depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Same (x, y), different depth.
    pub fn at_depth(self, z: f64) -> Self {
        Self { z, ..self }
    }

    pub fn planar_distance(&self, other: &Waypoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn distance(&self, other: &Waypoint) -> f64 {
        let planar = self.planar_distance(other);
        planar.hypot(other.z - self.z)
    }

    pub fn is_at_depth(&self, depth: f64) -> bool {
        (self.z - depth).abs() < DEPTH_TOLERANCE
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    Surface,
    Descend,
    Underwater,
    Ascend,
    Return,
    Done,
    Abort,
    Failed,
    Unloading,
}

impl MissionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MissionPhase::Done | MissionPhase::Abort | MissionPhase::Failed
        )
    }

    /// Only the sweeping phases allow grasp attempts.
    pub fn allows_action(self) -> bool {
        matches!(self, MissionPhase::Surface | MissionPhase::Underwater)
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionPhase::Surface => "surface",
            MissionPhase::Descend => "descend",
            MissionPhase::Underwater => "underwater",
            MissionPhase::Ascend => "ascend",
            MissionPhase::Return => "return",
            MissionPhase::Done => "done",
            MissionPhase::Abort => "abort",
            MissionPhase::Failed => "failed",
            MissionPhase::Unloading => "unloading",
        };
        f.write_str(name)
    }
}

/// Immutable snapshot taken before any risky operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionCheckpoint {
    pub phase: MissionPhase,
    pub position: Waypoint,
    pub timestamp: DateTime<Utc>,
}

impl MissionCheckpoint {
    pub fn capture(phase: MissionPhase, position: Waypoint) -> Self {
        Self {
            phase,
            position,
            timestamp: Utc::now(),
        }
    }
}

/// Speed profile the navigator cruises at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedProfile {
    Surface,
    Underwater,
}
