// THEORY:
// Unloading is a sub-mission squeezed into the middle of a sweep. Given the
// checkpoint taken just before it started, the behaviour:
// 1.  scores every configured dump point from the checkpoint position and
//     picks the cheapest,
// 2.  rises to the surface first if the vehicle is underwater, then goes
//     laterally to the dump point,
// 3.  comes back to the surface above the checkpoint and, if the checkpoint
//     was underwater, descends back onto it so the sweep can resume.
//
// The first leg that fails ends the behaviour with `Ok(false)`. There is no
// retry here; the mission planner decides what a failed unload means.

use serde_json::json;

use crate::config::{CostModelConfig, Depths};
use crate::error::{FishError, Result};
use crate::mission::cost::CostCalculator;
use crate::mission::environment::EnvironmentModel;
use crate::mission::navigator::Navigator;
use crate::mission::types::{MissionCheckpoint, Waypoint};
use crate::telemetry::{NotificationKind, Notifier};

pub struct UnloadBehavior {
    calculator: CostCalculator,
    environment: Box<dyn EnvironmentModel>,
    dump_points: Vec<Waypoint>,
    depths: Depths,
    notifier: Notifier,
}

impl UnloadBehavior {
    pub fn new(
        cost_model: &CostModelConfig,
        environment: Box<dyn EnvironmentModel>,
        dump_points: Vec<Waypoint>,
        depths: Depths,
        notifier: Notifier,
    ) -> Self {
        Self {
            calculator: CostCalculator::new(cost_model),
            environment,
            dump_points,
            depths,
            notifier,
        }
    }

    /// The dump point the vehicle would unload at from `position`.
    pub fn best_dump_point(&self, position: &Waypoint) -> Result<Waypoint> {
        self.calculator
            .best_docking_point(&self.dump_points, position, self.environment.as_ref())
            .map(|(point, _)| point)
            .ok_or(FishError::NoDumpPoints)
    }

    pub fn unload(&self, checkpoint: &MissionCheckpoint, navigator: &mut dyn Navigator) -> Result<bool> {
        let origin = checkpoint.position;
        self.notifier.raise_notification(
            NotificationKind::UnloadingStarted,
            "unloading started",
            json!({ "phase": checkpoint.phase, "position": origin, "at": checkpoint.timestamp }),
        );

        let (dump_point, breakdown) = self
            .calculator
            .best_docking_point(&self.dump_points, &origin, self.environment.as_ref())
            .ok_or(FishError::NoDumpPoints)?;
        self.notifier.raise_notification(
            NotificationKind::DumpPointSelected,
            "dump point selected",
            json!({ "dump_point": dump_point, "cost": breakdown }),
        );

        let underwater = !origin.is_at_depth(self.depths.surface);
        let surfaced_origin = origin.at_depth(self.depths.surface);

        let mut legs = Vec::with_capacity(4);
        if underwater {
            legs.push(surfaced_origin);
        }
        legs.push(dump_point);
        legs.push(surfaced_origin);
        if underwater {
            legs.push(origin);
        }

        for leg in legs {
            if !navigator.move_to(leg) {
                tracing::warn!(target_point = %leg, dump_point = %dump_point, "unload leg failed");
                return Ok(false);
            }
        }

        self.notifier.raise_notification(
            NotificationKind::UnloadingEnded,
            "unloading ended",
            json!({ "resume_position": origin }),
        );
        Ok(true)
    }
}
