// THEORY:
// The `MissionPlanner` is the top-level state machine of the vehicle. One call
// to `tick` is one cycle of the perceive-decide-act loop, seen from the action
// side: it receives at most one intent (and where that target sits relative to
// the vehicle) and decides whether to unload, grasp, or keep sweeping.
//
// Key architectural principles:
// 1.  **Phases are the only state that matters to the outside**: SURFACE and
//     UNDERWATER are sweeps where grasping is allowed. DESCEND, ASCEND, RETURN
//     and UNLOADING are transits the planner passes through inside a single
//     tick. DONE, ABORT and FAILED end the mission.
// 2.  **Checkpoint before risk**: every tick and every abort snapshots phase
//     and position first, so an interrupted operation knows where to resume.
// 3.  **Failure is graded**:
//     - a failed grasp is retried up to `max_operation_retries` times;
//     - an exhausted target counts as lost, and `max_target_loss_ignore` lost
//       targets abort the mission;
//     - any failed transit leg aborts immediately;
//     - a failed abort (cannot get home) asks for manual help and stops.
// 4.  **Collaborators are injected**: navigation, grasping and the environment
//     model are traits, so the same state machine runs against the sweep
//     simulator, a scripted test double, or real hardware drivers.

use std::time::Instant;

use serde_json::json;

use crate::config::{FishConfig, MissionConfig};
use crate::core_modules::detection::TrackId;
use crate::core_modules::feedback::{ActionFeedback, ActionStatus};
use crate::core_modules::planner::ActionIntent;
use crate::core_modules::projection::WorldObject;
use crate::error::{FishError, Result};
use crate::mission::bin::BinManager;
use crate::mission::environment::EnvironmentModel;
use crate::mission::manipulator::{ActionExecutor, Manipulator};
use crate::mission::navigator::Navigator;
use crate::mission::types::{MissionCheckpoint, MissionPhase, SpeedProfile};
use crate::mission::unload::UnloadBehavior;
use crate::telemetry::{AlertKind, FishEvent, NotificationKind, Notifier};

pub struct MissionPlanner {
    config: MissionConfig,
    phase: MissionPhase,
    navigator: Box<dyn Navigator>,
    executor: ActionExecutor,
    bin: BinManager,
    unloader: UnloadBehavior,
    notifier: Notifier,
    /// Last snapshot taken before a risky operation.
    checkpoint: Option<MissionCheckpoint>,
    active_target: Option<TrackId>,
    retry_count: u32,
    lost_targets: u32,
    started_at: Instant,
    tick_count: u64,
}

impl MissionPlanner {
    pub fn new(
        config: &FishConfig,
        mut navigator: Box<dyn Navigator>,
        manipulator: Box<dyn Manipulator>,
        environment: Box<dyn EnvironmentModel>,
        notifier: Notifier,
    ) -> Self {
        let mission = config.mission.clone();
        navigator.set_path(mission.depths.surface, mission.start_point);
        navigator.set_speed_profile(SpeedProfile::Surface);

        let planner = Self {
            phase: MissionPhase::Surface,
            navigator,
            executor: ActionExecutor::new(manipulator, notifier.bus().clone()),
            bin: BinManager::new(&mission.bin, notifier.clone()),
            unloader: UnloadBehavior::new(
                &config.cost_model,
                environment,
                config.dump_points.clone(),
                mission.depths,
                notifier.clone(),
            ),
            notifier,
            checkpoint: None,
            active_target: None,
            retry_count: 0,
            lost_targets: 0,
            started_at: Instant::now(),
            tick_count: 0,
            config: mission,
        };
        planner.notifier.raise_notification(
            NotificationKind::MissionStarted,
            "mission started",
            json!({ "start_point": planner.config.start_point, "hq_point": planner.config.hq_point }),
        );
        planner
    }

    pub fn mission_is_active(&self) -> bool {
        !self.phase.is_terminal()
    }

    pub fn action_is_allowed(&self) -> bool {
        self.phase.allows_action()
    }

    pub fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn lost_targets(&self) -> u32 {
        self.lost_targets
    }

    pub fn active_target(&self) -> Option<TrackId> {
        self.active_target
    }

    pub fn last_checkpoint(&self) -> Option<&MissionCheckpoint> {
        self.checkpoint.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn bin(&self) -> &BinManager {
        &self.bin
    }

    pub fn bin_mut(&mut self) -> &mut BinManager {
        &mut self.bin
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// One cycle of the mission. Calling this after the mission has ended is
    /// a driver error.
    pub fn tick(
        &mut self,
        intent: Option<&ActionIntent>,
        world_object: Option<&WorldObject>,
    ) -> Result<ActionFeedback> {
        if !self.mission_is_active() {
            return Err(FishError::MissionInactive(self.phase));
        }
        self.tick_count += 1;

        if let Some(limit) = self.config.limits.max_mission_time_sec {
            let elapsed = self.started_at.elapsed().as_secs();
            if elapsed >= limit {
                self.notifier.raise_alert(
                    AlertKind::MissionTimeout,
                    "mission time limit exceeded",
                    json!({ "elapsed_sec": elapsed, "limit_sec": limit, "phase": self.phase }),
                );
                self.set_phase(MissionPhase::Abort);
                self.abort_mission();
                return Ok(ActionFeedback::new(
                    ActionStatus::None,
                    intent.map(|i| i.track_id),
                    "mission time limit exceeded",
                ));
            }
        }

        // --- 1. Checkpoint ---
        let checkpoint = MissionCheckpoint::capture(self.phase, self.navigator.current_position());
        self.checkpoint = Some(checkpoint);

        // --- 2. Unload when the bin is full ---
        if self.bin.needs_unload() {
            self.set_phase(MissionPhase::Unloading);
            if self.unloader.unload(&checkpoint, self.navigator.as_mut())? {
                self.bin.reset();
                self.set_phase(checkpoint.phase);
            } else {
                tracing::warn!(position = %self.navigator.current_position(), "unloading failed");
                self.abort_mission();
                return Ok(ActionFeedback::new(ActionStatus::Failed, None, "unloading failed"));
            }
        }

        // --- 3. Grasp or sweep ---
        let feedback = match (intent, world_object) {
            (Some(intent), Some(world))
                if world.track_id == intent.track_id && self.navigator.target_is_near(world) =>
            {
                self.handle_target(intent)
            }
            _ => {
                let track_id = intent.map(|i| i.track_id);
                if self.navigator.step() {
                    ActionFeedback::new(
                        ActionStatus::MovedForward,
                        track_id,
                        "target out of reach or nothing to collect",
                    )
                } else {
                    ActionFeedback::new(ActionStatus::None, track_id, "navigator did not move")
                }
            }
        };

        // --- 4. Phase advancement ---
        if self.mission_is_active() && self.navigator.path_is_finished() {
            self.advance_phase();
        }

        tracing::debug!(
            tick = self.tick_count,
            phase = %self.phase,
            status = %feedback.status,
            track_id = ?feedback.track_id,
            "tick finished"
        );
        Ok(feedback)
    }

    fn handle_target(&mut self, intent: &ActionIntent) -> ActionFeedback {
        self.navigator.pause();
        self.active_target = Some(intent.track_id);

        let mut feedback = self.executor.execute(intent, 1);
        if feedback.status != ActionStatus::Success && self.handle_failure(intent) {
            feedback = ActionFeedback::new(ActionStatus::Success, Some(intent.track_id), "retry success");
        }
        if feedback.status == ActionStatus::Success {
            self.bin.add_item();
        }

        self.active_target = None;
        self.retry_count = 0;
        self.navigator.resume();
        feedback
    }

    /// Retries a failed grasp. When every retry fails the target counts as
    /// lost, and enough lost targets abort the mission.
    fn handle_failure(&mut self, intent: &ActionIntent) -> bool {
        while self.retry_count < self.config.limits.max_operation_retries {
            self.retry_count += 1;
            let feedback = self.executor.execute(intent, self.retry_count + 1);
            if feedback.status == ActionStatus::Success {
                tracing::info!(track_id = intent.track_id, retry = self.retry_count, "retry succeeded");
                return true;
            }
        }

        self.lost_targets += 1;
        tracing::warn!(
            track_id = intent.track_id,
            lost_targets = self.lost_targets,
            max = self.config.limits.max_target_loss_ignore,
            "target lost after retries"
        );
        self.notifier.bus().publish(FishEvent::TargetLost {
            track_id: intent.track_id,
            lost_targets: self.lost_targets,
        });

        if self.lost_targets >= self.config.limits.max_target_loss_ignore {
            self.set_phase(MissionPhase::Abort);
            self.abort_mission();
        }
        false
    }

    fn advance_phase(&mut self) {
        let depths = self.config.depths;
        match self.phase {
            MissionPhase::Surface => {
                self.notify(NotificationKind::SurfaceCleaningEnded, "surface cleaning ended");
                self.set_phase(MissionPhase::Descend);

                let underwater_start = self.config.end_point.at_depth(depths.underwater);
                if !self.navigator.move_to(underwater_start) {
                    self.raise_leg_alert(AlertKind::DescendFail, "descend failed");
                    self.set_phase(MissionPhase::Abort);
                    self.abort_mission();
                    return;
                }
                self.notify(NotificationKind::MachineDescended, "machine descended");

                self.set_phase(MissionPhase::Underwater);
                self.navigator.set_path(depths.underwater, underwater_start);
                self.navigator.set_speed_profile(SpeedProfile::Underwater);
            }
            MissionPhase::Underwater => {
                self.notify(NotificationKind::UnderwaterCleaningEnded, "underwater cleaning ended");
                self.set_phase(MissionPhase::Ascend);

                let surface_point = self.config.start_point.at_depth(depths.surface);
                if !self.navigator.move_to(surface_point) {
                    self.raise_leg_alert(AlertKind::AscendFail, "ascend failed");
                    self.set_phase(MissionPhase::Abort);
                    self.abort_mission();
                    return;
                }
                self.notify(NotificationKind::MachineAscended, "machine ascended");

                self.set_phase(MissionPhase::Return);
                self.navigator.set_speed_profile(SpeedProfile::Surface);
                if !self.navigator.move_to(self.config.hq_point) {
                    // Cleaning is finished; the abort path retries the way home.
                    self.raise_leg_alert(AlertKind::HqReturnFail, "return to headquarters failed");
                    self.abort_mission();
                    return;
                }
                self.complete_mission();
            }
            _ => {}
        }
    }

    /// Heads home from wherever the vehicle is: straight up first when
    /// underwater, then across to headquarters.
    fn abort_mission(&mut self) {
        let position = self.navigator.current_position();
        let checkpoint = MissionCheckpoint::capture(self.phase, position);
        self.checkpoint = Some(checkpoint);
        tracing::warn!(phase = %self.phase, position = %position, "aborting mission");

        let surface = self.config.depths.surface;
        let surfaced = position.is_at_depth(surface) || self.navigator.move_to(position.at_depth(surface));
        if !surfaced || !self.navigator.move_to(self.config.hq_point) {
            self.request_manual_help();
            return;
        }

        let metadata = json!({ "checkpoint": checkpoint });
        match self.phase {
            MissionPhase::Return => self.complete_mission(),
            MissionPhase::Abort => {
                self.notifier.raise_alert(
                    AlertKind::HardAbort,
                    "mission aborted in the middle of cleaning",
                    metadata,
                );
                self.set_phase(MissionPhase::Failed);
            }
            MissionPhase::Unloading => {
                self.notifier.raise_alert(
                    AlertKind::UnloadingFail,
                    "mission aborted in the middle of unloading",
                    metadata,
                );
                self.set_phase(MissionPhase::Failed);
            }
            _ => self.set_phase(MissionPhase::Failed),
        }
    }

    /// The vehicle cannot get itself home. Nothing automated is left to try.
    fn request_manual_help(&mut self) {
        self.notifier.raise_alert(
            AlertKind::MachineFailure,
            "needs human support, send help from headquarters",
            json!({
                "position": self.navigator.current_position(),
                "phase": self.phase,
                "at": chrono::Utc::now(),
            }),
        );
        self.set_phase(MissionPhase::Abort);
    }

    fn complete_mission(&mut self) {
        self.notify(NotificationKind::ReachedHeadquarters, "reached headquarters");
        self.set_phase(MissionPhase::Done);
        self.notifier.raise_notification(
            NotificationKind::MissionCompleted,
            "mission completed",
            json!({ "elapsed_sec": self.started_at.elapsed().as_secs_f64(), "ticks": self.tick_count }),
        );
    }

    fn set_phase(&mut self, to: MissionPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        tracing::info!(%from, %to, "mission phase changed");
        self.notifier.bus().publish(FishEvent::PhaseChanged { from, to });
    }

    fn notify(&self, kind: NotificationKind, message: &str) {
        self.notifier.raise_notification(
            kind,
            message,
            json!({ "position": self.navigator.current_position() }),
        );
    }

    fn raise_leg_alert(&self, kind: AlertKind, message: &str) {
        self.notifier.raise_alert(
            kind,
            message,
            json!({ "position": self.navigator.current_position(), "phase": self.phase }),
        );
    }
}
