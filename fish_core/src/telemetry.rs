// THEORY:
// The `telemetry` module is how the core talks to the outside world without
// the outside world being able to talk back. Every component boundary (a
// lifecycle transition, a command applied, a phase change, a grasp attempt)
// publishes a structured `FishEvent` on a broadcast bus. Operations tooling,
// the runner's console printer and the tests all subscribe independently of
// the core logic.
//
// Key architectural principles:
// 1.  **Fire-and-forget**: `broadcast::Sender::send` is synchronous and never
//     blocks, so the single-threaded core never awaits. A bus with no
//     subscribers silently drops events.
// 2.  **Structured, not narrative**: events are serde-serialisable enums, so a
//     subscriber can filter on kind and fields instead of parsing log lines.
// 3.  **Alerts are events too**: the `Notifier` is the alert/notification sink
//     the mission planner raises into. It mirrors every alert into `tracing`
//     and onto the bus.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;

use crate::core_modules::detection::TrackId;
use crate::core_modules::feedback::ActionStatus;
use crate::core_modules::lifecycle::{LifecycleCommand, TrackedState};
use crate::mission::types::MissionPhase;

pub const DEFAULT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    BinFull,
    HqReturnFail,
    DescendFail,
    AscendFail,
    UnloadingFail,
    MachineFailure,
    HardAbort,
    MissionTimeout,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertKind::BinFull => "bin_full",
            AlertKind::HqReturnFail => "hq_return_failed",
            AlertKind::DescendFail => "descend_failed",
            AlertKind::AscendFail => "ascend_failed",
            AlertKind::UnloadingFail => "unloading_failed",
            AlertKind::MachineFailure => "machine_failure",
            AlertKind::HardAbort => "hard_abort",
            AlertKind::MissionTimeout => "mission_timeout",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MissionStarted,
    DumpPointSelected,
    UnloadingStarted,
    UnloadingEnded,
    SurfaceCleaningEnded,
    MachineDescended,
    UnderwaterCleaningEnded,
    MachineAscended,
    ReachedHeadquarters,
    MissionCompleted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::MissionStarted => "mission_started",
            NotificationKind::DumpPointSelected => "dump_point_selected",
            NotificationKind::UnloadingStarted => "unloading_started",
            NotificationKind::UnloadingEnded => "unloading_ended",
            NotificationKind::SurfaceCleaningEnded => "surface_cleaning_ended",
            NotificationKind::MachineDescended => "machine_descended",
            NotificationKind::UnderwaterCleaningEnded => "underwater_cleaning_ended",
            NotificationKind::MachineAscended => "machine_ascended",
            NotificationKind::ReachedHeadquarters => "reached_headquarters",
            NotificationKind::MissionCompleted => "mission_completed",
        };
        f.write_str(name)
    }
}

/// Everything the core reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FishEvent {
    TrackStateChanged {
        frame: u64,
        track_id: TrackId,
        /// `None` when the track was just created.
        from: Option<TrackedState>,
        to: TrackedState,
    },
    TrackRemoved {
        frame: u64,
        track_id: TrackId,
        state: TrackedState,
    },
    CommandApplied {
        command: LifecycleCommand,
        applied: bool,
    },
    TargetLocked {
        track_id: TrackId,
        score: f64,
    },
    LockReleased {
        track_id: TrackId,
        reason: String,
    },
    PhaseChanged {
        from: MissionPhase,
        to: MissionPhase,
    },
    GraspAttempted {
        track_id: TrackId,
        attempt: u32,
        success: bool,
    },
    TargetLost {
        track_id: TrackId,
        lost_targets: u32,
    },
    BinLoadChanged {
        load: u32,
        capacity: u32,
    },
    OutcomeRecorded {
        track_id: TrackId,
        status: ActionStatus,
    },
    Alert {
        kind: AlertKind,
        message: String,
        metadata: Value,
    },
    Notification {
        kind: NotificationKind,
        message: String,
        metadata: Value,
    },
}

/// Cloneable handle onto the broadcast channel every component publishes to.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FishEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<FishEvent>(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FishEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: FishEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Collects everything currently queued on a receiver without awaiting.
/// Lagged gaps are skipped.
pub fn drain_pending(rx: &mut broadcast::Receiver<FishEvent>) -> Vec<FishEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

/// Alert and notification sink raised into by the mission planner.
#[derive(Debug, Clone)]
pub struct Notifier {
    bus: EventBus,
}

impl Notifier {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn raise_alert(&self, kind: AlertKind, message: &str, metadata: Value) {
        tracing::warn!(alert = %kind, %metadata, "{message}");
        self.bus.publish(FishEvent::Alert {
            kind,
            message: message.to_string(),
            metadata,
        });
    }

    pub fn raise_notification(&self, kind: NotificationKind, message: &str, metadata: Value) {
        tracing::info!(notification = %kind, %metadata, "{message}");
        self.bus.publish(FishEvent::Notification {
            kind,
            message: message.to_string(),
            metadata,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bus_without_subscribers_drops_silently() {
        let bus = EventBus::new(4);
        bus.publish(FishEvent::BinLoadChanged { load: 1, capacity: 2 });
    }

    #[test]
    fn notifier_publishes_alerts_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let notifier = Notifier::new(bus);

        notifier.raise_alert(AlertKind::BinFull, "bin is full", json!({"usage": 0.95}));
        notifier.raise_notification(NotificationKind::UnloadingStarted, "unloading", json!({}));

        let events = drain_pending(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            FishEvent::Alert { kind: AlertKind::BinFull, .. }
        ));
        assert!(matches!(
            events[1],
            FishEvent::Notification { kind: NotificationKind::UnloadingStarted, .. }
        ));
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = FishEvent::PhaseChanged {
            from: MissionPhase::Surface,
            to: MissionPhase::Descend,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "phase_changed", "from": "surface", "to": "descend"})
        );
    }
}
