// THEORY:
// The `aggregator` module gives the decision layer "object permanence". The
// external tracker already solved data association (every detection arrives
// with a persistent track id), so the aggregator's job is not matching but
// bookkeeping: folding the stateless per-frame `Detection`s into one
// `TrackedObject` per track id and walking each record through its lifecycle.
//
// Key architectural principles:
// 1.  **Single owner**: The `Aggregator` is the only code that ever mutates a
//     `TrackedObject`. Decision components receive owned snapshots from
//     `update` and ask for transitions by sending `LifecycleCommand`s to
//     `apply_lifecycle_change`.
// 2.  **Lifecycle Management**:
//     - **Birth**: an unseen track id becomes a NEW record with age 1.
//     - **Maturity**: a NEW record observed `stable_age` times becomes STABLE.
//     - **Idleness**: a record unseen for more than `max_idle_frames` becomes
//       LOST. DONE records are never touched again.
//     - **Death**: DONE records, and LOST records idle for twice the idle
//       threshold, are dropped from memory after every update.
// 3.  **One attempt per object**: a track id that was collected or failed is
//     remembered forever and never re-admitted, even after its record has been
//     dropped and the tracker reports the same id again.
// 4.  **One lock at the owner**: a SELECT is refused while another record is
//     SELECTED, so the single-target invariant holds even if a caller errs.
// 5.  **Cool-downs outlive idleness**: an UNATTEMPTED record keeps its
//     cool-down start while it is LOST. Seen again inside the cool-down, it
//     comes back UNATTEMPTED, not STABLE.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::core_modules::detection::{BoundingBox, Detection, TrackId};
use crate::core_modules::lifecycle::{LifecycleAction, LifecycleCommand, TrackedState};
use crate::telemetry::{EventBus, FishEvent};

/// One physical object as remembered across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    /// Persistent identity assigned by the external tracker.
    pub track_id: TrackId,
    pub class_id: u32,
    pub class_name: String,
    /// Running mean of every confidence reported for this track.
    pub avg_confidence: f64,
    /// Box from the most recent frame the object was seen in.
    pub bbox: BoundingBox,
    /// Number of frames the object has been observed in.
    pub age: u32,
    pub first_seen_frame: u64,
    pub last_seen_frame: u64,
    pub state: TrackedState,
    /// Frame at which `state` last changed.
    pub state_since_frame: u64,
    pub selected_at_frame: Option<u64>,
}

impl TrackedObject {
    fn new(detection: &Detection, track_id: TrackId, frame: u64) -> Self {
        Self {
            track_id,
            class_id: detection.class_id,
            class_name: detection.class_name.clone(),
            avg_confidence: detection.confidence,
            bbox: detection.bbox,
            age: 1,
            first_seen_frame: frame,
            last_seen_frame: frame,
            state: TrackedState::New,
            state_since_frame: frame,
            selected_at_frame: None,
        }
    }

    /// Folds one more sighting into the record.
    fn observe(&mut self, detection: &Detection, frame: u64) {
        self.age += 1;
        self.last_seen_frame = frame;
        self.bbox = detection.bbox;
        let age = f64::from(self.age);
        self.avg_confidence = (self.avg_confidence * (age - 1.0) + detection.confidence) / age;
    }

    pub fn idle_frames(&self, frame: u64) -> u64 {
        frame.saturating_sub(self.last_seen_frame)
    }
}

pub struct Aggregator {
    config: AggregatorConfig,
    /// Ordered by track id so every snapshot is deterministic.
    memory: BTreeMap<TrackId, TrackedObject>,
    /// Track ids that consumed their collection attempt.
    attempted: HashSet<TrackId>,
    /// Frame each UNATTEMPTED cool-down started.
    cooldowns: HashMap<TrackId, u64>,
    frame_count: u64,
    bus: EventBus,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig, bus: EventBus) -> Self {
        Self {
            config,
            memory: BTreeMap::new(),
            attempted: HashSet::new(),
            cooldowns: HashMap::new(),
            frame_count: 0,
            bus,
        }
    }

    /// Folds one frame of detections into memory and returns a snapshot of
    /// every live record (neither DONE nor LOST), ordered by track id.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedObject> {
        self.frame_count += 1;
        let frame = self.frame_count;
        let mut seen: HashSet<TrackId> = HashSet::new();

        // --- 1. Create / update ---
        for detection in detections {
            let Some(track_id) = detection.track_id else {
                continue;
            };
            if !seen.insert(track_id) {
                tracing::debug!(track_id, frame, "duplicate track id in frame ignored");
                continue;
            }

            if self.memory.contains_key(&track_id) {
                self.observe_existing(track_id, detection, frame);
            } else if !self.attempted.contains(&track_id) {
                let record = TrackedObject::new(detection, track_id, frame);
                self.memory.insert(track_id, record);
                self.bus.publish(FishEvent::TrackStateChanged {
                    frame,
                    track_id,
                    from: None,
                    to: TrackedState::New,
                });
                if self.config.stable_age <= 1 {
                    self.transition(track_id, TrackedState::Stable);
                }
            }
        }

        // --- 2. Idle records ---
        let max_idle = self.config.max_idle_frames;
        let idle: Vec<TrackId> = self
            .memory
            .values()
            .filter(|record| !seen.contains(&record.track_id))
            .filter(|record| !matches!(record.state, TrackedState::Done | TrackedState::Lost))
            .filter(|record| record.idle_frames(frame) > max_idle)
            .map(|record| record.track_id)
            .collect();
        for track_id in idle {
            self.transition(track_id, TrackedState::Lost);
        }

        // --- 3. Cleanup ---
        self.cleanup_memory();

        let live: Vec<TrackedObject> = self
            .memory
            .values()
            .filter(|record| record.state.is_live())
            .cloned()
            .collect();
        tracing::debug!(frame, live = live.len(), remembered = self.memory.len(), "aggregated frame");
        live
    }

    fn observe_existing(&mut self, track_id: TrackId, detection: &Detection, frame: u64) {
        let stable_age = self.config.stable_age;
        let cooling_down = self.is_cooling_down(track_id, frame);
        let attempted = self.attempted.contains(&track_id);
        let Some(record) = self.memory.get_mut(&track_id) else {
            return;
        };

        let next = match record.state {
            TrackedState::Done => return,
            // Attempted records stay lost and age out of memory.
            TrackedState::Lost if attempted => return,
            TrackedState::Lost => {
                record.observe(detection, frame);
                Some(if cooling_down {
                    TrackedState::Unattempted
                } else if record.age >= stable_age {
                    TrackedState::Stable
                } else {
                    TrackedState::New
                })
            }
            TrackedState::Unattempted => {
                record.observe(detection, frame);
                (!cooling_down).then_some(TrackedState::Stable)
            }
            TrackedState::New => {
                record.observe(detection, frame);
                (record.age >= stable_age).then_some(TrackedState::Stable)
            }
            TrackedState::Stable | TrackedState::Selected => {
                record.observe(detection, frame);
                None
            }
        };

        if let Some(state) = next {
            self.transition(track_id, state);
        }
    }

    fn is_cooling_down(&self, track_id: TrackId, frame: u64) -> bool {
        self.cooldowns
            .get(&track_id)
            .is_some_and(|since| frame.saturating_sub(*since) < self.config.unattempted_cooldown_frames)
    }

    /// Drops DONE records and LOST records idle for more than twice the idle
    /// threshold.
    fn cleanup_memory(&mut self) {
        let frame = self.frame_count;
        let max_lost_idle = self.config.max_idle_frames.saturating_mul(2);
        let expired: Vec<(TrackId, TrackedState)> = self
            .memory
            .values()
            .filter(|record| match record.state {
                TrackedState::Done => true,
                TrackedState::Lost => record.idle_frames(frame) > max_lost_idle,
                _ => false,
            })
            .map(|record| (record.track_id, record.state))
            .collect();

        for (track_id, state) in expired {
            self.memory.remove(&track_id);
            self.cooldowns.remove(&track_id);
            tracing::debug!(track_id, %state, frame, "removed from memory");
            self.bus.publish(FishEvent::TrackRemoved {
                frame,
                track_id,
                state,
            });
        }
    }

    fn transition(&mut self, track_id: TrackId, to: TrackedState) {
        let frame = self.frame_count;
        let Some(record) = self.memory.get_mut(&track_id) else {
            return;
        };
        let from = record.state;
        if from == to {
            return;
        }
        record.state = to;
        record.state_since_frame = frame;
        if to == TrackedState::Selected {
            record.selected_at_frame = Some(frame);
        }
        match to {
            TrackedState::Unattempted => {
                self.cooldowns.entry(track_id).or_insert(frame);
            }
            TrackedState::Lost => {}
            _ => {
                self.cooldowns.remove(&track_id);
            }
        }
        tracing::debug!(track_id, %from, %to, frame, "track state changed");
        self.bus.publish(FishEvent::TrackStateChanged {
            frame,
            track_id,
            from: Some(from),
            to,
        });
    }

    /// Applies a command from the decision layer. Returns false, changing
    /// nothing, when the track is unknown or already DONE, when a SELECT would
    /// create a second SELECTED record, or when an UNATTEMPTED release targets
    /// a record that has meanwhile gone LOST.
    pub fn apply_lifecycle_change(&mut self, command: LifecycleCommand) -> bool {
        let applied = self.try_apply(command);
        self.bus.publish(FishEvent::CommandApplied { command, applied });
        applied
    }

    fn try_apply(&mut self, command: LifecycleCommand) -> bool {
        let LifecycleCommand { action, track_id } = command;
        let Some(record) = self.memory.get(&track_id) else {
            tracing::info!(track_id, ?action, "command for unknown track ignored");
            return false;
        };
        if record.state == TrackedState::Done {
            tracing::info!(track_id, ?action, "command for collected track ignored");
            return false;
        }
        if action == LifecycleAction::Unattempted && record.state == TrackedState::Lost {
            tracing::debug!(track_id, "lost track stays lost");
            return false;
        }
        if action == LifecycleAction::Select {
            if let Some(holder) = self.selected_id().filter(|holder| *holder != track_id) {
                tracing::warn!(track_id, holder, "select refused, another track is selected");
                return false;
            }
        }

        if action.is_attempt() {
            self.attempted.insert(track_id);
        }
        self.transition(track_id, action.target_state());
        true
    }

    /// The track currently in SELECTED state, if any.
    pub fn selected_id(&self) -> Option<TrackId> {
        self.memory
            .values()
            .find(|record| record.state == TrackedState::Selected)
            .map(|record| record.track_id)
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackedObject> {
        self.memory.get(&track_id)
    }

    pub fn was_attempted(&self, track_id: TrackId) -> bool {
        self.attempted.contains(&track_id)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Records currently held in memory, live or not.
    pub fn remembered(&self) -> usize {
        self.memory.len()
    }
}
