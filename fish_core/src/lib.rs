// THEORY:
// This file is the main entry point for the `fish_core` library crate: the
// mission, decision and lifecycle coordination core of an autonomous
// underwater cleaning vehicle.
//
// The primary export is `FishPipeline`, which runs one perceive-decide-act
// cycle per frame of tracked detections. Underneath it the crate is layered
// leaf-first:
// - `core_modules`: the per-object logic. Detections, the lifecycle
//   aggregator, the rule gate, the priority reasoner, the selection lock, the
//   action planner and the camera-to-world projection.
// - `decision`: the four decision components chained into one call.
// - `mission`: the vehicle side. The phase state machine, bin, docking cost
//   model, unloading sub-mission, and the collaborator traits (navigator,
//   manipulator, environment model, outcome sink) with their shipped
//   implementations.
// - `config`, `error`, `telemetry`: the ambient stack shared by everything.

pub mod config;
pub mod core_modules;
pub mod decision;
pub mod error;
pub mod mission;
pub mod pipeline;
pub mod telemetry;

pub use config::FishConfig;
pub use core_modules::detection::{BoundingBox, Detection, TrackId};
pub use error::{FishError, Result};
pub use pipeline::{CycleReport, FishPipeline};
pub use telemetry::{EventBus, FishEvent};
