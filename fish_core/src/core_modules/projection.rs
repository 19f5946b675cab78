//! Image-space boxes to robot-relative coordinates.
//!
//! The vehicle sits at the origin. `x` is the lateral offset (negative is left),
//! `y` is a forward distance proxy: the taller the box, the closer the object.
//! Box heights are clamped to the frame height, so the proxy never drops below
//! `forward_scale / image_height`.

use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;
use crate::core_modules::detection::{BoundingBox, TrackId};

/// Where a target sits relative to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub track_id: TrackId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Scalar distance proxy used for reach checks.
    pub distance: f64,
    pub bbox: BoundingBox,
}

pub struct CameraToWorldProjector {
    half_width: f64,
    frame_height: i64,
    lateral_scale: f64,
    forward_scale: f64,
}

impl CameraToWorldProjector {
    pub fn new(config: &ProjectionConfig) -> Self {
        Self {
            half_width: f64::from(config.image_width.max(1)) / 2.0,
            frame_height: i64::from(config.image_height.max(1)),
            lateral_scale: config.lateral_scale,
            forward_scale: config.forward_scale,
        }
    }

    pub fn project(&self, track_id: TrackId, bbox: BoundingBox) -> WorldObject {
        let (cx, _) = bbox.center();
        let nx = (cx - self.half_width) / self.half_width;
        let height = bbox.height().clamp(1, self.frame_height) as f64;
        let distance = self.forward_scale / height;
        WorldObject {
            track_id,
            x: nx * self.lateral_scale,
            y: distance,
            z: 0.0,
            distance,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector() -> CameraToWorldProjector {
        CameraToWorldProjector::new(&ProjectionConfig {
            image_width: 200,
            image_height: 100,
            lateral_scale: 3.0,
            forward_scale: 2.0,
        })
    }

    #[test]
    fn centred_box_projects_straight_ahead() {
        let obj = projector().project(1, BoundingBox::new(90, 0, 110, 40));
        assert_eq!(obj.x, 0.0);
        assert_eq!(obj.distance, 0.05);
        assert_eq!(obj.y, obj.distance);
        assert_eq!(obj.z, 0.0);
    }

    #[test]
    fn lateral_offset_is_scaled() {
        let obj = projector().project(1, BoundingBox::new(0, 0, 0, 10));
        assert_eq!(obj.x, -3.0);
    }

    #[test]
    fn box_taller_than_frame_is_clamped() {
        let obj = projector().project(1, BoundingBox::new(90, -2_000_000_000, 110, 2_000_000_000));
        assert_eq!(obj.distance, 0.02);
        assert_eq!(obj.x, 0.0);
    }

    #[test]
    fn flat_box_uses_unit_height() {
        let obj = projector().project(1, BoundingBox::new(10, 10, 20, 10));
        assert_eq!(obj.distance, 2.0);
    }
}
