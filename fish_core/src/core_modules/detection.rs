// THEORY:
// The `detection` module holds the "dumb" data containers that enter the core
// from the external detector/tracker. A `Detection` is a snapshot of one object
// in one frame: it has no memory of where the object was before and no opinion
// about what should happen to it. Persistence across frames is the job of the
// aggregator, which folds detections into `TrackedObject`s keyed by track id.
//
// Detections without a track id cannot be associated with anything from a
// previous frame, so the aggregator discards them.

use serde::{Deserialize, Serialize};

/// Persistent identity assigned by the external tracker.
pub type TrackId = u64;

/// Axis-aligned box in original image pixels, top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Widened to `i64` so boxes spanning the whole `i32` range cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (f64::from(self.x1) + f64::from(self.x2)) / 2.0,
            (f64::from(self.y1) + f64::from(self.y2)) / 2.0,
        )
    }

    /// A box with no area cannot be grasped or projected meaningfully.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// One object reported by the detector for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub class_name: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// Identity assigned by the tracker, absent when the tracker has not yet
    /// associated this detection.
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_boxes_are_detected() {
        assert!(BoundingBox::new(10, 10, 10, 40).is_degenerate());
        assert!(BoundingBox::new(10, 40, 20, 10).is_degenerate());
        assert!(!BoundingBox::new(0, 0, 1, 1).is_degenerate());
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let json = r#"{"x1":-2000000000,"y1":-2000000000,"x2":2000000000,"y2":2000000000}"#;
        let bbox: BoundingBox = serde_json::from_str(json).unwrap();
        assert_eq!(bbox.width(), 4_000_000_000);
        assert_eq!(bbox.height(), 4_000_000_000);
        assert_eq!(bbox.center(), (0.0, 0.0));
        assert!(!bbox.is_degenerate());

        let max = BoundingBox::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX);
        assert_eq!(max.center(), (f64::from(i32::MAX), f64::from(i32::MAX)));
    }

    #[test]
    fn detection_without_track_id_deserializes() {
        let json = r#"{"class_id":2,"class_name":"plastic","confidence":0.8,
            "bbox":{"x1":0,"y1":0,"x2":10,"y2":20}}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.track_id, None);
        assert_eq!(det.bbox.center(), (5.0, 10.0));
    }
}
