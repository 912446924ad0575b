// Frame geometry: center zone and blob classification

use serde::{Deserialize, Serialize};

use super::Position;
use super::color::DetectionConfig;

/// Axis-aligned rectangle, half-open: [x0, x1) x [y0, y1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn center_x(&self) -> i32 {
        self.x0 + self.width() / 2
    }

    /// True when both are non-empty and share at least one pixel
    pub fn overlaps(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x0 < other.x1
            && other.x0 < self.x1
            && self.y0 < other.y1
            && other.y0 < self.y1
    }
}

/// Vertical band around the frame midline, full frame height.
///
/// Width is `width / divisor`; a non-positive divisor is treated as 1.
pub fn center_zone(width: i32, height: i32, divisor: i32) -> Rect {
    let zone_width = width / divisor.max(1);
    let mid = width / 2;
    Rect::new(mid - zone_width / 2, 0, mid + zone_width / 2, height)
}

/// A connected region of in-range pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub area: f64,
    pub bounds: Rect,
}

/// Outcome of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub position: Position,
    /// Bounding box of the blob that decided the position
    pub target: Option<Rect>,
    pub zone: Rect,
}

/// Reduce a frame's blobs to a position.
///
/// Only the largest blob counts, and only when its area is strictly greater
/// than the configured minimum.
pub fn classify(width: i32, height: i32, blobs: &[Blob], config: &DetectionConfig) -> Detection {
    let zone = center_zone(width, height, config.center_divisor);

    let mut largest: Option<&Blob> = None;
    let mut max_area = 0.0;
    for blob in blobs {
        if blob.area > max_area {
            max_area = blob.area;
            largest = Some(blob);
        }
    }

    let target = match largest {
        Some(blob) if blob.area > config.min_contour_area => blob.bounds,
        _ => {
            return Detection {
                position: Position::NotFound,
                target: None,
                zone,
            };
        }
    };

    let position = if target.overlaps(&zone) {
        Position::Centered
    } else if target.center_x() < zone.x0 {
        Position::Left
    } else {
        Position::Right
    };

    Detection {
        position,
        target: Some(target),
        zone,
    }
}
