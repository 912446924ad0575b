// Color detection
//
// Provides:
// - HSV color ranges, presets and detector settings
// - Center zone geometry and blob-to-position classification
// - The detector acquisition loop publishing the latest position
// - An OpenCV camera backend (cargo feature `opencv`)

pub mod color;
mod detector;
pub mod geometry;
#[cfg(feature = "opencv")]
pub mod opencv;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use color::{ColorPreset, ColorRange, DetectionConfig, Hsv};
pub use detector::{Detector, DisplayFrame, FramePipeline, PipelineFactory, Segmentation};
pub use geometry::{Blob, Detection, Rect, center_zone, classify};

/// Where the tracked color sits horizontally in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Left,
    Right,
    Centered,
    #[default]
    NotFound,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Left => "LEFT",
            Position::Right => "RIGHT",
            Position::Centered => "CENTERED",
            Position::NotFound => "NOT FOUND",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("OpenCV error: {0}")]
    OpenCv(String),

    #[error("No camera backend compiled in (enable the `opencv` feature)")]
    BackendUnavailable,

    #[error("Detector has been closed")]
    Closed,
}

/// Factory used when no camera backend is compiled in
pub struct NoCamera;

impl PipelineFactory for NoCamera {
    fn open(&self, _config: &DetectionConfig) -> Result<Box<dyn FramePipeline>, VisionError> {
        Err(VisionError::BackendUnavailable)
    }
}

/// The camera backend this build was compiled with
pub fn camera_factory() -> Box<dyn PipelineFactory> {
    #[cfg(feature = "opencv")]
    {
        Box::new(opencv::CameraFactory)
    }
    #[cfg(not(feature = "opencv"))]
    {
        Box::new(NoCamera)
    }
}
