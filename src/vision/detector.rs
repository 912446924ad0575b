// Color detector: camera frames in, latest position out
//
// The acquisition loop runs on its own thread as fast as the pipeline
// delivers frames. Position is published before the display frame is
// rendered so readers of the position never wait on annotation.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::color::{ColorRange, DetectionConfig};
use super::geometry::{Blob, Detection, classify};
use super::{Position, VisionError};
use crate::latest::Latest;

/// Backoff after an empty or failed frame read
pub const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(10);

/// Blobs found in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub width: i32,
    pub height: i32,
    pub blobs: Vec<Blob>,
}

/// Annotated view for humans: original on top, status bar, mask below. BGR, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub width: u32,
    pub height: u32,
    pub bgr: Vec<u8>,
}

/// Frame source plus color segmentation
pub trait FramePipeline: Send + 'static {
    /// Grab the next frame and segment it with the given settings.
    /// `Ok(None)` means the read came back empty.
    fn segment(&mut self, config: &DetectionConfig) -> Result<Option<Segmentation>, VisionError>;

    /// Render the last segmented frame with its detection overlaid
    fn annotate(&mut self, _detection: &Detection) -> Result<Option<DisplayFrame>, VisionError> {
        Ok(None)
    }

    /// Release the device and any buffers
    fn release(&mut self) {}
}

/// Opens pipelines; one per detector
pub trait PipelineFactory: Send + Sync {
    fn open(&self, config: &DetectionConfig) -> Result<Box<dyn FramePipeline>, VisionError>;
}

pub struct Detector {
    config: Arc<RwLock<DetectionConfig>>,
    position: Latest<Position>,
    display: Latest<Option<Arc<DisplayFrame>>>,
    running: Arc<AtomicBool>,
    // Idle pipeline; moved into the worker while running
    pipeline: Option<Box<dyn FramePipeline>>,
    worker: Option<JoinHandle<Box<dyn FramePipeline>>>,
    closed: bool,
}

impl Detector {
    /// Open the camera through `factory`. Fails if the device cannot be opened.
    pub fn open(config: DetectionConfig, factory: &dyn PipelineFactory) -> Result<Self, VisionError> {
        let pipeline = factory.open(&config)?;
        info!("Opened camera {}", config.camera_id);
        Ok(Self::with_pipeline(config, pipeline))
    }

    pub fn with_pipeline(config: DetectionConfig, pipeline: Box<dyn FramePipeline>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            position: Latest::new(Position::NotFound),
            display: Latest::new(None),
            running: Arc::new(AtomicBool::new(false)),
            pipeline: Some(pipeline),
            worker: None,
            closed: false,
        }
    }

    /// Start the acquisition loop. No-op if already running or closed.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let Some(mut pipeline) = self.pipeline.take() else {
            warn!("Detector start ignored: {}", VisionError::Closed);
            return;
        };

        self.position.publish(Position::NotFound);
        self.running.store(true, Ordering::Release);

        let config = Arc::clone(&self.config);
        let position = self.position.clone();
        let display = self.display.clone();
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("color-detector".into())
            .spawn(move || {
                detection_loop(pipeline.as_mut(), &config, &position, &display, &running);
                pipeline
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("Color detector started");
            }
            Err(e) => {
                // The closure (and the pipeline in it) is gone with the failed spawn
                error!("Failed to spawn detector thread: {}", e);
                self.running.store(false, Ordering::Release);
                self.closed = true;
            }
        }
    }

    /// Signal the loop and wait for it to exit. Takes at most one frame period.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);
        self.reclaim(worker.join().ok());
    }

    /// Like `stop`, but waits for the worker on tokio's blocking pool
    pub async fn stop_async(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);

        let joined = match tokio::task::spawn_blocking(move || worker.join()).await {
            Ok(joined) => joined.ok(),
            Err(e) => {
                error!("Detector join task failed: {}", e);
                None
            }
        };
        self.reclaim(joined);
    }

    fn reclaim(&mut self, pipeline: Option<Box<dyn FramePipeline>>) {
        match pipeline {
            Some(pipeline) => self.pipeline = Some(pipeline),
            None => {
                error!("Detector thread panicked; camera is lost");
                self.closed = true;
            }
        }
        info!("Color detector stopped");
    }

    /// Stop, then release the camera and drop held frames. Safe to repeat.
    pub fn close(&mut self) {
        self.stop();
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.release();
            info!("Camera released");
        }
        self.display.publish(None);
        self.closed = true;
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Latest position; NOT_FOUND until the first processed frame
    pub fn position(&self) -> Position {
        self.position.get()
    }

    /// Read handle on the published position
    pub fn position_feed(&self) -> Latest<Position> {
        self.position.clone()
    }

    pub fn display_frame(&self) -> Option<Arc<DisplayFrame>> {
        self.display.get()
    }

    /// Takes effect on the next frame
    pub fn set_color_range(&self, range: ColorRange) {
        self.config.write().range = range;
        info!("Color range set to {:?} - {:?}", range.lower, range.upper);
    }

    pub fn config(&self) -> DetectionConfig {
        *self.config.read()
    }
}

impl Drop for Detector {
    fn drop(&mut self) {
        self.close();
    }
}

fn detection_loop(
    pipeline: &mut dyn FramePipeline,
    config: &RwLock<DetectionConfig>,
    position: &Latest<Position>,
    display: &Latest<Option<Arc<DisplayFrame>>>,
    running: &AtomicBool,
) {
    while running.load(Ordering::Acquire) {
        let settings = *config.read();

        let segmentation = match pipeline.segment(&settings) {
            Ok(Some(segmentation)) => segmentation,
            Ok(None) => {
                thread::sleep(EMPTY_READ_BACKOFF);
                continue;
            }
            Err(e) => {
                debug!("Frame read failed: {}", e);
                thread::sleep(EMPTY_READ_BACKOFF);
                continue;
            }
        };

        let detection = classify(
            segmentation.width,
            segmentation.height,
            &segmentation.blobs,
            &settings,
        );

        let previous = position.replace(detection.position);
        if previous != detection.position {
            debug!("Position {} -> {}", previous, detection.position);
        }

        match pipeline.annotate(&detection) {
            Ok(Some(frame)) => display.publish(Some(Arc::new(frame))),
            Ok(None) => {}
            Err(e) => debug!("Failed to render display frame: {}", e),
        }
    }
}
