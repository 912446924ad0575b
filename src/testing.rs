// Test fixtures: an in-memory transport and a scripted camera pipeline

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::motor::{DriveCommand, MotorError, Transport};
use crate::vision::{
    Blob, ColorRange, Detection, DetectionConfig, DisplayFrame, FramePipeline, PipelineFactory,
    Rect, Segmentation, VisionError,
};

const WAIT_LIMIT: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Write(Vec<u8>),
    ResetLine(bool),
}

/// Records every write; clones share the same log
#[derive(Clone, Default)]
pub struct RecordingTransport {
    events: Arc<Mutex<Vec<TransportEvent>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().clone()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Write(bytes) => Some(bytes.clone()),
                TransportEvent::ResetLine(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Every drive frame written, in order
    pub fn frames(&self) -> Vec<DriveCommand> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Write(bytes) => DriveCommand::decode(bytes).ok(),
                TransportEvent::ResetLine(_) => None,
            })
            .collect()
    }
}

impl Write for RecordingTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down"));
        }
        self.events.lock().push(TransportEvent::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for RecordingTransport {
    fn set_reset_line(&mut self, level: bool) -> Result<(), MotorError> {
        self.events.lock().push(TransportEvent::ResetLine(level));
        Ok(())
    }
}

#[derive(Default)]
struct ScriptState {
    blobs: Option<Vec<Blob>>,
    fail: bool,
    released: bool,
    last_range: Option<ColorRange>,
}

/// Handle for steering what a `ScriptedPipeline` "sees"
#[derive(Clone, Default)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    /// Every following frame contains these blobs
    pub fn show(&self, blobs: Vec<Blob>) {
        self.state.lock().blobs = Some(blobs);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail = fail;
    }

    pub fn released(&self) -> bool {
        self.state.lock().released
    }

    /// Color range passed with the most recent frame request
    pub fn last_range(&self) -> Option<ColorRange> {
        self.state.lock().last_range
    }
}

/// 640x480 frames with scripted blobs; empty reads until something is shown
pub struct ScriptedPipeline {
    script: Script,
}

impl ScriptedPipeline {
    pub fn new() -> (Self, Script) {
        let script = Script::default();
        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }
}

impl FramePipeline for ScriptedPipeline {
    fn segment(&mut self, config: &DetectionConfig) -> Result<Option<Segmentation>, VisionError> {
        std::thread::sleep(Duration::from_millis(2));
        let mut state = self.script.state.lock();
        state.last_range = Some(config.range);
        if state.fail {
            return Err(VisionError::Camera("scripted read failure".into()));
        }
        Ok(state.blobs.clone().map(|blobs| Segmentation {
            width: 640,
            height: 480,
            blobs,
        }))
    }

    fn annotate(&mut self, detection: &Detection) -> Result<Option<DisplayFrame>, VisionError> {
        Ok(Some(DisplayFrame {
            width: 2,
            height: 1,
            bgr: vec![detection.position as u8; 6],
        }))
    }

    fn release(&mut self) {
        self.script.state.lock().released = true;
    }
}

/// Opens `ScriptedPipeline`s that all follow the same script
pub struct ScriptedFactory {
    script: Script,
}

impl ScriptedFactory {
    pub fn new() -> (Self, Script) {
        let script = Script::default();
        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }
}

impl PipelineFactory for ScriptedFactory {
    fn open(&self, _config: &DetectionConfig) -> Result<Box<dyn FramePipeline>, VisionError> {
        Ok(Box::new(ScriptedPipeline {
            script: self.script.clone(),
        }))
    }
}

/// Large blob inside the default center zone of a 640-wide frame
pub fn centered_blob() -> Blob {
    Blob {
        area: 2000.0,
        bounds: Rect::new(300, 200, 340, 260),
    }
}

/// Poll `condition` from a plain thread
pub fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(POLL);
    }
    condition()
}

/// Poll `condition` without blocking the tokio runtime
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(POLL).await;
    }
    condition()
}
