//! Owner of the motor driver and of at most one active controller.
//!
//! Every path that writes to the motors goes through `&mut Session`, so
//! engaging a controller, manual moves and macros can never interleave: the
//! active controller is fully stopped (loop exited, Drive(0, 0) sent) before
//! anything else touches the driver.

use std::sync::Arc;
use tracing::info;

use crate::control::{Autopilot, ControlConfig, Mode};
use crate::messages::{Command, MacroCommand, StatusReport, raw_drive};
use crate::motor::{DriveCommand, MotorError, SharedDriver};
use crate::vision::{ColorPreset, ColorRange, DetectionConfig, Detector, DisplayFrame, PipelineFactory, Position, VisionError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Motor(#[from] MotorError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error("Device task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct Session {
    driver: SharedDriver,
    factory: Arc<dyn PipelineFactory>,
    detection: DetectionConfig,
    control: ControlConfig,
    active: Option<Autopilot>,
}

impl Session {
    pub fn new(
        driver: SharedDriver,
        factory: Box<dyn PipelineFactory>,
        detection: DetectionConfig,
        control: ControlConfig,
    ) -> Self {
        Self {
            driver,
            factory: Arc::from(factory),
            detection,
            control,
            active: None,
        }
    }

    /// Stop whatever is running, open a fresh detector and start `mode`.
    ///
    /// If the camera can't be opened nothing is started and the error is returned.
    pub async fn engage(&mut self, mode: Mode, range: Option<ColorRange>) -> Result<(), SessionError> {
        self.disengage().await;

        let mut detection = self.detection;
        if let Some(range) = range {
            detection.range = range;
        }

        // Camera open blocks
        let factory = Arc::clone(&self.factory);
        let detector =
            tokio::task::spawn_blocking(move || Detector::open(detection, factory.as_ref())).await??;
        let mut autopilot = Autopilot::new(mode, &self.control, detector, Arc::clone(&self.driver));
        autopilot.start();
        self.active = Some(autopilot);
        info!("Engaged {:?} controller", mode);
        Ok(())
    }

    /// Fully stop and release the active controller, if any
    pub async fn disengage(&mut self) {
        if let Some(mut autopilot) = self.active.take() {
            autopilot.close().await;
            info!("Disengaged {:?} controller", autopilot.mode());
        }
    }

    /// Disengage, then stop the wheels
    pub async fn stop(&mut self) -> Result<(), SessionError> {
        self.disengage().await;
        self.driver.lock().stop()?;
        Ok(())
    }

    /// Manual override drive
    pub async fn drive(&mut self, command: DriveCommand) -> Result<(), SessionError> {
        self.disengage().await;
        self.driver.lock().send_drive(command)?;
        Ok(())
    }

    /// Manual override single-opcode command (blocks a worker for the settle delay)
    pub async fn run_macro(&mut self, command: MacroCommand) -> Result<(), SessionError> {
        self.disengage().await;

        let driver = Arc::clone(&self.driver);
        tokio::task::spawn_blocking(move || {
            let mut driver = driver.lock();
            match command {
                MacroCommand::Start => driver.start(),
                MacroCommand::Control => driver.control(),
                MacroCommand::SafeMode => driver.safe_mode(),
                MacroCommand::FullMode => driver.full_mode(),
                MacroCommand::Clean => driver.clean(),
                MacroCommand::SpotClean => driver.spot_clean(),
                MacroCommand::MaxClean => driver.max_clean(),
                MacroCommand::Dock => driver.dock(),
                MacroCommand::PowerOff => driver.power_off(),
            }
        })
        .await??;
        Ok(())
    }

    /// Retarget the active detector and remember the range for later engagements
    pub fn set_color_range(&mut self, range: ColorRange) {
        self.detection.range = range;
        if let Some(autopilot) = &self.active {
            autopilot.set_color_range(range);
        }
    }

    pub async fn handle(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Seek { mode, color } => {
                // A bare seek tracks lime
                let range = color.map_or(ColorPreset::Lime.range(), |c| c.range());
                self.engage(mode, Some(range)).await
            }
            Command::Stop => self.stop().await,
            Command::Move { command, speed } => self.drive(command.drive(speed)).await,
            Command::Drive { velocity, radius } => self.drive(raw_drive(velocity, radius)).await,
            Command::Macro { name } => self.run_macro(name).await,
            Command::SetColor { color } => {
                self.set_color_range(color.range());
                Ok(())
            }
        }
    }

    /// Disengage and release everything; the driver stays open
    pub async fn shutdown(&mut self) {
        self.disengage().await;
    }

    pub fn active_mode(&self) -> Option<Mode> {
        self.active.as_ref().map(Autopilot::mode)
    }

    pub fn position(&self) -> Position {
        self.active
            .as_ref()
            .map_or(Position::NotFound, Autopilot::position)
    }

    pub fn display_frame(&self) -> Option<Arc<DisplayFrame>> {
        self.active.as_ref().and_then(Autopilot::display_frame)
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            position: self.position(),
            controller: self.active.as_ref().map(Autopilot::status),
        }
    }
}
