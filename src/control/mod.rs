// Autonomous controllers
//
// Provides:
// - The steering policy trait and its three policies (seek, line, pursuit)
// - The shared detector-sampling scaffold
// - `Autopilot`, a controller of any of the three kinds

mod controller;
pub mod line;
pub mod policy;
pub mod pursuit;
pub mod seek;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use controller::Controller;
pub use line::{Direction, LineConfig, LinePolicy};
pub use policy::SteeringPolicy;
pub use pursuit::{PursuitConfig, PursuitPhase, PursuitPolicy};
pub use seek::{SeekConfig, SeekPolicy, SeekState};

use crate::motor::SharedDriver;
use crate::vision::{ColorRange, Detector, DisplayFrame, Position};

/// Which policy drives the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Seek,
    Line,
    Pursuit,
}

/// Per-policy settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub seek: SeekConfig,
    pub line: LineConfig,
    pub pursuit: PursuitConfig,
}

/// Controller state as reported to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "state", rename_all = "snake_case")]
pub enum ControllerStatus {
    Seek(SeekState),
    Line(Direction),
    Pursuit(PursuitPhase),
}

/// One controller of any kind
pub enum Autopilot {
    Seek(Controller<SeekPolicy>),
    Line(Controller<LinePolicy>),
    Pursuit(Controller<PursuitPolicy>),
}

impl Autopilot {
    pub fn new(mode: Mode, config: &ControlConfig, detector: Detector, driver: SharedDriver) -> Self {
        match mode {
            Mode::Seek => Autopilot::Seek(Controller::new(
                "seek",
                SeekPolicy::new(config.seek),
                config.seek.tick,
                detector,
                driver,
            )),
            Mode::Line => Autopilot::Line(Controller::new(
                "line",
                LinePolicy::new(config.line),
                config.line.tick,
                detector,
                driver,
            )),
            Mode::Pursuit => Autopilot::Pursuit(Controller::new(
                "pursuit",
                PursuitPolicy::new(config.pursuit),
                config.pursuit.tick,
                detector,
                driver,
            )),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Autopilot::Seek(_) => Mode::Seek,
            Autopilot::Line(_) => Mode::Line,
            Autopilot::Pursuit(_) => Mode::Pursuit,
        }
    }

    pub fn start(&mut self) {
        match self {
            Autopilot::Seek(c) => c.start(),
            Autopilot::Line(c) => c.start(),
            Autopilot::Pursuit(c) => c.start(),
        }
    }

    pub async fn stop(&mut self) {
        match self {
            Autopilot::Seek(c) => c.stop().await,
            Autopilot::Line(c) => c.stop().await,
            Autopilot::Pursuit(c) => c.stop().await,
        }
    }

    pub async fn close(&mut self) {
        match self {
            Autopilot::Seek(c) => c.close().await,
            Autopilot::Line(c) => c.close().await,
            Autopilot::Pursuit(c) => c.close().await,
        }
    }

    pub fn is_running(&self) -> bool {
        match self {
            Autopilot::Seek(c) => c.is_running(),
            Autopilot::Line(c) => c.is_running(),
            Autopilot::Pursuit(c) => c.is_running(),
        }
    }

    pub fn status(&self) -> ControllerStatus {
        match self {
            Autopilot::Seek(c) => ControllerStatus::Seek(c.state()),
            Autopilot::Line(c) => ControllerStatus::Line(c.state()),
            Autopilot::Pursuit(c) => ControllerStatus::Pursuit(c.state()),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Autopilot::Seek(c) => c.position(),
            Autopilot::Line(c) => c.position(),
            Autopilot::Pursuit(c) => c.position(),
        }
    }

    pub fn display_frame(&self) -> Option<Arc<DisplayFrame>> {
        match self {
            Autopilot::Seek(c) => c.display_frame(),
            Autopilot::Line(c) => c.display_frame(),
            Autopilot::Pursuit(c) => c.display_frame(),
        }
    }

    pub fn set_color_range(&self, range: ColorRange) {
        match self {
            Autopilot::Seek(c) => c.set_color_range(range),
            Autopilot::Line(c) => c.set_color_range(range),
            Autopilot::Pursuit(c) => c.set_color_range(range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json_shape() {
        let status = ControllerStatus::Seek(SeekState::Following);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "seek", "state": "following"}));

        let status: ControllerStatus =
            serde_json::from_str(r#"{"mode":"pursuit","state":"turning_left"}"#).unwrap();
        assert_eq!(status, ControllerStatus::Pursuit(PursuitPhase::TurningLeft));
    }

    #[test]
    fn test_control_config_partial_json() {
        let config: ControlConfig =
            serde_json::from_str(r#"{"seek": {"loss_timeout": 500}, "line": {"turning_speed": 60}}"#)
                .unwrap();
        assert_eq!(config.seek.loss_timeout, std::time::Duration::from_millis(500));
        assert_eq!(config.seek.spin_speed, 100);
        assert_eq!(config.line.turning_speed, 60);
        assert_eq!(config.pursuit, PursuitConfig::default());
    }
}
