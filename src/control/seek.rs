// Seek controller: spin to find the color, center on it, drive toward it
//
// SPINNING --centered--> FOLLOWING
// SPINNING --left/right--> CENTERING --centered--> FOLLOWING
// FOLLOWING --left/right--> CENTERING
// CENTERING/FOLLOWING --lost longer than loss_timeout--> STOPPED (terminal)

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::policy::SteeringPolicy;
use crate::config::{LOSS_TIMEOUT, TICK_INTERVAL};
use crate::motor::DriveCommand;
use crate::vision::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    /// Rotation speed while searching (mm/s)
    pub spin_speed: i16,
    /// Forward speed while the color is centered
    pub forward_speed: i16,
    /// Rotation speed while centering
    pub adjust_speed: i16,
    #[serde(with = "crate::config::millis")]
    pub tick: Duration,
    #[serde(with = "crate::config::millis")]
    pub loss_timeout: Duration,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            spin_speed: 100,
            forward_speed: 150,
            adjust_speed: 80,
            tick: TICK_INTERVAL,
            loss_timeout: LOSS_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekState {
    Spinning,
    Centering,
    Following,
    Stopped,
}

pub struct SeekPolicy {
    config: SeekConfig,
    state: SeekState,
    last_seen: Option<Instant>,
    last_command: Option<DriveCommand>,
}

impl SeekPolicy {
    pub fn new(config: SeekConfig) -> Self {
        Self {
            config,
            state: SeekState::Stopped,
            last_seen: None,
            last_command: None,
        }
    }

    fn spin(&self) -> DriveCommand {
        DriveCommand::spin_right(self.config.spin_speed)
    }

    fn transition(&mut self, next: SeekState) {
        if self.state != next {
            info!("Seek: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn lost_for_too_long(&self, now: Instant) -> bool {
        match self.last_seen {
            Some(seen) => now.saturating_duration_since(seen) > self.config.loss_timeout,
            None => true,
        }
    }

    fn decide(&mut self, position: Position, now: Instant) -> Option<DriveCommand> {
        if position != Position::NotFound {
            self.last_seen = Some(now);
        }

        match (self.state, position) {
            (SeekState::Stopped, _) => None,

            (SeekState::Spinning, Position::NotFound) => Some(self.spin()),

            (SeekState::Centering | SeekState::Following, Position::NotFound) => {
                if self.lost_for_too_long(now) {
                    info!("Color lost for too long - stopping");
                    self.transition(SeekState::Stopped);
                    Some(DriveCommand::STOP)
                } else {
                    // keep doing whatever we were doing
                    self.last_command
                }
            }

            (_, Position::Centered) => {
                self.transition(SeekState::Following);
                Some(DriveCommand::straight(self.config.forward_speed))
            }

            (_, Position::Left) => {
                self.transition(SeekState::Centering);
                Some(DriveCommand::spin_left(self.config.adjust_speed))
            }

            (_, Position::Right) => {
                self.transition(SeekState::Centering);
                Some(DriveCommand::spin_right(self.config.adjust_speed))
            }
        }
    }
}

impl SteeringPolicy for SeekPolicy {
    type State = SeekState;

    fn begin(&mut self, _now: Instant) -> Option<DriveCommand> {
        self.last_seen = None;
        self.transition(SeekState::Spinning);
        let spin = self.spin();
        self.last_command = Some(spin);
        Some(spin)
    }

    fn on_tick(&mut self, position: Position, now: Instant) -> Option<DriveCommand> {
        let command = self.decide(position, now);
        if let Some(command) = command {
            debug!("Seek {:?} on {}: {:?}", self.state, position, command);
            self.last_command = Some(command);
        }
        command
    }

    fn halt(&mut self) {
        self.transition(SeekState::Stopped);
        self.last_command = None;
    }

    fn state(&self) -> SeekState {
        self.state
    }
}
