// Line tracker: reflexive steering, no search phase and no loss timeout
//
// CENTERED -> FORWARD, LEFT/RIGHT -> turn in place, NOT_FOUND -> STOP.
// A turn that reverses the previous tick's side runs at half speed to damp
// oscillation around the line.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::policy::SteeringPolicy;
use crate::config::TICK_INTERVAL;
use crate::motor::DriveCommand;
use crate::vision::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub forward_speed: i16,
    pub turning_speed: i16,
    #[serde(with = "crate::config::millis")]
    pub tick: Duration,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            forward_speed: 150,
            turning_speed: 100,
            tick: TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Left,
    Right,
    Stop,
}

pub struct LinePolicy {
    config: LineConfig,
    direction: Direction,
    previous: Position,
}

impl LinePolicy {
    pub fn new(config: LineConfig) -> Self {
        Self {
            config,
            direction: Direction::Stop,
            previous: Position::NotFound,
        }
    }

    fn turn_speed(&self, position: Position) -> i16 {
        let flipped = matches!(
            (self.previous, position),
            (Position::Left, Position::Right) | (Position::Right, Position::Left)
        );
        if flipped {
            self.config.turning_speed / 2
        } else {
            self.config.turning_speed
        }
    }
}

impl SteeringPolicy for LinePolicy {
    type State = Direction;

    fn begin(&mut self, _now: Instant) -> Option<DriveCommand> {
        // The first tick decides; nothing to do until then
        self.previous = Position::NotFound;
        self.direction = Direction::Stop;
        None
    }

    fn on_tick(&mut self, position: Position, _now: Instant) -> Option<DriveCommand> {
        let (direction, command) = match position {
            Position::Centered => (
                Direction::Forward,
                DriveCommand::straight(self.config.forward_speed),
            ),
            Position::Left => (
                Direction::Left,
                DriveCommand::spin_left(self.turn_speed(position)),
            ),
            Position::Right => (
                Direction::Right,
                DriveCommand::spin_right(self.turn_speed(position)),
            ),
            Position::NotFound => (Direction::Stop, DriveCommand::STOP),
        };

        if direction != self.direction {
            info!("Line {}: {:?} -> {:?}", position, self.direction, direction);
        }
        debug!("Line {:?}: {:?}", direction, command);

        self.direction = direction;
        self.previous = position;
        Some(command)
    }

    fn halt(&mut self) {
        self.direction = Direction::Stop;
        self.previous = Position::NotFound;
    }

    fn state(&self) -> Direction {
        self.direction
    }
}
