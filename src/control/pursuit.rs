// Pursuit controller: slow clockwise search, drive at the color when centered,
// turn toward it otherwise. A short loss is ridden out on the current motion;
// a longer one stops the robot once and then resumes searching.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::policy::SteeringPolicy;
use crate::config::{PURSUIT_STOP_DELAY, TICK_INTERVAL};
use crate::motor::DriveCommand;
use crate::vision::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuitConfig {
    /// Rotation speed for both searching and turning toward the color
    pub search_speed: i16,
    pub forward_speed: i16,
    /// How long the color may vanish before stopping
    #[serde(with = "crate::config::millis")]
    pub stop_delay: Duration,
    #[serde(with = "crate::config::millis")]
    pub tick: Duration,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            search_speed: 35,
            forward_speed: 130,
            stop_delay: PURSUIT_STOP_DELAY,
            tick: TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuitPhase {
    Idle,
    Searching,
    Advancing,
    TurningLeft,
    TurningRight,
    Lost,
}

pub struct PursuitPolicy {
    config: PursuitConfig,
    phase: PursuitPhase,
    last_seen: Option<Instant>,
    // Last side the color was *detected* on; NOT_FOUND ticks do not reset it
    last_detected: Position,
}

impl PursuitPolicy {
    pub fn new(config: PursuitConfig) -> Self {
        Self {
            config,
            phase: PursuitPhase::Idle,
            last_seen: None,
            last_detected: Position::NotFound,
        }
    }

    fn enter(&mut self, phase: PursuitPhase) {
        if self.phase != phase {
            info!("Pursuit: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn turn_speed(&self, position: Position) -> i16 {
        let opposite = match position {
            Position::Left => Position::Right,
            Position::Right => Position::Left,
            _ => return self.config.search_speed,
        };
        if self.last_detected == opposite {
            self.config.search_speed / 2
        } else {
            self.config.search_speed
        }
    }
}

impl SteeringPolicy for PursuitPolicy {
    type State = PursuitPhase;

    fn begin(&mut self, _now: Instant) -> Option<DriveCommand> {
        self.last_seen = None;
        self.last_detected = Position::NotFound;
        self.enter(PursuitPhase::Searching);
        Some(DriveCommand::spin_right(self.config.search_speed))
    }

    fn on_tick(&mut self, position: Position, now: Instant) -> Option<DriveCommand> {
        if self.phase == PursuitPhase::Idle {
            return None;
        }

        let command = match position {
            Position::NotFound => match self.last_seen {
                Some(seen) if now.saturating_duration_since(seen) > self.config.stop_delay => {
                    info!("Color lost - stopping");
                    self.last_seen = None;
                    self.enter(PursuitPhase::Lost);
                    Some(DriveCommand::STOP)
                }
                // recently seen: ride it out on the current motion
                Some(_) => None,
                None => {
                    self.enter(PursuitPhase::Searching);
                    Some(DriveCommand::spin_right(self.config.search_speed))
                }
            },
            Position::Centered => {
                self.enter(PursuitPhase::Advancing);
                Some(DriveCommand::straight(self.config.forward_speed))
            }
            Position::Left => {
                self.enter(PursuitPhase::TurningLeft);
                Some(DriveCommand::spin_left(self.turn_speed(position)))
            }
            Position::Right => {
                self.enter(PursuitPhase::TurningRight);
                Some(DriveCommand::spin_right(self.turn_speed(position)))
            }
        };

        if position != Position::NotFound {
            self.last_seen = Some(now);
            self.last_detected = position;
        }
        if let Some(command) = command {
            debug!("Pursuit {:?} on {}: {:?}", self.phase, position, command);
        }
        command
    }

    fn halt(&mut self) {
        self.enter(PursuitPhase::Idle);
        self.last_seen = None;
        self.last_detected = Position::NotFound;
    }

    fn state(&self) -> PursuitPhase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn started() -> (PursuitPolicy, Instant) {
        let mut policy = PursuitPolicy::new(PursuitConfig::default());
        let now = Instant::now();
        assert_eq!(policy.begin(now), Some(DriveCommand::spin_right(35)));
        assert_eq!(policy.state(), PursuitPhase::Searching);
        (policy, now)
    }

    #[test]
    fn test_idle_until_started() {
        let mut policy = PursuitPolicy::new(PursuitConfig::default());
        assert_eq!(policy.on_tick(Position::Centered, Instant::now()), None);
        assert_eq!(policy.state(), PursuitPhase::Idle);
    }

    #[test]
    fn test_searches_until_seen() {
        let (mut policy, t0) = started();
        assert_eq!(
            policy.on_tick(Position::NotFound, t0 + ms(50)),
            Some(DriveCommand::spin_right(35))
        );
        assert_eq!(
            policy.on_tick(Position::Centered, t0 + ms(100)),
            Some(DriveCommand::straight(130))
        );
        assert_eq!(policy.state(), PursuitPhase::Advancing);
    }

    #[test]
    fn test_short_loss_keeps_motion() {
        let (mut policy, t0) = started();
        policy.on_tick(Position::Centered, t0);
        assert_eq!(policy.on_tick(Position::NotFound, t0 + ms(200)), None);
        assert_eq!(policy.on_tick(Position::NotFound, t0 + ms(300)), None);
        assert_eq!(policy.state(), PursuitPhase::Advancing);
    }

    #[test]
    fn test_long_loss_stops_then_searches() {
        let (mut policy, t0) = started();
        policy.on_tick(Position::Centered, t0);
        assert_eq!(
            policy.on_tick(Position::NotFound, t0 + ms(301)),
            Some(DriveCommand::STOP)
        );
        assert_eq!(policy.state(), PursuitPhase::Lost);

        assert_eq!(
            policy.on_tick(Position::NotFound, t0 + ms(350)),
            Some(DriveCommand::spin_right(35))
        );
        assert_eq!(policy.state(), PursuitPhase::Searching);
    }

    #[test]
    fn test_side_switch_damped_across_gaps() {
        let (mut policy, t0) = started();
        assert_eq!(
            policy.on_tick(Position::Left, t0),
            Some(DriveCommand::spin_left(35))
        );
        // a brief dropout does not clear the remembered side
        policy.on_tick(Position::NotFound, t0 + ms(50));
        assert_eq!(
            policy.on_tick(Position::Right, t0 + ms(100)),
            Some(DriveCommand::spin_right(17))
        );
        assert_eq!(
            policy.on_tick(Position::Right, t0 + ms(150)),
            Some(DriveCommand::spin_right(35))
        );
    }

    #[test]
    fn test_centered_clears_side() {
        let (mut policy, t0) = started();
        policy.on_tick(Position::Left, t0);
        policy.on_tick(Position::Centered, t0 + ms(50));
        assert_eq!(
            policy.on_tick(Position::Right, t0 + ms(100)),
            Some(DriveCommand::spin_right(35))
        );
    }

    #[test]
    fn test_halt_goes_idle() {
        let (mut policy, t0) = started();
        policy.on_tick(Position::Centered, t0);
        policy.halt();
        assert_eq!(policy.state(), PursuitPhase::Idle);
        assert_eq!(policy.on_tick(Position::Centered, t0), None);
    }
}
