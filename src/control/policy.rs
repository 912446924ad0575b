// Position-to-drive-command policies
//
// A policy is the pure part of a controller: given the sampled position and
// the current time it decides what (if anything) to send to the motors.
// The sampling loop, detector and driver plumbing live in `Controller`.

use std::fmt::Debug;
use std::time::Instant;

use crate::motor::DriveCommand;
use crate::vision::Position;

pub trait SteeringPolicy: Send + 'static {
    /// Externally visible state (seek state, line direction, ...)
    type State: Copy + Debug + PartialEq + Send + Sync + 'static;

    /// Called once on start; returns the initial drive command, if any
    fn begin(&mut self, now: Instant) -> Option<DriveCommand>;

    /// Called every tick with the latest position. `None` leaves the motors alone.
    fn on_tick(&mut self, position: Position, now: Instant) -> Option<DriveCommand>;

    /// Called after the loop has exited and the motors were stopped
    fn halt(&mut self);

    fn state(&self) -> Self::State;
}
