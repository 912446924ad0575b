// Roomba SCI command set
//
// Single-byte opcodes, plus the 5-byte drive frame:
// [137, velocity_hi, velocity_lo, radius_hi, radius_lo] (big-endian, signed)

use serde::{Deserialize, Serialize};

use super::MotorError;

/// Velocity limits in mm/s
pub const MAX_VELOCITY: i16 = 500;

/// Arc radius limits in mm (magic values excepted)
pub const MAX_RADIUS: i16 = 2000;

/// Drive straight ahead. The SCI also accepts 0x8000 for this.
pub const STRAIGHT: i16 = 32767;
const STRAIGHT_ALT: i16 = i16::MIN;

/// Rotate in place counter-clockwise
pub const SPIN_CCW: i16 = 1;

/// Rotate in place clockwise
pub const SPIN_CW: i16 = -1;

/// Length of an encoded drive frame
pub const DRIVE_FRAME_LEN: usize = 5;

/// Opcode set
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Start = 128,
    Control = 130,
    Safe = 131,
    Full = 132,
    Power = 133,
    Spot = 134,
    Clean = 135,
    Max = 136,
    Drive = 137,
    Motors = 138,
    Leds = 139,
    Dock = 143,
}

impl TryFrom<u8> for Opcode {
    type Error = MotorError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            128 => Opcode::Start,
            130 => Opcode::Control,
            131 => Opcode::Safe,
            132 => Opcode::Full,
            133 => Opcode::Power,
            134 => Opcode::Spot,
            135 => Opcode::Clean,
            136 => Opcode::Max,
            137 => Opcode::Drive,
            138 => Opcode::Motors,
            139 => Opcode::Leds,
            143 => Opcode::Dock,
            other => return Err(MotorError::UnknownOpcode(other)),
        })
    }
}

/// A (velocity, turn radius) pair for the drive opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    pub velocity: i16,
    pub radius: i16,
}

impl DriveCommand {
    /// Full stop, (0, 0)
    pub const STOP: DriveCommand = DriveCommand {
        velocity: 0,
        radius: 0,
    };

    /// Build a command, clamping velocity to +-500 mm/s and arc radii to +-2000 mm.
    /// The magic radii (straight, spin in place) pass through untouched.
    pub fn new(velocity: i16, radius: i16) -> Self {
        let velocity = velocity.clamp(-MAX_VELOCITY, MAX_VELOCITY);
        let radius = match radius {
            STRAIGHT | STRAIGHT_ALT | SPIN_CCW | SPIN_CW => radius,
            r => r.clamp(-MAX_RADIUS, MAX_RADIUS),
        };
        Self { velocity, radius }
    }

    pub fn straight(velocity: i16) -> Self {
        Self::new(velocity, STRAIGHT)
    }

    /// Rotate in place counter-clockwise (toward the left)
    pub fn spin_left(speed: i16) -> Self {
        Self::new(speed, SPIN_CCW)
    }

    /// Rotate in place clockwise (toward the right)
    pub fn spin_right(speed: i16) -> Self {
        Self::new(speed, SPIN_CW)
    }

    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }

    /// Encode as opcode + big-endian velocity + big-endian radius
    pub fn encode(&self) -> [u8; DRIVE_FRAME_LEN] {
        let [v_hi, v_lo] = self.velocity.to_be_bytes();
        let [r_hi, r_lo] = self.radius.to_be_bytes();
        [Opcode::Drive as u8, v_hi, v_lo, r_hi, r_lo]
    }

    /// Decode a drive frame as written by `encode`
    pub fn decode(frame: &[u8]) -> Result<Self, MotorError> {
        if frame.len() != DRIVE_FRAME_LEN {
            return Err(MotorError::InvalidFrame {
                reason: format!("expected {} bytes, got {}", DRIVE_FRAME_LEN, frame.len()),
            });
        }
        let opcode = Opcode::try_from(frame[0])?;
        if opcode != Opcode::Drive {
            return Err(MotorError::InvalidFrame {
                reason: format!("expected drive opcode, got {:?}", opcode),
            });
        }
        Ok(Self {
            velocity: i16::from_be_bytes([frame[1], frame[2]]),
            radius: i16::from_be_bytes([frame[3], frame[4]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_straight_encoding() {
        let frame = DriveCommand::new(300, STRAIGHT).encode();
        assert_eq!(frame, [137, 0x01, 0x2C, 0x7F, 0xFF]);
    }

    #[test]
    fn test_reverse_is_twos_complement() {
        let frame = DriveCommand::new(-300, STRAIGHT).encode();
        // -300 = 0xFED4
        assert_eq!(&frame[..3], &[137, 0xFE, 0xD4]);
    }

    #[test]
    fn test_stop_encoding() {
        assert_eq!(DriveCommand::STOP.encode(), [137, 0, 0, 0, 0]);
        assert!(DriveCommand::new(0, 0).is_stop());
    }

    #[test]
    fn test_spin_radii() {
        assert_eq!(DriveCommand::spin_left(80).encode(), [137, 0, 80, 0x00, 0x01]);
        assert_eq!(DriveCommand::spin_right(80).encode(), [137, 0, 80, 0xFF, 0xFF]);
    }

    #[test]
    fn test_clamping() {
        let cmd = DriveCommand::new(900, 5000);
        assert_eq!(cmd.velocity, 500);
        assert_eq!(cmd.radius, 2000);

        let cmd = DriveCommand::new(-900, -5000);
        assert_eq!(cmd.velocity, -500);
        assert_eq!(cmd.radius, -2000);

        // magic radii are not arcs
        assert_eq!(DriveCommand::new(100, i16::MIN).radius, i16::MIN);
        assert_eq!(DriveCommand::new(100, STRAIGHT).radius, STRAIGHT);
    }

    #[test]
    fn test_decode() {
        let cmd = DriveCommand::decode(&[137, 0xFE, 0xD4, 0x00, 0x01]).unwrap();
        assert_eq!(cmd, DriveCommand::new(-300, SPIN_CCW));

        assert!(matches!(
            DriveCommand::decode(&[137, 0, 0]),
            Err(MotorError::InvalidFrame { .. })
        ));
        assert!(matches!(
            DriveCommand::decode(&[135, 0, 0, 0, 0]),
            Err(MotorError::InvalidFrame { .. })
        ));
        assert!(matches!(
            DriveCommand::decode(&[1, 0, 0, 0, 0]),
            Err(MotorError::UnknownOpcode(1))
        ));
    }

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::try_from(143).unwrap(), Opcode::Dock);
        assert_eq!(Opcode::Leds as u8, 139);
        assert!(Opcode::try_from(129).is_err());
    }
}
