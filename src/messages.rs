// Define message types for the runtime bus

use serde::{Deserialize, Serialize};

use crate::config::{MANUAL_SPEED, MANUAL_SPEED_MAX, MANUAL_SPEED_MIN};
use crate::control::{ControllerStatus, Mode};
use crate::motor::DriveCommand;
use crate::motor::protocol::{MAX_RADIUS, MAX_VELOCITY};
use crate::vision::{ColorPreset, ColorRange, Position};

// Command from teleop/scripts -> runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Engage a controller, replacing any active one
    Seek {
        #[serde(default)]
        mode: Mode,
        #[serde(default)]
        color: Option<ColorSelection>,
    },
    /// Disengage and stop the wheels
    Stop,
    /// Manual drive; disengages any controller first
    Move {
        command: MoveCommand,
        #[serde(default)]
        speed: Option<i32>,
    },
    /// Raw drive passthrough (values clamped); disengages any controller first
    Drive { velocity: i32, radius: i32 },
    /// Single-opcode device command; disengages any controller first
    Macro { name: MacroCommand },
    /// Retarget the active controller's detector
    SetColor { color: ColorSelection },
}

/// A preset name or explicit bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSelection {
    Named(String),
    Range(ColorRange),
}

impl ColorSelection {
    /// Unknown names fall back to green
    pub fn range(&self) -> ColorRange {
        match self {
            ColorSelection::Named(name) => ColorPreset::from_name_or_default(name).range(),
            ColorSelection::Range(range) => *range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl MoveCommand {
    /// Map to a drive command; speed defaults to 150 and is clamped to [50, 300]
    pub fn drive(self, speed: Option<i32>) -> DriveCommand {
        let speed = speed.map_or(MANUAL_SPEED, |speed| {
            speed.clamp(i32::from(MANUAL_SPEED_MIN), i32::from(MANUAL_SPEED_MAX)) as i16
        });
        match self {
            MoveCommand::Forward => DriveCommand::straight(speed),
            MoveCommand::Backward => DriveCommand::straight(-speed),
            MoveCommand::Left => DriveCommand::spin_left(speed),
            MoveCommand::Right => DriveCommand::spin_right(speed),
            MoveCommand::Stop => DriveCommand::STOP,
        }
    }
}

/// Drive command from wire-sized integers. Out-of-range radii become the
/// widest arc on that side rather than a magic value.
pub fn raw_drive(velocity: i32, radius: i32) -> DriveCommand {
    let velocity = velocity.clamp(-i32::from(MAX_VELOCITY), i32::from(MAX_VELOCITY)) as i16;
    let radius = i16::try_from(radius).unwrap_or(if radius > 0 { MAX_RADIUS } else { -MAX_RADIUS });
    DriveCommand::new(velocity, radius)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroCommand {
    Start,
    Control,
    SafeMode,
    FullMode,
    Clean,
    SpotClean,
    MaxClean,
    Dock,
    PowerOff,
}

/// Status published by runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub position: Position,
    pub controller: Option<ControllerStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SeekState;
    use crate::motor::{SPIN_CCW, SPIN_CW, STRAIGHT};
    use crate::vision::Hsv;

    #[test]
    fn test_parse_commands() {
        let cmd: Command = serde_json::from_str(r#"{"type":"seek","color":"lime"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Seek {
                mode: Mode::Seek,
                color: Some(ColorSelection::Named("lime".into()))
            }
        );

        let cmd: Command =
            serde_json::from_str(r#"{"type":"move","command":"backward","speed":1000}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Move {
                command: MoveCommand::Backward,
                speed: Some(1000)
            }
        );

        let cmd: Command = serde_json::from_str(r#"{"type":"macro","name":"dock"}"#).unwrap();
        assert_eq!(cmd, Command::Macro { name: MacroCommand::Dock });

        let cmd: Command =
            serde_json::from_str(r#"{"type":"drive","velocity":-200,"radius":1}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Drive {
                velocity: -200,
                radius: 1
            }
        );

        let cmd: Command = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert_eq!(cmd, Command::Stop);

        assert!(serde_json::from_str::<Command>(r#"{"type":"fly"}"#).is_err());
    }

    #[test]
    fn test_explicit_color_range() {
        let cmd: Command = serde_json::from_str(
            r#"{"type":"set_color","color":{"lower":{"h":1,"s":2,"v":3},"upper":{"h":4,"s":5,"v":6}}}"#,
        )
        .unwrap();
        let Command::SetColor { color } = cmd else {
            panic!("expected set_color");
        };
        assert_eq!(
            color.range(),
            ColorRange::new(Hsv::new(1, 2, 3), Hsv::new(4, 5, 6))
        );
    }

    #[test]
    fn test_named_color_fallback() {
        assert_eq!(
            ColorSelection::Named("mauve".into()).range(),
            ColorPreset::Green.range()
        );
        assert_eq!(
            ColorSelection::Named("red".into()).range(),
            ColorPreset::Red.range()
        );
    }

    #[test]
    fn test_manual_moves() {
        assert_eq!(MoveCommand::Forward.drive(None), DriveCommand::new(150, STRAIGHT));
        assert_eq!(MoveCommand::Backward.drive(Some(200)), DriveCommand::new(-200, STRAIGHT));
        assert_eq!(MoveCommand::Left.drive(Some(10)), DriveCommand::new(50, SPIN_CCW));
        assert_eq!(MoveCommand::Right.drive(Some(999)), DriveCommand::new(300, SPIN_CW));
        assert_eq!(MoveCommand::Stop.drive(Some(200)), DriveCommand::STOP);
    }

    #[test]
    fn test_oversized_values_are_clamped() {
        let cmd: Command =
            serde_json::from_str(r#"{"type":"move","command":"forward","speed":40000}"#).unwrap();
        let Command::Move { command, speed } = cmd else {
            panic!("expected move");
        };
        assert_eq!(command.drive(speed), DriveCommand::straight(300));
        assert_eq!(MoveCommand::Backward.drive(Some(-40000)), DriveCommand::straight(-50));

        let cmd: Command =
            serde_json::from_str(r#"{"type":"drive","velocity":-70000,"radius":90000}"#).unwrap();
        let Command::Drive { velocity, radius } = cmd else {
            panic!("expected drive");
        };
        assert_eq!(raw_drive(velocity, radius), DriveCommand::new(-500, 2000));
        assert_eq!(raw_drive(100, -90000), DriveCommand::new(100, -2000));
        assert_eq!(raw_drive(100, 32767), DriveCommand::straight(100));
        assert_eq!(raw_drive(100, -1), DriveCommand::spin_right(100));
    }

    #[test]
    fn test_status_json() {
        let report = StatusReport {
            position: Position::NotFound,
            controller: Some(ControllerStatus::Seek(SeekState::Spinning)),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"position":"not_found","controller":{"mode":"seek","state":"spinning"}}"#
        );
    }
}
