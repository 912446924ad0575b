// Motor protocol driver for the Roomba base
//
// Writes SCI opcodes and drive frames to a transport. Single-byte commands
// are followed by a fixed settle delay; the device drops bytes that arrive
// while it is still processing the previous one.

use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::protocol::{DriveCommand, Opcode};
use super::transport::{self, Transport};

/// Wait after every single-opcode command
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Reset line hold time during connect
pub const RESET_HOLD: Duration = Duration::from_millis(100);

/// Boot time after reset before commands are meaningful
pub const BOOT_WAIT: Duration = Duration::from_secs(2);

/// Error types for motor communication
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },
}

pub type Result<T> = std::result::Result<T, MotorError>;

/// Motor protocol driver. Owns the transport exclusively; callers serialize access.
pub struct MotorDriver {
    transport: Box<dyn Transport>,
}

impl MotorDriver {
    /// Open the serial port and run the hardware reset sequence.
    ///
    /// Blocks for roughly two seconds while the device boots.
    pub fn connect(port: &str, baudrate: u32) -> Result<Self> {
        info!("Opening SCI port {} at {} baud", port, baudrate);
        let serial = transport::open_serial(port, baudrate)?;
        let mut driver = Self::from_transport(serial);
        driver.reset()?;
        Ok(driver)
    }

    /// Wrap an already-open transport without resetting the device
    pub fn from_transport<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Toggle the reset line and wait for the device to boot
    pub fn reset(&mut self) -> Result<()> {
        debug!("Resetting device");
        self.transport.set_reset_line(false)?;
        sleep(RESET_HOLD);
        self.transport.set_reset_line(true)?;
        sleep(BOOT_WAIT);
        info!("Device reset complete");
        Ok(())
    }

    fn send_opcode(&mut self, opcode: Opcode) -> Result<()> {
        debug!("Sending opcode {:?} ({})", opcode, opcode as u8);
        let result = self.write_frame(&[opcode as u8]);
        sleep(SETTLE_DELAY);
        result
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.transport.write_all(frame)?;
        self.transport.flush()?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Start)
    }

    pub fn control(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Control)
    }

    pub fn safe_mode(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Safe)
    }

    pub fn full_mode(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Full)
    }

    pub fn clean(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Clean)
    }

    pub fn spot_clean(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Spot)
    }

    pub fn max_clean(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Max)
    }

    pub fn dock(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Dock)
    }

    pub fn power_off(&mut self) -> Result<()> {
        self.send_opcode(Opcode::Power)
    }

    /// Drive with velocity in mm/s and turn radius in mm
    pub fn drive(&mut self, velocity: i16, radius: i16) -> Result<()> {
        self.send_drive(DriveCommand::new(velocity, radius))
    }

    /// Write a drive frame. No settle delay: the control loop paces these.
    pub fn send_drive(&mut self, command: DriveCommand) -> Result<()> {
        debug!(
            "Drive: velocity={}, radius={}",
            command.velocity, command.radius
        );
        self.write_frame(&command.encode())
    }

    /// Drive(0, 0)
    pub fn stop(&mut self) -> Result<()> {
        self.send_drive(DriveCommand::STOP)
    }
}

impl Drop for MotorDriver {
    fn drop(&mut self) {
        // Try to stop the wheels when the driver goes away
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
