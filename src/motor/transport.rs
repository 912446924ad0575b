// Byte-oriented transport to the robot
//
// The serial link runs 8-N-1. RTS doubles as the device reset line on the
// usual USB adapters.

use serialport::{self, DataBits, Parity, SerialPort, StopBits};
use std::io::Write;
use std::time::Duration;

use super::MotorError;

/// Default serial configuration for the SCI port
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// A writable link with a controllable reset line
pub trait Transport: Write + Send {
    /// Drive the reset control line (RTS on a serial adapter)
    fn set_reset_line(&mut self, level: bool) -> Result<(), MotorError>;
}

impl Transport for Box<dyn SerialPort> {
    fn set_reset_line(&mut self, level: bool) -> Result<(), MotorError> {
        self.write_request_to_send(level)?;
        Ok(())
    }
}

/// Open a serial port with 8 data bits, no parity, one stop bit
pub fn open_serial(port_name: &str, baudrate: u32) -> Result<Box<dyn SerialPort>, MotorError> {
    let port = serialport::new(port_name, baudrate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .open()?;

    Ok(port)
}
