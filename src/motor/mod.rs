// Motor control module for the Roomba base
//
// Provides:
// - SCI opcode set and drive frame codec
// - Serial transport with reset line control
// - Motor protocol driver API

mod driver;
pub mod protocol;
pub mod transport;

use parking_lot::Mutex;
use std::sync::Arc;

pub use driver::{BOOT_WAIT, MotorDriver, MotorError, RESET_HOLD, SETTLE_DELAY};
pub use protocol::{DriveCommand, Opcode, SPIN_CCW, SPIN_CW, STRAIGHT};
pub use transport::{DEFAULT_BAUDRATE, Transport};

/// Driver handle shared between the session and the active controller
pub type SharedDriver = Arc<Mutex<MotorDriver>>;

pub fn shared(driver: MotorDriver) -> SharedDriver {
    Arc::new(Mutex::new(driver))
}
