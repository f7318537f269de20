// Motor control module for the ThunderBorg differential-drive base
//
// Provides:
// - ThunderBorg I2C command protocol and driver
// - Dead-reckoning conversion (distance/angle -> timed move)
// - Timed motion controller on top of the driver

pub mod frame;
pub mod kinematics;
#[cfg(test)]
pub(crate) mod mock;
mod motion;
pub mod thunderborg;
pub mod transport;

pub use frame::{Frame, MAX_FRAME_LEN};
pub use kinematics::MoveCommand;
pub use motion::{MotionController, MAX_POWER};
pub use thunderborg::{
    Command, Direction, DriverState, MotorId, PowerLevel, ThunderborgDriver, ThunderborgError,
};
pub use transport::{I2cTransport, Transport};
