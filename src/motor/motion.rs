// Timed, open-loop motion on top of the ThunderBorg driver
//
// Every move is: both motors on, block for the computed time, all off.

use std::time::Duration;
use tracing::{debug, error, info};

use super::kinematics::MoveCommand;
use super::thunderborg::{MotorId, PWM_MAX, Result, ThunderborgDriver};
use super::transport::{I2cTransport, Transport};
use crate::config::Calibration;

/// Power used for every move: 95% of PWM_MAX, leaving headroom for the
/// rest of the robot on the same supply
pub const MAX_POWER: u16 = PWM_MAX as u16 * 95 / 100;

/// Differential-drive motion controller.
///
/// Holds the driver by exclusive borrow for as long as it lives, so no other
/// code can talk to the board in the middle of a move.
pub struct MotionController<'a, T: Transport = I2cTransport> {
    driver: &'a mut ThunderborgDriver<T>,
    calibration: Calibration,
    sleep: fn(Duration),
}

impl<'a, T: Transport> MotionController<'a, T> {
    pub fn new(driver: &'a mut ThunderborgDriver<T>, calibration: Calibration) -> Self {
        Self {
            driver,
            calibration,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the blocking wait between power-on and all-off
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Run both motors at MAX_POWER for `command.duration`, then stop.
    ///
    /// The wait and the stop always happen, even if setting a motor's power
    /// failed. Such a failure is logged and returned once the stop has been
    /// sent.
    pub fn perform_move(&mut self, command: MoveCommand) -> Result<()> {
        debug!(
            "Move: left={:?}, right={:?}, duration={}ms",
            command.left,
            command.right,
            command.duration.as_millis()
        );

        let left = self
            .driver
            .set_motor_power(MotorId::One, command.left, MAX_POWER);
        if let Err(e) = &left {
            error!("Failed to power left motor: {}", e);
        }
        let right = self
            .driver
            .set_motor_power(MotorId::Two, command.right, MAX_POWER);
        if let Err(e) = &right {
            error!("Failed to power right motor: {}", e);
        }

        (self.sleep)(command.duration);

        let off = self.driver.motors_off();
        if let Err(e) = &off {
            error!("Failed to switch motors off: {}", e);
        }

        left.and(right).and(off)
    }

    pub fn drive_forward(&mut self, centimeters: u32) -> Result<()> {
        info!("Driving forward {} cm", centimeters);
        self.perform_move(MoveCommand::forward(centimeters, &self.calibration))
    }

    pub fn drive_backward(&mut self, centimeters: u32) -> Result<()> {
        info!("Driving backward {} cm", centimeters);
        self.perform_move(MoveCommand::backward(centimeters, &self.calibration))
    }

    /// Spin in place; negative angles turn left, positive right
    pub fn perform_spin(&mut self, degrees: f32) -> Result<()> {
        info!("Spinning {} degrees", degrees);
        let command = MoveCommand::spin(degrees, &self.calibration)?;
        self.perform_move(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::I2C_ADDRESS;
    use crate::motor::mock::MockTransport;
    use crate::motor::thunderborg::{Command, ThunderborgError};
    use std::cell::RefCell;

    thread_local! {
        static SLEPT: RefCell<Vec<Duration>> = const { RefCell::new(Vec::new()) };
    }

    fn record_sleep(duration: Duration) {
        SLEPT.with(|slept| slept.borrow_mut().push(duration));
    }

    fn slept() -> Vec<Duration> {
        SLEPT.with(|slept| slept.borrow_mut().drain(..).collect())
    }

    fn driver() -> (ThunderborgDriver<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let mut driver = ThunderborgDriver::with_transport(mock.clone(), "/dev/i2c-test", I2C_ADDRESS);
        driver.initialize().unwrap();
        (driver, mock)
    }

    #[test]
    fn test_max_power_is_95_percent() {
        assert_eq!(MAX_POWER, 242);
    }

    #[test]
    fn test_drive_forward_sequence() {
        let (mut driver, mock) = driver();
        let mut motion = MotionController::new(&mut driver, Calibration::default()).with_sleep(record_sleep);

        motion.drive_forward(100).unwrap();

        assert_eq!(mock.written(), vec![vec![8, 242], vec![11, 242], vec![14]]);
        assert_eq!(slept(), vec![Duration::from_millis(5700)]);
    }

    #[test]
    fn test_drive_backward_sequence() {
        let (mut driver, mock) = driver();
        let mut motion = MotionController::new(&mut driver, Calibration::default()).with_sleep(record_sleep);

        motion.drive_backward(10).unwrap();

        assert_eq!(mock.written(), vec![vec![9, 242], vec![12, 242], vec![14]]);
        assert_eq!(slept(), vec![Duration::from_millis(570)]);
    }

    #[test]
    fn test_spin_left_and_right() {
        let (mut driver, mock) = driver();
        let mut motion = MotionController::new(&mut driver, Calibration::default()).with_sleep(record_sleep);

        motion.perform_spin(-180.0).unwrap();
        motion.perform_spin(720.0).unwrap();

        assert_eq!(
            mock.written(),
            vec![
                vec![9, 242],
                vec![11, 242],
                vec![14],
                vec![8, 242],
                vec![12, 242],
                vec![14],
            ]
        );
        assert_eq!(
            slept(),
            vec![Duration::from_millis(2400), Duration::from_millis(9600)]
        );
    }

    #[test]
    fn test_invalid_angle_sends_nothing() {
        let (mut driver, mock) = driver();
        let mut motion = MotionController::new(&mut driver, Calibration::default()).with_sleep(record_sleep);

        assert!(motion.perform_spin(f32::NAN).is_err());
        assert!(mock.written().is_empty());
        assert!(slept().is_empty());
    }

    #[test]
    fn test_power_failure_still_stops_motors() {
        let (mut driver, mock) = driver();
        mock.state
            .borrow_mut()
            .fail_writes_for
            .push(Command::SetAFwd as u8);
        let mut motion = MotionController::new(&mut driver, Calibration::default()).with_sleep(record_sleep);

        let err = motion.drive_forward(10).unwrap_err();
        assert!(matches!(err, ThunderborgError::Io(_)));

        // Right motor was still powered, the wait happened, and all-off was sent
        assert_eq!(mock.written(), vec![vec![11, 242], vec![14]]);
        assert_eq!(slept(), vec![Duration::from_millis(570)]);
    }

    #[test]
    fn test_uninitialized_driver_reports_error() {
        let mock = MockTransport::new();
        let mut driver = ThunderborgDriver::with_transport(mock.clone(), "/dev/i2c-test", I2C_ADDRESS);
        let mut motion = MotionController::new(&mut driver, Calibration::default()).with_sleep(record_sleep);

        let err = motion.perform_spin(90.0).unwrap_err();
        assert!(matches!(err, ThunderborgError::Uninitialized));
        assert!(mock.written().is_empty());
        slept();
    }
}
