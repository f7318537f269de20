// Dead-reckoning model for the two-wheel differential base
// Converts a distance or spin angle into a direction pair and a drive time.
// There is no feedback: accuracy depends entirely on the calibration.

use std::time::Duration;

use super::thunderborg::{Direction, Result, ThunderborgError};
use crate::config::Calibration;

/// One timed actuation of both wheels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCommand {
    pub left: Direction,
    pub right: Direction,
    pub duration: Duration,
}

impl MoveCommand {
    pub fn new(left: Direction, right: Direction, duration: Duration) -> Self {
        Self {
            left,
            right,
            duration,
        }
    }

    /// Both wheels forward for `centimeters`
    pub fn forward(centimeters: u32, calibration: &Calibration) -> Self {
        let duration = straight_duration(centimeters, calibration);
        Self::new(Direction::Forward, Direction::Forward, duration)
    }

    /// Both wheels in reverse for `centimeters`
    pub fn backward(centimeters: u32, calibration: &Calibration) -> Self {
        let duration = straight_duration(centimeters, calibration);
        Self::new(Direction::Reverse, Direction::Reverse, duration)
    }

    /// Spin in place by `degrees`.
    ///
    /// Negative angles turn left (left wheel reverse, right wheel forward),
    /// zero or positive angles turn right. Angles beyond a full turn are
    /// allowed and simply spin for longer.
    pub fn spin(degrees: f32, calibration: &Calibration) -> Result<Self> {
        if !degrees.is_finite() {
            return Err(ThunderborgError::Validation { field: "angle" });
        }

        let (left, right) = if degrees < 0.0 {
            (Direction::Reverse, Direction::Forward)
        } else {
            (Direction::Forward, Direction::Reverse)
        };

        let seconds = (degrees.abs() as f64 / 360.0) * calibration.seconds_per_spin;
        Ok(Self::new(left, right, seconds_to_duration(seconds)))
    }
}

fn straight_duration(centimeters: u32, calibration: &Calibration) -> Duration {
    let seconds_per_cm = calibration.seconds_per_meter / 100.0;
    seconds_to_duration(seconds_per_cm * centimeters as f64)
}

/// Round to whole milliseconds, the resolution moves are timed at
fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::from_millis((seconds * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_one_meter() {
        let cmd = MoveCommand::forward(100, &Calibration::default());
        assert_eq!(cmd.left, Direction::Forward);
        assert_eq!(cmd.right, Direction::Forward);
        assert_eq!(cmd.duration, Duration::from_millis(5700));
    }

    #[test]
    fn test_backward_ten_centimeters() {
        let cmd = MoveCommand::backward(10, &Calibration::default());
        assert_eq!((cmd.left, cmd.right), (Direction::Reverse, Direction::Reverse));
        assert_eq!(cmd.duration, Duration::from_millis(570));
    }

    #[test]
    fn test_zero_distance() {
        let cmd = MoveCommand::forward(0, &Calibration::default());
        assert_eq!(cmd.duration, Duration::ZERO);
    }

    #[test]
    fn test_left_half_turn() {
        let cmd = MoveCommand::spin(-180.0, &Calibration::default()).unwrap();
        assert_eq!((cmd.left, cmd.right), (Direction::Reverse, Direction::Forward));
        assert_eq!(cmd.duration, Duration::from_millis(2400));
    }

    #[test]
    fn test_two_full_right_turns() {
        let cmd = MoveCommand::spin(720.0, &Calibration::default()).unwrap();
        assert_eq!((cmd.left, cmd.right), (Direction::Forward, Direction::Reverse));
        assert_eq!(cmd.duration, Duration::from_millis(9600));
    }

    #[test]
    fn test_zero_angle_is_right_turn() {
        let cmd = MoveCommand::spin(0.0, &Calibration::default()).unwrap();
        assert_eq!((cmd.left, cmd.right), (Direction::Forward, Direction::Reverse));
        assert_eq!(cmd.duration, Duration::ZERO);
    }

    #[test]
    fn test_custom_calibration() {
        let calibration = Calibration {
            seconds_per_meter: 4.0,
            seconds_per_spin: 6.0,
        };
        let cmd = MoveCommand::forward(25, &calibration);
        assert_eq!(cmd.duration, Duration::from_millis(1000));

        let cmd = MoveCommand::spin(-90.0, &calibration).unwrap();
        assert_eq!(cmd.duration, Duration::from_millis(1500));
    }

    #[test]
    fn test_non_finite_angle_rejected() {
        for angle in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = MoveCommand::spin(angle, &Calibration::default()).unwrap_err();
            assert!(matches!(err, ThunderborgError::Validation { field: "angle" }));
        }
    }
}
