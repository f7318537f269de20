// ThunderBorg dual motor controller, I2C register protocol
//
// Write frame: [Opcode, Payload...]
// Read: write the 1-byte GET opcode, then read a 6-byte reply whose first
// byte echoes that opcode. The board answers asynchronously, so a read can
// return a stale reply for some other command; those are skipped.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::frame::{Frame, MAX_FRAME_LEN};
use super::transport::{I2cTransport, Transport};
use crate::config::{I2C_ADDRESS, I2C_BUS};

/// Maximum PWM value accepted by the board
pub const PWM_MAX: u8 = 255;

/// Full-scale reading of the 10-bit analog inputs
pub const ANALOG_MAX: u16 = 0x3FF;

/// Voltage at full scale on the battery monitoring pin
pub const VOLTAGE_PIN_MAX: f32 = 36.3;

/// Offset added after scaling the battery reading
pub const VOLTAGE_PIN_CORRECTION: f32 = 0.0;

/// Identifier reported in byte 1 of the GET_ID reply
pub const BOARD_ID: u8 = 0x15;

/// Reads per reply before giving up on a matching opcode
pub const REPLY_ATTEMPTS: usize = 3;

/// Opcodes understood by the board
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetLeds = 5,
    SetAFwd = 8,
    SetARev = 9,
    SetBFwd = 11,
    SetBRev = 12,
    AllOff = 14,
    GetBattVolt = 21,
    GetId = 0x99,
}

/// Rotation direction of a single motor
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward = 1,
    Reverse = 2,
}

impl TryFrom<u8> for Direction {
    type Error = ThunderborgError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(Direction::Forward),
            2 => Ok(Direction::Reverse),
            _ => Err(ThunderborgError::Validation { field: "direction" }),
        }
    }
}

/// Motor channel: One drives the left wheel, Two the right
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorId {
    One = 1,
    Two = 2,
}

impl TryFrom<u8> for MotorId {
    type Error = ThunderborgError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(MotorId::One),
            2 => Ok(MotorId::Two),
            _ => Err(ThunderborgError::Validation { field: "motor" }),
        }
    }
}

/// Motor power in [0, PWM_MAX]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PowerLevel(u8);

impl PowerLevel {
    pub const MAX: PowerLevel = PowerLevel(PWM_MAX);

    /// Clamp any request above PWM_MAX down to PWM_MAX
    pub fn clamped(power: u16) -> Self {
        Self(power.min(PWM_MAX as u16) as u8)
    }

    /// A fraction of full power, e.g. 0.95 for 95%
    pub fn fraction(fraction: f32) -> Self {
        Self((PWM_MAX as f32 * fraction.clamp(0.0, 1.0)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Lifecycle of the driver; commands are only sent once Initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Initialized,
}

/// Error types for ThunderBorg communication
#[derive(Debug, thiserror::Error)]
pub enum ThunderborgError {
    #[error("Failed to open bus {}: {source}", .path.display())]
    TransportOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to bind address 0x{address:02X}: {source}")]
    Bind {
        address: u8,
        source: std::io::Error,
    },

    #[error("Invalid {field}")]
    Validation { field: &'static str },

    #[error("Short write: {written} of {expected} bytes")]
    Transmission { expected: usize, written: usize },

    #[error("Short read for command 0x{command:02X}: {got} of {expected} bytes")]
    ShortRead {
        command: u8,
        expected: usize,
        got: usize,
    },

    #[error("No reply to command 0x{command:02X} after {attempts} reads")]
    ReplyNotFound { command: u8, attempts: usize },

    #[error("Driver not initialized")]
    Uninitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThunderborgError {
    /// Bytes went missing on the wire (short write or short read)
    pub fn is_transmission(&self) -> bool {
        matches!(
            self,
            ThunderborgError::Transmission { .. } | ThunderborgError::ShortRead { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ThunderborgError>;

/// Opcode driving `motor` in `direction`
pub fn motor_command(motor: MotorId, direction: Direction) -> Command {
    match (motor, direction) {
        (MotorId::One, Direction::Forward) => Command::SetAFwd,
        (MotorId::One, Direction::Reverse) => Command::SetARev,
        (MotorId::Two, Direction::Forward) => Command::SetBFwd,
        (MotorId::Two, Direction::Reverse) => Command::SetBRev,
    }
}

/// ThunderBorg board on a shared bus.
///
/// Owns its transport exclusively. Nothing is sent until [`initialize`]
/// succeeds; every command-issuing method checks this at runtime and
/// returns [`ThunderborgError::Uninitialized`] otherwise.
///
/// [`initialize`]: ThunderborgDriver::initialize
pub struct ThunderborgDriver<T: Transport = I2cTransport> {
    transport: T,
    path: PathBuf,
    address: u8,
    state: DriverState,
}

impl ThunderborgDriver<I2cTransport> {
    /// Driver for the board on the default I2C bus
    pub fn new() -> Self {
        Self::on_bus(I2C_BUS)
    }

    /// Driver for the board on a specific I2C bus device
    pub fn on_bus(path: impl AsRef<Path>) -> Self {
        Self::with_transport(I2cTransport::new(), path, I2C_ADDRESS)
    }
}

impl Default for ThunderborgDriver<I2cTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> ThunderborgDriver<T> {
    /// Wrap an unopened transport; call [`initialize`](Self::initialize) next
    pub fn with_transport(transport: T, path: impl AsRef<Path>, address: u8) -> Self {
        Self {
            transport,
            path: path.as_ref().to_path_buf(),
            address,
            state: DriverState::Uninitialized,
        }
    }

    /// Open the bus and bind the board's address
    pub fn initialize(&mut self) -> Result<()> {
        if self.state == DriverState::Initialized {
            return Ok(());
        }

        info!("Opening ThunderBorg bus on {}", self.path.display());
        self.transport
            .open(&self.path)
            .map_err(|source| ThunderborgError::TransportOpen {
                path: self.path.clone(),
                source,
            })?;
        self.transport
            .bind(self.address)
            .map_err(|source| ThunderborgError::Bind {
                address: self.address,
                source,
            })?;

        self.state = DriverState::Initialized;
        info!("ThunderBorg driver initialized at 0x{:02X}", self.address);
        Ok(())
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == DriverState::Initialized
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(ThunderborgError::Uninitialized)
        }
    }

    /// Write raw bytes as one frame, returning the number of bytes written
    pub fn write_frame(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Err(ThunderborgError::Validation { field: "frame" });
        }
        if bytes.len() > MAX_FRAME_LEN {
            return Err(ThunderborgError::Validation {
                field: "frame length",
            });
        }
        self.ensure_initialized()?;

        debug!("Write frame {:02X?}", bytes);
        let written = self.transport.write(bytes)?;
        if written < bytes.len() {
            return Err(ThunderborgError::Transmission {
                expected: bytes.len(),
                written,
            });
        }
        Ok(written)
    }

    /// Write a frame built with [`Frame`]
    pub fn send(&mut self, frame: &Frame) -> Result<usize> {
        self.write_frame(frame.as_bytes())
    }

    /// Read until a reply starting with `command` shows up.
    ///
    /// Full-length replies for some other command use up one of
    /// [`REPLY_ATTEMPTS`]. A short read means the bus itself misbehaved and
    /// fails straight away.
    pub fn read_command_reply(&mut self, command: u8, expected_len: usize) -> Result<Vec<u8>> {
        if expected_len == 0 || expected_len > MAX_FRAME_LEN {
            return Err(ThunderborgError::Validation {
                field: "reply length",
            });
        }
        self.ensure_initialized()?;

        let mut buf = vec![0u8; expected_len];
        for attempt in 1..=REPLY_ATTEMPTS {
            let got = self.transport.read(&mut buf)?;
            if got < expected_len {
                return Err(ThunderborgError::ShortRead {
                    command,
                    expected: expected_len,
                    got,
                });
            }
            if buf[0] == command {
                debug!("Reply to 0x{:02X} on attempt {}: {:02X?}", command, attempt, buf);
                return Ok(buf);
            }
            warn!(
                "Skipping reply 0x{:02X} while waiting for 0x{:02X} (attempt {}/{})",
                buf[0], command, attempt, REPLY_ATTEMPTS
            );
        }

        Err(ThunderborgError::ReplyNotFound {
            command,
            attempts: REPLY_ATTEMPTS,
        })
    }

    /// Send a GET opcode and read back its reply
    pub fn raw_read(&mut self, command: Command, expected_len: usize) -> Result<Vec<u8>> {
        self.send(&Frame::new(command))?;
        self.read_command_reply(command as u8, expected_len)
    }

    /// Drive one motor in `direction` at `power` (clamped to PWM_MAX)
    pub fn set_motor_power(&mut self, motor: MotorId, direction: Direction, power: u16) -> Result<()> {
        self.ensure_initialized()?;

        let power = PowerLevel::clamped(power);
        let command = motor_command(motor, direction);
        debug!("Motor {:?} {:?} at power {}", motor, direction, power.value());

        let frame = Frame::with_payload(command, &[power.value()])?;
        self.send(&frame)?;
        Ok(())
    }

    /// Same as [`set_motor_power`](Self::set_motor_power) for raw wire values
    /// (motor 1/2, direction 1 = forward, 2 = reverse). Direction is checked
    /// before motor; nothing is sent if either is out of range.
    pub fn set_motor_power_raw(&mut self, motor: u8, direction: u8, power: u16) -> Result<()> {
        let direction = Direction::try_from(direction)?;
        let motor = MotorId::try_from(motor)?;
        self.set_motor_power(motor, direction, power)
    }

    /// Switch both motors off
    pub fn motors_off(&mut self) -> Result<()> {
        debug!("All motors off");
        self.send(&Frame::new(Command::AllOff))?;
        Ok(())
    }

    /// Set the onboard RGB LED; each channel must be in 0..=255
    pub fn set_led_color(&mut self, red: u16, green: u16, blue: u16) -> Result<()> {
        self.ensure_initialized()?;

        let channel = |value: u16, field: &'static str| {
            u8::try_from(value).map_err(|_| ThunderborgError::Validation { field })
        };
        let rgb = [
            channel(red, "red")?,
            channel(green, "green")?,
            channel(blue, "blue")?,
        ];

        let frame = Frame::with_payload(Command::SetLeds, &rgb)?;
        self.send(&frame)?;
        Ok(())
    }

    /// Battery voltage in volts
    pub fn battery_voltage(&mut self) -> Result<f32> {
        let reply = self.raw_read(Command::GetBattVolt, MAX_FRAME_LEN)?;
        Ok(decode_battery_voltage(reply[1], reply[2]))
    }

    /// True if the board answers GET_ID with the expected identifier
    pub fn check_for_peripheral(&mut self) -> bool {
        match self.raw_read(Command::GetId, MAX_FRAME_LEN) {
            Ok(reply) if reply[1] == BOARD_ID => {
                info!("Found ThunderBorg at 0x{:02X}", self.address);
                true
            }
            Ok(reply) => {
                warn!(
                    "Found a device at 0x{:02X} but it is not a ThunderBorg (id 0x{:02X}, expected 0x{:02X})",
                    self.address, reply[1], BOARD_ID
                );
                false
            }
            Err(e) => {
                warn!("Could not find ThunderBorg: {}", e);
                false
            }
        }
    }
}

impl<T: Transport> Drop for ThunderborgDriver<T> {
    fn drop(&mut self) {
        // Never leave the wheels spinning
        if self.is_initialized() {
            if let Err(e) = self.motors_off() {
                warn!("Failed to stop motors on drop: {}", e);
            }
        }
    }
}

/// Scale the big-endian 10-bit reading in reply bytes 1-2 to volts
pub fn decode_battery_voltage(high: u8, low: u8) -> f32 {
    let raw = u16::from_be_bytes([high, low]);
    let level = raw as f32 / ANALOG_MAX as f32;
    level * VOLTAGE_PIN_MAX + VOLTAGE_PIN_CORRECTION
}
