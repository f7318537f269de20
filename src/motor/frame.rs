// Fixed-capacity command frame for the ThunderBorg
//
// Frame format: [Opcode, Payload...], at most MAX_FRAME_LEN bytes in total.
// The length limit is checked while the frame is built, so a Frame that
// exists is always small enough to transmit.

use super::thunderborg::{Command, Result, ThunderborgError};

/// Largest frame (and reply) the board accepts
pub const MAX_FRAME_LEN: usize = 6;

/// A single command frame: opcode byte followed by its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    /// Start a frame with just the opcode
    pub fn new(command: Command) -> Self {
        let mut bytes = [0u8; MAX_FRAME_LEN];
        bytes[0] = command as u8;
        Self { bytes, len: 1 }
    }

    /// Build a frame from an opcode and its payload
    pub fn with_payload(command: Command, payload: &[u8]) -> Result<Self> {
        let mut frame = Self::new(command);
        for &byte in payload {
            frame.push(byte)?;
        }
        Ok(frame)
    }

    /// Append a payload byte, refusing to grow past MAX_FRAME_LEN
    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.len >= MAX_FRAME_LEN {
            return Err(ThunderborgError::Validation {
                field: "frame length",
            });
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Never true: a frame always carries its opcode
    pub fn is_empty(&self) -> bool {
        false
    }
}
