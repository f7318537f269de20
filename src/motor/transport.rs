// Bus transport used by the ThunderBorg driver
//
// The driver only needs four primitives: open a bus device, bind the
// peripheral address, write bytes and read bytes. Byte counts are passed
// through untouched so the driver can detect short transfers itself.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::debug;

/// ioctl request from <linux/i2c-dev.h>: use this slave address
const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Narrow contract between the driver and the physical bus
pub trait Transport {
    /// Open the bus device at `path`
    fn open(&mut self, path: &Path) -> io::Result<()>;

    /// Direct subsequent reads and writes at `address`
    fn bind(&mut self, address: u8) -> io::Result<()>;

    /// Write `bytes`, returning how many were actually written
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes, returning how many were read
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Linux i2c-dev character device (e.g. `/dev/i2c-1`)
#[derive(Debug, Default)]
pub struct I2cTransport {
    file: Option<File>,
}

impl I2cTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "I2C bus not open"))
    }
}

impl Transport for I2cTransport {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("Opened I2C bus {}", path.display());
        self.file = Some(file);
        Ok(())
    }

    fn bind(&mut self, address: u8) -> io::Result<()> {
        let fd = self.file()?.as_raw_fd();
        let status = unsafe { libc::ioctl(fd, I2C_SLAVE as _, libc::c_ulong::from(address)) };
        if status < 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("Bound I2C address 0x{:02X}", address);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.file()?.write(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }
}
