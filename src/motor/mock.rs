// In-memory transport for driver and motion tests
//
// State lives behind Rc<RefCell<_>> so a test keeps a handle to inspect
// written frames after the transport has been moved into the driver.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::transport::Transport;

#[derive(Debug, Default)]
pub struct MockState {
    pub opened: Option<PathBuf>,
    pub bound: Option<u8>,
    pub fail_open: bool,
    pub fail_bind: bool,
    /// Report this many bytes written instead of the full frame
    pub short_write: Option<usize>,
    /// Fail writes whose opcode is in this list
    pub fail_writes_for: Vec<u8>,
    pub written: Vec<Vec<u8>>,
    /// Scripted replies, one per read call
    pub replies: VecDeque<Vec<u8>>,
    pub reads: usize,
}

#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    pub state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: &[u8]) {
        self.state.borrow_mut().replies.push_back(reply.to_vec());
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.borrow().written.clone()
    }

    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }
}

impl Transport for MockTransport {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_open {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such bus"));
        }
        state.opened = Some(path.to_path_buf());
        Ok(())
    }

    fn bind(&mut self, address: u8) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_bind {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "bind refused"));
        }
        state.bound = Some(address);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes_for.contains(&bytes[0]) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write refused"));
        }
        state.written.push(bytes.to_vec());
        Ok(state.short_write.unwrap_or(bytes.len()))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        let reply = state.replies.pop_front().unwrap_or_default();
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }
}
