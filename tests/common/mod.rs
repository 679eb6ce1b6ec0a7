//! In-memory stand-in for the programmer, speaking the wire protocol.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use pdiman::error::{PdiError, PdiResult};
use pdiman::interface::DeviceInterface;

pub const NORMAL_DEADLINE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Sync,
    EraseChip,
    WriteFlash { address: u32, data: Vec<u8> },
    WriteFuse { address: u8, value: u8 },
    Close,
}

/// What the device answers a programming request with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Byte(u8),
    Silent,
}

#[derive(Default)]
pub struct DeviceLog {
    pub frames: Vec<Frame>,
    pub sync_attempts: u32,
    pub filler_bytes: usize,
    pub drains: usize,
    /// Deadline that was active for every read
    pub read_deadlines: Vec<Duration>,
    pub deadline: Duration,
}

struct Inner {
    log: DeviceLog,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
    /// Attempt on which the handshake is acknowledged, `None` for never
    ack_sync_on: Option<u32>,
    /// Answer to failed handshakes
    sync_nack: Reply,
    /// Answers to programming requests, in order. Exhausted means 0x00.
    replies: VecDeque<Reply>,
    fail_set_deadline: bool,
    disconnected: bool,
}

/// Cloneable handle: hand one clone to the session, inspect the other
#[derive(Clone)]
pub struct MockDevice {
    inner: Rc<RefCell<Inner>>,
}

impl MockDevice {
    pub fn new() -> Self {
        MockDevice {
            inner: Rc::new(RefCell::new(Inner {
                log: DeviceLog {
                    deadline: NORMAL_DEADLINE,
                    ..DeviceLog::default()
                },
                pending: Vec::new(),
                rx: VecDeque::new(),
                ack_sync_on: Some(1),
                sync_nack: Reply::Silent,
                replies: VecDeque::new(),
                fail_set_deadline: false,
                disconnected: false,
            })),
        }
    }

    pub fn ack_sync_on(self, attempt: Option<u32>) -> Self {
        self.inner.borrow_mut().ack_sync_on = attempt;
        self
    }

    pub fn sync_nack(self, reply: Reply) -> Self {
        self.inner.borrow_mut().sync_nack = reply;
        self
    }

    pub fn replies(self, replies: &[Reply]) -> Self {
        self.inner.borrow_mut().replies = replies.iter().copied().collect();
        self
    }

    pub fn fail_set_deadline(&self) {
        self.inner.borrow_mut().fail_set_deadline = true;
    }

    /// Make every following write fail as if the cable was pulled
    pub fn disconnect(&self) {
        self.inner.borrow_mut().disconnected = true;
    }

    pub fn reconnect(&self) {
        self.inner.borrow_mut().disconnected = false;
    }

    /// Bytes received that do not yet form a complete frame
    pub fn pending_bytes(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn log<R>(&self, f: impl FnOnce(&DeviceLog) -> R) -> R {
        f(&self.inner.borrow().log)
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.log(|log| log.frames.clone())
    }

    pub fn flash_frames(&self) -> Vec<(u32, Vec<u8>)> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::WriteFlash { address, data } => Some((address, data)),
                _ => None,
            })
            .collect()
    }

    pub fn deadline(&self) -> Duration {
        self.log(|log| log.deadline)
    }
}

impl Inner {
    /// Decode a complete frame from the pending bytes, if there is one
    fn take_frame(&mut self) -> Option<Frame> {
        let (frame, used) = match *self.pending.first()? {
            0x59 => (Frame::Sync, 1),
            0x01 => (Frame::EraseChip, 1),
            0xFF => (Frame::Close, 1),
            0x03 => {
                if self.pending.len() < 3 {
                    return None;
                }
                (
                    Frame::WriteFuse {
                        address: self.pending[1],
                        value: self.pending[2],
                    },
                    3,
                )
            }
            0x02 => {
                if self.pending.len() < 7 {
                    return None;
                }
                let address = u32::from_le_bytes([
                    self.pending[1],
                    self.pending[2],
                    self.pending[3],
                    self.pending[4],
                ]);
                let len = u16::from_le_bytes([self.pending[5], self.pending[6]]) as usize;
                if self.pending.len() < 7 + len {
                    return None;
                }
                (
                    Frame::WriteFlash {
                        address,
                        data: self.pending[7..7 + len].to_vec(),
                    },
                    7 + len,
                )
            }
            0x00 => {
                // Filler between requests
                self.pending.remove(0);
                self.log.filler_bytes += 1;
                return self.take_frame();
            }
            other => panic!("device received unknown opcode 0x{:02X}", other),
        };

        self.pending.drain(..used);
        Some(frame)
    }

    fn respond(&mut self, frame: Frame) {
        let reply = match frame {
            Frame::Sync => {
                self.log.sync_attempts += 1;
                if self.ack_sync_on == Some(self.log.sync_attempts) {
                    Reply::Byte(0xA6)
                } else {
                    self.sync_nack
                }
            }
            _ => self.replies.pop_front().unwrap_or(Reply::Byte(0x00)),
        };

        self.log.frames.push(frame);
        if let Reply::Byte(byte) = reply {
            self.rx.push_back(byte);
        }
    }
}

impl DeviceInterface for MockDevice {
    fn send_byte(&mut self, byte: u8) -> PdiResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.disconnected {
            return Err(PdiError::Link("device disconnected".to_string()));
        }
        inner.pending.push(byte);
        while let Some(frame) = inner.take_frame() {
            inner.respond(frame);
        }
        Ok(())
    }

    fn recv_byte(&mut self) -> PdiResult<u8> {
        let mut inner = self.inner.borrow_mut();
        let deadline = inner.log.deadline;
        inner.log.read_deadlines.push(deadline);
        inner.rx.pop_front().ok_or(PdiError::Timeout)
    }

    fn drain(&mut self) -> PdiResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.rx.clear();
        inner.log.drains += 1;
        Ok(())
    }

    fn deadline(&self) -> Duration {
        self.inner.borrow().log.deadline
    }

    fn set_deadline(&mut self, deadline: Duration) -> PdiResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_set_deadline {
            return Err(PdiError::Link("set_deadline refused".to_string()));
        }
        inner.log.deadline = deadline;
        Ok(())
    }
}
