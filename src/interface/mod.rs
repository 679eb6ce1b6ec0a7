pub mod serialport;

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tracing::warn;

use crate::error::PdiResult;

pub use self::serialport::{BaudRate, ComPort, SerialPortDevice};

/// Byte written by [`DeviceInterface::flush_filler`]
pub const FILLER_BYTE: u8 = 0x00;

/// How the host reaches the programmer
pub enum DeviceInterfaceType {
    Serial(SerialportParams),
}

#[derive(Debug, Clone)]
pub struct SerialportParams {
    pub port: ComPort,
    pub baud: Option<BaudRate>,
}

/// Blocking byte channel to the programmer.
///
/// Every read is bounded by the interface's active deadline, which callers may
/// change with [`DeviceInterface::set_deadline`] (see [`DeadlineGuard`] for a
/// scoped override).
pub trait DeviceInterface {
    /// Write a single byte to the device
    fn send_byte(&mut self, byte: u8) -> PdiResult<()>;

    /// Write a sequence of bytes to the device, in order
    fn send(&mut self, bytes: &[u8]) -> PdiResult<()> {
        for &byte in bytes {
            self.send_byte(byte)?;
        }
        Ok(())
    }

    /// Block until one byte arrives, failing with `Timeout` once the active
    /// deadline elapses
    fn recv_byte(&mut self) -> PdiResult<u8>;

    /// Discard whatever is currently buffered for reading. Never blocks.
    fn drain(&mut self) -> PdiResult<()>;

    /// Write `len` filler bytes without waiting for any response
    fn flush_filler(&mut self, len: usize) -> PdiResult<()> {
        self.send(&vec![FILLER_BYTE; len])
    }

    /// Currently active response deadline
    fn deadline(&self) -> Duration;

    /// Replace the active response deadline
    fn set_deadline(&mut self, deadline: Duration) -> PdiResult<()>;
}

impl<T: DeviceInterface + ?Sized> DeviceInterface for Box<T> {
    fn send_byte(&mut self, byte: u8) -> PdiResult<()> {
        (**self).send_byte(byte)
    }

    fn send(&mut self, bytes: &[u8]) -> PdiResult<()> {
        (**self).send(bytes)
    }

    fn recv_byte(&mut self) -> PdiResult<u8> {
        (**self).recv_byte()
    }

    fn drain(&mut self) -> PdiResult<()> {
        (**self).drain()
    }

    fn flush_filler(&mut self, len: usize) -> PdiResult<()> {
        (**self).flush_filler(len)
    }

    fn deadline(&self) -> Duration {
        (**self).deadline()
    }

    fn set_deadline(&mut self, deadline: Duration) -> PdiResult<()> {
        (**self).set_deadline(deadline)
    }
}

/// Installs a temporary response deadline and puts the previous one back when
/// dropped, whichever way the borrowing scope is left.
pub struct DeadlineGuard<'a, T: DeviceInterface + ?Sized> {
    interface: &'a mut T,
    previous: Duration,
}

impl<'a, T: DeviceInterface + ?Sized> DeadlineGuard<'a, T> {
    pub fn install(interface: &'a mut T, deadline: Duration) -> PdiResult<Self> {
        let previous = interface.deadline();
        interface.set_deadline(deadline)?;
        Ok(DeadlineGuard {
            interface,
            previous,
        })
    }
}

impl<T: DeviceInterface + ?Sized> Deref for DeadlineGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.interface
    }
}

impl<T: DeviceInterface + ?Sized> DerefMut for DeadlineGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.interface
    }
}

impl<T: DeviceInterface + ?Sized> Drop for DeadlineGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.interface.set_deadline(self.previous) {
            warn!("Failed to restore response deadline {:?}: {}", self.previous, e);
        }
    }
}
