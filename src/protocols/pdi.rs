//! Request/response driver for the pdiprog programmer.
//!
//! Every request is answered with exactly one byte before the next one is
//! sent. A [`Session`] has to be synchronized before anything is programmed
//! and ends with a close request, after which it cannot be reused.

pub mod chunk;
pub mod frame;
pub mod sync;

use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_MAX_CHUNK_SIZE, MAX_FRAME_PAYLOAD};
use crate::error::{PdiError, PdiResult};
use crate::interface::DeviceInterface;
use crate::progress::{NoProgress, ProgressSink};
use chunk::FlashChunks;
use frame::{Request, decode_response};
use sync::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unsynchronized,
    Synchronized,
    /// The channel failed; only `close` is still accepted
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Largest payload sent in one WriteFlash frame. The protocol cannot query
    /// the device for this, it has to match the programmer's receive buffer.
    pub max_chunk_size: usize,
    /// Largest image `write_flash` accepts, if the programmer imposes one
    pub max_image_size: Option<usize>,
    pub sync: SyncConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_image_size: None,
            sync: SyncConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> PdiResult<()> {
        if self.max_chunk_size == 0 || self.max_chunk_size > MAX_FRAME_PAYLOAD {
            return Err(PdiError::ConfigurationError(format!(
                "Chunk size must be between 1 and {} bytes, got {}",
                MAX_FRAME_PAYLOAD, self.max_chunk_size
            )));
        }

        if self.sync.attempts == 0 {
            return Err(PdiError::ConfigurationError(
                "At least one handshake attempt is required".to_string(),
            ));
        }

        Ok(())
    }
}

/// A fuse byte and the value to program into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseWrite {
    pub address: u8,
    pub value: u8,
}

pub struct Session<T: DeviceInterface> {
    interface: T,
    config: SessionConfig,
    state: SessionState,
}

impl<T: DeviceInterface> Session<T> {
    /// Take ownership of an open interface. Nothing is sent until
    /// [`Session::synchronize`] is called.
    pub fn new(interface: T, config: SessionConfig) -> PdiResult<Self> {
        config.validate()?;

        Ok(Session {
            interface,
            config,
            state: SessionState::Unsynchronized,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Give the interface back, ending the session
    pub fn into_interface(self) -> T {
        self.interface
    }

    fn require(&self, operation: &'static str, expected: SessionState) -> PdiResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PdiError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// A link failure may have left a frame half-written, so no further
    /// request can be framed reliably on this channel.
    fn check_link<R>(&mut self, result: PdiResult<R>) -> PdiResult<R> {
        if let Err(PdiError::Link(e)) = &result {
            warn!("Link failure, session can only be closed: {}", e);
            self.state = SessionState::Failed;
        }
        result
    }

    /// Send one request and check the single response byte
    fn transact(&mut self, request: Request) -> PdiResult<()> {
        let frame = request.encode()?;
        let result = self
            .interface
            .send(&frame)
            .and_then(|()| self.interface.recv_byte());
        let response = self.check_link(result)?;
        decode_response(response)
    }

    pub fn synchronize(&mut self) -> PdiResult<()> {
        self.require("synchronize", SessionState::Unsynchronized)?;

        let result = sync::synchronize(&mut self.interface, &self.config.sync);
        let attempt = self.check_link(result)?;
        self.state = SessionState::Synchronized;

        info!("Synchronized with programmer (attempt {})", attempt);
        Ok(())
    }

    /// Repeat the handshake on a synchronized session, e.g. after a request
    /// timed out and the device state is no longer known. The session stays
    /// unsynchronized if the handshake fails.
    pub fn resynchronize(&mut self) -> PdiResult<()> {
        self.require("resynchronize", SessionState::Synchronized)?;
        self.state = SessionState::Unsynchronized;
        self.synchronize()
    }

    pub fn erase_chip(&mut self) -> PdiResult<()> {
        self.require("erase chip", SessionState::Synchronized)?;

        self.transact(Request::EraseChip)?;
        info!("Erased chip");
        Ok(())
    }

    pub fn write_flash(&mut self, base_address: u32, data: &[u8]) -> PdiResult<()> {
        self.write_flash_with_progress(base_address, data, &mut NoProgress)
    }

    /// Write `data` to flash starting at `base_address`, one frame per chunk.
    /// Stops at the first chunk the device does not acknowledge.
    pub fn write_flash_with_progress(
        &mut self,
        base_address: u32,
        data: &[u8],
        progress: &mut dyn ProgressSink,
    ) -> PdiResult<()> {
        self.require("write flash", SessionState::Synchronized)?;

        if let Some(max_image_size) = self.config.max_image_size {
            if data.len() > max_image_size {
                return Err(PdiError::FirmwareError(format!(
                    "Image of {} bytes exceeds the limit of {} bytes",
                    data.len(),
                    max_image_size
                )));
            }
        }

        let end = base_address as u64 + data.len() as u64;
        if end > u32::MAX as u64 + 1 {
            return Err(PdiError::FirmwareError(format!(
                "Image of {} bytes at 0x{:08X} runs past the end of the address space",
                data.len(),
                base_address
            )));
        }

        let chunks = FlashChunks::new(base_address, data, self.config.max_chunk_size);
        info!(
            "Writing {} bytes at 0x{:06X} in {} frames",
            data.len(),
            base_address,
            chunks.len()
        );

        progress.begin(data.len());
        let mut written = 0;
        for chunk in chunks {
            debug!(
                "Writing {} bytes at address {:06X}h",
                chunk.data.len(),
                chunk.address
            );

            self.transact(Request::WriteFlash {
                address: chunk.address,
                data: chunk.data,
            })
            .inspect_err(|e| debug!("Frame at {:06X}h failed: {}", chunk.address, e))?;

            written += chunk.data.len();
            progress.advance(written);
        }
        progress.finish();

        info!("Wrote {} bytes to flash", written);
        Ok(())
    }

    pub fn write_fuse(&mut self, address: u8, value: u8) -> PdiResult<()> {
        self.require("write fuse", SessionState::Synchronized)?;

        self.transact(Request::WriteFuse { address, value })?;
        info!("Wrote fuse {} = 0x{:02X}", address, value);
        Ok(())
    }

    /// Send the close request. Accepted from any state but `Closed`, including
    /// after a link failure. The session is closed afterwards even if the
    /// device did not acknowledge it.
    pub fn close(&mut self) -> PdiResult<()> {
        if self.state == SessionState::Closed {
            return Err(PdiError::InvalidState {
                operation: "close",
                state: self.state,
            });
        }

        let result = self.transact(Request::Close);
        self.state = SessionState::Closed;

        match &result {
            Ok(()) => info!("Closed session"),
            Err(e) => debug!("Close was not acknowledged: {}", e),
        }
        result
    }

    /// Run `operations` against the session and close it afterwards, whether
    /// or not they succeeded.
    ///
    /// An error from `operations` is returned in preference to one from the
    /// close; if both fail the close error travels along as
    /// [`PdiError::CloseSuppressed`].
    pub fn run<R>(&mut self, operations: impl FnOnce(&mut Self) -> PdiResult<R>) -> PdiResult<R> {
        let result = operations(self);

        if self.state == SessionState::Closed {
            return result;
        }

        match (result, self.close()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close)) => Err(close),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(close)) => {
                warn!("Closing after failure also failed: {}", close);
                Err(PdiError::CloseSuppressed {
                    error: Box::new(error),
                    close: Box::new(close),
                })
            }
        }
    }
}
