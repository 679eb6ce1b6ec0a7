use std::time::Duration;

use tracing::debug;

use super::frame::{Request, SYNC_ACK};
use crate::constants::{SYNC_ATTEMPTS, SYNC_ATTEMPT_TIMEOUT_MS, SYNC_FILLER_LEN};
use crate::error::{PdiError, PdiResult};
use crate::interface::{DeadlineGuard, DeviceInterface};

/// Retry policy for the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Handshakes tried before giving up
    pub attempts: u32,
    /// Deadline for the acknowledgement of a single handshake
    pub attempt_timeout: Duration,
    /// Zero bytes written after a failed handshake to complete whatever
    /// read the device may still be blocked in
    pub filler_len: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            attempts: SYNC_ATTEMPTS,
            attempt_timeout: Duration::from_millis(SYNC_ATTEMPT_TIMEOUT_MS),
            filler_len: SYNC_FILLER_LEN,
        }
    }
}

/// Bring the device into a known, waiting-for-request state.
///
/// The device may be halfway through a request from an aborted run, so every
/// failed handshake is followed by a burst of filler and a drain of whatever it
/// answered with. Returns the attempt (counting from 1) that was acknowledged.
///
/// The interface's response deadline is shortened for the duration of the
/// handshake and restored on every exit path.
pub fn synchronize<T: DeviceInterface + ?Sized>(
    interface: &mut T,
    config: &SyncConfig,
) -> PdiResult<u32> {
    let sync = Request::Sync.encode()?;
    let mut interface = DeadlineGuard::install(interface, config.attempt_timeout)?;

    for attempt in 1..=config.attempts {
        interface.send(&sync)?;

        match interface.recv_byte() {
            Ok(SYNC_ACK) => {
                debug!("Handshake acknowledged on attempt {}", attempt);
                return Ok(attempt);
            }
            Ok(other) => {
                debug!(
                    "Handshake attempt {}/{} answered with 0x{:02X}",
                    attempt, config.attempts, other
                );
            }
            Err(PdiError::Timeout) => {
                debug!(
                    "Handshake attempt {}/{} timed out",
                    attempt, config.attempts
                );
            }
            Err(e) => return Err(e),
        }

        interface.flush_filler(config.filler_len)?;
        interface.drain()?;
    }

    Err(PdiError::SyncFailure {
        attempts: config.attempts,
    })
}
