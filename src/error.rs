use thiserror::Error;

use crate::protocols::pdi::SessionState;

#[derive(Error, Debug)]
pub enum PdiError {
    #[error("Timed out waiting for a response from the device")]
    Timeout,

    #[error("Device reported error 0x{code:02X}")]
    Protocol { code: u8 },

    #[error("Could not synchronize with device after {attempts} attempts")]
    SyncFailure { attempts: u32 },

    #[error("Cannot {operation} while session is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Communication error: {0}")]
    Link(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Firmware error: {0}")]
    FirmwareError(String),

    #[error("{error} (closing the session also failed: {close})")]
    CloseSuppressed {
        error: Box<PdiError>,
        close: Box<PdiError>,
    },
}

impl PdiError {
    /// The failure that caused the operation to abort, looking through a
    /// close failure reported alongside it.
    pub fn primary(&self) -> &PdiError {
        match self {
            PdiError::CloseSuppressed { error, .. } => error.primary(),
            other => other,
        }
    }
}

impl From<std::io::Error> for PdiError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => PdiError::Timeout,
            _ => PdiError::Link(format!("{:?}", e)),
        }
    }
}

pub type PdiResult<T> = std::result::Result<T, PdiError>;
