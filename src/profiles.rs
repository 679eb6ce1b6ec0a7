use clap::ValueEnum;

use crate::constants::{DEFAULT_MAX_CHUNK_SIZE, LEGACY_MAX_CHUNK_SIZE, LEGACY_MAX_IMAGE_SIZE};
use crate::protocols::pdi::{FuseWrite, SessionConfig};

/// Fuses the stock pdiprog client writes after every flash: 1, 2, 4 and 5, all
/// left unprogrammed (0xFF)
pub const DEFAULT_FUSES: [FuseWrite; 4] = [
    FuseWrite {
        address: 1,
        value: 0xFF,
    },
    FuseWrite {
        address: 2,
        value: 0xFF,
    },
    FuseWrite {
        address: 4,
        value: 0xFF,
    },
    FuseWrite {
        address: 5,
        value: 0xFF,
    },
];

/// Programmer firmware builds that have been used with pdiman.
///
/// They differ only in how large a flash frame the device buffers and whether
/// an upper bound on the image size applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// 512-byte frames (one target flash page), no image ceiling
    #[default]
    Default,

    /// 1024-byte frames, images of 64 KiB or more are refused
    Legacy,
}

impl Profile {
    pub fn session_config(self) -> SessionConfig {
        match self {
            Profile::Default => SessionConfig {
                max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
                max_image_size: None,
                ..SessionConfig::default()
            },
            Profile::Legacy => SessionConfig {
                max_chunk_size: LEGACY_MAX_CHUNK_SIZE,
                max_image_size: Some(LEGACY_MAX_IMAGE_SIZE),
                ..SessionConfig::default()
            },
        }
    }
}
