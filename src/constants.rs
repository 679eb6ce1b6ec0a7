pub(crate) const DEFAULT_BAUD_RATE: u32 = 57600;
pub(crate) const RESPONSE_TIMEOUT_MS: u64 = 1000;

pub(crate) const SYNC_ATTEMPTS: u32 = 40;
pub(crate) const SYNC_ATTEMPT_TIMEOUT_MS: u64 = 50;
pub(crate) const SYNC_FILLER_LEN: usize = 32;

/// Flash page size of the target, also the size of the device's receive buffer
pub(crate) const DEFAULT_MAX_CHUNK_SIZE: usize = 512;

pub(crate) const LEGACY_MAX_CHUNK_SIZE: usize = 1024;
pub(crate) const LEGACY_MAX_IMAGE_SIZE: usize = 0xFFFF;

/// Largest payload the 2-byte length field can describe
pub(crate) const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;
